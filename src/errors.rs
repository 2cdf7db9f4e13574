//! The error type of the work that is not bound to a single device call, like
//! frame orchestration and dispatched tasks. Device calls return the typed
//! `video::errors::Error`, which converts into this one with `?`.

pub use failure::Error;

pub type Result<T> = ::std::result::Result<T, Error>;
