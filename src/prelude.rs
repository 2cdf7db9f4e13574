pub use crate::errors;
pub use crate::math::prelude::*;
pub use crate::utils::prelude::*;
pub use crate::video::prelude::*;
