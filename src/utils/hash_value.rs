use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use super::hash;

/// A 64-bit digest standing in for a value of type `T` as a lookup key.
///
/// Uniform and attribute names are hashed once per query and the digest is
/// what the per-program location caches store.
pub struct HashValue<T: ?Sized> {
    digest: u64,
    _marker: PhantomData<fn(&T)>,
}

impl<T: ?Sized> HashValue<T> {
    #[inline]
    pub fn digest(&self) -> u64 {
        self.digest
    }
}

impl HashValue<str> {
    #[inline]
    pub fn new(name: &str) -> Self {
        HashValue {
            digest: hash::hash64(name),
            _marker: PhantomData,
        }
    }
}

impl<'a> From<&'a str> for HashValue<str> {
    fn from(name: &'a str) -> Self {
        HashValue::new(name)
    }
}

impl<'a> From<&'a String> for HashValue<str> {
    fn from(name: &'a String) -> Self {
        HashValue::new(name)
    }
}

impl<T: ?Sized> Clone for HashValue<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for HashValue<T> {}

impl<T: ?Sized> PartialEq for HashValue<T> {
    fn eq(&self, other: &Self) -> bool {
        self.digest == other.digest
    }
}

impl<T: ?Sized> Eq for HashValue<T> {}

impl<T: ?Sized> Hash for HashValue<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.digest);
    }
}

impl<T: ?Sized> fmt::Debug for HashValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "HashValue({:016x})", self.digest)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::utils::hash::FastHashMap;

    #[test]
    fn names() {
        let a = HashValue::new("_MainTex");
        assert_eq!(a, HashValue::from("_MainTex"));
        assert_ne!(a, HashValue::from("_MainTex2"));
        assert_eq!(a.digest(), HashValue::from(&"_MainTex".to_owned()).digest());
    }

    #[test]
    fn keys() {
        let mut locations = FastHashMap::default();
        locations.insert(HashValue::new("_Color"), 3);
        locations.insert(HashValue::new("_Color"), 4);

        assert_eq!(locations.len(), 1);
        assert_eq!(locations.get(&"_Color".into()), Some(&4));
        assert_eq!(locations.get(&"_Time".into()), None);
    }
}
