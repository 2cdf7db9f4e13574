use std::mem;
use std::ptr;
use std::slice;

/// A marker trait indicating that a type is plain-old-data. A pod type does not have
/// invalid bit patterns and can be safely created from arbitrary bit pattern.
pub unsafe trait Pod: Copy + Sized + 'static {}

macro_rules! impl_pod {
    ( ty = $($ty:ty)* ) => { $( unsafe impl Pod for $ty {} )* };
    ( ar = $($tt:expr)* ) => { $( unsafe impl<T: Pod> Pod for [T; $tt] {} )* };
}

impl_pod! { ty = isize usize i8 u8 i16 u16 i32 u32 i64 u64 f32 f64 }
impl_pod! { ar = 1 2 3 4 5 6 7 8 9 10 11 12 13 14 15 16 }

/// Borrows a slice of pods as raw bytes.
#[inline]
pub fn as_bytes<T: Pod>(v: &[T]) -> &[u8] {
    unsafe { slice::from_raw_parts(v.as_ptr() as *const u8, mem::size_of::<T>() * v.len()) }
}

/// Reads a pod from the bytes, returns `None` if the length does not match.
#[inline]
pub fn from_bytes<T: Pod>(bytes: &[u8]) -> Option<T> {
    if bytes.len() != mem::size_of::<T>() {
        return None;
    }

    Some(unsafe { ptr::read_unaligned(bytes.as_ptr() as *const T) })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bytes() {
        let v = [1u16, 2u16];
        assert_eq!(as_bytes(&v).len(), 4);
        assert_eq!(from_bytes::<u32>(&[1, 0, 0, 0]), Some(u32::from_le(1)));
        assert_eq!(from_bytes::<u32>(&[1, 0, 0]), None);

        let f = [1.0f32, 2.0, 3.0];
        assert_eq!(from_bytes::<[f32; 3]>(as_bytes(&f)), Some(f));
    }
}
