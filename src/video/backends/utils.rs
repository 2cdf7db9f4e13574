use crate::utils::handle::{HandleIndex, HandleLike};

/// Backend side storage addressed by device handles. The device owns the
/// handle allocation, so slots are only written at the indices it hands out.
#[derive(Debug)]
pub struct DataVec<T>
where
    T: Sized,
{
    buf: Vec<Option<T>>,
    versions: Vec<HandleIndex>,
}

impl<T> Default for DataVec<T> {
    fn default() -> Self {
        DataVec::new()
    }
}

impl<T> DataVec<T> {
    pub fn new() -> Self {
        DataVec {
            buf: Vec::new(),
            versions: Vec::new(),
        }
    }

    pub fn get<H: HandleLike>(&self, handle: H) -> Option<&T> {
        let index = handle.index() as usize;
        if let Some(&v) = self.versions.get(index) {
            if v == handle.version() {
                return self.buf[index].as_ref();
            }
        }

        None
    }

    pub fn create<H: HandleLike>(&mut self, handle: H, value: T) {
        let index = handle.index() as usize;

        if self.buf.len() <= index {
            self.buf.resize_with(index + 1, || None);
            self.versions.resize(index + 1, 0);
        }

        self.buf[index] = Some(value);
        self.versions[index] = handle.version();
    }

    pub fn free<H: HandleLike>(&mut self, handle: H) -> Option<T> {
        let index = handle.index() as usize;
        if self.versions.get(index) != Some(&handle.version()) {
            return None;
        }

        self.versions[index] = 0;
        self.buf[index].take()
    }

    /// Iterates over the alive values.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.buf.iter().filter_map(|v| v.as_ref())
    }
}
