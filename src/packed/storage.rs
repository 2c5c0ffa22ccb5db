use std::sync::Arc;

/// Reference-counted, copy-on-write backing vector.
///
/// Cloning shares the buffer. The first write through a shared handle
/// copies the live prefix into a private buffer, so a write never becomes
/// visible through another handle.
#[derive(Debug, Clone)]
pub(crate) struct SharedVec<T> {
    buf: Arc<Vec<T>>,
}

impl<T: Clone> SharedVec<T> {
    pub(crate) fn new(data: Vec<T>) -> Self {
        Self {
            buf: Arc::new(data),
        }
    }

    /// The first `len` elements.
    #[inline]
    pub(crate) fn prefix(&self, len: usize) -> &[T] {
        &self.buf[..len]
    }

    /// Exclusive access to the first `len` elements, detaching from any
    /// other handle first.
    pub(crate) fn prefix_mut(&mut self, len: usize) -> &mut [T] {
        if Arc::get_mut(&mut self.buf).is_none() {
            log::trace!("copy-on-write: detaching {} shared elements", len);
            self.buf = Arc::new(self.buf[..len].to_vec());
        }
        let v = Arc::make_mut(&mut self.buf);
        v.truncate(len);
        v.as_mut_slice()
    }

    /// A private copy of the first `len` elements.
    pub(crate) fn deep_copy(&self, len: usize) -> Self {
        Self::new(self.buf[..len].to_vec())
    }

    /// Whether another handle shares this buffer.
    pub(crate) fn is_shared(&self) -> bool {
        Arc::strong_count(&self.buf) > 1
    }

    /// Whether both handles point at the same buffer.
    pub(crate) fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.buf, &other.buf)
    }
}
