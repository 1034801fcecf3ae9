//! Reference-counted byte buffers.
//!
//! A [`VariantBytes`] is a window onto shared storage. Cloning and slicing
//! never copy. Storage reachable from more than one handle is immutable;
//! [`VariantBytes::make_mut`] copies first unless the handle is the only one.

use std::fmt;
use std::ops::{Deref, Range};
use std::sync::Arc;

use parking_lot::Mutex;

/// Callback run when foreign bytes are no longer referenced.
pub type ReleaseFn = Box<dyn FnOnce() + Send + 'static>;

pub(crate) enum Storage {
    Owned(Vec<u8>),
    Foreign {
        owner: Box<dyn AsRef<[u8]> + Send + Sync + 'static>,
        release: Mutex<Option<ReleaseFn>>,
    },
}

impl Storage {
    fn as_slice(&self) -> &[u8] {
        match self {
            Storage::Owned(vec) => vec,
            Storage::Foreign { owner, .. } => (**owner).as_ref(),
        }
    }
}

impl Drop for Storage {
    fn drop(&mut self) {
        if let Storage::Foreign { release, .. } = self {
            if let Some(release) = release.get_mut().take() {
                release();
            }
        }
    }
}

/// A shared, immutable view of serialised bytes.
#[derive(Clone)]
pub struct VariantBytes {
    storage: Arc<Storage>,
    start: usize,
    len: usize,
}

impl VariantBytes {
    /// Takes ownership of `vec` without copying.
    pub fn from_vec(vec: Vec<u8>) -> Self {
        let len = vec.len();
        VariantBytes {
            storage: Arc::new(Storage::Owned(vec)),
            start: 0,
            len,
        }
    }

    pub fn copy_from_slice(data: &[u8]) -> Self {
        VariantBytes::from_vec(data.to_vec())
    }

    /// Borrows bytes owned elsewhere; `release` runs once the last view of
    /// them is dropped.
    pub fn from_owner<T>(owner: T, release: Option<ReleaseFn>) -> Self
    where
        T: AsRef<[u8]> + Send + Sync + 'static,
    {
        let len = owner.as_ref().len();
        VariantBytes {
            storage: Arc::new(Storage::Foreign {
                owner: Box::new(owner),
                release: Mutex::new(release),
            }),
            start: 0,
            len,
        }
    }

    pub(crate) fn from_storage(storage: Arc<Storage>, len: usize) -> Self {
        debug_assert!(len <= storage.as_slice().len());
        VariantBytes {
            storage,
            start: 0,
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.storage.as_slice()[self.start..self.start + self.len]
    }

    /// Returns a view of `range`, relative to this view.
    ///
    /// # Panics
    ///
    /// Panics if `range` is out of bounds.
    pub fn slice(&self, range: Range<usize>) -> VariantBytes {
        assert!(
            range.start <= range.end && range.end <= self.len,
            "slice {range:?} out of bounds for {} bytes",
            self.len
        );
        VariantBytes {
            storage: Arc::clone(&self.storage),
            start: self.start + range.start,
            len: range.len(),
        }
    }

    /// Returns true if both views start at the same address and have the
    /// same length.
    pub fn ptr_eq(&self, other: &VariantBytes) -> bool {
        self.as_ptr() == other.as_ptr() && self.len == other.len
    }

    /// Returns mutable access, copying into fresh storage unless this view
    /// is the only handle on owned storage.
    pub(crate) fn make_mut(&mut self) -> &mut [u8] {
        let unique = matches!(Arc::get_mut(&mut self.storage), Some(Storage::Owned(_)));
        if !unique {
            *self = VariantBytes::copy_from_slice(self.as_slice());
        }
        let range = self.start..self.start + self.len;
        match Arc::get_mut(&mut self.storage) {
            Some(Storage::Owned(vec)) => &mut vec[range],
            _ => unreachable!("fresh storage has a single owner"),
        }
    }
}

impl Deref for VariantBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl AsRef<[u8]> for VariantBytes {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl PartialEq for VariantBytes {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for VariantBytes {}

impl PartialEq<[u8]> for VariantBytes {
    fn eq(&self, other: &[u8]) -> bool {
        self.as_slice() == other
    }
}

impl From<Vec<u8>> for VariantBytes {
    fn from(vec: Vec<u8>) -> Self {
        VariantBytes::from_vec(vec)
    }
}

impl fmt::Debug for VariantBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const PREVIEW: usize = 32;
        write!(f, "VariantBytes({} bytes: ", self.len)?;
        for byte in self.as_slice().iter().take(PREVIEW) {
            write!(f, "{byte:02x}")?;
        }
        if self.len > PREVIEW {
            f.write_str("..")?;
        }
        f.write_str(")")
    }
}
