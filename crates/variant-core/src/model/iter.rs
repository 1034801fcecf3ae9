//! Iteration over the children of a container.

use crate::model::Variant;

/// Iterator over the children of a container value.
///
/// Holds a reference to the container until the last child has been
/// returned, or until [`cancel`](Self::cancel) is called.
#[derive(Debug)]
pub struct VariantIter {
    container: Option<Variant>,
    n: usize,
    index: usize,
    current: Option<Variant>,
}

impl VariantIter {
    /// Binds an iterator to `container`, recording its child count.
    ///
    /// # Panics
    ///
    /// Panics if `container` is not a container.
    pub fn new(container: &Variant) -> VariantIter {
        let n = container.n_children();
        VariantIter {
            container: (n > 0).then(|| container.clone()),
            n,
            index: 0,
            current: None,
        }
    }

    /// Number of children the container had when the iterator was bound.
    pub fn n_children(&self) -> usize {
        self.n
    }

    /// Advances and borrows the next child.
    ///
    /// The previously returned child is released first. Returns `None` once
    /// every child has been visited.
    pub fn next_value(&mut self) -> Option<&Variant> {
        self.current = self.next();
        self.current.as_ref()
    }

    /// Releases the current child and the container early.
    pub fn cancel(&mut self) {
        self.current = None;
        self.container = None;
        self.index = self.n;
    }
}

impl Iterator for VariantIter {
    type Item = Variant;

    fn next(&mut self) -> Option<Variant> {
        self.current = None;
        let container = self.container.as_ref()?;
        let child = container.get_child_value(self.index);
        self.index += 1;
        if self.index == self.n {
            self.container = None;
        }
        Some(child)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.n - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for VariantIter {}

impl Variant {
    /// Returns an iterator over the children of a container.
    pub fn iter(&self) -> VariantIter {
        VariantIter::new(self)
    }
}

impl IntoIterator for &Variant {
    type Item = Variant;
    type IntoIter = VariantIter;

    fn into_iter(self) -> VariantIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LoadFlags, VariantType};

    fn array() -> Variant {
        Variant::new_array(None, [10u32, 20, 30].map(Variant::from)).unwrap()
    }

    #[test]
    fn test_visits_children_in_order() {
        let values: Vec<u32> = array().iter().map(|c| c.get_u32()).collect();
        assert_eq!(values, vec![10, 20, 30]);
    }

    #[test]
    fn test_exact_size() {
        let arr = array();
        let mut it = arr.iter();
        assert_eq!(it.len(), 3);
        it.next();
        assert_eq!(it.len(), 2);
        assert_eq!(it.n_children(), 3);
    }

    #[test]
    fn test_releases_container_after_last_child() {
        let arr = array().ref_sink();
        let base = arr.ref_count();
        let mut it = arr.iter();
        assert_eq!(arr.ref_count(), base + 1);
        while it.next_value().is_some() {}
        assert_eq!(arr.ref_count(), base);
    }

    #[test]
    fn test_cancel_releases_early() {
        let data = array().get_data();
        let arr = Variant::load(&VariantType::new("au").unwrap(), &data, LoadFlags::new());
        let base = arr.ref_count();
        let mut it = arr.iter();
        let first = it.next_value().map(Variant::get_u32);
        assert_eq!(first, Some(10));
        // The borrowed child holds the container's bytes alive.
        assert!(arr.ref_count() > base);
        it.cancel();
        assert_eq!(arr.ref_count(), base);
        assert!(it.next_value().is_none());
    }

    #[test]
    fn test_empty_container_holds_nothing() {
        let empty = Variant::new_array(Some(&VariantType::INT32), Vec::new()).unwrap();
        let base = empty.ref_count();
        let mut it = empty.iter();
        assert_eq!(empty.ref_count(), base);
        assert!(it.next().is_none());
    }
}
