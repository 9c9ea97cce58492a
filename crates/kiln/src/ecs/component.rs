//! Type-erased component columns.
//!
//! An archetype does not know its component types statically, only their
//! [`TypeId`]s, so each column stores boxed `dyn Any` values and downcasts on
//! access. A failed downcast means the storage was corrupted and panics.

use std::any::{Any, TypeId, type_name};

/// Marker for types that can be attached to entities.
///
/// Blanket-implemented; it only exists to keep the bounds short.
pub trait Component: 'static + Send + Sync {}

impl<T: 'static + Send + Sync> Component for T {}

pub(crate) type BoxedComponent = Box<dyn Any + Send + Sync>;

/// One column of an archetype table: row `i` belongs to the archetype's
/// `i`-th entity.
#[derive(Default)]
pub struct ComponentColumn {
    rows: Vec<BoxedComponent>,
}

impl ComponentColumn {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<T: Component>(&mut self, value: T) {
        self.rows.push(Box::new(value));
    }

    pub(crate) fn push_boxed(&mut self, value: BoxedComponent) {
        self.rows.push(value);
    }

    pub fn get<T: Component>(&self, row: usize) -> &T {
        self.rows[row]
            .downcast_ref()
            .unwrap_or_else(|| mismatch::<T>())
    }

    pub fn get_mut<T: Component>(&mut self, row: usize) -> &mut T {
        self.rows[row]
            .downcast_mut()
            .unwrap_or_else(|| mismatch::<T>())
    }

    /// Overwrite the value at `row`, dropping the previous one.
    pub(crate) fn replace<T: Component>(&mut self, row: usize, value: T) {
        *self.get_mut::<T>(row) = value;
    }

    /// Swap-remove `row` and hand back the boxed value. Used when an entity
    /// moves between archetypes.
    pub(crate) fn take(&mut self, row: usize) -> BoxedComponent {
        self.rows.swap_remove(row)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn mismatch<T>() -> ! {
    panic!("component column does not hold `{}`", type_name::<T>())
}

pub(crate) fn component_id<T: Component>() -> TypeId {
    TypeId::of::<T>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn push_get_and_replace() {
        let mut col = ComponentColumn::new();
        col.push(1u32);
        col.push(2u32);
        col.replace(0, 10u32);
        assert_eq!(*col.get::<u32>(0), 10);
        assert_eq!(*col.get::<u32>(1), 2);
        *col.get_mut::<u32>(1) += 5;
        assert_eq!(*col.get::<u32>(1), 7);
    }

    #[test]
    fn take_swaps_last_row_in() {
        let mut col = ComponentColumn::new();
        col.push(1u8);
        col.push(2u8);
        col.push(3u8);

        let taken = col.take(0);
        assert_eq!(*taken.downcast::<u8>().unwrap(), 1);
        assert_eq!(col.len(), 2);
        assert_eq!(*col.get::<u8>(0), 3);

        let mut other = ComponentColumn::new();
        other.push_boxed(col.take(1));
        assert_eq!(*other.get::<u8>(0), 2);
    }

    #[test]
    #[should_panic(expected = "does not hold")]
    fn wrong_type_panics() {
        let mut col = ComponentColumn::new();
        col.push(1u32);
        col.get::<f32>(0);
    }

    #[test]
    fn dropping_column_drops_rows() {
        static DROPS: AtomicUsize = AtomicUsize::new(0);
        struct Tracked;
        impl Drop for Tracked {
            fn drop(&mut self) {
                DROPS.fetch_add(1, Ordering::SeqCst);
            }
        }

        let mut col = ComponentColumn::new();
        col.push(Tracked);
        col.push(Tracked);
        drop(col.take(0));
        assert_eq!(DROPS.load(Ordering::SeqCst), 1);
        drop(col);
        assert_eq!(DROPS.load(Ordering::SeqCst), 2);
    }
}
