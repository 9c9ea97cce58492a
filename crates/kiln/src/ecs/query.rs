//! # Component views
//!
//! A view names the component types it wants, `(&Quad, &mut Velocity)` for
//! instance, and [`World::query`](super::World::query) calls a closure once
//! per entity that has all of them. While an archetype is visited its columns
//! are moved out of the table and moved back afterwards; that gives the
//! closure plain `&`/`&mut` references to disjoint columns without `unsafe`,
//! and nothing can reallocate the storage mid-iteration.
//!
//! ## Design: extract, fetch, restore
//!
//! ```text
//! for each archetype containing every requested type:
//!     column = P::extract(&mut archetype.columns)   // moved out
//!     for row in 0..len: f(entity, P::fetch(&mut column, row))
//!     P::restore(column, &mut archetype.columns)    // moved back
//! ```
//!
//! Asking for the same type twice, `(&mut A, &A)` say, finds the column
//! already gone on the second extract and panics. That is the aliasing check
//! other stores do with access bitsets.

use std::any::{TypeId, type_name};
use std::collections::HashMap;

use super::component::{Component, ComponentColumn};

type Columns = HashMap<TypeId, ComponentColumn>;

/// Something that can be fetched per entity from an archetype.
///
/// Implemented for `&T`, `&mut T` and tuples of up to eight of those.
pub trait QueryParam {
    /// What the closure receives per entity.
    type Item<'w>;

    /// Columns moved out of the archetype for the duration of a visit.
    type Column;

    /// Component types an archetype must contain to be visited.
    fn type_ids() -> Vec<TypeId>;

    fn extract(columns: &mut Columns) -> Self::Column;

    /// Put back what [`extract`](Self::extract) took.
    fn restore(column: Self::Column, columns: &mut Columns);

    fn fetch(column: &mut Self::Column, row: usize) -> Self::Item<'_>;
}

fn extract_column<T: Component>(columns: &mut Columns) -> (TypeId, ComponentColumn) {
    let tid = TypeId::of::<T>();
    let column = columns.remove(&tid).unwrap_or_else(|| {
        panic!(
            "query asked for `{}` twice or from an archetype without it",
            type_name::<T>()
        )
    });
    (tid, column)
}

impl<T: Component> QueryParam for &T {
    type Item<'w> = &'w T;
    type Column = (TypeId, ComponentColumn);

    fn type_ids() -> Vec<TypeId> {
        vec![TypeId::of::<T>()]
    }

    fn extract(columns: &mut Columns) -> Self::Column {
        extract_column::<T>(columns)
    }

    fn restore((tid, column): Self::Column, columns: &mut Columns) {
        columns.insert(tid, column);
    }

    fn fetch(column: &mut Self::Column, row: usize) -> Self::Item<'_> {
        column.1.get::<T>(row)
    }
}

impl<T: Component> QueryParam for &mut T {
    type Item<'w> = &'w mut T;
    type Column = (TypeId, ComponentColumn);

    fn type_ids() -> Vec<TypeId> {
        vec![TypeId::of::<T>()]
    }

    fn extract(columns: &mut Columns) -> Self::Column {
        extract_column::<T>(columns)
    }

    fn restore((tid, column): Self::Column, columns: &mut Columns) {
        columns.insert(tid, column);
    }

    fn fetch(column: &mut Self::Column, row: usize) -> Self::Item<'_> {
        column.1.get_mut::<T>(row)
    }
}

macro_rules! impl_query_param_tuple {
    ($($P:ident),+) => {
        impl<$($P: QueryParam),+> QueryParam for ($($P,)+) {
            type Item<'w> = ($($P::Item<'w>,)+);
            type Column = ($($P::Column,)+);

            fn type_ids() -> Vec<TypeId> {
                let mut ids = Vec::new();
                $(ids.extend($P::type_ids());)+
                ids
            }

            fn extract(columns: &mut Columns) -> Self::Column {
                ($($P::extract(columns),)+)
            }

            #[allow(non_snake_case)]
            fn restore(column: Self::Column, columns: &mut Columns) {
                let ($($P,)+) = column;
                $($P::restore($P, columns);)+
            }

            #[allow(non_snake_case)]
            fn fetch(column: &mut Self::Column, row: usize) -> Self::Item<'_> {
                let ($($P,)+) = column;
                ($($P::fetch($P, row),)+)
            }
        }
    };
}

impl_query_param_tuple!(A);
impl_query_param_tuple!(A, B);
impl_query_param_tuple!(A, B, C);
impl_query_param_tuple!(A, B, C, D);
impl_query_param_tuple!(A, B, C, D, E);
impl_query_param_tuple!(A, B, C, D, E, F);
impl_query_param_tuple!(A, B, C, D, E, F, G);
impl_query_param_tuple!(A, B, C, D, E, F, G, H);
