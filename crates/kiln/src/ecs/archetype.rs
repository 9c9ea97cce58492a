//! # Archetype tables
//!
//! Entities sharing exactly the same set of component types live in the same
//! [`Archetype`]: one column per type plus a parallel entity list.
//!
//! ```text
//! key:      [Quad, Velocity]
//! Quad:     [q0, q1, q2]
//! Velocity: [v0, v1, v2]
//! entities: [e0, e1, e2]
//! ```
//!
//! Removing a row swap-removes from every column at once, so the row of the
//! last entity changes and the caller must patch that entity's location.
//!
//! ## Design: moving between tables
//!
//! Adding or removing a component changes an entity's type set, so the
//! entity moves to another table: [`Archetype::take_row`] lifts every value
//! out, the world edits the row and [`Archetype::push_row`] appends it to the
//! target table. Tables are never dropped once created, even when empty.
//!
//! ## Comparison
//!
//! hecs and bevy_ecs store columns as raw byte blobs with a layout per type.
//! Columns here hold boxed values, which costs a pointer chase per access but
//! needs no `unsafe`.

use std::any::TypeId;
use std::collections::HashMap;

use super::component::{BoxedComponent, ComponentColumn};
use super::entity::Entity;

/// Sorted, deduplicated component type set identifying an archetype.
pub(crate) type ArchetypeKey = Vec<TypeId>;

pub(crate) fn archetype_key(mut type_ids: Vec<TypeId>) -> ArchetypeKey {
    type_ids.sort();
    type_ids.dedup();
    type_ids
}

/// The components of a single row after it has been taken out of a table.
pub(crate) type Row = HashMap<TypeId, BoxedComponent>;

/// One table: a column per component type, all the same length as
/// `entities`.
pub(crate) struct Archetype {
    pub key: ArchetypeKey,
    pub columns: HashMap<TypeId, ComponentColumn>,
    /// Owner of each row, in row order.
    pub entities: Vec<Entity>,
}

impl Archetype {
    pub fn new(key: ArchetypeKey) -> Self {
        let columns = key.iter().map(|&tid| (tid, ComponentColumn::new())).collect();
        Self {
            key,
            columns,
            entities: Vec::new(),
        }
    }

    pub fn has(&self, type_id: &TypeId) -> bool {
        self.columns.contains_key(type_id)
    }

    /// True when this table holds every type in `required`.
    pub fn contains_all(&self, required: &[TypeId]) -> bool {
        required.iter().all(|tid| self.has(tid))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Drop the row at `row`. Returns the entity that was moved into `row`,
    /// if any.
    pub fn swap_remove(&mut self, row: usize) -> Option<Entity> {
        for column in self.columns.values_mut() {
            drop(column.take(row));
        }
        self.entities.swap_remove(row);
        self.entities.get(row).copied()
    }

    /// Move the row at `row` out of the table. Like [`swap_remove`](Self::swap_remove)
    /// but the component values are returned instead of dropped.
    pub fn take_row(&mut self, row: usize) -> (Row, Option<Entity>) {
        let values = self
            .columns
            .iter_mut()
            .map(|(&tid, column)| (tid, column.take(row)))
            .collect();
        self.entities.swap_remove(row);
        (values, self.entities.get(row).copied())
    }

    /// Append `entity` with the given values and return its row.
    ///
    /// # Panics
    ///
    /// Panics if `values` is missing a column of this table.
    pub fn push_row(&mut self, entity: Entity, mut values: Row) -> usize {
        for (tid, column) in self.columns.iter_mut() {
            let value = values
                .remove(tid)
                .unwrap_or_else(|| panic!("row for {entity:?} is missing a column"));
            column.push_boxed(value);
        }
        self.entities.push(entity);
        self.entities.len() - 1
    }
}
