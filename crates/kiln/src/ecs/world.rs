//! The [`World`]: entities, their components and singleton resources.
//!
//! ```text
//! World
//!   allocator         generational entity handles
//!   archetypes        Vec<Archetype>, in creation order
//!   archetype_index   component type set -> position in `archetypes`
//!   locations         entity index -> (archetype, row)
//!   resources         TypeId -> Box<dyn Any>
//! ```
//!
//! Archetypes are never removed, so iterating `archetypes` front to back and
//! each table row by row gives a stable order across repeated queries as long
//! as no entity is spawned, despawned or migrated in between.
//!
//! Resources only need to be `'static`. Some of them (the window event loop)
//! are neither `Send` nor `Sync`, and everything runs on one thread anyway.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;

use super::archetype::{Archetype, ArchetypeKey, Row, archetype_key};
use super::component::{Component, component_id};
use super::entity::{Entity, EntityAllocator};
use super::query::QueryParam;
use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug)]
struct EntityLocation {
    archetype: usize,
    row: usize,
}

/// Container for all application state.
#[derive(Default)]
pub struct World {
    allocator: EntityAllocator,
    archetypes: Vec<Archetype>,
    archetype_index: HashMap<ArchetypeKey, usize>,
    locations: HashMap<u32, EntityLocation>,
    resources: HashMap<TypeId, Box<dyn Any>>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Resources ────────────────────────────────────────────────────

    /// Register a new resource. Fails if one of the same type already exists;
    /// use [`insert_resource`](Self::insert_resource) to replace on purpose.
    pub fn register_resource<T: 'static>(&mut self, value: T) -> Result<()> {
        let tid = TypeId::of::<T>();
        if self.resources.contains_key(&tid) {
            return Err(Error::DuplicateResource(type_name::<T>()));
        }
        self.resources.insert(tid, Box::new(value));
        Ok(())
    }

    /// Insert or replace a resource, returning the previous value.
    ///
    /// This is the second half of the take/reinsert pattern: a system takes a
    /// resource out with [`take_resource`](Self::take_resource), works with it
    /// and the world side by side, then puts it back.
    pub fn insert_resource<T: 'static>(&mut self, value: T) -> Option<T> {
        self.resources
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|old| old.downcast::<T>().ok())
            .map(|old| *old)
    }

    /// # Panics
    ///
    /// Panics if the resource is missing. Use [`get_resource`](Self::get_resource)
    /// when absence is expected.
    pub fn resource<T: 'static>(&self) -> &T {
        self.get_resource::<T>()
            .unwrap_or_else(|| missing_resource::<T>())
    }

    /// # Panics
    ///
    /// Panics if the resource is missing.
    pub fn resource_mut<T: 'static>(&mut self) -> &mut T {
        self.get_resource_mut::<T>()
            .unwrap_or_else(|| missing_resource::<T>())
    }

    pub fn get_resource<T: 'static>(&self) -> Option<&T> {
        self.resources
            .get(&TypeId::of::<T>())
            .and_then(|r| r.downcast_ref::<T>())
    }

    pub fn get_resource_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.resources
            .get_mut(&TypeId::of::<T>())
            .and_then(|r| r.downcast_mut::<T>())
    }

    pub fn has_resource<T: 'static>(&self) -> bool {
        self.resources.contains_key(&TypeId::of::<T>())
    }

    /// Move a resource out of the world.
    pub fn take_resource<T: 'static>(&mut self) -> Option<T> {
        self.resources
            .remove(&TypeId::of::<T>())
            .and_then(|r| r.downcast::<T>().ok())
            .map(|r| *r)
    }

    /// Drop a resource. Returns `true` if it was present.
    pub fn remove_resource<T: 'static>(&mut self) -> bool {
        self.resources.remove(&TypeId::of::<T>()).is_some()
    }

    // ── Entities ─────────────────────────────────────────────────────

    pub fn entity_count(&self) -> usize {
        self.allocator.alive_count()
    }

    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.allocator.is_alive(entity)
    }

    /// Spawn an entity with every component of `bundle` attached at once.
    ///
    /// # Panics
    ///
    /// Panics if the bundle names the same component type twice.
    pub fn spawn<B: SpawnBundle>(&mut self, bundle: B) -> Entity {
        let type_ids = B::type_ids();
        let key = archetype_key(type_ids.clone());
        assert_eq!(
            key.len(),
            type_ids.len(),
            "bundle `{}` contains a component type more than once",
            type_name::<B>()
        );

        let entity = self.allocator.allocate();
        let archetype = self.archetype_for(key);
        let row = self.archetypes[archetype].push_row(entity, bundle.into_row());
        self.locations
            .insert(entity.index, EntityLocation { archetype, row });
        entity
    }

    pub fn spawn_one<T: Component>(&mut self, component: T) -> Entity {
        self.spawn((component,))
    }

    pub fn spawn_empty(&mut self) -> Entity {
        let entity = self.allocator.allocate();
        let archetype = self.archetype_for(Vec::new());
        let row = self.archetypes[archetype].push_row(entity, Row::new());
        self.locations
            .insert(entity.index, EntityLocation { archetype, row });
        entity
    }

    /// Destroy `entity` and drop its components. Returns `false` for stale
    /// handles.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        if !self.allocator.deallocate(entity) {
            return false;
        }
        if let Some(loc) = self.locations.remove(&entity.index) {
            let moved = self.archetypes[loc.archetype].swap_remove(loc.row);
            self.relocate(moved, loc.row);
        }
        true
    }

    // ── Components ───────────────────────────────────────────────────

    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        let loc = self.location(entity)?;
        let column = self.archetypes[loc.archetype]
            .columns
            .get(&component_id::<T>())?;
        Some(column.get::<T>(loc.row))
    }

    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        let loc = self.location(entity)?;
        let column = self.archetypes[loc.archetype]
            .columns
            .get_mut(&component_id::<T>())?;
        Some(column.get_mut::<T>(loc.row))
    }

    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.location(entity)
            .is_some_and(|loc| self.archetypes[loc.archetype].has(&component_id::<T>()))
    }

    /// Attach `component` to `entity`. An existing component of the same type
    /// is replaced in place; otherwise the entity moves to the archetype that
    /// includes `T`.
    ///
    /// # Panics
    ///
    /// Panics if the entity is not alive.
    pub fn insert<T: Component>(&mut self, entity: Entity, component: T) {
        let Some(loc) = self.location(entity) else {
            panic!(
                "cannot insert `{}` on dead entity {entity:?}",
                type_name::<T>()
            );
        };
        let tid = component_id::<T>();

        let current = &mut self.archetypes[loc.archetype];
        if let Some(column) = current.columns.get_mut(&tid) {
            column.replace(loc.row, component);
            return;
        }

        let mut key = current.key.clone();
        key.push(tid);
        self.migrate(entity, loc, archetype_key(key), |row| {
            row.insert(tid, Box::new(component));
        });
    }

    /// Detach the `T` component from `entity`, dropping it. Returns `false`
    /// if the entity is dead or has no `T`.
    pub fn remove<T: Component>(&mut self, entity: Entity) -> bool {
        let Some(loc) = self.location(entity) else {
            return false;
        };
        let tid = component_id::<T>();
        let current = &self.archetypes[loc.archetype];
        if !current.has(&tid) {
            return false;
        }

        let key: ArchetypeKey = current.key.iter().copied().filter(|&t| t != tid).collect();
        self.migrate(entity, loc, key, |row| {
            row.remove(&tid);
        });
        true
    }

    // ── Views ────────────────────────────────────────────────────────

    /// Visit every entity that has all components named by `Q`.
    ///
    /// ```ignore
    /// world.query::<(&mut Quad, &Velocity)>(|_, (quad, velocity)| {
    ///     quad.position += velocity.direction * dt;
    /// });
    /// ```
    ///
    /// Entities are visited in archetype creation order, then row order.
    pub fn query<Q: QueryParam>(&mut self, mut f: impl FnMut(Entity, Q::Item<'_>)) {
        let required = Q::type_ids();
        for archetype in &mut self.archetypes {
            if archetype.entities.is_empty() || !archetype.contains_all(&required) {
                continue;
            }
            let mut columns = Q::extract(&mut archetype.columns);
            for (row, &entity) in archetype.entities.iter().enumerate() {
                f(entity, Q::fetch(&mut columns, row));
            }
            Q::restore(columns, &mut archetype.columns);
        }
    }

    /// Copy out the entities `query::<Q>` would visit, in the same order.
    pub fn query_entities<Q: QueryParam>(&self) -> Vec<Entity> {
        let required = Q::type_ids();
        self.archetypes
            .iter()
            .filter(|archetype| archetype.contains_all(&required))
            .flat_map(|archetype| archetype.entities.iter().copied())
            .collect()
    }

    /// The `T` of the first entity that has one, in query order.
    ///
    /// Meant for components only one entity carries (a player, a camera).
    /// With several matches the first visited one wins.
    pub fn get_single<T: Component>(&self) -> Option<&T> {
        let tid = component_id::<T>();
        self.archetypes
            .iter()
            .find(|archetype| !archetype.entities.is_empty() && archetype.has(&tid))
            .and_then(|archetype| archetype.columns.get(&tid))
            .map(|column| column.get::<T>(0))
    }

    pub fn get_single_mut<T: Component>(&mut self) -> Option<&mut T> {
        let tid = component_id::<T>();
        self.archetypes
            .iter_mut()
            .find(|archetype| !archetype.entities.is_empty() && archetype.has(&tid))
            .and_then(|archetype| archetype.columns.get_mut(&tid))
            .map(|column| column.get_mut::<T>(0))
    }

    /// # Panics
    ///
    /// Panics if no entity has a `T`.
    pub fn single<T: Component>(&self) -> &T {
        self.get_single::<T>()
            .unwrap_or_else(|| missing_single::<T>())
    }

    /// # Panics
    ///
    /// Panics if no entity has a `T`.
    pub fn single_mut<T: Component>(&mut self) -> &mut T {
        self.get_single_mut::<T>()
            .unwrap_or_else(|| missing_single::<T>())
    }

    // ── Internals ────────────────────────────────────────────────────

    fn location(&self, entity: Entity) -> Option<EntityLocation> {
        if !self.allocator.is_alive(entity) {
            return None;
        }
        self.locations.get(&entity.index).copied()
    }

    fn archetype_for(&mut self, key: ArchetypeKey) -> usize {
        if let Some(&index) = self.archetype_index.get(&key) {
            return index;
        }
        let index = self.archetypes.len();
        self.archetypes.push(Archetype::new(key.clone()));
        self.archetype_index.insert(key, index);
        index
    }

    /// Point the entity swapped into `row` at its new row.
    fn relocate(&mut self, moved: Option<Entity>, row: usize) {
        if let Some(moved) = moved
            && let Some(loc) = self.locations.get_mut(&moved.index)
        {
            loc.row = row;
        }
    }

    fn migrate(
        &mut self,
        entity: Entity,
        from: EntityLocation,
        key: ArchetypeKey,
        edit: impl FnOnce(&mut Row),
    ) {
        let (mut row, moved) = self.archetypes[from.archetype].take_row(from.row);
        self.relocate(moved, from.row);
        edit(&mut row);

        let archetype = self.archetype_for(key);
        let new_row = self.archetypes[archetype].push_row(entity, row);
        self.locations.insert(
            entity.index,
            EntityLocation {
                archetype,
                row: new_row,
            },
        );
    }
}

fn missing_resource<T>() -> ! {
    panic!(
        "resource `{}` is not registered in the world",
        type_name::<T>()
    )
}

fn missing_single<T>() -> ! {
    panic!("no entity has a `{}` component", type_name::<T>())
}

// ── Bundles ──────────────────────────────────────────────────────────────

/// A tuple of components spawned together. Implemented for tuples of one to
/// eight components.
pub trait SpawnBundle {
    fn type_ids() -> Vec<TypeId>;

    fn into_row(self) -> Row;
}

macro_rules! impl_spawn_bundle {
    ($($T:ident),+) => {
        impl<$($T: Component),+> SpawnBundle for ($($T,)+) {
            fn type_ids() -> Vec<TypeId> {
                vec![$(component_id::<$T>()),+]
            }

            #[allow(non_snake_case)]
            fn into_row(self) -> Row {
                let ($($T,)+) = self;
                let mut row = Row::new();
                $(row.insert(component_id::<$T>(), Box::new($T));)+
                row
            }
        }
    };
}

impl_spawn_bundle!(A);
impl_spawn_bundle!(A, B);
impl_spawn_bundle!(A, B, C);
impl_spawn_bundle!(A, B, C, D);
impl_spawn_bundle!(A, B, C, D, E);
impl_spawn_bundle!(A, B, C, D, E, F);
impl_spawn_bundle!(A, B, C, D, E, F, G);
impl_spawn_bundle!(A, B, C, D, E, F, G, H);
