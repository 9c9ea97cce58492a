//! # Entity handles and their allocator
//!
//! An [`Entity`] owns no data. It is a key the [`World`](super::World) uses to
//! find the archetype row that holds the entity's components.
//!
//! ## Design: generational slots
//!
//! Each handle is a slot index paired with a generation. Despawning bumps
//! the slot's generation before the slot goes back on the free list, so an
//! old handle never matches the entity that later reuses its slot:
//!
//! ```text
//! spawn    -> Entity { index: 3, generation: 0 }
//! despawn  -> slot 3 generation becomes 1, slot 3 is free
//! spawn    -> Entity { index: 3, generation: 1 }
//! ```
//!
//! A lookup with the stale `3v0` handle fails instead of returning the new
//! entity's components. Slots are reused last-freed first.
//!
//! ## Comparison
//!
//! hecs and bevy_ecs pack the same pair into one `u64`. Here the two halves
//! stay separate `u32` fields, which keeps `Debug` output readable.

use std::fmt;

/// Identifier of an entity inside one [`World`](super::World).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    /// Slot in the allocator. Reused after despawn.
    pub(crate) index: u32,
    /// How many times the slot was retired before this handle was issued.
    pub(crate) generation: u32,
}

impl Entity {
    /// Slot index. Two live entities never share one.
    pub fn index(self) -> u32 {
        self.index
    }

    /// Generation of the slot when this handle was issued.
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.index, self.generation)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Hands out entity handles and recycles despawned slots.
#[derive(Default)]
pub(crate) struct EntityAllocator {
    /// Current generation of every slot ever handed out.
    generations: Vec<u32>,
    /// Retired slots, popped from the back.
    free: Vec<u32>,
}

impl EntityAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuse the most recently freed slot, or grow by one.
    pub fn allocate(&mut self) -> Entity {
        match self.free.pop() {
            Some(index) => Entity {
                index,
                generation: self.generations[index as usize],
            },
            None => {
                let index = self.generations.len() as u32;
                self.generations.push(0);
                Entity {
                    index,
                    generation: 0,
                }
            }
        }
    }

    /// Retire `entity`. Returns `false` for stale or unknown handles.
    pub fn deallocate(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        let slot = &mut self.generations[entity.index as usize];
        *slot = slot.wrapping_add(1);
        self.free.push(entity.index);
        true
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.generations
            .get(entity.index as usize)
            .is_some_and(|&generation| generation == entity.generation)
    }

    pub fn alive_count(&self) -> usize {
        self.generations.len() - self.free.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_slots_are_sequential() {
        let mut alloc = EntityAllocator::new();
        let a = alloc.allocate();
        let b = alloc.allocate();
        assert_eq!((a.index, a.generation), (0, 0));
        assert_eq!((b.index, b.generation), (1, 0));
    }

    #[test]
    fn recycled_slot_gets_new_generation() {
        let mut alloc = EntityAllocator::new();
        let a = alloc.allocate();
        assert!(alloc.deallocate(a));

        let b = alloc.allocate();
        assert_eq!(b.index, a.index);
        assert_eq!(b.generation, 1);
        assert_ne!(a, b);
        assert!(!alloc.is_alive(a));
        assert!(alloc.is_alive(b));
    }

    #[test]
    fn deallocate_twice_fails() {
        let mut alloc = EntityAllocator::new();
        let a = alloc.allocate();
        assert!(alloc.deallocate(a));
        assert!(!alloc.deallocate(a));
    }

    #[test]
    fn unknown_handle_is_not_alive() {
        let alloc = EntityAllocator::new();
        let ghost = Entity {
            index: 7,
            generation: 0,
        };
        assert!(!alloc.is_alive(ghost));
    }

    #[test]
    fn alive_count_tracks_spawns_and_despawns() {
        let mut alloc = EntityAllocator::new();
        let a = alloc.allocate();
        let _b = alloc.allocate();
        assert_eq!(alloc.alive_count(), 2);
        alloc.deallocate(a);
        assert_eq!(alloc.alive_count(), 1);
        alloc.allocate();
        assert_eq!(alloc.alive_count(), 2);
    }

    #[test]
    fn debug_format_shows_generation() {
        let e = Entity {
            index: 4,
            generation: 2,
        };
        assert_eq!(format!("{e:?}"), "Entity(4v2)");
        assert_eq!(e.to_string(), "4v2");
    }
}
