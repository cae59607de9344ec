//! Fixed-capacity citizen store.
//!
//! Citizens live densely packed in one `Vec` so batches are contiguous
//! slices. A slot table maps stable [`CitizenId`]s to dense indices:
//! creation, removal and lookup are all O(1). Removal swaps the last
//! citizen into the hole, so dense order is not creation order once
//! anything has been removed.

use crate::citizen::{Citizen, CitizenId};
use crate::error::{EngineError, Result};

const VACANT: u32 = u32::MAX;

#[derive(Debug, Clone, Copy)]
struct Slot {
    generation: u32,
    /// Dense index, or `VACANT`.
    dense: u32,
}

/// What a removal did to the dense array.
#[derive(Debug)]
pub struct Removal {
    pub citizen: Citizen,
    /// Dense index the citizen occupied.
    pub index: usize,
    /// Dense index of the citizen moved into `index`, if any.
    pub moved_from: Option<usize>,
}

#[derive(Debug)]
pub struct CitizenStore {
    citizens: Vec<Citizen>,
    /// Dense index -> slot.
    dense_to_slot: Vec<u32>,
    slots: Vec<Slot>,
    free: Vec<u32>,
    capacity: usize,
}

impl CitizenStore {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            citizens: Vec::new(),
            dense_to_slot: Vec::new(),
            slots: Vec::new(),
            free: Vec::new(),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.citizens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.citizens.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Insert a citizen built for the id it is about to receive.
    pub fn insert(&mut self, build: impl FnOnce(CitizenId) -> Citizen) -> Result<CitizenId> {
        if self.len() >= self.capacity {
            return Err(EngineError::Capacity {
                capacity: self.capacity,
            });
        }
        let slot_index = match self.free.pop() {
            Some(s) => s,
            None => {
                let s = u32::try_from(self.slots.len()).map_err(|_| EngineError::Capacity {
                    capacity: self.capacity,
                })?;
                self.slots.push(Slot {
                    generation: 0,
                    dense: VACANT,
                });
                s
            }
        };
        let dense = self.citizens.len() as u32;
        let slot = &mut self.slots[slot_index as usize];
        slot.dense = dense;
        let id = CitizenId::new(slot_index, slot.generation);

        let mut citizen = build(id);
        citizen.id = id;
        self.citizens.push(citizen);
        self.dense_to_slot.push(slot_index);
        Ok(id)
    }

    /// Dense index of a live citizen.
    pub fn index_of(&self, id: CitizenId) -> Result<usize> {
        match self.slots.get(id.slot() as usize) {
            Some(slot) if slot.generation == id.generation() && slot.dense != VACANT => {
                Ok(slot.dense as usize)
            }
            _ => Err(EngineError::NotFound(id)),
        }
    }

    pub fn contains(&self, id: CitizenId) -> bool {
        self.index_of(id).is_ok()
    }

    pub fn get(&self, id: CitizenId) -> Result<&Citizen> {
        let i = self.index_of(id)?;
        Ok(&self.citizens[i])
    }

    pub fn get_mut(&mut self, id: CitizenId) -> Result<&mut Citizen> {
        let i = self.index_of(id)?;
        Ok(&mut self.citizens[i])
    }

    /// Two distinct live citizens, mutably.
    pub fn get_pair_mut(&mut self, a: CitizenId, b: CitizenId) -> Result<(&mut Citizen, &mut Citizen)> {
        let ia = self.index_of(a)?;
        let ib = self.index_of(b)?;
        if ia == ib {
            return Err(EngineError::Configuration(format!(
                "{a} cannot be paired with itself"
            )));
        }
        if ia < ib {
            let (left, right) = self.citizens.split_at_mut(ib);
            Ok((&mut left[ia], &mut right[0]))
        } else {
            let (left, right) = self.citizens.split_at_mut(ia);
            Ok((&mut right[0], &mut left[ib]))
        }
    }

    /// Remove a citizen. Its id never resolves again.
    pub fn remove(&mut self, id: CitizenId) -> Result<Removal> {
        let index = self.index_of(id)?;
        let last = self.citizens.len() - 1;

        let citizen = self.citizens.swap_remove(index);
        self.dense_to_slot.swap_remove(index);

        let moved_from = if index != last {
            let moved_slot = self.dense_to_slot[index];
            self.slots[moved_slot as usize].dense = index as u32;
            Some(last)
        } else {
            None
        };

        let slot = &mut self.slots[id.slot() as usize];
        slot.dense = VACANT;
        slot.generation = slot.generation.wrapping_add(1);
        // A slot whose generation would wrap is retired.
        if slot.generation != u32::MAX {
            self.free.push(id.slot());
        }

        Ok(Removal {
            citizen,
            index,
            moved_from,
        })
    }

    /// Swap two dense positions, keeping ids valid.
    pub fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.citizens.swap(a, b);
        self.dense_to_slot.swap(a, b);
        self.slots[self.dense_to_slot[a] as usize].dense = a as u32;
        self.slots[self.dense_to_slot[b] as usize].dense = b as u32;
    }

    pub fn as_slice(&self) -> &[Citizen] {
        &self.citizens
    }

    pub fn as_mut_slice(&mut self) -> &mut [Citizen] {
        &mut self.citizens
    }

    pub fn iter(&self) -> impl Iterator<Item = &Citizen> {
        self.citizens.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = CitizenId> + '_ {
        self.citizens.iter().map(|c| c.id)
    }

    /// Check that the citizens in `range` are reachable through their ids.
    pub fn verify_range(&self, range: std::ops::Range<usize>) -> Result<()> {
        if self.dense_to_slot.len() != self.citizens.len() {
            return Err(EngineError::StoreCorrupted(format!(
                "{} citizens but {} index entries",
                self.citizens.len(),
                self.dense_to_slot.len()
            )));
        }
        for i in range {
            let Some(c) = self.citizens.get(i) else {
                break;
            };
            let slot_index = self.dense_to_slot[i];
            let ok = self
                .slots
                .get(slot_index as usize)
                .map(|s| s.dense as usize == i && c.id == CitizenId::new(slot_index, s.generation))
                .unwrap_or(false);
            if !ok {
                return Err(EngineError::StoreCorrupted(format!(
                    "dense index {i} ({}) does not round-trip through its slot",
                    c.id
                )));
            }
        }
        Ok(())
    }

    /// Full consistency check.
    pub fn verify(&self) -> Result<()> {
        self.verify_range(0..self.citizens.len())?;
        let live = self.slots.iter().filter(|s| s.dense != VACANT).count();
        if live != self.citizens.len() {
            return Err(EngineError::StoreCorrupted(format!(
                "{live} live slots for {} citizens",
                self.citizens.len()
            )));
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn corrupt_for_test(&mut self) {
        if let Some(first) = self.citizens.first_mut() {
            first.id = CitizenId::new(u32::MAX - 1, 0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citizen::Location;
    use civsim_logic::schedule::Occupation;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn store_with(n: usize, capacity: usize) -> (CitizenStore, Vec<CitizenId>) {
        let mut store = CitizenStore::with_capacity(capacity);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let ids = (0..n)
            .map(|i| {
                store
                    .insert(|id| {
                        Citizen::new(
                            id,
                            Location::new(i as f32, 0.0),
                            30,
                            Occupation::Office,
                            0.0,
                            525_600.0,
                            &mut rng,
                        )
                    })
                    .unwrap()
            })
            .collect();
        (store, ids)
    }

    #[test]
    fn test_insert_and_lookup() {
        let (store, ids) = store_with(5, 10);
        assert_eq!(store.len(), 5);
        for (i, id) in ids.iter().enumerate() {
            assert_eq!(store.get(*id).unwrap().home.x, i as f32);
        }
        assert!(store.verify().is_ok());
    }

    #[test]
    fn test_capacity_is_enforced() {
        let (mut store, _) = store_with(3, 3);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let err = store
            .insert(|id| {
                Citizen::new(id, Location::default(), 30, Occupation::Office, 0.0, 1.0, &mut rng)
            })
            .unwrap_err();
        assert!(matches!(err, EngineError::Capacity { capacity: 3 }));
    }

    #[test]
    fn test_stale_id_after_reuse() {
        let (mut store, ids) = store_with(3, 3);
        store.remove(ids[1]).unwrap();
        assert!(matches!(store.get(ids[1]), Err(EngineError::NotFound(_))));

        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let reused = store
            .insert(|id| {
                Citizen::new(id, Location::default(), 30, Occupation::Office, 0.0, 1.0, &mut rng)
            })
            .unwrap();
        assert_eq!(reused.slot(), ids[1].slot());
        assert_ne!(reused, ids[1]);
        assert!(store.get(ids[1]).is_err());
        assert!(store.get(reused).is_ok());
    }

    #[test]
    fn test_removal_swaps_last_into_hole() {
        let (mut store, ids) = store_with(4, 10);
        let removal = store.remove(ids[1]).unwrap();
        assert_eq!(removal.index, 1);
        assert_eq!(removal.moved_from, Some(3));
        assert_eq!(store.index_of(ids[3]).unwrap(), 1);
        assert!(store.verify().is_ok());

        let tail = store.remove(ids[2]).unwrap();
        assert_eq!(tail.moved_from, None);
        assert!(store.verify().is_ok());
    }

    #[test]
    fn test_swap_keeps_ids_valid() {
        let (mut store, ids) = store_with(4, 10);
        store.swap(0, 3);
        assert_eq!(store.index_of(ids[0]).unwrap(), 3);
        assert_eq!(store.index_of(ids[3]).unwrap(), 0);
        assert!(store.verify().is_ok());
    }

    #[test]
    fn test_pair_access() {
        let (mut store, ids) = store_with(3, 10);
        let (a, b) = store.get_pair_mut(ids[2], ids[0]).unwrap();
        assert_eq!(a.id, ids[2]);
        assert_eq!(b.id, ids[0]);
        assert!(store.get_pair_mut(ids[1], ids[1]).is_err());
    }

    #[test]
    fn test_corruption_is_detected() {
        let (mut store, _) = store_with(2, 10);
        store.corrupt_for_test();
        assert!(matches!(store.verify(), Err(EngineError::StoreCorrupted(_))));
    }
}
