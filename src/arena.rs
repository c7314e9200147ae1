//! Index arena for abstraction cells.
//!
//! Cells are addressed by [`CellId`]. Ids grow monotonically and a retired id is never handed
//! out again, so a reference held across a refinement round either still points at the very
//! same cell or is detectably stale.

use std::fmt::{Display, Formatter};
use std::ops::Index;

/// Identifier of an abstraction cell.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct CellId(u32);

impl CellId {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Return the raw index of the cell.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for CellId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "c{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct Entry<T> {
    value: T,
    retired: bool,
    /// Round in which the cell was allocated.
    born: u32,
}

#[derive(Debug, Clone)]
pub struct CellArena<T> {
    data: Vec<Entry<T>>,
    /// Number of live (non-retired) cells.
    live: usize,
    /// Current refinement round.
    generation: u32,
}

impl<T> Default for CellArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CellArena<T> {
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            live: 0,
            generation: 0,
        }
    }

    /// Total number of ids ever allocated.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }
    /// Number of live cells.
    pub fn len(&self) -> usize {
        self.live
    }
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
    /// Current generation. Bumped by [`CellArena::advance`].
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Allocate a fresh id for the given value.
    pub fn alloc(&mut self, value: T) -> CellId {
        let index = self.data.len();
        assert!(index < u32::MAX as usize, "Arena is full");
        self.data.push(Entry {
            value,
            retired: false,
            born: self.generation,
        });
        self.live += 1;
        CellId(index as u32)
    }

    /// Retire the cell. Its id is never reused.
    ///
    /// Returns `false` if the id was unknown or already retired.
    pub fn retire(&mut self, id: CellId) -> bool {
        match self.data.get_mut(id.index()) {
            Some(entry) if !entry.retired => {
                entry.retired = true;
                self.live -= 1;
                true
            }
            _ => false,
        }
    }

    /// Close the current round; ids allocated afterwards belong to the next generation.
    pub fn advance(&mut self) {
        self.generation += 1;
    }

    pub fn is_live(&self, id: CellId) -> bool {
        self.data.get(id.index()).is_some_and(|e| !e.retired)
    }

    /// Get the live cell, or `None` if the id is retired or was never allocated.
    pub fn get(&self, id: CellId) -> Option<&T> {
        self.data.get(id.index()).filter(|e| !e.retired).map(|e| &e.value)
    }

    /// Generation in which a live cell was allocated.
    pub fn born(&self, id: CellId) -> Option<u32> {
        self.data.get(id.index()).filter(|e| !e.retired).map(|e| e.born)
    }

    /// Live ids in allocation order.
    pub fn ids(&self) -> impl Iterator<Item = CellId> + '_ {
        self.data
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.retired)
            .map(|(i, _)| CellId(i as u32))
    }

    /// Live cells in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (CellId, &T)> + '_ {
        self.data
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.retired)
            .map(|(i, e)| (CellId(i as u32), &e.value))
    }
}

impl<T> Index<CellId> for CellArena<T> {
    type Output = T;

    fn index(&self, id: CellId) -> &Self::Output {
        match self.get(id) {
            Some(value) => value,
            None => panic!("Cell {} is retired or unknown", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_alloc() {
        let mut arena = CellArena::new();
        assert_eq!(arena.alloc('a'), CellId::new(0));
        assert_eq!(arena.alloc('b'), CellId::new(1));
        assert_eq!(arena.alloc('c'), CellId::new(2));
        assert_eq!(arena.len(), 3);
    }

    #[test]
    fn test_retired_ids_are_not_reused() {
        let mut arena = CellArena::new();
        let a = arena.alloc(10);
        let b = arena.alloc(20);
        assert!(arena.retire(a));
        let c = arena.alloc(30);
        assert_ne!(c, a);
        assert_eq!(c, CellId::new(2));
        assert_eq!(arena.get(a), None);
        assert_eq!(arena[b], 20);
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.capacity(), 3);
    }

    #[test]
    fn test_retire_twice() {
        let mut arena = CellArena::new();
        let a = arena.alloc(());
        assert!(arena.retire(a));
        assert!(!arena.retire(a));
        assert!(!arena.retire(CellId::new(7)));
        assert!(arena.is_empty());
    }

    #[test]
    fn test_generations() {
        let mut arena = CellArena::new();
        let a = arena.alloc(1);
        arena.advance();
        let b = arena.alloc(2);
        assert_eq!(arena.generation(), 1);
        assert_eq!(arena.born(a), Some(0));
        assert_eq!(arena.born(b), Some(1));
    }

    #[test]
    fn test_iteration_order() {
        let mut arena = CellArena::new();
        let a = arena.alloc("a");
        let b = arena.alloc("b");
        let c = arena.alloc("c");
        arena.retire(b);
        let ids: Vec<_> = arena.ids().collect();
        assert_eq!(ids, vec![a, c]);
    }

    #[test]
    #[should_panic(expected = "is retired or unknown")]
    fn test_index_retired_panics() {
        let mut arena = CellArena::new();
        let a = arena.alloc(1);
        arena.retire(a);
        let _ = arena[a];
    }
}
