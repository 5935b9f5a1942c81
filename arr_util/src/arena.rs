//! A per-query arena for bounded-lifetime intermediate data (§9 redesign
//! note: "custom arena allocators + boost-container maps" become a typed
//! bump arena plus arena-backed containers). Handles are indices, not
//! pointers, so the arena itself can be dropped as a unit when a query
//! finishes without having to track individual frees.
use std::fmt;
use std::marker::PhantomData;

/// A handle into an [`Arena<T>`]. Cheap to copy, invalid once the arena that
/// produced it is dropped.
pub struct Handle<T> {
    index: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handle").field(&self.index).finish()
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Handle<T> {}
impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}
impl<T> Eq for Handle<T> {}

/// Bounded-lifetime bump allocator: values are pushed in, never individually
/// freed, and the whole arena is reclaimed when a query's working set is
/// released. Used by `extsort` for intermediate tuple storage and by
/// `RowCollection` for per-group row buffers.
#[derive(Debug)]
pub struct Arena<T> {
    items: Vec<T>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            items: Vec::with_capacity(cap),
        }
    }

    pub fn alloc(&mut self, value: T) -> Handle<T> {
        let index = self.items.len() as u32;
        self.items.push(value);
        Handle {
            index,
            _marker: PhantomData,
        }
    }

    pub fn get(&self, handle: Handle<T>) -> &T {
        &self.items[handle.index as usize]
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> &mut T {
        &mut self.items[handle.index as usize]
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Approximate memory footprint, used by `extsort`'s `TupleArray` to
    /// decide when `memLimit` has been reached.
    pub fn byte_size(&self) -> usize {
        self.items.len() * std::mem::size_of::<T>()
    }
}
