use alloc::vec::Vec;

use super::handle::Handle;

/// A slot arena handing out stable [`Handle`]s.
///
/// The tree never deletes individual nodes or values (key removal is not part
/// of this design), so there is no free list: slots are only vacated by
/// [`Arena::take`] when the whole structure is being drained, and reclaimed
/// wholesale by [`Arena::clear`].
pub(crate) struct Arena<T> {
    slots: Vec<Option<T>>,
}

impl<T> Arena<T> {
    pub(crate) const fn new() -> Self {
        Self { slots: Vec::new() }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    pub(crate) fn alloc(&mut self, element: T) -> Handle {
        // Strict less-than so the new slot's index stays within Handle range.
        assert!(
            self.slots.len() < Handle::MAX,
            "`Arena::alloc()` - arena is at maximum capacity ({})",
            Handle::MAX
        );
        self.slots.push(Some(element));
        Handle::from_index(self.slots.len() - 1)
    }

    #[inline]
    pub(crate) fn get(&self, handle: Handle) -> &T {
        self.slots[handle.to_index()].as_ref().expect("`Arena::get()` - `handle` is invalid!")
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, handle: Handle) -> &mut T {
        self.slots[handle.to_index()].as_mut().expect("`Arena::get_mut()` - `handle` is invalid!")
    }

    pub(crate) fn take(&mut self, handle: Handle) -> T {
        self.slots[handle.to_index()].take().expect("`Arena::take()` - `handle` is invalid!")
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
    }
}
