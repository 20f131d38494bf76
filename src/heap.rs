//! The process-wide reference heap.
//!
//! An append-only table of integer arrays addressable by a stable handle.
//! Handles are issued monotonically from zero and never reused: there is no
//! reference counting and no tracing collector. The run is short and its
//! lifetime bounded, so simplicity wins over reclamation.

use tracing::trace;

/// A heap-allocated one-dimensional array of 32-bit signed integers.
///
/// Element `0` is the array's length; `elements[i + 1]` is logical index
/// `i` (the length is stored inline rather than kept out of band).
#[derive(Debug, Clone)]
pub struct HeapArray {
    elements: Vec<i32>,
}

impl HeapArray {
    /// Allocates a zero-initialized int array of the given length.
    ///
    /// Panics if `length` is negative, rather than relying on an
    /// allocator's own assertion to catch it downstream.
    pub fn new(length: i32) -> Self {
        assert!(length >= 0, "negative array length: {length}");
        let mut elements = Vec::with_capacity(length as usize + 1);
        elements.push(length);
        elements.resize(length as usize + 1, 0);
        HeapArray { elements }
    }

    pub fn length(&self) -> i32 {
        self.elements[0]
    }

    pub fn load(&self, index: i32) -> i32 {
        self.elements[(index + 1) as usize]
    }

    pub fn store(&mut self, index: i32, value: i32) {
        self.elements[(index + 1) as usize] = value;
    }
}

/// A stable integer naming an array owned by the [`Heap`].
pub type Handle = i32;

/// The append-only, never-freed table of [`HeapArray`]s.
#[derive(Debug, Default)]
pub struct Heap {
    arrays: Vec<HeapArray>,
}

impl Heap {
    pub fn new() -> Self {
        Heap { arrays: Vec::new() }
    }

    /// Appends `array` to the table and returns its handle. Always
    /// succeeds (barring allocation failure).
    pub fn add(&mut self, array: HeapArray) -> Handle {
        let handle = self.arrays.len() as Handle;
        trace!(handle, length = array.length(), "heap: array allocated");
        self.arrays.push(array);
        handle
    }

    /// Returns the backing array for `handle`. Unchecked: every reference
    /// value in play is either the sentinel zero or a handle this heap
    /// issued, so an unissued handle here is a caller error.
    pub fn get(&self, handle: Handle) -> &HeapArray {
        &self.arrays[handle as usize]
    }

    pub fn get_mut(&mut self, handle: Handle) -> &mut HeapArray {
        &mut self.arrays[handle as usize]
    }

    /// Releases every stored array and the table itself. Called once at
    /// program teardown; invalidates all handles.
    pub fn free(self) {
        drop(self);
    }
}
