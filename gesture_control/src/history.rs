//! Fixed-capacity label history for gesture debouncing.
//!
//! A ring buffer with O(1) push and eviction. A gesture is declared stable
//! only when the window is FULL and every slot agrees; one misclassified
//! frame anywhere in the window vetoes the whole thing.

use hand_stream::GestureLabel;

pub struct GestureHistory {
    slots: Box<[GestureLabel]>,
    /// Next write position.
    head: usize,
    len: usize,
}

impl GestureHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        GestureHistory {
            slots: vec![GestureLabel::None; capacity].into_boxed_slice(),
            head: 0,
            len: 0,
        }
    }

    /// Append a label, evicting the oldest when full.
    pub fn push(&mut self, label: GestureLabel) {
        self.slots[self.head] = label;
        self.head = (self.head + 1) % self.slots.len();
        self.len = (self.len + 1).min(self.slots.len());
    }

    pub fn clear(&mut self) {
        self.len = 0;
        self.head = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// The single label filling the window, if the window is full and
    /// homogeneous. Anything less returns `None`.
    pub fn unanimous(&self) -> Option<GestureLabel> {
        if !self.is_full() {
            return None;
        }
        let first = self.slots[0];
        if self.slots.iter().all(|l| *l == first) {
            Some(first)
        } else {
            None
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
