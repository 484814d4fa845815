//! Undo/Redo history over whole-array snapshots
//!
//! Each entry is the state *before* a committed batch. Undo swaps the current
//! state onto the redo stack and hands back the previous one; redo is the
//! mirror image. A new record clears the redo stack.

#[derive(Debug, Clone)]
pub struct History<T> {
    undo_stack: Vec<T>,
    redo_stack: Vec<T>,
    max_entries: usize,
}

impl<T> History<T> {
    pub fn new(max_entries: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Record the state that a new batch is replacing
    pub fn record(&mut self, previous: T) {
        self.undo_stack.push(previous);
        self.redo_stack.clear();

        // Limit history size
        if self.undo_stack.len() > self.max_entries {
            self.undo_stack.remove(0);
        }
    }

    /// Step back: returns the state to restore, keeping `current` for redo
    pub fn undo(&mut self, current: T) -> Option<T> {
        let previous = self.undo_stack.pop()?;
        self.redo_stack.push(current);
        Some(previous)
    }

    /// Step forward: returns the state to restore, keeping `current` for undo
    pub fn redo(&mut self, current: T) -> Option<T> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push(current);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
