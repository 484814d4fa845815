//! Pointer gesture state machine.
//!
//! A gesture (range drag, fill drag, column resize) spans many discrete
//! input events. Each one is modelled as `Idle -> Active(state) -> Idle`;
//! the host keeps a global pointer tap registered only while
//! [`Gesture::is_active`] is true and drops it on release.

/// Two-state machine carrying the live state of one gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gesture<T> {
    Idle,
    Active(T),
}

impl<T> Default for Gesture<T> {
    fn default() -> Self {
        Gesture::Idle
    }
}

impl<T> Gesture<T> {
    pub fn begin(&mut self, state: T) {
        *self = Gesture::Active(state);
    }

    /// Apply `f` to the live state. Ignored while idle.
    pub fn update(&mut self, f: impl FnOnce(&mut T)) {
        if let Gesture::Active(state) = self {
            f(state);
        }
    }

    /// Finish the gesture, handing back its final state.
    pub fn end(&mut self) -> Option<T> {
        match std::mem::replace(self, Gesture::Idle) {
            Gesture::Active(state) => Some(state),
            Gesture::Idle => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Gesture::Active(_))
    }

    pub fn state(&self) -> Option<&T> {
        match self {
            Gesture::Active(state) => Some(state),
            Gesture::Idle => None,
        }
    }
}
