//! Key dispatch
//!
//! Maps already-interpreted key presses to grid commands. Two tables: one
//! for the grid while navigating, one for the cell editor while it is open.

use celltable_core::CellPos;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl on Linux/Windows, Cmd on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Tab,
    Enter,
    Escape,
    F2,
    Home,
    End,
    Backspace,
    Delete,
    Char(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub key: Key,
    pub mods: Modifiers,
}

impl KeyInput {
    pub fn new(key: Key) -> Self {
        Self { key, mods: Modifiers::default() }
    }

    pub fn shift(mut self) -> Self {
        self.mods.shift = true;
        self
    }

    pub fn ctrl(mut self) -> Self {
        self.mods.ctrl = true;
        self
    }
}

/// What the grid should do with a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridCommand {
    Move { dr: isize, dc: isize },
    MoveTo(CellPos),
    /// Grow the selection from the active cell, moving the active cell.
    Extend { dr: isize, dc: isize },
    /// Open the editor, optionally seeded with typed text.
    StartEdit(Option<String>),
    Clear,
    Undo,
    Redo,
    /// Remember the copied area; the host reads the text separately.
    MarkCopy,
}

/// Grid size and position the table needs for edge jumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyContext {
    pub active: CellPos,
    pub rows: usize,
    pub cols: usize,
}

impl KeyContext {
    fn last_row(&self) -> usize {
        self.rows.saturating_sub(1)
    }

    fn last_col(&self) -> usize {
        self.cols.saturating_sub(1)
    }
}

/// Navigation-mode key table.
pub fn dispatch(input: KeyInput, ctx: KeyContext) -> Option<GridCommand> {
    let KeyInput { key, mods } = input;
    let cmd = mods.command();
    let a = ctx.active;

    let arrow = |dr: isize, dc: isize, edge: CellPos| {
        if mods.shift {
            GridCommand::Extend { dr, dc }
        } else if cmd {
            GridCommand::MoveTo(edge)
        } else {
            GridCommand::Move { dr, dc }
        }
    };

    let command = match key {
        Key::Char(ch) if cmd => match ch.to_ascii_lowercase() {
            'z' if mods.shift => GridCommand::Redo,
            'z' => GridCommand::Undo,
            'y' => GridCommand::Redo,
            'c' => GridCommand::MarkCopy,
            _ => return None,
        },
        Key::ArrowUp => arrow(-1, 0, CellPos::new(0, a.c)),
        Key::ArrowDown => arrow(1, 0, CellPos::new(ctx.last_row(), a.c)),
        Key::ArrowLeft => arrow(0, -1, CellPos::new(a.r, 0)),
        Key::ArrowRight => arrow(0, 1, CellPos::new(a.r, ctx.last_col())),
        Key::Tab => GridCommand::Move { dr: 0, dc: if mods.shift { -1 } else { 1 } },
        Key::Enter | Key::F2 => GridCommand::StartEdit(None),
        Key::Home if cmd => GridCommand::MoveTo(CellPos::new(0, 0)),
        Key::Home => GridCommand::MoveTo(CellPos::new(a.r, 0)),
        Key::End if cmd => GridCommand::MoveTo(CellPos::new(ctx.last_row(), ctx.last_col())),
        Key::End => GridCommand::MoveTo(CellPos::new(a.r, ctx.last_col())),
        Key::Backspace | Key::Delete => GridCommand::Clear,
        Key::Char(ch) if !mods.alt && !ch.is_control() => GridCommand::StartEdit(Some(ch.to_string())),
        Key::Char(_) | Key::Escape => return None,
    };
    Some(command)
}

/// What the open editor should do with a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorAction {
    /// Commit the draft, then move the active cell.
    Commit { dr: isize, dc: isize },
    Cancel,
}

/// Editor-mode key table. Keys not listed belong to the text input.
pub fn editor_dispatch(input: KeyInput) -> Option<EditorAction> {
    let step = if input.mods.shift { -1 } else { 1 };
    match input.key {
        Key::Enter => Some(EditorAction::Commit { dr: step, dc: 0 }),
        Key::Tab => Some(EditorAction::Commit { dr: 0, dc: step }),
        Key::Escape => Some(EditorAction::Cancel),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> KeyContext {
        KeyContext { active: CellPos::new(2, 1), rows: 5, cols: 4 }
    }

    fn press(input: KeyInput) -> Option<GridCommand> {
        dispatch(input, ctx())
    }

    #[test]
    fn test_arrows() {
        assert_eq!(press(KeyInput::new(Key::ArrowUp)), Some(GridCommand::Move { dr: -1, dc: 0 }));
        assert_eq!(
            press(KeyInput::new(Key::ArrowDown).ctrl()),
            Some(GridCommand::MoveTo(CellPos::new(4, 1)))
        );
        assert_eq!(
            press(KeyInput::new(Key::ArrowRight).shift()),
            Some(GridCommand::Extend { dr: 0, dc: 1 })
        );
    }

    #[test]
    fn test_home_end() {
        assert_eq!(press(KeyInput::new(Key::Home)), Some(GridCommand::MoveTo(CellPos::new(2, 0))));
        assert_eq!(press(KeyInput::new(Key::End).ctrl()), Some(GridCommand::MoveTo(CellPos::new(4, 3))));
    }

    #[test]
    fn test_undo_redo_chords() {
        assert_eq!(press(KeyInput::new(Key::Char('z')).ctrl()), Some(GridCommand::Undo));
        assert_eq!(press(KeyInput::new(Key::Char('Z')).ctrl().shift()), Some(GridCommand::Redo));
        assert_eq!(press(KeyInput::new(Key::Char('y')).ctrl()), Some(GridCommand::Redo));
        assert_eq!(press(KeyInput::new(Key::Char('c')).ctrl()), Some(GridCommand::MarkCopy));
        assert_eq!(press(KeyInput::new(Key::Char('q')).ctrl()), None);
    }

    #[test]
    fn test_typing_starts_edit() {
        assert_eq!(press(KeyInput::new(Key::Char('7'))), Some(GridCommand::StartEdit(Some("7".into()))));
        assert_eq!(press(KeyInput::new(Key::F2)), Some(GridCommand::StartEdit(None)));
        assert_eq!(press(KeyInput::new(Key::Delete)), Some(GridCommand::Clear));
        assert_eq!(press(KeyInput::new(Key::Escape)), None);
    }

    #[test]
    fn test_tab_direction() {
        assert_eq!(press(KeyInput::new(Key::Tab).shift()), Some(GridCommand::Move { dr: 0, dc: -1 }));
    }

    #[test]
    fn test_editor_keys() {
        assert_eq!(
            editor_dispatch(KeyInput::new(Key::Enter).shift()),
            Some(EditorAction::Commit { dr: -1, dc: 0 })
        );
        assert_eq!(editor_dispatch(KeyInput::new(Key::Tab)), Some(EditorAction::Commit { dr: 0, dc: 1 }));
        assert_eq!(editor_dispatch(KeyInput::new(Key::Escape)), Some(EditorAction::Cancel));
        assert_eq!(editor_dispatch(KeyInput::new(Key::Char('a'))), None);
    }
}
