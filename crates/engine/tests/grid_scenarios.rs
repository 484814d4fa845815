use std::cell::RefCell;
use std::rc::Rc;

use celltable_config::GridSettings;
use celltable_engine::column::{ColumnDef, ColumnKind, SelectOption};
use celltable_engine::events::{ChangeMeta, MutationKind};
use celltable_engine::keymap::{Key, KeyInput};
use celltable_engine::model::{CellUpdate, TableModel};
use celltable_engine::options::OptionFetchError;
use celltable_engine::{CellPos, CellValue, Grid, Row};

type Changes = Rc<RefCell<Vec<(Vec<Row>, ChangeMeta)>>>;

fn record_changes(grid: &mut Grid) -> Changes {
    let log: Changes = Rc::default();
    let sink = log.clone();
    grid.on_change(move |rows, meta| {
        sink.borrow_mut().push((rows.iter().map(|r| Row::clone(r)).collect(), meta));
    });
    log
}

fn snapshot(grid: &Grid) -> Vec<Row> {
    grid.model().raw_rows().iter().map(|r| Row::clone(r)).collect()
}

fn pantry() -> Grid {
    Grid::new(
        vec![
            ColumnDef::new("name", "Name"),
            ColumnDef::new("group", "Group"),
        ],
        vec![
            Row::from_pairs([("id", "1"), ("name", "Rice"), ("group", "food")]),
            Row::from_pairs([("id", "2"), ("name", "Eggs"), ("group", "food")]),
            Row::from_pairs([("id", "3"), ("name", "Phone"), ("group", "tech")]),
        ],
        &GridSettings::default(),
    )
}

fn select_range(grid: &mut Grid, from: (usize, usize), to: (usize, usize)) {
    grid.click_cell(from.0, from.1);
    grid.drag_enter(to.0, to.1);
    grid.pointer_released();
}

// -------------------------------------------------------------------------
// Row auto-provisioning
// -------------------------------------------------------------------------

#[test]
fn trailing_blank_row_grows_with_typing() {
    let mut grid = pantry();
    assert_eq!(grid.row_count(), 4);

    grid.click_cell(3, 0);
    grid.start_edit(Some("T".into()));
    grid.set_draft("Tea");
    assert!(grid.handle_key(KeyInput::new(Key::Enter)));

    assert_eq!(grid.get_value(3, 0), "Tea");
    assert_eq!(grid.row_count(), 5);
    assert_eq!(grid.get_value(4, 0), "");
    assert_eq!(grid.active(), CellPos::new(4, 0));
}

#[test]
fn cancelled_edit_on_blank_row_leaves_one_blank() {
    let mut grid = pantry();
    grid.click_cell(3, 0);
    grid.start_edit(None);
    // the pinned row no longer counts as blank
    assert_eq!(grid.row_count(), 5);

    grid.handle_key(KeyInput::new(Key::Escape));
    assert!(!grid.is_editing());
    assert_eq!(grid.row_count(), 4);
}

#[test]
fn empty_input_gets_single_blank_row() {
    let grid = Grid::new(vec![ColumnDef::new("name", "Name")], Vec::new(), &GridSettings::default());
    assert_eq!(grid.row_count(), 1);
    assert_eq!(grid.get_value(0, 0), "");
}

// -------------------------------------------------------------------------
// History
// -------------------------------------------------------------------------

#[test]
fn undo_and_redo_restore_exact_rows() {
    let mut grid = pantry();
    let changes = record_changes(&mut grid);
    let before = snapshot(&grid);

    select_range(&mut grid, (0, 0), (1, 1));
    assert!(grid.paste("A\tB\nC\tD", None));
    let after = snapshot(&grid);

    assert!(grid.undo());
    assert_eq!(snapshot(&grid), before);
    assert!(grid.redo());
    assert_eq!(snapshot(&grid), after);

    let kinds: Vec<MutationKind> = changes.borrow().iter().map(|(_, m)| m.kind).collect();
    assert_eq!(kinds, vec![MutationKind::Paste, MutationKind::Undo, MutationKind::Redo]);
    assert_eq!(changes.borrow()[1].0, before);
}

#[test]
fn undo_of_typing_into_blank_row_keeps_one_blank() {
    let mut grid = Grid::new(
        vec![ColumnDef::new("name", "Name")],
        vec![Row::from_pairs([("id", "1"), ("name", "Rice")])],
        &GridSettings::default(),
    );
    let changes = record_changes(&mut grid);

    grid.click_cell(1, 0);
    grid.start_edit(Some("Tea".into()));
    assert!(grid.commit_edit());
    assert_eq!(grid.row_count(), 3);

    grid.click_cell(2, 0);
    assert!(grid.undo());
    assert_eq!(grid.row_count(), 2);
    assert_eq!(grid.get_value(1, 0), "");
    assert_eq!(changes.borrow().last().map(|(rows, _)| rows.len()), Some(2));
    assert_eq!(grid.active(), CellPos::new(1, 0));

    assert!(grid.redo());
    assert_eq!(grid.row_count(), 3);
    assert_eq!(grid.get_value(1, 0), "Tea");
}

#[test]
fn keyboard_undo_chords() {
    let mut grid = pantry();
    grid.click_cell(0, 0);
    grid.handle_key(KeyInput::new(Key::Delete));
    assert_eq!(grid.get_value(0, 0), "");

    grid.handle_key(KeyInput::new(Key::Char('z')).ctrl());
    assert_eq!(grid.get_value(0, 0), "Rice");
    grid.handle_key(KeyInput::new(Key::Char('y')).ctrl());
    assert_eq!(grid.get_value(0, 0), "");
}

// -------------------------------------------------------------------------
// Validation
// -------------------------------------------------------------------------

#[test]
fn number_error_appears_and_clears() {
    let mut model = TableModel::new(
        vec![ColumnDef::new("qty", "Qty").kind(ColumnKind::Number)],
        vec![Row::from_pairs([("qty", "abc")])],
        &GridSettings::default(),
    );
    model.update_cells(&[CellUpdate::new(0, 0, "abc")], MutationKind::Edit);
    assert!(model.has_error(0, 0));
    assert_eq!(model.get_error(0, 0), Some("Must be a number"));

    model.update_cells(&[CellUpdate::new(0, 0, "5")], MutationKind::Edit);
    assert!(!model.has_error(0, 0));
}

fn subgroup_grid() -> Grid {
    Grid::new(
        vec![
            ColumnDef::new("group", "Group"),
            ColumnDef::new("subgroup", "Subgroup")
                .kind(ColumnKind::Select)
                .depends_on("group")
                .fetcher(|row| {
                    let group = row.text("group");
                    Box::pin(async move {
                        match group.as_str() {
                            "food" => Ok(vec![
                                SelectOption::new("fruits", "Fruits"),
                                SelectOption::new("snacks", "Snacks"),
                            ]),
                            other => Err(OptionFetchError::Unavailable(other.to_string())),
                        }
                    })
                }),
        ],
        vec![Row::from_pairs([("id", "1"), ("group", "food"), ("subgroup", "")])],
        &GridSettings::default(),
    )
}

fn drain_loads(grid: &mut Grid) -> usize {
    let loads = grid.take_option_loads();
    let n = loads.len();
    for load in loads {
        smol::block_on(load);
    }
    n
}

#[test]
fn select_label_normalizes_and_bogus_is_flagged() {
    let mut grid = subgroup_grid();

    grid.click_cell(0, 1);
    grid.start_edit(None);
    assert!(grid.is_loading_options());
    assert_eq!(drain_loads(&mut grid), 1);
    assert_eq!(grid.select_options_for_active().len(), 2);

    grid.set_draft("Snacks");
    assert!(grid.commit_edit());
    assert_eq!(grid.get_value(0, 1), "snacks");
    assert!(!grid.has_error(0, 1));

    grid.start_edit(None);
    // cached: no second fetch
    assert_eq!(drain_loads(&mut grid), 0);
    grid.set_draft("bogus");
    grid.commit_edit();
    assert_eq!(grid.get_value(0, 1), "bogus");
    assert_eq!(grid.get_error(0, 1), Some("Invalid option"));
    assert_eq!(grid.error_list().len(), 1);
}

#[test]
fn select_menu_filters_by_draft() {
    let mut grid = subgroup_grid();
    grid.open_select(0, 1);
    drain_loads(&mut grid);
    grid.set_draft("fru");
    let menu: Vec<String> = grid.select_menu().into_iter().map(|o| o.value).collect();
    assert_eq!(menu, vec!["fruits"]);

    assert!(grid.commit_with("fruits"));
    assert_eq!(grid.get_value(0, 1), "fruits");
}

#[test]
fn failed_option_fetch_does_not_stick_loading() {
    let mut grid = subgroup_grid();
    grid.click_cell(0, 0);
    grid.start_edit(Some("misc".into()));
    grid.commit_edit();

    grid.click_cell(0, 1);
    grid.start_edit(None);
    drain_loads(&mut grid);
    assert!(!grid.is_loading_options());
    assert!(grid.select_options_for_active().is_empty());

    // unresolved list: the value is kept without an option error
    grid.set_draft("anything");
    grid.commit_edit();
    assert!(!grid.has_error(0, 1));
}

// -------------------------------------------------------------------------
// Clipboard
// -------------------------------------------------------------------------

#[test]
fn singleton_paste_tiles_over_selection() {
    let mut grid = pantry();
    select_range(&mut grid, (0, 0), (2, 0));
    assert!(grid.paste("x", None));
    for r in 0..3 {
        assert_eq!(grid.get_value(r, 0), "x");
    }
    assert_eq!(grid.get_value(0, 1), "food");
}

#[test]
fn paste_past_the_end_grows_rows() {
    let mut grid = pantry();
    grid.click_cell(2, 0);
    assert!(grid.paste("a\nb\nc\n", None));
    assert_eq!(grid.get_value(4, 0), "c");
    assert_eq!(grid.row_count(), 6);
}

#[test]
fn html_payload_used_for_scalar_text() {
    let mut grid = pantry();
    grid.click_cell(0, 0);
    let html = "<table><tr><td>Oats</td><td>grain</td></tr></table>";
    assert!(grid.paste("Oats", Some(html)));
    assert_eq!(grid.get_value(0, 1), "grain");
}

#[test]
fn copy_selection_as_tsv() {
    let mut grid = pantry();
    select_range(&mut grid, (0, 0), (1, 1));
    assert_eq!(grid.copy().as_deref(), Some("Rice\tfood\nEggs\tfood"));
    assert_eq!(grid.copied_bounds().map(|b| b.cell_count()), Some(4));

    grid.handle_key(KeyInput::new(Key::ArrowDown));
    assert_eq!(grid.copied_bounds(), None);
}

// -------------------------------------------------------------------------
// Fill handle
// -------------------------------------------------------------------------

#[test]
fn fill_tiles_a_two_by_two_block() {
    let mut grid = Grid::new(
        vec![ColumnDef::new("a", "A"), ColumnDef::new("b", "B")],
        vec![
            Row::from_pairs([("a", "1"), ("b", "2")]),
            Row::from_pairs([("a", "3"), ("b", "4")]),
        ],
        &GridSettings::default(),
    );
    let changes = record_changes(&mut grid);

    select_range(&mut grid, (0, 0), (1, 1));
    grid.start_fill(1, 1);
    grid.drag_enter(5, 1);
    assert!(grid.is_preview(5, 0));
    grid.pointer_released();

    let rows: Vec<[String; 2]> = (2..6).map(|r| [grid.get_value(r, 0), grid.get_value(r, 1)]).collect();
    assert_eq!(rows, vec![["1", "2"], ["3", "4"], ["1", "2"], ["3", "4"]]);

    let log = changes.borrow();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].1, ChangeMeta { kind: MutationKind::Fill, cell: CellPos::new(1, 1) });
    assert_eq!(grid.selection_bounds().map(|b| (b.r2, b.c2)), Some((5, 1)));
}

#[test]
fn fill_into_select_column_canonicalizes() {
    let mut grid = Grid::new(
        vec![ColumnDef::new("city", "City")
            .kind(ColumnKind::Select)
            .options(vec![SelectOption::new("tokyo", "Tokyo")])],
        vec![
            Row::from_pairs([("city", "Tokyo")]),
            Row::from_pairs([("city", "")]),
        ],
        &GridSettings::default(),
    );
    grid.start_fill(0, 0);
    grid.fill_drag(1, 0);
    assert!(grid.fill_release());
    assert_eq!(grid.get_value(1, 0), "tokyo");
    assert!(!grid.has_error(1, 0));
}

// -------------------------------------------------------------------------
// Filters and groups
// -------------------------------------------------------------------------

#[test]
fn filtered_edits_land_on_raw_rows() {
    let mut grid = pantry();
    grid.toggle_filter_value("group", "food");
    assert_eq!(grid.row_count(), 2);
    assert_eq!(grid.get_value(0, 0), "Phone");

    grid.click_cell(0, 0);
    grid.start_edit(None);
    grid.set_draft("Laptop");
    grid.commit_edit();
    assert_eq!(grid.model().raw_rows()[2].text("name"), "Laptop");

    grid.toggle_filter_value("group", "food");
    assert!(grid.is_filter_all_checked("group"));
    assert_eq!(grid.row_count(), 4);
}

#[test]
fn filter_search_narrows_while_open() {
    let mut grid = pantry();
    grid.open_filter("name");
    grid.set_filter_search("e");
    assert_eq!(grid.filter_options("name"), vec!["Eggs", "Phone", "Rice"]);
    assert_eq!(grid.row_count(), 3);

    grid.set_filter_search("gg");
    assert_eq!(grid.row_count(), 1);

    // clicking into the grid closes the menu and drops the search
    grid.click_cell(0, 0);
    assert_eq!(grid.row_count(), 4);
}

#[test]
fn collapsed_group_reads_blank_and_skips_writes() {
    let mut grid = Grid::new(
        vec![
            ColumnDef::new("name", "Name").group("User"),
            ColumnDef::new("email", "Email").group("User"),
            ColumnDef::new("city", "City"),
        ],
        vec![Row::from_pairs([("name", "Ann"), ("email", "a@x"), ("city", "Oslo")])],
        &GridSettings::default(),
    );
    grid.toggle_group("User");
    assert_eq!(grid.col_count(), 2);
    assert_eq!(grid.get_value(0, 0), "");
    assert_eq!(grid.col_width(0), 56.0);

    grid.click_cell(0, 0);
    grid.paste("z\tBergen", None);
    assert_eq!(grid.get_value(0, 1), "Bergen");
    assert_eq!(grid.model().raw_rows()[0].text("name"), "Ann");

    grid.toggle_group("User");
    assert_eq!(grid.get_value(0, 0), "Ann");
}

// -------------------------------------------------------------------------
// Keyboard and modes
// -------------------------------------------------------------------------

#[test]
fn shift_arrows_extend_and_delete_clears() {
    let mut grid = Grid::new(
        vec![
            ColumnDef::new("name", "Name"),
            ColumnDef::new("done", "Done").kind(ColumnKind::Checkbox),
        ],
        vec![
            Row::from_pairs([("id", "1"), ("name", "Rice")]).with("done", true.into()),
            Row::from_pairs([("id", "2"), ("name", "Eggs")]).with("done", false.into()),
        ],
        &GridSettings::default(),
    );
    grid.click_cell(0, 0);
    grid.handle_key(KeyInput::new(Key::ArrowDown).shift());
    grid.handle_key(KeyInput::new(Key::ArrowRight).shift());
    assert_eq!(grid.selection_bounds().map(|b| b.cell_count()), Some(4));

    grid.handle_key(KeyInput::new(Key::Backspace));
    let first = &grid.model().raw_rows()[0];
    assert_eq!(first.get("done"), Some(&CellValue::Bool(false)));
    assert!(!grid.has_error(0, 1));
    assert_eq!(grid.row_count(), 1);
    assert_eq!(grid.selection_bounds(), None);
    assert_eq!(grid.active(), CellPos::new(0, 1));

    grid.paste("Tea", None);
    assert_eq!(grid.row_count(), 1);
}

#[test]
fn checkbox_toggle_is_one_edit() {
    let mut grid = Grid::new(
        vec![ColumnDef::new("done", "Done").kind(ColumnKind::Checkbox)],
        vec![Row::from_pairs([("id", "1")]).with("done", false.into())],
        &GridSettings::default(),
    );
    assert!(grid.toggle_checkbox(0, 0));
    assert_eq!(grid.get_value(0, 0), "true");
    assert!(grid.can_undo());
    assert!(!grid.toggle_checkbox(5, 0));
}

#[test]
fn read_only_blocks_mutation() {
    let settings = GridSettings { read_only: true, ..GridSettings::default() };
    let mut grid = Grid::new(
        vec![ColumnDef::new("name", "Name")],
        vec![Row::from_pairs([("name", "Rice")])],
        &settings,
    );
    assert!(!grid.start_edit(None));
    assert!(!grid.paste("x", None));
    assert!(!grid.clear_range());
    grid.handle_key(KeyInput::new(Key::Char('q')));
    assert!(!grid.is_editing());
    assert_eq!(grid.get_value(0, 0), "Rice");
    assert_eq!(grid.copy().as_deref(), Some("Rice"));
}

#[test]
fn typing_seeds_the_editor() {
    let mut grid = pantry();
    grid.click_cell(1, 0);
    grid.handle_key(KeyInput::new(Key::Char('B')));
    let editor = grid.editor().cloned().unwrap();
    assert_eq!(editor.draft, "B");
    assert!(!editor.select_all);

    grid.set_draft("Beans");
    grid.handle_key(KeyInput::new(Key::Tab));
    assert_eq!(grid.get_value(1, 0), "Beans");
    assert_eq!(grid.active(), CellPos::new(1, 1));
}

#[test]
fn replace_rows_resets_history() {
    let mut grid = pantry();
    grid.click_cell(0, 0);
    grid.handle_key(KeyInput::new(Key::Delete));
    assert!(grid.can_undo());

    grid.replace_rows(vec![Row::from_pairs([("name", "Milk")])]);
    assert!(!grid.can_undo());
    assert_eq!(grid.row_count(), 2);
}
