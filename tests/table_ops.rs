use std::fs;

use pipetable::config::EngineConfig;
use pipetable::editor::EditorBuffer;
use pipetable::outline::SortKey;
use pipetable::session::{MemoryClipboard, Session};
use pipetable::table::{
    ExportFormat, HorizontalDirection, RowSortKind, Syntax, Table, VerticalDirection, export,
    import,
};

fn open(path: &std::path::Path, line: usize, col: usize) -> Session {
    let text = fs::read_to_string(path).unwrap();
    let mut buffer = EditorBuffer::from_text(&text);
    buffer.move_to(line, col);
    Session::new(
        buffer,
        Syntax::for_path(path),
        EngineConfig::default(),
        Box::new(MemoryClipboard::default()),
    )
}

#[test]
fn test_edit_session_round_trips_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.org");
    fs::write(&path, "* Budget\n| item | cost |\n|---|\n| tea | 3 |\n| coffee | 12 |\n").unwrap();

    let mut session = open(&path, 3, 2);
    assert!(session.align().applied);
    assert!(session.insert_column(HorizontalDirection::Right).applied);
    assert!(session.move_row(VerticalDirection::Down).applied);
    fs::write(&path, session.buffer().text()).unwrap();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "* Budget\n| item   |  | cost |\n|--------+--+------|\n| coffee |  | 12   |\n| tea    |  | 3    |\n"
    );
}

#[test]
fn test_markdown_alignment_with_wide_glyphs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("README.md");
    fs::write(&path, "| 名前 | age |\n|:-|-:|\n| 太郎 | 7 |").unwrap();

    let mut session = open(&path, 0, 0);
    assert_eq!(session.syntax(), Syntax::Markdown);
    assert!(session.align().applied);
    assert_eq!(
        session.buffer().lines(),
        vec!["| 名前 | age |", "|:-----|----:|", "| 太郎 |   7 |"]
    );
}

#[test]
fn test_row_sort_scenario() {
    let mut session = Session::from_text("| b | 2 |\n| a | 1 |", Syntax::Org);
    assert!(session.sort_rows(RowSortKind::Alpha, false).applied);
    assert_eq!(session.buffer().text(), "| a | 1 |\n| b | 2 |");
}

#[test]
fn test_delete_keeps_one_data_row() {
    let mut session = Session::from_text("| h |\n|---|\n| x |", Syntax::Org);
    session.buffer_mut().move_to(2, 2);
    assert!(session.delete_row().applied);
    assert_eq!(session.buffer().text(), "| h |\n|---|");
    session.buffer_mut().move_to(0, 2);
    assert!(!session.delete_row().applied);
    assert!(!session.delete_column().applied);
}

#[test]
fn test_max_width_projection_leaves_text_alone() {
    let text = "| <l> | <5> |\n| hello | averylongvalue |";
    let session = Session::from_text(text, Syntax::Org);
    let projection = session.projections();
    assert_eq!(session.buffer().text(), text);
    assert_eq!(projection.markers.len(), 1);
    assert_eq!(
        projection.render_line(1, &session.buffer().lines()[1]),
        "| hello |avery…|"
    );
}

#[test]
fn test_csv_round_trip_of_tricky_values() {
    let grid = "name,quote\n\"Doe, Jane\",\"she said \"\"hi\"\"\"\nplain,x\n";
    let lines = import(grid, Syntax::Org).unwrap();
    let table = Table::locate(&lines, 0, Syntax::Org).unwrap();
    assert_eq!(export(&table, ExportFormat::Csv).unwrap(), grid);
}

#[test]
fn test_outline_sort_by_priority() {
    let text = "#+TITLE: tasks\n* later\n* [#C] low\n* [#A] high\nnotes\n";
    let mut session = Session::from_text(text, Syntax::Org);
    assert!(session.sort_entries(SortKey::Priority, false, None).applied);
    assert_eq!(
        session.buffer().text(),
        "#+TITLE: tasks\n* [#A] high\nnotes\n* [#C] low\n* later\n"
    );
}
