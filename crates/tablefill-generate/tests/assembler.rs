use std::cell::RefCell;

use serde_json::json;

use tablefill_core::{ColumnSpec, SourceKind, TableSpec, unescape_literal};
use tablefill_generate::{RowAssembler, StreamContext};

fn table(record_count: u64, columns: Vec<ColumnSpec>) -> TableSpec {
    TableSpec {
        name: "orders".to_string(),
        record_count,
        columns,
    }
}

fn fixed(name: &str, value: &str) -> ColumnSpec {
    ColumnSpec {
        name: name.to_string(),
        source: SourceKind::Fixed,
        metadata: json!({ "value": value }),
    }
}

#[test]
fn rows_follow_column_order() {
    let spec = table(3, vec![fixed("a", "1"), fixed("b", "2"), fixed("c", "3")]);
    let mut assembler = RowAssembler::open(&spec, &StreamContext::new("orders", 0)).expect("open");

    let mut rows = Vec::new();
    while let Some(row) = assembler.next_row(|_| Ok(())).expect("row") {
        rows.push(row);
    }

    assert_eq!(rows.len(), 3);
    for (idx, row) in rows.iter().enumerate() {
        assert_eq!(row.index, idx as u64);
        assert_eq!(row.values, vec!["1", "2", "3"]);
    }
    assert_eq!(assembler.rows_assembled(), 3);
}

#[test]
fn column_complete_fires_once_per_column_on_final_row_only() {
    let spec = table(4, vec![fixed("a", "1"), fixed("b", "2")]);
    let mut assembler = RowAssembler::open(&spec, &StreamContext::new("orders", 0)).expect("open");
    let events = RefCell::new(Vec::new());

    let mut index = 0;
    while let Some(row) = assembler
        .next_row(|column| {
            events.borrow_mut().push((index, column.to_string()));
            Ok(())
        })
        .expect("row")
    {
        assert_eq!(row.index, index);
        index += 1;
    }

    assert_eq!(
        events.into_inner(),
        vec![(3, "a".to_string()), (3, "b".to_string())]
    );
}

#[test]
fn single_quotes_are_doubled_and_recoverable() {
    let spec = table(1, vec![fixed("name", "O'Brien")]);
    let mut assembler = RowAssembler::open(&spec, &StreamContext::new("orders", 0)).expect("open");
    let row = assembler.next_row(|_| Ok(())).expect("row").expect("one row");

    assert_eq!(row.values, vec!["O''Brien"]);
    assert_eq!(unescape_literal(&row.values[0]), "O'Brien");
}

#[test]
fn zero_records_produce_no_rows_or_events() {
    let spec = table(0, vec![fixed("a", "1")]);
    let mut assembler = RowAssembler::open(&spec, &StreamContext::new("orders", 0)).expect("open");
    let row = assembler
        .next_row(|_| panic!("no column events for an empty table"))
        .expect("no error");
    assert!(row.is_none());
}

#[test]
fn construction_fails_before_any_row_when_a_column_is_invalid() {
    let mut bad = fixed("b", "2");
    bad.metadata = json!({"rule": "name.first_name"});
    let spec = table(2, vec![fixed("a", "1"), bad]);
    let err = RowAssembler::open(&spec, &StreamContext::new("orders", 0))
        .err()
        .expect("invalid metadata");
    assert!(err.is_configuration());
    assert!(err.to_string().contains("'b'"));
}
