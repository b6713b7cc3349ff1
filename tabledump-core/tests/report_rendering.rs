//! Report rendering integration tests.
//!
//! This test suite covers:
//! - The entry display cap and its trailer
//! - Deterministic output for a frozen store, sequential and parallel
//! - Single-table dumps end to end against a live store

#![allow(clippy::unwrap_used)]

use chrono::{TimeZone, Utc};
use tabledump_core::{
    AccessLevel, ContentFailure, DumpReport, EntryValue, ExtractionConfig, MemoryStore,
    TableDescriptor, TableHandle, TableKind, TableOptions, TableSnapshot, dump_all, dump_single,
    render, render_single,
};

fn descriptor(id: u64, name: &str, entry_count: usize) -> TableDescriptor {
    TableDescriptor {
        id: TableHandle(id).to_string(),
        handle: TableHandle(id),
        name: name.to_string(),
        kind: TableKind::MultiOrdered,
        entry_count,
        memory_words: 1024,
        owner: "<0.42.0>".to_string(),
        access_level: AccessLevel::Protected,
        compressed: false,
    }
}

fn numbered_entries(count: i64) -> Vec<EntryValue> {
    (1..=count)
        .map(|i| EntryValue::tuple([EntryValue::Int(i), EntryValue::text(format!("row-{i}"))]))
        .collect()
}

fn entry_lines(text: &str) -> usize {
    text.lines()
        .filter(|line| {
            line.trim_start()
                .split_once(". ")
                .is_some_and(|(n, _)| n.parse::<usize>().is_ok())
        })
        .count()
}

// =============================================================================
// Truncation
// =============================================================================

#[test]
fn test_large_table_is_capped_at_one_hundred() {
    let snapshot = TableSnapshot::with_entries(
        descriptor(1, "big", 150),
        numbered_entries(150),
        Utc::now(),
    );
    let text = render_single(&snapshot);

    assert_eq!(entry_lines(&text), 100);
    assert!(text.contains("  100. {100, \"row-100\"}"));
    assert!(!text.contains("row-101"));
    assert!(text.contains("... 50 more entries truncated"));
}

#[test]
fn test_exactly_one_hundred_has_no_trailer() {
    let snapshot = TableSnapshot::with_entries(
        descriptor(2, "full", 100),
        numbered_entries(100),
        Utc::now(),
    );
    let text = render_single(&snapshot);

    assert_eq!(entry_lines(&text), 100);
    assert!(!text.contains("more entries truncated"));
}

#[test]
fn test_empty_table_marker() {
    let snapshot = TableSnapshot::with_entries(descriptor(3, "empty", 0), Vec::new(), Utc::now());
    let text = render_single(&snapshot);

    assert!(text.contains("(empty table)"));
    assert_eq!(entry_lines(&text), 0);
}

#[test]
fn test_nested_entries_render_in_full() {
    let deep = EntryValue::tuple([
        EntryValue::atom("config"),
        EntryValue::Map(vec![(
            EntryValue::text("limits"),
            EntryValue::List(vec![EntryValue::Int(1), EntryValue::Float(2.5)]),
        )]),
        EntryValue::Bytes(vec![1, 2, 3]),
        EntryValue::text("x".repeat(500)),
    ]);
    let snapshot =
        TableSnapshot::with_entries(descriptor(4, "nested", 1), vec![deep], Utc::now());
    let text = render_single(&snapshot);

    assert!(text.contains("{config, #{\"limits\" => [1, 2.5]}, <<1, 2, 3>>, \""));
    assert!(text.contains(&"x".repeat(500)));
}

// =============================================================================
// Determinism
// =============================================================================

#[test]
fn test_render_layout_for_fixed_report() {
    let captured_at = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
    let report = DumpReport::new(
        captured_at,
        vec![
            TableSnapshot::with_entries(descriptor(1, "a", 3), numbered_entries(3), captured_at),
            TableSnapshot::failed(descriptor(2, "b", 9), ContentFailure::AccessDenied, captured_at),
        ],
    );

    let text = render(&report);
    assert!(text.contains("Captured at: 2024-01-15T10:30:00.000000Z"));
    assert!(text.contains("Tables: 2"));
    assert!(text.contains("  ERROR: ACCESS_DENIED"));
    assert!(text.find("Name: a").unwrap() < text.find("Name: b").unwrap());
}

fn frozen_store() -> MemoryStore {
    let store = MemoryStore::new();
    let users = store
        .create_table(TableOptions::new(TableKind::UniqueOrdered).with_name("users"))
        .unwrap();
    store
        .insert_many(
            users,
            (1..=150).rev().map(|i| {
                EntryValue::tuple([EntryValue::Int(i), EntryValue::text(format!("user-{i}"))])
            }),
        )
        .unwrap();
    store
        .create_table(TableOptions::new(TableKind::MultiUnordered).with_name("empty"))
        .unwrap();
    let vault = store
        .create_table(
            TableOptions::new(TableKind::UniqueUnordered)
                .with_name("vault")
                .with_access(AccessLevel::Private),
        )
        .unwrap();
    store.insert(vault, EntryValue::text("secret")).unwrap();
    let anon = store
        .create_table(TableOptions::new(TableKind::MultiOrdered))
        .unwrap();
    store
        .insert_many(
            anon,
            [
                EntryValue::tuple([EntryValue::atom("k"), EntryValue::Float(0.5)]),
                EntryValue::tuple([EntryValue::atom("k"), EntryValue::Bytes(vec![7])]),
            ],
        )
        .unwrap();
    store
}

fn without_capture_time(text: &str) -> String {
    text.lines()
        .filter(|line| !line.starts_with("Captured at:"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn test_frozen_store_renders_identically() {
    let store = frozen_store();
    let sequential = ExtractionConfig::new();
    let parallel = ExtractionConfig::new()
        .with_parallel(true)
        .with_max_parallel(2);

    let first = without_capture_time(&render(&dump_all(&store, &sequential).unwrap()));
    let second = without_capture_time(&render(&dump_all(&store, &sequential).unwrap()));
    let third = without_capture_time(&render(&dump_all(&store, &parallel).unwrap()));

    assert_eq!(first, second);
    assert_eq!(first, third);
    assert!(first.contains("Tables: 4"));
    assert!(first.contains("... 50 more entries truncated"));
    assert!(first.contains("  ERROR: ACCESS_DENIED"));
    assert!(first.contains("(empty table)"));
}

// =============================================================================
// End to End
// =============================================================================

fn cache_store() -> MemoryStore {
    let store = MemoryStore::new();
    let cache = store
        .create_table(
            TableOptions::new(TableKind::UniqueUnordered)
                .with_name("cache")
                .with_access(AccessLevel::Public),
        )
        .unwrap();
    store
        .insert(cache, EntryValue::tuple([EntryValue::text("a"), EntryValue::Int(1)]))
        .unwrap();
    store
        .insert(cache, EntryValue::tuple([EntryValue::text("b"), EntryValue::Int(2)]))
        .unwrap();
    store
}

#[test]
fn test_single_cache_table_end_to_end() {
    let store = cache_store();
    let snapshot = dump_single(&store, "cache").unwrap();
    let text = render_single(&snapshot);

    assert!(text.contains("Name: cache"));
    assert!(text.contains("Kind: unique_unordered"));
    assert!(text.contains("Entries: 2"));
    assert!(text.contains("  1. {\"a\", 1}"));
    assert!(text.contains("  2. {\"b\", 2}"));
    assert!(!text.contains("ERROR:"));
}

#[test]
fn test_private_table_reports_access_denied() {
    let store = cache_store();
    let secret = store
        .create_table(
            TableOptions::new(TableKind::UniqueOrdered)
                .with_name("secrets")
                .with_access(AccessLevel::Private),
        )
        .unwrap();
    store.insert(secret, EntryValue::text("hidden")).unwrap();

    let report = dump_all(&store, &ExtractionConfig::new()).unwrap();
    let text = render(&report);

    assert!(text.contains("Tables: 2"));
    assert!(text.contains("  ERROR: ACCESS_DENIED"));
    assert!(!text.contains("hidden"));
}

#[test]
fn test_missing_table_is_not_found() {
    let store = cache_store();
    let err = dump_single(&store, "nonexistent").unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "Table not found: nonexistent");
}
