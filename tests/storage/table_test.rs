use std::fs::{self, OpenOptions};
use std::io::{Seek, SeekFrom, Write};

use g2db::{
    storage::{config::StorageConfig, table::Table},
    types::{PAGE_SIZE, error::DatabaseError, page::NodeType, row::Row},
    utils::mock::TempDatabase,
};

fn fill_until_full(table: &mut Table) -> usize {
    for id in 1..=100_000i64 {
        match table.insert(id, &format!("user{}", id), &format!("person{}@example.com", id)) {
            Ok(()) => {}
            Err(DatabaseError::TableFull) => return (id - 1) as usize,
            Err(other) => panic!("unexpected error at id {}: {:?}", id, other),
        }
    }
    panic!("table never reported TableFull");
}

#[test]
fn test_insert_then_select_single_row() {
    let db = TempDatabase::with_prefix("single_row");
    let mut table = db.open().unwrap();
    table.insert(1, "gigitsu", "gigitsu.23@gmail.com").unwrap();

    let rows = table.rows().unwrap();
    assert_eq!(rows, vec![Row::new(1, "gigitsu", "gigitsu.23@gmail.com")]);
    assert_eq!(rows[0].to_string(), "(1, gigitsu, gigitsu.23@gmail.com)");
    assert_eq!(table.len(), 1);
}

#[test]
fn test_negative_id_stores_nothing() {
    let db = TempDatabase::with_prefix("negative_id");
    let mut table = db.open().unwrap();
    assert!(matches!(
        table.insert(-1, "gigitsu", "gigitsu.23@gmail.com"),
        Err(DatabaseError::NegativeId { id: -1 })
    ));
    assert!(matches!(
        table.insert(0, "gigitsu", "gigitsu.23@gmail.com"),
        Err(DatabaseError::NegativeId { .. })
    ));
    assert!(table.rows().unwrap().is_empty());
    assert!(table.is_empty());
}

#[test]
fn test_rejected_rows_leave_table_unchanged() {
    let db = TempDatabase::with_prefix("rejected_rows");
    let mut table = db.open().unwrap();
    table.insert(1, "alice", "alice@example.com").unwrap();

    let long_name = "x".repeat(33);
    let long_email = "x".repeat(256);
    assert!(matches!(
        table.insert(2, &long_name, "bob@example.com"),
        Err(DatabaseError::FieldTooLong { .. })
    ));
    assert!(matches!(
        table.insert(3, "carol", &long_email),
        Err(DatabaseError::FieldTooLong { .. })
    ));
    assert!(matches!(
        table.insert(1, "alice2", "alice2@example.com"),
        Err(DatabaseError::DuplicateKey { key: 1 })
    ));
    assert!(matches!(
        table.insert(u32::MAX as i64 + 1, "dave", "dave@example.com"),
        Err(DatabaseError::IdTooLarge { .. })
    ));

    assert_eq!(table.rows().unwrap(), vec![Row::new(1, "alice", "alice@example.com")]);
    assert_eq!(table.len(), 1);
}

#[test]
fn test_fields_at_capacity_round_trip_through_file() {
    let db = TempDatabase::with_prefix("field_capacity");
    let username = "u".repeat(32);
    let email = "e".repeat(255);
    {
        let mut table = db.open().unwrap();
        table.insert(1, &username, &email).unwrap();
        table.close().unwrap();
    }
    let mut table = db.open().unwrap();
    assert_eq!(table.rows().unwrap(), vec![Row::new(1, username, email)]);
}

#[test]
fn test_rows_come_back_in_id_order() {
    let db = TempDatabase::with_prefix("id_order");
    let mut table = db.open().unwrap();
    for id in [42, 7, 19, 3, 100, 56, 1, 88, 23, 64, 11, 5, 77, 31, 2] {
        table.insert(id, "user", "user@example.com").unwrap();
    }
    let ids: Vec<u32> = table.rows().unwrap().iter().map(|row| row.id).collect();
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    assert_eq!(ids, sorted);
    assert_eq!(ids.len(), 15);
    assert_eq!(table.root_node_type().unwrap(), NodeType::Internal);
}

#[test]
fn test_rows_persist_across_reopen() {
    let db = TempDatabase::with_prefix("persist");
    {
        let mut table = db.open().unwrap();
        for id in 1..=50 {
            table.insert(id, &format!("user{}", id), &format!("user{}@example.com", id)).unwrap();
        }
        table.close().unwrap();
    }

    let mut table = db.open().unwrap();
    assert_eq!(table.len(), 50);
    let rows = table.rows().unwrap();
    assert_eq!(rows.len(), 50);
    assert_eq!(rows[49], Row::new(50, "user50", "user50@example.com"));
    assert_eq!(table.verify().unwrap().rows, 50);

    table.insert(51, "late", "late@example.com").unwrap();
    assert!(matches!(
        table.insert(10, "again", "again@example.com"),
        Err(DatabaseError::DuplicateKey { key: 10 })
    ));
    assert_eq!(table.get(51).unwrap().unwrap().username, "late");
}

#[test]
fn test_unclosed_table_loses_writes() {
    let db = TempDatabase::with_prefix("unclosed");
    {
        let mut table = db.open().unwrap();
        table.insert(1, "first", "first@example.com").unwrap();
        table.close().unwrap();
    }
    {
        let mut table = db.open().unwrap();
        table.insert(2, "second", "second@example.com").unwrap();
    }
    let mut table = db.open().unwrap();
    assert_eq!(table.rows().unwrap(), vec![Row::new(1, "first", "first@example.com")]);
}

#[test]
fn test_file_is_whole_pages_after_close() {
    let db = TempDatabase::with_prefix("whole_pages");
    let mut table = db.open().unwrap();
    for id in 1..=30 {
        table.insert(id, "user", "user@example.com").unwrap();
    }
    let pages = table.pager().num_pages();
    table.close().unwrap();

    let length = fs::metadata(&db.path).unwrap().len();
    assert_eq!(length % PAGE_SIZE as u64, 0);
    assert_eq!(length, pages as u64 * PAGE_SIZE as u64);
}

#[test]
fn test_capacity_boundary() {
    let db = TempDatabase::with_prefix("capacity");
    let mut table = db.open().unwrap();
    let capacity = fill_until_full(&mut table);
    assert!(capacity > 0);

    let next = capacity as i64 + 1;
    assert!(matches!(
        table.insert(next, "extra", "extra@example.com"),
        Err(DatabaseError::TableFull)
    ));
    assert!(table.pager().num_pages() <= table.config().max_pages);

    let ids: Vec<i64> = table.rows().unwrap().iter().map(|row| row.id as i64).collect();
    assert_eq!(ids, (1..=capacity as i64).collect::<Vec<_>>());
    assert_eq!(table.verify().unwrap().rows, capacity);
    table.close().unwrap();

    let mut table = db.open().unwrap();
    assert_eq!(table.len(), capacity as u64);
    assert_eq!(table.rows().unwrap().len(), capacity);
    assert!(matches!(
        table.insert(next, "extra", "extra@example.com"),
        Err(DatabaseError::TableFull)
    ));
}

#[test]
fn test_capacity_scales_with_max_pages() {
    let small = TempDatabase::with_config("small_capacity", StorageConfig::default().with_max_pages(10));
    let large = TempDatabase::with_config("large_capacity", StorageConfig::default().with_max_pages(20));
    let small_capacity = fill_until_full(&mut small.open().unwrap());
    let large_capacity = fill_until_full(&mut large.open().unwrap());
    assert!(large_capacity > small_capacity);
}

#[test]
fn test_invalid_config_is_rejected() {
    let db = TempDatabase::with_config("invalid_config", StorageConfig::default().with_max_pages(1));
    assert!(matches!(db.open(), Err(DatabaseError::InvalidConfig { .. })));

    let db = TempDatabase::with_config(
        "invalid_keys",
        StorageConfig::default().with_internal_max_keys(1),
    );
    assert!(matches!(db.open(), Err(DatabaseError::InvalidConfig { .. })));
}

#[test]
fn test_partial_page_file_is_corrupt() {
    let db = TempDatabase::with_prefix("partial_page");
    fs::write(&db.path, vec![0u8; PAGE_SIZE * 2 + 100]).unwrap();
    assert!(matches!(db.open(), Err(DatabaseError::CorruptFile { .. })));
}

#[test]
fn test_damaged_header_is_corrupt() {
    let db = TempDatabase::with_prefix("damaged_header");
    {
        let mut table = db.open().unwrap();
        table.insert(1, "user", "user@example.com").unwrap();
        table.close().unwrap();
    }
    let mut file = OpenOptions::new().write(true).open(&db.path).unwrap();
    file.seek(SeekFrom::Start(20)).unwrap();
    file.write_all(&[0xAB, 0xCD]).unwrap();
    drop(file);

    assert!(matches!(db.open(), Err(DatabaseError::CorruptFile { .. })));
}

#[test]
fn test_single_page_file_is_corrupt() {
    let db = TempDatabase::with_prefix("single_page");
    fs::write(&db.path, vec![0u8; PAGE_SIZE]).unwrap();
    assert!(matches!(db.open(), Err(DatabaseError::CorruptFile { .. })));
}

#[test]
fn test_get_by_id() {
    let db = TempDatabase::with_prefix("get_by_id");
    let mut table = db.open().unwrap();
    table.insert(9, "nine", "nine@example.com").unwrap();
    assert_eq!(table.get(9).unwrap().unwrap().email, "nine@example.com");
    assert_eq!(table.get(8).unwrap(), None);
    assert_eq!(table.get(-9).unwrap(), None);
}
