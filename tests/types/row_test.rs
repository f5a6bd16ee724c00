use g2db::types::{
    COLUMN_EMAIL_SIZE, COLUMN_USERNAME_SIZE,
    error::DatabaseError,
    row::{EMAIL_OFFSET, ROW_SIZE, Row, USERNAME_OFFSET},
};

fn create_test_row() -> Row {
    Row::new(1, "gigitsu", "gigitsu.23@gmail.com")
}

#[test]
fn test_row_size_is_fixed() {
    assert_eq!(ROW_SIZE, 4 + 1 + COLUMN_USERNAME_SIZE + 1 + COLUMN_EMAIL_SIZE);

    let small = Row::new(1, "a", "b").to_bytes().unwrap();
    let large = Row::new(
        u32::MAX,
        "u".repeat(COLUMN_USERNAME_SIZE),
        "e".repeat(COLUMN_EMAIL_SIZE),
    )
    .to_bytes()
    .unwrap();
    assert_eq!(small.len(), large.len());
}

#[test]
fn test_row_round_trip_preserves_fields() {
    let row = create_test_row();
    let bytes = row.to_bytes().unwrap();
    assert_eq!(Row::from_bytes(&bytes).unwrap(), row);
}

#[test]
fn test_fields_at_capacity_are_accepted() {
    let username = "u".repeat(COLUMN_USERNAME_SIZE);
    let email = "e".repeat(COLUMN_EMAIL_SIZE);
    let row = Row::try_new(42, &username, &email).unwrap();

    let decoded = Row::from_bytes(&row.to_bytes().unwrap()).unwrap();
    assert_eq!(decoded.username, username);
    assert_eq!(decoded.email, email);
}

#[test]
fn test_username_over_capacity_is_rejected() {
    let username = "u".repeat(COLUMN_USERNAME_SIZE + 1);
    match Row::try_new(1, &username, "a@b.c") {
        Err(DatabaseError::FieldTooLong { field, max, actual }) => {
            assert_eq!(field, "username");
            assert_eq!(max, COLUMN_USERNAME_SIZE);
            assert_eq!(actual, COLUMN_USERNAME_SIZE + 1);
        }
        other => panic!("expected FieldTooLong, got {:?}", other),
    }
}

#[test]
fn test_email_over_capacity_is_rejected() {
    let email = "e".repeat(COLUMN_EMAIL_SIZE + 1);
    assert!(matches!(
        Row::try_new(1, "user", &email),
        Err(DatabaseError::FieldTooLong { field: "email", .. })
    ));
}

#[test]
fn test_encode_revalidates_field_length() {
    let row = Row::new(1, "u".repeat(COLUMN_USERNAME_SIZE + 1), "a@b.c");
    assert!(matches!(
        row.to_bytes(),
        Err(DatabaseError::FieldTooLong { .. })
    ));
}

#[test]
fn test_non_positive_ids_are_rejected() {
    assert!(matches!(
        Row::try_new(-1, "user", "a@b.c"),
        Err(DatabaseError::NegativeId { id: -1 })
    ));
    assert!(matches!(
        Row::try_new(0, "user", "a@b.c"),
        Err(DatabaseError::NegativeId { id: 0 })
    ));
}

#[test]
fn test_id_past_u32_is_rejected() {
    let id = u32::MAX as i64 + 1;
    assert!(matches!(
        Row::try_new(id, "user", "a@b.c"),
        Err(DatabaseError::IdTooLarge { .. })
    ));
    assert_eq!(Row::try_new(u32::MAX as i64, "user", "a@b.c").unwrap().id, u32::MAX);
}

#[test]
fn test_multibyte_strings_count_bytes() {
    // 17 characters, 34 bytes
    let username = "é".repeat(17);
    assert!(username.len() > COLUMN_USERNAME_SIZE);
    assert!(matches!(
        Row::try_new(1, &username, "a@b.c"),
        Err(DatabaseError::FieldTooLong { .. })
    ));

    let row = Row::try_new(1, "żółw", "ünïcödé@example.com").unwrap();
    assert_eq!(Row::from_bytes(&row.to_bytes().unwrap()).unwrap(), row);
}

#[test]
fn test_truncated_buffer_fails_to_decode() {
    let bytes = create_test_row().to_bytes().unwrap();
    assert!(matches!(
        Row::from_bytes(&bytes[..ROW_SIZE - 1]),
        Err(DatabaseError::SerializationError { .. })
    ));
}

#[test]
fn test_corrupt_length_prefix_fails_to_decode() {
    let mut bytes = create_test_row().to_bytes().unwrap();
    bytes[USERNAME_OFFSET] = (COLUMN_USERNAME_SIZE + 1) as u8;
    assert!(Row::from_bytes(&bytes).is_err());

    let mut bytes = create_test_row().to_bytes().unwrap();
    bytes[EMAIL_OFFSET + 1] = 0xFF;
    assert!(matches!(
        Row::from_bytes(&bytes),
        Err(DatabaseError::SerializationError { .. })
    ));
}

#[test]
fn test_display_matches_select_output() {
    assert_eq!(
        create_test_row().to_string(),
        "(1, gigitsu, gigitsu.23@gmail.com)"
    );
}
