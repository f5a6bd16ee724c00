use g2db::{
    storage::header::{FileHeader, HEADER_FIELDS_SIZE},
    types::{error::DatabaseError, page::Page},
};

#[test]
fn test_header_encodes_to_fixed_width() {
    let header = FileHeader::new(1, 2);
    let bytes = header.to_bytes().unwrap();
    assert_eq!(bytes.len(), HEADER_FIELDS_SIZE + 4);
    assert_eq!(&bytes[..4], b"G2DB");
}

#[test]
fn test_header_survives_page_write() {
    let mut header = FileHeader::new(7, 12);
    header.row_count = 40;
    header.change_counter = 3;
    let mut page = Page::new(0);
    header.write_to(&mut page).unwrap();
    assert!(page.is_dirty);
    assert_eq!(FileHeader::read_from(&page).unwrap(), header);
}

#[test]
fn test_flipped_byte_fails_checksum() {
    let mut page = Page::new(0);
    FileHeader::new(1, 2).write_to(&mut page).unwrap();
    let byte = page.read_u8(20);
    page.write_u8(20, byte ^ 0xFF);
    assert!(matches!(
        FileHeader::read_from(&page),
        Err(DatabaseError::CorruptFile { .. })
    ));
}

#[test]
fn test_zeroed_page_is_rejected() {
    let page = Page::new(0);
    assert!(matches!(
        FileHeader::read_from(&page),
        Err(DatabaseError::CorruptFile { .. })
    ));
}
