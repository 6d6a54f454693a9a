use rstest::rstest;
use tempfile::tempdir;
use valvemu_hardware::eeprom::FileStore;
use valvemu_traits::NvStorage;

#[rstest]
fn round_trips_through_the_image_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("eeprom.bin");

    {
        let mut store = FileStore::open(&path, 16).unwrap();
        store.write(1, &[0xDE, 0xAD, 0xBE, 0xEF]).unwrap();
        store.write(0, &[0x42]).unwrap();
    }

    // A fresh open sees the persisted bytes.
    let mut store = FileStore::open(&path, 16).unwrap();
    let mut buf = [0u8; 5];
    store.read(0, &mut buf).unwrap();
    assert_eq!(buf, [0x42, 0xDE, 0xAD, 0xBE, 0xEF]);
}

#[rstest]
fn missing_file_starts_blank() {
    let dir = tempdir().unwrap();
    let mut store = FileStore::open(dir.path().join("none.bin"), 8).unwrap();
    let mut buf = [0xFFu8; 8];
    store.read(0, &mut buf).unwrap();
    assert_eq!(buf, [0u8; 8]);
}

#[rstest]
fn wrong_sized_image_is_replaced_blank() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("eeprom.bin");
    std::fs::write(&path, [1u8; 3]).unwrap();

    let mut store = FileStore::open(&path, 16).unwrap();
    let mut buf = [0xFFu8; 3];
    store.read(0, &mut buf).unwrap();
    assert_eq!(buf, [0u8; 3]);
}

#[rstest]
fn out_of_bounds_access_is_rejected() {
    let dir = tempdir().unwrap();
    let mut store = FileStore::open(dir.path().join("eeprom.bin"), 8).unwrap();
    assert!(store.write(6, &[0u8; 4]).is_err());
    let mut buf = [0u8; 9];
    assert!(store.read(0, &mut buf).is_err());
    // Offset overflow must not panic.
    assert!(store.write(usize::MAX, &[1]).is_err());
}
