use std::error::Error;
use std::sync::{Arc, Mutex};

use rstest::rstest;
use valvemu_core::mocks::MemStorage;
use valvemu_core::{RECORD_KEY, StateStore, TrackedState};
use valvemu_traits::NvStorage;

/// Storage that records the order of write calls.
#[derive(Clone)]
struct OrderSpy {
    inner: MemStorage,
    log: Arc<Mutex<Vec<(usize, usize)>>>,
}

impl OrderSpy {
    fn new() -> Self {
        Self {
            inner: MemStorage::new(16),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }
    fn writes(&self) -> Vec<(usize, usize)> {
        self.log.lock().unwrap().clone()
    }
}

impl NvStorage for OrderSpy {
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.inner.read(offset, buf)
    }
    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.log.lock().unwrap().push((offset, data.len()));
        self.inner.write(offset, data)
    }
}

/// Storage that fails once the key byte is written, simulating power dying
/// between the payload and the key.
#[derive(Clone)]
struct DiesBeforeKey {
    inner: MemStorage,
}

impl NvStorage for DiesBeforeKey {
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.inner.read(offset, buf)
    }
    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), Box<dyn Error + Send + Sync>> {
        if offset == 0 {
            return Err(Box::new(std::io::Error::other("storage power lost")));
        }
        self.inner.write(offset, data)
    }
}

#[rstest]
fn save_restore_is_idempotent() {
    let nv = MemStorage::new(16);
    let mut store = StateStore::new(nv.clone());
    let s = TrackedState {
        position_v: 1.875,
        tank_c: 47.25,
    };
    store.save(&s).unwrap();
    assert_eq!(store.restore().unwrap(), Some(s));
    // A second restore reads the same bytes.
    assert_eq!(store.restore().unwrap(), Some(s));
    assert_eq!(nv.contents()[0], RECORD_KEY);
}

#[rstest]
fn payload_is_written_before_the_key() {
    let spy = OrderSpy::new();
    let mut store = StateStore::new(spy.clone());
    store.save(&TrackedState::default()).unwrap();
    let writes = spy.writes();
    assert_eq!(writes, vec![(1, 8), (0, 1)]);
}

#[rstest]
fn mismatched_key_leaves_defaults_untouched() {
    let nv = MemStorage::new(16);
    // A full payload with a wrong key byte must read as uninitialized.
    nv.poke(0, &[RECORD_KEY ^ 0xFF]);
    nv.poke(1, &3.3f32.to_le_bytes());
    nv.poke(5, &55.0f32.to_le_bytes());
    let mut store = StateStore::new(nv);
    assert_eq!(store.restore().unwrap(), None);
}

#[rstest]
fn interrupted_save_reads_back_as_uninitialized() {
    let dying = DiesBeforeKey {
        inner: MemStorage::new(16),
    };
    let mut store = StateStore::new(dying.clone());
    let err = store
        .save(&TrackedState {
            position_v: 2.0,
            tank_c: 30.0,
        })
        .unwrap_err();
    assert!(format!("{err}").contains("state key write"));

    // The payload landed but the key never did: the record is invalid.
    let mut reread = StateStore::new(dying.inner.clone());
    assert_eq!(reread.restore().unwrap(), None);
}
