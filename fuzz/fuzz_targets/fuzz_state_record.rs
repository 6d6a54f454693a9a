#![no_main]
use libfuzzer_sys::fuzz_target;

use valvemu_core::mocks::MemStorage;
use valvemu_core::StateStore;

fuzz_target!(|data: &[u8]| {
    // Arbitrary storage contents must never panic the restore path: either
    // a mismatched key (None) or a decoded record, including NaN payloads.
    let nv = MemStorage::new(16);
    nv.poke(0, &data[..data.len().min(16)]);
    let mut store = StateStore::new(nv);
    let _ = store.restore();
});
