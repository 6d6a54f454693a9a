//! Debounce and save-once behavior of the power-loss path, including the
//! threaded monitor against real time.

use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rstest::rstest;
use valvemu_core::mocks::MemStorage;
use valvemu_core::{ArmState, PowerGuard, PowerMonitor, SharedSnapshot, StateStore, TrackedState};
use valvemu_traits::{Clock, DigitalInput, MonotonicClock};

#[derive(Clone)]
struct PowerSense(Arc<AtomicBool>);

impl PowerSense {
    fn ok() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }
    /// true = the power-control signal is at its inactive level (loss imminent).
    fn set_loss(&self, loss: bool) {
        self.0.store(loss, Ordering::Relaxed);
    }
}

impl DigitalInput for PowerSense {
    fn is_active(&mut self) -> Result<bool, Box<dyn Error + Send + Sync>> {
        Ok(self.0.load(Ordering::Relaxed))
    }
}

#[rstest]
fn debounce_window_is_respected_exactly() {
    let mut g = ArmState::new();
    assert!(g.on_edge(1_000));
    // Property: never re-arms strictly before t0 + quiet.
    for t in [1_000, 1_001, 1_049] {
        assert!(!g.try_rearm(t, 50), "re-armed early at {t}");
    }
    // Re-arms on the first service at/after the boundary.
    assert!(g.try_rearm(1_050, 50));
}

#[rstest]
fn wrapped_timestamps_do_not_underflow() {
    let mut g = ArmState::new();
    g.on_edge(u64::MAX - 10);
    // now < disarmed_at (clock glitch): saturating math keeps us disarmed.
    assert!(!g.try_rearm(5, 50));
}

fn read_back(nv: &MemStorage) -> Option<TrackedState> {
    let mut store = StateStore::new(nv.clone());
    store.restore().unwrap()
}

#[rstest]
fn monitor_saves_once_per_armed_edge() {
    let power = PowerSense::ok();
    let nv = MemStorage::new(16);
    let guard = Arc::new(PowerGuard::new(100));
    let snapshot = Arc::new(SharedSnapshot::new(TrackedState {
        position_v: 2.5,
        tank_c: 33.0,
    }));
    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(MonotonicClock::new());
    let epoch = clock.now();

    let monitor = PowerMonitor::spawn(
        power.clone(),
        StateStore::new(nv.clone()),
        guard.clone(),
        snapshot.clone(),
        1,
        clock.clone(),
        epoch,
    );

    // Quiet line: nothing saved.
    std::thread::sleep(Duration::from_millis(30));
    assert_eq!(monitor.saves(), 0);
    assert_eq!(read_back(&nv), None);

    // Power-loss edge: exactly one save with the published snapshot.
    power.set_loss(true);
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(monitor.saves(), 1);
    assert_eq!(
        read_back(&nv),
        Some(TrackedState {
            position_v: 2.5,
            tank_c: 33.0,
        })
    );
    assert!(!guard.is_armed());

    // Bounce inside the quiet window: suppressed, still one save.
    power.set_loss(false);
    std::thread::sleep(Duration::from_millis(20));
    power.set_loss(true);
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(monitor.saves(), 1);
    assert!(guard.has_pending());

    // Main loop re-arms after the quiet window; pending edge is discarded.
    power.set_loss(false);
    let rearm_deadline = std::time::Instant::now() + Duration::from_secs(2);
    loop {
        if guard.service(clock.ms_since(epoch)) {
            break;
        }
        assert!(
            std::time::Instant::now() < rearm_deadline,
            "guard never re-armed"
        );
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(guard.is_armed());
    assert!(!guard.has_pending());

    // Power restored and lost again: a second save with the newer snapshot.
    snapshot.publish_position(0.75);
    power.set_loss(true);
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(monitor.saves(), 2);
    let restored = read_back(&nv).unwrap();
    assert_eq!(restored.position_v, 0.75);
    assert_eq!(restored.tank_c, 33.0);

    drop(monitor);
}
