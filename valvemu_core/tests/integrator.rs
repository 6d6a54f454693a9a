use std::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rstest::rstest;
use valvemu_core::{AffineMap, IntegratorCfg, PositionIntegrator, ValveBand};
use valvemu_traits::{Clock, DigitalInput, ManualClock, PwmChannel};

/// Signal whose logical state is flipped from the test.
#[derive(Clone)]
struct Signal(Arc<AtomicBool>);

impl Signal {
    fn inactive() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }
    fn set(&self, active: bool) {
        self.0.store(active, Ordering::Relaxed);
    }
}

impl DigitalInput for Signal {
    fn is_active(&mut self) -> Result<bool, Box<dyn Error + Send + Sync>> {
        Ok(self.0.load(Ordering::Relaxed))
    }
}

/// PWM spy recording every duty written.
#[derive(Clone, Default)]
struct SpyPwm(Arc<Mutex<Vec<u8>>>);

impl SpyPwm {
    fn written(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
    }
}

impl PwmChannel for SpyPwm {
    fn set_duty(&mut self, duty: u8) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.0.lock().unwrap().push(duty);
        Ok(())
    }
}

struct Rig {
    open: Signal,
    close: Signal,
    pwm: SpyPwm,
    clock: ManualClock,
    integ: PositionIntegrator<Signal, Signal, SpyPwm>,
}

fn rig(initial_v: f32) -> Rig {
    let open = Signal::inactive();
    let close = Signal::inactive();
    let pwm = SpyPwm::default();
    let clock = ManualClock::new();
    let shared: Arc<dyn Clock + Send + Sync> = Arc::new(clock.clone());
    let epoch = shared.now();
    let integ = PositionIntegrator::new(
        open.clone(),
        close.clone(),
        pwm.clone(),
        IntegratorCfg::default(),
        AffineMap::new(51.0, 0.0),
        shared,
        epoch,
        initial_v,
    );
    Rig {
        open,
        close,
        pwm,
        clock,
        integ,
    }
}

#[rstest]
fn first_tick_bootstraps_the_output_even_when_idle() {
    let mut r = rig(4.2);
    let t = r.integ.tick().unwrap();
    assert!(!t.moved);
    assert_eq!(t.duty, Some(214)); // 4.2 * 51 = 214.2
    assert_eq!(r.pwm.written(), vec![214]);
}

#[rstest]
fn idle_ticks_skip_the_hardware_write() {
    let mut r = rig(2.0);
    r.integ.tick().unwrap();
    for _ in 0..5 {
        r.clock.advance_ms(10);
        let t = r.integ.tick().unwrap();
        assert_eq!(t.duty, None);
    }
    assert_eq!(r.pwm.written().len(), 1);
}

#[rstest]
#[case(vec![500])]
#[case(vec![50; 10])]
#[case(vec![7, 13, 120, 360])]
fn open_time_integrates_regardless_of_tick_splits(#[case] splits_ms: Vec<u64>) {
    let mut r = rig(1.0);
    r.integ.tick().unwrap();
    r.open.set(true);
    let total: u64 = splits_ms.iter().sum();
    assert_eq!(total, 500);
    for ms in splits_ms {
        r.clock.advance_ms(ms);
        r.integ.tick().unwrap();
    }
    // 0.5 s at 0.8 V/s on top of 1.0 V.
    let expected = 1.0 + 0.5 * IntegratorCfg::default().rate_v_per_s;
    assert!(
        (r.integ.position() - expected).abs() < 1e-4,
        "position {} != {}",
        r.integ.position(),
        expected
    );
}

#[rstest]
fn close_signal_integrates_downward() {
    let mut r = rig(3.0);
    r.integ.tick().unwrap();
    r.close.set(true);
    r.clock.advance_ms(1000);
    r.integ.tick().unwrap();
    assert!((r.integ.position() - 2.2).abs() < 1e-4);
}

#[rstest]
fn simultaneous_signals_superpose_but_still_write() {
    let mut r = rig(2.5);
    r.integ.tick().unwrap();
    r.open.set(true);
    r.close.set(true);
    r.clock.advance_ms(200);
    let t = r.integ.tick().unwrap();
    assert!(!t.moved);
    assert!((r.integ.position() - 2.5).abs() < 1e-6);
    // Still counts as an active tick: output rewritten.
    assert_eq!(t.duty, Some(128)); // 2.5 * 51 = 127.5
    assert_eq!(r.pwm.written().len(), 2);
}

#[rstest]
fn position_clamps_at_the_domain_edges() {
    let mut r = rig(4.9);
    r.integ.tick().unwrap();
    r.open.set(true);
    for _ in 0..20 {
        r.clock.advance_ms(100);
        r.integ.tick().unwrap();
    }
    assert_eq!(r.integ.position(), 5.0);

    r.open.set(false);
    r.close.set(true);
    for _ in 0..100 {
        r.clock.advance_ms(100);
        r.integ.tick().unwrap();
    }
    assert_eq!(r.integ.position(), 0.0);
}

#[rstest]
fn bands_classify_the_position() {
    let mut r = rig(0.2);
    assert_eq!(r.integ.band(), ValveBand::Closed);
    assert!(r.integ.is_closed());
    r.integ.set_position(2.0);
    assert_eq!(r.integ.band(), ValveBand::Mid);
    r.integ.set_position(4.8);
    assert_eq!(r.integ.band(), ValveBand::Open);
    assert!(r.integ.is_open());
    // set_position clamps into the domain.
    r.integ.set_position(9.0);
    assert_eq!(r.integ.position(), 5.0);
}
