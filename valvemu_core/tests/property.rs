use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use proptest::prelude::*;
use valvemu_core::{AffineMap, IntegratorCfg, InterpTable, PositionIntegrator, TableRow};
use valvemu_traits::{Clock, DigitalInput, ManualClock, PwmChannel};

#[derive(Clone)]
struct Signal(Arc<AtomicBool>);
impl DigitalInput for Signal {
    fn is_active(&mut self) -> Result<bool, Box<dyn Error + Send + Sync>> {
        Ok(self.0.load(Ordering::Relaxed))
    }
}

struct NullPwm;
impl PwmChannel for NullPwm {
    fn set_duty(&mut self, _duty: u8) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}

prop_compose! {
    /// A valid table: strictly descending thresholds built from positive gaps.
    fn table_strategy()(
        top in -50.0f32..150.0,
        gaps in prop::collection::vec(0.5f32..30.0, 1..8),
        duties in prop::collection::vec(0u8..=255, 8),
        slopes in prop::collection::vec(-5.0f32..5.0, 8),
    ) -> Vec<TableRow> {
        let mut rows = Vec::new();
        let mut threshold = top;
        for (i, gap) in gaps.iter().enumerate() {
            rows.push(TableRow {
                threshold,
                base_duty: duties[i % duties.len()],
                slope: slopes[i % slopes.len()],
            });
            threshold -= gap;
        }
        rows
    }
}

/// Reference lookup: scan in stored order, first match wins.
fn reference_lookup(rows: &[TableRow], v: f32) -> u8 {
    for r in rows {
        if v >= r.threshold {
            let y = f32::from(r.base_duty) + (v - r.threshold) * r.slope;
            return y.clamp(0.0, 255.0).round() as u8;
        }
    }
    255
}

proptest! {
    #[test]
    fn lookup_matches_first_row_semantics(rows in table_strategy(), v in -200.0f32..300.0) {
        let table = InterpTable::new(rows.clone()).unwrap();
        prop_assert_eq!(table.lookup(v), reference_lookup(&rows, v));
    }

    #[test]
    fn integrated_position_never_leaves_the_domain(
        steps in prop::collection::vec((0u64..400, any::<bool>(), any::<bool>()), 1..60),
        initial in 0.0f32..5.0,
    ) {
        let open_flag = Arc::new(AtomicBool::new(false));
        let close_flag = Arc::new(AtomicBool::new(false));
        let clock = ManualClock::new();
        let shared: Arc<dyn Clock + Send + Sync> = Arc::new(clock.clone());
        let epoch = shared.now();
        let cfg = IntegratorCfg::default();
        let mut integ = PositionIntegrator::new(
            Signal(open_flag.clone()),
            Signal(close_flag.clone()),
            NullPwm,
            cfg,
            AffineMap::new(51.0, 0.0),
            shared,
            epoch,
            initial,
        );

        for (dt_ms, open, close) in steps {
            open_flag.store(open, Ordering::Relaxed);
            close_flag.store(close, Ordering::Relaxed);
            clock.advance_ms(dt_ms);
            let tick = integ.tick().unwrap();
            prop_assert!(tick.position_v >= cfg.min_v);
            prop_assert!(tick.position_v <= cfg.max_v);
        }
    }
}
