//! Row-by-row fixtures for the shipped temperature table.

use rstest::rstest;
use valvemu_core::{InterpTable, TableRow};

/// The default table from `valvemu_config::default_table()`, in core form.
fn shipped_table() -> InterpTable {
    valvemu_core::table_from_rows(&valvemu_config::default_table()).unwrap()
}

#[rstest]
// Exact threshold of every row.
#[case(85.0, 0)]
#[case(60.0, 30)]
#[case(40.0, 78)]
#[case(20.0, 140)]
#[case(0.0, 208)]
// Interior of each segment: base + (v - threshold) * slope, rounded.
#[case(90.0, 0)] // flat top row
#[case(70.0, 18)] // 30 + 10 * -1.2
#[case(50.0, 54)] // 78 + 10 * -2.4
#[case(21.0, 137)] // 140 + 1 * -3.1 = 136.9
#[case(10.0, 174)] // 208 + 10 * -3.4
// Just below each threshold the next row takes over.
#[case(59.9, 30)] // 78 + 19.9 * -2.4 = 30.24
#[case(39.9, 78)] // 140 + 19.9 * -3.1 = 78.31
fn shipped_table_row_by_row(#[case] input: f32, #[case] duty: u8) {
    assert_eq!(shipped_table().lookup(input), duty, "lookup({input})");
}

#[test]
fn below_every_threshold_saturates() {
    let t = shipped_table();
    assert_eq!(t.lookup(-0.01), 255);
    assert_eq!(t.lookup(-40.0), 255);
    assert_eq!(t.floor(), 0.0);
}

#[test]
fn segments_meet_without_jumps() {
    // The shipped rows are chosen so each segment lands on the next row's
    // base duty; a regression here means someone edited one side only.
    let t = shipped_table();
    for (upper, lower) in [(85.0f32, 60.0f32), (60.0, 40.0), (40.0, 20.0), (20.0, 0.0)] {
        let just_below = upper - 0.05;
        let from_lower_segment = i32::from(t.lookup(just_below));
        let at_upper = i32::from(t.lookup(upper));
        assert!(
            (from_lower_segment - at_upper).abs() <= 1,
            "discontinuity between rows {upper} and {lower}"
        );
    }
}
