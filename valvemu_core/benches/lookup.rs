use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use valvemu_core::{InterpTable, TableRow};

fn shipped_table() -> InterpTable {
    InterpTable::new(vec![
        TableRow {
            threshold: 85.0,
            base_duty: 0,
            slope: 0.0,
        },
        TableRow {
            threshold: 60.0,
            base_duty: 30,
            slope: -1.2,
        },
        TableRow {
            threshold: 40.0,
            base_duty: 78,
            slope: -2.4,
        },
        TableRow {
            threshold: 20.0,
            base_duty: 140,
            slope: -3.1,
        },
        TableRow {
            threshold: 0.0,
            base_duty: 208,
            slope: -3.4,
        },
    ])
    .unwrap()
}

fn bench_lookup(c: &mut Criterion) {
    let table = shipped_table();
    c.bench_function("lookup_sweep", |b| {
        b.iter(|| {
            let mut acc: u32 = 0;
            let mut t = -10.0_f32;
            while t < 100.0 {
                acc += u32::from(table.lookup(black_box(t)));
                t += 0.5;
            }
            acc
        })
    });
}

criterion_group!(benches, bench_lookup);
criterion_main!(benches);
