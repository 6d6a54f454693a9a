//! Diagnostic snapshot and the narrow sink interface.
//!
//! The core only knows how to hand a `Snapshot` to a `DiagnosticSink`;
//! encodings (delimited line, JSON, packed binary) live with the binary.

/// One periodic observation of all inputs and tracked state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub open: bool,
    pub close: bool,
    pub pump: bool,
    pub power: bool,
    pub position_v: f32,
    pub tank_c: f32,
    pub engine_c: f32,
}

/// Where snapshots go. Implementations must not block the loop for longer
/// than a tick period.
pub trait DiagnosticSink {
    fn emit(&mut self, snapshot: &Snapshot);
}
