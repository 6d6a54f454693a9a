//! Diagnostic sink implementations: delimited line, JSON lines, and the
//! packed binary record the bench receiver decodes.

use std::io::Write;

use valvemu_core::{DiagnosticSink, Snapshot};

fn flag(b: bool) -> i16 {
    i16::from(b)
}

/// Slash-delimited line, one snapshot per line:
/// `open/close/pump/power/position/tank/engine`.
pub struct LineSink<W: Write> {
    out: W,
}

impl<W: Write> LineSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl LineSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> DiagnosticSink for LineSink<W> {
    fn emit(&mut self, s: &Snapshot) {
        let _ = writeln!(
            self.out,
            "{}/{}/{}/{}/{:.2}/{:.1}/{:.1}",
            flag(s.open),
            flag(s.close),
            flag(s.pump),
            flag(s.power),
            s.position_v,
            s.tank_c,
            s.engine_c,
        );
    }
}

/// One JSON object per snapshot.
pub struct JsonSink<W: Write> {
    out: W,
}

impl<W: Write> JsonSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl JsonSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> DiagnosticSink for JsonSink<W> {
    fn emit(&mut self, s: &Snapshot) {
        let line = serde_json::json!({
            "open": s.open,
            "close": s.close,
            "pump": s.pump,
            "power": s.power,
            "position_v": s.position_v,
            "tank_c": s.tank_c,
            "engine_c": s.engine_c,
        });
        let _ = writeln!(self.out, "{line}");
    }
}

/// The 22-byte record of the bench receiver: four little-endian i16 pin
/// states, three little-endian f32s, CRLF terminator.
pub struct BinarySink<W: Write> {
    out: W,
}

impl<W: Write> BinarySink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn encode(s: &Snapshot) -> [u8; 22] {
        let mut buf = [0u8; 22];
        buf[0..2].copy_from_slice(&flag(s.open).to_le_bytes());
        buf[2..4].copy_from_slice(&flag(s.close).to_le_bytes());
        buf[4..6].copy_from_slice(&flag(s.pump).to_le_bytes());
        buf[6..8].copy_from_slice(&flag(s.power).to_le_bytes());
        buf[8..12].copy_from_slice(&s.position_v.to_le_bytes());
        buf[12..16].copy_from_slice(&s.tank_c.to_le_bytes());
        buf[16..20].copy_from_slice(&s.engine_c.to_le_bytes());
        buf[20] = b'\r';
        buf[21] = b'\n';
        buf
    }
}

impl BinarySink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> DiagnosticSink for BinarySink<W> {
    fn emit(&mut self, s: &Snapshot) {
        let _ = self.out.write_all(&Self::encode(s));
        let _ = self.out.flush();
    }
}
