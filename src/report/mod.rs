// =============================================================================
// Report Module
// =============================================================================
//
// Turns indicator readings, peer snapshots and headlines into the briefing
// text.  Deterministic: the same inputs always produce the same report.

pub mod format;
pub mod narrative;

pub use narrative::{compose_report, ReportInput};
