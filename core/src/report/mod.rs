//! Table-shaped reports produced per stage by pluggable report managers.

mod registry;
mod types;

pub use registry::{ReportManager, ReportRegistry};
pub use types::{Alignment, ReportColumn, TableReport, TaskReport};
