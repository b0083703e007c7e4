//! Incremental skip: decides whether a tool step must run again.

mod detector;
mod fs;

pub use detector::{detect_change, ChangeReason, ChangeStatus, DesignInputs, StepArtifacts};
pub use fs::{BuildFs, LocalFs, MemoryFs};
