//! Task graph, run controller and incremental-build checks for an FPGA
//! compilation flow.

pub mod change;
pub mod config;
pub mod error;
pub mod events_out;
pub mod executor;
pub mod graph;
pub mod report;
pub mod task;
