//! Concrete adapters for the fabflow engine: the monitored tool runner, the
//! OpenFPGA stage actions and the log-parsing report managers.

pub mod factory;
pub mod flow;
pub mod reports;
pub mod runner;
