pub mod cli;
pub mod list;
pub mod report;
pub mod run;
