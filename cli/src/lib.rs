//! fabflow command line: argument parsing and command implementations.

pub mod commands;
