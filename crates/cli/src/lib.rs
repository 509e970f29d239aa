//! selstore CLI library
//!
//! Exposes the command definitions so tests can drive them directly.

pub mod commands;
pub mod exit_code;
pub mod output;
