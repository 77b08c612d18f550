//! CLI commands and sandbox wiring

pub mod commands;
pub mod sandbox;
