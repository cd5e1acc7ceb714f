//! Shared helpers for the producer binaries.

pub mod bootstrap;
