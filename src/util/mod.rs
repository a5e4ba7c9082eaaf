//! Shared utilities: source spans and logging

pub mod logger;
pub mod span;
