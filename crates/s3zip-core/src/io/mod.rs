//! I/O utilities for archive production.

pub mod sink;

pub use sink::SinkGuard;
pub use sink::SinkState;
