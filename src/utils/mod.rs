// Shared utilities

pub mod retry;

pub use retry::with_retry;
