//! Request handlers.

pub mod loader;
