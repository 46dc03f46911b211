// The binary entry point is main.rs; everything it drives lives here so the
// integration tests can reach it too.

pub mod app;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod session;
pub mod store;
