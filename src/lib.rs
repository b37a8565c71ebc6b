// Library crate for integration tests.
// main.rs has its own mod declarations; this re-exports all modules.

pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod links;
pub mod log_capture;
pub mod metrics;
pub mod record;
pub mod routes;
pub mod server;
pub mod session;
pub mod state;
pub mod status;
pub mod store;
pub mod tester;
