//! Grapnel Web - HTTP API server
//!
//! Exposes the download service over HTTP: metadata lookups, direct
//! pass-through downloads, and locally remuxed combine downloads.

pub mod error;
pub mod handlers;
pub mod server;

pub use server::{AppState, router, run_server};
