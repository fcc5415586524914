//! # Node Runtime Library
//!
//! Exposes the node runtime modules for testing. The main entry point is the
//! `main.rs` binary.

pub mod config;
pub mod genesis;
pub mod runtime;

pub use config::{load_config, NodeConfig};
pub use runtime::NodeRuntime;
