// src/core/mod.rs
//! Configuration and file services around the reconciliation engine

pub mod config_manager;
pub mod fs_ops;

pub use config_manager::ConfigManager;
pub use fs_ops::FsOps;
