pub mod adapters;
pub mod application;
pub mod catalog;
pub mod common;
pub mod config;
pub mod domains;

pub use crate::config::{Config, ConfigStore};

// Re-export common types
pub use common::*;

// Re-export the gateway and dispatch layer
pub use application::*;

// Re-export domain ports and resources
pub use domains::*;
