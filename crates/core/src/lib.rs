//! Core utilities for the instanced renderer.
//!
//! This crate provides foundational types and utilities used across the renderer:
//! - Error types and result aliases
//! - Logging initialization
//! - Renderer configuration
//! - Frame timing

pub mod config;
mod error;
mod logging;
mod timer;

pub use config::{DEFAULT_FRAMES_IN_FLIGHT, MAX_FRAMES_IN_FLIGHT, RendererConfig};
pub use error::{Error, Result};
pub use logging::{DEFAULT_LOG_FILTER, init_logging, try_init_logging};
pub use timer::Timer;
