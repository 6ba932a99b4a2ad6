//! Core domain models for multibuild
//!
//! This module defines the fundamental data structures that represent
//! targets, step pipelines and their configuration.

pub mod config;
pub mod pipeline;
pub mod project;
pub mod step;
pub mod steps;
pub mod target;
pub mod template;
pub mod validation;

pub use config::*;
pub use pipeline::*;
pub use project::*;
pub use step::*;
pub use target::*;
pub use validation::*;
