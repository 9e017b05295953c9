//! Core domain models
//!
//! This module defines the build configuration, file selection, task
//! composition, and the pipeline/step state the engine drives.

pub mod composition;
pub mod config;
pub mod pipeline;
pub mod selection;
pub mod state;
pub mod step;

pub use composition::*;
pub use config::{BuildConfig, Project, ReloadKind};
pub use pipeline::*;
pub use selection::{FileSet, SelectedFile, SelectionError};
pub use state::*;
pub use step::*;
