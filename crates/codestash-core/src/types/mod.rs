//! Type definitions for codestash configuration

pub mod config_types;
pub mod output;
pub mod step;

pub use config_types::*;
pub use output::*;
pub use step::*;
