//! Custom tool environments for build jobs
//!
//! This crate resolves the custom tools a job asks for on the node it runs
//! on and turns them into a single environment mutation:
//! - Tool homes, either configured or produced by an installer
//! - `<TOOL>_HOME` and additional variables, with `${VAR}` expansion
//! - Label-scoped overrides, per tool and job-wide
//! - PATH entries exported by each tool
//!
//! # Overview
//!
//! [`ToolEnvironment::prepare_environment`] runs once per build and returns an
//! [`EnvironmentMutation`]. [`BuildEnvironment::wrap`] applies it around the
//! build's steps and restores the previous environment when the scope ends.

pub mod config;
pub mod environment;
mod error;
pub mod labels;
pub mod node;
pub mod paths;
mod prepare;
pub mod tools;
pub mod variables;

// Re-export error types at crate root
pub use error::{Error, Result};

// Re-export main types
pub use environment::{
    BuildEnvironment, Environment, EnvironmentMutation, EnvironmentScope, apply_mutation, compose,
};
pub use labels::{LabelExpressionMatcher, LabelMatcher, LabelSpecifics};
pub use node::{Node, NodeContext};
pub use prepare::ToolEnvironment;
pub use tools::{CustomTool, ResolvedTool, SelectedTool, ToolRegistry};
