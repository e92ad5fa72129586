//! Error types for customtools-core

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::path::Path;
use thiserror::Error;

/// Main error type for tool resolution and environment preparation
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// A selected tool has no entry in the registry
    #[error("Cannot find tool '{name}' in the tool registry")]
    #[diagnostic(
        code(customtools::tool::unknown),
        help("The tool may have been renamed or deleted. Check the configured tools list")
    )]
    UnknownTool {
        /// Name of the missing tool
        name: String,
    },

    /// Home resolution or installation failed for a named tool
    #[error("Failed to resolve tool '{name}': {cause}")]
    #[diagnostic(code(customtools::tool::resolution))]
    ToolResolution {
        /// Name of the failing tool
        name: String,
        /// Underlying cause, rendered as text
        cause: String,
    },

    /// An installer could not materialize a tool
    #[error("Installation failed: {message}")]
    #[diagnostic(code(customtools::installer::failed))]
    Installation {
        /// What went wrong
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },

    /// Invalid configuration or user input
    #[error("Configuration error: {message}")]
    #[diagnostic(code(customtools::config::invalid))]
    Configuration {
        /// The error message describing the configuration issue
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },

    /// I/O error with path context
    #[error("I/O {operation} failed{}", path.as_ref().map_or(String::new(), |p| format!(": {}", p.display())))]
    #[diagnostic(
        code(customtools::io),
        help("Check file permissions and ensure the path exists")
    )]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Path that caused the error, if available
        path: Option<Box<Path>>,
        /// Operation that failed (e.g., "read", "spawn")
        operation: String,
    },
}

impl Error {
    /// Create an unknown tool error
    #[must_use]
    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self::UnknownTool { name: name.into() }
    }

    /// Create a tool resolution error from any displayable cause
    #[must_use]
    pub fn tool_resolution(name: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::ToolResolution {
            name: name.into(),
            cause: cause.to_string(),
        }
    }

    /// Create an installation error
    #[must_use]
    pub fn installation(message: impl Into<String>) -> Self {
        Self::Installation {
            message: message.into(),
            help: None,
        }
    }

    /// Create an installation error with help text
    #[must_use]
    pub fn installation_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Installation {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            help: None,
        }
    }

    /// Create a configuration error with help text
    #[must_use]
    pub fn configuration_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create an I/O error with path context
    #[must_use]
    pub fn io(source: std::io::Error, path: impl AsRef<Path>, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: Some(path.as_ref().into()),
            operation: operation.into(),
        }
    }

    /// Create an I/O error without path context
    #[must_use]
    pub fn io_no_path(source: std::io::Error, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: None,
            operation: operation.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::io_no_path(source, "operation")
    }
}

/// Result type alias for customtools operations
pub type Result<T> = std::result::Result<T, Error>;
