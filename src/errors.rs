/*!
 * Error types for the transcript-pdf pipeline.
 *
 * Each stage has its own error enum, defined with the thiserror crate.
 * `PipelineError` wraps them and records which stage failed so a single
 * log line is enough to diagnose a failed run.
 */

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::pdf::driver::RenderState;

/// Errors that can occur while obtaining the transcript payload
#[derive(Error, Debug)]
pub enum FetchError {
    /// Error when sending the request or reading the body fails
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Body returned by the API
        message: String,
    },

    /// The payload is not valid JSON or does not match the record shape
    #[error("Failed to parse transcript payload: {0}")]
    ParseError(String),

    /// The payload parsed but the record cannot be used
    #[error("Invalid transcript record: {0}")]
    InvalidRecord(String),

    /// Reading a local payload file failed
    #[error("File error: {0}")]
    File(String),
}

/// Errors raised while parsing or executing an HTML template
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemplateError {
    /// Malformed tag, unclosed section or mismatched closing tag
    #[error("Template syntax error in '{template}' at byte {offset}: {message}")]
    Syntax {
        template: String,
        offset: usize,
        message: String,
    },

    /// A referenced field is not present in the view
    #[error("Template '{template}' references missing field '{field}'")]
    MissingField { template: String, field: String },

    /// A substitution tag points at an object or array
    #[error("Template '{template}' cannot substitute non-scalar field '{field}'")]
    NotScalar { template: String, field: String },

    /// The view could not be converted into a binding tree
    #[error("Failed to bind view for template '{template}': {message}")]
    Binding { template: String, message: String },

    /// A template file configured to replace a built-in page could not be read
    #[error("Cannot read template '{template}': {message}")]
    Unreadable { template: String, message: String },
}

/// Errors raised while driving the rendering engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// The engine did not answer within the per-state timeout
    #[error("Render timed out in state {state} after {after:?}")]
    Timeout { state: RenderState, after: Duration },

    /// The engine answered with an error or an unexpected response
    #[error("Render protocol error: {0}")]
    Protocol(String),

    /// The engine process could not be started or is gone
    #[error("Render process unavailable: {0}")]
    ProcessUnavailable(String),

    /// The driver was asked to move between states that are not adjacent
    #[error("Invalid render state transition from {from} to {to}")]
    InvalidTransition { from: RenderState, to: RenderState },
}

/// Errors raised while merging the page documents
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MergeError {
    /// One of the inputs is not a usable PDF byte stream
    #[error("Malformed PDF input ({input}): {message}")]
    Format { input: String, message: String },

    /// The merged document could not be serialized
    #[error("Failed to write merged PDF: {0}")]
    Write(String),
}

/// Pipeline stage, used to tag failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Template,
    Render,
    Merge,
    Output,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Template => "template",
            Stage::Render => "render",
            Stage::Merge => "merge",
            Stage::Output => "output",
        };
        f.write_str(name)
    }
}

/// Main pipeline error type that wraps all stage errors
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Error while fetching or validating the record
    #[error("Stage 'fetch' failed: {0}")]
    Fetch(#[from] FetchError),

    /// Error while binding a page template
    #[error("Stage 'template' failed on page {page}: {source}")]
    Template {
        page: u8,
        #[source]
        source: TemplateError,
    },

    /// Error while starting the rendering engine
    #[error("Stage 'render' failed to start the engine: {0}")]
    EngineStart(RenderError),

    /// Error while printing a page to PDF
    #[error("Stage 'render' failed on page {page}: {source}")]
    Render {
        page: u8,
        #[source]
        source: RenderError,
    },

    /// Error while merging the two page documents
    #[error("Stage 'merge' failed: {0}")]
    Merge(#[from] MergeError),

    /// Error while persisting the output document
    #[error("Stage 'output' failed: {0}")]
    Output(String),
}

impl PipelineError {
    /// The stage that produced this error
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Fetch(_) => Stage::Fetch,
            PipelineError::Template { .. } => Stage::Template,
            PipelineError::EngineStart(_) | PipelineError::Render { .. } => Stage::Render,
            PipelineError::Merge(_) => Stage::Merge,
            PipelineError::Output(_) => Stage::Output,
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(error: std::io::Error) -> Self {
        Self::Output(error.to_string())
    }
}

impl From<std::io::Error> for FetchError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
