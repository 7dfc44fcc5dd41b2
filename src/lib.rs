/*!
 * # transcript-pdf
 *
 * Renders one student's academic transcript record into a two-page PDF.
 *
 * ## Features
 *
 * - Fetch the record from the registrar API, a saved JSON payload, or a
 *   generated sample
 * - Split the subject list over two pages with the fixed page-one capacity
 * - Bind each page to an HTML template
 * - Print both pages with headless Chromium over the DevTools protocol
 * - Merge the two page documents into `output_<student id>.pdf`
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `transcript`: The record model and its pagination
 * - `template`: Logic-less HTML templates
 * - `pdf`: Rendering and merging:
 *   - `pdf::driver`: Per-page render state machine
 *   - `pdf::chromium`: Headless Chromium engine
 *   - `pdf::mock`: Scriptable engine for tests
 *   - `pdf::merger`: PDF merging
 * - `source`: Where records come from
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod pdf;
pub mod source;
pub mod template;
pub mod transcript;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{Controller, RunOutcome};
pub use errors::{FetchError, MergeError, PipelineError, RenderError, Stage, TemplateError};
pub use template::Template;
pub use transcript::{paginate, BoundaryMode, PageOneView, PageTwoView, Subject, TranscriptRecord};
