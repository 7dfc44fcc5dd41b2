use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::PathBuf;

use crate::transcript::BoundaryMode;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Where the transcript record comes from
    #[serde(default)]
    pub source: SourceConfig,

    /// Template overrides
    #[serde(default)]
    pub templates: TemplateConfig,

    /// Headless browser settings
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Subject list pagination
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Remote transcript API
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SourceConfig {
    // @field: Endpoint returning one transcript record
    #[serde(default = "String::new", alias = "apiURL")]
    pub api_url: String,

    // @field: Value of the LOGIN request header
    #[serde(default = "String::new", alias = "loginToken")]
    pub login_token: String,

    // @field: Timeout seconds
    #[serde(default = "default_source_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            login_token: String::new(),
            timeout_secs: default_source_timeout_secs(),
        }
    }
}

/// Optional template files replacing the built-in pages
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct TemplateConfig {
    /// Template for the first page
    #[serde(default)]
    pub page_one: Option<PathBuf>,

    /// Template for the second page
    #[serde(default)]
    pub page_two: Option<PathBuf>,
}

/// Headless browser configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BrowserConfig {
    /// Chromium executable; detected on the system when absent
    #[serde(default)]
    pub executable_path: Option<PathBuf>,

    /// Disable the Chromium sandbox (needed when running as root in containers)
    #[serde(default)]
    pub no_sandbox: bool,

    /// Time allowed for the browser process to come up
    #[serde(default = "default_launch_timeout_secs")]
    pub launch_timeout_secs: u64,

    /// Time allowed for a single DevTools request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Time allowed to open a blank page
    #[serde(default = "default_step_timeout_secs")]
    pub navigate_timeout_secs: u64,

    /// Time allowed to set the page content
    #[serde(default = "default_step_timeout_secs")]
    pub inject_timeout_secs: u64,

    /// Time allowed for the document body to appear
    #[serde(default = "default_step_timeout_secs")]
    pub ready_timeout_secs: u64,

    /// Time allowed for printing to PDF
    #[serde(default = "default_capture_timeout_secs")]
    pub capture_timeout_secs: u64,

    /// Time allowed for the browser to exit before it is killed
    #[serde(default = "default_step_timeout_secs")]
    pub shutdown_timeout_secs: u64,

    /// Extra command line switches for the browser
    #[serde(default)]
    pub args: Vec<String>,

    /// Print settings
    #[serde(default)]
    pub print: PrintConfig,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            executable_path: None,
            no_sandbox: false,
            launch_timeout_secs: default_launch_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            navigate_timeout_secs: default_step_timeout_secs(),
            inject_timeout_secs: default_step_timeout_secs(),
            ready_timeout_secs: default_step_timeout_secs(),
            capture_timeout_secs: default_capture_timeout_secs(),
            shutdown_timeout_secs: default_step_timeout_secs(),
            args: Vec::new(),
            print: PrintConfig::default(),
        }
    }
}

/// Page setup used when printing to PDF
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PrintConfig {
    /// Paper width in inches
    #[serde(default = "default_paper_width_in")]
    pub paper_width_in: f64,

    /// Paper height in inches
    #[serde(default = "default_paper_height_in")]
    pub paper_height_in: f64,

    /// Margin on every side, in inches
    #[serde(default)]
    pub margin_in: f64,

    /// Print background colors and images
    #[serde(default = "default_true")]
    pub print_background: bool,

    /// Let a CSS `@page` size win over the paper size
    #[serde(default = "default_true")]
    pub prefer_css_page_size: bool,
}

impl Default for PrintConfig {
    fn default() -> Self {
        Self {
            paper_width_in: default_paper_width_in(),
            paper_height_in: default_paper_height_in(),
            margin_in: 0.0,
            print_background: true,
            prefer_css_page_size: true,
        }
    }
}

/// Output file settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OutputConfig {
    /// Directory receiving the generated files
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,

    /// Also write each single-page PDF
    #[serde(default)]
    pub keep_pages: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            keep_pages: false,
        }
    }
}

/// Subject list split settings
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct PaginationConfig {
    /// How the page boundary is drawn
    #[serde(default)]
    pub boundary: BoundaryMode,
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_source_timeout_secs() -> u64 {
    30
}

fn default_launch_timeout_secs() -> u64 {
    20
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_step_timeout_secs() -> u64 {
    10
}

fn default_capture_timeout_secs() -> u64 {
    30
}

// A4
fn default_paper_width_in() -> f64 {
    8.27
}

fn default_paper_height_in() -> f64 {
    11.69
}

fn default_output_directory() -> PathBuf {
    PathBuf::from(".")
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if !self.source.api_url.is_empty() {
            url::Url::parse(&self.source.api_url)
                .map_err(|e| anyhow!("Invalid source.api_url '{}': {}", self.source.api_url, e))?;
        }

        let browser = &self.browser;
        let timeouts = [
            ("launch_timeout_secs", browser.launch_timeout_secs),
            ("request_timeout_secs", browser.request_timeout_secs),
            ("navigate_timeout_secs", browser.navigate_timeout_secs),
            ("inject_timeout_secs", browser.inject_timeout_secs),
            ("ready_timeout_secs", browser.ready_timeout_secs),
            ("capture_timeout_secs", browser.capture_timeout_secs),
            ("shutdown_timeout_secs", browser.shutdown_timeout_secs),
        ];
        for (name, value) in timeouts {
            if value == 0 {
                return Err(anyhow!("browser.{} must be greater than zero", name));
            }
        }

        let print = &browser.print;
        if print.paper_width_in <= 0.0 || print.paper_height_in <= 0.0 {
            return Err(anyhow!("browser.print paper size must be positive"));
        }
        if print.margin_in < 0.0
            || print.margin_in * 2.0 >= print.paper_width_in
            || print.margin_in * 2.0 >= print.paper_height_in
        {
            return Err(anyhow!("browser.print.margin_in leaves no printable area"));
        }

        Ok(())
    }

    /// Whether a remote API is configured as the record source
    pub fn has_api_source(&self) -> bool {
        !self.source.api_url.is_empty()
    }
}
