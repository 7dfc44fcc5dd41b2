use log::{debug, info, warn};
use std::future::Future;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

use crate::app_config::Config;
use crate::errors::{PipelineError, RenderError, TemplateError};
use crate::file_utils::FileManager;
use crate::pdf::{merger, PdfDriver, RenderEngine, StepTimeouts};
use crate::source::TranscriptSource;
use crate::template::{Template, PAGE_ONE_TEMPLATE, PAGE_TWO_TEMPLATE};
use crate::transcript::{paginate_with, TranscriptRecord};

// @module: Application controller for transcript generation

/// Files produced by a successful run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Student the transcript belongs to
    pub student_id: String,
    /// Merged transcript
    pub output_path: PathBuf,
    /// Single page documents, when kept
    pub page_paths: Vec<PathBuf>,
    /// Pages in the merged document
    pub page_count: usize,
    /// Wall time of the whole run
    pub elapsed: Duration,
}

/// Main application controller for transcript generation
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Replace existing output files
    force_overwrite: bool,
    // @field: Show a spinner on the terminal
    show_progress: bool,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            force_overwrite: false,
            show_progress: false,
        }
    }

    /// Replace output files that already exist
    pub fn force_overwrite(mut self, force: bool) -> Self {
        self.force_overwrite = force;
        self
    }

    /// Report the current stage on a terminal spinner
    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// The active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the whole pipeline for one transcript.
    ///
    /// `launch` starts the rendering engine. It is only called once the record
    /// is fetched and both pages are bound to their templates, and the engine
    /// is always shut down before this returns. Nothing is written unless
    /// both pages render and merge.
    pub async fn run<S, E, F, Fut>(&self, source: &S, launch: F) -> Result<RunOutcome, PipelineError>
    where
        S: TranscriptSource + ?Sized,
        E: RenderEngine,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<E, RenderError>>,
    {
        let start_time = Instant::now();
        let progress = self.spinner();

        progress.set_message("Loading templates");
        let (page_one_template, page_two_template) = self.load_templates()?;
        debug!(
            "Templates ready: {} and {}",
            page_one_template.name(),
            page_two_template.name()
        );

        progress.set_message(format!("Fetching transcript from {}", source.describe()));
        let record = source.fetch().await?;
        info!(
            "Fetched transcript for student {} ({} subjects, {} credits)",
            record.student_id,
            record.subjects.len(),
            record.credits_total
        );

        progress.set_message("Binding templates");
        let (html_one, html_two) = self.render_html(&record, &page_one_template, &page_two_template)?;

        let output_dir = &self.config.output.directory;
        let output_path = FileManager::output_path(output_dir, &record.student_id);
        let page_paths: Vec<PathBuf> = if self.config.output.keep_pages {
            (1..=2u8)
                .map(|page| FileManager::page_path(output_dir, page, &record.student_id))
                .collect()
        } else {
            Vec::new()
        };
        for path in std::iter::once(&output_path).chain(&page_paths) {
            FileManager::check_overwrite(path, self.force_overwrite).map_err(output_error)?;
        }

        progress.set_message("Starting browser");
        let engine = launch().await.map_err(PipelineError::EngineStart)?;
        let mut driver = PdfDriver::new(
            engine,
            self.config.browser.print.clone(),
            StepTimeouts::from_config(&self.config.browser),
        );
        let rendered = Self::render_pages(&mut driver, &progress, &html_one, &html_two).await;
        if let Err(err) = driver.shutdown().await {
            warn!("Failed to shut down the browser cleanly: {}", err);
        }
        let (pdf_one, pdf_two) = rendered?;

        progress.set_message("Merging pages");
        let merged = merger::merge(&pdf_one, &pdf_two)?;
        let page_count = merger::page_count(&merged)?;

        progress.set_message("Writing output");
        FileManager::write_atomic(&output_path, &merged).map_err(output_error)?;
        // Page documents only accompany a merged transcript that was written
        for (path, bytes) in page_paths.iter().zip([&pdf_one, &pdf_two]) {
            FileManager::write_atomic(path, bytes).map_err(output_error)?;
        }

        progress.finish_and_clear();
        let elapsed = start_time.elapsed();
        info!(
            "PDF generated for student {} at {:?} ({} pages, {})",
            record.student_id,
            output_path,
            page_count,
            Self::format_duration(elapsed)
        );

        Ok(RunOutcome {
            student_id: record.student_id,
            output_path,
            page_paths,
            page_count,
            elapsed,
        })
    }

    /// Parse both page templates, built-in or from the configured files
    pub fn load_templates(&self) -> Result<(Template, Template), PipelineError> {
        let templates = &self.config.templates;
        let page_one = Self::load_template(1, "page_1.html", templates.page_one.as_ref(), PAGE_ONE_TEMPLATE)?;
        let page_two = Self::load_template(2, "page_2.html", templates.page_two.as_ref(), PAGE_TWO_TEMPLATE)?;
        Ok((page_one, page_two))
    }

    fn load_template(
        page: u8,
        builtin_name: &str,
        path: Option<&PathBuf>,
        builtin: &str,
    ) -> Result<Template, PipelineError> {
        let parsed = match path {
            Some(path) => {
                let name = path.display().to_string();
                let source = FileManager::read_to_string(path).map_err(|e| PipelineError::Template {
                    page,
                    source: TemplateError::Unreadable {
                        template: name.clone(),
                        message: format!("{:#}", e),
                    },
                })?;
                debug!("Using template {} for page {}", name, page);
                Template::parse(&name, &source)
            }
            None => Template::parse(builtin_name, builtin),
        };
        parsed.map_err(|source| PipelineError::Template { page, source })
    }

    /// Split the record over the two pages and bind each page to its template
    pub fn render_html(
        &self,
        record: &TranscriptRecord,
        page_one_template: &Template,
        page_two_template: &Template,
    ) -> Result<(String, String), PipelineError> {
        let (page_one, page_two) = paginate_with(record, self.config.pagination.boundary);
        debug!(
            "Paginated {} subjects: {} on page 1, {} on page 2",
            record.subjects.len(),
            page_one.subjects.len(),
            page_two.subjects.len()
        );

        let html_one = page_one_template
            .render(&page_one)
            .map_err(|source| PipelineError::Template { page: 1, source })?;
        let html_two = page_two_template
            .render(&page_two)
            .map_err(|source| PipelineError::Template { page: 2, source })?;
        Ok((html_one, html_two))
    }

    async fn render_pages<E: RenderEngine>(
        driver: &mut PdfDriver<E>,
        progress: &ProgressBar,
        html_one: &str,
        html_two: &str,
    ) -> Result<(Vec<u8>, Vec<u8>), PipelineError> {
        progress.set_message("Rendering page 1");
        let pdf_one = driver
            .render_to_pdf(html_one)
            .await
            .map_err(|source| PipelineError::Render { page: 1, source })?;

        progress.set_message("Rendering page 2");
        let pdf_two = driver
            .render_to_pdf(html_two)
            .await
            .map_err(|source| PipelineError::Render { page: 2, source })?;

        Ok((pdf_one, pdf_two))
    }

    fn spinner(&self) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    }

    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let minutes = total_seconds / 60;
        let seconds = total_seconds % 60;

        if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}

fn output_error(error: anyhow::Error) -> PipelineError {
    PipelineError::Output(format!("{:#}", error))
}
