/*!
 * Render-to-PDF driver.
 *
 * Each page goes through the same sequence on a fresh surface of the
 * rendering engine:
 *
 * ```text
 * Idle -> Navigating -> ContentInjected -> Ready -> Captured -> Idle
 * ```
 *
 * Every step is bounded by its own timeout. The engine itself is owned by
 * the driver and shared by all renders until `shutdown` is called.
 */

use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};

use crate::app_config::{BrowserConfig, PrintConfig};
use crate::errors::RenderError;

/// Driver state for the page currently being rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    Idle,
    Navigating,
    ContentInjected,
    Ready,
    Captured,
}

impl RenderState {
    /// Whether the driver may move from `self` to `next`.
    /// Returning to `Idle` is always allowed so a failed page can be abandoned.
    pub fn can_transition_to(self, next: RenderState) -> bool {
        use RenderState::*;
        matches!(
            (self, next),
            (Idle, Navigating)
                | (Navigating, ContentInjected)
                | (ContentInjected, Ready)
                | (Ready, Captured)
                | (_, Idle)
        )
    }
}

impl fmt::Display for RenderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RenderState::Idle => "Idle",
            RenderState::Navigating => "Navigating",
            RenderState::ContentInjected => "ContentInjected",
            RenderState::Ready => "Ready",
            RenderState::Captured => "Captured",
        };
        f.write_str(name)
    }
}

/// A rendering engine session (one browser process)
#[async_trait]
pub trait RenderEngine: Send {
    /// The per-page surface type
    type Surface: RenderSurface;

    /// Open a blank surface
    async fn open_surface(&mut self) -> Result<Self::Surface, RenderError>;

    /// Tear the session down
    async fn shutdown(&mut self) -> Result<(), RenderError>;
}

/// One blank page of the rendering engine
#[async_trait]
pub trait RenderSurface: Send {
    /// Replace the surface's document with the given HTML
    async fn inject_content(&mut self, html: &str) -> Result<(), RenderError>;

    /// Resolve once the document's root structure is present
    async fn wait_ready(&mut self) -> Result<(), RenderError>;

    /// Print the surface to PDF bytes
    async fn capture_pdf(&mut self, options: &PrintConfig) -> Result<Vec<u8>, RenderError>;

    /// Release the surface
    async fn close(&mut self) -> Result<(), RenderError>;
}

/// Per-step time limits
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepTimeouts {
    pub navigate: Duration,
    pub inject: Duration,
    pub ready: Duration,
    pub capture: Duration,
    pub shutdown: Duration,
}

impl StepTimeouts {
    pub fn from_config(config: &BrowserConfig) -> Self {
        Self {
            navigate: Duration::from_secs(config.navigate_timeout_secs),
            inject: Duration::from_secs(config.inject_timeout_secs),
            ready: Duration::from_secs(config.ready_timeout_secs),
            capture: Duration::from_secs(config.capture_timeout_secs),
            shutdown: Duration::from_secs(config.shutdown_timeout_secs),
        }
    }

    /// Same limit for every step
    pub fn uniform(limit: Duration) -> Self {
        Self {
            navigate: limit,
            inject: limit,
            ready: limit,
            capture: limit,
            shutdown: limit,
        }
    }
}

/// Drives an engine through the per-page state machine
pub struct PdfDriver<E: RenderEngine> {
    engine: E,
    print: PrintConfig,
    timeouts: StepTimeouts,
    state: RenderState,
    history: Vec<RenderState>,
}

impl<E: RenderEngine> PdfDriver<E> {
    pub fn new(engine: E, print: PrintConfig, timeouts: StepTimeouts) -> Self {
        Self {
            engine,
            print,
            timeouts,
            state: RenderState::Idle,
            history: vec![RenderState::Idle],
        }
    }

    /// Current state
    pub fn state(&self) -> RenderState {
        self.state
    }

    /// Every state entered since the driver was created
    pub fn history(&self) -> &[RenderState] {
        &self.history
    }

    /// Render one HTML document to PDF bytes on a fresh surface
    pub async fn render_to_pdf(&mut self, html: &str) -> Result<Vec<u8>, RenderError> {
        if self.state != RenderState::Idle {
            return Err(RenderError::InvalidTransition {
                from: self.state,
                to: RenderState::Navigating,
            });
        }
        self.transition(RenderState::Navigating)?;

        let mut surface = match bounded(RenderState::Navigating, self.timeouts.navigate, self.engine.open_surface()).await {
            Ok(surface) => surface,
            Err(err) => {
                self.abandon();
                return Err(err);
            }
        };

        let result = self.drive(&mut surface, html).await;

        // Close failures do not invalidate bytes already captured
        if let Err(err) = bounded(self.state, self.timeouts.navigate, surface.close()).await {
            warn!("Failed to close render surface: {}", err);
        }

        match result {
            Ok(bytes) => {
                self.transition(RenderState::Idle)?;
                Ok(bytes)
            }
            Err(err) => {
                self.abandon();
                Err(err)
            }
        }
    }

    async fn drive(&mut self, surface: &mut E::Surface, html: &str) -> Result<Vec<u8>, RenderError> {
        bounded(RenderState::Navigating, self.timeouts.inject, surface.inject_content(html)).await?;
        self.transition(RenderState::ContentInjected)?;

        bounded(RenderState::ContentInjected, self.timeouts.ready, surface.wait_ready()).await?;
        self.transition(RenderState::Ready)?;

        let bytes = bounded(RenderState::Ready, self.timeouts.capture, surface.capture_pdf(&self.print)).await?;
        self.transition(RenderState::Captured)?;

        debug!("Captured {} PDF bytes from {} bytes of HTML", bytes.len(), html.len());
        Ok(bytes)
    }

    fn transition(&mut self, next: RenderState) -> Result<(), RenderError> {
        if !self.state.can_transition_to(next) {
            return Err(RenderError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        debug!("Render state {} -> {}", self.state, next);
        self.state = next;
        self.history.push(next);
        Ok(())
    }

    fn abandon(&mut self) {
        if self.state != RenderState::Idle {
            debug!("Abandoning render in state {}", self.state);
            self.state = RenderState::Idle;
            self.history.push(RenderState::Idle);
        }
    }

    /// Tear down the engine session, consuming the driver.
    /// An engine that does not stop in time is dropped with the driver.
    pub async fn shutdown(mut self) -> Result<(), RenderError> {
        bounded(RenderState::Idle, self.timeouts.shutdown, self.engine.shutdown()).await
    }
}

async fn bounded<T, F>(state: RenderState, limit: Duration, step: F) -> Result<T, RenderError>
where
    F: Future<Output = Result<T, RenderError>>,
{
    match tokio::time::timeout(limit, step).await {
        Ok(result) => result,
        Err(_) => Err(RenderError::Timeout { state, after: limit }),
    }
}
