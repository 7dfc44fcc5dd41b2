/*!
 * Headless Chromium engine, driven over the DevTools protocol with
 * chromiumoxide.
 *
 * One browser process serves every surface. Each surface is a tab opened on
 * `about:blank`; the page HTML is pushed straight into its main frame with
 * `Page.setDocumentContent`, so nothing touches the disk or the network.
 */

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as CdpBrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{
    GetFrameTreeParams, PrintToPdfParams, SetDocumentContentParams,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::StreamExt;
use log::{debug, info, warn};
use tempfile::TempDir;
use tokio::task::JoinHandle;

use crate::app_config::{BrowserConfig, PrintConfig};
use crate::errors::RenderError;
use crate::pdf::driver::{RenderEngine, RenderSurface};

const BLANK_PAGE: &str = "about:blank";
const READY_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Cleared once the DevTools connection is gone
type Liveness = Arc<AtomicBool>;

/// A running headless browser
pub struct ChromiumEngine {
    browser: Browser,
    events: JoinHandle<()>,
    alive: Liveness,
    exit_timeout: Duration,
    // Kept alive for the lifetime of the browser
    _profile: TempDir,
}

impl ChromiumEngine {
    /// Start the browser process and its protocol event loop
    pub async fn launch(config: &BrowserConfig) -> Result<Self, RenderError> {
        let profile = TempDir::new()
            .map_err(|e| RenderError::ProcessUnavailable(format!("cannot create browser profile: {}", e)))?;

        let mut builder = CdpBrowserConfig::builder()
            .user_data_dir(profile.path())
            .launch_timeout(Duration::from_secs(config.launch_timeout_secs))
            .request_timeout(Duration::from_secs(config.request_timeout_secs));

        if let Some(path) = &config.executable_path {
            builder = builder.chrome_executable(path);
        }
        if config.no_sandbox {
            builder = builder.no_sandbox();
        }
        for arg in &config.args {
            builder = builder.arg(arg.as_str());
        }

        let cdp_config = builder.build().map_err(RenderError::ProcessUnavailable)?;

        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| RenderError::ProcessUnavailable(e.to_string()))?;

        let alive: Liveness = Arc::new(AtomicBool::new(true));
        let event_flag = Arc::clone(&alive);
        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!("Browser event error: {}", err);
                }
            }
            event_flag.store(false, Ordering::SeqCst);
            debug!("Browser event loop finished");
        });

        info!("Browser started");
        Ok(Self {
            browser,
            events,
            alive,
            exit_timeout: Duration::from_secs(config.shutdown_timeout_secs),
            _profile: profile,
        })
    }

    fn ensure_alive(&self) -> Result<(), RenderError> {
        ensure_connected(&self.alive)
    }

    async fn kill(&mut self) {
        match self.browser.kill().await {
            Some(Err(err)) => warn!("Failed to kill browser process: {}", err),
            Some(Ok(())) => info!("Browser process killed"),
            None => {}
        }
    }
}

#[async_trait]
impl RenderEngine for ChromiumEngine {
    type Surface = ChromiumSurface;

    async fn open_surface(&mut self) -> Result<ChromiumSurface, RenderError> {
        self.ensure_alive()?;
        let page = self.browser.new_page(BLANK_PAGE).await.map_err(|e| {
            if self.alive.load(Ordering::SeqCst) {
                RenderError::Protocol(format!("cannot open blank page: {}", e))
            } else {
                RenderError::ProcessUnavailable(e.to_string())
            }
        })?;
        Ok(ChromiumSurface {
            page: Some(page),
            alive: Arc::clone(&self.alive),
        })
    }

    async fn shutdown(&mut self) -> Result<(), RenderError> {
        let closed = self.browser.close().await;
        match &closed {
            Err(err) => {
                warn!("Browser did not accept close ({}), killing it", err);
                self.kill().await;
            }
            Ok(_) => match tokio::time::timeout(self.exit_timeout, self.browser.wait()).await {
                Ok(Ok(_)) => {}
                Ok(Err(err)) => warn!("Failed to wait for browser exit: {}", err),
                Err(_) => {
                    warn!("Browser still running after {:?}, killing it", self.exit_timeout);
                    self.kill().await;
                }
            },
        }
        self.events.abort();
        info!("Browser stopped");
        closed
            .map(|_| ())
            .map_err(|e| RenderError::Protocol(format!("browser close failed: {}", e)))
    }
}

impl Drop for ChromiumEngine {
    fn drop(&mut self) {
        // The browser kills its own child process on drop
        self.events.abort();
    }
}

/// One browser tab
pub struct ChromiumSurface {
    page: Option<Page>,
    alive: Liveness,
}

impl ChromiumSurface {
    fn page(&self) -> Result<&Page, RenderError> {
        self.page
            .as_ref()
            .ok_or_else(|| RenderError::Protocol("surface already closed".to_string()))
    }
}

#[async_trait]
impl RenderSurface for ChromiumSurface {
    async fn inject_content(&mut self, html: &str) -> Result<(), RenderError> {
        let page = self.page()?;
        let tree = page
            .execute(GetFrameTreeParams::default())
            .await
            .map_err(|e| RenderError::Protocol(format!("Page.getFrameTree failed: {}", e)))?;
        let frame_id = tree.result.frame_tree.frame.id.clone();

        page.execute(SetDocumentContentParams::new(frame_id, html))
            .await
            .map_err(|e| RenderError::Protocol(format!("Page.setDocumentContent failed: {}", e)))?;
        Ok(())
    }

    async fn wait_ready(&mut self) -> Result<(), RenderError> {
        let page = self.page()?;
        // Bounded by the driver's ready timeout
        loop {
            ensure_connected(&self.alive)?;
            match page.find_element("body").await {
                Ok(_) => return Ok(()),
                Err(err) => {
                    if let Some(failure) = ready_failure(err, self.alive.load(Ordering::SeqCst)) {
                        return Err(failure);
                    }
                }
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    async fn capture_pdf(&mut self, options: &PrintConfig) -> Result<Vec<u8>, RenderError> {
        let page = self.page()?;
        page.pdf(print_params(options))
            .await
            .map_err(|e| RenderError::Protocol(format!("Page.printToPDF failed: {}", e)))
    }

    async fn close(&mut self) -> Result<(), RenderError> {
        if let Some(page) = self.page.take() {
            page.close()
                .await
                .map_err(|e| RenderError::Protocol(format!("cannot close page: {}", e)))?;
        }
        Ok(())
    }
}

fn ensure_connected(alive: &Liveness) -> Result<(), RenderError> {
    if !alive.load(Ordering::SeqCst) {
        return Err(RenderError::ProcessUnavailable(
            "browser connection is closed".to_string(),
        ));
    }
    Ok(())
}

/// Decide whether a failed `body` lookup means "not yet" or a broken session.
/// Chrome answers a lookup for a missing node with a protocol error response;
/// anything else comes from the transport.
fn ready_failure(err: CdpError, alive: bool) -> Option<RenderError> {
    if !alive {
        return Some(RenderError::ProcessUnavailable(err.to_string()));
    }
    match err {
        CdpError::Chrome(_) | CdpError::NotFound => None,
        other => Some(RenderError::Protocol(format!("waiting for document body failed: {}", other))),
    }
}

fn print_params(options: &PrintConfig) -> PrintToPdfParams {
    let mut params = PrintToPdfParams::default();
    params.landscape = Some(false);
    params.print_background = Some(options.print_background);
    params.prefer_css_page_size = Some(options.prefer_css_page_size);
    params.paper_width = Some(options.paper_width_in);
    params.paper_height = Some(options.paper_height_in);
    params.margin_top = Some(options.margin_in);
    params.margin_bottom = Some(options.margin_in);
    params.margin_left = Some(options.margin_in);
    params.margin_right = Some(options.margin_in);
    params
}
