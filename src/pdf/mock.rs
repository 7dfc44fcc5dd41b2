/*!
 * Mock render engine for testing.
 *
 * Produces real single-page PDFs (built with lopdf) without a browser, and
 * can be scripted to hang or fail at any step of any surface:
 * - `MockEngine::working()` - every render succeeds
 * - `MockEngine::working().fail_on(2, MockStep::Capture, MockFault::Hang)` -
 *   the second page never finishes capturing, so the driver times out
 * - `MockEngine::working().fail_on_shutdown(MockFault::Hang)` - the browser
 *   never exits
 */

use std::sync::Arc;

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use parking_lot::Mutex;

use crate::app_config::PrintConfig;
use crate::errors::RenderError;
use crate::pdf::driver::{RenderEngine, RenderSurface};

/// Step of a surface at which a fault can be injected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockStep {
    Open,
    Inject,
    Ready,
    Capture,
}

/// What happens when a scripted step is reached
#[derive(Debug, Clone, PartialEq)]
pub enum MockFault {
    /// Never completes
    Hang,
    /// Fails with the given error
    Fail(RenderError),
}

/// Observable engine activity, in order
#[derive(Debug, Clone, PartialEq)]
pub enum MockEvent {
    Opened(usize),
    Injected(usize),
    Ready(usize),
    Captured(usize),
    Closed(usize),
    Shutdown,
}

/// Shared log of engine activity
pub type MockRecorder = Arc<Mutex<Vec<MockEvent>>>;

#[derive(Debug, Clone)]
struct Script {
    faults: Vec<(usize, MockStep, MockFault)>,
    events: MockRecorder,
}

impl Script {
    fn fault_for(&self, surface: usize, step: MockStep) -> Option<MockFault> {
        self.faults
            .iter()
            .find(|(s, st, _)| *s == surface && *st == step)
            .map(|(_, _, fault)| fault.clone())
    }

    async fn apply(&self, surface: usize, step: MockStep) -> Result<(), RenderError> {
        match self.fault_for(surface, step) {
            Some(MockFault::Hang) => std::future::pending().await,
            Some(MockFault::Fail(err)) => Err(err),
            None => Ok(()),
        }
    }

    fn record(&self, event: MockEvent) {
        self.events.lock().push(event);
    }
}

/// Scriptable stand-in for a browser session
#[derive(Debug)]
pub struct MockEngine {
    script: Script,
    opened: usize,
    shutdown_fault: Option<MockFault>,
}

impl MockEngine {
    /// An engine where every step succeeds
    pub fn working() -> Self {
        Self {
            script: Script {
                faults: Vec::new(),
                events: Arc::new(Mutex::new(Vec::new())),
            },
            opened: 0,
            shutdown_fault: None,
        }
    }

    /// Inject a fault at `step` of the `surface`-th surface (1-based)
    pub fn fail_on(mut self, surface: usize, step: MockStep, fault: MockFault) -> Self {
        self.script.faults.push((surface, step, fault));
        self
    }

    /// Inject a fault into engine shutdown
    pub fn fail_on_shutdown(mut self, fault: MockFault) -> Self {
        self.shutdown_fault = Some(fault);
        self
    }

    /// Handle to the activity log that outlives the engine
    pub fn recorder(&self) -> MockRecorder {
        Arc::clone(&self.script.events)
    }
}

#[async_trait]
impl RenderEngine for MockEngine {
    type Surface = MockSurface;

    async fn open_surface(&mut self) -> Result<MockSurface, RenderError> {
        self.opened += 1;
        let number = self.opened;
        self.script.apply(number, MockStep::Open).await?;
        self.script.record(MockEvent::Opened(number));
        Ok(MockSurface {
            number,
            script: self.script.clone(),
            html: None,
        })
    }

    async fn shutdown(&mut self) -> Result<(), RenderError> {
        self.script.record(MockEvent::Shutdown);
        match self.shutdown_fault.clone() {
            Some(MockFault::Hang) => std::future::pending().await,
            Some(MockFault::Fail(err)) => Err(err),
            None => Ok(()),
        }
    }
}

/// Surface handed out by `MockEngine`
#[derive(Debug)]
pub struct MockSurface {
    number: usize,
    script: Script,
    html: Option<String>,
}

#[async_trait]
impl RenderSurface for MockSurface {
    async fn inject_content(&mut self, html: &str) -> Result<(), RenderError> {
        self.script.apply(self.number, MockStep::Inject).await?;
        self.html = Some(html.to_string());
        self.script.record(MockEvent::Injected(self.number));
        Ok(())
    }

    async fn wait_ready(&mut self) -> Result<(), RenderError> {
        self.script.apply(self.number, MockStep::Ready).await?;
        if self.html.is_none() {
            return Err(RenderError::Protocol("no document loaded".to_string()));
        }
        self.script.record(MockEvent::Ready(self.number));
        Ok(())
    }

    async fn capture_pdf(&mut self, options: &PrintConfig) -> Result<Vec<u8>, RenderError> {
        self.script.apply(self.number, MockStep::Capture).await?;
        let bytes = single_page_pdf(&format!("surface {}", self.number), options)
            .map_err(|e| RenderError::Protocol(e.to_string()))?;
        self.script.record(MockEvent::Captured(self.number));
        Ok(bytes)
    }

    async fn close(&mut self) -> Result<(), RenderError> {
        self.script.record(MockEvent::Closed(self.number));
        Ok(())
    }
}

/// Build a one-page PDF showing `text`, sized from the print options
pub fn single_page_pdf(text: &str, options: &PrintConfig) -> Result<Vec<u8>, lopdf::Error> {
    let width = (options.paper_width_in * 72.0).round() as i64;
    let height = (options.paper_height_in * 72.0).round() as i64;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Times-Roman",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), (height - 72).into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    // Size and resources live on the page tree node and are inherited
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}
