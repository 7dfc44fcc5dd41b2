/*!
 * PDF production: the render driver and its engines, plus the merger.
 *
 * - `driver`: per-page state machine over the `RenderEngine` trait
 * - `chromium`: headless Chromium engine
 * - `mock`: scriptable engine for tests
 * - `merger`: joins page documents into one file
 */

pub mod chromium;
pub mod driver;
pub mod merger;
pub mod mock;

pub use chromium::{ChromiumEngine, ChromiumSurface};
pub use driver::{PdfDriver, RenderEngine, RenderState, RenderSurface, StepTimeouts};
pub use merger::{merge, merge_all, page_count};
pub use mock::{MockEngine, MockEvent, MockFault, MockStep};
