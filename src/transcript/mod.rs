/*!
 * Transcript data model and pagination.
 *
 * - `model`: the record as received from the source, plus derived fields
 * - `paginate`: the two page-scoped views built from a record
 */

pub mod model;
pub mod paginate;

pub use model::{Subject, ThesisTitle, TranscriptRecord};
pub use paginate::{paginate, paginate_with, BoundaryMode, PageOneView, PageTwoView};
