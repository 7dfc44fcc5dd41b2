/*!
 * Tests for error types and conversions
 */

use std::time::Duration;

use transcript_pdf::errors::{FetchError, MergeError, PipelineError, RenderError, Stage, TemplateError};
use transcript_pdf::pdf::driver::RenderState;

#[test]
fn test_fetchError_apiError_shouldDisplayStatusAndMessage() {
    let error = FetchError::ApiError {
        status_code: 401,
        message: "invalid login".to_string(),
    };
    let display = format!("{}", error);
    assert!(display.contains("401"));
    assert!(display.contains("invalid login"));
}

#[test]
fn test_pipelineError_fromFetchError_shouldTagFetchStage() {
    let error: PipelineError = FetchError::InvalidRecord("student id is empty".to_string()).into();
    assert_eq!(error.stage(), Stage::Fetch);
    assert!(error.to_string().contains("student id is empty"));
}

#[test]
fn test_pipelineError_render_shouldNamePageAndState() {
    let error = PipelineError::Render {
        page: 2,
        source: RenderError::Timeout {
            state: RenderState::Ready,
            after: Duration::from_secs(30),
        },
    };
    let display = error.to_string();
    assert_eq!(error.stage(), Stage::Render);
    assert!(display.contains("page 2"));
    assert!(display.contains("Ready"));
}

#[test]
fn test_pipelineError_template_shouldTagTemplateStage() {
    let error = PipelineError::Template {
        page: 1,
        source: TemplateError::MissingField {
            template: "page_1.html".to_string(),
            field: "name".to_string(),
        },
    };
    assert_eq!(error.stage(), Stage::Template);
    assert!(error.to_string().contains("'name'"));
}

#[test]
fn test_pipelineError_fromMergeError_shouldTagMergeStage() {
    let error: PipelineError = MergeError::Format {
        input: "input 2".to_string(),
        message: "missing %PDF- header".to_string(),
    }
    .into();
    assert_eq!(error.stage(), Stage::Merge);
    assert_eq!(error.stage().to_string(), "merge");
}

#[test]
fn test_pipelineError_fromIoError_shouldBeOutputError() {
    let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
    let error: PipelineError = io_error.into();
    assert_eq!(error.stage(), Stage::Output);
    assert!(error.to_string().contains("read-only"));
}
