/*!
 * End-to-end pipeline tests: source to merged file, rendered on the mock engine
 */

use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use transcript_pdf::app_controller::Controller;
use transcript_pdf::errors::{FetchError, PipelineError, RenderError, Stage, TemplateError};
use transcript_pdf::pdf::driver::RenderState;
use transcript_pdf::pdf::{merger, MockEngine, MockEvent, MockFault, MockStep};
use transcript_pdf::source::{FileSource, SampleSource, TranscriptSource};

use crate::common;

#[tokio::test]
async fn test_run_withSampleRecord_shouldWriteTwoPagePdf() {
    common::init_test_logger();
    let temp_dir = common::create_temp_dir().unwrap();
    let controller = Controller::with_config(common::test_config(temp_dir.path()));
    let engine = MockEngine::working();
    let events = engine.recorder();

    let outcome = controller
        .run(&SampleSource::new(3), move || async move { Ok(engine) })
        .await
        .unwrap();

    assert_eq!(outcome.student_id, "20190001");
    assert_eq!(outcome.output_path, temp_dir.path().join("output_20190001.pdf"));
    assert_eq!(outcome.page_count, 2);
    assert!(outcome.page_paths.is_empty());

    let bytes = fs::read(&outcome.output_path).unwrap();
    assert!(bytes.starts_with(b"%PDF-"));
    assert_eq!(merger::page_count(&bytes).unwrap(), 2);
    assert_eq!(common::list_files(temp_dir.path()), vec!["output_20190001.pdf"]);

    assert_eq!(
        *events.lock(),
        vec![
            MockEvent::Opened(1),
            MockEvent::Injected(1),
            MockEvent::Ready(1),
            MockEvent::Captured(1),
            MockEvent::Closed(1),
            MockEvent::Opened(2),
            MockEvent::Injected(2),
            MockEvent::Ready(2),
            MockEvent::Captured(2),
            MockEvent::Closed(2),
            MockEvent::Shutdown,
        ]
    );
}

#[tokio::test]
async fn test_run_withEnvelopePayloadFile_shouldUseStudentIdForOutput() {
    let temp_dir = common::create_temp_dir().unwrap();
    let payload = common::envelope_json(common::record_json("2018004", 50)).to_string();
    let input = common::create_test_file(temp_dir.path(), "payload.json", &payload).unwrap();
    let output_dir = temp_dir.path().join("out");
    let controller = Controller::with_config(common::test_config(&output_dir));

    let outcome = controller
        .run(&FileSource::new(input), || async { Ok(MockEngine::working()) })
        .await
        .unwrap();

    assert_eq!(outcome.output_path, output_dir.join("output_2018004.pdf"));
    assert!(outcome.output_path.exists());
}

#[tokio::test]
async fn test_run_withPageTwoCaptureTimeout_shouldWriteNothing() {
    common::init_test_logger();
    let temp_dir = common::create_temp_dir().unwrap();
    let controller = Controller::with_config(common::test_config(temp_dir.path()));
    let engine = MockEngine::working().fail_on(2, MockStep::Capture, MockFault::Hang);
    let events = engine.recorder();

    let err = controller
        .run(&SampleSource::new(50), move || async move { Ok(engine) })
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Stage::Render);
    match err {
        PipelineError::Render { page, source } => {
            assert_eq!(page, 2);
            assert_eq!(
                source,
                RenderError::Timeout {
                    state: RenderState::Ready,
                    after: Duration::from_secs(1)
                }
            );
        }
        other => panic!("expected render error, got {:?}", other),
    }

    assert!(common::list_files(temp_dir.path()).is_empty());
    let events = events.lock();
    assert!(events.contains(&MockEvent::Closed(2)));
    assert_eq!(events.last(), Some(&MockEvent::Shutdown));
}

#[tokio::test]
async fn test_run_withCaptureTimeoutAndHungShutdown_shouldStillReportRenderError() {
    let temp_dir = common::create_temp_dir().unwrap();
    let controller = Controller::with_config(common::test_config(temp_dir.path()));
    let engine = MockEngine::working()
        .fail_on(2, MockStep::Capture, MockFault::Hang)
        .fail_on_shutdown(MockFault::Hang);

    let err = tokio::time::timeout(
        Duration::from_secs(10),
        controller.run(&SampleSource::new(3), move || async move { Ok(engine) }),
    )
    .await
    .expect("run must return when the engine never exits")
    .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Render {
            page: 2,
            source: RenderError::Timeout { state: RenderState::Ready, .. }
        }
    ));
    assert!(common::list_files(temp_dir.path()).is_empty());
}

#[tokio::test]
async fn test_run_withPageOneFailure_shouldNotRenderPageTwo() {
    let temp_dir = common::create_temp_dir().unwrap();
    let controller = Controller::with_config(common::test_config(temp_dir.path()));
    let engine = MockEngine::working().fail_on(
        1,
        MockStep::Inject,
        MockFault::Fail(RenderError::Protocol("frame detached".to_string())),
    );
    let events = engine.recorder();

    let err = controller
        .run(&SampleSource::new(3), move || async move { Ok(engine) })
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Render { page: 1, .. }));
    let events = events.lock();
    assert!(!events.contains(&MockEvent::Opened(2)));
    assert_eq!(events.last(), Some(&MockEvent::Shutdown));
    assert!(common::list_files(temp_dir.path()).is_empty());
}

#[tokio::test]
async fn test_run_withKeepPages_shouldWritePageDocuments() {
    let temp_dir = common::create_temp_dir().unwrap();
    let mut config = common::test_config(temp_dir.path());
    config.output.keep_pages = true;
    let controller = Controller::with_config(config);

    let outcome = controller
        .run(&SampleSource::new(10), || async { Ok(MockEngine::working()) })
        .await
        .unwrap();

    assert_eq!(outcome.page_paths.len(), 2);
    assert_eq!(
        common::list_files(temp_dir.path()),
        vec!["output_20190001.pdf", "page1_20190001.pdf", "page2_20190001.pdf"]
    );
    for path in &outcome.page_paths {
        assert_eq!(merger::page_count(&fs::read(path).unwrap()).unwrap(), 1);
    }
}

#[tokio::test]
async fn test_run_withExistingOutput_shouldRefuseBeforeLaunching() {
    let temp_dir = common::create_temp_dir().unwrap();
    common::create_test_file(temp_dir.path(), "output_20190001.pdf", "old").unwrap();
    let controller = Controller::with_config(common::test_config(temp_dir.path()));
    let launched = AtomicBool::new(false);
    let launch_flag = &launched;

    let err = controller
        .run(&SampleSource::new(3), move || async move {
            launch_flag.store(true, Ordering::SeqCst);
            Ok(MockEngine::working())
        })
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Stage::Output);
    assert!(!launched.load(Ordering::SeqCst));
    let content = fs::read_to_string(temp_dir.path().join("output_20190001.pdf")).unwrap();
    assert_eq!(content, "old");
}

#[tokio::test]
async fn test_run_withExistingPageDocument_shouldRefuseBeforeLaunching() {
    let temp_dir = common::create_temp_dir().unwrap();
    common::create_test_file(temp_dir.path(), "page1_20190001.pdf", "old diagnostics").unwrap();
    let mut config = common::test_config(temp_dir.path());
    config.output.keep_pages = true;
    let controller = Controller::with_config(config);
    let launched = AtomicBool::new(false);
    let launch_flag = &launched;

    let err = controller
        .run(&SampleSource::new(3), move || async move {
            launch_flag.store(true, Ordering::SeqCst);
            Ok(MockEngine::working())
        })
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Stage::Output);
    assert!(err.to_string().contains("page1_20190001.pdf"));
    assert!(!launched.load(Ordering::SeqCst));
    let content = fs::read_to_string(temp_dir.path().join("page1_20190001.pdf")).unwrap();
    assert_eq!(content, "old diagnostics");
    assert_eq!(common::list_files(temp_dir.path()), vec!["page1_20190001.pdf"]);
}

#[tokio::test]
async fn test_run_withExistingPageDocumentAndForce_shouldReplaceIt() {
    let temp_dir = common::create_temp_dir().unwrap();
    common::create_test_file(temp_dir.path(), "page1_20190001.pdf", "old diagnostics").unwrap();
    let mut config = common::test_config(temp_dir.path());
    config.output.keep_pages = true;
    let controller = Controller::with_config(config).force_overwrite(true);

    controller
        .run(&SampleSource::new(3), || async { Ok(MockEngine::working()) })
        .await
        .unwrap();

    let bytes = fs::read(temp_dir.path().join("page1_20190001.pdf")).unwrap();
    assert_eq!(merger::page_count(&bytes).unwrap(), 1);
}

#[tokio::test]
async fn test_run_withForceOverwrite_shouldReplaceOutput() {
    let temp_dir = common::create_temp_dir().unwrap();
    common::create_test_file(temp_dir.path(), "output_20190001.pdf", "old").unwrap();
    let controller = Controller::with_config(common::test_config(temp_dir.path())).force_overwrite(true);

    let outcome = controller
        .run(&SampleSource::new(3), || async { Ok(MockEngine::working()) })
        .await
        .unwrap();

    let bytes = fs::read(outcome.output_path).unwrap();
    assert!(bytes.starts_with(b"%PDF-"));
}

#[tokio::test]
async fn test_run_withEngineStartFailure_shouldReportRenderStage() {
    let temp_dir = common::create_temp_dir().unwrap();
    let controller = Controller::with_config(common::test_config(temp_dir.path()));

    let err = controller
        .run(&SampleSource::new(3), || async {
            Err::<MockEngine, _>(RenderError::ProcessUnavailable("no chromium".to_string()))
        })
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::EngineStart(RenderError::ProcessUnavailable(_))));
    assert_eq!(err.stage(), Stage::Render);
}

#[tokio::test]
async fn test_run_withMissingStudentId_shouldFailFetchWithoutLaunching() {
    let temp_dir = common::create_temp_dir().unwrap();
    let mut record = common::record_json("x", 3);
    record.as_object_mut().unwrap().remove("nomor_induk_mhs");
    let input = common::create_test_file(temp_dir.path(), "payload.json", &record.to_string()).unwrap();
    let controller = Controller::with_config(common::test_config(temp_dir.path()));
    let launched = AtomicBool::new(false);
    let launch_flag = &launched;

    let err = controller
        .run(&FileSource::new(input), move || async move {
            launch_flag.store(true, Ordering::SeqCst);
            Ok(MockEngine::working())
        })
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Fetch(FetchError::ParseError(_))));
    assert!(!launched.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_run_withTemplateMissingField_shouldFailOnTemplateStage() {
    let temp_dir = common::create_temp_dir().unwrap();
    let template = common::create_test_file(
        temp_dir.path(),
        "page_1.html",
        "<html><body>{{ name }} {{ rector_name }}</body></html>",
    )
    .unwrap();
    let mut config = common::test_config(temp_dir.path());
    config.templates.page_one = Some(template);
    let controller = Controller::with_config(config);
    let launched = AtomicBool::new(false);
    let launch_flag = &launched;

    let err = controller
        .run(&SampleSource::new(3), move || async move {
            launch_flag.store(true, Ordering::SeqCst);
            Ok(MockEngine::working())
        })
        .await
        .unwrap_err();

    match err {
        PipelineError::Template {
            page: 1,
            source: TemplateError::MissingField { field, .. },
        } => assert_eq!(field, "rector_name"),
        other => panic!("expected template error, got {:?}", other),
    }
    assert!(!launched.load(Ordering::SeqCst));
}

#[test]
fn test_sampleSource_fetch_shouldReturnFinalizedRecord() {
    let record = tokio_test::block_on(SampleSource::new(3).fetch()).unwrap();

    let indices: Vec<usize> = record.subjects.iter().map(|s| s.index).collect();
    assert_eq!(indices, vec![1, 2, 3]);
    assert_eq!(record.credits_total, record.subjects.iter().map(|s| s.credits).sum::<u32>());
}
