/*!
 * Tests for merging page documents
 */

use lopdf::Document;

use transcript_pdf::app_config::PrintConfig;
use transcript_pdf::errors::MergeError;
use transcript_pdf::pdf::merger::{merge, merge_all, page_count};
use transcript_pdf::pdf::mock::single_page_pdf;

fn page(text: &str) -> Vec<u8> {
    single_page_pdf(text, &PrintConfig::default()).unwrap()
}

fn page_texts(bytes: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(bytes).unwrap();
    doc.get_pages()
        .into_values()
        .map(|id| String::from_utf8_lossy(&doc.get_page_content(id).unwrap()).to_string())
        .collect()
}

#[test]
fn test_merge_shouldPlaceFirstInputPagesFirst() {
    let merged = merge(&page("header page"), &page("summary page")).unwrap();
    let texts = page_texts(&merged);

    assert_eq!(texts.len(), 2);
    assert!(texts[0].contains("header page"));
    assert!(texts[1].contains("summary page"));
}

#[test]
fn test_mergeAll_withMultiPageInput_shouldKeepEveryPageInOrder() {
    let two = merge(&page("p1"), &page("p2")).unwrap();
    let merged = merge_all(&[&two, &page("p3"), &page("p4")]).unwrap();

    assert_eq!(page_count(&merged).unwrap(), 4);
    let texts = page_texts(&merged);
    for (i, text) in texts.iter().enumerate() {
        assert!(text.contains(&format!("p{}", i + 1)), "page {} was {}", i + 1, text);
    }
}

#[test]
fn test_merge_shouldKeepPaperSize() {
    let letter = PrintConfig {
        paper_width_in: 8.5,
        paper_height_in: 11.0,
        ..PrintConfig::default()
    };
    let merged = merge(&page("a4"), &single_page_pdf("letter", &letter).unwrap()).unwrap();
    let doc = Document::load_mem(&merged).unwrap();

    let widths: Vec<i64> = doc
        .get_pages()
        .into_values()
        .map(|id| {
            let page = doc.get_dictionary(id).unwrap();
            let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
            media_box[2].as_i64().unwrap()
        })
        .collect();
    assert_eq!(widths, vec![595, 612]);
}

#[test]
fn test_merge_withEmptyInput_shouldReportWhichInput() {
    match merge(b"", &page("b")) {
        Err(MergeError::Format { input, .. }) => assert_eq!(input, "input 1"),
        other => panic!("expected format error, got {:?}", other),
    }
}

#[test]
fn test_pageCount_withGarbage_shouldFail() {
    assert!(page_count(b"%PDF-1.5 not really").is_err());
}
