/*!
 * Splits a transcript into the two page-scoped views.
 *
 * Page one carries the student header and the first block of subjects,
 * page two carries the remaining subjects plus the summary and signature
 * fields. Both views borrow from the record.
 */

use serde::{Deserialize, Serialize};

use super::model::{Subject, ThesisTitle, TranscriptRecord};

/// Lists longer than this spill over onto page two
pub const SPLIT_THRESHOLD: usize = 43;

/// Number of subject rows page one can hold once the list spills over
pub const PAGE_ONE_CAPACITY: usize = 45;

/// How the subject at the page boundary is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryMode {
    /// Page two starts at the last row of page one, so that subject
    /// appears on both pages. Matches the printed transcripts already issued.
    #[default]
    Legacy,
    /// Page two starts right after page one; no subject is repeated
    Exclusive,
}

impl BoundaryMode {
    fn page_two_start(self) -> usize {
        match self {
            BoundaryMode::Legacy => PAGE_ONE_CAPACITY - 1,
            BoundaryMode::Exclusive => PAGE_ONE_CAPACITY,
        }
    }
}

/// Header page view
#[derive(Debug, Clone, Serialize)]
pub struct PageOneView<'a> {
    pub student_id: &'a str,
    pub name: &'a str,
    pub birth_place_date: &'a str,
    pub birth_place_date_en: &'a str,
    pub entry_year: &'a str,
    pub faculty: &'a str,
    pub faculty_en: &'a str,
    pub program: &'a str,
    pub program_en: &'a str,
    pub transcript_number: &'a str,
    pub subjects: &'a [Subject],
}

/// Summary and signature page view
#[derive(Debug, Clone, Serialize)]
pub struct PageTwoView<'a> {
    pub student_id: &'a str,
    pub transcript_number: &'a str,
    pub credits_total: u32,
    /// Grade point average, two decimals
    pub grade_total: String,
    pub graduation_date: &'a str,
    pub graduation_date_en: &'a str,
    pub predicate: &'a str,
    pub predicate_en: &'a str,
    pub thesis_title: &'a ThesisTitle,
    pub publication_place: &'a str,
    pub publication_date: &'a str,
    pub publication_date_en: &'a str,
    pub faculty: &'a str,
    pub faculty_en: &'a str,
    pub dean_name: &'a str,
    pub dean_id: &'a str,
    pub subjects: &'a [Subject],
}

/// Split the record into the two page views using the default boundary
pub fn paginate(record: &TranscriptRecord) -> (PageOneView<'_>, PageTwoView<'_>) {
    paginate_with(record, BoundaryMode::default())
}

/// Split the record into the two page views
pub fn paginate_with(record: &TranscriptRecord, mode: BoundaryMode) -> (PageOneView<'_>, PageTwoView<'_>) {
    let (first, second) = split_subjects(&record.subjects, mode);

    let page_one = PageOneView {
        student_id: &record.student_id,
        name: &record.name,
        birth_place_date: &record.birth_place_date,
        birth_place_date_en: &record.birth_place_date_en,
        entry_year: &record.entry_year,
        faculty: &record.faculty,
        faculty_en: &record.faculty_en,
        program: &record.program,
        program_en: &record.program_en,
        transcript_number: &record.transcript_number,
        subjects: first,
    };

    let page_two = PageTwoView {
        student_id: &record.student_id,
        transcript_number: &record.transcript_number,
        credits_total: record.credits_total,
        grade_total: format!("{:.2}", record.grade_total),
        graduation_date: &record.graduation_date,
        graduation_date_en: &record.graduation_date_en,
        predicate: &record.predicate,
        predicate_en: &record.predicate_en,
        thesis_title: &record.thesis_title,
        publication_place: &record.publication_place,
        publication_date: &record.publication_date,
        publication_date_en: &record.publication_date_en,
        faculty: &record.faculty,
        faculty_en: &record.faculty_en,
        dean_name: &record.dean_name,
        dean_id: &record.dean_id,
        subjects: second,
    };

    (page_one, page_two)
}

/// Slice the subject list into page one and page two rows
pub fn split_subjects(subjects: &[Subject], mode: BoundaryMode) -> (&[Subject], &[Subject]) {
    let total = subjects.len();
    if total <= SPLIT_THRESHOLD {
        return (subjects, &subjects[total..]);
    }

    let first_end = PAGE_ONE_CAPACITY.min(total);
    let second_start = mode.page_two_start().min(total);
    (&subjects[..first_end], &subjects[second_start..])
}
