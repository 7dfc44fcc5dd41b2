/*!
 * Sources of the transcript record.
 *
 * - `ApiSource`: the registrar API, authenticated with the `LOGIN` header
 * - `FileSource`: a JSON payload saved on disk
 * - `SampleSource`: a generated record, for demos and layout checks
 *
 * Every source returns a validated and finalized record.
 */

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;

use crate::app_config::SourceConfig;
use crate::errors::FetchError;
use crate::transcript::{Subject, ThesisTitle, TranscriptRecord};

/// Header carrying the API login token
pub const LOGIN_HEADER: &str = "LOGIN";

/// Anything that can produce one transcript record
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Fetch, validate and finalize the record
    async fn fetch(&self) -> Result<TranscriptRecord, FetchError>;

    /// Short description for logs
    fn describe(&self) -> String;
}

/// Client for the transcript API
pub struct ApiSource {
    client: Client,
    url: url::Url,
    login_token: String,
}

impl ApiSource {
    /// Create a client from the source configuration
    pub fn new(config: &SourceConfig) -> Result<Self, FetchError> {
        let url = url::Url::parse(&config.api_url)
            .map_err(|e| FetchError::RequestFailed(format!("invalid API URL '{}': {}", config.api_url, e)))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FetchError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            url,
            login_token: config.login_token.clone(),
        })
    }
}

#[async_trait]
impl TranscriptSource for ApiSource {
    async fn fetch(&self) -> Result<TranscriptRecord, FetchError> {
        debug!("Requesting transcript from {}", self.url);
        let response = self
            .client
            .get(self.url.clone())
            .header(LOGIN_HEADER, &self.login_token)
            .send()
            .await
            .map_err(|e| FetchError::RequestFailed(format!("Failed to send request to transcript API: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Transcript API error ({}): {}", status, error_text);
            return Err(FetchError::ApiError {
                status_code: status.as_u16(),
                message: error_text,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::RequestFailed(format!("Failed to read transcript API response: {}", e)))?;
        TranscriptRecord::from_payload(&body)
    }

    fn describe(&self) -> String {
        format!("API {}", self.url)
    }
}

/// A JSON payload on disk, bare or wrapped in the API envelope
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TranscriptSource for FileSource {
    async fn fetch(&self) -> Result<TranscriptRecord, FetchError> {
        let body = tokio::fs::read(&self.path)
            .await
            .map_err(|e| FetchError::File(format!("{}: {}", self.path.display(), e)))?;
        TranscriptRecord::from_payload(&body)
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

/// Generated record with a given number of subjects
pub struct SampleSource {
    subjects: usize,
}

impl SampleSource {
    pub fn new(subjects: usize) -> Self {
        Self { subjects }
    }

    /// Build the sample record synchronously
    pub fn record(&self) -> TranscriptRecord {
        sample_record(self.subjects)
    }
}

#[async_trait]
impl TranscriptSource for SampleSource {
    async fn fetch(&self) -> Result<TranscriptRecord, FetchError> {
        let record = self.record();
        record.validate()?;
        Ok(record)
    }

    fn describe(&self) -> String {
        format!("sample with {} subjects", self.subjects)
    }
}

const SAMPLE_GRADES: [&str; 5] = ["A", "A-", "B+", "B", "B-"];

/// A finalized demo record with `subjects` subjects
pub fn sample_record(subjects: usize) -> TranscriptRecord {
    let subjects = (1..=subjects)
        .map(|n| {
            Subject::new(
                format!("Mata Kuliah {}", n),
                format!("Course {}", n),
                (n % 3 + 2) as u32,
                SAMPLE_GRADES[n % SAMPLE_GRADES.len()],
            )
        })
        .collect();

    let mut record = TranscriptRecord {
        student_id: "20190001".to_string(),
        name: "Sample Student".to_string(),
        birth_place_date: "Jakarta, 1 Januari 2001".to_string(),
        birth_place_date_en: "Jakarta, January 1, 2001".to_string(),
        entry_year: "2019".to_string(),
        faculty: "Fakultas Teknik".to_string(),
        faculty_en: "Faculty of Engineering".to_string(),
        program: "Teknik Informatika".to_string(),
        program_en: "Informatics Engineering".to_string(),
        transcript_number: "TR/2023/0001".to_string(),
        subjects,
        credits_total: 0,
        grade_total: 3.5,
        graduation_date: "30 Agustus 2023".to_string(),
        graduation_date_en: "August 30, 2023".to_string(),
        predicate: "Sangat Memuaskan".to_string(),
        predicate_en: "Very Satisfactory".to_string(),
        thesis_title: ThesisTitle {
            local: "Contoh Judul Skripsi".to_string(),
            english: "Sample Thesis Title".to_string(),
        },
        publication_place: "Jakarta".to_string(),
        publication_date: "1 September 2023".to_string(),
        publication_date_en: "September 1, 2023".to_string(),
        dean_name: "Dr. Sample Dean".to_string(),
        dean_id: "1234567".to_string(),
    };
    record.finalize();
    record
}
