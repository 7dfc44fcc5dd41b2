/*!
 * Typed representation of one student's transcript.
 *
 * Record keys follow the academic API payload; field names on the Rust
 * side are the English equivalents. Subjects and the thesis title
 * serialize under their English names since templates bind to them.
 */

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::FetchError;

/// One subject line of the transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    /// 1-based position in the full subject list, assigned by `finalize`
    #[serde(default)]
    pub index: usize,

    /// Subject name (local language)
    #[serde(alias = "subjname", default)]
    pub name: String,

    /// Subject name (English)
    #[serde(alias = "subjnameeng", default)]
    pub name_en: String,

    /// Credit units
    #[serde(default)]
    pub credits: u32,

    /// Letter grade
    #[serde(default)]
    pub grade: String,
}

impl Subject {
    pub fn new(name: impl Into<String>, name_en: impl Into<String>, credits: u32, grade: impl Into<String>) -> Self {
        Self {
            index: 0,
            name: name.into(),
            name_en: name_en.into(),
            credits,
            grade: grade.into(),
        }
    }
}

/// Thesis title in both languages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThesisTitle {
    #[serde(alias = "judul_indonesia", default)]
    pub local: String,

    #[serde(alias = "judul_inggris", default)]
    pub english: String,
}

/// Full transcript record for one student
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptRecord {
    #[serde(rename = "nomor_induk_mhs", deserialize_with = "string_or_number")]
    pub student_id: String,

    #[serde(rename = "nama_mhs", default)]
    pub name: String,

    #[serde(rename = "ttl_mhs", default)]
    pub birth_place_date: String,

    #[serde(rename = "ttl_mhs_eng", default)]
    pub birth_place_date_en: String,

    #[serde(rename = "tahun_masuk_mhs", default, deserialize_with = "string_or_number")]
    pub entry_year: String,

    #[serde(rename = "fakultas_mhs", default)]
    pub faculty: String,

    #[serde(rename = "fakultas_mhs_eng", default)]
    pub faculty_en: String,

    #[serde(rename = "prodi_mhs", default)]
    pub program: String,

    #[serde(rename = "prodi_mhs_eng", default)]
    pub program_en: String,

    #[serde(rename = "no_transkrip", default)]
    pub transcript_number: String,

    #[serde(default)]
    pub subjects: Vec<Subject>,

    /// Derived from `subjects`; any value in the payload is replaced
    #[serde(default)]
    pub credits_total: u32,

    /// Grade point average as supplied by the source
    #[serde(default)]
    pub grade_total: f64,

    #[serde(default)]
    pub graduation_date: String,

    #[serde(rename = "graduation_date_eng", default)]
    pub graduation_date_en: String,

    #[serde(rename = "predikat_mhs", default)]
    pub predicate: String,

    #[serde(rename = "predikat_mhs_eng", default)]
    pub predicate_en: String,

    #[serde(rename = "judul_skriptsi", default)]
    pub thesis_title: ThesisTitle,

    #[serde(rename = "tempat_terbit", default)]
    pub publication_place: String,

    #[serde(rename = "tanggal_terbit", default)]
    pub publication_date: String,

    #[serde(rename = "tanggal_terbit_eng", default)]
    pub publication_date_en: String,

    #[serde(rename = "nama_dekan", default)]
    pub dean_name: String,

    #[serde(rename = "nik_dekan", default, deserialize_with = "string_or_number")]
    pub dean_id: String,
}

impl TranscriptRecord {
    /// Parse a payload, either a bare record or the API envelope
    /// (`{"code": .., "success": .., "status": .., "data": {..}}`),
    /// then validate and finalize it.
    pub fn from_payload(body: &[u8]) -> Result<Self, FetchError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| FetchError::ParseError(e.to_string()))?;

        let record_value = match value {
            Value::Object(mut map) if map.get("data").is_some_and(Value::is_object) => {
                map.remove("data").unwrap_or(Value::Null)
            }
            other => other,
        };

        let mut record: TranscriptRecord = serde_json::from_value(record_value)
            .map_err(|e| FetchError::ParseError(e.to_string()))?;
        record.validate()?;
        record.finalize();
        Ok(record)
    }

    /// Check the identity field before it is used to name output files
    pub fn validate(&self) -> Result<(), FetchError> {
        let id = self.student_id.trim();
        if id.is_empty() {
            return Err(FetchError::InvalidRecord("student id (nomor_induk_mhs) is empty".to_string()));
        }
        if id == "." || id == ".." || id.contains(['/', '\\']) {
            return Err(FetchError::InvalidRecord(format!(
                "student id '{}' cannot be used as a file name", self.student_id
            )));
        }
        let credits = self
            .subjects
            .iter()
            .try_fold(0u32, |total, subject| total.checked_add(subject.credits));
        if credits.is_none() {
            return Err(FetchError::InvalidRecord(format!(
                "credit total of {} subjects does not fit in a u32", self.subjects.len()
            )));
        }
        Ok(())
    }

    /// Assign 1-based subject indices and recompute the credit total.
    /// Numbering always covers the full list, so calling this again is a no-op.
    pub fn finalize(&mut self) {
        for (position, subject) in self.subjects.iter_mut().enumerate() {
            subject.index = position + 1;
        }
        self.credits_total = self
            .subjects
            .iter()
            .fold(0u32, |total, subject| total.saturating_add(subject.credits));
    }
}

// The API has been seen to send numeric ids; keep them as text.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, found {}", other
        ))),
    }
}
