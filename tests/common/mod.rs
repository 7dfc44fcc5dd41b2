/*!
 * Common test utilities for the transcript-pdf test suite
 */

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde_json::{json, Value};
use tempfile::TempDir;

use transcript_pdf::app_config::Config;
use transcript_pdf::transcript::{Subject, TranscriptRecord};


/// Route library logs to the test harness; safe to call from every test
pub fn init_test_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// A finalized record whose subjects carry the given credits
pub fn record_with_credits(credits: &[u32]) -> TranscriptRecord {
    let mut record = TranscriptRecord {
        student_id: "1901".to_string(),
        name: "Test Student".to_string(),
        ..Default::default()
    };
    record.subjects = credits
        .iter()
        .enumerate()
        .map(|(i, c)| Subject::new(format!("Mata Kuliah {}", i + 1), format!("Course {}", i + 1), *c, "A"))
        .collect();
    record.finalize();
    record
}

/// Subject list as it appears in the API payload
pub fn subjects_json(count: usize) -> Value {
    Value::Array(
        (1..=count)
            .map(|i| {
                json!({
                    "subjname": format!("Mata Kuliah {}", i),
                    "subjnameeng": format!("Course {}", i),
                    "credits": 1,
                    "grade": "A"
                })
            })
            .collect(),
    )
}

/// A full record payload with `count` one-credit subjects
pub fn record_json(student_id: &str, count: usize) -> Value {
    json!({
        "nama_mhs": "Siti Rahma",
        "nomor_induk_mhs": student_id,
        "ttl_mhs": "Bandung, 2 Maret 2000",
        "ttl_mhs_eng": "Bandung, March 2, 2000",
        "tahun_masuk_mhs": "2018",
        "fakultas_mhs": "Fakultas Ekonomi",
        "fakultas_mhs_eng": "Faculty of Economics",
        "prodi_mhs": "Manajemen",
        "prodi_mhs_eng": "Management",
        "no_transkrip": "TR/2022/0042",
        "subjects": subjects_json(count),
        "credits_total": 999,
        "grade_total": 3.456,
        "graduation_date": "1 Juli 2022",
        "graduation_date_eng": "July 1, 2022",
        "predikat_mhs": "Dengan Pujian",
        "predikat_mhs_eng": "Cum Laude",
        "judul_skriptsi": {
            "judul_indonesia": "Analisis Pasar",
            "judul_inggris": "Market Analysis"
        },
        "tempat_terbit": "Bandung",
        "tanggal_terbit": "5 Juli 2022",
        "tanggal_terbit_eng": "July 5, 2022",
        "nama_dekan": "Prof. Dekan",
        "nik_dekan": 98765
    })
}

/// The record wrapped in the API response envelope
pub fn envelope_json(record: Value) -> Value {
    json!({
        "code": 200,
        "success": true,
        "status": "OK",
        "data": record
    })
}

/// Configuration writing into `output_dir`, with one second step timeouts
pub fn test_config(output_dir: &Path) -> Config {
    let mut config = Config::default();
    config.output.directory = output_dir.to_path_buf();
    config.browser.navigate_timeout_secs = 1;
    config.browser.inject_timeout_secs = 1;
    config.browser.ready_timeout_secs = 1;
    config.browser.capture_timeout_secs = 1;
    config.browser.shutdown_timeout_secs = 1;
    config
}

/// Files present in a directory, sorted by name
pub fn list_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
