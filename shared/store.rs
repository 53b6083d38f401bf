//! # Prediction History
//!
//! Persists completed predictions per user and lists the most recent ones.
//! Persistence sits outside the prediction pipeline: a prediction is complete
//! before it is stored, and a storage failure never changes the result shown to
//! the user.

use crate::model::DiseaseLabel;
use crate::observation::FormData;
use crate::pipeline::PredictionResult;
use crate::risk::RiskTier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// One stored prediction. Written once, read back for history listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub user_id: String,
    pub disease: DiseaseLabel,
    pub probability: f64,
    pub risk_level: RiskTier,
    /// The submitted measurements as the user entered them.
    pub form_data: FormData,
    pub created_at: DateTime<Utc>,
}

impl PredictionRecord {
    pub fn new(user_id: &str, form_data: FormData, result: &PredictionResult) -> Self {
        Self {
            user_id: user_id.to_string(),
            disease: result.label,
            probability: result.probability,
            risk_level: result.risk_level,
            form_data,
            created_at: Utc::now(),
        }
    }
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("I/O error on the prediction store: {0}")]
    Io(#[from] io::Error),
    #[error("Malformed prediction record: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Prediction store unavailable: {0}")]
    Unavailable(String),
}

pub trait PredictionStore: Send + Sync {
    fn insert(&self, record: &PredictionRecord) -> Result<(), PersistenceError>;

    /// At most `limit` records for `user_id`, newest first.
    fn recent(&self, user_id: &str, limit: usize)
    -> Result<Vec<PredictionRecord>, PersistenceError>;
}

/// Newest first; records with equal timestamps keep reverse insertion order.
fn newest_first(mut records: Vec<PredictionRecord>, limit: usize) -> Vec<PredictionRecord> {
    records.reverse();
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    records.truncate(limit);
    records
}

/// An append-only file with one JSON object per line.
#[derive(Debug)]
pub struct JsonLinesStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonLinesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PredictionStore for JsonLinesStore {
    fn insert(&self, record: &PredictionRecord) -> Result<(), PersistenceError> {
        let line = serde_json::to_string(record)?;
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| PersistenceError::Unavailable("store lock poisoned".to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{line}")?;
        writer.flush()?;
        log::debug!(
            "Stored prediction for user '{}' in '{}'",
            record.user_id,
            self.path.display()
        );
        Ok(())
    }

    fn recent(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<PredictionRecord>, PersistenceError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: PredictionRecord = serde_json::from_str(&line)?;
            if record.user_id == user_id {
                records.push(record);
            }
        }
        Ok(newest_first(records, limit))
    }
}

/// Keeps records in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<PredictionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PredictionStore for MemoryStore {
    fn insert(&self, record: &PredictionRecord) -> Result<(), PersistenceError> {
        self.records
            .lock()
            .map_err(|_| PersistenceError::Unavailable("store lock poisoned".to_string()))?
            .push(record.clone());
        Ok(())
    }

    fn recent(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<PredictionRecord>, PersistenceError> {
        let records = self
            .records
            .lock()
            .map_err(|_| PersistenceError::Unavailable("store lock poisoned".to_string()))?;
        let matching = records
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(matching, limit))
    }
}

/// Stores a completed prediction. On failure a warning is logged and the error
/// returned for the caller to report as an advisory; the result itself stands.
pub fn save_prediction(
    store: &dyn PredictionStore,
    user_id: &str,
    form_data: FormData,
    result: &PredictionResult,
) -> Result<(), PersistenceError> {
    let record = PredictionRecord::new(user_id, form_data, result);
    store.insert(&record).map_err(|e| {
        log::warn!("Could not save prediction for user '{user_id}': {e}");
        e
    })
}
