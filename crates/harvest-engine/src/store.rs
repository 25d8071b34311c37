//! JSON persistence for the target queue and the run's output artifacts.

use crate::merge::MergeOutcome;
use crate::pipeline::PipelineReport;
use harvest_common::TargetRecord;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const MERGED_FILE: &str = "merged_results.json";
pub const RESIDUAL_FILE: &str = "residual_failures.json";
pub const PASS_FILES: [&str; 3] = [
    "pass1_records.json",
    "pass2_records.json",
    "pass3_records.json",
];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Input file shapes: `{"urls": [...]}` or a bare array of strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AddressFile {
    Wrapped { urls: Vec<String> },
    Bare(Vec<String>),
}

pub async fn load_addresses(path: &Path) -> Result<Vec<String>, StoreError> {
    let content = read(path).await?;
    let file: AddressFile = parse(path, &content)?;
    Ok(match file {
        AddressFile::Wrapped { urls } => urls,
        AddressFile::Bare(urls) => urls,
    })
}

/// Directory holding the run's output files.
#[derive(Debug, Clone)]
pub struct RecordStore {
    dir: PathBuf,
}

impl RecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn save<T: Serialize>(&self, name: &str, items: &[T]) -> Result<PathBuf, StoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StoreError::Io {
                path: self.dir.clone(),
                source,
            })?;

        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(items).map_err(|source| StoreError::Json {
            path: path.clone(),
            source,
        })?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }

    /// Loads a list; a missing file is an empty list.
    pub async fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>, StoreError> {
        let path = self.dir.join(name);
        let exists = tokio::fs::try_exists(&path)
            .await
            .map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
        if !exists {
            return Ok(Vec::new());
        }
        let content = read(&path).await?;
        parse(&path, &content)
    }

    pub async fn save_merge(&self, merged: &MergeOutcome) -> Result<Vec<PathBuf>, StoreError> {
        Ok(vec![
            self.save(MERGED_FILE, &merged.records).await?,
            self.save(RESIDUAL_FILE, &merged.residual).await?,
        ])
    }

    /// Writes merged results and residual failures, plus per-pass records when
    /// `audit` is set.
    pub async fn save_report(
        &self,
        report: &PipelineReport,
        audit: bool,
    ) -> Result<Vec<PathBuf>, StoreError> {
        let mut written = self.save_merge(&report.merged).await?;
        if audit {
            for (name, records) in PASS_FILES
                .iter()
                .zip([&report.pass1, &report.pass2, &report.pass3])
            {
                written.push(self.save(name, records).await?);
            }
        }
        info!("Wrote {} file(s) to {}", written.len(), self.dir.display());
        Ok(written)
    }

    pub async fn load_pass_records(&self) -> Result<[Vec<TargetRecord>; 3], StoreError> {
        Ok([
            self.load(PASS_FILES[0]).await?,
            self.load(PASS_FILES[1]).await?,
            self.load(PASS_FILES[2]).await?,
        ])
    }
}

async fn read(path: &Path) -> Result<String, StoreError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })
}

fn parse<T: DeserializeOwned>(path: &Path, content: &str) -> Result<T, StoreError> {
    serde_json::from_str(content).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}
