//! Single-document JSON store.
//!
//! All collections live in one [`Document`] persisted to a single file. The
//! store owns the in-memory document behind one async mutex, so every
//! mutation runs as read → closure → persist under the lock: concurrent
//! handlers serialize through the store and cannot lose each other's writes.
//! Persisting writes to a sibling temp file and renames it over the target,
//! so a crash never leaves a half-written document visible.

pub mod models;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

use models::{Assessment, Assignment, Course, Lesson, ProgressRecord, User};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("document serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The entire persisted state: one ordered sequence per entity type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub courses: Vec<Course>,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
    #[serde(default)]
    pub assessments: Vec<Assessment>,
    #[serde(default)]
    pub progress: Vec<ProgressRecord>,
    #[serde(default)]
    pub assigned: Vec<Assignment>,
}

/// A record stored in one of the document's collections.
pub trait Record: Serialize + DeserializeOwned {
    fn id(&self) -> i64;
}

impl Record for User {
    fn id(&self) -> i64 {
        self.id
    }
}

impl Record for Course {
    fn id(&self) -> i64 {
        self.id
    }
}

impl Record for Lesson {
    fn id(&self) -> i64 {
        self.id
    }
}

impl Record for Assessment {
    fn id(&self) -> i64 {
        self.id
    }
}

impl Record for ProgressRecord {
    fn id(&self) -> i64 {
        self.id
    }
}

impl Record for Assignment {
    fn id(&self) -> i64 {
        self.id
    }
}

pub struct DocumentStore {
    path: PathBuf,
    document: Mutex<Document>,
}

impl DocumentStore {
    /// Opens the store, creating and persisting a default document when no
    /// file exists yet.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let document = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let document = Document::default();
                write_json_atomic(&path, &document).await?;
                document
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            document: Mutex::new(document),
        })
    }

    /// Runs a read-only closure against the current document.
    pub async fn read<T>(&self, f: impl FnOnce(&Document) -> T) -> T {
        let document = self.document.lock().await;
        f(&document)
    }

    /// Runs a mutating closure and persists the document if it succeeds.
    /// The lock is held across the persist, so writers fully serialize.
    pub async fn mutate<T, E>(
        &self,
        f: impl FnOnce(&mut Document) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let mut document = self.document.lock().await;
        let out = f(&mut document)?;
        write_json_atomic(&self.path, &*document)
            .await
            .map_err(E::from)?;
        Ok(out)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Serializes `value` to pretty JSON and moves it into place atomically.
pub async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let data = serde_json::to_vec_pretty(value)?;
    let tmp = PathBuf::from(format!("{}.tmp", path.display()));
    tokio::fs::write(&tmp, &data).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
