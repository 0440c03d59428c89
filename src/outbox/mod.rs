//! Outbox: the directory completed actions are written to.
//!
//! One pretty-printed JSON file per action, named
//! `{type}_{YYYYmmdd_HHMMSS_mmm}.json` from the record's `created_at`.
//! Files are write-once: a name collision gets a `_1`, `_2`… suffix
//! instead of overwriting.

mod record;

pub use record::{ActionPayload, ActionRecord, ActionStatus, EmailRecord, MeetingRecord};

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::conversation::Intent;

const MAX_SUFFIX: u32 = 1000;

#[derive(Debug, Error)]
pub enum OutboxError {
    #[error("invalid action: {0}")]
    Invalid(String),
    #[error("outbox I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode action: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl OutboxError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io { path: path.to_path_buf(), source }
    }
}

/// Where a saved action ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedAction {
    pub filename: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Outbox {
    dir: PathBuf,
}

impl Outbox {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ensure_dir(&self) -> Result<(), OutboxError> {
        fs::create_dir_all(&self.dir).map_err(|e| OutboxError::io(&self.dir, e))
    }

    pub fn generate_filename<Tz: TimeZone>(kind: Intent, timestamp: &DateTime<Tz>) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        format!("{}_{}.json", kind.as_str(), timestamp.format("%Y%m%d_%H%M%S_%3f"))
    }

    /// Enforce the fields a record needs before it may be written.
    pub fn validate(record: &ActionRecord) -> Result<(), OutboxError> {
        let blank = |s: &str| s.trim().is_empty();
        match &record.payload {
            ActionPayload::ScheduleMeeting(m) => {
                let missing: Vec<&str> = [("title", &m.title), ("date", &m.date), ("time", &m.time)]
                    .into_iter()
                    .filter(|(_, v)| blank(v))
                    .map(|(k, _)| k)
                    .collect();
                if !missing.is_empty() {
                    return Err(OutboxError::Invalid(format!(
                        "meeting is missing {}",
                        missing.join(", ")
                    )));
                }
            }
            ActionPayload::SendEmail(e) => {
                if e.recipients.iter().all(|r| blank(r)) {
                    return Err(OutboxError::Invalid("email has no recipient".into()));
                }
                let has_content = [&e.subject, &e.body]
                    .into_iter()
                    .any(|f| f.as_deref().is_some_and(|s| !blank(s)));
                if !has_content {
                    return Err(OutboxError::Invalid("email needs a subject or a body".into()));
                }
            }
        }
        Ok(())
    }

    /// Validate and write `record`. On success the record carries its
    /// `saved_at` and `filename`. On failure no file is left behind and the
    /// record is unchanged.
    pub fn save(&self, record: &mut ActionRecord) -> Result<SavedAction, OutboxError> {
        self.save_with(record, |file, bytes| file.write_all(bytes))
    }

    fn save_with<F>(&self, record: &mut ActionRecord, write: F) -> Result<SavedAction, OutboxError>
    where
        F: FnOnce(&mut fs::File, &[u8]) -> std::io::Result<()>,
    {
        Self::validate(record)?;
        self.ensure_dir()?;

        let base = Self::generate_filename(record.kind(), &record.created_at);
        let (filename, path, mut file) = self.create_unique(&base)?;

        let mut stamped = record.clone();
        stamped.saved_at = Some(Local::now().fixed_offset());
        stamped.filename = Some(filename.clone());

        let written = serde_json::to_vec_pretty(&stamped)
            .map_err(OutboxError::from)
            .and_then(|mut json| {
                json.push(b'\n');
                write(&mut file, &json)
                    .and_then(|()| file.sync_all())
                    .map_err(|e| OutboxError::io(&path, e))
            });
        drop(file);

        if let Err(e) = written {
            if let Err(rm) = fs::remove_file(&path) {
                warn!(path = %path.display(), error = %rm, "could not remove partial outbox file");
            }
            return Err(e);
        }

        *record = stamped;
        info!(%filename, kind = %record.kind(), "action saved to outbox");
        Ok(SavedAction { filename, path })
    }

    fn create_unique(&self, base: &str) -> Result<(String, PathBuf, fs::File), OutboxError> {
        let stem = base.trim_end_matches(".json");
        for n in 0..MAX_SUFFIX {
            let filename = if n == 0 { base.to_string() } else { format!("{stem}_{n}.json") };
            let path = self.dir.join(&filename);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((filename, path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!(%filename, "outbox name taken; trying next suffix");
                }
                Err(e) => return Err(OutboxError::io(&path, e)),
            }
        }
        Err(OutboxError::Invalid(format!("no free file name for {base}")))
    }

    /// Saved actions, most recent first. Unreadable files are skipped.
    pub fn list(&self, limit: Option<usize>) -> Result<Vec<ActionRecord>, OutboxError> {
        let mut records = Vec::new();
        for path in self.json_files()? {
            match read_record(&path) {
                Ok(mut r) => {
                    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                        r.filename = Some(name.to_string());
                    }
                    records.push(r);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable outbox file"),
            }
        }
        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.filename.cmp(&a.filename))
        });
        if let Some(limit) = limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    /// Delete every `.json` file and return how many went. A missing
    /// directory counts as empty.
    pub fn clear(&self) -> Result<usize, OutboxError> {
        let mut deleted = 0;
        for path in self.json_files()? {
            match fs::remove_file(&path) {
                Ok(()) => deleted += 1,
                Err(e) => warn!(path = %path.display(), error = %e, "could not delete outbox file"),
            }
        }
        info!(deleted, dir = %self.dir.display(), "outbox cleared");
        Ok(deleted)
    }

    fn json_files(&self) -> Result<Vec<PathBuf>, OutboxError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(OutboxError::io(&self.dir, e)),
        };
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| OutboxError::io(&self.dir, e))?;
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        Ok(files)
    }
}

fn read_record(path: &Path) -> Result<ActionRecord, OutboxError> {
    let text = fs::read_to_string(path).map_err(|e| OutboxError::io(path, e))?;
    serde_json::from_str(&text).map_err(|source| OutboxError::Decode {
        path: path.to_path_buf(),
        source,
    })
}
