//! Durable storage for the three worth mappings.
//!
//! Each tier lands in its own JSON record inside the worth directory:
//! `pre_worths.json`, `post_worths.json` and `worths.json` for the baked
//! snapshot. Records are arrays of `{ stack, worth }` entries in canonical
//! key order, so a record written from a mapping reads back as that exact
//! mapping. A missing record is an expected condition reported as absence;
//! every other failure is surfaced to the caller.

use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ExchequerError, Result};
use crate::stack::StackKey;
use crate::worth::Worth;

// ------------- Record -------------
/// The three durable records kept by the persistor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Record {
    Pre,
    Post,
    Snapshot,
}

impl Record {
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Pre => "pre_worths.json",
            Self::Post => "post_worths.json",
            Self::Snapshot => "worths.json",
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.file_name())
    }
}

// one entry of a persisted record
#[derive(Serialize, Deserialize)]
struct WorthEntry {
    stack: StackKey,
    worth: Worth,
}

// ------------- Persistence -------------
/// Encapsulates the worth directory and the encoding of its records.
#[derive(Debug)]
pub struct Persistor {
    directory: PathBuf,
}

impl Persistor {
    pub fn new(directory: impl Into<PathBuf>) -> Persistor {
        Persistor { directory: directory.into() }
    }
    pub fn directory(&self) -> &Path {
        &self.directory
    }
    pub fn path(&self, record: Record) -> PathBuf {
        self.directory.join(record.file_name())
    }
    /// Writes one record, creating the worth directory on first use.
    pub fn persist(&self, record: Record, worths: &BTreeMap<StackKey, Worth>) -> Result<()> {
        let entries: Vec<WorthEntry> = worths
            .iter()
            .map(|(stack, worth)| WorthEntry { stack: stack.clone(), worth: *worth })
            .collect();
        let encoded = serde_json::to_string_pretty(&entries)
            .map_err(|e| ExchequerError::Persistence(e.to_string()))?;
        fs::create_dir_all(&self.directory)?;
        fs::write(self.path(record), encoded)?;
        debug!(record = %record, entries = entries.len(), "record written");
        Ok(())
    }
    /// Reads one record back as a mapping.
    ///
    /// Absence of the record file is not a failure and comes back as None;
    /// the caller decides whether absence means "start empty" or
    /// "regenerate". Unreadable or undecodable content is a failure.
    pub fn restore(&self, record: Record) -> Result<Option<BTreeMap<StackKey, Worth>>> {
        let encoded = match fs::read_to_string(self.path(record)) {
            Ok(encoded) => encoded,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(ExchequerError::Persistence(error.to_string())),
        };
        let entries: Vec<WorthEntry> = serde_json::from_str(&encoded)?;
        let mut worths = BTreeMap::new();
        for entry in entries {
            worths.insert(entry.stack, entry.worth);
        }
        debug!(record = %record, entries = worths.len(), "record restored");
        Ok(Some(worths))
    }
}
