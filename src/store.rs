//! Persistent store of compiled events
//!
//! A JSON-lines file. The first line is a header; every following line holds
//! one event group keyed by the ISO-8601 start of its quiet period. Groups
//! are append-only and keys are unique within a file.

use crate::models::{iso_key, nan_as_null, EventRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Format tag written in the header line
pub const STORE_FORMAT: &str = "chorus-delay-store-v1";

/// Description written in the header line
pub const STORE_ABOUT: &str = "Magnetic and electric chorus data from RBSP EMFISIS. \
Organized by event -> individual measurements. Times are in ut datasets as \
ISO-8601 strings.";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{path} has no store header")]
    MissingHeader { path: PathBuf },

    #[error("unsupported store format `{0}`")]
    UnsupportedFormat(String),

    #[error("group `{0}` already exists")]
    DuplicateGroup(String),
}

/// First line of a store file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreHeader {
    pub format: String,
    pub about: String,
}

impl Default for StoreHeader {
    fn default() -> Self {
        Self {
            format: STORE_FORMAT.to_string(),
            about: STORE_ABOUT.to_string(),
        }
    }
}

/// Per-event datasets, all of equal length
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EventGroup {
    #[serde(with = "nan_as_null")]
    pub delay: Vec<f64>,
    #[serde(with = "nan_as_null")]
    pub b_ubc: Vec<f64>,
    #[serde(with = "nan_as_null")]
    pub e_ubc: Vec<f64>,
    #[serde(with = "nan_as_null")]
    pub b_ubc_max: Vec<f64>,
    #[serde(with = "nan_as_null")]
    pub e_ubc_max: Vec<f64>,
    #[serde(with = "nan_as_null")]
    pub b_lbc: Vec<f64>,
    #[serde(with = "nan_as_null")]
    pub e_lbc: Vec<f64>,
    #[serde(with = "nan_as_null")]
    pub b_lbc_max: Vec<f64>,
    #[serde(with = "nan_as_null")]
    pub e_lbc_max: Vec<f64>,
    #[serde(with = "nan_as_null")]
    pub mlt: Vec<f64>,
    #[serde(with = "nan_as_null")]
    pub l: Vec<f64>,
    #[serde(with = "nan_as_null")]
    pub mlat: Vec<f64>,
    pub probe: Vec<String>,
    pub ut: Vec<String>,
}

impl EventGroup {
    pub fn len(&self) -> usize {
        self.delay.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delay.is_empty()
    }
}

impl From<&EventRecord> for EventGroup {
    fn from(record: &EventRecord) -> Self {
        let mut group = EventGroup::default();
        for m in &record.measurements {
            let (lower, upper) = (&m.power.lower, &m.power.upper);
            group.delay.push(m.delay);
            group.b_ubc.push(upper.b.integrated);
            group.e_ubc.push(upper.e.integrated);
            group.b_ubc_max.push(upper.b.max);
            group.e_ubc_max.push(upper.e.max);
            group.b_lbc.push(lower.b.integrated);
            group.e_lbc.push(lower.e.integrated);
            group.b_lbc_max.push(lower.b.max);
            group.e_lbc_max.push(lower.e.max);
            group.mlt.push(m.mlt);
            group.l.push(m.l);
            group.mlat.push(m.mlat);
            group.probe.push(m.probe.clone());
            group.ut.push(iso_key(&m.ut));
        }
        group
    }
}

#[derive(Serialize, Deserialize)]
struct GroupLine {
    group: String,
    data: EventGroup,
}

/// Destination for completed event records
pub trait RecordSink {
    fn write_record(&mut self, record: &EventRecord) -> Result<(), StoreError>;
}

impl RecordSink for Vec<EventRecord> {
    fn write_record(&mut self, record: &EventRecord) -> Result<(), StoreError> {
        self.push(record.clone());
        Ok(())
    }
}

/// Append-only writer for a store file
#[derive(Debug)]
pub struct ChorusStore {
    writer: BufWriter<File>,
    keys: HashSet<String>,
}

impl ChorusStore {
    /// Create a new store, replacing any existing file
    pub fn create(path: &Path) -> Result<Self, StoreError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &StoreHeader::default())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(Self {
            writer,
            keys: HashSet::new(),
        })
    }

    /// Open an existing store for appending, or create it
    ///
    /// An interrupted final write is cut back to the last complete line so
    /// new groups never land on the partial bytes.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Self::create(path);
        }
        let mut file = OpenOptions::new().append(true).open(path)?;
        repair_tail(path, &mut file)?;

        let (_, groups) = read_groups(path)?;
        let keys = groups.into_iter().map(|(key, _)| key).collect();
        Ok(Self {
            writer: BufWriter::new(file),
            keys,
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Number of groups in the file
    pub fn group_count(&self) -> usize {
        self.keys.len()
    }

    /// Write one group as a single line
    pub fn append_group(&mut self, key: &str, group: &EventGroup) -> Result<(), StoreError> {
        if self.keys.contains(key) {
            return Err(StoreError::DuplicateGroup(key.to_string()));
        }
        let line = GroupLine {
            group: key.to_string(),
            data: group.clone(),
        };
        serde_json::to_writer(&mut self.writer, &line)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.keys.insert(key.to_string());
        debug!(group = key, measurements = group.len(), "wrote group");
        Ok(())
    }
}

impl RecordSink for ChorusStore {
    fn write_record(&mut self, record: &EventRecord) -> Result<(), StoreError> {
        self.append_group(&record.key(), &EventGroup::from(record))
    }
}

/// Make the file end on a line boundary
///
/// A complete line missing only its newline is terminated; a partial line is
/// truncated away.
fn repair_tail(path: &Path, file: &mut File) -> Result<(), StoreError> {
    let bytes = std::fs::read(path)?;
    if bytes.is_empty() || bytes.ends_with(b"\n") {
        return Ok(());
    }
    let cut = bytes.iter().rposition(|b| *b == b'\n').map_or(0, |i| i + 1);
    let tail = &bytes[cut..];

    let complete = if cut == 0 {
        serde_json::from_slice::<StoreHeader>(tail).is_ok()
    } else {
        serde_json::from_slice::<GroupLine>(tail).is_ok()
    };
    if complete || cut == 0 {
        file.write_all(b"\n")?;
    } else {
        warn!(
            path = %path.display(),
            bytes = tail.len(),
            "dropping interrupted group before appending"
        );
        file.set_len(cut as u64)?;
    }
    file.flush()?;
    Ok(())
}

/// Read the header and every group, in write order
///
/// A final line that fails to parse is treated as an interrupted write and
/// skipped with a warning; a bad line anywhere else is an error.
pub fn read_groups(path: &Path) -> Result<(StoreHeader, Vec<(String, EventGroup)>), StoreError> {
    let reader = BufReader::new(File::open(path)?);
    let lines: Vec<String> = reader.lines().collect::<Result<_, _>>()?;
    let mut lines = lines.into_iter().filter(|line| !line.trim().is_empty()).peekable();

    let header: StoreHeader = match lines.next() {
        Some(line) => serde_json::from_str(&line).map_err(|_| StoreError::MissingHeader {
            path: path.to_path_buf(),
        })?,
        None => {
            return Err(StoreError::MissingHeader {
                path: path.to_path_buf(),
            })
        }
    };
    if header.format != STORE_FORMAT {
        return Err(StoreError::UnsupportedFormat(header.format));
    }

    let mut groups = Vec::new();
    while let Some(line) = lines.next() {
        match serde_json::from_str::<GroupLine>(&line) {
            Ok(parsed) => groups.push((parsed.group, parsed.data)),
            Err(e) if lines.peek().is_none() => {
                warn!(path = %path.display(), error = %e, "skipping truncated final group");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok((header, groups))
}
