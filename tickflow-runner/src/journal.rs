//! Flat-file event journal.
//!
//! A passive observer that appends one CSV row per event into per-kind
//! files under a journal directory (`market_data.csv`, `signal.csv`,
//! and so on). It never publishes; a run behaves identically with or
//! without it attached.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::error;

use tickflow_core::bus::{EventHandler, Outbox};
use tickflow_core::events::{Event, EventKind};

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("failed to create journal dir {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create journal file {path}: {source}")]
    CreateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write journal row: {0}")]
    Write(#[from] csv::Error),

    #[error("{dropped} journal row(s) could not be written")]
    DroppedRows { dropped: usize },
}

/// Writes every observed event to a per-kind CSV file.
///
/// Rows that fail to serialize are counted and reported by
/// [`finish`](EventJournal::finish) instead of aborting the run; the bus
/// handler interface has nowhere to surface an error mid-dispatch.
pub struct EventJournal {
    dir: PathBuf,
    writers: HashMap<EventKind, csv::Writer<File>>,
    dropped: usize,
}

impl EventJournal {
    /// Creates the journal directory (and parents) up front so a bad
    /// path fails before the run starts.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self, JournalError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| JournalError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            dir,
            writers: HashMap::new(),
            dropped: 0,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn writer(&mut self, kind: EventKind) -> Result<&mut csv::Writer<File>, JournalError> {
        match self.writers.entry(kind) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let path = self.dir.join(format!("{kind}.csv"));
                let file = File::create(&path).map_err(|source| JournalError::CreateFile {
                    path: path.clone(),
                    source,
                })?;
                Ok(entry.insert(csv::Writer::from_writer(file)))
            }
        }
    }

    fn append(&mut self, event: &Event) -> Result<(), JournalError> {
        let writer = self.writer(event.kind())?;
        match event {
            Event::MarketData(e) => writer.serialize(e)?,
            Event::Signal(e) => writer.serialize(e)?,
            Event::Order(e) => writer.serialize(e)?,
            Event::ApprovedOrder(e) => writer.serialize(e)?,
            Event::RiskVeto(e) => writer.serialize(e)?,
            Event::Fill(e) => writer.serialize(e)?,
            Event::PortfolioUpdate(e) => writer.serialize(e)?,
        }
        Ok(())
    }

    /// Flushes every writer and reports rows dropped during the run.
    pub fn finish(&mut self) -> Result<(), JournalError> {
        for writer in self.writers.values_mut() {
            writer.flush().map_err(csv::Error::from)?;
        }
        if self.dropped > 0 {
            return Err(JournalError::DroppedRows {
                dropped: self.dropped,
            });
        }
        Ok(())
    }
}

impl EventHandler for EventJournal {
    fn subscriptions(&self) -> &'static [EventKind] {
        &EventKind::ALL
    }

    fn on_event(&mut self, event: &Event, _outbox: &mut Outbox<'_>) {
        if let Err(err) = self.append(event) {
            self.dropped += 1;
            error!(kind = %event.kind(), %err, "journal row dropped");
        }
    }
}
