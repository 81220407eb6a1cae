//! JSON-lines event reader.
//!
//! One event per line:
//!
//! ```text
//! {"barrel":[{"id":838926849,"energy":1.5}],"endcap":[{"id":872432916,"energy":0.4}]}
//! ```
//!
//! Either collection may be omitted. Blank lines are skipped.

use crate::{Error, Result};
use ecalstitch_core::{CellId, EventHits};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

#[derive(Deserialize)]
struct RawHit {
    id: u32,
    energy: f32,
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(default)]
    barrel: Vec<RawHit>,
    #[serde(default)]
    endcap: Vec<RawHit>,
}

/// Streaming reader yielding one [`EventHits`] per non-blank line.
pub struct EventReader<R> {
    reader: R,
    line: String,
    line_number: usize,
    events: usize,
}

impl EventReader<BufReader<File>> {
    /// Opens an event file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> EventReader<R> {
    /// Wraps any buffered reader.
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_number: 0,
            events: 0,
        }
    }

    /// Number of events yielded so far.
    #[must_use]
    pub fn events_read(&self) -> usize {
        self.events
    }

    /// Current line number (1-based, 0 before the first read).
    #[must_use]
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    fn parse_line(&self) -> Result<EventHits> {
        let raw: RawEvent = serde_json::from_str(&self.line).map_err(|e| {
            Error::InvalidFormat(format!("line {}: {e}", self.line_number))
        })?;

        let mut event = EventHits::with_capacity(raw.barrel.len(), raw.endcap.len());
        let mut seen = HashSet::with_capacity(raw.barrel.len());
        for hit in &raw.barrel {
            let id = self.decode(hit.id, true)?;
            if !seen.insert(id) {
                log::warn!(
                    "line {}: duplicate barrel cell {id}, last value wins in the image",
                    self.line_number
                );
            }
            event.push(id, hit.energy);
        }
        for hit in &raw.endcap {
            let id = self.decode(hit.id, false)?;
            event.push(id, hit.energy);
        }
        Ok(event)
    }

    fn decode(&self, raw: u32, barrel: bool) -> Result<CellId> {
        let id = CellId::from_raw(raw)
            .map_err(|e| Error::InvalidFormat(format!("line {}: {e}", self.line_number)))?;
        if id.is_barrel() != barrel {
            let collection = if barrel { "barrel" } else { "endcap" };
            return Err(Error::InvalidFormat(format!(
                "line {}: {id} listed in the {collection} collection",
                self.line_number
            )));
        }
        Ok(id)
    }
}

impl<R: BufRead> Iterator for EventReader<R> {
    type Item = Result<EventHits>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
            self.line_number += 1;
            if self.line.trim().is_empty() {
                continue;
            }
            let event = self.parse_line();
            if event.is_ok() {
                self.events += 1;
            }
            return Some(event);
        }
    }
}
