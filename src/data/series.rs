//! Exposure series store
//!
//! Append-only, version-ordered history of published curves and flip results.
//! Entries are shared as `Arc`s and never mutated after append, so a consumer
//! can hold an old entry while the producer keeps appending.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::book::BookVersion;
use crate::core::{ExposureError, ExposureResult};
use crate::exposure::{ExposureCurve, GammaFlipResult};

/// One published cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesEntry {
    pub version: BookVersion,
    pub timestamp: DateTime<Utc>,
    pub curve: ExposureCurve,
    pub flip: GammaFlipResult,
}

type Entries = Arc<RwLock<Vec<Arc<SeriesEntry>>>>;

#[derive(Debug, Clone, Default)]
pub struct ExposureSeriesStore {
    entries: Entries,
}

impl ExposureSeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a published result.
    ///
    /// Versions must strictly increase and timestamps must not go backwards;
    /// either violation is rejected and the history is left untouched.
    pub fn append(
        &self,
        version: BookVersion,
        curve: ExposureCurve,
        flip: GammaFlipResult,
        timestamp: DateTime<Utc>,
    ) -> ExposureResult<Arc<SeriesEntry>> {
        let mut entries = self.entries.write();

        if let Some(last) = entries.last() {
            if version <= last.version {
                return Err(ExposureError::VersionRegression {
                    last: last.version.value(),
                    attempted: version.value(),
                });
            }
            if timestamp < last.timestamp {
                return Err(ExposureError::TimestampRegression {
                    last: last.timestamp,
                    attempted: timestamp,
                });
            }
        }

        let entry = Arc::new(SeriesEntry {
            version,
            timestamp,
            curve,
            flip,
        });
        entries.push(Arc::clone(&entry));

        tracing::debug!("Appended series entry {} at {} ({} total)", version, timestamp, entries.len());
        Ok(entry)
    }

    pub fn latest(&self) -> Option<Arc<SeriesEntry>> {
        self.entries.read().last().cloned()
    }

    pub fn latest_version(&self) -> Option<BookVersion> {
        self.entries.read().last().map(|e| e.version)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Entries with `from <= timestamp <= to`, in append order.
    ///
    /// The returned range is lazy: nothing is copied until it is iterated,
    /// and it can be iterated any number of times with the same result.
    pub fn range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> SeriesRange {
        SeriesRange {
            entries: Arc::clone(&self.entries),
            from,
            to,
        }
    }
}

/// Restartable query over a timestamp window
#[derive(Debug, Clone)]
pub struct SeriesRange {
    entries: Entries,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
}

impl SeriesRange {
    pub fn iter(&self) -> SeriesIter {
        let entries = self.entries.read();
        // Timestamps are non-decreasing, so the window is a contiguous slice
        let start = entries.partition_point(|e| e.timestamp < self.from);
        let end = entries.partition_point(|e| e.timestamp <= self.to).max(start);
        SeriesIter {
            entries: Arc::clone(&self.entries),
            next: start,
            end,
        }
    }
}

impl IntoIterator for &SeriesRange {
    type Item = Arc<SeriesEntry>;
    type IntoIter = SeriesIter;

    fn into_iter(self) -> SeriesIter {
        self.iter()
    }
}

impl IntoIterator for SeriesRange {
    type Item = Arc<SeriesEntry>;
    type IntoIter = SeriesIter;

    fn into_iter(self) -> SeriesIter {
        self.iter()
    }
}

/// Iterator bounded at creation time; later appends are not observed
#[derive(Debug)]
pub struct SeriesIter {
    entries: Entries,
    next: usize,
    end: usize,
}

impl Iterator for SeriesIter {
    type Item = Arc<SeriesEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let item = self.entries.read().get(self.next).cloned();
        self.next += 1;
        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.end.saturating_sub(self.next);
        (n, Some(n))
    }
}

impl ExactSizeIterator for SeriesIter {}
