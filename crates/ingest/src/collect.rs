//! Collector: run every source concurrently, normalize while draining,
//! and merge into one record sequence with the warnings gathered on the way.

use std::collections::HashSet;

use futures_util::future::join_all;
use futures_util::StreamExt;
use serde::Serialize;
use thiserror::Error;

use crate::deadline::{Cancelled, Deadline};
use crate::docker::stats::ContainerStats;
use crate::error::ErrorKind;
use crate::parser::Normalizer;
use crate::record::{Record, SourceTag, Window};
use crate::source::{FetchHints, LogSource, SourceError, SourceWarning};

#[derive(Error, Debug)]
pub enum CollectError {
    #[error("no usable log source{}", describe(.warnings))]
    NoUsableSource { warnings: Vec<SourceWarning> },
    #[error("log collection stopped: {0}")]
    Cancelled(Cancelled),
}

fn describe(warnings: &[SourceWarning]) -> String {
    if warnings.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = warnings.iter().map(|w| w.message.clone()).collect();
    format!(": {}", parts.join("; "))
}

impl CollectError {
    /// One shared kind when every source failed the same way, else
    /// `SourceUnavailable`.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CollectError::Cancelled(_) => ErrorKind::Cancelled,
            CollectError::NoUsableSource { warnings } => match warnings.first() {
                Some(first) if warnings.iter().all(|w| w.kind == first.kind) => first.kind,
                _ => ErrorKind::SourceUnavailable,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CollectStats {
    pub lines_read: u64,
    /// Empty, banner, or out-of-window lines.
    pub lines_dropped: u64,
}

#[derive(Debug, Default)]
pub struct Collection {
    pub records: Vec<Record>,
    pub warnings: Vec<SourceWarning>,
    pub container_stats: Vec<ContainerStats>,
    pub stats: CollectStats,
}

/// Result of draining one source.
#[derive(Default)]
struct Outcome {
    records: Vec<Record>,
    warnings: Vec<SourceWarning>,
    container_stats: Vec<ContainerStats>,
    stats: CollectStats,
    failed: bool,
    cancelled: Option<Cancelled>,
}

pub struct Collector {
    sources: Vec<Box<dyn LogSource>>,
    normalizer: Normalizer,
}

impl Collector {
    pub fn new(sources: Vec<Box<dyn LogSource>>, normalizer: Normalizer) -> Self {
        Self { sources, normalizer }
    }

    pub fn sources(&self) -> impl Iterator<Item = String> + '_ {
        self.sources.iter().map(|s| s.name())
    }

    pub async fn collect(
        &self,
        window: Window,
        hints: &FetchHints,
        deadline: &Deadline,
    ) -> Result<Collection, CollectError> {
        let outcomes = join_all(
            self.sources
                .iter()
                .map(|source| self.drain(source.as_ref(), window, hints, deadline)),
        )
        .await;

        let mut collection = Collection::default();
        let mut failed = 0usize;
        for outcome in outcomes {
            if let Some(reason) = outcome.cancelled {
                return Err(CollectError::Cancelled(reason));
            }
            if outcome.failed {
                failed += 1;
            }
            collection.records.extend(outcome.records);
            collection.warnings.extend(outcome.warnings);
            collection.container_stats.extend(outcome.container_stats);
            collection.stats.lines_read += outcome.stats.lines_read;
            collection.stats.lines_dropped += outcome.stats.lines_dropped;
        }

        if failed == self.sources.len() {
            return Err(CollectError::NoUsableSource { warnings: collection.warnings });
        }

        tracing::info!(
            records = collection.records.len(),
            warnings = collection.warnings.len(),
            lines_read = collection.stats.lines_read,
            lines_dropped = collection.stats.lines_dropped,
            "collection complete"
        );
        Ok(collection)
    }

    async fn drain(
        &self,
        source: &dyn LogSource,
        window: Window,
        hints: &FetchHints,
        deadline: &Deadline,
    ) -> Outcome {
        let mut outcome = Outcome::default();
        let tag = source.tag();

        let fetch = match source.fetch(window, hints, deadline).await {
            Ok(fetch) => fetch,
            Err(SourceError::Cancelled { reason, .. }) => {
                outcome.cancelled = Some(reason);
                return outcome;
            }
            Err(e) => {
                tracing::warn!(source = %source.name(), error = %e, "source failed");
                outcome.failed = true;
                outcome.warnings.push(SourceWarning::new(tag, e.kind(), e.to_string()));
                return outcome;
            }
        };

        outcome.warnings.extend(fetch.warnings);
        outcome.container_stats.extend(fetch.container_stats);
        let mut lines = fetch.lines;
        let mut errors: Vec<SourceError> = Vec::new();
        // Origins (hosts, containers) that yielded at least one line.
        let mut produced: HashSet<String> = HashSet::new();

        loop {
            let next = match deadline.run(lines.next()).await {
                Ok(next) => next,
                Err(reason) => {
                    // Dropping `lines` below releases the process or socket.
                    outcome.cancelled = Some(reason);
                    return outcome;
                }
            };
            match next {
                None => break,
                Some(Ok(raw)) => {
                    outcome.stats.lines_read += 1;
                    if !produced.contains(&raw.origin.id) {
                        produced.insert(raw.origin.id.clone());
                    }
                    match self.normalizer.normalize(&raw) {
                        Some(record) => outcome.records.push(record),
                        None => outcome.stats.lines_dropped += 1,
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!(source = %source.name(), error = %e, "source stream error");
                    errors.push(e);
                }
            }
        }

        // A source that errored without a single line from any origin failed
        // outright, whatever kind its streams reported.
        outcome.failed = produced.is_empty() && !errors.is_empty();
        for e in errors {
            let kind = match e.kind() {
                _ if produced.contains(e.source_id()) => ErrorKind::PartialSourceFailure,
                ErrorKind::PartialSourceFailure if outcome.failed => ErrorKind::SourceUnavailable,
                kind => kind,
            };
            let origin = SourceTag { kind: tag.kind, id: e.source_id().to_string() };
            outcome.warnings.push(SourceWarning::new(origin, kind, e.to_string()));
        }

        tracing::debug!(
            source = %source.name(),
            records = outcome.records.len(),
            lines_read = outcome.stats.lines_read,
            "source drained"
        );
        outcome
    }
}
