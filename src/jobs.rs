//! Coalescing analysis queue
//!
//! Keys are queued at most once. [`Jobs::process`] drains the queue, orders it
//! by editor priority and runs each document's analysis on a rayon pool. A
//! document can appear only once per batch, so no two analyses of the same
//! document are ever started by the queue; one that is already running
//! elsewhere is put back for the next round.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;

use crate::document::{Document, DocumentKey};
use crate::documents::Documents;
use crate::error::{Result, TrackerError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum JobStatus {
    Completed,
    Failed(String),
    /// The document was removed before the job ran
    Removed,
    /// An analysis was already in flight; the key is queued again
    Requeued,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Failed(message) => write!(f, "failed: {}", message),
            Self::Removed => write!(f, "removed"),
            Self::Requeued => write!(f, "requeued"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub key: DocumentKey,
    pub status: JobStatus,
}

/// Lower runs first.
fn priority(document: &Document) -> u8 {
    if document.is_used_by_current_editor() {
        0
    } else if document.is_visible_in_editor() {
        1
    } else {
        2
    }
}

pub struct Jobs {
    queue: VecDeque<DocumentKey>,
    pending: HashSet<DocumentKey>,
    pool: Option<rayon::ThreadPool>,
}

impl Jobs {
    /// Queue that runs on rayon's global pool.
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            pending: HashSet::new(),
            pool: None,
        }
    }

    /// Queue with a dedicated pool of `worker_threads`; 0 uses the global pool.
    pub fn with_worker_threads(worker_threads: usize) -> Result<Self> {
        let mut jobs = Self::new();
        if worker_threads > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(worker_threads)
                .thread_name(|index| format!("tu-tracker-worker-{}", index))
                .build()
                .map_err(|e| TrackerError::ConfigError {
                    message: format!("Failed to build worker pool: {}", e),
                })?;
            jobs.pool = Some(pool);
        }
        Ok(jobs)
    }

    /// Queue `key`. Returns false if it was already pending.
    pub fn add(&mut self, key: DocumentKey) -> bool {
        if !self.pending.insert(key.clone()) {
            return false;
        }
        self.queue.push_back(key);
        true
    }

    /// Queue every document that was never analyzed or needs reparse.
    ///
    /// Returns how many keys were newly queued.
    pub fn add_dirty(&mut self, documents: &Documents) -> usize {
        let dirty = documents.filtered(|document| {
            document.is_needing_reparse() || (!document.is_parsed() && !document.is_deleted())
        });
        dirty
            .iter()
            .filter_map(|document| document.key().ok())
            .filter(|key| self.add(key.clone()))
            .count()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn pending(&self) -> impl Iterator<Item = &DocumentKey> {
        self.queue.iter()
    }

    /// Run every queued job once.
    ///
    /// Outcomes are returned in the order the jobs were scheduled: documents
    /// used by the current editor first, visible ones next, then the rest in
    /// queue order.
    pub fn process(&mut self, documents: &Documents) -> Vec<JobOutcome> {
        let start = Instant::now();
        let keys: Vec<DocumentKey> = self.queue.drain(..).collect();
        self.pending.clear();

        let mut outcomes = Vec::new();
        let mut batch: Vec<(DocumentKey, Document)> = Vec::with_capacity(keys.len());
        for key in keys {
            match documents.document_for_key(&key) {
                Ok(document) => batch.push((key, document)),
                Err(_) => outcomes.push(JobOutcome {
                    key,
                    status: JobStatus::Removed,
                }),
            }
        }
        batch.sort_by_key(|(_, document)| priority(document));

        let run = || -> Vec<JobOutcome> {
            batch
                .par_iter()
                .map(|(key, document)| JobOutcome {
                    key: key.clone(),
                    status: run_job(key, document),
                })
                .collect()
        };
        let ran = match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        };

        for outcome in &ran {
            if outcome.status == JobStatus::Requeued {
                self.add(outcome.key.clone());
            }
        }
        outcomes.extend(ran);

        tracing::info!(
            "[JOBS] Processed {} jobs in {}ms ({} requeued)",
            outcomes.len(),
            start.elapsed().as_millis(),
            self.queue.len()
        );
        outcomes
    }
}

fn run_job(key: &DocumentKey, document: &Document) -> JobStatus {
    if document.is_analysis_in_flight() {
        return JobStatus::Requeued;
    }

    let result = if document.is_parsed() {
        document.reparse()
    } else {
        document.parse()
    };

    match result {
        Ok(()) => JobStatus::Completed,
        Err(TrackerError::AnalysisInFlight { .. }) => JobStatus::Requeued,
        Err(e) => {
            tracing::warn!("[JOBS] Job for {} failed: {}", key, e);
            JobStatus::Failed(e.to_string())
        }
    }
}

impl Default for Jobs {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Jobs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Jobs")
            .field("queue", &self.queue)
            .field("dedicated_pool", &self.pool.is_some())
            .finish()
    }
}
