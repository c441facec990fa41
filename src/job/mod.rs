//! # Print Job Queue & Cache
//!
//! Bounded FIFO of print jobs with a strict lifecycle state machine and
//! cumulative progress accounting.
//!
//! ## Lifecycle
//!
//! ```text
//! Queued -> Sending -> Printing <-> Paused
//!    \         \           \          \
//!     +--------->+-- Canceled / Failed(_)
//!                 \
//!                  Completed
//! ```
//!
//! Terminal states (`Completed`, `Canceled`, `Failed`) accept no further
//! transitions; every illegal move is an [`QueueError::InvalidTransition`].
//! Only the session worker mutates job state, so observers see each job walk
//! the machine in order.
//!
//! ## Progress
//!
//! Device acks report **cumulative** copy totals. [`ProgressTracker`] keeps
//! the high-water mark of every counter, so a lost ack under-reports until
//! the next one arrives but can never double-count a page.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::QueueError;
use crate::printer::PaperStyle;
use crate::render::RasterBuffer;
use crate::status::{DeviceError, Progress};

/// Jobs the cache holds, including the active one, when caching is enabled.
pub const CACHE_CAPACITY: usize = 5;

// ============================================================================
// JOB STATE
// ============================================================================

/// Lifecycle state of a print job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Queued,
    /// Frames are being streamed to the device
    Sending,
    Printing,
    Paused,
    Completed,
    Canceled,
    Failed(DeviceError),
}

impl JobState {
    pub fn name(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Sending => "sending",
            JobState::Printing => "printing",
            JobState::Paused => "paused",
            JobState::Completed => "completed",
            JobState::Canceled => "canceled",
            JobState::Failed(_) => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Canceled | JobState::Failed(_)
        )
    }

    fn allows(&self, to: &JobState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self, to) {
            (JobState::Queued, JobState::Sending) => true,
            (JobState::Sending, JobState::Printing) => true,
            (JobState::Sending, JobState::Paused) => true,
            (JobState::Sending, JobState::Completed) => true,
            (JobState::Printing, JobState::Paused) => true,
            (JobState::Printing, JobState::Completed) => true,
            (JobState::Paused, JobState::Printing) => true,
            // Resume while frames were still being streamed
            (JobState::Paused, JobState::Sending) => true,
            // Cancel and failure reach every non-terminal state
            (_, JobState::Canceled) => true,
            (_, JobState::Failed(_)) => true,
            _ => false,
        }
    }
}

/// Progress phase events emitted around each state change, mirroring the
/// will/did pairs observers rely on for UI sequencing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePhase {
    WillPrint,
    Printing,
    WillPause,
    Paused,
    WillResume,
    Resumed,
    WillCancel,
    Canceled,
    WillDone,
    Done,
}

// ============================================================================
// JOBS
// ============================================================================

/// One rendered label page and how many copies of it to print.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub raster: RasterBuffer,
    pub copies: u32,
}

/// A queued unit of printing: one or more pages at a given density.
#[derive(Debug, Clone)]
pub struct PrintJob {
    pub id: Uuid,
    pub pages: Vec<Page>,
    /// Darkness level, clamped to the printer's range at submit time
    pub density: u8,
    pub paper: PaperStyle,
    /// RFID payload written before the first page, when present
    pub epc: Option<String>,
    pub submitted_at: DateTime<Utc>,
    state: JobState,
}

impl PrintJob {
    /// Build a job. Fails on an empty page list or a page with zero copies.
    pub fn new(pages: Vec<Page>, density: u8, paper: PaperStyle) -> Result<Self, QueueError> {
        if pages.is_empty() || pages.iter().any(|p| p.copies == 0) {
            return Err(QueueError::EmptyJob);
        }
        Ok(Self {
            id: Uuid::new_v4(),
            pages,
            density,
            paper,
            epc: None,
            submitted_at: Utc::now(),
            state: JobState::Queued,
        })
    }

    pub fn with_epc(mut self, epc: impl Into<String>) -> Self {
        self.epc = Some(epc.into());
        self
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    /// Total copies across all pages; the cumulative count a finished job
    /// reports.
    pub fn total_copies(&self) -> u32 {
        self.pages.iter().map(|p| p.copies).sum()
    }

    /// Advance the state machine. Illegal transitions are rejected and the
    /// job keeps its current state.
    pub fn set_state(&mut self, to: JobState) -> Result<(), QueueError> {
        if !self.state.allows(&to) {
            return Err(QueueError::InvalidTransition {
                from: self.state.name(),
                to: to.name(),
            });
        }
        self.state = to;
        Ok(())
    }
}

// ============================================================================
// CACHE
// ============================================================================

/// What to do when a job is submitted to a full cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Fail the submit with [`QueueError::CacheFull`]
    #[default]
    Reject,
    /// The submitter waits for a slot (bounded by the job timeout)
    Block,
}

/// Bounded FIFO of pending jobs.
///
/// With caching disabled the capacity drops to one: the job being printed is
/// the only job the engine will hold.
#[derive(Debug)]
pub struct JobCache {
    queue: VecDeque<PrintJob>,
    capacity: usize,
}

impl JobCache {
    pub fn new(cache_enabled: bool) -> Self {
        let capacity = if cache_enabled { CACHE_CAPACITY } else { 1 };
        Self {
            queue: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.queue.len() >= self.capacity
    }

    /// Enqueue a job, failing when the cache is at capacity.
    pub fn push(&mut self, job: PrintJob) -> Result<(), QueueError> {
        if self.is_full() {
            return Err(QueueError::CacheFull);
        }
        self.queue.push_back(job);
        Ok(())
    }

    /// The job at the head of the queue (the active one, once promoted).
    pub fn front_mut(&mut self) -> Option<&mut PrintJob> {
        self.queue.front_mut()
    }

    pub fn front(&self) -> Option<&PrintJob> {
        self.queue.front()
    }

    /// Remove the head job.
    pub fn pop(&mut self) -> Option<PrintJob> {
        self.queue.pop_front()
    }

    /// Find a queued job by id.
    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut PrintJob> {
        self.queue.iter_mut().find(|j| j.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PrintJob> {
        self.queue.iter()
    }
}

// ============================================================================
// PROGRESS
// ============================================================================

/// High-water progress accounting for one job.
///
/// All device-reported counters are cumulative; `observe` folds each report
/// in with `max`, so reordering or loss of individual acks never moves a
/// counter backwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressTracker {
    /// Copies the job must print to be complete
    pub expected_total: u32,
    /// Highest cumulative copy count reported so far
    pub total_count: u32,
    /// Highest page number reported so far
    pub page_no: u32,
    /// Highest cumulative ribbon usage reported so far
    pub carbon_used: u32,
}

impl ProgressTracker {
    pub fn new(expected_total: u32) -> Self {
        Self {
            expected_total,
            total_count: 0,
            page_no: 0,
            carbon_used: 0,
        }
    }

    pub fn for_job(job: &PrintJob) -> Self {
        Self::new(job.total_copies())
    }

    /// Fold in one device progress report.
    pub fn observe(&mut self, progress: &Progress) {
        self.total_count = self.total_count.max(progress.total_count);
        if let Some(page_no) = progress.page_no {
            self.page_no = self.page_no.max(page_no);
        }
        if let Some(carbon) = progress.carbon_used {
            self.carbon_used = self.carbon_used.max(carbon);
        }
    }

    /// Whether the device has confirmed every expected copy.
    pub fn is_complete(&self) -> bool {
        self.total_count >= self.expected_total
    }
}

// ============================================================================
// TESTS
// ============================================================================
