//! Bounded extraction stage on Tokio's blocking thread pool
//!
//! Parsing runs through `spawn_blocking` so it never stalls the async
//! runtime. A semaphore with one permit per configured worker caps how many
//! documents are parsed at once; jobs beyond that wait for a permit.
//!
//! Each job carries an [`ExtractionTicket`]; whoever flips the ticket out of
//! `PENDING` first decides the job's fate. A job cancelled while it waits is
//! never parsed.

use crate::pipeline::parser::{parse_html, ParsedPage};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

const PENDING: u8 = 0;
const RUNNING: u8 = 1;
const CANCELLED: u8 = 2;

/// Shared cancellation ticket for one extraction job
#[derive(Debug, Clone)]
pub struct ExtractionTicket(Arc<AtomicU8>);

impl ExtractionTicket {
    pub fn new() -> Self {
        Self(Arc::new(AtomicU8::new(PENDING)))
    }

    /// Claims the job for execution; false if it was cancelled first
    pub fn try_start(&self) -> bool {
        self.0
            .compare_exchange(PENDING, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Withdraws the job; false if a worker already started it
    pub fn try_cancel(&self) -> bool {
        match self
            .0
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => true,
            Err(current) => current == CANCELLED,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire) == CANCELLED
    }
}

impl Default for ExtractionTicket {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of one extraction: parsed fields or a failure message
pub type ExtractionResult = Result<ParsedPage, String>;

/// Extraction runner allowing at most `size` parses at a time
#[derive(Debug, Clone)]
pub struct ExtractionPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl ExtractionPool {
    /// Creates a pool with `size` worker slots (at least one)
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        tracing::debug!("Extraction pool sized for {} worker(s)", size);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Parses a document once a worker slot is free
    ///
    /// # Returns
    ///
    /// * `Some(Ok(ParsedPage))` - Extraction finished
    /// * `Some(Err(message))` - The parse panicked or the blocking task failed
    /// * `None` - The ticket was cancelled before the parse started, or the
    ///   pool was closed
    pub async fn extract(
        &self,
        ticket: ExtractionTicket,
        content: String,
    ) -> Option<ExtractionResult> {
        self.run(ticket, move || parse_html(&content)).await
    }

    async fn run<F>(&self, ticket: ExtractionTicket, parse: F) -> Option<ExtractionResult>
    where
        F: FnOnce() -> ParsedPage + Send + 'static,
    {
        let Ok(_permit) = self.permits.acquire().await else {
            tracing::trace!("Extraction pool closed, skipping job");
            return None;
        };
        if ticket.is_cancelled() {
            tracing::trace!("Skipping cancelled extraction job");
            return None;
        }

        let joined =
            tokio::task::spawn_blocking(move || ticket.try_start().then(parse)).await;

        match joined {
            Ok(parsed) => parsed.map(Ok),
            Err(e) if e.is_panic() => {
                let payload = e.into_panic();
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "extraction worker panicked".to_string());
                Some(Err(message))
            }
            Err(e) => Some(Err(format!("Extraction task failed: {}", e))),
        }
    }

    /// Stops handing out worker slots
    ///
    /// Jobs still waiting for a slot resolve to `None`; parses already
    /// running finish on their own.
    pub fn close(&self) {
        self.permits.close();
        tracing::debug!("Extraction pool closed");
    }
}
