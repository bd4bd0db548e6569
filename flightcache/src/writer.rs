//! Write-behind persistence for evicted records.
//!
//! In write-behind mode the cache does not append evicted records itself.
//! It sends them over a bounded channel to a dedicated writer thread that
//! owns a [`LogFile`], so the insertion path never waits on disk latency
//! unless the queue is full.
//!
//! # Guarantees
//!
//! - Records are written in the order they were evicted.
//! - A record is enqueued before it leaves the cache.
//! - A failed append is retried with exponential backoff, capped at
//!   [`MAX_RETRY_BACKOFF`] per wait. A record that still
//!   cannot be written is parked in a failed list, logged at `error` level and
//!   reported by the next [`flush`](WriteBehind::flush) or
//!   [`shutdown`](WriteBehind::shutdown). It is never silently dropped.
//!
//! # Shutdown
//!
//! Dropping a [`WriteBehind`] closes the queue and joins the thread after it
//! has drained every queued record.

use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::config::{MAX_RETRY_BACKOFF, WriteBehindConfig};
use crate::error::{PersistError, Result};
use crate::persist::LogFile;
use crate::record::LogRecord;

/// Messages understood by the writer thread.
#[derive(Debug)]
enum Command {
    /// Append one evicted record.
    Persist(LogRecord),
    /// Acknowledge once every earlier command has been handled.
    Flush(mpsc::Sender<()>),
}

/// Handle on a running writer thread.
#[derive(Debug)]
pub struct WriteBehind {
    /// Queue into the writer; `None` once shut down.
    sender: Option<SyncSender<Command>>,
    /// The writer thread; `None` once joined.
    handle: Option<JoinHandle<()>>,
    /// Records the writer gave up on.
    failed: Arc<Mutex<Vec<LogRecord>>>,
    /// Log path, for error messages.
    path: String,
}

impl WriteBehind {
    /// Starts a writer thread appending to `log`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::WriterUnavailable`] if the thread cannot be
    /// spawned.
    pub fn spawn(log: LogFile, config: WriteBehindConfig) -> Result<Self> {
        let path = log.path().display().to_string();
        let (sender, receiver) = mpsc::sync_channel(config.queue_depth);
        let failed = Arc::new(Mutex::new(Vec::new()));

        let thread_failed = Arc::clone(&failed);
        let handle = std::thread::Builder::new()
            .name("flightcache-writer".to_string())
            .spawn(move || run_writer(&log, &config, &receiver, &thread_failed))
            .map_err(|e| {
                tracing::error!("failed to spawn write-behind writer for '{path}': {e}");
                PersistError::WriterUnavailable { path: path.clone() }
            })?;

        tracing::debug!(
            "write-behind writer started for '{path}' (queue depth {})",
            config.queue_depth
        );

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
            failed,
            path,
        })
    }

    fn unavailable(&self) -> PersistError {
        PersistError::WriterUnavailable {
            path: self.path.clone(),
        }
    }

    /// Queues an evicted record for writing.
    ///
    /// Blocks while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::WriterUnavailable`] if the writer thread has
    /// exited. The record is not queued in that case.
    pub fn enqueue(&self, record: LogRecord) -> Result<()> {
        let sender = self.sender.as_ref().ok_or_else(|| self.unavailable())?;
        sender
            .send(Command::Persist(record))
            .map_err(|_| self.unavailable())?;
        Ok(())
    }

    /// Waits until every record queued so far has been handled.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::WriterUnavailable`] if the writer has exited,
    /// or [`PersistError::RecordsNotPersisted`] if any record is sitting in
    /// the failed list.
    pub fn flush(&self) -> Result<()> {
        let sender = self.sender.as_ref().ok_or_else(|| self.unavailable())?;
        let (ack_tx, ack_rx) = mpsc::channel();
        sender
            .send(Command::Flush(ack_tx))
            .map_err(|_| self.unavailable())?;
        ack_rx.recv().map_err(|_| self.unavailable())?;

        self.check_failed()
    }

    /// Returns the number of records the writer gave up on.
    pub fn failed_count(&self) -> usize {
        self.failed.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Removes and returns the records the writer gave up on, oldest first.
    pub fn take_failed(&self) -> Vec<LogRecord> {
        std::mem::take(&mut *self.failed.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn check_failed(&self) -> Result<()> {
        match self.failed_count() {
            0 => Ok(()),
            count => Err(PersistError::RecordsNotPersisted {
                path: self.path.clone(),
                count,
            }
            .into()),
        }
    }

    /// Closes the queue, waits for the writer to drain it, and joins the
    /// thread.
    fn stop(&mut self) {
        drop(self.sender.take());
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            tracing::error!("write-behind writer for '{}' panicked", self.path);
        }
    }

    /// Drains the queue, stops the writer and reports unwritten records.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::RecordsNotPersisted`] if any record could not
    /// be written. Those records are lost once this handle is dropped, so
    /// call [`take_failed`](Self::take_failed) first if they matter.
    pub fn shutdown(&mut self) -> Result<()> {
        self.stop();
        self.check_failed()
    }
}

impl Drop for WriteBehind {
    fn drop(&mut self) {
        self.stop();
        let count = self.failed_count();
        if count > 0 {
            tracing::error!(
                "dropping write-behind writer for '{}' with {count} unwritten record(s)",
                self.path
            );
        }
    }
}

/// Writer thread body. Runs until every sender is gone.
fn run_writer(
    log: &LogFile,
    config: &WriteBehindConfig,
    receiver: &Receiver<Command>,
    failed: &Mutex<Vec<LogRecord>>,
) {
    for command in receiver {
        match command {
            Command::Persist(record) => {
                if let Err(e) = append_with_retry(log, &record, config) {
                    tracing::error!(
                        "giving up on evicted record at t={} after {} retries: {e}",
                        record.timestamp,
                        config.max_retries
                    );
                    failed
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(record);
                }
            }
            Command::Flush(ack) => {
                // The flusher may have given up waiting.
                let _ = ack.send(());
            }
        }
    }

    tracing::debug!("write-behind writer for '{}' stopped", log.path().display());
}

/// Doubles a retry delay, capped at [`MAX_RETRY_BACKOFF`].
fn next_backoff(current: Duration) -> Duration {
    current.saturating_mul(2).min(MAX_RETRY_BACKOFF)
}

/// Appends a record, retrying with exponential backoff.
fn append_with_retry(log: &LogFile, record: &LogRecord, config: &WriteBehindConfig) -> Result<()> {
    let mut backoff = config.retry_backoff;
    let mut attempt = 0;

    loop {
        match log.append(record) {
            Ok(()) => return Ok(()),
            Err(e) if attempt >= config.max_retries => return Err(e),
            Err(e) => {
                tracing::warn!(
                    "append to '{}' failed (attempt {}): {e}",
                    log.path().display(),
                    attempt + 1
                );
                std::thread::sleep(backoff);
                backoff = next_backoff(backoff);
                attempt += 1;
            }
        }
    }
}
