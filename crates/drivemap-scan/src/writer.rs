//! Single-consumer batch writer.
//!
//! Scanner workers publish records into a bounded channel; one dedicated
//! thread drains it into an in-memory batch and commits every full batch as
//! one insert-or-ignore transaction. A [`WriterMessage::Shutdown`] marker,
//! sent once after every producer has finished, triggers the final flush.
//!
//! ```text
//!  scanner workers (N) --Record--> bounded channel --> writer thread --> store
//!                      Shutdown (once, after join) --^
//! ```

use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, RecvError, Sender, bounded};
use drivemap_core::FileRecord;
use drivemap_store::RecordStore;

use crate::error::PipelineError;

/// Messages consumed by the writer thread.
#[derive(Debug)]
pub enum WriterMessage {
    /// A scanned file to store.
    Record(FileRecord),
    /// End of stream: flush what remains and stop.
    Shutdown,
}

/// Producer side of the record channel.
///
/// Publishing blocks while the channel is full.
#[derive(Debug, Clone)]
pub struct RecordSender {
    sender: Sender<WriterMessage>,
}

impl RecordSender {
    /// Publish one record, waiting for capacity.
    pub fn publish(&self, record: FileRecord) -> Result<(), PipelineError> {
        self.sender
            .send(WriterMessage::Record(record))
            .map_err(|_| PipelineError::ChannelClosed)
    }

    /// Records queued and not yet taken by the writer.
    pub fn in_flight(&self) -> usize {
        self.sender.len()
    }

    fn shutdown(&self) -> Result<(), PipelineError> {
        self.sender
            .send(WriterMessage::Shutdown)
            .map_err(|_| PipelineError::ChannelClosed)
    }
}

/// Create a bounded record channel.
pub fn record_channel(capacity: usize) -> (RecordSender, Receiver<WriterMessage>) {
    let (sender, receiver) = bounded(capacity);
    (RecordSender { sender }, receiver)
}

/// Counters reported by the writer when it stops cleanly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    /// Records taken off the channel.
    pub records_received: u64,
    /// Rows the store reported as newly inserted.
    pub rows_inserted: u64,
    /// Transactions committed, including the final flush.
    pub batches_committed: u64,
}

impl WriterStats {
    /// Records dropped by insert-or-ignore.
    pub fn duplicates_ignored(&self) -> u64 {
        self.records_received.saturating_sub(self.rows_inserted)
    }
}

/// Batched writer that owns the store on its own thread.
pub struct BatchWriter {
    handle: Option<JoinHandle<Result<WriterStats, PipelineError>>>,
    sender: RecordSender,
}

impl BatchWriter {
    /// Spawn the writer thread.
    ///
    /// The store must already be initialized; it is moved to the writer
    /// thread and used exclusively there.
    pub fn spawn<S>(store: S, batch_size: usize, capacity: usize) -> Result<Self, PipelineError>
    where
        S: RecordStore + 'static,
    {
        let (sender, receiver) = record_channel(capacity);
        let batch_size = batch_size.max(1);

        let handle = thread::Builder::new()
            .name("drivemap-writer".into())
            .spawn(move || writer_thread(store, receiver, batch_size))
            .map_err(|e| PipelineError::Spawn {
                what: "writer thread",
                message: e.to_string(),
            })?;

        Ok(Self {
            handle: Some(handle),
            sender,
        })
    }

    /// A producer handle for scanner workers.
    pub fn sender(&self) -> RecordSender {
        self.sender.clone()
    }

    /// Send the end-of-stream marker and wait for the writer to stop.
    ///
    /// Call only after every producer has finished. A storage failure is
    /// returned here, after the writer thread has exited.
    pub fn finish(mut self) -> Result<WriterStats, PipelineError> {
        // If the writer already died the send fails; its own error is what we report.
        let _ = self.sender.shutdown();

        let Some(handle) = self.handle.take() else {
            return Err(PipelineError::WriterPanicked);
        };
        match handle.join() {
            Ok(result) => result,
            Err(_) => Err(PipelineError::WriterPanicked),
        }
    }
}

fn writer_thread<S: RecordStore>(
    mut store: S,
    receiver: Receiver<WriterMessage>,
    batch_size: usize,
) -> Result<WriterStats, PipelineError> {
    let mut batch: Vec<FileRecord> = Vec::with_capacity(batch_size);
    let mut stats = WriterStats::default();

    loop {
        match receiver.recv() {
            Ok(WriterMessage::Record(record)) => {
                stats.records_received += 1;
                batch.push(record);
                if batch.len() >= batch_size {
                    commit(&mut store, &mut batch, &mut stats)?;
                }
            }
            Ok(WriterMessage::Shutdown) => {
                commit(&mut store, &mut batch, &mut stats)?;
                tracing::debug!(
                    records = stats.records_received,
                    inserted = stats.rows_inserted,
                    batches = stats.batches_committed,
                    "writer finished"
                );
                return Ok(stats);
            }
            Err(RecvError) => {
                // Every producer vanished without the marker; keep what we have.
                commit(&mut store, &mut batch, &mut stats)?;
                return Err(PipelineError::ChannelClosed);
            }
        }
    }
}

fn commit<S: RecordStore>(
    store: &mut S,
    batch: &mut Vec<FileRecord>,
    stats: &mut WriterStats,
) -> Result<(), PipelineError> {
    let inserted = store.insert_batch(batch).inspect_err(|error| {
        tracing::error!(batch = batch.len(), %error, "batch commit failed");
    })?;

    stats.rows_inserted += inserted as u64;
    stats.batches_committed += 1;
    tracing::debug!(batch = batch.len(), inserted, "committed batch");
    batch.clear();
    Ok(())
}
