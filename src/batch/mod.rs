//! Micro-batching of pending requests.
//!
//! One long-lived collector task owns the buffer. Producers hand requests
//! over a bounded channel; the collector appends them and flushes the
//! buffer to a [`BatchHandler`](crate::traits::BatchHandler) as soon as
//! either
//!
//! - the buffer reaches `batch_size`, or
//! - the flush timer (period `batch_delay`) fires,
//!
//! whichever comes first. This bounds both batch size and how long any
//! request sits in the buffer.
//!
//! ```text
//!  enqueue() ──► [ inbox (bounded) ] ──► collector loop ──► handler
//!      │           send timeout = batch_delay     │ size │ timer
//!      └─ timeout: caller executes the request itself
//! ```

mod collector;

pub use collector::{
    BatchCollector, CollectorConfig, DEFAULT_BATCH_DELAY, DEFAULT_BATCH_SIZE, DEFAULT_QUEUE_CAPACITY,
    FlushTrigger,
};
