use std::time::{SystemTime, UNIX_EPOCH};

use crate::metadata::Metadata;
use crate::stream::StreamId;

/// Immutable-by-convention record flowing through the engine.
///
/// Created by a consumer (or the diagnostic bus), mutated only by
/// formatters on the fanout path, cloned per target stream via
/// [`Message::clone_and_pin`], and released when all per-stream clones
/// have been accepted or dropped.
#[derive(Debug, Clone)]
pub struct Message {
    payload: Vec<u8>,
    metadata: Metadata,
    streams: Vec<StreamId>,
    pinned: StreamId,
    created_at_ms: i64,
    internal: bool,
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

impl Message {
    /// Construct a new message addressed to `streams`, unpinned.
    pub fn new(payload: Vec<u8>, metadata: Metadata, streams: Vec<StreamId>) -> Self {
        Self {
            payload,
            metadata,
            streams,
            pinned: StreamId::INVALID,
            created_at_ms: now_ms(),
            internal: false,
        }
    }

    /// Construct a message produced by the diagnostic bus. Internal
    /// messages are excluded from wildcard fanout.
    pub fn new_internal(payload: Vec<u8>, metadata: Metadata, streams: Vec<StreamId>) -> Self {
        let mut msg = Self::new(payload, metadata, streams);
        msg.internal = true;
        msg
    }

    /// Deep-copy this message, binding the copy to `stream_id`.
    ///
    /// Every delivered message has exactly one pinned stream id at the
    /// moment a producer accepts it; mutating a clone's payload or
    /// metadata never affects its siblings or the original, since both
    /// are owned, non-aliased copies (`Vec<u8>`/`Metadata` clone deeply).
    pub fn clone_and_pin(&self, stream_id: StreamId) -> Self {
        let mut clone = self.clone();
        clone.pinned = stream_id;
        clone
    }

    pub fn is_internal(&self) -> bool {
        self.internal
    }

    /// The stream identifiers this message is addressed to (distinct from
    /// the pinned one, which is only meaningful on a clone produced by
    /// [`Message::clone_and_pin`]).
    pub fn streams(&self) -> &[StreamId] {
        &self.streams
    }

    pub fn pinned(&self) -> StreamId {
        self.pinned
    }

    pub fn created_at_ms(&self) -> i64 {
        self.created_at_ms
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn set_payload(&mut self, payload: Vec<u8>) {
        self.payload = payload;
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    /// Consume the message. Rust's ownership model already guarantees
    /// "no touching after release" statically (the value is moved), so
    /// this exists for API symmetry with the contract rather than to
    /// perform any bookkeeping of its own.
    pub fn release(self) {
        drop(self);
    }
}
