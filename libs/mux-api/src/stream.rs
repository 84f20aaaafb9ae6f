use std::collections::HashMap;
use std::hash::Hasher;

use fnv::FnvHasher;

/// A stream identifier — a stable hash of the stream's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(pub u64);

impl StreamId {
    /// Sentinel for an unpinned / untargeted message.
    pub const INVALID: StreamId = StreamId(0);
    /// Producers subscribed here receive every non-internal message, in
    /// addition to their explicit subscriptions.
    pub const WILDCARD: StreamId = StreamId(1);
    /// Producers subscribed here receive diagnostic-bus messages.
    pub const LOG: StreamId = StreamId(2);

    fn is_reserved(self) -> bool {
        self == Self::INVALID || self == Self::WILDCARD || self == Self::LOG
    }

    /// Derive the id a stream name would get from [`StreamRegistry::intern`],
    /// without needing a registry instance. Consumers tag the messages they
    /// emit with a configured stream name and have no access to the
    /// engine's shared registry, so they call this directly; the hash is
    /// the same pure function either way, so the ids agree.
    pub fn from_name(name: &str) -> StreamId {
        match name {
            WILDCARD_NAME => StreamId::WILDCARD,
            LOG_NAME => StreamId::LOG,
            _ => StreamId(hash_name(name)),
        }
    }
}

/// `"*"` is the configuration-level spelling of the wildcard stream.
pub const WILDCARD_NAME: &str = "*";
/// Reserved name bound to `StreamId::LOG`.
pub const LOG_NAME: &str = "_LOG_";

fn hash_name(name: &str) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write(name.as_bytes());
    let hashed = hasher.finish();
    // Never collide with a reserved id: reserved ids are tiny and a real
    // FNV hash landing on 0/1/2 is astronomically unlikely, but avoid the
    // theoretical ambiguity outright.
    if hashed <= StreamId::LOG.0 { hashed | (1 << 63) } else { hashed }
}

/// Bidirectional mapping between human stream names and their
/// [`StreamId`]s, with `*` and the reserved log stream name pre-registered.
#[derive(Debug, Default)]
pub struct StreamRegistry {
    name_to_id: HashMap<String, StreamId>,
    id_to_name: HashMap<StreamId, String>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        let mut reg = Self::default();
        reg.name_to_id.insert(WILDCARD_NAME.to_string(), StreamId::WILDCARD);
        reg.id_to_name.insert(StreamId::WILDCARD, WILDCARD_NAME.to_string());
        reg.name_to_id.insert(LOG_NAME.to_string(), StreamId::LOG);
        reg.id_to_name.insert(StreamId::LOG, LOG_NAME.to_string());
        reg
    }

    /// Intern `name`, returning its (possibly newly assigned) [`StreamId`].
    /// Idempotent: interning the same name twice returns the same id.
    pub fn intern(&mut self, name: &str) -> StreamId {
        if let Some(id) = self.name_to_id.get(name) {
            return *id;
        }
        let id = StreamId(hash_name(name));
        self.name_to_id.insert(name.to_string(), id);
        self.id_to_name.insert(id, name.to_string());
        id
    }

    pub fn name_of(&self, id: StreamId) -> Option<&str> {
        self.id_to_name.get(&id).map(String::as_str)
    }

    pub fn id_of(&self, name: &str) -> Option<StreamId> {
        self.name_to_id.get(name).copied()
    }
}
