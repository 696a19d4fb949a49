//! Typed event bus connecting the session engine to its observers.
//!
//! The engine publishes one event per state transition or reconciled
//! snapshot; subscribers (the UI layer) receive them over a bounded
//! `tokio::broadcast` channel. A subscriber that falls behind loses the
//! oldest events and is expected to re-read the model collections from the
//! session handle rather than replaying history.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::{Receiver, Sender};

/// Default broadcast capacity; enough to absorb a burst of per-family
/// diffs from a single poll cycle without dropping.
const DEFAULT_CAPACITY: usize = 256;

/// Connection lifecycle status of a session.
///
/// Exactly one value is live at a time; transitions happen only inside the
/// session task. The five error statuses are terminal until the caller
/// retries or reconfigures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Disconnected,
    Connecting,
    Connected,
    TimedOut,
    ConnectionError,
    AuthenticationError,
    ParseError,
    ServerTooNew,
    ServerTooOld,
}

impl SessionStatus {
    /// Whether the session is currently exchanging data with the daemon.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Whether the status is one of the terminal error variants.
    #[must_use]
    pub const fn is_error(self) -> bool {
        matches!(
            self,
            Self::TimedOut
                | Self::ConnectionError
                | Self::AuthenticationError
                | Self::ParseError
                | Self::ServerTooNew
                | Self::ServerTooOld
        )
    }
}

/// Bitmask of logical fields that differed between two revisions of a
/// record. Each entity family defines its own field enum whose variants map
/// to bits; the mask travels with update notifications so observers repaint
/// only what changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMask(u32);

impl FieldMask {
    /// The empty mask.
    pub const EMPTY: Self = Self(0);

    /// Construct a mask from a raw bit pattern.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bit pattern of the mask.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Mark the field occupying `bit` as changed.
    pub fn insert(&mut self, bit: u32) {
        self.0 |= 1 << bit;
    }

    /// Whether the field occupying `bit` is marked as changed.
    #[must_use]
    pub const fn contains(self, bit: u32) -> bool {
        self.0 & (1 << bit) != 0
    }

    /// Whether no field is marked.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Update notification for a single record: its identity key plus the mask
/// of fields that differed from the previous revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedRecord<K> {
    pub key: K,
    pub fields: FieldMask,
}

/// Minimal diff between two successive snapshots of one entity family.
///
/// Removals are listed first, then insertions and updates in the order the
/// daemon supplied the records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListDiff<K> {
    pub inserted: Vec<K>,
    pub updated: Vec<ChangedRecord<K>>,
    pub removed: Vec<K>,
}

impl<K> ListDiff<K> {
    /// A diff that changes nothing.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            inserted: Vec::new(),
            updated: Vec::new(),
            removed: Vec::new(),
        }
    }

    /// Whether the diff carries no insertions, updates, or removals.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

impl<K> Default for ListDiff<K> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Events surfaced by the session engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The connection state machine transitioned.
    StatusChanged { status: SessionStatus },
    /// The torrent list was reconciled against a fresh snapshot.
    TorrentsChanged { diff: ListDiff<i64> },
    /// Peers of the detail-polled torrent were reconciled.
    PeersChanged { torrent_id: i64, diff: ListDiff<String> },
    /// Trackers of the detail-polled torrent were reconciled.
    TrackersChanged { torrent_id: i64, diff: ListDiff<String> },
    /// Files of the detail-polled torrent were reconciled.
    FilesChanged { torrent_id: i64, diff: ListDiff<String> },
    /// Server statistics were replaced with a differing payload.
    ServerStatsUpdated,
    /// A torrent appeared that was not present in the previous poll.
    TorrentAdded { torrent_id: i64, name: String },
    /// A previously downloading torrent reached completion.
    TorrentFinished { torrent_id: i64, name: String },
}

impl Event {
    /// Machine-friendly discriminator, useful for logging and filtering.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Event::StatusChanged { .. } => "status_changed",
            Event::TorrentsChanged { .. } => "torrents_changed",
            Event::PeersChanged { .. } => "peers_changed",
            Event::TrackersChanged { .. } => "trackers_changed",
            Event::FilesChanged { .. } => "files_changed",
            Event::ServerStatsUpdated => "server_stats_updated",
            Event::TorrentAdded { .. } => "torrent_added",
            Event::TorrentFinished { .. } => "torrent_finished",
        }
    }
}

/// Shared event bus built on `tokio::broadcast`.
#[derive(Clone)]
pub struct EventBus {
    sender: Sender<Event>,
}

impl EventBus {
    /// Construct a bus with the provided broadcast capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "event bus capacity must be positive");
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Construct a bus with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Publish an event to all current subscribers. Events published while
    /// nobody is subscribed are dropped.
    pub fn publish(&self, event: Event) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to events published after this call.
    #[must_use]
    pub fn subscribe(&self) -> EventStream {
        EventStream {
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream of events for one subscriber.
pub struct EventStream {
    receiver: Receiver<Event>,
}

impl EventStream {
    /// Receive the next event, or `None` once the bus is gone.
    ///
    /// A lagged receiver skips the dropped events and resumes with the
    /// oldest one still buffered.
    pub async fn next(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_mask_tracks_individual_bits() {
        let mut mask = FieldMask::EMPTY;
        assert!(mask.is_empty());
        mask.insert(0);
        mask.insert(5);
        assert!(mask.contains(0));
        assert!(mask.contains(5));
        assert!(!mask.contains(1));
        assert_eq!(mask.bits(), 0b10_0001);
    }

    #[test]
    fn list_diff_empty_detection() {
        let mut diff: ListDiff<i64> = ListDiff::empty();
        assert!(diff.is_empty());
        diff.updated.push(ChangedRecord {
            key: 7,
            fields: FieldMask::from_bits(1),
        });
        assert!(!diff.is_empty());
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let event = Event::StatusChanged {
            status: SessionStatus::Connected,
        };
        let json = serde_json::to_value(&event).expect("event should serialize");
        assert_eq!(json["type"], "status_changed");
        assert_eq!(json["status"], "connected");
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = EventBus::with_capacity(8);
        let mut stream = bus.subscribe();

        bus.publish(Event::ServerStatsUpdated);
        bus.publish(Event::TorrentAdded {
            torrent_id: 3,
            name: "iso".into(),
        });

        assert_eq!(stream.next().await, Some(Event::ServerStatsUpdated));
        match stream.next().await {
            Some(Event::TorrentAdded { torrent_id, .. }) => assert_eq!(torrent_id, 3),
            other => panic!("expected torrent added event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn lagged_subscriber_skips_to_oldest_buffered() {
        let bus = EventBus::with_capacity(1);
        let mut stream = bus.subscribe();

        bus.publish(Event::ServerStatsUpdated);
        bus.publish(Event::StatusChanged {
            status: SessionStatus::Disconnected,
        });

        // Capacity 1 dropped the first event; the stream resumes with the
        // most recent one instead of erroring out.
        match stream.next().await {
            Some(Event::StatusChanged { status }) => {
                assert_eq!(status, SessionStatus::Disconnected);
            }
            other => panic!("expected status event, got {other:?}"),
        }
    }
}
