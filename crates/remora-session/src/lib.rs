//! Session engine keeping a local mirror of a torrent daemon in sync.
//!
//! A [`Session`] owns one connection: it runs the connect handshake, polls
//! the daemon on a foreground or background cadence, reconciles each
//! snapshot into keyed collections with minimal diffs, and dispatches
//! commands. Observers subscribe to the typed event stream and read the
//! current model through the handle's query methods.

pub mod dispatch;
pub mod error;
pub mod model;
pub mod reconcile;
pub mod session;

pub use dispatch::{
    AddTorrentOptions, EncryptionMode, Mutation, QueueMove, SessionSettingsUpdate, TorrentLimits,
};
pub use error::CommandError;
pub use model::{
    FileEntry, LimitMode, Peer, Priority, ServerStats, SessionCounters, Torrent, TorrentDetails,
    TorrentStatus, Tracker,
};
pub use reconcile::{Collection, Reconcilable};
pub use session::{Session, SessionOptions};
