//! Command intents and their wire encodings.
//!
//! Each [`Mutation`] maps to exactly one RPC method plus an arguments
//! object; the session task serializes them through its command channel so
//! mutations and polls never interleave. Builders here are pure so the
//! encodings can be tested without a daemon.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::model::{LimitMode, Priority};

/// Options applied when adding a torrent from a file or link.
#[derive(Debug, Clone, Default)]
pub struct AddTorrentOptions {
    /// Directory the daemon should download into; daemon default when unset.
    pub download_dir: Option<String>,
    /// Add the torrent stopped instead of starting it immediately.
    pub paused: bool,
    /// Bandwidth priority for the new torrent.
    pub priority: Option<Priority>,
}

/// Direction for a queue-position move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueMove {
    Top,
    Up,
    Down,
    Bottom,
}

impl QueueMove {
    /// RPC method implementing this move.
    #[must_use]
    pub const fn method(self) -> &'static str {
        match self {
            Self::Top => "queue-move-top",
            Self::Up => "queue-move-up",
            Self::Down => "queue-move-down",
            Self::Bottom => "queue-move-bottom",
        }
    }
}

/// Per-torrent limit changes. Unset fields are left untouched on the
/// daemon; field names follow the `torrent-set` argument keys.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TorrentLimits {
    #[serde(rename = "downloadLimited", skip_serializing_if = "Option::is_none")]
    pub download_limited: Option<bool>,
    #[serde(rename = "downloadLimit", skip_serializing_if = "Option::is_none")]
    pub download_limit: Option<i64>,
    #[serde(rename = "uploadLimited", skip_serializing_if = "Option::is_none")]
    pub upload_limited: Option<bool>,
    #[serde(rename = "uploadLimit", skip_serializing_if = "Option::is_none")]
    pub upload_limit: Option<i64>,
    #[serde(rename = "honorsSessionLimits", skip_serializing_if = "Option::is_none")]
    pub honors_session_limits: Option<bool>,
    #[serde(rename = "seedRatioMode", skip_serializing_if = "Option::is_none")]
    pub seed_ratio_mode: Option<LimitMode>,
    #[serde(rename = "seedRatioLimit", skip_serializing_if = "Option::is_none")]
    pub seed_ratio_limit: Option<f64>,
    #[serde(rename = "seedIdleMode", skip_serializing_if = "Option::is_none")]
    pub seed_idle_mode: Option<LimitMode>,
    #[serde(rename = "seedIdleLimit", skip_serializing_if = "Option::is_none")]
    pub seed_idle_limit: Option<i64>,
    #[serde(rename = "peer-limit", skip_serializing_if = "Option::is_none")]
    pub peer_limit: Option<i64>,
}

/// Peer connection encryption policy, serialized as the daemon's own
/// mode strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EncryptionMode {
    #[serde(rename = "tolerated")]
    Allowed,
    #[serde(rename = "preferred")]
    Preferred,
    #[serde(rename = "required")]
    Required,
}

/// Session-wide setting changes sent via `session-set`. Unset fields are
/// left untouched on the daemon; field names follow the `session-set`
/// argument keys.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionSettingsUpdate {
    #[serde(rename = "download-dir", skip_serializing_if = "Option::is_none")]
    pub download_dir: Option<String>,
    #[serde(rename = "start-added-torrents", skip_serializing_if = "Option::is_none")]
    pub start_added_torrents: Option<bool>,
    #[serde(rename = "trash-original-torrent-files", skip_serializing_if = "Option::is_none")]
    pub trash_original_torrent_files: Option<bool>,
    #[serde(rename = "rename-partial-files", skip_serializing_if = "Option::is_none")]
    pub rename_partial_files: Option<bool>,
    #[serde(rename = "incomplete-dir-enabled", skip_serializing_if = "Option::is_none")]
    pub incomplete_dir_enabled: Option<bool>,
    #[serde(rename = "incomplete-dir", skip_serializing_if = "Option::is_none")]
    pub incomplete_dir: Option<String>,

    #[serde(rename = "speed-limit-down-enabled", skip_serializing_if = "Option::is_none")]
    pub download_limit_enabled: Option<bool>,
    #[serde(rename = "speed-limit-down", skip_serializing_if = "Option::is_none")]
    pub download_limit: Option<i64>,
    #[serde(rename = "speed-limit-up-enabled", skip_serializing_if = "Option::is_none")]
    pub upload_limit_enabled: Option<bool>,
    #[serde(rename = "speed-limit-up", skip_serializing_if = "Option::is_none")]
    pub upload_limit: Option<i64>,

    /// Alternative ("turtle mode") limits and their weekly schedule. The
    /// days field is the daemon's day-of-week bitmask; begin/end are
    /// minutes from midnight.
    #[serde(rename = "alt-speed-enabled", skip_serializing_if = "Option::is_none")]
    pub alternative_limits_enabled: Option<bool>,
    #[serde(rename = "alt-speed-down", skip_serializing_if = "Option::is_none")]
    pub alternative_download_limit: Option<i64>,
    #[serde(rename = "alt-speed-up", skip_serializing_if = "Option::is_none")]
    pub alternative_upload_limit: Option<i64>,
    #[serde(rename = "alt-speed-time-enabled", skip_serializing_if = "Option::is_none")]
    pub alternative_limits_scheduled: Option<bool>,
    #[serde(rename = "alt-speed-time-begin", skip_serializing_if = "Option::is_none")]
    pub alternative_limits_begin_time: Option<i64>,
    #[serde(rename = "alt-speed-time-end", skip_serializing_if = "Option::is_none")]
    pub alternative_limits_end_time: Option<i64>,
    #[serde(rename = "alt-speed-time-day", skip_serializing_if = "Option::is_none")]
    pub alternative_limits_days: Option<i64>,

    #[serde(rename = "seedRatioLimited", skip_serializing_if = "Option::is_none")]
    pub seed_ratio_limited: Option<bool>,
    #[serde(rename = "seedRatioLimit", skip_serializing_if = "Option::is_none")]
    pub seed_ratio_limit: Option<f64>,
    #[serde(rename = "idle-seeding-limit-enabled", skip_serializing_if = "Option::is_none")]
    pub idle_seeding_limit_enabled: Option<bool>,
    #[serde(rename = "idle-seeding-limit", skip_serializing_if = "Option::is_none")]
    pub idle_seeding_limit: Option<i64>,

    #[serde(rename = "download-queue-enabled", skip_serializing_if = "Option::is_none")]
    pub download_queue_enabled: Option<bool>,
    #[serde(rename = "download-queue-size", skip_serializing_if = "Option::is_none")]
    pub download_queue_size: Option<i64>,
    #[serde(rename = "seed-queue-enabled", skip_serializing_if = "Option::is_none")]
    pub seed_queue_enabled: Option<bool>,
    #[serde(rename = "seed-queue-size", skip_serializing_if = "Option::is_none")]
    pub seed_queue_size: Option<i64>,
    #[serde(rename = "queue-stalled-enabled", skip_serializing_if = "Option::is_none")]
    pub queue_stalled_enabled: Option<bool>,
    #[serde(rename = "queue-stalled-minutes", skip_serializing_if = "Option::is_none")]
    pub queue_stalled_minutes: Option<i64>,

    #[serde(rename = "peer-port", skip_serializing_if = "Option::is_none")]
    pub peer_port: Option<i64>,
    #[serde(rename = "peer-port-random-on-start", skip_serializing_if = "Option::is_none")]
    pub random_port: Option<bool>,
    #[serde(rename = "port-forwarding-enabled", skip_serializing_if = "Option::is_none")]
    pub port_forwarding: Option<bool>,
    #[serde(rename = "encryption", skip_serializing_if = "Option::is_none")]
    pub encryption: Option<EncryptionMode>,
    #[serde(rename = "utp-enabled", skip_serializing_if = "Option::is_none")]
    pub utp_enabled: Option<bool>,
    #[serde(rename = "pex-enabled", skip_serializing_if = "Option::is_none")]
    pub pex_enabled: Option<bool>,
    #[serde(rename = "dht-enabled", skip_serializing_if = "Option::is_none")]
    pub dht_enabled: Option<bool>,
    #[serde(rename = "lpd-enabled", skip_serializing_if = "Option::is_none")]
    pub lpd_enabled: Option<bool>,
    #[serde(rename = "peer-limit-global", skip_serializing_if = "Option::is_none")]
    pub peer_limit_global: Option<i64>,
    #[serde(rename = "peer-limit-per-torrent", skip_serializing_if = "Option::is_none")]
    pub peer_limit_per_torrent: Option<i64>,
}

/// One command to run against the daemon.
#[derive(Debug, Clone)]
pub enum Mutation {
    /// Upload a torrent file (raw metainfo bytes) to the daemon.
    AddFile {
        metainfo: Vec<u8>,
        options: AddTorrentOptions,
    },
    /// Hand the daemon a magnet link or torrent URL to fetch itself.
    AddLink {
        url: String,
        options: AddTorrentOptions,
    },
    Start { ids: Vec<i64> },
    StartNow { ids: Vec<i64> },
    Stop { ids: Vec<i64> },
    Verify { ids: Vec<i64> },
    Reannounce { ids: Vec<i64> },
    Remove { ids: Vec<i64>, delete_data: bool },
    SetLocation {
        ids: Vec<i64>,
        location: String,
        move_data: bool,
    },
    RenameFile {
        id: i64,
        path: String,
        new_name: String,
    },
    SetFilesWanted {
        id: i64,
        indices: Vec<i64>,
        wanted: bool,
    },
    SetFilePriority {
        id: i64,
        indices: Vec<i64>,
        priority: Priority,
    },
    QueueMove { ids: Vec<i64>, direction: QueueMove },
    SetTorrentLimits { ids: Vec<i64>, limits: TorrentLimits },
    SetSessionSettings { update: SessionSettingsUpdate },
}

impl Mutation {
    /// Whether this mutation adds a torrent, so its reply may carry a
    /// `torrent-added` or `torrent-duplicate` record.
    #[must_use]
    pub const fn is_add(&self) -> bool {
        matches!(self, Self::AddFile { .. } | Self::AddLink { .. })
    }

    /// The RPC method and arguments object implementing this mutation.
    #[must_use]
    pub fn encode(&self) -> (&'static str, Value) {
        match self {
            Self::AddFile { metainfo, options } => (
                "torrent-add",
                add_arguments(Some(BASE64.encode(metainfo)), None, options),
            ),
            Self::AddLink { url, options } => (
                "torrent-add",
                add_arguments(None, Some(url.clone()), options),
            ),
            Self::Start { ids } => ("torrent-start", ids_arguments(ids)),
            Self::StartNow { ids } => ("torrent-start-now", ids_arguments(ids)),
            Self::Stop { ids } => ("torrent-stop", ids_arguments(ids)),
            Self::Verify { ids } => ("torrent-verify", ids_arguments(ids)),
            Self::Reannounce { ids } => ("torrent-reannounce", ids_arguments(ids)),
            Self::Remove { ids, delete_data } => (
                "torrent-remove",
                json!({ "ids": ids, "delete-local-data": delete_data }),
            ),
            Self::SetLocation {
                ids,
                location,
                move_data,
            } => (
                "torrent-set-location",
                json!({ "ids": ids, "location": location, "move": move_data }),
            ),
            Self::RenameFile { id, path, new_name } => (
                "torrent-rename-path",
                json!({ "ids": [id], "path": path, "name": new_name }),
            ),
            Self::SetFilesWanted { id, indices, wanted } => {
                let field = if *wanted {
                    "files-wanted"
                } else {
                    "files-unwanted"
                };
                ("torrent-set", json!({ "ids": [id], field: indices }))
            }
            Self::SetFilePriority {
                id,
                indices,
                priority,
            } => {
                let field = match priority {
                    Priority::Low => "priority-low",
                    Priority::Normal => "priority-normal",
                    Priority::High => "priority-high",
                };
                ("torrent-set", json!({ "ids": [id], field: indices }))
            }
            Self::QueueMove { ids, direction } => (direction.method(), ids_arguments(ids)),
            Self::SetTorrentLimits { ids, limits } => {
                let mut arguments = to_object(limits);
                arguments.insert("ids".into(), json!(ids));
                ("torrent-set", Value::Object(arguments))
            }
            Self::SetSessionSettings { update } => ("session-set", Value::Object(to_object(update))),
        }
    }
}

fn ids_arguments(ids: &[i64]) -> Value {
    json!({ "ids": ids })
}

fn add_arguments(metainfo: Option<String>, url: Option<String>, options: &AddTorrentOptions) -> Value {
    let mut arguments = Map::new();
    if let Some(encoded) = metainfo {
        arguments.insert("metainfo".into(), Value::String(encoded));
    }
    if let Some(link) = url {
        arguments.insert("filename".into(), Value::String(link));
    }
    if let Some(dir) = &options.download_dir {
        arguments.insert("download-dir".into(), Value::String(dir.clone()));
    }
    arguments.insert("paused".into(), Value::Bool(options.paused));
    if let Some(priority) = options.priority {
        arguments.insert("bandwidthPriority".into(), json!(i64::from(priority)));
    }
    Value::Object(arguments)
}

fn to_object<T: Serialize>(value: &T) -> Map<String, Value> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}
