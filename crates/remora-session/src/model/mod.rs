//! Entity records mirrored from the daemon.
//!
//! Records deserialize straight from `torrent-get` / `session-stats`
//! arguments; derived numbers (ETA, ratio, speeds) are daemon-computed and
//! pass through unmodified. Each family pairs its record with a field enum
//! so update notifications can carry a changed-field mask instead of
//! relying on runtime introspection.

use chrono::{DateTime, Utc};
use remora_events::FieldMask;
use serde::{Deserialize, Serialize};

use crate::reconcile::Reconcilable;

/// Main-list fields requested from the daemon on every poll.
pub const TORRENT_GET_FIELDS: &[&str] = &[
    "id",
    "hashString",
    "name",
    "status",
    "error",
    "errorString",
    "totalSize",
    "sizeWhenDone",
    "leftUntilDone",
    "downloadedEver",
    "uploadedEver",
    "percentDone",
    "uploadRatio",
    "rateDownload",
    "rateUpload",
    "eta",
    "queuePosition",
    "bandwidthPriority",
    "seedRatioMode",
    "seedRatioLimit",
    "seedIdleMode",
    "seedIdleLimit",
    "downloadDir",
    "addedDate",
    "doneDate",
];

/// Fields requested for the single detail-polled torrent.
pub const TORRENT_DETAIL_FIELDS: &[&str] = &["id", "peers", "trackerStats", "files", "fileStats"];

/// Daemon-side torrent activity state (Transmission status codes 0–6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum TorrentStatus {
    Stopped,
    QueuedToCheck,
    Checking,
    QueuedToDownload,
    Downloading,
    QueuedToSeed,
    Seeding,
}

impl TryFrom<i64> for TorrentStatus {
    type Error = String;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Stopped),
            1 => Ok(Self::QueuedToCheck),
            2 => Ok(Self::Checking),
            3 => Ok(Self::QueuedToDownload),
            4 => Ok(Self::Downloading),
            5 => Ok(Self::QueuedToSeed),
            6 => Ok(Self::Seeding),
            other => Err(format!("unknown torrent status code {other}")),
        }
    }
}

impl From<TorrentStatus> for i64 {
    fn from(status: TorrentStatus) -> Self {
        match status {
            TorrentStatus::Stopped => 0,
            TorrentStatus::QueuedToCheck => 1,
            TorrentStatus::Checking => 2,
            TorrentStatus::QueuedToDownload => 3,
            TorrentStatus::Downloading => 4,
            TorrentStatus::QueuedToSeed => 5,
            TorrentStatus::Seeding => 6,
        }
    }
}

/// Bandwidth priority (-1, 0, 1 on the wire).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl TryFrom<i64> for Priority {
    type Error = String;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            -1 => Ok(Self::Low),
            0 => Ok(Self::Normal),
            1 => Ok(Self::High),
            other => Err(format!("unknown priority code {other}")),
        }
    }
}

impl From<Priority> for i64 {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::Low => -1,
            Priority::Normal => 0,
            Priority::High => 1,
        }
    }
}

/// How a seed ratio/idle limit applies (0 = session default, 1 = per
/// torrent, 2 = unlimited).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum LimitMode {
    #[default]
    Global,
    Single,
    Unlimited,
}

impl TryFrom<i64> for LimitMode {
    type Error = String;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Global),
            1 => Ok(Self::Single),
            2 => Ok(Self::Unlimited),
            other => Err(format!("unknown limit mode code {other}")),
        }
    }
}

impl From<LimitMode> for i64 {
    fn from(mode: LimitMode) -> Self {
        match mode {
            LimitMode::Global => 0,
            LimitMode::Single => 1,
            LimitMode::Unlimited => 2,
        }
    }
}

/// Logical fields of a [`Torrent`], used in changed-field masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum TorrentField {
    Name,
    Status,
    Error,
    ErrorString,
    TotalSize,
    SizeWhenDone,
    LeftUntilDone,
    Downloaded,
    Uploaded,
    PercentDone,
    Ratio,
    DownloadRate,
    UploadRate,
    Eta,
    QueuePosition,
    Priority,
    SeedRatioMode,
    SeedRatioLimit,
    SeedIdleMode,
    SeedIdleLimit,
    DownloadDir,
    AddedDate,
    DoneDate,
}

impl TorrentField {
    /// Bit position of this field in a [`FieldMask`].
    #[must_use]
    pub const fn bit(self) -> u32 {
        self as u32
    }

    /// Mask with only this field set.
    #[must_use]
    pub const fn mask(self) -> FieldMask {
        FieldMask::from_bits(1 << self as u32)
    }
}

/// One torrent as reported by the daemon's main list.
///
/// Identity (`id`, `hash`) is stable for the torrent's lifetime on the
/// daemon; every other field is replaced wholesale on each poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Torrent {
    pub id: i64,
    #[serde(rename = "hashString")]
    pub hash: String,
    pub name: String,
    pub status: TorrentStatus,
    pub error: i64,
    #[serde(rename = "errorString")]
    pub error_string: String,
    #[serde(rename = "totalSize")]
    pub total_size: i64,
    #[serde(rename = "sizeWhenDone")]
    pub size_when_done: i64,
    #[serde(rename = "leftUntilDone")]
    pub left_until_done: i64,
    #[serde(rename = "downloadedEver")]
    pub downloaded: i64,
    #[serde(rename = "uploadedEver")]
    pub uploaded: i64,
    #[serde(rename = "percentDone")]
    pub percent_done: f64,
    #[serde(rename = "uploadRatio")]
    pub ratio: f64,
    #[serde(rename = "rateDownload")]
    pub download_rate: i64,
    #[serde(rename = "rateUpload")]
    pub upload_rate: i64,
    pub eta: i64,
    #[serde(rename = "queuePosition")]
    pub queue_position: i64,
    #[serde(rename = "bandwidthPriority")]
    pub priority: Priority,
    #[serde(rename = "seedRatioMode")]
    pub seed_ratio_mode: LimitMode,
    #[serde(rename = "seedRatioLimit")]
    pub seed_ratio_limit: f64,
    #[serde(rename = "seedIdleMode")]
    pub seed_idle_mode: LimitMode,
    #[serde(rename = "seedIdleLimit")]
    pub seed_idle_limit: i64,
    #[serde(rename = "downloadDir")]
    pub download_dir: String,
    #[serde(rename = "addedDate")]
    pub added_date: i64,
    #[serde(rename = "doneDate")]
    pub done_date: i64,
}

impl Torrent {
    /// Whether every wanted byte has been downloaded.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.left_until_done == 0 && self.size_when_done > 0
    }

    /// When the torrent was added, if the daemon reported a date.
    #[must_use]
    pub fn added_at(&self) -> Option<DateTime<Utc>> {
        timestamp(self.added_date)
    }

    /// When the torrent finished downloading, if it has.
    #[must_use]
    pub fn done_at(&self) -> Option<DateTime<Utc>> {
        timestamp(self.done_date)
    }

    /// Minimal record synthesized from a `torrent-added` acknowledgement,
    /// standing in until the next poll confirms the real state.
    #[must_use]
    pub fn provisional(id: i64, hash: String, name: String) -> Self {
        Self {
            id,
            hash,
            name,
            status: TorrentStatus::QueuedToDownload,
            error: 0,
            error_string: String::new(),
            total_size: 0,
            size_when_done: 0,
            left_until_done: 0,
            downloaded: 0,
            uploaded: 0,
            percent_done: 0.0,
            ratio: 0.0,
            download_rate: 0,
            upload_rate: 0,
            eta: -1,
            queue_position: 0,
            priority: Priority::Normal,
            seed_ratio_mode: LimitMode::Global,
            seed_ratio_limit: 0.0,
            seed_idle_mode: LimitMode::Global,
            seed_idle_limit: 0,
            download_dir: String::new(),
            added_date: 0,
            done_date: 0,
        }
    }
}

fn timestamp(seconds: i64) -> Option<DateTime<Utc>> {
    if seconds <= 0 {
        None
    } else {
        DateTime::from_timestamp(seconds, 0)
    }
}

impl Reconcilable for Torrent {
    type Key = i64;

    fn key(&self) -> Self::Key {
        self.id
    }

    fn changed_fields(&self, previous: &Self) -> FieldMask {
        let mut mask = FieldMask::EMPTY;
        let mut record = |changed: bool, field: TorrentField| {
            if changed {
                mask.insert(field.bit());
            }
        };
        record(self.name != previous.name, TorrentField::Name);
        record(self.status != previous.status, TorrentField::Status);
        record(self.error != previous.error, TorrentField::Error);
        record(
            self.error_string != previous.error_string,
            TorrentField::ErrorString,
        );
        record(self.total_size != previous.total_size, TorrentField::TotalSize);
        record(
            self.size_when_done != previous.size_when_done,
            TorrentField::SizeWhenDone,
        );
        record(
            self.left_until_done != previous.left_until_done,
            TorrentField::LeftUntilDone,
        );
        record(self.downloaded != previous.downloaded, TorrentField::Downloaded);
        record(self.uploaded != previous.uploaded, TorrentField::Uploaded);
        record(
            self.percent_done != previous.percent_done,
            TorrentField::PercentDone,
        );
        record(self.ratio != previous.ratio, TorrentField::Ratio);
        record(
            self.download_rate != previous.download_rate,
            TorrentField::DownloadRate,
        );
        record(
            self.upload_rate != previous.upload_rate,
            TorrentField::UploadRate,
        );
        record(self.eta != previous.eta, TorrentField::Eta);
        record(
            self.queue_position != previous.queue_position,
            TorrentField::QueuePosition,
        );
        record(self.priority != previous.priority, TorrentField::Priority);
        record(
            self.seed_ratio_mode != previous.seed_ratio_mode,
            TorrentField::SeedRatioMode,
        );
        record(
            self.seed_ratio_limit != previous.seed_ratio_limit,
            TorrentField::SeedRatioLimit,
        );
        record(
            self.seed_idle_mode != previous.seed_idle_mode,
            TorrentField::SeedIdleMode,
        );
        record(
            self.seed_idle_limit != previous.seed_idle_limit,
            TorrentField::SeedIdleLimit,
        );
        record(
            self.download_dir != previous.download_dir,
            TorrentField::DownloadDir,
        );
        record(self.added_date != previous.added_date, TorrentField::AddedDate);
        record(self.done_date != previous.done_date, TorrentField::DoneDate);
        mask
    }
}

/// Logical fields of a [`Peer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum PeerField {
    ClientName,
    Flags,
    Progress,
    RateToClient,
    RateToPeer,
}

impl PeerField {
    #[must_use]
    pub const fn bit(self) -> u32 {
        self as u32
    }
}

/// One connected peer of the detail-polled torrent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Peer {
    pub address: String,
    #[serde(rename = "clientName")]
    pub client_name: String,
    #[serde(rename = "flagStr")]
    pub flags: String,
    pub progress: f64,
    #[serde(rename = "rateToClient")]
    pub rate_to_client: i64,
    #[serde(rename = "rateToPeer")]
    pub rate_to_peer: i64,
}

impl Reconcilable for Peer {
    type Key = String;

    fn key(&self) -> Self::Key {
        self.address.clone()
    }

    fn changed_fields(&self, previous: &Self) -> FieldMask {
        let mut mask = FieldMask::EMPTY;
        if self.client_name != previous.client_name {
            mask.insert(PeerField::ClientName.bit());
        }
        if self.flags != previous.flags {
            mask.insert(PeerField::Flags.bit());
        }
        if self.progress != previous.progress {
            mask.insert(PeerField::Progress.bit());
        }
        if self.rate_to_client != previous.rate_to_client {
            mask.insert(PeerField::RateToClient.bit());
        }
        if self.rate_to_peer != previous.rate_to_peer {
            mask.insert(PeerField::RateToPeer.bit());
        }
        mask
    }
}

/// Logical fields of a [`Tracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum TrackerField {
    Tier,
    SeederCount,
    LeecherCount,
    LastAnnounceTime,
    LastAnnounceSucceeded,
    LastAnnounceResult,
}

impl TrackerField {
    #[must_use]
    pub const fn bit(self) -> u32 {
        self as u32
    }
}

/// Announce statistics for one tracker of the detail-polled torrent.
/// Keyed by announce URL, which stays stable across daemon restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tracker {
    pub announce: String,
    pub tier: i64,
    #[serde(rename = "seederCount")]
    pub seeder_count: i64,
    #[serde(rename = "leecherCount")]
    pub leecher_count: i64,
    #[serde(rename = "lastAnnounceTime")]
    pub last_announce_time: i64,
    #[serde(rename = "lastAnnounceSucceeded")]
    pub last_announce_succeeded: bool,
    #[serde(rename = "lastAnnounceResult")]
    pub last_announce_result: String,
}

impl Reconcilable for Tracker {
    type Key = String;

    fn key(&self) -> Self::Key {
        self.announce.clone()
    }

    fn changed_fields(&self, previous: &Self) -> FieldMask {
        let mut mask = FieldMask::EMPTY;
        if self.tier != previous.tier {
            mask.insert(TrackerField::Tier.bit());
        }
        if self.seeder_count != previous.seeder_count {
            mask.insert(TrackerField::SeederCount.bit());
        }
        if self.leecher_count != previous.leecher_count {
            mask.insert(TrackerField::LeecherCount.bit());
        }
        if self.last_announce_time != previous.last_announce_time {
            mask.insert(TrackerField::LastAnnounceTime.bit());
        }
        if self.last_announce_succeeded != previous.last_announce_succeeded {
            mask.insert(TrackerField::LastAnnounceSucceeded.bit());
        }
        if self.last_announce_result != previous.last_announce_result {
            mask.insert(TrackerField::LastAnnounceResult.bit());
        }
        mask
    }
}

/// Logical fields of a [`FileEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum FileField {
    Length,
    Completed,
    Wanted,
    Priority,
}

impl FileField {
    #[must_use]
    pub const fn bit(self) -> u32 {
        self as u32
    }
}

/// One payload file of the detail-polled torrent, assembled from the
/// daemon's parallel `files` / `fileStats` arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Path within the torrent; the identity key.
    pub path: String,
    /// Index within the daemon's file array, used when issuing
    /// per-file mutations.
    pub index: i64,
    pub length: i64,
    pub completed: i64,
    pub wanted: bool,
    pub priority: Priority,
}

impl Reconcilable for FileEntry {
    type Key = String;

    fn key(&self) -> Self::Key {
        self.path.clone()
    }

    fn changed_fields(&self, previous: &Self) -> FieldMask {
        let mut mask = FieldMask::EMPTY;
        if self.length != previous.length {
            mask.insert(FileField::Length.bit());
        }
        if self.completed != previous.completed {
            mask.insert(FileField::Completed.bit());
        }
        if self.wanted != previous.wanted {
            mask.insert(FileField::Wanted.bit());
        }
        if self.priority != previous.priority {
            mask.insert(FileField::Priority.bit());
        }
        mask
    }
}

#[derive(Debug, Clone, Deserialize)]
struct FilePart {
    name: String,
    length: i64,
    #[serde(rename = "bytesCompleted")]
    bytes_completed: i64,
}

#[derive(Debug, Clone, Deserialize)]
struct FileStatPart {
    wanted: bool,
    priority: Priority,
}

/// Detail snapshot for the currently selected torrent.
#[derive(Debug, Clone, Deserialize)]
pub struct TorrentDetails {
    pub id: i64,
    #[serde(default)]
    pub peers: Vec<Peer>,
    #[serde(default, rename = "trackerStats")]
    pub trackers: Vec<Tracker>,
    #[serde(default)]
    files: Vec<FilePart>,
    #[serde(default, rename = "fileStats")]
    file_stats: Vec<FileStatPart>,
}

impl TorrentDetails {
    /// Zip the daemon's parallel file arrays into [`FileEntry`] records.
    /// Returns `None` when the arrays disagree in length, which callers
    /// treat as a malformed payload.
    #[must_use]
    pub fn file_entries(&self) -> Option<Vec<FileEntry>> {
        if self.files.len() != self.file_stats.len() {
            return None;
        }
        Some(
            self.files
                .iter()
                .zip(&self.file_stats)
                .enumerate()
                .map(|(index, (file, stat))| FileEntry {
                    path: file.name.clone(),
                    index: index as i64,
                    length: file.length,
                    completed: file.bytes_completed,
                    wanted: stat.wanted,
                    priority: stat.priority,
                })
                .collect(),
        )
    }
}

/// Session-scoped transfer counters, replaced wholesale per poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerStats {
    #[serde(rename = "downloadSpeed")]
    pub download_speed: i64,
    #[serde(rename = "uploadSpeed")]
    pub upload_speed: i64,
    #[serde(rename = "activeTorrentCount")]
    pub active_torrent_count: i64,
    #[serde(rename = "pausedTorrentCount")]
    pub paused_torrent_count: i64,
    #[serde(rename = "torrentCount")]
    pub torrent_count: i64,
    #[serde(rename = "current-stats")]
    pub current: SessionCounters,
    #[serde(rename = "cumulative-stats")]
    pub cumulative: SessionCounters,
}

/// Counters for one accounting period (current session or all time).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionCounters {
    #[serde(rename = "downloadedBytes")]
    pub downloaded_bytes: i64,
    #[serde(rename = "uploadedBytes")]
    pub uploaded_bytes: i64,
    #[serde(rename = "filesAdded")]
    pub files_added: i64,
    #[serde(rename = "sessionCount")]
    pub session_count: i64,
    #[serde(rename = "secondsActive")]
    pub seconds_active: i64,
}

impl SessionCounters {
    /// Upload/download ratio for this period.
    #[must_use]
    pub fn ratio(&self) -> f64 {
        if self.downloaded_bytes <= 0 {
            0.0
        } else {
            self.uploaded_bytes as f64 / self.downloaded_bytes as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn torrent_json(id: i64, name: &str, status: i64) -> serde_json::Value {
        json!({
            "id": id,
            "hashString": format!("hash-{id}"),
            "name": name,
            "status": status,
            "error": 0,
            "errorString": "",
            "totalSize": 1024,
            "sizeWhenDone": 1024,
            "leftUntilDone": 512,
            "downloadedEver": 512,
            "uploadedEver": 128,
            "percentDone": 0.5,
            "uploadRatio": 0.25,
            "rateDownload": 1000,
            "rateUpload": 200,
            "eta": 60,
            "queuePosition": 0,
            "bandwidthPriority": 0,
            "seedRatioMode": 0,
            "seedRatioLimit": 2.0,
            "seedIdleMode": 0,
            "seedIdleLimit": 30,
            "downloadDir": "/downloads",
            "addedDate": 1_700_000_000,
            "doneDate": 0
        })
    }

    #[test]
    fn torrent_deserializes_from_daemon_field_names() {
        let torrent: Torrent =
            serde_json::from_value(torrent_json(7, "linux.iso", 4)).expect("should deserialize");
        assert_eq!(torrent.id, 7);
        assert_eq!(torrent.status, TorrentStatus::Downloading);
        assert_eq!(torrent.hash, "hash-7");
        assert!(!torrent.is_finished());
        assert!(torrent.added_at().is_some());
        assert!(torrent.done_at().is_none());
    }

    #[test]
    fn unknown_status_code_fails_deserialization() {
        let mut value = torrent_json(1, "a", 4);
        value["status"] = json!(42);
        assert!(serde_json::from_value::<Torrent>(value).is_err());
    }

    #[test]
    fn changed_fields_reports_only_differing_fields() {
        let before: Torrent = serde_json::from_value(torrent_json(1, "a", 4)).expect("before");
        let mut after = before.clone();
        after.status = TorrentStatus::Seeding;
        after.upload_rate = 999;

        let mask = after.changed_fields(&before);
        assert!(mask.contains(TorrentField::Status.bit()));
        assert!(mask.contains(TorrentField::UploadRate.bit()));
        assert!(!mask.contains(TorrentField::Name.bit()));

        assert!(before.changed_fields(&before.clone()).is_empty());
    }

    #[test]
    fn file_entries_zip_parallel_arrays() {
        let details: TorrentDetails = serde_json::from_value(json!({
            "id": 1,
            "files": [
                {"name": "a/file1", "length": 10, "bytesCompleted": 5},
                {"name": "a/file2", "length": 20, "bytesCompleted": 20}
            ],
            "fileStats": [
                {"bytesCompleted": 5, "wanted": true, "priority": 0},
                {"bytesCompleted": 20, "wanted": false, "priority": 1}
            ]
        }))
        .expect("details should deserialize");

        let entries = details.file_entries().expect("arrays should match");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path, "a/file1");
        assert_eq!(entries[0].index, 0);
        assert!(entries[0].wanted);
        assert_eq!(entries[1].priority, Priority::High);
        assert!(!entries[1].wanted);
    }

    #[test]
    fn mismatched_file_arrays_are_rejected() {
        let details: TorrentDetails = serde_json::from_value(json!({
            "id": 1,
            "files": [{"name": "f", "length": 1, "bytesCompleted": 0}],
            "fileStats": []
        }))
        .expect("details should deserialize");
        assert!(details.file_entries().is_none());
    }

    #[test]
    fn server_stats_parse_with_nested_counters() {
        let stats: ServerStats = serde_json::from_value(json!({
            "downloadSpeed": 100,
            "uploadSpeed": 50,
            "torrentCount": 4,
            "activeTorrentCount": 2,
            "pausedTorrentCount": 2,
            "current-stats": {
                "downloadedBytes": 1000,
                "uploadedBytes": 500,
                "filesAdded": 3,
                "sessionCount": 1,
                "secondsActive": 3600
            },
            "cumulative-stats": {
                "downloadedBytes": 10_000,
                "uploadedBytes": 20_000,
                "filesAdded": 42,
                "sessionCount": 9,
                "secondsActive": 86_400
            }
        }))
        .expect("stats should deserialize");

        assert_eq!(stats.current.downloaded_bytes, 1000);
        assert!((stats.current.ratio() - 0.5).abs() < f64::EPSILON);
        assert!((stats.cumulative.ratio() - 2.0).abs() < f64::EPSILON);
    }
}
