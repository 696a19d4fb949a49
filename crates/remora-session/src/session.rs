//! Connection state machine and polling engine.
//!
//! All mutable state lives in a single task; the [`Session`] handle talks
//! to it over an mpsc channel, so transitions, polls, and mutations are
//! strictly serialized. Queries copy the requested slice of the model out
//! over a oneshot channel. Dropping the handle closes the channel and the
//! task exits.

use std::collections::HashMap;
use std::time::Duration;

use remora_events::{Event, EventBus, EventStream, ListDiff, SessionStatus};
use remora_rpc::{
    ConfigError, ProtocolError, RpcClient, ServerConfig, SessionInfo, TransportError,
};
use serde_json::{Value, json};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::dispatch::{AddTorrentOptions, Mutation, QueueMove, SessionSettingsUpdate, TorrentLimits};
use crate::error::CommandError;
use crate::model::{
    FileEntry, Peer, Priority, ServerStats, TORRENT_DETAIL_FIELDS, TORRENT_GET_FIELDS, Torrent,
    TorrentDetails, Tracker,
};
use crate::reconcile::Collection;

const COMMAND_CHANNEL_CAPACITY: usize = 32;

/// Behaviour switches for a session, fixed at construction.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Start connecting as soon as the session task launches instead of
    /// waiting for an explicit connect call.
    pub connect_on_startup: bool,
    /// Publish [`Event::TorrentAdded`] when a torrent appears.
    pub notify_on_added: bool,
    /// Publish [`Event::TorrentFinished`] when a torrent completes.
    pub notify_on_finished: bool,
    /// Whether the caller's notifier should announce a lost connection.
    /// Status events are published regardless; this travels with the
    /// options so the settings layer configures everything in one place.
    pub notify_on_disconnect: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            connect_on_startup: false,
            notify_on_added: true,
            notify_on_finished: true,
            notify_on_disconnect: true,
        }
    }
}

/// Model queries answered with a copy of the current state.
enum Query {
    Status(oneshot::Sender<SessionStatus>),
    Torrents(oneshot::Sender<Vec<Torrent>>),
    Peers(oneshot::Sender<Vec<Peer>>),
    Trackers(oneshot::Sender<Vec<Tracker>>),
    Files(oneshot::Sender<Vec<FileEntry>>),
    ServerStats(oneshot::Sender<Option<ServerStats>>),
    ServerInfo(oneshot::Sender<Option<SessionInfo>>),
}

enum SessionCommand {
    Connect(oneshot::Sender<SessionStatus>),
    Retry(oneshot::Sender<SessionStatus>),
    Disconnect(oneshot::Sender<()>),
    PollNow(oneshot::Sender<()>),
    SetBackground(bool),
    SetDetailTarget(Option<i64>, oneshot::Sender<()>),
    Query(Query),
    Mutate(Mutation, oneshot::Sender<Result<(), CommandError>>),
}

/// Handle to one daemon session. Cheap to clone; all clones drive the same
/// session task.
#[derive(Clone)]
pub struct Session {
    commands: mpsc::Sender<SessionCommand>,
    events: EventBus,
    options: SessionOptions,
}

impl Session {
    /// Validate `config` and spawn the session task. Must be called within
    /// a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the server configuration is invalid.
    pub fn new(config: ServerConfig, options: SessionOptions) -> Result<Self, ConfigError> {
        config.validate()?;
        let events = EventBus::new();
        let (commands, receiver) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let worker = Worker::new(config, options.clone(), events.clone(), receiver);
        tokio::spawn(worker.run());
        Ok(Self {
            commands,
            events,
            options,
        })
    }

    /// Subscribe to events published from now on.
    #[must_use]
    pub fn events(&self) -> EventStream {
        self.events.subscribe()
    }

    /// Behaviour switches this session was built with.
    #[must_use]
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, CommandError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| CommandError::Closed)?;
        response.await.map_err(|_| CommandError::Closed)
    }

    /// Establish the connection; returns the resulting status. A no-op when
    /// already connected or connecting.
    pub async fn connect(&self) -> Result<SessionStatus, CommandError> {
        self.request(SessionCommand::Connect).await
    }

    /// Reattempt the connection after a failure. A no-op unless the session
    /// sits in an error status.
    pub async fn retry(&self) -> Result<SessionStatus, CommandError> {
        self.request(SessionCommand::Retry).await
    }

    /// Tear down the connection and clear the local model.
    pub async fn disconnect(&self) -> Result<(), CommandError> {
        self.request(SessionCommand::Disconnect).await
    }

    /// Run one poll cycle immediately without disturbing the timer phase.
    pub async fn poll_now(&self) -> Result<(), CommandError> {
        self.request(SessionCommand::PollNow).await
    }

    /// Switch between the foreground and background poll cadence. The timer
    /// keeps its phase: the next poll is rescheduled relative to the start
    /// of the current period.
    pub async fn set_background_polling(&self, background: bool) -> Result<(), CommandError> {
        self.commands
            .send(SessionCommand::SetBackground(background))
            .await
            .map_err(|_| CommandError::Closed)
    }

    /// Select which torrent gets per-poll peer/tracker/file detail, or
    /// `None` to stop detail polling. Changing the target clears the
    /// previous torrent's detail collections.
    pub async fn set_detail_target(&self, target: Option<i64>) -> Result<(), CommandError> {
        self.request(|reply| SessionCommand::SetDetailTarget(target, reply))
            .await
    }

    pub async fn status(&self) -> Result<SessionStatus, CommandError> {
        self.request(|reply| SessionCommand::Query(Query::Status(reply)))
            .await
    }

    pub async fn torrents(&self) -> Result<Vec<Torrent>, CommandError> {
        self.request(|reply| SessionCommand::Query(Query::Torrents(reply)))
            .await
    }

    pub async fn peers(&self) -> Result<Vec<Peer>, CommandError> {
        self.request(|reply| SessionCommand::Query(Query::Peers(reply)))
            .await
    }

    pub async fn trackers(&self) -> Result<Vec<Tracker>, CommandError> {
        self.request(|reply| SessionCommand::Query(Query::Trackers(reply)))
            .await
    }

    pub async fn files(&self) -> Result<Vec<FileEntry>, CommandError> {
        self.request(|reply| SessionCommand::Query(Query::Files(reply)))
            .await
    }

    pub async fn server_stats(&self) -> Result<Option<ServerStats>, CommandError> {
        self.request(|reply| SessionCommand::Query(Query::ServerStats(reply)))
            .await
    }

    /// Daemon identity from the connect handshake, while connected.
    pub async fn server_info(&self) -> Result<Option<SessionInfo>, CommandError> {
        self.request(|reply| SessionCommand::Query(Query::ServerInfo(reply)))
            .await
    }

    /// Run one mutation against the daemon. On success the model is
    /// refreshed with an out-of-band poll before this returns.
    pub async fn mutate(&self, mutation: Mutation) -> Result<(), CommandError> {
        self.request(|reply| SessionCommand::Mutate(mutation, reply))
            .await?
    }

    /// Add a torrent from raw metainfo bytes.
    pub async fn add_file(
        &self,
        metainfo: Vec<u8>,
        options: AddTorrentOptions,
    ) -> Result<(), CommandError> {
        self.mutate(Mutation::AddFile { metainfo, options }).await
    }

    /// Add a torrent from a magnet link or torrent URL.
    pub async fn add_link(
        &self,
        url: String,
        options: AddTorrentOptions,
    ) -> Result<(), CommandError> {
        self.mutate(Mutation::AddLink { url, options }).await
    }

    pub async fn start(&self, ids: Vec<i64>) -> Result<(), CommandError> {
        self.mutate(Mutation::Start { ids }).await
    }

    /// Start torrents bypassing the queue.
    pub async fn start_now(&self, ids: Vec<i64>) -> Result<(), CommandError> {
        self.mutate(Mutation::StartNow { ids }).await
    }

    pub async fn stop(&self, ids: Vec<i64>) -> Result<(), CommandError> {
        self.mutate(Mutation::Stop { ids }).await
    }

    pub async fn verify(&self, ids: Vec<i64>) -> Result<(), CommandError> {
        self.mutate(Mutation::Verify { ids }).await
    }

    pub async fn reannounce(&self, ids: Vec<i64>) -> Result<(), CommandError> {
        self.mutate(Mutation::Reannounce { ids }).await
    }

    pub async fn remove(&self, ids: Vec<i64>, delete_data: bool) -> Result<(), CommandError> {
        self.mutate(Mutation::Remove { ids, delete_data }).await
    }

    pub async fn set_location(
        &self,
        ids: Vec<i64>,
        location: String,
        move_data: bool,
    ) -> Result<(), CommandError> {
        self.mutate(Mutation::SetLocation {
            ids,
            location,
            move_data,
        })
        .await
    }

    pub async fn rename_file(
        &self,
        id: i64,
        path: String,
        new_name: String,
    ) -> Result<(), CommandError> {
        self.mutate(Mutation::RenameFile { id, path, new_name }).await
    }

    pub async fn set_files_wanted(
        &self,
        id: i64,
        indices: Vec<i64>,
        wanted: bool,
    ) -> Result<(), CommandError> {
        self.mutate(Mutation::SetFilesWanted { id, indices, wanted })
            .await
    }

    pub async fn set_file_priority(
        &self,
        id: i64,
        indices: Vec<i64>,
        priority: Priority,
    ) -> Result<(), CommandError> {
        self.mutate(Mutation::SetFilePriority {
            id,
            indices,
            priority,
        })
        .await
    }

    pub async fn queue_move(
        &self,
        ids: Vec<i64>,
        direction: QueueMove,
    ) -> Result<(), CommandError> {
        self.mutate(Mutation::QueueMove { ids, direction }).await
    }

    pub async fn set_torrent_limits(
        &self,
        ids: Vec<i64>,
        limits: TorrentLimits,
    ) -> Result<(), CommandError> {
        self.mutate(Mutation::SetTorrentLimits { ids, limits }).await
    }

    pub async fn set_session_settings(
        &self,
        update: SessionSettingsUpdate,
    ) -> Result<(), CommandError> {
        self.mutate(Mutation::SetSessionSettings { update }).await
    }
}

struct Worker {
    config: ServerConfig,
    options: SessionOptions,
    events: EventBus,
    commands: mpsc::Receiver<SessionCommand>,
    status: SessionStatus,
    client: Option<RpcClient>,
    server_info: Option<SessionInfo>,
    torrents: Collection<Torrent>,
    peers: Collection<Peer>,
    trackers: Collection<Tracker>,
    files: Collection<FileEntry>,
    stats: Option<ServerStats>,
    detail_target: Option<i64>,
    background: bool,
    /// Start of the current poll period; `next_poll` is always
    /// `timer_base + current_interval()` while the timer is armed.
    timer_base: Option<Instant>,
    next_poll: Option<Instant>,
    /// Added/finished notifications are suppressed on the first poll after
    /// connecting, when the whole list is new.
    initial_poll_done: bool,
}

impl Worker {
    fn new(
        config: ServerConfig,
        options: SessionOptions,
        events: EventBus,
        commands: mpsc::Receiver<SessionCommand>,
    ) -> Self {
        Self {
            config,
            options,
            events,
            commands,
            status: SessionStatus::Disconnected,
            client: None,
            server_info: None,
            torrents: Collection::new(),
            peers: Collection::new(),
            trackers: Collection::new(),
            files: Collection::new(),
            stats: None,
            detail_target: None,
            background: false,
            timer_base: None,
            next_poll: None,
            initial_poll_done: false,
        }
    }

    async fn run(mut self) {
        if self.options.connect_on_startup {
            self.connect().await;
        }
        loop {
            let poll_at = self.next_poll;
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => break,
                },
                () = sleep_until_or_forever(poll_at) => self.timer_tick().await,
            }
        }
        debug!("session task stopped");
    }

    async fn handle(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Connect(reply) => {
                let status = self.connect().await;
                let _ = reply.send(status);
            }
            SessionCommand::Retry(reply) => {
                let status = if self.status.is_error() {
                    self.connect().await
                } else {
                    self.status
                };
                let _ = reply.send(status);
            }
            SessionCommand::Disconnect(reply) => {
                self.disconnect();
                let _ = reply.send(());
            }
            SessionCommand::PollNow(reply) => {
                if self.status.is_connected() {
                    self.poll().await;
                }
                let _ = reply.send(());
            }
            SessionCommand::SetBackground(background) => self.set_background(background),
            SessionCommand::SetDetailTarget(target, reply) => {
                self.set_detail_target(target).await;
                let _ = reply.send(());
            }
            SessionCommand::Query(query) => self.answer(query),
            SessionCommand::Mutate(mutation, reply) => {
                let result = self.mutate(mutation).await;
                let _ = reply.send(result);
            }
        }
    }

    fn answer(&self, query: Query) {
        match query {
            Query::Status(reply) => {
                let _ = reply.send(self.status);
            }
            Query::Torrents(reply) => {
                let _ = reply.send(self.torrents.items().to_vec());
            }
            Query::Peers(reply) => {
                let _ = reply.send(self.peers.items().to_vec());
            }
            Query::Trackers(reply) => {
                let _ = reply.send(self.trackers.items().to_vec());
            }
            Query::Files(reply) => {
                let _ = reply.send(self.files.items().to_vec());
            }
            Query::ServerStats(reply) => {
                let _ = reply.send(self.stats.clone());
            }
            Query::ServerInfo(reply) => {
                let _ = reply.send(self.server_info.clone());
            }
        }
    }

    async fn connect(&mut self) -> SessionStatus {
        if matches!(
            self.status,
            SessionStatus::Connecting | SessionStatus::Connected
        ) {
            return self.status;
        }
        self.set_status(SessionStatus::Connecting);

        let mut client = match RpcClient::new(&self.config) {
            Ok(client) => client,
            Err(err) => {
                let err = ProtocolError::Transport(err);
                self.fail("connect", &err);
                return self.status;
            }
        };

        match client.handshake().await {
            Ok(info) => {
                info!(
                    host = %self.config.host,
                    server_version = info.server_version.as_deref().unwrap_or("unknown"),
                    rpc_version = info.rpc_version,
                    "connected"
                );
                self.server_info = Some(info);
                self.client = Some(client);
                self.initial_poll_done = false;
                self.set_status(SessionStatus::Connected);
                let base = Instant::now();
                self.timer_base = Some(base);
                self.next_poll = Some(base + self.current_interval());
                self.poll().await;
            }
            Err(err) => self.fail("handshake", &err),
        }
        self.status
    }

    fn disconnect(&mut self) {
        if self.status == SessionStatus::Disconnected {
            return;
        }
        self.client = None;
        self.timer_base = None;
        self.next_poll = None;
        self.clear_model();
        self.set_status(SessionStatus::Disconnected);
    }

    /// Record a protocol failure: drop the connection, clear the model, and
    /// transition to the matching error status.
    fn fail(&mut self, context: &str, err: &ProtocolError) {
        warn!(error = %err, context, "session failure");
        self.client = None;
        self.timer_base = None;
        self.next_poll = None;
        self.clear_model();
        self.set_status(status_for_error(err));
    }

    fn set_status(&mut self, status: SessionStatus) {
        if self.status == status {
            return;
        }
        debug!(from = ?self.status, to = ?status, "status transition");
        self.status = status;
        self.events.publish(Event::StatusChanged { status });
    }

    fn current_interval(&self) -> Duration {
        if self.background {
            self.config.background_poll_interval
        } else {
            self.config.poll_interval
        }
    }

    fn set_background(&mut self, background: bool) {
        if self.background == background {
            return;
        }
        self.background = background;
        if let Some(base) = self.timer_base
            && self.status.is_connected()
        {
            self.next_poll = Some(base + self.current_interval());
        }
    }

    async fn timer_tick(&mut self) {
        let Some(deadline) = self.next_poll else {
            return;
        };
        self.poll().await;
        if self.status.is_connected() {
            let interval = self.current_interval();
            let mut next = deadline + interval;
            let now = Instant::now();
            if next <= now {
                next = now + interval;
            }
            self.timer_base = Some(next - interval);
            self.next_poll = Some(next);
        }
    }

    async fn set_detail_target(&mut self, target: Option<i64>) {
        if self.detail_target == target {
            return;
        }
        if let Some(previous) = self.detail_target {
            self.clear_details(previous);
        }
        self.detail_target = target;
        if target.is_some() && self.status.is_connected() {
            self.poll_details().await;
        }
    }

    /// One full poll cycle: the torrent list (whose failure tears down the
    /// connection), then server stats and detail data (whose failures are
    /// scoped to a warning).
    async fn poll(&mut self) {
        let result = match self.client.as_mut() {
            Some(client) => {
                client
                    .call("torrent-get", json!({ "fields": TORRENT_GET_FIELDS }))
                    .await
            }
            None => return,
        };
        let snapshot = match result.and_then(|arguments| parse_torrents(&arguments)) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                self.fail("torrent list poll", &err);
                return;
            }
        };
        self.apply_torrents(snapshot);
        self.poll_stats().await;
        self.poll_details().await;
        self.initial_poll_done = true;
    }

    fn apply_torrents(&mut self, snapshot: Vec<Torrent>) {
        let notify = self.initial_poll_done;
        let previous: HashMap<i64, bool> = self
            .torrents
            .items()
            .iter()
            .map(|torrent| (torrent.id, torrent.is_finished()))
            .collect();

        let diff = self.torrents.reconcile(snapshot);

        let mut notifications = Vec::new();
        if notify {
            for torrent in self.torrents.items() {
                match previous.get(&torrent.id).copied() {
                    None if self.options.notify_on_added => {
                        notifications.push(Event::TorrentAdded {
                            torrent_id: torrent.id,
                            name: torrent.name.clone(),
                        });
                    }
                    Some(was_finished)
                        if !was_finished
                            && torrent.is_finished()
                            && self.options.notify_on_finished =>
                    {
                        notifications.push(Event::TorrentFinished {
                            torrent_id: torrent.id,
                            name: torrent.name.clone(),
                        });
                    }
                    _ => {}
                }
            }
        }

        if !diff.is_empty() {
            self.events.publish(Event::TorrentsChanged { diff });
        }
        for event in notifications {
            self.events.publish(event);
        }
    }

    async fn poll_stats(&mut self) {
        let result = match self.client.as_mut() {
            Some(client) => client.call("session-stats", json!({})).await,
            None => return,
        };
        match result {
            Ok(arguments) => match serde_json::from_value::<ServerStats>(arguments) {
                Ok(stats) => {
                    if self.stats.as_ref() != Some(&stats) {
                        self.stats = Some(stats);
                        self.events.publish(Event::ServerStatsUpdated);
                    }
                }
                Err(err) => warn!(error = %err, "session-stats payload is malformed"),
            },
            Err(err) => warn!(error = %err, "session-stats poll failed"),
        }
    }

    async fn poll_details(&mut self) {
        let Some(target) = self.detail_target else {
            return;
        };
        if self.torrents.get(&target).is_none() {
            self.clear_details(target);
            return;
        }
        let result = match self.client.as_mut() {
            Some(client) => {
                client
                    .call(
                        "torrent-get",
                        json!({ "ids": [target], "fields": TORRENT_DETAIL_FIELDS }),
                    )
                    .await
            }
            None => return,
        };
        let details: Vec<TorrentDetails> = match result {
            Ok(arguments) => {
                match serde_json::from_value(
                    arguments.get("torrents").cloned().unwrap_or(Value::Null),
                ) {
                    Ok(details) => details,
                    Err(err) => {
                        warn!(error = %err, torrent_id = target, "detail payload is malformed");
                        return;
                    }
                }
            }
            Err(err) => {
                warn!(error = %err, torrent_id = target, "detail poll failed");
                return;
            }
        };
        let Some(detail) = details.into_iter().find(|detail| detail.id == target) else {
            self.clear_details(target);
            return;
        };

        match detail.file_entries() {
            Some(entries) => {
                let diff = self.files.reconcile(entries);
                if !diff.is_empty() {
                    self.events.publish(Event::FilesChanged {
                        torrent_id: target,
                        diff,
                    });
                }
            }
            None => warn!(torrent_id = target, "file and fileStats arrays disagree"),
        }

        let diff = self.peers.reconcile(detail.peers);
        if !diff.is_empty() {
            self.events.publish(Event::PeersChanged {
                torrent_id: target,
                diff,
            });
        }
        let diff = self.trackers.reconcile(detail.trackers);
        if !diff.is_empty() {
            self.events.publish(Event::TrackersChanged {
                torrent_id: target,
                diff,
            });
        }
    }

    fn clear_details(&mut self, torrent_id: i64) {
        let diff = self.peers.clear();
        if !diff.is_empty() {
            self.events.publish(Event::PeersChanged { torrent_id, diff });
        }
        let diff = self.trackers.clear();
        if !diff.is_empty() {
            self.events
                .publish(Event::TrackersChanged { torrent_id, diff });
        }
        let diff = self.files.clear();
        if !diff.is_empty() {
            self.events.publish(Event::FilesChanged { torrent_id, diff });
        }
    }

    fn clear_model(&mut self) {
        if let Some(target) = self.detail_target {
            self.clear_details(target);
        }
        let diff = self.torrents.clear();
        if !diff.is_empty() {
            self.events.publish(Event::TorrentsChanged { diff });
        }
        self.stats = None;
        self.server_info = None;
        self.initial_poll_done = false;
    }

    async fn mutate(&mut self, mutation: Mutation) -> Result<(), CommandError> {
        if !self.status.is_connected() {
            return Err(CommandError::NotConnected);
        }
        let (method, arguments) = mutation.encode();
        let result = match self.client.as_mut() {
            Some(client) => client.call(method, arguments).await,
            None => return Err(CommandError::NotConnected),
        };
        match result {
            Ok(arguments) => {
                if mutation.is_add() {
                    self.finish_add(&arguments)?;
                }
                // Refresh immediately rather than waiting for the next
                // scheduled poll; the timer phase is left untouched.
                self.poll().await;
                Ok(())
            }
            Err(ProtocolError::Rejected { message }) => {
                if mutation.is_add() && message.contains("duplicate") {
                    Err(CommandError::DuplicateTorrent)
                } else {
                    Err(CommandError::InvalidArgument { reason: message })
                }
            }
            Err(err) => {
                self.fail(method, &err);
                Err(CommandError::Session(err))
            }
        }
    }

    /// Apply a `torrent-add` acknowledgement: a duplicate marker fails the
    /// command, an added marker inserts a provisional record that the next
    /// poll confirms.
    fn finish_add(&mut self, arguments: &Value) -> Result<(), CommandError> {
        if arguments.get("torrent-duplicate").is_some() {
            return Err(CommandError::DuplicateTorrent);
        }
        let Some(added) = arguments.get("torrent-added") else {
            return Ok(());
        };
        let Some(id) = added.get("id").and_then(Value::as_i64) else {
            return Ok(());
        };
        let name = added
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        let hash = added
            .get("hashString")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        if self
            .torrents
            .insert_provisional(Torrent::provisional(id, hash, name.clone()))
        {
            self.events.publish(Event::TorrentsChanged {
                diff: ListDiff {
                    inserted: vec![id],
                    updated: Vec::new(),
                    removed: Vec::new(),
                },
            });
            if self.options.notify_on_added {
                self.events.publish(Event::TorrentAdded {
                    torrent_id: id,
                    name,
                });
            }
        }
        Ok(())
    }
}

async fn sleep_until_or_forever(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn parse_torrents(arguments: &Value) -> Result<Vec<Torrent>, ProtocolError> {
    serde_json::from_value(arguments.get("torrents").cloned().unwrap_or(Value::Null)).map_err(
        |err| ProtocolError::Parse {
            reason: format!("torrent-get payload is malformed: {err}"),
        },
    )
}

fn status_for_error(err: &ProtocolError) -> SessionStatus {
    match err {
        ProtocolError::Transport(TransportError::Timeout) => SessionStatus::TimedOut,
        ProtocolError::Transport(_) => SessionStatus::ConnectionError,
        ProtocolError::Authentication => SessionStatus::AuthenticationError,
        ProtocolError::Parse { .. } | ProtocolError::Rejected { .. } => SessionStatus::ParseError,
        ProtocolError::ServerTooNew { .. } => SessionStatus::ServerTooNew,
        ProtocolError::ServerTooOld { .. } => SessionStatus::ServerTooOld,
    }
}
