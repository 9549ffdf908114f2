//! One-way mirroring of channels and guilds over the remote gateway.

pub(crate) mod plan;

use std::sync::Arc;

use futures::StreamExt;
use rand::Rng;
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::gateway::{GatewayError, RemoteGateway};
use crate::message::MessageRecord;
use crate::provenance::ProvenanceRecord;
use self::plan::{SyncAction, pair_channels, plan_actions};

// Channel as a guild listing returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: i64,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub flags: i64,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub last_message_id: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
}

#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("relayed copy '{id}' has a corrupt body of {lines} line(s), shorter than the relay header")]
    CorruptRelayCopy { id: String, lines: usize },
}

/// Counts of what a mirror pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub created: u64,
    pub edited: u64,
    pub deleted: u64,
    pub failed: u64,
}

impl SyncReport {
    fn merge(&mut self, other: &SyncReport) {
        self.created += other.created;
        self.edited += other.edited;
        self.deleted += other.deleted;
        self.failed += other.failed;
    }
}

const NONCE_LENGTH: usize = 20;

fn relay_nonce() -> String {
    let mut rng = rand::rng();
    (0..NONCE_LENGTH)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

fn channel_messages_url(base_url: &str, channel_id: &str) -> String {
    format!("{base_url}channels/{channel_id}/messages")
}

fn channel_messages_fetch_url(base_url: &str, channel_id: &str, limit: u32) -> String {
    format!("{base_url}channels/{channel_id}/messages?limit={limit}")
}

fn channel_message_url(base_url: &str, channel_id: &str, message_id: &str) -> String {
    format!("{base_url}channels/{channel_id}/messages/{message_id}")
}

fn guild_channels_url(base_url: &str, guild_id: &str) -> String {
    format!("{base_url}guilds/{guild_id}/channels")
}

/// Mirrors one remote channel into one local channel.
pub struct ChannelMirror {
    gateway: Arc<dyn RemoteGateway>,
    config: Arc<Config>,
}

impl ChannelMirror {
    pub fn new(gateway: Arc<dyn RemoteGateway>, config: Arc<Config>) -> Self {
        Self { gateway, config }
    }

    /// Makes `local_channel_id` carry a relayed copy of every message
    /// currently in `remote_channel_id`.
    pub async fn reconcile(
        &self,
        local_channel_id: &str,
        remote_channel_id: &str,
    ) -> Result<SyncReport, MirrorError> {
        if local_channel_id == remote_channel_id {
            warn!("channel '{local_channel_id}' cannot mirror itself");
            return Ok(SyncReport::default());
        }
        self.reconcile_pair(local_channel_id, remote_channel_id).await
    }

    async fn reconcile_pair(
        &self,
        local_channel_id: &str,
        remote_channel_id: &str,
    ) -> Result<SyncReport, MirrorError> {
        let remote = self.fetch_messages(remote_channel_id).await;
        let local = self.fetch_messages(local_channel_id).await;
        let actions = plan_actions(&local, &remote, &self.config.auth.client_username)?;

        let mut report = SyncReport::default();
        for action in &actions {
            let outcome = match action {
                SyncAction::Create { source } => self.create_copy(local_channel_id, source).await,
                SyncAction::Edit {
                    copy,
                    content,
                    edited_timestamp,
                } => self.edit_copy(copy, content, edited_timestamp.as_deref()).await,
                SyncAction::Delete { copy } => self.delete_copy(copy).await,
            };
            match outcome {
                Ok(()) => match action {
                    SyncAction::Create { .. } => report.created += 1,
                    SyncAction::Edit { .. } => report.edited += 1,
                    SyncAction::Delete { .. } => report.deleted += 1,
                },
                Err(err) => {
                    error!("failed to apply a mirror action in channel '{local_channel_id}': {err}");
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    // Snapshot is newest first. A failed fetch degrades to a partial
    // snapshot; a malformed element is skipped.
    async fn fetch_messages(&self, channel_id: &str) -> Vec<MessageRecord> {
        let url = channel_messages_fetch_url(
            &self.config.api.base_url,
            channel_id,
            self.config.api.page_limit,
        );
        let mut stream = self.gateway.fetch_collection(&url);
        let mut records = Vec::new();
        while let Some(element) = stream.next().await {
            let raw = match element {
                Ok(raw) => raw,
                Err(err) => {
                    warn!("message fetch for channel '{channel_id}' aborted: {err}");
                    break;
                }
            };
            match MessageRecord::from_wire(channel_id, raw) {
                Ok(record) => {
                    debug!(
                        "fetched message from author '{}' (id '{}', channel '{}')",
                        record.username, record.id, record.channel_id
                    );
                    records.push(record);
                }
                Err(err) => warn!("skipping malformed message in channel '{channel_id}': {err}"),
            }
        }
        records
    }

    async fn create_copy(
        &self,
        channel_id: &str,
        source: &MessageRecord,
    ) -> Result<(), GatewayError> {
        let header = ProvenanceRecord::from(source).header();
        let payload = json!({
            "content": format!("{header}{}", source.content),
            "flags": 0,
            "nonce": relay_nonce(),
            "tts": source.tts,
        });
        let url = channel_messages_url(&self.config.api.base_url, channel_id);
        let response = self.gateway.create(&url, &payload).await?;
        let new_id = response.get("id").and_then(Value::as_str).unwrap_or_default();
        info!(
            "relayed message from author '{}' (id '{}', channel '{}') to channel '{}' (new id '{}')",
            source.username, source.id, source.channel_id, channel_id, new_id
        );
        Ok(())
    }

    async fn edit_copy(
        &self,
        copy: &MessageRecord,
        content: &str,
        edited_timestamp: Option<&str>,
    ) -> Result<(), GatewayError> {
        let mut record = ProvenanceRecord::from(copy);
        record.edited_timestamp = edited_timestamp.map(str::to_string);
        let body = format!("{}{content}", record.header());
        let url = channel_message_url(&self.config.api.base_url, &copy.channel_id, copy.wire_id());
        self.gateway.update(&url, &json!({ "content": body })).await?;
        info!(
            "edited message from author '{}' (id '{}', channel '{}')",
            copy.username, copy.id, copy.channel_id
        );
        Ok(())
    }

    async fn delete_copy(&self, copy: &MessageRecord) -> Result<(), GatewayError> {
        let url = channel_message_url(&self.config.api.base_url, &copy.channel_id, copy.wire_id());
        self.gateway.delete(&url).await?;
        info!(
            "removed message from author '{}' (id '{}', channel '{}')",
            copy.username, copy.id, copy.channel_id
        );
        Ok(())
    }
}

/// Mirrors every remote guild channel that has a same-id counterpart in the
/// local guild.
pub struct GuildMirror {
    gateway: Arc<dyn RemoteGateway>,
    config: Arc<Config>,
    channels: ChannelMirror,
}

impl GuildMirror {
    pub fn new(gateway: Arc<dyn RemoteGateway>, config: Arc<Config>) -> Self {
        let channels = ChannelMirror::new(gateway.clone(), config.clone());
        Self {
            gateway,
            config,
            channels,
        }
    }

    /// One mirror pass over all paired channels. A channel that fails to
    /// reconcile is counted and the pass moves on.
    pub async fn reconcile(&self, local_guild_id: &str, remote_guild_id: &str) -> SyncReport {
        if local_guild_id == remote_guild_id {
            warn!("guild '{local_guild_id}' cannot mirror itself");
            return SyncReport::default();
        }
        let remote = self.fetch_channels(remote_guild_id).await;
        let local = self.fetch_channels(local_guild_id).await;
        let pairs = pair_channels(&local, &remote);
        if pairs.is_empty() {
            warn!(
                "no channel of guild '{local_guild_id}' matches a channel of guild '{remote_guild_id}', nothing to mirror"
            );
            return SyncReport::default();
        }

        let mut report = SyncReport::default();
        for (local_channel, remote_channel) in pairs {
            debug!(
                "mirroring channel '{}' ('{}') of guild '{remote_guild_id}' into guild '{local_guild_id}'",
                remote_channel.id, remote_channel.name
            );
            match self
                .channels
                .reconcile_pair(&local_channel.id, &remote_channel.id)
                .await
            {
                Ok(channel_report) => report.merge(&channel_report),
                Err(err) => {
                    error!("failed to mirror channel '{}': {err}", remote_channel.id);
                    report.failed += 1;
                }
            }
        }
        report
    }

    async fn fetch_channels(&self, guild_id: &str) -> Vec<Channel> {
        let url = guild_channels_url(&self.config.api.base_url, guild_id);
        let mut stream = self.gateway.fetch_collection(&url);
        let mut channels = Vec::new();
        while let Some(element) = stream.next().await {
            let raw = match element {
                Ok(raw) => raw,
                Err(err) => {
                    warn!("channel fetch for guild '{guild_id}' aborted: {err}");
                    break;
                }
            };
            match serde_json::from_value::<Channel>(raw) {
                Ok(channel) => {
                    debug!(
                        "fetched channel '{}' ('{}') of guild '{guild_id}'",
                        channel.id, channel.name
                    );
                    channels.push(channel);
                }
                Err(err) => warn!("skipping malformed channel in guild '{guild_id}': {err}"),
            }
        }
        channels
    }
}
