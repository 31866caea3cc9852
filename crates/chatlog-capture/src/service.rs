use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chatlog_db::{Cancellation, DatabaseUrl, InitError, RecordStore, StoreError, WriteTicket};
use chatlog_types::events::{BotResponse, GroupMessage};
use chatlog_types::models::{BOT_NICKNAME, ChatRecord, DEFAULT_BOT_ID, NewChatRecord};
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};

use crate::config::CaptureConfig;
use crate::filter::FilterPolicy;
use crate::normalize::normalize;

/// Why an event was not recorded. Expected outcomes, not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotGroupConversation,
    BotMessagesDisabled,
    GroupFiltered,
    EmptyMessage,
    MissingSender,
    MissingGroup,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotGroupConversation => "not_group_conversation",
            Self::BotMessagesDisabled => "bot_messages_disabled",
            Self::GroupFiltered => "group_filtered",
            Self::EmptyMessage => "empty_message",
            Self::MissingSender => "missing_sender",
            Self::MissingGroup => "missing_group",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of handing one event to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Stored under this record id.
    Recorded(i64),
    Skipped(SkipReason),
    /// Eligible, but the write failed. Already logged.
    Dropped,
}

/// Records group messages and bot responses into the record store.
///
/// Handlers take `&self` and never fail: per-event problems are logged and
/// the event is dropped, so one bad event cannot affect the next. Share the
/// service behind an `Arc` to handle events concurrently.
pub struct CaptureService {
    config: CaptureConfig,
    policy: FilterPolicy,
    write_timeout: Option<Duration>,
    store: Arc<RecordStore>,
}

impl CaptureService {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            policy: config.policy(),
            write_timeout: config.write_timeout(),
            config,
            store: Arc::new(RecordStore::new()),
        }
    }

    /// Opens the store. Must succeed before events are delivered; an error
    /// here means the service is unusable.
    pub async fn initialize(&self) -> Result<(), InitError> {
        self.open_store()
            .await
            .inspect_err(|e| error!("Failed to initialize chat capture: {}", e))?;

        info!("Chat capture initialized with database: {}", self.config.database_name);
        info!("Group whitelist: {:?}", self.policy.whitelist);
        info!("Group blacklist: {:?}", self.policy.blacklist);
        info!("Include bot messages: {}", self.config.include_bot_messages);
        Ok(())
    }

    async fn open_store(&self) -> Result<(), InitError> {
        let url: DatabaseUrl = self.config.database_url.parse()?;
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.initialize(&url))
            .await
            .map_err(|e| InitError::Task(e.to_string()))?
    }

    /// Releases the store. Safe to call repeatedly or after a failed `initialize`.
    pub async fn shutdown(&self) -> Result<(), StoreError> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.shutdown())
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }

    pub async fn on_group_message(&self, event: GroupMessage) -> CaptureOutcome {
        match self.group_message_record(event) {
            Ok(record) => self.persist(record).await,
            Err(reason) => {
                debug!("Skipping group message: {}", reason);
                CaptureOutcome::Skipped(reason)
            }
        }
    }

    pub async fn on_bot_response(&self, event: BotResponse) -> CaptureOutcome {
        match self.bot_response_record(event) {
            Ok(record) => self.persist(record).await,
            Err(reason) => {
                debug!("Skipping bot response: {}", reason);
                CaptureOutcome::Skipped(reason)
            }
        }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    fn group_message_record(&self, event: GroupMessage) -> Result<NewChatRecord, SkipReason> {
        if event.launcher_id.is_empty() {
            return Err(SkipReason::MissingGroup);
        }
        if !self.policy.should_record(&event.launcher_id) {
            return Err(SkipReason::GroupFiltered);
        }

        let message = normalize(&event.message_chain);
        if message.trim().is_empty() {
            return Err(SkipReason::EmptyMessage);
        }
        if event.sender_id.is_empty() {
            return Err(SkipReason::MissingSender);
        }

        let nickname = resolve_nickname(&event);
        Ok(NewChatRecord {
            user_id: event.sender_id,
            nickname,
            message,
            group_id: event.launcher_id,
            is_bot_message: false,
        })
    }

    fn bot_response_record(&self, event: BotResponse) -> Result<NewChatRecord, SkipReason> {
        if !event.launcher_type.is_group() {
            return Err(SkipReason::NotGroupConversation);
        }
        if !self.config.include_bot_messages {
            return Err(SkipReason::BotMessagesDisabled);
        }
        if event.launcher_id.is_empty() {
            return Err(SkipReason::MissingGroup);
        }
        if !self.policy.should_record(&event.launcher_id) {
            return Err(SkipReason::GroupFiltered);
        }

        let message = [event.prefix, event.response_text]
            .into_iter()
            .flatten()
            .collect::<String>();
        if message.trim().is_empty() {
            return Err(SkipReason::EmptyMessage);
        }

        let bot_id = event
            .adapter
            .and_then(|adapter| adapter.bot_account_id)
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| DEFAULT_BOT_ID.to_string());

        Ok(NewChatRecord {
            user_id: bot_id,
            nickname: Some(BOT_NICKNAME.to_string()),
            message,
            group_id: event.launcher_id,
            is_bot_message: true,
        })
    }

    async fn persist(&self, record: NewChatRecord) -> CaptureOutcome {
        let ticket = WriteTicket::new();
        let store = Arc::clone(&self.store);
        let writer_ticket = ticket.clone();
        let mut write = tokio::task::spawn_blocking(move || store.append_with(&record, &writer_ticket));

        let result = match self.write_timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut write).await {
                Ok(joined) => flatten(joined),
                Err(_) => match ticket.cancel() {
                    // Still queued for the connection; it will never insert
                    Cancellation::NotStarted => Err(StoreError::Timeout(limit)),
                    // The interrupted insert rolls back unless it had already committed
                    Cancellation::Interrupted | Cancellation::AlreadyFinished => {
                        flatten(write.await).map_err(|_| StoreError::Timeout(limit))
                    }
                },
            },
            None => flatten(write.await),
        };

        match result {
            Ok(stored) => {
                debug!(
                    "Saved chat record {} from user {} in group {}",
                    stored.id, stored.user_id, stored.group_id
                );
                CaptureOutcome::Recorded(stored.id)
            }
            Err(StoreError::NotReady) => {
                warn!("Record store not initialized, skipping record save");
                CaptureOutcome::Dropped
            }
            Err(e) => {
                error!("Failed to save chat record: {}", e);
                CaptureOutcome::Dropped
            }
        }
    }
}

fn flatten(joined: Result<Result<ChatRecord, StoreError>, JoinError>) -> Result<ChatRecord, StoreError> {
    joined.map_err(|e| StoreError::Task(e.to_string()))?
}

/// Adapter-supplied name, then the profile nickname, then the group card.
fn resolve_nickname(event: &GroupMessage) -> Option<String> {
    let profile = event.sender.as_ref();
    [
        event.sender_name.as_deref(),
        profile.and_then(|p| p.nickname.as_deref()),
        profile.and_then(|p| p.card.as_deref()),
    ]
    .into_iter()
    .flatten()
    .find(|name| !name.trim().is_empty())
    .map(String::from)
}
