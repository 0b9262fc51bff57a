//! Run configuration.

use serde::{Deserialize, Serialize};

use crate::record::GroupFilter;

fn default_message_folder() -> String {
    "TextVault/Messages".to_string()
}

fn default_call_log_folder() -> String {
    "TextVault/Calls".to_string()
}

const fn default_true() -> bool {
    true
}

/// Configuration of a backup run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Mail address the produced messages are addressed to or from.
    pub owner_email: String,

    /// Remote folder receiving text and multimedia messages.
    #[serde(default = "default_message_folder")]
    pub message_folder: String,

    /// Remote folder receiving call-log entries.
    #[serde(default = "default_call_log_folder")]
    pub call_log_folder: String,

    /// Overall per-run item budget, `None` for unlimited. The budget is
    /// spent on text messages first, then multimedia messages, then
    /// call-log entries.
    #[serde(default)]
    pub max_items_per_sync: Option<usize>,

    /// Contact-group restriction on text messages.
    #[serde(default)]
    pub group_filter: GroupFilter,

    /// Whether multimedia messages are backed up at all.
    #[serde(default = "default_true")]
    pub include_mms: bool,

    /// Whether call-log entries are backed up at all.
    #[serde(default)]
    pub include_call_log: bool,

    /// Whether each backed-up call additionally becomes a calendar entry.
    #[serde(default)]
    pub mirror_calls_to_calendar: bool,

    /// Whether the run was started unattended. Failures of background runs
    /// go to the notifier instead of the progress channel.
    #[serde(default)]
    pub background: bool,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            owner_email: String::new(),
            message_folder: default_message_folder(),
            call_log_folder: default_call_log_folder(),
            max_items_per_sync: None,
            group_filter: GroupFilter::default(),
            include_mms: true,
            include_call_log: false,
            mirror_calls_to_calendar: false,
            background: false,
        }
    }
}

/// Configuration of a restore run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreConfig {
    /// Remote folder to restore messages from.
    #[serde(default = "default_message_folder")]
    pub message_folder: String,

    /// Maximum number of remote messages considered, `None` for all.
    #[serde(default)]
    pub max_items: Option<usize>,

    /// Only consider messages newer than this timestamp (epoch
    /// milliseconds), `None` for no floor.
    #[serde(default)]
    pub floor: Option<i64>,

    /// Only consider flagged (starred) messages.
    #[serde(default)]
    pub flagged_only: bool,

    /// Mark every restored message as read regardless of its stored state.
    #[serde(default)]
    pub mark_as_read: bool,

    /// Whether the run was started unattended.
    #[serde(default)]
    pub background: bool,
}

impl Default for RestoreConfig {
    fn default() -> Self {
        Self {
            message_folder: default_message_folder(),
            max_items: None,
            floor: None,
            flagged_only: false,
            mark_as_read: false,
            background: false,
        }
    }
}
