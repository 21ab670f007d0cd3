//! Raw and decoded long-poll update records.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::flags::{DialogFlags, MessageFlags, Platform};

// ─── Event codes ──────────────────────────────────────────────────────────────

/// Numeric event codes (first element of every update record).
pub mod code {
    pub const REPLACE_MESSAGE_FLAGS:      i64 = 1;
    pub const INSTALL_MESSAGE_FLAGS:      i64 = 2;
    pub const RESET_MESSAGE_FLAGS:        i64 = 3;
    pub const ADD_MESSAGE:                i64 = 4;
    pub const READ_INCOMING:              i64 = 6;
    pub const READ_OUTGOING:              i64 = 7;
    pub const FRIEND_ONLINE:              i64 = 8;
    pub const FRIEND_OFFLINE:             i64 = 9;
    pub const RESET_DIALOG_FLAGS:         i64 = 10;
    pub const REPLACE_DIALOG_FLAGS:       i64 = 11;
    pub const INSTALL_DIALOG_FLAGS:       i64 = 12;
    pub const CONVERSATION_CHANGED:       i64 = 51;
    /// Shared by dialog and conversation typing; see [`crate::decode`].
    pub const USER_TYPING:                i64 = 61;
    pub const USER_TYPING_IN_CHAT:        i64 = 62;
    pub const USER_CALL:                  i64 = 70;
    pub const COUNTER_UPDATE:             i64 = 80;
    pub const NOTIFY_SETTINGS_CHANGED:    i64 = 114;
}

// ─── RawUpdate ────────────────────────────────────────────────────────────────

/// One undecoded update: `[code, field, field, …]`, arity depends on the code.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawUpdate(pub Vec<Value>);

impl RawUpdate {
    pub fn new(fields: Vec<Value>) -> Self {
        Self(fields)
    }

    /// The event code, if element 0 is an integer.
    pub fn code(&self) -> Option<i64> {
        self.0.first().and_then(crate::decode::as_i64)
    }

    pub fn fields(&self) -> &[Value] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Value>> for RawUpdate {
    fn from(fields: Vec<Value>) -> Self { Self(fields) }
}

/// Any JSON value becomes a record; non-arrays become a single-element
/// record that fails to decode on its own without affecting its neighbours.
impl From<Value> for RawUpdate {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) => Self(items),
            other               => Self(vec![other]),
        }
    }
}

// ─── Payloads ─────────────────────────────────────────────────────────────────

/// A new message (code 4).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MessageAdded {
    pub id:        i64,
    pub flags:     MessageFlags,
    /// Sender (or peer) id.
    pub user_id:   i64,
    /// Unix timestamp; `0` if the server did not send one.
    pub timestamp: i64,
    pub text:      String,
    /// Trailing fields (attachments, random id, …) exactly as received.
    pub extras:    Vec<Value>,
}

impl MessageAdded {
    /// `true` if this message was sent by the account owning the session.
    pub fn is_outbox(&self) -> bool {
        self.flags.is_outbox()
    }

    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        if self.timestamp == 0 {
            return None;
        }
        DateTime::from_timestamp(self.timestamp, 0)
    }
}

/// Payload shared by the three message-flag events (codes 1–3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MessageFlagsUpdate {
    pub message_id: i64,
    pub mask:       MessageFlags,
    pub peer_id:    Option<i64>,
}

/// How a flag event combines its mask with the current flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum FlagOp {
    /// `FLAGS := mask`
    Replace,
    /// `FLAGS |= mask`
    Install,
    /// `FLAGS &= ~mask`
    Reset,
}

impl FlagOp {
    /// Apply this operation to a raw mask.
    pub fn apply(self, current: u64, mask: u64) -> u64 {
        match self {
            Self::Replace => mask,
            Self::Install => current | mask,
            Self::Reset   => current & !mask,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ReadDirection {
    Incoming,
    Outgoing,
}

/// A friend came online (code 8) or went offline (code 9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PresenceChange {
    pub user_id:   i64,
    pub online:    bool,
    /// Only reported for code 8, and only if `extra` carries a platform byte.
    pub platform:  Option<Platform>,
    /// `$extra` for code 8, `$flags` for code 9.
    pub extra:     i64,
    pub timestamp: Option<i64>,
}

impl PresenceChange {
    /// For an offline event: `true` if the user timed out rather than logged out.
    pub fn timed_out(&self) -> bool {
        !self.online && self.extra == 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum TypingScope {
    /// Typing in a one-to-one dialog.
    Dialog,
    /// Typing in the named multi-user conversation.
    Conversation { chat_id: i64 },
}

/// `$disabled_until` of a notification-settings event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum MutedUntil {
    /// Notifications enabled (`0`).
    NotMuted,
    /// Muted forever (`-1`).
    Forever,
    /// Muted until the given Unix timestamp.
    Until(i64),
}

impl MutedUntil {
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            0          => Self::NotMuted,
            r if r < 0 => Self::Forever,
            ts         => Self::Until(ts),
        }
    }
}

// ─── Event ────────────────────────────────────────────────────────────────────

/// A decoded long-poll update.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Event {
    MessageAdded(MessageAdded),
    MessageFlagsReplaced(MessageFlagsUpdate),
    MessageFlagsInstalled(MessageFlagsUpdate),
    MessageFlagsReset(MessageFlagsUpdate),
    /// All messages with `peer_id` up to and including `local_id` were read.
    MessagesRead { peer_id: i64, local_id: i64, direction: ReadDirection },
    PresenceChanged(PresenceChange),
    DialogFlagsChanged { peer_id: i64, flags: DialogFlags, op: FlagOp },
    /// Content or topic of conversation `chat_id` changed.
    ConversationChanged { chat_id: i64, by_self: bool },
    TypingStarted { user_id: i64, scope: TypingScope },
    CallCompleted { user_id: i64, call_id: i64 },
    UnreadCounterChanged { count: i64 },
    NotificationSettingsChanged { peer_id: i64, sound_enabled: bool, muted_until: MutedUntil },
    /// A code with no decoder.  Never an error.
    Unknown { code: i64 },
}

impl Event {
    /// The event code this variant was decoded from.
    ///
    /// Typing reports the canonical code of its scope: [`code::USER_TYPING`]
    /// for a dialog, [`code::USER_TYPING_IN_CHAT`] for a conversation, even
    /// when the record used the overloaded code 61.
    pub fn code(&self) -> i64 {
        match self {
            Self::MessageAdded(_)          => code::ADD_MESSAGE,
            Self::MessageFlagsReplaced(_)  => code::REPLACE_MESSAGE_FLAGS,
            Self::MessageFlagsInstalled(_) => code::INSTALL_MESSAGE_FLAGS,
            Self::MessageFlagsReset(_)     => code::RESET_MESSAGE_FLAGS,
            Self::MessagesRead { direction: ReadDirection::Incoming, .. } => code::READ_INCOMING,
            Self::MessagesRead { direction: ReadDirection::Outgoing, .. } => code::READ_OUTGOING,
            Self::PresenceChanged(p) if p.online => code::FRIEND_ONLINE,
            Self::PresenceChanged(_)       => code::FRIEND_OFFLINE,
            Self::DialogFlagsChanged { op: FlagOp::Reset, .. }   => code::RESET_DIALOG_FLAGS,
            Self::DialogFlagsChanged { op: FlagOp::Replace, .. } => code::REPLACE_DIALOG_FLAGS,
            Self::DialogFlagsChanged { op: FlagOp::Install, .. } => code::INSTALL_DIALOG_FLAGS,
            Self::ConversationChanged { .. }  => code::CONVERSATION_CHANGED,
            Self::TypingStarted { scope: TypingScope::Dialog, .. } => code::USER_TYPING,
            Self::TypingStarted { .. }        => code::USER_TYPING_IN_CHAT,
            Self::CallCompleted { .. }        => code::USER_CALL,
            Self::UnreadCounterChanged { .. } => code::COUNTER_UPDATE,
            Self::NotificationSettingsChanged { .. } => code::NOTIFY_SETTINGS_CHANGED,
            Self::Unknown { code }            => *code,
        }
    }

    pub fn as_message(&self) -> Option<&MessageAdded> {
        match self {
            Self::MessageAdded(m) => Some(m),
            _ => None,
        }
    }

    pub fn into_message(self) -> Option<MessageAdded> {
        match self {
            Self::MessageAdded(m) => Some(m),
            _ => None,
        }
    }
}
