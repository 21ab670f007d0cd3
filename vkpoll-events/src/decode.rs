//! Positional decoder for raw update records.
//!
//! Dispatch is a table keyed on the event code.  Each entry names the minimum
//! arity of the record and the function that maps its fields; codes with no
//! entry decode to [`Event::Unknown`].
//!
//! Code 61 is shared by two shapes, `[61, user_id, flags]` (dialog, `flags`
//! is always `1`) and `[61, user_id, chat_id]` (conversation).  The tie-break
//! is the third field: absent or `1` means dialog, any other value is the
//! conversation id.  Typing in conversation `1` therefore cannot be told
//! apart from dialog typing under code 61; code 62 carries no such ambiguity.

use std::fmt;

use serde_json::Value;

use crate::event::*;
use crate::flags::{DialogFlags, MessageFlags, decode_platform};

// ─── DecodeError ──────────────────────────────────────────────────────────────

/// Why a single record could not be decoded.
#[derive(Clone, Debug, PartialEq)]
pub enum DecodeError {
    /// The record has no elements.
    Empty,
    /// Element 0 is not an integer.
    InvalidCode(Value),
    /// Fewer elements than the layout for `code` requires.
    Arity { code: i64, expected: usize, got: usize },
    /// Element `index` is missing or of the wrong type.
    Field { code: i64, index: usize, expected: &'static str },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty update record"),
            Self::InvalidCode(v) => write!(f, "event code is not an integer: {v}"),
            Self::Arity { code, expected, got } => {
                write!(f, "event {code}: expected at least {expected} elements, got {got}")
            }
            Self::Field { code, index, expected } => {
                write!(f, "event {code}: element {index} is not {expected}")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

// ─── Value helpers ────────────────────────────────────────────────────────────

/// Integer from a JSON number or a numeric string.
pub(crate) fn as_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Non-negative integer from a JSON number or a numeric string.
pub(crate) fn as_u64(v: &Value) -> Option<u64> {
    match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

struct Fields<'a> {
    code:  i64,
    items: &'a [Value],
}

impl<'a> Fields<'a> {
    fn field_err(&self, index: usize, expected: &'static str) -> DecodeError {
        DecodeError::Field { code: self.code, index, expected }
    }

    fn int(&self, index: usize) -> Result<i64, DecodeError> {
        self.items.get(index).and_then(as_i64).ok_or_else(|| self.field_err(index, "an integer"))
    }

    fn mask(&self, index: usize) -> Result<u64, DecodeError> {
        self.items.get(index).and_then(as_u64).ok_or_else(|| self.field_err(index, "a bitmask"))
    }

    fn text(&self, index: usize) -> Result<&'a str, DecodeError> {
        self.items.get(index).and_then(Value::as_str).ok_or_else(|| self.field_err(index, "a string"))
    }

    /// `None` when absent; an error when present with the wrong type.
    fn opt_int(&self, index: usize) -> Result<Option<i64>, DecodeError> {
        match self.items.get(index) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => as_i64(v).map(Some).ok_or_else(|| self.field_err(index, "an integer")),
        }
    }
}

// ─── Dispatch table ───────────────────────────────────────────────────────────

type DecodeFn = fn(&Fields<'_>) -> Result<Event, DecodeError>;

struct Layout {
    code:   i64,
    arity:  usize,
    decode: DecodeFn,
}

const LAYOUTS: &[Layout] = &[
    Layout { code: code::REPLACE_MESSAGE_FLAGS,   arity: 3, decode: message_flags },
    Layout { code: code::INSTALL_MESSAGE_FLAGS,   arity: 3, decode: message_flags },
    Layout { code: code::RESET_MESSAGE_FLAGS,     arity: 3, decode: message_flags },
    Layout { code: code::ADD_MESSAGE,             arity: 6, decode: add_message },
    Layout { code: code::READ_INCOMING,           arity: 3, decode: messages_read },
    Layout { code: code::READ_OUTGOING,           arity: 3, decode: messages_read },
    Layout { code: code::FRIEND_ONLINE,           arity: 2, decode: presence },
    Layout { code: code::FRIEND_OFFLINE,          arity: 2, decode: presence },
    Layout { code: code::RESET_DIALOG_FLAGS,      arity: 3, decode: dialog_flags },
    Layout { code: code::REPLACE_DIALOG_FLAGS,    arity: 3, decode: dialog_flags },
    Layout { code: code::INSTALL_DIALOG_FLAGS,    arity: 3, decode: dialog_flags },
    Layout { code: code::CONVERSATION_CHANGED,    arity: 2, decode: conversation_changed },
    Layout { code: code::USER_TYPING,             arity: 2, decode: typing },
    Layout { code: code::USER_TYPING_IN_CHAT,     arity: 3, decode: typing },
    Layout { code: code::USER_CALL,               arity: 3, decode: call },
    Layout { code: code::COUNTER_UPDATE,          arity: 2, decode: counter },
    Layout { code: code::NOTIFY_SETTINGS_CHANGED, arity: 2, decode: notify_settings },
];

/// Decode one raw update.
///
/// Unrecognised codes yield `Ok(Event::Unknown { code })`.  Errors only ever
/// describe this record.
pub fn decode(raw: &RawUpdate) -> Result<Event, DecodeError> {
    let items = raw.fields();
    let first = items.first().ok_or(DecodeError::Empty)?;
    let code  = as_i64(first).ok_or_else(|| DecodeError::InvalidCode(first.clone()))?;

    let Some(layout) = LAYOUTS.iter().find(|l| l.code == code) else {
        return Ok(Event::Unknown { code });
    };
    if items.len() < layout.arity {
        return Err(DecodeError::Arity { code, expected: layout.arity, got: items.len() });
    }
    (layout.decode)(&Fields { code, items })
}

/// Decode every record of a batch, keeping batch order.
pub fn decode_batch(records: &[RawUpdate]) -> Vec<Result<Event, DecodeError>> {
    records.iter().map(decode).collect()
}

// ─── Per-code decoders ────────────────────────────────────────────────────────

fn message_flags(f: &Fields<'_>) -> Result<Event, DecodeError> {
    let update = MessageFlagsUpdate {
        message_id: f.int(1)?,
        mask:       MessageFlags::from_bits(f.mask(2)?),
        peer_id:    f.opt_int(3)?,
    };
    Ok(match f.code {
        code::REPLACE_MESSAGE_FLAGS => Event::MessageFlagsReplaced(update),
        code::INSTALL_MESSAGE_FLAGS => Event::MessageFlagsInstalled(update),
        _                           => Event::MessageFlagsReset(update),
    })
}

fn add_message(f: &Fields<'_>) -> Result<Event, DecodeError> {
    Ok(Event::MessageAdded(MessageAdded {
        id:        f.int(1)?,
        flags:     MessageFlags::from_bits(f.mask(2)?),
        user_id:   f.int(3)?,
        timestamp: f.opt_int(4)?.unwrap_or(0),
        text:      f.text(5)?.to_owned(),
        extras:    f.items[6..].to_vec(),
    }))
}

fn messages_read(f: &Fields<'_>) -> Result<Event, DecodeError> {
    let direction = if f.code == code::READ_INCOMING {
        ReadDirection::Incoming
    } else {
        ReadDirection::Outgoing
    };
    Ok(Event::MessagesRead { peer_id: f.int(1)?, local_id: f.int(2)?, direction })
}

fn presence(f: &Fields<'_>) -> Result<Event, DecodeError> {
    let online = f.code == code::FRIEND_ONLINE;
    let extra  = f.opt_int(2)?.unwrap_or(0);
    Ok(Event::PresenceChanged(PresenceChange {
        // Sent negated.
        user_id:   f.int(1)?.saturating_abs(),
        online,
        platform:  if online { decode_platform(extra) } else { None },
        extra,
        timestamp: f.opt_int(3)?,
    }))
}

fn dialog_flags(f: &Fields<'_>) -> Result<Event, DecodeError> {
    let op = match f.code {
        code::RESET_DIALOG_FLAGS   => FlagOp::Reset,
        code::REPLACE_DIALOG_FLAGS => FlagOp::Replace,
        _                          => FlagOp::Install,
    };
    Ok(Event::DialogFlagsChanged {
        peer_id: f.int(1)?,
        flags:   DialogFlags::from_bits(f.mask(2)?),
        op,
    })
}

fn conversation_changed(f: &Fields<'_>) -> Result<Event, DecodeError> {
    Ok(Event::ConversationChanged {
        chat_id: f.int(1)?,
        by_self: f.opt_int(2)? == Some(1),
    })
}

const DIALOG_TYPING_MARKER: i64 = 1;

fn typing(f: &Fields<'_>) -> Result<Event, DecodeError> {
    let user_id = f.int(1)?;
    let scope = if f.code == code::USER_TYPING_IN_CHAT {
        TypingScope::Conversation { chat_id: f.int(2)? }
    } else {
        match f.opt_int(2)? {
            Some(chat_id) if chat_id != DIALOG_TYPING_MARKER => TypingScope::Conversation { chat_id },
            _ => TypingScope::Dialog,
        }
    };
    Ok(Event::TypingStarted { user_id, scope })
}

fn call(f: &Fields<'_>) -> Result<Event, DecodeError> {
    Ok(Event::CallCompleted { user_id: f.int(1)?, call_id: f.int(2)? })
}

fn counter(f: &Fields<'_>) -> Result<Event, DecodeError> {
    Ok(Event::UnreadCounterChanged { count: f.int(1)? })
}

/// Accepts `[114, {peer_id, sound, disabled_until}]` and the flat
/// `[114, peer_id, sound, disabled_until]`.
fn notify_settings(f: &Fields<'_>) -> Result<Event, DecodeError> {
    let (peer_id, sound, disabled_until) = match &f.items[1] {
        Value::Object(obj) => {
            let bad = || f.field_err(1, "a settings object");
            let key = |name: &str| obj.get(name).and_then(as_i64).ok_or_else(bad);
            let disabled_until = match obj.get("disabled_until") {
                None | Some(Value::Null) => 0,
                Some(v) => as_i64(v).ok_or_else(bad)?,
            };
            (key("peer_id")?, key("sound")?, disabled_until)
        }
        _ => (f.int(1)?, f.int(2)?, f.opt_int(3)?.unwrap_or(0)),
    };
    Ok(Event::NotificationSettingsChanged {
        peer_id,
        sound_enabled: sound != 0,
        muted_until:   MutedUntil::from_raw(disabled_until),
    })
}

// ─── Tests ────────────────────────────────────────────────────────────────────
