//! # vkpoll-events
//!
//! Typed view of the VK messages long-poll stream.
//!
//! Every element of a fetch's `updates` array is a heterogeneous array whose
//! first element is an event code.  [`decode`] turns one such [`RawUpdate`]
//! into an [`Event`]; bitmask fields are exposed through the flag types in
//! [`flags`].
//!
//! ```rust
//! use vkpoll_events::{decode, Event, RawUpdate};
//! use serde_json::json;
//!
//! let raw = RawUpdate::from(json!([4, 17, 0, 555, 0, "hi"]));
//! match decode(&raw).unwrap() {
//!     Event::MessageAdded(m) => assert_eq!((m.id, m.user_id, m.text.as_str()), (17, 555, "hi")),
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```

#![deny(unsafe_code)]

pub mod decode;
pub mod event;
pub mod flags;

pub use decode::{DecodeError, decode, decode_batch};
pub use event::{
    Event, FlagOp, MessageAdded, MessageFlagsUpdate, MutedUntil, PresenceChange, RawUpdate,
    ReadDirection, TypingScope, code,
};
pub use flags::{
    AnswerOption, AnswerOptions, DialogFlag, DialogFlags, MessageFlag, MessageFlags, Platform,
    decode_answer_options, decode_dialog_flags, decode_message_flags, decode_platform,
};
