//! Bitmask decoders for message flags, dialog flags, answer options and
//! the presence platform id.
//!
//! Every mask type is a thin `u64` newtype.  Bits that have no assigned
//! meaning are kept in the mask and surface as `Unknown(bit_index)` when
//! iterating, so `mask -> set -> mask` never loses information.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

// ─── flag_set! ────────────────────────────────────────────────────────────────

/// Generates a mask newtype plus its companion single-bit enum.
///
/// Each entry reads `Variant => CONST = mask`, where `mask` is a literal with
/// exactly one bit set.
macro_rules! flag_set {
    (
        $(#[$set_meta:meta])*
        pub struct $set:ident;

        $(#[$bit_meta:meta])*
        pub enum $bit:ident {
            $(
                $(#[$v_meta:meta])*
                $variant:ident => $konst:ident = $value:literal,
            )*
        }
    ) => {
        $(#[$bit_meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize))]
        pub enum $bit {
            $(
                $(#[$v_meta])*
                $variant,
            )*
            /// A bit with no assigned meaning; carries the bit index (0 = lowest).
            Unknown(u8),
        }

        impl $bit {
            /// The bit at position `index` (0 = lowest).
            pub fn from_index(index: u8) -> Self {
                match 1u64.checked_shl(u32::from(index)).unwrap_or(0) {
                    $( $value => Self::$variant, )*
                    _ => Self::Unknown(index),
                }
            }

            /// The single-bit mask for this flag.  `Unknown` indices ≥ 64 map to 0.
            pub fn mask(self) -> u64 {
                match self {
                    $( Self::$variant => $value, )*
                    Self::Unknown(i) => 1u64.checked_shl(u32::from(i)).unwrap_or(0),
                }
            }
        }

        $(#[$set_meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        pub struct $set(u64);

        impl $set {
            $(
                $(#[$v_meta])*
                pub const $konst: Self = Self($value);
            )*

            const KNOWN: u64 = 0 $( | $value )*;

            pub const fn empty() -> Self { Self(0) }

            /// Total: every mask is accepted, unassigned bits included.
            pub const fn from_bits(mask: u64) -> Self { Self(mask) }

            pub const fn bits(self) -> u64 { self.0 }

            pub const fn is_empty(self) -> bool { self.0 == 0 }

            /// `true` if every bit of `other` is set in `self`.
            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            pub fn insert(&mut self, other: Self) { self.0 |= other.0; }

            pub fn remove(&mut self, other: Self) { self.0 &= !other.0; }

            /// The bits with no named constant.
            pub const fn unknown_bits(self) -> u64 { self.0 & !Self::KNOWN }

            /// Iterate over the set bits, lowest first.
            pub fn iter(self) -> impl Iterator<Item = $bit> {
                (0..64u8)
                    .filter(move |i| self.0 & (1u64 << *i) != 0)
                    .map($bit::from_index)
            }
        }

        impl From<$bit> for $set {
            fn from(bit: $bit) -> Self { Self(bit.mask()) }
        }

        impl FromIterator<$bit> for $set {
            fn from_iter<I: IntoIterator<Item = $bit>>(iter: I) -> Self {
                Self(iter.into_iter().fold(0, |acc, b| acc | b.mask()))
            }
        }

        impl BitOr for $set {
            type Output = Self;
            fn bitor(self, rhs: Self) -> Self { Self(self.0 | rhs.0) }
        }

        impl BitOrAssign for $set {
            fn bitor_assign(&mut self, rhs: Self) { self.0 |= rhs.0; }
        }

        impl BitAnd for $set {
            type Output = Self;
            fn bitand(self, rhs: Self) -> Self { Self(self.0 & rhs.0) }
        }

        impl fmt::Debug for $set {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}(", stringify!($set))?;
                let mut first = true;
                $(
                    if self.0 & $value != 0 {
                        if !first { f.write_str(" | ")?; }
                        f.write_str(stringify!($konst))?;
                        first = false;
                    }
                )*
                let unknown = self.unknown_bits();
                if unknown != 0 {
                    if !first { f.write_str(" | ")?; }
                    write!(f, "{unknown:#x}")?;
                }
                f.write_str(")")
            }
        }
    };
}

// ─── MessageFlags ─────────────────────────────────────────────────────────────

flag_set! {
    /// Per-message flags; the server sends their sum.
    pub struct MessageFlags;

    /// A single message flag bit.
    pub enum MessageFlag {
        /// Message is unread.
        Unread    => UNREAD    = 1,
        /// Message is outgoing (sent by this account).
        Outbox    => OUTBOX    = 2,
        /// Message was answered.
        Replied   => REPLIED   = 4,
        /// Message is marked as important.
        Important => IMPORTANT = 8,
        /// Message was sent via a chat.
        Chat      => CHAT      = 16,
        /// Message was sent by a friend.
        Friends   => FRIENDS   = 32,
        /// Message is marked as spam.
        Spam      => SPAM      = 64,
        /// Message was deleted.
        Deleted   => DELETED   = 128,
        /// Message was user-checked for spam.
        Fixed     => FIXED     = 256,
        /// Message has media content.
        Media     => MEDIA     = 512,
    }
}

impl MessageFlags {
    /// `true` if the message was sent by the account that owns the session.
    pub const fn is_outbox(self) -> bool {
        self.contains(Self::OUTBOX)
    }
}

// ─── DialogFlags ──────────────────────────────────────────────────────────────

flag_set! {
    /// Dialog flags.  Only set for community dialogs.
    pub struct DialogFlags;

    /// A single dialog flag bit.
    pub enum DialogFlag {
        /// Important dialog.
        Important => IMPORTANT = 1,
        /// Dialog with a community reply.
        Answered  => ANSWERED  = 2,
    }
}

// ─── AnswerOptions ────────────────────────────────────────────────────────────

flag_set! {
    /// Extra answer options, sent as the `mode` parameter of a fetch.
    pub struct AnswerOptions;

    /// A single answer option bit.
    pub enum AnswerOption {
        /// Receive attachments.
        ReceiveAttachments => RECEIVE_ATTACHMENTS = 2,
        /// Receive the expanded set of events.
        ExpandedEvents     => EXPANDED_EVENTS     = 8,
        /// Return pts.
        ReceivePts         => RECEIVE_PTS         = 32,
        /// Return `$extra` for friend-online events (code 8).
        ReceiveExtra       => RECEIVE_EXTRA       = 64,
        /// Return `random_id` with messages.
        ReceiveRandomId    => RECEIVE_RANDOM_ID   = 128,
    }
}

// ─── Platform ─────────────────────────────────────────────────────────────────

/// The platform a friend came online from (low byte of the presence `$extra`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Platform {
    /// Mobile website or an unidentified mobile app.
    Mobile,
    IPhone,
    IPad,
    Android,
    WindowsPhone,
    /// Official Windows 8 app.
    Windows,
    /// Full website or an unidentified app.
    Web,
    Unknown(u8),
}

impl Platform {
    pub fn from_id(id: u8) -> Self {
        match id {
            1 => Self::Mobile,
            2 => Self::IPhone,
            3 => Self::IPad,
            4 => Self::Android,
            5 => Self::WindowsPhone,
            6 => Self::Windows,
            7 => Self::Web,
            other => Self::Unknown(other),
        }
    }

    pub fn id(self) -> u8 {
        match self {
            Self::Mobile       => 1,
            Self::IPhone       => 2,
            Self::IPad         => 3,
            Self::Android      => 4,
            Self::WindowsPhone => 5,
            Self::Windows      => 6,
            Self::Web          => 7,
            Self::Unknown(id)  => id,
        }
    }
}

// ─── Free-function decoders ───────────────────────────────────────────────────

pub fn decode_message_flags(mask: u64) -> MessageFlags {
    MessageFlags::from_bits(mask)
}

pub fn decode_dialog_flags(mask: u64) -> DialogFlags {
    DialogFlags::from_bits(mask)
}

pub fn decode_answer_options(mask: u64) -> AnswerOptions {
    AnswerOptions::from_bits(mask)
}

/// Platform id from a presence `$extra` value (`extra & 0xFF`).
/// Returns `None` when the low byte is zero (no platform reported).
pub fn decode_platform(extra: i64) -> Option<Platform> {
    match (extra & 0xFF) as u8 {
        0  => None,
        id => Some(Platform::from_id(id)),
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
