//! Types for the messages module

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::error::MessageError;
use crate::conversations::types::ConversationFlags;

/// Display name stored on rows that we authored.
///
/// Direction is derived from this sentinel rather than a separate column.
pub const LOCAL_DISPLAY_NAME: &str = "Me";

/// A 1:1 chat message, keyed by `(peer_key, timestamp)`.
///
/// `timestamp` is the logical message time and may be rewritten once (for a value
/// transfer, to the chain confirmation time).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Messaging key of the other party
    pub peer_key: String,
    /// Author display name, [`LOCAL_DISPLAY_NAME`] for our own messages
    pub display_name: String,
    /// Kind of message
    pub kind: MessageKind,
    /// Opaque encoded payload
    pub body: String,
    /// Amount moved by a charm or token message
    pub attached_amount: Option<String>,
    /// Lifecycle state
    pub state: MessageState,
    /// Logical message time in milliseconds
    pub timestamp: u64,
}

impl ChatMessage {
    /// Whether this message was authored locally
    pub fn is_from_me(&self) -> bool {
        self.display_name == LOCAL_DISPLAY_NAME
    }

    /// Whether this message carries a value transfer
    pub fn is_value_transfer(&self) -> bool {
        matches!(self.kind, MessageKind::Charm | MessageKind::Token)
    }
}

/// Latest message of a conversation plus its unread count and flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    /// Most recent message with this peer
    pub last_message: ChatMessage,
    /// Remote messages newer than the last-opened marker
    pub unread_count: u32,
    /// Per-peer flags
    pub flags: ConversationFlags,
}

/// Kind of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MessageKind {
    /// Plain text
    Text,
    /// Animated charm with an attached transfer
    Charm,
    /// Plain token transfer
    Token,
    /// Receipt marker row
    ReceiptMarker,
}

impl MessageKind {
    /// Get as `&str`
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::Charm => "charm",
            Self::Token => "token",
            Self::ReceiptMarker => "receipt",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = MessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "charm" => Ok(Self::Charm),
            "token" => Ok(Self::Token),
            "receipt" => Ok(Self::ReceiptMarker),
            _ => Err(MessageError::InvalidParameters(format!(
                "Invalid message kind: {}",
                s
            ))),
        }
    }
}

impl Serialize for MessageKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MessageKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Lifecycle state of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MessageState {
    /// Stored locally, outcome not yet known
    Pending,
    /// Handed to the transport (or confirmed on chain for a transfer)
    Sent,
    /// The peer acknowledged receipt
    Delivered,
    /// The peer opened the conversation
    Read,
    /// Terminal failure
    Failed,
}

impl MessageState {
    /// Get as `&str`
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Read => "read",
            Self::Failed => "failed",
        }
    }

    /// Whether a receipt may move a message from `self` to `next`.
    ///
    /// Receipts only ever advance along sent -> delivered -> read.
    pub fn accepts_receipt(&self, next: MessageState) -> bool {
        matches!(
            (self, next),
            (Self::Sent, Self::Delivered) | (Self::Sent, Self::Read) | (Self::Delivered, Self::Read)
        )
    }
}

impl fmt::Display for MessageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MessageState {
    type Err = MessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "sent" => Ok(Self::Sent),
            "delivered" => Ok(Self::Delivered),
            "read" => Ok(Self::Read),
            "failed" => Ok(Self::Failed),
            _ => Err(MessageError::InvalidParameters(format!(
                "Invalid message state: {}",
                s
            ))),
        }
    }
}

impl Serialize for MessageState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MessageState {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}
