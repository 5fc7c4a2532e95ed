//! Record types for persisted conversations
//!
//! The wire format mirrors the host application's JSON documents, so all
//! persisted structs serialize with camelCase field names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Originator of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// Message typed by the person using the assistant
    User,
    /// Message produced by the assistant
    Ai,
}

/// A single chat message owned by a conversation
///
/// Messages have no lifecycle of their own; they are persisted and
/// replaced wholesale with their parent conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique message identifier (ULID)
    pub id: String,

    /// Who produced the message
    pub sender: Sender,

    /// Message body text
    pub text: String,

    /// Reference to an assistant-generated image, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// References to images uploaded alongside the message, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_images: Option<Vec<String>>,

    /// Follow-up suggestion strings offered with the message, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,

    /// When the message was produced, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Message {
    /// Create a message with a fresh id and the given sender and text
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: Ulid::new().to_string(),
            sender,
            text: text.into(),
            image_url: None,
            uploaded_images: None,
            suggestions: None,
            timestamp: Some(Utc::now()),
        }
    }

    /// Create a user message
    ///
    /// # Examples
    ///
    /// ```
    /// use carelog::history::{Message, Sender};
    ///
    /// let msg = Message::user("Hello");
    /// assert_eq!(msg.sender, Sender::User);
    /// assert_eq!(msg.text, "Hello");
    /// ```
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text)
    }

    /// Create an assistant message
    pub fn ai(text: impl Into<String>) -> Self {
        Self::new(Sender::Ai, text)
    }

    /// Attach a generated-image reference
    pub fn with_generated_image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    /// Attach uploaded-image references
    pub fn with_uploaded_images(mut self, urls: Vec<String>) -> Self {
        self.uploaded_images = Some(urls);
        self
    }

    /// Attach follow-up suggestions
    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = Some(suggestions);
        self
    }

    /// Returns true if the message carries any image content
    pub fn has_image_content(&self) -> bool {
        self.image_url.is_some()
            || self
                .uploaded_images
                .as_ref()
                .map(|u| !u.is_empty())
                .unwrap_or(false)
    }
}

/// A persisted conversation with its message history and derived metadata
///
/// The unit of persistence. Derived fields (`title`, `summary`, `tags`,
/// `has_images`) are recomputed on every commit; `total_messages` records
/// the true logical count even when the stored `messages` sequence has
/// been truncated to the configured cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Unique conversation identifier (ULID), assigned at creation
    pub id: String,

    /// Short human label, derived from the first user message
    pub title: String,

    /// Ordered message history, replaced wholesale on each commit
    pub messages: Vec<Message>,

    /// When the conversation was first committed
    pub created_at: DateTime<Utc>,

    /// When the conversation was last committed; never before `created_at`
    pub updated_at: DateTime<Utc>,

    /// Derived one-line description of the conversation's subject
    pub summary: String,

    /// Derived keyword tags, at most five, unique
    #[serde(default)]
    pub tags: Vec<String>,

    /// Opaque description carried across turns for visual consistency,
    /// owned by the assistant collaborator and merely stored here
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_description: Option<String>,

    /// True logical message count at the time of the last commit
    pub total_messages: usize,

    /// Whether any stored message carries image content
    #[serde(default)]
    pub has_images: bool,
}

impl Conversation {
    /// Text of the most recent message, if any
    pub fn last_message_text(&self) -> Option<&str> {
        self.messages.last().map(|m| m.text.as_str())
    }

    /// Read-only projection for list views
    pub fn to_summary(&self) -> ConversationSummary {
        ConversationSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            summary: self.summary.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            message_count: self.total_messages,
            has_images: self.has_images,
            tags: self.tags.clone(),
            last_message: self
                .last_message_text()
                .map(|t| t.to_string())
                .unwrap_or_default(),
        }
    }
}

/// Read-only projection of a conversation for list views
///
/// Never persisted independently; always recomputed from the full
/// [`Conversation`] record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    /// Conversation id
    pub id: String,
    /// Conversation title
    pub title: String,
    /// Derived subject line
    pub summary: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last commit time
    pub updated_at: DateTime<Utc>,
    /// True logical message count
    pub message_count: usize,
    /// Whether any message carries image content
    pub has_images: bool,
    /// Derived keyword tags
    pub tags: Vec<String>,
    /// Text of the most recent stored message
    pub last_message: String,
}

/// Generate a new ULID for a conversation
///
/// ULIDs are preferred over UUIDs as they are sortable by timestamp and
/// more human-readable.
///
/// # Examples
///
/// ```
/// use carelog::history::new_conversation_id;
///
/// let id = new_conversation_id();
/// assert_eq!(id.len(), 26);
/// ```
pub fn new_conversation_id() -> String {
    Ulid::new().to_string()
}
