//! Derived metadata for conversations
//!
//! Stateless pure functions that compute titles, summaries, keyword tags
//! and the search predicate from a conversation's message list. The
//! repository calls these when constructing or updating a record; they
//! hold no state of their own.

use crate::history::types::{ConversationSummary, Message, Sender};

/// Label used when a title cannot be derived from the message text
pub const FALLBACK_TITLE: &str = "New Conversation";

/// Tag attached when any message in the conversation carries image content
pub const IMAGE_TAG: &str = "Images";

/// Fixed vocabulary of domain keywords scanned for tag derivation.
///
/// Entries are matched case-insensitively as substrings of the
/// concatenated message text. Multi-word entries match as phrases.
const TAG_VOCABULARY: &[&str] = &[
    "allergy",
    "anxiety",
    "asthma",
    "blood pressure",
    "cholesterol",
    "diabetes",
    "diet",
    "exercise",
    "fever",
    "headache",
    "heart",
    "medication",
    "nutrition",
    "pain",
    "pregnancy",
    "skin rash",
    "sleep",
    "stress",
    "vaccination",
];

/// Derive a short human label from the first user message text
///
/// Strips punctuation, collapses runs of whitespace, and truncates to
/// `max_chars` with an ellipsis marker. Falls back to a generic label
/// when the source text is empty after stripping.
///
/// # Examples
///
/// ```
/// use carelog::history::index::derive_title;
///
/// assert_eq!(derive_title("What's up, doc?!", 50), "Whats up doc");
/// assert_eq!(derive_title("...", 50), "New Conversation");
/// ```
pub fn derive_title(text: &str, max_chars: usize) -> String {
    let stripped: String = text
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.is_empty() {
        return FALLBACK_TITLE.to_string();
    }

    truncate_with_ellipsis(&collapsed, max_chars)
}

/// Derive a one-line subject preview from the message list
///
/// Built from the first user message, truncated to `max_chars`. If the
/// conversation has no user message yet, the first message of any
/// sender is used instead.
pub fn derive_summary(messages: &[Message], max_chars: usize) -> String {
    let source = messages
        .iter()
        .find(|m| m.sender == Sender::User)
        .or_else(|| messages.first());

    match source {
        Some(message) => truncate_with_ellipsis(message.text.trim(), max_chars),
        None => String::new(),
    }
}

/// Derive keyword tags from the message list
///
/// Scans the concatenated message text against the fixed vocabulary
/// (case-insensitive), capitalizing each match. A synthetic image tag is
/// prepended when any message carries image content. The result is
/// capped at `max_tags` entries and contains no duplicates.
///
/// # Examples
///
/// ```
/// use carelog::history::index::derive_tags;
/// use carelog::history::Message;
///
/// let messages = vec![Message::user("my blood pressure is high")];
/// assert_eq!(derive_tags(&messages, 5), vec!["Blood Pressure"]);
/// ```
pub fn derive_tags(messages: &[Message], max_tags: usize) -> Vec<String> {
    let mut tags = Vec::new();

    if messages.iter().any(|m| m.has_image_content()) {
        tags.push(IMAGE_TAG.to_string());
    }

    let haystack = messages
        .iter()
        .map(|m| m.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    for keyword in TAG_VOCABULARY {
        if haystack.contains(keyword) {
            tags.push(capitalize_words(keyword));
        }
    }

    tags.truncate(max_tags);
    tags
}

/// Search predicate over a conversation summary
///
/// Case-insensitive substring match over title, summary, last-message
/// text, and tags. An empty query matches everything.
pub fn matches_query(summary: &ConversationSummary, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }

    summary.title.to_lowercase().contains(&query)
        || summary.summary.to_lowercase().contains(&query)
        || summary.last_message.to_lowercase().contains(&query)
        || summary
            .tags
            .iter()
            .any(|t| t.to_lowercase().contains(&query))
}

/// Truncates a string to a maximum character count, adding an ellipsis
/// marker when truncated
fn truncate_with_ellipsis(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut truncated: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    truncated.push_str("...");
    truncated
}

/// Uppercases the first letter of each whitespace-separated word
fn capitalize_words(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::history::types::Conversation;

    fn summary_from(messages: Vec<Message>) -> ConversationSummary {
        let now = Utc::now();
        Conversation {
            id: "test".to_string(),
            title: derive_title(
                messages
                    .iter()
                    .find(|m| m.sender == Sender::User)
                    .map(|m| m.text.as_str())
                    .unwrap_or(""),
                50,
            ),
            summary: derive_summary(&messages, 120),
            tags: derive_tags(&messages, 5),
            created_at: now,
            updated_at: now,
            total_messages: messages.len(),
            has_images: messages.iter().any(|m| m.has_image_content()),
            character_description: None,
            messages,
        }
        .to_summary()
    }

    #[test]
    fn test_derive_title_strips_punctuation() {
        assert_eq!(derive_title("Hello, world!", 50), "Hello world");
        assert_eq!(derive_title("What's next?", 50), "Whats next");
    }

    #[test]
    fn test_derive_title_collapses_whitespace() {
        assert_eq!(derive_title("  too   many\tspaces \n", 50), "too many spaces");
    }

    #[test]
    fn test_derive_title_truncates_with_ellipsis() {
        let long = "this message goes on and on well past the title limit";
        let title = derive_title(long, 20);
        assert_eq!(title.chars().count(), 20);
        assert!(title.ends_with("..."));
    }

    #[test]
    fn test_derive_title_fallback_for_empty_input() {
        assert_eq!(derive_title("", 50), FALLBACK_TITLE);
        assert_eq!(derive_title("?!...,;:", 50), FALLBACK_TITLE);
        assert_eq!(derive_title("   ", 50), FALLBACK_TITLE);
    }

    #[test]
    fn test_derive_summary_uses_first_user_message() {
        let messages = vec![
            Message::ai("Hi, how can I help today?"),
            Message::user("My knee hurts when I run"),
            Message::user("It started last week"),
        ];
        assert_eq!(derive_summary(&messages, 120), "My knee hurts when I run");
    }

    #[test]
    fn test_derive_summary_falls_back_to_first_message() {
        let messages = vec![Message::ai("Welcome back!")];
        assert_eq!(derive_summary(&messages, 120), "Welcome back!");
        assert_eq!(derive_summary(&[], 120), "");
    }

    #[test]
    fn test_derive_summary_truncates() {
        let messages = vec![Message::user("a".repeat(300))];
        let summary = derive_summary(&messages, 120);
        assert_eq!(summary.chars().count(), 120);
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn test_derive_tags_matches_vocabulary_case_insensitively() {
        let messages = vec![
            Message::user("I was diagnosed with DIABETES last year"),
            Message::ai("Managing diabetes starts with nutrition and exercise"),
        ];
        let tags = derive_tags(&messages, 5);
        assert!(tags.contains(&"Diabetes".to_string()));
        assert!(tags.contains(&"Nutrition".to_string()));
        assert!(tags.contains(&"Exercise".to_string()));
    }

    #[test]
    fn test_derive_tags_capitalizes_multiword_phrases() {
        let messages = vec![Message::user("my blood pressure and this skin rash worry me")];
        let tags = derive_tags(&messages, 5);
        assert!(tags.contains(&"Blood Pressure".to_string()));
        assert!(tags.contains(&"Skin Rash".to_string()));
    }

    #[test]
    fn test_derive_tags_adds_image_tag() {
        let messages =
            vec![Message::user("what is this?").with_uploaded_images(vec!["blob:1".to_string()])];
        let tags = derive_tags(&messages, 5);
        assert_eq!(tags[0], IMAGE_TAG);
    }

    #[test]
    fn test_derive_tags_caps_at_limit() {
        let messages = vec![Message::user(
            "diabetes diet exercise fever headache heart medication sleep stress",
        )];
        let tags = derive_tags(&messages, 5);
        assert_eq!(tags.len(), 5);
    }

    #[test]
    fn test_derive_tags_no_duplicates() {
        let messages = vec![
            Message::user("headache again"),
            Message::user("the headache is back"),
        ];
        let tags = derive_tags(&messages, 5);
        assert_eq!(tags, vec!["Headache".to_string()]);
    }

    #[test]
    fn test_derive_tags_is_idempotent() {
        let messages = vec![
            Message::user("anxiety and poor sleep").with_uploaded_images(vec!["b".to_string()]),
            Message::ai("let's work through it"),
        ];
        let first = derive_tags(&messages, 5);
        let second = derive_tags(&messages, 5);
        assert_eq!(first, second);
    }

    #[test]
    fn test_derive_summary_is_idempotent() {
        let messages = vec![Message::user("chest pain after meals")];
        assert_eq!(derive_summary(&messages, 120), derive_summary(&messages, 120));
    }

    #[test]
    fn test_matches_query_over_all_fields() {
        let summary = summary_from(vec![
            Message::user("my blood pressure reading was 150 over 95"),
            Message::ai("That reading is elevated; let's review your log"),
        ]);

        // title and summary both carry "blood pressure"
        assert!(matches_query(&summary, "blood"));
        // last message text
        assert!(matches_query(&summary, "ELEVATED"));
        // tags
        assert!(matches_query(&summary, "blood pressure"));
        // no match
        assert!(!matches_query(&summary, "diabetes"));
    }

    #[test]
    fn test_matches_query_empty_matches_all() {
        let summary = summary_from(vec![Message::user("anything at all")]);
        assert!(matches_query(&summary, ""));
        assert!(matches_query(&summary, "   "));
    }

    #[test]
    fn test_truncate_with_ellipsis_char_boundaries() {
        // Multibyte input must not panic on a byte boundary.
        let s = "héllo wörld with ünicode çharacters everywhere";
        let out = truncate_with_ellipsis(s, 10);
        assert_eq!(out.chars().count(), 10);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn test_capitalize_words() {
        assert_eq!(capitalize_words("blood pressure"), "Blood Pressure");
        assert_eq!(capitalize_words("diabetes"), "Diabetes");
    }
}
