use crate::models::ChatDoc;

const TITLE_PREFIX_CHARS: usize = 30;

/// Derive a chat title from the first message: the leading 30 characters
/// followed by an ellipsis.
pub fn derive_title(first_message: &str) -> String {
    let prefix: String = first_message.trim().chars().take(TITLE_PREFIX_CHARS).collect();
    format!("{prefix}...")
}

/// Whether a chat still carries the placeholder title and should be
/// backfilled from its first message.
pub fn needs_title_backfill(title: &str) -> bool {
    title == ChatDoc::DEFAULT_TITLE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_message_keeps_full_text() {
        assert_eq!(derive_title("Hello"), "Hello...");
    }

    #[test]
    fn long_message_truncates_at_thirty_chars() {
        let text = "a".repeat(50);
        let title = derive_title(&text);
        assert_eq!(title, format!("{}...", "a".repeat(30)));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let text = "ä".repeat(40);
        let title = derive_title(&text);
        assert_eq!(title.chars().count(), 33);
    }

    #[test]
    fn backfill_only_for_placeholder() {
        assert!(needs_title_backfill("New Chat"));
        assert!(!needs_title_backfill("Trip planning..."));
    }
}
