//! Order-preserving filters that turn the full email list plus a user's
//! mark sets into the feed and profile views.

use std::collections::HashSet;

use crate::db::models::Email;

/// Emails not yet read by the user, in the input order. An empty id set
/// returns the input unchanged.
pub fn compose_feed(all: Vec<Email>, read_ids: &HashSet<String>) -> Vec<Email> {
    all.into_iter()
        .filter(|email| !read_ids.contains(&email.email_id))
        .collect()
}

/// Only the emails the user has flagged, in the input order. An empty id
/// set returns nothing.
pub fn compose_flagged(all: Vec<Email>, flagged_ids: &HashSet<String>) -> Vec<Email> {
    all.into_iter()
        .filter(|email| flagged_ids.contains(&email.email_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{compose_feed, compose_flagged};
    use crate::db::models::Email;

    fn email(id: &str) -> Email {
        Email {
            email_id: id.to_string(),
            sender_email: "sender@example.com".to_string(),
            sender_name: "Sender".to_string(),
            subject: format!("Subject {id}"),
            has_attachment: false,
            attachments: vec![],
            content: "<p>Hi</p>".to_string(),
            links: vec![],
            relevant_dates: "null".to_string(),
            venue: String::new(),
            email_url: format!("https://outlook.example/{id}"),
            is_read: false,
            is_flagged: false,
            time_received: "2026-02-01T12:00:00Z".to_string(),
        }
    }

    fn ids(emails: &[Email]) -> Vec<&str> {
        emails.iter().map(|e| e.email_id.as_str()).collect()
    }

    fn set(values: &[&str]) -> HashSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn feed_excludes_read_ids_and_preserves_order() {
        let all = vec![email("a"), email("b"), email("c")];
        let result = compose_feed(all, &set(&["b"]));
        assert_eq!(ids(&result), vec!["a", "c"]);
    }

    #[test]
    fn feed_with_no_read_ids_is_unchanged() {
        let all = vec![email("a"), email("b"), email("c")];
        let result = compose_feed(all.clone(), &HashSet::new());
        assert_eq!(result, all);
    }

    #[test]
    fn feed_with_everything_read_is_empty() {
        let all = vec![email("a"), email("b")];
        assert!(compose_feed(all, &set(&["a", "b"])).is_empty());
    }

    #[test]
    fn flagged_includes_only_flagged_ids_in_order() {
        let all = vec![email("a"), email("b"), email("c")];
        let result = compose_flagged(all, &set(&["a", "c"]));
        assert_eq!(ids(&result), vec!["a", "c"]);
    }

    #[test]
    fn flagged_with_no_ids_is_empty() {
        let all = vec![email("a"), email("b")];
        assert!(compose_flagged(all, &HashSet::new()).is_empty());
    }

    #[test]
    fn unknown_flagged_ids_match_nothing() {
        let all = vec![email("a")];
        assert!(compose_flagged(all, &set(&["zz"])).is_empty());
    }
}
