//! Notification texts for the editorial workflow.

use newsdesk_shared::types::ArticleStatus;

use crate::message::PushMessage;

/// Sent to admins when an author submits an article for review.
pub fn new_article_submitted(author: &str, title: &str, article_id: &str) -> PushMessage {
    PushMessage::new(
        "📝 New Article Submitted",
        format!("{} submitted a new article: {}", author, title),
    )
    .with_data("type", "new_article")
    .with_data("article_id", article_id)
    .with_data("action", "review")
}

/// Sent to the author when an admin changes their article's status.
pub fn status_changed_for_author(status: ArticleStatus, title: &str, article_id: &str) -> PushMessage {
    let heading = match status {
        ArticleStatus::Published => "🎉 Your article has been published!",
        ArticleStatus::Rejected => "❌ Your article was rejected",
        ArticleStatus::PendingReview => "⏳ Your article is pending review",
    };
    status_change(heading, title.to_string(), status, article_id)
}

/// Sent to admins when an article's status changes.
pub fn status_changed_for_admins(
    status: ArticleStatus,
    author: &str,
    title: &str,
    article_id: &str,
) -> PushMessage {
    let (heading, body) = match status {
        ArticleStatus::Published => (
            "📢 Article Published",
            format!("{}'s article '{}' is now live", author, title),
        ),
        ArticleStatus::Rejected => (
            "❌ Article Rejected",
            format!("{}'s article '{}' was rejected", author, title),
        ),
        ArticleStatus::PendingReview => (
            "⏳ Article Pending Review",
            format!("{}'s article '{}' is pending review", author, title),
        ),
    };
    status_change(heading, body, status, article_id)
}

fn status_change(heading: &str, body: String, status: ArticleStatus, article_id: &str) -> PushMessage {
    PushMessage::new(heading, body)
        .with_data("type", "article_status_change")
        .with_data("article_id", article_id)
        .with_data("status", status.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_article_submitted() {
        let msg = new_article_submitted("Jane", "Rust 2.0", "a1");
        assert_eq!(msg.title, "📝 New Article Submitted");
        assert_eq!(msg.body, "Jane submitted a new article: Rust 2.0");
        assert_eq!(msg.data["type"], "new_article");
        assert_eq!(msg.data["article_id"], "a1");
        assert_eq!(msg.data["action"], "review");
    }

    #[test]
    fn test_author_status_titles() {
        let published = status_changed_for_author(ArticleStatus::Published, "T", "a1");
        assert_eq!(published.title, "🎉 Your article has been published!");
        assert_eq!(published.body, "T");
        assert_eq!(published.data["status"], "published");

        let rejected = status_changed_for_author(ArticleStatus::Rejected, "T", "a1");
        assert_eq!(rejected.title, "❌ Your article was rejected");
    }

    #[test]
    fn test_admin_status_bodies() {
        let msg = status_changed_for_admins(ArticleStatus::Published, "Jane", "T", "a1");
        assert_eq!(msg.title, "📢 Article Published");
        assert_eq!(msg.body, "Jane's article 'T' is now live");
        assert_eq!(msg.data["type"], "article_status_change");

        let pending = status_changed_for_admins(ArticleStatus::PendingReview, "Jane", "T", "a1");
        assert_eq!(pending.body, "Jane's article 'T' is pending review");
    }
}
