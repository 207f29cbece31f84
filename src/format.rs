use std::collections::HashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::notifications::wrapper::{Notification, NotificationAction};

static HYPERLINK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a\s[^>]*?href\s*=\s*(?:"([^"]*)"|'([^']*)')[^>]*>(.*?)</a\s*>"#)
        .expect("Failed to compile hyperlink regex")
});

static LEFTOVER_ANCHOR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<a(?:\s[^>]*)?>|</a\s*>")
        .expect("Failed to compile anchor regex")
});

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("unbalanced hyperlink markup near byte {0} of the body")]
    UnbalancedHyperlink(usize),
}

/// A notification ready for display: anchors rewritten to underlines and
/// their targets moved to `hyperlinks`, in body order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: u32,
    pub app_name: String,
    pub app_icon: String,
    pub summary: String,
    pub body: String,
    pub hints: HashMap<String, String>,
    pub actions: Vec<NotificationAction>,
    pub hyperlinks: Vec<String>,
    pub expire_timeout: i32,
}

pub trait Formatter {
    fn format(&self, notification: &Notification) -> Result<Message, FormatError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HyperlinkFormatter;

impl Formatter for HyperlinkFormatter {
    fn format(&self, notification: &Notification) -> Result<Message, FormatError> {
        let (body, hyperlinks) = rewrite_hyperlinks(&notification.body)?;

        Ok(Message {
            id: notification.id,
            app_name: notification.app_name.clone(),
            app_icon: notification.app_icon.clone(),
            summary: notification.summary.clone(),
            body,
            hints: notification.hints.clone(),
            actions: notification.actions.clone(),
            hyperlinks,
            expire_timeout: notification.expire_timeout,
        })
    }
}

/// Replaces every `<a href="X">text</a>` with `<u>text</u>` and returns the
/// collected targets alongside the new body.
pub fn rewrite_hyperlinks(body: &str) -> Result<(String, Vec<String>), FormatError> {
    let mut hyperlinks = Vec::new();

    let rewritten = HYPERLINK_REGEX.replace_all(body, |captures: &regex::Captures| {
        let target = captures.get(1)
            .or_else(|| captures.get(2))
            .map_or("", |m| m.as_str());

        hyperlinks.push(target.to_owned());
        format!("<u>{}</u>", &captures[3])
    });

    if let Some(leftover) = LEFTOVER_ANCHOR_REGEX.find(&rewritten) {
        return Err(FormatError::UnbalancedHyperlink(leftover.start()));
    }

    Ok((rewritten.into_owned(), hyperlinks))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(body: &str) -> Notification {
        Notification {
            id: 7,
            app_name: "mail".to_owned(),
            replaces_id: 0,
            app_icon: "mail-unread".to_owned(),
            summary: "New mail".to_owned(),
            body: body.to_owned(),
            actions: vec![NotificationAction {
                id: "default".to_owned(),
                localized_name: "Open".to_owned(),
            }],
            hints: HashMap::from([("urgency".to_owned(), "1".to_owned())]),
            expire_timeout: -1,
        }
    }

    #[test]
    fn anchor_becomes_underline() {
        let (body, links) = rewrite_hyperlinks(r#"see <a href="https://example.org">the docs</a> now"#).unwrap();
        assert_eq!(body, "see <u>the docs</u> now");
        assert_eq!(links, vec!["https://example.org".to_owned()]);
    }

    #[test]
    fn plain_body_is_unchanged() {
        let (body, links) = rewrite_hyperlinks("nothing to see <b>here</b>").unwrap();
        assert_eq!(body, "nothing to see <b>here</b>");
        assert!(links.is_empty());
    }

    #[test]
    fn targets_keep_body_order() {
        let (body, links) = rewrite_hyperlinks(
            "<a href='a'>one</a>, <A HREF=\"b\" title=\"x\">two</A> and <a class=\"c\" href=\"c\">three</a>"
        ).unwrap();

        assert_eq!(body, "<u>one</u>, <u>two</u> and <u>three</u>");
        assert_eq!(links, vec!["a", "b", "c"]);
    }

    #[test]
    fn link_text_may_span_lines() {
        let (body, links) = rewrite_hyperlinks("<a href=\"x\">multi\nline</a>").unwrap();
        assert_eq!(body, "<u>multi\nline</u>");
        assert_eq!(links, vec!["x"]);
    }

    #[test]
    fn unclosed_anchor_is_rejected() {
        let result = rewrite_hyperlinks("broken <a href=\"x\">link");
        assert_eq!(result, Err(FormatError::UnbalancedHyperlink(7)));
    }

    #[test]
    fn stray_closing_tag_is_rejected() {
        assert!(rewrite_hyperlinks("text</a>").is_err());
    }

    #[test]
    fn formatter_carries_fields_through() {
        let source = notification("<a href=\"x\">t</a>");
        let message = HyperlinkFormatter.format(&source).unwrap();

        assert_eq!(message.id, 7);
        assert_eq!(message.app_name, "mail");
        assert_eq!(message.summary, "New mail");
        assert_eq!(message.body, "<u>t</u>");
        assert_eq!(message.hyperlinks, vec!["x"]);
        assert_eq!(message.actions, source.actions);
        assert_eq!(message.hints.get("urgency").map(String::as_str), Some("1"));
    }
}
