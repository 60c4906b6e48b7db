use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::wire;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, deserialize_with = "wire::opt_string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl User {
    pub fn display_name(&self) -> &str {
        self.username
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or("Unknown user")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentAttachment {
    #[serde(default, deserialize_with = "wire::opt_string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
}

/// One rich-text block of a comment body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentBlock {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub attachment: Option<CommentAttachment>,
}

/// A comment or reply exactly as the remote service sends it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawComment {
    #[serde(deserialize_with = "wire::string_or_number")]
    pub id: String,
    #[serde(default)]
    pub comment_text: String,
    #[serde(default, deserialize_with = "wire::null_as_default")]
    pub comment: Vec<CommentBlock>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default, deserialize_with = "wire::opt_string_or_number")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "wire::null_as_default")]
    pub reactions: Vec<serde_json::Value>,
    /// Reply count as reported by the comment listing; not always present.
    #[serde(
        default,
        deserialize_with = "wire::opt_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub reply_count: Option<u64>,
}

impl RawComment {
    fn attachments(&self) -> Vec<CommentAttachment> {
        self.comment
            .iter()
            .filter_map(|block| block.attachment.clone())
            .collect()
    }
}

/// Response envelope for `GET task/{id}/comment`.
#[derive(Debug, Clone, Deserialize)]
pub struct CommentsEnvelope {
    #[serde(default, deserialize_with = "wire::null_as_default")]
    pub comments: Vec<RawComment>,
}

/// Response body for `POST task/{id}/comment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedComment {
    #[serde(deserialize_with = "wire::string_or_number")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hist_id: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_string_or_number")]
    pub date: Option<String>,
}

/// The accepted shapes of a `GET comment/{id}/reply` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ReplyEnvelope {
    Bare(Vec<RawComment>),
    Comments { comments: Vec<RawComment> },
    Replies { replies: Vec<RawComment> },
}

impl ReplyEnvelope {
    pub fn into_comments(self) -> Vec<RawComment> {
        match self {
            ReplyEnvelope::Bare(items) => items,
            ReplyEnvelope::Comments { comments } => comments,
            ReplyEnvelope::Replies { replies } => replies,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    pub id: String,
    pub parent_comment_id: String,
    pub text: String,
    pub user: Option<User>,
    pub date: Option<String>,
    pub reactions: Vec<serde_json::Value>,
    pub attachments: Vec<CommentAttachment>,
}

impl Reply {
    pub fn from_raw(raw: RawComment, parent_comment_id: &str) -> Self {
        let attachments = raw.attachments();
        Self {
            id: raw.id,
            parent_comment_id: parent_comment_id.to_string(),
            text: raw.comment_text,
            user: raw.user,
            date: raw.date,
            reactions: raw.reactions,
            attachments,
        }
    }
}

/// Outcome of reply resolution for one comment.
///
/// `NotAttempted` serializes `replies`, `has_replies` and `reply_count` as
/// `null`; `Empty` as `[]`, `false`, `0`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ReplyThread {
    #[default]
    NotAttempted,
    Empty,
    Replies(Vec<Reply>),
}

impl ReplyThread {
    pub fn resolved(replies: Vec<Reply>) -> Self {
        if replies.is_empty() {
            ReplyThread::Empty
        } else {
            ReplyThread::Replies(replies)
        }
    }

    pub fn is_attempted(&self) -> bool {
        !matches!(self, ReplyThread::NotAttempted)
    }

    pub fn replies(&self) -> &[Reply] {
        match self {
            ReplyThread::Replies(replies) => replies,
            _ => &[],
        }
    }

    pub fn has_replies(&self) -> Option<bool> {
        self.reply_count().map(|n| n > 0)
    }

    pub fn reply_count(&self) -> Option<usize> {
        match self {
            ReplyThread::NotAttempted => None,
            ReplyThread::Empty => Some(0),
            ReplyThread::Replies(replies) => Some(replies.len()),
        }
    }
}

impl Serialize for ReplyThread {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("ReplyThread", 3)?;
        match self {
            ReplyThread::NotAttempted => s.serialize_field("replies", &None::<Vec<Reply>>)?,
            _ => s.serialize_field("replies", self.replies())?,
        }
        s.serialize_field("has_replies", &self.has_replies())?;
        s.serialize_field("reply_count", &self.reply_count())?;
        s.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    pub id: String,
    pub text: String,
    pub user: Option<User>,
    pub date: Option<String>,
    pub reactions: Vec<serde_json::Value>,
    pub attachments: Vec<CommentAttachment>,
    #[serde(flatten)]
    pub thread: ReplyThread,
}

impl Comment {
    pub fn from_raw(raw: RawComment, thread: ReplyThread) -> Self {
        let attachments = raw.attachments();
        Self {
            id: raw.id,
            text: raw.comment_text,
            user: raw.user,
            date: raw.date,
            reactions: raw.reactions,
            attachments,
            thread,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(id: &str, text: &str) -> RawComment {
        serde_json::from_value(json!({"id": id, "comment_text": text})).unwrap()
    }

    #[test]
    fn wire_reply_count_is_optional() {
        let listed: RawComment = serde_json::from_value(
            json!({"id": 90, "comment_text": "with count", "reply_count": "2"}),
        )
        .unwrap();
        assert_eq!(listed.id, "90");
        assert_eq!(listed.reply_count, Some(2));
        assert_eq!(raw("c1", "plain").reply_count, None);
    }

    #[test]
    fn reply_envelope_shapes_normalize_identically() {
        let item = json!({"id": "r1", "comment_text": "hi", "user": {"id": 5, "username": "ana"}});
        let shapes = [
            json!([item.clone()]),
            json!({"comments": [item.clone()]}),
            json!({"replies": [item]}),
        ];
        let decoded: Vec<Vec<RawComment>> = shapes
            .into_iter()
            .map(|v| serde_json::from_value::<ReplyEnvelope>(v).unwrap().into_comments())
            .collect();
        assert_eq!(decoded[0], decoded[1]);
        assert_eq!(decoded[1], decoded[2]);
        assert_eq!(decoded[0][0].user.as_ref().unwrap().id.as_deref(), Some("5"));
    }

    #[test]
    fn reply_envelope_rejects_unknown_shape() {
        let result = serde_json::from_value::<ReplyEnvelope>(json!({"data": []}));
        assert!(result.is_err());
    }

    #[test]
    fn not_attempted_thread_serializes_as_nulls() {
        let comment = Comment::from_raw(raw("c1", "hello"), ReplyThread::NotAttempted);
        let v = serde_json::to_value(&comment).unwrap();
        assert!(v["replies"].is_null());
        assert!(v["has_replies"].is_null());
        assert!(v["reply_count"].is_null());
        assert_eq!(v["text"], "hello");
    }

    #[test]
    fn empty_thread_serializes_as_zero() {
        let comment = Comment::from_raw(raw("c1", "hello"), ReplyThread::resolved(vec![]));
        let v = serde_json::to_value(&comment).unwrap();
        assert_eq!(v["replies"], json!([]));
        assert_eq!(v["has_replies"], false);
        assert_eq!(v["reply_count"], 0);
    }

    #[test]
    fn resolved_thread_counts_replies() {
        let reply = Reply::from_raw(raw("r1", "ack"), "c1");
        let thread = ReplyThread::resolved(vec![reply]);
        assert_eq!(thread.reply_count(), Some(1));
        assert_eq!(thread.has_replies(), Some(true));
        let comment = Comment::from_raw(raw("c1", "hello"), thread);
        let v = serde_json::to_value(&comment).unwrap();
        assert_eq!(v["replies"][0]["parent_comment_id"], "c1");
        assert_eq!(v["reply_count"], 1);
    }

    #[test]
    fn attachments_are_collected_from_blocks() {
        let raw: RawComment = serde_json::from_value(json!({
            "id": 90,
            "comment_text": "see file",
            "comment": [
                {"text": "see "},
                {"text": "shot.png", "type": "attachment",
                 "attachment": {"id": "att-1", "title": "shot.png", "url": "https://x/shot.png"}}
            ]
        }))
        .unwrap();
        let comment = Comment::from_raw(raw, ReplyThread::NotAttempted);
        assert_eq!(comment.id, "90");
        assert_eq!(comment.attachments.len(), 1);
        assert_eq!(comment.attachments[0].title.as_deref(), Some("shot.png"));
    }

    #[test]
    fn user_display_name_fallbacks() {
        let anon = User { id: None, username: None, email: None };
        assert_eq!(anon.display_name(), "Unknown user");
        let mail = User { id: None, username: None, email: Some("a@b.c".into()) };
        assert_eq!(mail.display_name(), "a@b.c");
    }
}
