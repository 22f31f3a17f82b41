use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Comment, UserSummary};

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCommentRequest {
    pub task_id: Uuid,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_comment_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateCommentRequest {
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub task_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_comment_id: Option<Uuid>,
    pub content: String,
    pub is_edited: bool,
    pub author: UserSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CommentResponse {
    pub fn from_comment(comment: Comment, author: UserSummary) -> Self {
        CommentResponse {
            id: comment.id,
            task_id: comment.task_id,
            parent_comment_id: comment.parent_comment_id,
            content: comment.content,
            is_edited: comment.is_edited,
            author,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}
