use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle of a join request or invitation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ApprovalStatus {
    Pending,
    Accepted,
    Rejected,
}

/// An ask-to-join record for a private community
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JoinRequest {
    pub id: Uuid,
    pub community_id: Uuid,
    pub user_id: Uuid,
    pub status: ApprovalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A join request joined with the requester's public user data
#[derive(Debug, Clone, FromRow)]
pub struct JoinRequestRow {
    pub id: Uuid,
    pub community_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub display_name: String,
    pub status: ApprovalStatus,
    pub created_at: DateTime<Utc>,
}

impl From<ApprovalStatus> for commons_protocol::ApprovalStatus {
    fn from(status: ApprovalStatus) -> Self {
        match status {
            ApprovalStatus::Pending => commons_protocol::ApprovalStatus::Pending,
            ApprovalStatus::Accepted => commons_protocol::ApprovalStatus::Accepted,
            ApprovalStatus::Rejected => commons_protocol::ApprovalStatus::Rejected,
        }
    }
}

impl From<JoinRequestRow> for commons_protocol::JoinRequestData {
    fn from(r: JoinRequestRow) -> Self {
        commons_protocol::JoinRequestData {
            id: r.id,
            community_id: r.community_id,
            user_id: r.user_id,
            username: r.username,
            display_name: r.display_name,
            status: r.status.into(),
            created_at: r.created_at,
        }
    }
}
