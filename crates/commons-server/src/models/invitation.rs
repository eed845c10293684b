use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::ApprovalStatus;

/// A staff-initiated ask-to-join record, answered by the invitee
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invitation {
    pub id: Uuid,
    pub community_id: Uuid,
    pub inviter_id: Uuid,
    pub invitee_id: Uuid,
    pub status: ApprovalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An invitation joined with community and inviter context for the invitee's
/// inbox listing
#[derive(Debug, Clone, FromRow)]
pub struct InvitationRow {
    pub id: Uuid,
    pub community_id: Uuid,
    pub community_name: String,
    pub inviter_id: Uuid,
    pub inviter_username: String,
    pub status: ApprovalStatus,
    pub created_at: DateTime<Utc>,
}

impl From<InvitationRow> for commons_protocol::InvitationData {
    fn from(i: InvitationRow) -> Self {
        commons_protocol::InvitationData {
            id: i.id,
            community_id: i.community_id,
            community_name: i.community_name,
            inviter_id: i.inviter_id,
            inviter_username: i.inviter_username,
            status: i.status.into(),
            created_at: i.created_at,
        }
    }
}
