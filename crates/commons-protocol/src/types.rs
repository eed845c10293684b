use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Member role within a community. Admins outrank moderators, who outrank
/// ordinary users.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Moderator,
    Admin,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

/// Lifecycle of a join request or invitation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApprovalStatus {
    Pending,
    Accepted,
    Rejected,
}

/// Accept/reject decision carried in request bodies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accept,
    Reject,
}

/// Community data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityData {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub visibility: Visibility,
    pub icon_url: Option<String>,
    pub banner_url: Option<String>,
    pub creator_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A community member joined with their public user data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberData {
    pub membership_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
}

/// Which path a join attempt took: straight into membership for public
/// communities, or a pending request for private ones.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JoinOutcome {
    Joined,
    Requested,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinResponse {
    pub status: JoinOutcome,
}

/// A pending join request as seen by community staff
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequestData {
    pub id: Uuid,
    pub community_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub display_name: String,
    pub status: ApprovalStatus,
    pub created_at: DateTime<Utc>,
}

/// An invitation as seen by the invitee
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationData {
    pub id: Uuid,
    pub community_id: Uuid,
    pub community_name: String,
    pub inviter_id: Uuid,
    pub inviter_username: String,
    pub status: ApprovalStatus,
    pub created_at: DateTime<Utc>,
}

/// Aggregate outcome of a bulk invitation call. Each submitted username
/// lands in exactly one bucket.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkInviteReport {
    pub invited: usize,
    pub already_members: Vec<String>,
    pub already_invited: Vec<String>,
    pub not_found: Vec<String>,
    pub failed: Vec<String>,
}

/// Error body returned by every failing endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}
