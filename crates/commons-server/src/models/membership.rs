use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Member role. Variant order carries the capability order, so
/// `Role::Admin > Role::Moderator > Role::User` holds via the derived `Ord`.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, PartialOrd, Ord,
)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Moderator,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Membership {
    pub id: Uuid,
    pub community_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
}

/// A membership joined with the member's public user data
#[derive(Debug, Clone, FromRow)]
pub struct MemberRow {
    pub membership_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
}

impl From<Role> for commons_protocol::Role {
    fn from(role: Role) -> Self {
        match role {
            Role::User => commons_protocol::Role::User,
            Role::Moderator => commons_protocol::Role::Moderator,
            Role::Admin => commons_protocol::Role::Admin,
        }
    }
}

impl From<commons_protocol::Role> for Role {
    fn from(role: commons_protocol::Role) -> Self {
        match role {
            commons_protocol::Role::User => Role::User,
            commons_protocol::Role::Moderator => Role::Moderator,
            commons_protocol::Role::Admin => Role::Admin,
        }
    }
}

impl From<MemberRow> for commons_protocol::MemberData {
    fn from(m: MemberRow) -> Self {
        commons_protocol::MemberData {
            membership_id: m.membership_id,
            user_id: m.user_id,
            username: m.username,
            display_name: m.display_name,
            avatar_url: m.avatar_url,
            role: m.role.into(),
            joined_at: m.joined_at,
        }
    }
}
