use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A Community - a group users join with a role attached
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Community {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub visibility: Visibility,
    pub icon_url: Option<String>,
    pub banner_url: Option<String>,
    pub creator_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Default)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommunity {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub visibility: Visibility,
    pub icon_url: Option<String>,
    pub banner_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateCommunity {
    pub name: Option<String>,
    pub description: Option<String>,
    pub visibility: Option<Visibility>,
    pub icon_url: Option<String>,
    pub banner_url: Option<String>,
}

impl From<Visibility> for commons_protocol::Visibility {
    fn from(v: Visibility) -> Self {
        match v {
            Visibility::Public => commons_protocol::Visibility::Public,
            Visibility::Private => commons_protocol::Visibility::Private,
        }
    }
}

impl From<Community> for commons_protocol::CommunityData {
    fn from(c: Community) -> Self {
        commons_protocol::CommunityData {
            id: c.id,
            name: c.name,
            description: c.description,
            visibility: c.visibility.into(),
            icon_url: c.icon_url,
            banner_url: c.banner_url,
            creator_id: c.creator_id,
            created_at: c.created_at,
        }
    }
}
