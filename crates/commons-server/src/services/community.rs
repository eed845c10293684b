use crate::error::{AppError, Result, on_unique_violation};
use crate::guard::{self, Action};
use crate::models::{Community, CreateCommunity, Role, UpdateCommunity};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

const MAX_NAME_LEN: usize = 64;

#[derive(Clone)]
pub struct CommunityService {
    db: SqlitePool,
}

impl CommunityService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create a community and seed its creator as the first admin. Both rows
    /// are written in one transaction so a community can never exist without
    /// an admin.
    pub async fn create(&self, actor: Uuid, input: CreateCommunity) -> Result<Community> {
        let name = validate_name(&input.name)?;

        // Pre-check for a friendly error; the NOCASE UNIQUE constraint still
        // decides races.
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM communities WHERE name = ?)")
                .bind(&name)
                .fetch_one(&self.db)
                .await?;
        if taken {
            return Err(AppError::NameTaken);
        }

        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        let community = sqlx::query_as::<_, Community>(
            r#"
            INSERT INTO communities (id, name, description, visibility, icon_url, banner_url, creator_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id, name, description, visibility, icon_url, banner_url, creator_id, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&name)
        .bind(&input.description)
        .bind(input.visibility)
        .bind(&input.icon_url)
        .bind(&input.banner_url)
        .bind(actor)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| on_unique_violation(e, AppError::NameTaken))?;

        sqlx::query(
            "INSERT INTO memberships (id, community_id, user_id, role, joined_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4())
        .bind(community.id)
        .bind(actor)
        .bind(Role::Admin)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(community = %community.name, creator = %actor, "Community created");
        Ok(community)
    }

    pub async fn get(&self, id: Uuid) -> Result<Community> {
        let community = sqlx::query_as::<_, Community>(
            r#"
            SELECT id, name, description, visibility, icon_url, banner_url, creator_id, created_at, updated_at
            FROM communities WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Community".to_string()))?;

        Ok(community)
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Community>> {
        let communities = sqlx::query_as::<_, Community>(
            r#"
            SELECT c.id, c.name, c.description, c.visibility, c.icon_url, c.banner_url, c.creator_id, c.created_at, c.updated_at
            FROM communities c
            INNER JOIN memberships m ON c.id = m.community_id
            WHERE m.user_id = ?
            ORDER BY c.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(communities)
    }

    /// Update profile fields. Admin only; a name change re-validates global
    /// uniqueness.
    pub async fn update(
        &self,
        actor: Uuid,
        community_id: Uuid,
        input: UpdateCommunity,
    ) -> Result<Community> {
        // Existence first so a bad id reads as NotFound, not NotAuthorized.
        self.get(community_id).await?;

        let actor_role: Option<Role> = sqlx::query_scalar(
            "SELECT role FROM memberships WHERE community_id = ? AND user_id = ?",
        )
        .bind(community_id)
        .bind(actor)
        .fetch_optional(&self.db)
        .await?;

        match actor_role {
            Some(role) if guard::permitted(role, Action::UpdateCommunity) => {}
            _ => return Err(AppError::NotAuthorized),
        }

        let name = match &input.name {
            Some(raw) => {
                let name = validate_name(raw)?;
                let taken: bool = sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM communities WHERE name = ? AND id != ?)",
                )
                .bind(&name)
                .bind(community_id)
                .fetch_one(&self.db)
                .await?;
                if taken {
                    return Err(AppError::NameTaken);
                }
                Some(name)
            }
            None => None,
        };

        let community = sqlx::query_as::<_, Community>(
            r#"
            UPDATE communities
            SET name = COALESCE(?, name),
                description = COALESCE(?, description),
                visibility = COALESCE(?, visibility),
                icon_url = COALESCE(?, icon_url),
                banner_url = COALESCE(?, banner_url),
                updated_at = ?
            WHERE id = ?
            RETURNING id, name, description, visibility, icon_url, banner_url, creator_id, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(&input.description)
        .bind(input.visibility)
        .bind(&input.icon_url)
        .bind(&input.banner_url)
        .bind(Utc::now())
        .bind(community_id)
        .fetch_one(&self.db)
        .await
        .map_err(|e| on_unique_violation(e, AppError::NameTaken))?;

        Ok(community)
    }
}

fn validate_name(raw: &str) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::Validation(
            "Community name must not be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::Validation(format!(
            "Community name must be at most {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(name.to_string())
}
