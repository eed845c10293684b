use crate::error::{AppError, Result, on_unique_violation};
use crate::guard::{self, Action};
use crate::models::{
    ApprovalStatus, Community, JoinRequest, JoinRequestRow, MemberRow, Membership, Role, Visibility,
};
use chrono::Utc;
use commons_protocol::{Decision, JoinOutcome};
use sqlx::SqlitePool;
use uuid::Uuid;

#[derive(Clone)]
pub struct MembershipService {
    db: SqlitePool,
}

impl MembershipService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn member_role(&self, community_id: Uuid, user_id: Uuid) -> Result<Option<Role>> {
        let role = sqlx::query_scalar(
            "SELECT role FROM memberships WHERE community_id = ? AND user_id = ?",
        )
        .bind(community_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(role)
    }

    /// Join a community: straight into membership when it is public, a
    /// pending join request when it is private. A request left in a terminal
    /// state by an earlier decision is re-opened in place.
    pub async fn join(&self, actor: Uuid, community_id: Uuid) -> Result<JoinOutcome> {
        let community = sqlx::query_as::<_, Community>(
            r#"
            SELECT id, name, description, visibility, icon_url, banner_url, creator_id, created_at, updated_at
            FROM communities WHERE id = ?
            "#,
        )
        .bind(community_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Community".to_string()))?;

        if self.member_role(community_id, actor).await?.is_some() {
            return Err(AppError::AlreadyMember);
        }

        match community.visibility {
            Visibility::Public => {
                self.insert_membership(&self.db, community_id, actor, Role::User)
                    .await?;
                Ok(JoinOutcome::Joined)
            }
            Visibility::Private => {
                let existing: Option<ApprovalStatus> = sqlx::query_scalar(
                    "SELECT status FROM join_requests WHERE community_id = ? AND user_id = ?",
                )
                .bind(community_id)
                .bind(actor)
                .fetch_optional(&self.db)
                .await?;

                let now = Utc::now();
                match existing {
                    Some(ApprovalStatus::Pending) => return Err(AppError::AlreadyRequested),
                    Some(_) => {
                        sqlx::query(
                            "UPDATE join_requests SET status = ?, updated_at = ? WHERE community_id = ? AND user_id = ?",
                        )
                        .bind(ApprovalStatus::Pending)
                        .bind(now)
                        .bind(community_id)
                        .bind(actor)
                        .execute(&self.db)
                        .await?;
                    }
                    None => {
                        sqlx::query(
                            "INSERT INTO join_requests (id, community_id, user_id, status, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
                        )
                        .bind(Uuid::new_v4())
                        .bind(community_id)
                        .bind(actor)
                        .bind(ApprovalStatus::Pending)
                        .bind(now)
                        .bind(now)
                        .execute(&self.db)
                        .await
                        .map_err(|e| on_unique_violation(e, AppError::AlreadyRequested))?;
                    }
                }
                Ok(JoinOutcome::Requested)
            }
        }
    }

    /// Leave a community. The admin count and the delete share one
    /// transaction, so two concurrent leaves cannot both pass the last-admin
    /// check.
    pub async fn leave(&self, actor: Uuid, community_id: Uuid) -> Result<()> {
        let mut tx = self.db.begin().await?;

        let role: Option<Role> = sqlx::query_scalar(
            "SELECT role FROM memberships WHERE community_id = ? AND user_id = ?",
        )
        .bind(community_id)
        .bind(actor)
        .fetch_optional(&mut *tx)
        .await?;

        let role = role.ok_or(AppError::NotAMember)?;

        if role == Role::Admin && admin_count(&mut tx, community_id).await? == 1 {
            return Err(AppError::LastAdminCannotLeave);
        }

        sqlx::query("DELETE FROM memberships WHERE community_id = ? AND user_id = ?")
            .bind(community_id)
            .bind(actor)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Change a member's role in place. Admin only. Demoting the last admin
    /// (necessarily the actor themselves) is refused.
    pub async fn update_role(
        &self,
        actor: Uuid,
        community_id: Uuid,
        member_id: Uuid,
        new_role: Role,
    ) -> Result<Membership> {
        match self.member_role(community_id, actor).await? {
            Some(role) if guard::permitted(role, Action::ChangeRole) => {}
            _ => return Err(AppError::NotAuthorized),
        }

        let mut tx = self.db.begin().await?;

        let target = sqlx::query_as::<_, Membership>(
            "SELECT id, community_id, user_id, role, joined_at FROM memberships WHERE id = ? AND community_id = ?",
        )
        .bind(member_id)
        .bind(community_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Member".to_string()))?;

        if target.role == Role::Admin
            && new_role != Role::Admin
            && admin_count(&mut tx, community_id).await? == 1
        {
            return Err(AppError::LastAdmin);
        }

        let updated = sqlx::query_as::<_, Membership>(
            "UPDATE memberships SET role = ? WHERE id = ? RETURNING id, community_id, user_id, role, joined_at",
        )
        .bind(new_role)
        .bind(member_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Remove another member. Admins may remove anyone but the last admin;
    /// moderators only ordinary members.
    pub async fn remove_member(
        &self,
        actor: Uuid,
        community_id: Uuid,
        member_id: Uuid,
    ) -> Result<()> {
        let actor_role = self
            .member_role(community_id, actor)
            .await?
            .ok_or(AppError::NotAuthorized)?;
        if actor_role < Role::Moderator {
            return Err(AppError::NotAuthorized);
        }

        let mut tx = self.db.begin().await?;

        let target = sqlx::query_as::<_, Membership>(
            "SELECT id, community_id, user_id, role, joined_at FROM memberships WHERE id = ? AND community_id = ?",
        )
        .bind(member_id)
        .bind(community_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Member".to_string()))?;

        if target.user_id == actor {
            return Err(AppError::Validation(
                "Use leave to remove yourself from a community".to_string(),
            ));
        }

        if !guard::permitted(actor_role, Action::RemoveMember { target: target.role }) {
            return Err(AppError::InsufficientRole);
        }

        if target.role == Role::Admin && admin_count(&mut tx, community_id).await? == 1 {
            return Err(AppError::LastAdmin);
        }

        sqlx::query("DELETE FROM memberships WHERE id = ?")
            .bind(member_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Accept or reject a pending join request. Accepting writes the status
    /// flip and the new membership in one transaction - both or neither.
    pub async fn handle_join_request(
        &self,
        actor: Uuid,
        request_id: Uuid,
        decision: Decision,
    ) -> Result<JoinRequest> {
        let request = sqlx::query_as::<_, JoinRequest>(
            "SELECT id, community_id, user_id, status, created_at, updated_at FROM join_requests WHERE id = ?",
        )
        .bind(request_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Join request".to_string()))?;

        match self.member_role(request.community_id, actor).await? {
            Some(role) if guard::permitted(role, Action::HandleRequests) => {}
            _ => return Err(AppError::NotAuthorized),
        }

        if request.status != ApprovalStatus::Pending {
            return Err(AppError::AlreadyHandled("request"));
        }

        let status = match decision {
            Decision::Accept => ApprovalStatus::Accepted,
            Decision::Reject => ApprovalStatus::Rejected,
        };

        let mut tx = self.db.begin().await?;

        let updated = sqlx::query_as::<_, JoinRequest>(
            r#"
            UPDATE join_requests SET status = ?, updated_at = ?
            WHERE id = ?
            RETURNING id, community_id, user_id, status, created_at, updated_at
            "#,
        )
        .bind(status)
        .bind(Utc::now())
        .bind(request_id)
        .fetch_one(&mut *tx)
        .await?;

        if decision == Decision::Accept {
            self.insert_membership(&mut *tx, request.community_id, request.user_id, Role::User)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(
            request = %request_id,
            community = %request.community_id,
            ?decision,
            "Join request handled"
        );
        Ok(updated)
    }

    /// Withdraw the actor's own pending request.
    pub async fn cancel_join_request(&self, actor: Uuid, community_id: Uuid) -> Result<()> {
        let result = sqlx::query(
            "DELETE FROM join_requests WHERE community_id = ? AND user_id = ? AND status = ?",
        )
        .bind(community_id)
        .bind(actor)
        .bind(ApprovalStatus::Pending)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NoPendingRequest);
        }

        Ok(())
    }

    pub async fn list_members(&self, actor: Uuid, community_id: Uuid) -> Result<Vec<MemberRow>> {
        if self.member_role(community_id, actor).await?.is_none() {
            return Err(AppError::NotAMember);
        }

        let members = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT m.id AS membership_id, u.id AS user_id, u.username, u.display_name,
                   u.avatar_url, m.role, m.joined_at
            FROM users u
            INNER JOIN memberships m ON u.id = m.user_id
            WHERE m.community_id = ?
            ORDER BY u.display_name
            "#,
        )
        .bind(community_id)
        .fetch_all(&self.db)
        .await?;

        Ok(members)
    }

    pub async fn list_pending_requests(
        &self,
        actor: Uuid,
        community_id: Uuid,
    ) -> Result<Vec<JoinRequestRow>> {
        match self.member_role(community_id, actor).await? {
            Some(role) if guard::permitted(role, Action::HandleRequests) => {}
            _ => return Err(AppError::NotAuthorized),
        }

        let requests = sqlx::query_as::<_, JoinRequestRow>(
            r#"
            SELECT r.id, r.community_id, r.user_id, u.username, u.display_name,
                   r.status, r.created_at
            FROM join_requests r
            INNER JOIN users u ON u.id = r.user_id
            WHERE r.community_id = ? AND r.status = ?
            ORDER BY r.created_at
            "#,
        )
        .bind(community_id)
        .bind(ApprovalStatus::Pending)
        .fetch_all(&self.db)
        .await?;

        Ok(requests)
    }

    async fn insert_membership<'e, E>(
        &self,
        executor: E,
        community_id: Uuid,
        user_id: Uuid,
        role: Role,
    ) -> Result<()>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        sqlx::query(
            "INSERT INTO memberships (id, community_id, user_id, role, joined_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4())
        .bind(community_id)
        .bind(user_id)
        .bind(role)
        .bind(Utc::now())
        .execute(executor)
        .await
        .map_err(|e| on_unique_violation(e, AppError::AlreadyMember))?;

        Ok(())
    }
}

async fn admin_count(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    community_id: Uuid,
) -> Result<i64> {
    let count =
        sqlx::query_scalar("SELECT COUNT(*) FROM memberships WHERE community_id = ? AND role = ?")
            .bind(community_id)
            .bind(Role::Admin)
            .fetch_one(&mut **tx)
            .await?;

    Ok(count)
}
