use crate::error::{AppError, Result, on_unique_violation};
use crate::guard::{self, Action};
use crate::models::{ApprovalStatus, Invitation, InvitationRow, Role, User};
use crate::services::user::normalize_username;
use chrono::Utc;
use commons_protocol::{BulkInviteReport, Decision};
use futures_util::{StreamExt, stream};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Hard cap on targets per bulk call; larger batches are rejected wholesale.
pub const MAX_BULK_TARGETS: usize = 50;

/// How many invitation targets are processed at once during a bulk call.
const BULK_CONCURRENCY: usize = 8;

/// Where a single bulk-invite target ended up.
enum TargetOutcome {
    Invited,
    AlreadyMember,
    AlreadyInvited,
    NotFound,
}

#[derive(Clone)]
pub struct InvitationService {
    db: SqlitePool,
}

impl InvitationService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Invite a user by username. A terminal invitation for the same invitee
    /// is re-issued back to PENDING under the new inviter; a pending one is a
    /// conflict.
    pub async fn invite(&self, actor: Uuid, community_id: Uuid, username: &str) -> Result<Invitation> {
        self.authorize_inviter(actor, community_id).await?;

        let invitee = self
            .resolve_username(username)
            .await?
            .ok_or(AppError::UserNotFound)?;

        match self.classify(community_id, actor, &invitee).await? {
            TargetOutcome::AlreadyMember => Err(AppError::AlreadyMember),
            TargetOutcome::AlreadyInvited => Err(AppError::AlreadyInvited),
            TargetOutcome::NotFound => Err(AppError::UserNotFound),
            TargetOutcome::Invited => {
                let invitation = sqlx::query_as::<_, Invitation>(
                    r#"
                    SELECT id, community_id, inviter_id, invitee_id, status, created_at, updated_at
                    FROM invitations WHERE community_id = ? AND invitee_id = ?
                    "#,
                )
                .bind(community_id)
                .bind(invitee.id)
                .fetch_one(&self.db)
                .await?;
                Ok(invitation)
            }
        }
    }

    /// Resolve and invite every target, classifying each into exactly one
    /// bucket. Targets are independent: one failure never aborts the batch.
    pub async fn bulk_invite(
        &self,
        actor: Uuid,
        community_id: Uuid,
        usernames: Vec<String>,
    ) -> Result<BulkInviteReport> {
        if usernames.len() > MAX_BULK_TARGETS {
            return Err(AppError::TooManyTargets(MAX_BULK_TARGETS));
        }

        self.authorize_inviter(actor, community_id).await?;

        // Normalize and drop duplicates, keeping first-seen order.
        let mut seen = std::collections::HashSet::new();
        let targets: Vec<String> = usernames
            .iter()
            .map(|u| normalize_username(u))
            .filter(|u| !u.is_empty() && seen.insert(u.clone()))
            .collect();

        let outcomes: Vec<(String, Result<TargetOutcome>)> = stream::iter(targets)
            .map(|username| {
                let service = self.clone();
                async move {
                    let outcome = service
                        .classify_username(community_id, actor, &username)
                        .await;
                    (username, outcome)
                }
            })
            .buffered(BULK_CONCURRENCY)
            .collect()
            .await;

        let mut report = BulkInviteReport::default();
        for (username, outcome) in outcomes {
            match outcome {
                Ok(TargetOutcome::Invited) => report.invited += 1,
                Ok(TargetOutcome::AlreadyMember) => report.already_members.push(username),
                Ok(TargetOutcome::AlreadyInvited) => report.already_invited.push(username),
                Ok(TargetOutcome::NotFound) => report.not_found.push(username),
                Err(e) => {
                    tracing::warn!(%username, error = %e, "Bulk invite target failed");
                    report.failed.push(username);
                }
            }
        }

        tracing::info!(
            community = %community_id,
            invited = report.invited,
            skipped = report.already_members.len() + report.already_invited.len(),
            "Bulk invitations processed"
        );
        Ok(report)
    }

    /// Accept or reject an invitation; only the invitee may answer.
    /// Accepting flips the status and inserts the membership in one
    /// transaction, so a conflicting concurrent join rolls both back.
    pub async fn respond(
        &self,
        actor: Uuid,
        invitation_id: Uuid,
        decision: Decision,
    ) -> Result<Invitation> {
        let invitation = sqlx::query_as::<_, Invitation>(
            r#"
            SELECT id, community_id, inviter_id, invitee_id, status, created_at, updated_at
            FROM invitations WHERE id = ?
            "#,
        )
        .bind(invitation_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Invitation".to_string()))?;

        if invitation.invitee_id != actor {
            return Err(AppError::NotAuthorized);
        }

        if invitation.status != ApprovalStatus::Pending {
            return Err(AppError::AlreadyHandled("invitation"));
        }

        let status = match decision {
            Decision::Accept => ApprovalStatus::Accepted,
            Decision::Reject => ApprovalStatus::Rejected,
        };

        let mut tx = self.db.begin().await?;

        let updated = sqlx::query_as::<_, Invitation>(
            r#"
            UPDATE invitations SET status = ?, updated_at = ?
            WHERE id = ?
            RETURNING id, community_id, inviter_id, invitee_id, status, created_at, updated_at
            "#,
        )
        .bind(status)
        .bind(Utc::now())
        .bind(invitation_id)
        .fetch_one(&mut *tx)
        .await?;

        if decision == Decision::Accept {
            sqlx::query(
                "INSERT INTO memberships (id, community_id, user_id, role, joined_at) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4())
            .bind(invitation.community_id)
            .bind(actor)
            .bind(Role::User)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .map_err(|e| on_unique_violation(e, AppError::AlreadyMember))?;
        }

        tx.commit().await?;
        Ok(updated)
    }

    /// The actor's own pending invitations, with community and inviter
    /// context for display.
    pub async fn list_for_invitee(&self, actor: Uuid) -> Result<Vec<InvitationRow>> {
        let invitations = sqlx::query_as::<_, InvitationRow>(
            r#"
            SELECT i.id, i.community_id, c.name AS community_name,
                   i.inviter_id, u.username AS inviter_username,
                   i.status, i.created_at
            FROM invitations i
            INNER JOIN communities c ON c.id = i.community_id
            INNER JOIN users u ON u.id = i.inviter_id
            WHERE i.invitee_id = ? AND i.status = ?
            ORDER BY i.created_at
            "#,
        )
        .bind(actor)
        .bind(ApprovalStatus::Pending)
        .fetch_all(&self.db)
        .await?;

        Ok(invitations)
    }

    async fn authorize_inviter(&self, actor: Uuid, community_id: Uuid) -> Result<()> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM communities WHERE id = ?)")
            .bind(community_id)
            .fetch_one(&self.db)
            .await?;
        if !exists {
            return Err(AppError::NotFound("Community".to_string()));
        }

        let actor_role: Option<Role> = sqlx::query_scalar(
            "SELECT role FROM memberships WHERE community_id = ? AND user_id = ?",
        )
        .bind(community_id)
        .bind(actor)
        .fetch_optional(&self.db)
        .await?;

        match actor_role {
            Some(role) if guard::permitted(role, Action::Invite) => Ok(()),
            _ => Err(AppError::NotAuthorized),
        }
    }

    async fn resolve_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, display_name, email, password_hash, avatar_url, created_at, updated_at
            FROM users WHERE username = ?
            "#,
        )
        .bind(normalize_username(username))
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    async fn classify_username(
        &self,
        community_id: Uuid,
        inviter: Uuid,
        username: &str,
    ) -> Result<TargetOutcome> {
        match self.resolve_username(username).await? {
            Some(invitee) => self.classify(community_id, inviter, &invitee).await,
            None => Ok(TargetOutcome::NotFound),
        }
    }

    /// Classify one resolved invitee and, when they are a fresh target,
    /// create (or re-issue) their invitation.
    async fn classify(
        &self,
        community_id: Uuid,
        inviter: Uuid,
        invitee: &User,
    ) -> Result<TargetOutcome> {
        let is_member: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM memberships WHERE community_id = ? AND user_id = ?)",
        )
        .bind(community_id)
        .bind(invitee.id)
        .fetch_one(&self.db)
        .await?;
        if is_member {
            return Ok(TargetOutcome::AlreadyMember);
        }

        let existing: Option<ApprovalStatus> = sqlx::query_scalar(
            "SELECT status FROM invitations WHERE community_id = ? AND invitee_id = ?",
        )
        .bind(community_id)
        .bind(invitee.id)
        .fetch_optional(&self.db)
        .await?;
        if existing == Some(ApprovalStatus::Pending) {
            return Ok(TargetOutcome::AlreadyInvited);
        }

        // Upsert: a terminal invitation is re-issued in place, so the
        // (community_id, invitee_id) uniqueness holds across re-invites.
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO invitations (id, community_id, inviter_id, invitee_id, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (community_id, invitee_id)
            DO UPDATE SET status = excluded.status,
                          inviter_id = excluded.inviter_id,
                          updated_at = excluded.updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(community_id)
        .bind(inviter)
        .bind(invitee.id)
        .bind(ApprovalStatus::Pending)
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await?;

        Ok(TargetOutcome::Invited)
    }
}
