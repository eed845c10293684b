use crate::auth::AuthUser;
use crate::error::Result;
use crate::models::Invitation;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
};
use commons_protocol::{BulkInviteReport, Decision, InvitationData};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct InviteBody {
    pub username: String,
}

pub async fn invite_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<InviteBody>,
) -> Result<Json<Invitation>> {
    let invitation = state
        .invitation_service
        .invite(auth.user_id, id, &input.username)
        .await?;
    Ok(Json(invitation))
}

#[derive(Debug, Deserialize)]
pub struct BulkInviteBody {
    pub usernames: Vec<String>,
}

pub async fn bulk_invite(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<BulkInviteBody>,
) -> Result<Json<BulkInviteReport>> {
    let report = state
        .invitation_service
        .bulk_invite(auth.user_id, id, input.usernames)
        .await?;
    Ok(Json(report))
}

pub async fn list_my_invitations(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<InvitationData>>> {
    let invitations = state.invitation_service.list_for_invitee(auth.user_id).await?;
    Ok(Json(invitations.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Deserialize)]
pub struct DecisionBody {
    pub action: Decision,
}

pub async fn respond(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<DecisionBody>,
) -> Result<Json<Invitation>> {
    let invitation = state
        .invitation_service
        .respond(auth.user_id, id, input.action)
        .await?;
    Ok(Json(invitation))
}
