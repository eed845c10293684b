use crate::auth::AuthUser;
use crate::error::Result;
use crate::models::{CreateCommunity, Role, UpdateCommunity};
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
};
use commons_protocol::{
    CommunityData, Decision, JoinRequestData, JoinResponse, MemberData,
};
use serde::Deserialize;
use uuid::Uuid;

pub async fn create_community(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreateCommunity>,
) -> Result<Json<CommunityData>> {
    let community = state.community_service.create(auth.user_id, input).await?;
    Ok(Json(community.into()))
}

pub async fn list_communities(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<CommunityData>>> {
    let communities = state.community_service.list_for_user(auth.user_id).await?;
    Ok(Json(communities.into_iter().map(Into::into).collect()))
}

pub async fn get_community(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<CommunityData>> {
    let community = state.community_service.get(id).await?;
    Ok(Json(community.into()))
}

pub async fn update_community(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateCommunity>,
) -> Result<Json<CommunityData>> {
    let community = state
        .community_service
        .update(auth.user_id, id, input)
        .await?;
    Ok(Json(community.into()))
}

pub async fn join_community(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<JoinResponse>> {
    let status = state.membership_service.join(auth.user_id, id).await?;
    Ok(Json(JoinResponse { status }))
}

pub async fn leave_community(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<()> {
    state.membership_service.leave(auth.user_id, id).await
}

pub async fn list_members(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<MemberData>>> {
    let members = state
        .membership_service
        .list_members(auth.user_id, id)
        .await?;
    Ok(Json(members.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleBody {
    pub role: Role,
}

pub async fn update_member_role(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((id, member_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<UpdateRoleBody>,
) -> Result<Json<crate::models::Membership>> {
    let membership = state
        .membership_service
        .update_role(auth.user_id, id, member_id, input.role)
        .await?;
    Ok(Json(membership))
}

pub async fn remove_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((id, member_id)): Path<(Uuid, Uuid)>,
) -> Result<()> {
    state
        .membership_service
        .remove_member(auth.user_id, id, member_id)
        .await
}

pub async fn list_join_requests(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<JoinRequestData>>> {
    let requests = state
        .membership_service
        .list_pending_requests(auth.user_id, id)
        .await?;
    Ok(Json(requests.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Deserialize)]
pub struct DecisionBody {
    pub action: Decision,
}

pub async fn handle_join_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((_id, request_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<DecisionBody>,
) -> Result<Json<crate::models::JoinRequest>> {
    let request = state
        .membership_service
        .handle_join_request(auth.user_id, request_id, input.action)
        .await?;
    Ok(Json(request))
}

pub async fn cancel_my_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<()> {
    state
        .membership_service
        .cancel_join_request(auth.user_id, id)
        .await
}
