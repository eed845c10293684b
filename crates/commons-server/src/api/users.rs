use crate::auth::AuthUser;
use crate::error::Result;
use crate::models::PublicUser;
use crate::state::AppState;
use axum::{Json, extract::State};

pub async fn get_me(State(state): State<AppState>, auth: AuthUser) -> Result<Json<PublicUser>> {
    let user = state.user_service.get_by_id(auth.user_id).await?;
    Ok(Json(user.into()))
}
