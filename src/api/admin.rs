//! Admin-only user management.

use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::auth::AdminOnly;
use crate::db::UserRole;

use super::ApiState;
use super::error::ApiError;

pub async fn list_users(
    State(state): State<ApiState>,
    AdminOnly(_admin): AdminOnly,
) -> Result<Json<Value>, ApiError> {
    let users = state.db.users().list().await?;
    Ok(Json(json!({ "users": users })))
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: String,
}

pub async fn set_user_role(
    State(state): State<ApiState>,
    AdminOnly(admin): AdminOnly,
    Path(uuid): Path<String>,
    Json(body): Json<SetRoleRequest>,
) -> Result<Json<Value>, ApiError> {
    let role = match body.role.as_str() {
        "admin" => UserRole::Admin,
        "user" => UserRole::User,
        _ => {
            return Err(ApiError::BadRequest(
                "Role must be either 'user' or 'admin'".to_string(),
            ));
        }
    };

    let user = state
        .db
        .users()
        .get_by_uuid(&uuid)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    state.db.users().set_role(user.id, role).await?;
    tracing::info!(
        target = %uuid,
        role = role.as_str(),
        admin = %admin.claims.sub,
        "User role changed"
    );

    Ok(Json(json!({
        "message": "Role updated",
        "uuid": uuid,
        "role": role,
    })))
}
