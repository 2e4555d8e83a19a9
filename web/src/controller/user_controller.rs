use crate::controller::ApiResponse;
use crate::extractors::authenticated_user::AuthenticatedUser;
use axum::{http::StatusCode, response::IntoResponse, Json};
use domain::users;
use log::*;

/// GET the signed-in user, with their roles.
#[utoipa::path(
    get,
    path = "/secure/user",
    responses(
        (status = 200, description = "Successfully retrieved the signed-in user", body = users::Model),
        (status = 303, description = "Not signed in, redirect to the front-end login page"),
    ),
    security(
        ("cookie_auth" = [])
    )
)]
pub async fn read(AuthenticatedUser(user): AuthenticatedUser) -> impl IntoResponse {
    debug!("GET the signed-in user {}", user.id);
    Json(ApiResponse::new(StatusCode::OK.into(), user))
}
