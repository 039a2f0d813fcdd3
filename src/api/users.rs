use std::collections::HashSet;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use super::courses::CourseResponse;
use super::extract::{issue_token, Auth};
use super::{parse_id, SharedState};
use crate::entities::User;
use crate::handlers::user::ProfileUpdate;
use crate::handlers::Result;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/profile", get(profile).put(update_profile))
        .route("/profile/:user_id", get(public_profile))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .route("/save/:course_id", post(save_course))
        .route("/unsave/:course_id", delete(unsave_course))
        .route("/saved", get(saved_courses))
        .route("/progress/:course_id", put(update_progress))
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    name: String,
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct UpdateProfileRequest {
    name: Option<String>,
    email: Option<String>,
    bio: Option<String>,
    location: Option<String>,
    profession: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForgotPasswordRequest {
    email: String,
}

#[derive(Debug, Deserialize)]
struct ResetPasswordRequest {
    email: String,
    otp: String,
    new_password: String,
}

#[derive(Debug, Deserialize)]
struct UpdateProgressRequest {
    completed_checkpoints: Vec<String>,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    token: String,
    user: UserResponse,
}

// the password hash and any pending reset code never leave the server
#[derive(Debug, Serialize)]
struct UserResponse {
    id: String,
    name: String,
    email: String,
    bio: String,
    location: String,
    profession: String,
    role: &'static str,
    avatar: String,
    saved_courses: Vec<String>,
    progress: Vec<ProgressResponse>,
    created: String,
}

#[derive(Debug, Serialize)]
struct ProgressResponse {
    course: String,
    completed_checkpoints: Vec<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id.to_string(),
            name: user.name,
            email: user.email,
            bio: user.bio,
            location: user.location,
            profession: user.profession,
            role: user.role.as_str(),
            avatar: user.avatar,
            saved_courses: user.saved_courses.iter().map(|c| c.to_string()).collect(),
            progress: user
                .progress
                .into_iter()
                .map(|p| ProgressResponse {
                    course: p.course.to_string(),
                    completed_checkpoints: p
                        .completed_checkpoints
                        .iter()
                        .map(|c| c.to_string())
                        .collect(),
                })
                .collect(),
            created: user.created.to_rfc3339(),
        }
    }
}

async fn register(
    State(state): State<SharedState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    state
        .app
        .users
        .register(&req.name, &req.email, &req.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(::serde_json::json!({ "message": "user registered" })),
    ))
}

async fn login(
    State(state): State<SharedState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let user = state.app.users.login(&req.email, &req.password).await?;
    let token = issue_token(&state.jwt_secret, user.id)?;

    Ok(Json(LoginResponse {
        token,
        user: user.into(),
    }))
}

async fn profile(
    State(state): State<SharedState>,
    Auth(ctx): Auth,
) -> Result<Json<UserResponse>> {
    let user = state.app.users.profile(ctx.user_id).await?;

    Ok(Json(user.into()))
}

async fn public_profile(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>> {
    let user_id = parse_id(&user_id, "user")?;
    let user = state.app.users.profile(user_id).await?;

    Ok(Json(user.into()))
}

async fn update_profile(
    State(state): State<SharedState>,
    Auth(ctx): Auth,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>> {
    let user = state
        .app
        .users
        .update_profile(
            &ctx,
            ProfileUpdate {
                name: req.name,
                email: req.email,
                bio: req.bio,
                location: req.location,
                profession: req.profession,
            },
        )
        .await?;

    Ok(Json(user.into()))
}

async fn forgot_password(
    State(state): State<SharedState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Json<::serde_json::Value>> {
    state.app.users.forgot_password(&req.email).await?;

    Ok(Json(
        ::serde_json::json!({ "message": "reset code sent to your email" }),
    ))
}

async fn reset_password(
    State(state): State<SharedState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<::serde_json::Value>> {
    state
        .app
        .users
        .reset_password(&req.email, &req.otp, &req.new_password)
        .await?;

    Ok(Json(
        ::serde_json::json!({ "message": "password reset successfully" }),
    ))
}

async fn save_course(
    State(state): State<SharedState>,
    Auth(ctx): Auth,
    Path(course_id): Path<String>,
) -> Result<Json<::serde_json::Value>> {
    let course_id = parse_id(&course_id, "course")?;
    state.app.users.save_course(&ctx, course_id).await?;

    Ok(Json(
        ::serde_json::json!({ "message": "course saved successfully" }),
    ))
}

async fn unsave_course(
    State(state): State<SharedState>,
    Auth(ctx): Auth,
    Path(course_id): Path<String>,
) -> Result<Json<::serde_json::Value>> {
    let course_id = parse_id(&course_id, "course")?;
    state.app.users.unsave_course(&ctx, course_id).await?;

    Ok(Json(
        ::serde_json::json!({ "message": "course removed from saved list" }),
    ))
}

async fn saved_courses(
    State(state): State<SharedState>,
    Auth(ctx): Auth,
) -> Result<Json<Vec<CourseResponse>>> {
    let courses = state.app.users.saved_courses(&ctx).await?;

    Ok(Json(courses.into_iter().map(|c| c.into()).collect()))
}

async fn update_progress(
    State(state): State<SharedState>,
    Auth(ctx): Auth,
    Path(course_id): Path<String>,
    Json(req): Json<UpdateProgressRequest>,
) -> Result<Json<::serde_json::Value>> {
    let course_id = parse_id(&course_id, "course")?;
    let completed = req
        .completed_checkpoints
        .iter()
        .map(|raw| parse_id(raw, "checkpoint"))
        .collect::<Result<HashSet<_>>>()?;

    state
        .app
        .users
        .update_progress(&ctx, course_id, completed)
        .await?;

    Ok(Json(
        ::serde_json::json!({ "message": "progress updated" }),
    ))
}
