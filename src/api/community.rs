use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use super::courses::CommentResponse;
use super::extract::Auth;
use super::{parse_id, SharedState};
use crate::entities::Post;
use crate::handlers::Result;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(feed))
        .route("/createpost", post(create_post))
        .route("/:post_id/like", post(toggle_like))
        .route("/:post_id/comment", post(add_comment))
}

#[derive(Debug, Deserialize)]
struct FeedQuery {
    page: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CreatePostRequest {
    content: String,
}

#[derive(Debug, Deserialize)]
struct AddCommentRequest {
    text: String,
}

#[derive(Debug, Serialize)]
struct PostResponse {
    id: String,
    user: String,
    content: String,
    created: String,
    likes: Vec<String>,
    like_count: usize,
    comments: Vec<CommentResponse>,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        PostResponse {
            id: post.id.to_string(),
            user: post.user.to_string(),
            content: post.content,
            created: post.created.to_rfc3339(),
            like_count: post.likes.len(),
            likes: post.likes.iter().map(|u| u.to_string()).collect(),
            comments: post.comments.into_iter().map(|c| c.into()).collect(),
        }
    }
}

async fn feed(
    State(state): State<SharedState>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Vec<PostResponse>>> {
    let posts = state.app.posts.feed(query.page.unwrap_or(0)).await?;

    Ok(Json(posts.into_iter().map(|p| p.into()).collect()))
}

async fn create_post(
    State(state): State<SharedState>,
    Auth(ctx): Auth,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse> {
    let post = state.app.posts.create_post(&ctx, &req.content).await?;

    Ok((StatusCode::CREATED, Json(PostResponse::from(post))))
}

async fn toggle_like(
    State(state): State<SharedState>,
    Auth(ctx): Auth,
    Path(post_id): Path<String>,
) -> Result<Json<PostResponse>> {
    let post_id = parse_id(&post_id, "post")?;
    let post = state.app.posts.toggle_like(&ctx, post_id).await?;

    Ok(Json(post.into()))
}

async fn add_comment(
    State(state): State<SharedState>,
    Auth(ctx): Auth,
    Path(post_id): Path<String>,
    Json(req): Json<AddCommentRequest>,
) -> Result<Json<PostResponse>> {
    let post_id = parse_id(&post_id, "post")?;
    state.app.posts.add_comment(&ctx, post_id, &req.text).await?;

    let post = state.app.posts.post(post_id).await?;
    Ok(Json(post.into()))
}
