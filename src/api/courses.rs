use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use super::extract::Auth;
use super::{parse_id, SharedState};
use crate::entities::{Checkpoint, Comment, Course, Resource, ResourceKind};
use crate::handlers::course::{NewCourse, NewResource};
use crate::handlers::Result;
use crate::repositories::CourseQuery;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_courses))
        .route("/create", post(create_course))
        .route("/:course_id", get(course))
        .route("/:course_id/view", post(view_course))
        .route("/:course_id/resources", post(add_resource))
        .route("/:course_id/checkpoints", post(add_checkpoint))
        .route(
            "/:course_id/resources/:resource_id/upvote",
            post(upvote_resource).delete(remove_upvote),
        )
        .route(
            "/:course_id/resources/:resource_id/comments",
            get(comments).post(add_comment),
        )
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    search: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateCourseRequest {
    name: String,
    #[serde(default)]
    image: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    instructor: String,
    #[serde(default)]
    badge: String,
}

#[derive(Debug, Deserialize)]
struct AddResourceRequest {
    title: String,
    url: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AddCheckpointRequest {
    title: String,
    #[serde(default)]
    resources: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AddCommentRequest {
    text: String,
}

#[derive(Debug, Serialize)]
pub struct CourseResponse {
    pub id: String,
    pub name: String,
    pub image: String,
    pub description: String,
    pub views: i64,
    pub instructor: String,
    pub badge: String,
    pub resources: Vec<ResourceResponse>,
    pub checkpoints: Vec<CheckpointResponse>,
}

#[derive(Debug, Serialize)]
pub struct ResourceResponse {
    pub id: String,
    pub title: String,
    pub url: String,
    pub description: String,
    pub tags: Vec<String>,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub added_by: String,
    pub upvotes: usize,
    pub upvoted_by: Vec<String>,
    pub comments: Vec<CommentResponse>,
}

#[derive(Debug, Serialize)]
pub struct CheckpointResponse {
    pub id: String,
    pub title: String,
    pub resources: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub user: String,
    pub text: String,
    pub created: String,
}

impl From<Course> for CourseResponse {
    fn from(course: Course) -> Self {
        CourseResponse {
            id: course.id.to_string(),
            name: course.name,
            image: course.image,
            description: course.description,
            views: course.views,
            instructor: course.instructor,
            badge: course.badge,
            resources: course.resources.into_iter().map(|r| r.into()).collect(),
            checkpoints: course.checkpoints.into_iter().map(|c| c.into()).collect(),
        }
    }
}

impl From<Resource> for ResourceResponse {
    fn from(resource: Resource) -> Self {
        ResourceResponse {
            id: resource.id.to_string(),
            title: resource.title,
            url: resource.url,
            description: resource.description,
            tags: resource.tags,
            kind: resource.kind.as_str(),
            added_by: resource.added_by.to_string(),
            upvotes: resource.upvoted_by.len(),
            upvoted_by: resource.upvoted_by.iter().map(|u| u.to_string()).collect(),
            comments: resource.comments.into_iter().map(|c| c.into()).collect(),
        }
    }
}

impl From<Checkpoint> for CheckpointResponse {
    fn from(checkpoint: Checkpoint) -> Self {
        CheckpointResponse {
            id: checkpoint.id.to_string(),
            title: checkpoint.title,
            resources: checkpoint.resources.iter().map(|r| r.to_string()).collect(),
        }
    }
}

impl From<Comment> for CommentResponse {
    fn from(comment: Comment) -> Self {
        CommentResponse {
            user: comment.user.to_string(),
            text: comment.text,
            created: comment.created.to_rfc3339(),
        }
    }
}

async fn list_courses(
    State(state): State<SharedState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<CourseResponse>>> {
    let name = match query.search {
        Some(raw) if !raw.trim().is_empty() => Some(
            ::regex::Regex::new(&format!("(?i){}", ::regex::escape(raw.trim())))
                .map_err(|e| crate::handlers::Error::Validation(format!("invalid search: {}", e)))?,
        ),
        _ => None,
    };

    let courses = state.app.courses.list_courses(CourseQuery { name }).await?;

    Ok(Json(courses.into_iter().map(|c| c.into()).collect()))
}

async fn create_course(
    State(state): State<SharedState>,
    Auth(ctx): Auth,
    Json(req): Json<CreateCourseRequest>,
) -> Result<impl IntoResponse> {
    let course = state
        .app
        .courses
        .create_course(
            &ctx,
            NewCourse {
                name: req.name,
                image: req.image,
                description: req.description,
                instructor: req.instructor,
                badge: req.badge,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(CourseResponse::from(course))))
}

async fn course(
    State(state): State<SharedState>,
    Path(course_id): Path<String>,
) -> Result<Json<CourseResponse>> {
    let course_id = parse_id(&course_id, "course")?;
    let course = state.app.courses.course(course_id).await?;

    Ok(Json(course.into()))
}

async fn view_course(
    State(state): State<SharedState>,
    Path(course_id): Path<String>,
) -> Result<Json<::serde_json::Value>> {
    let course_id = parse_id(&course_id, "course")?;
    let views = state.app.courses.view_course(course_id).await?;

    Ok(Json(::serde_json::json!({ "views": views })))
}

async fn add_resource(
    State(state): State<SharedState>,
    Auth(ctx): Auth,
    Path(course_id): Path<String>,
    Json(req): Json<AddResourceRequest>,
) -> Result<impl IntoResponse> {
    let course_id = parse_id(&course_id, "course")?;

    let resource = state
        .app
        .courses
        .add_resource(
            &ctx,
            course_id,
            NewResource {
                title: req.title,
                url: req.url,
                description: req.description,
                tags: req.tags,
                kind: req
                    .kind
                    .as_deref()
                    .map(ResourceKind::parse)
                    .unwrap_or(ResourceKind::Other),
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ResourceResponse::from(resource))))
}

async fn add_checkpoint(
    State(state): State<SharedState>,
    Auth(ctx): Auth,
    Path(course_id): Path<String>,
    Json(req): Json<AddCheckpointRequest>,
) -> Result<impl IntoResponse> {
    let course_id = parse_id(&course_id, "course")?;
    let resource_ids = req
        .resources
        .iter()
        .map(|raw| parse_id(raw, "resource"))
        .collect::<Result<Vec<_>>>()?;

    let checkpoint = state
        .app
        .courses
        .add_checkpoint(&ctx, course_id, &req.title, resource_ids)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CheckpointResponse::from(checkpoint)),
    ))
}

async fn upvote_resource(
    State(state): State<SharedState>,
    Auth(ctx): Auth,
    Path((course_id, resource_id)): Path<(String, String)>,
) -> Result<Json<::serde_json::Value>> {
    let course_id = parse_id(&course_id, "course")?;
    let resource_id = parse_id(&resource_id, "resource")?;

    let upvotes = state
        .app
        .courses
        .upvote_resource(&ctx, course_id, resource_id)
        .await?;

    Ok(Json(::serde_json::json!({ "upvotes": upvotes })))
}

async fn remove_upvote(
    State(state): State<SharedState>,
    Auth(ctx): Auth,
    Path((course_id, resource_id)): Path<(String, String)>,
) -> Result<Json<::serde_json::Value>> {
    let course_id = parse_id(&course_id, "course")?;
    let resource_id = parse_id(&resource_id, "resource")?;

    let upvotes = state
        .app
        .courses
        .remove_upvote(&ctx, course_id, resource_id)
        .await?;

    Ok(Json(::serde_json::json!({ "upvotes": upvotes })))
}

async fn comments(
    State(state): State<SharedState>,
    Path((course_id, resource_id)): Path<(String, String)>,
) -> Result<Json<Vec<CommentResponse>>> {
    let course_id = parse_id(&course_id, "course")?;
    let resource_id = parse_id(&resource_id, "resource")?;

    let comments = state.app.courses.comments(course_id, resource_id).await?;

    Ok(Json(comments.into_iter().map(|c| c.into()).collect()))
}

async fn add_comment(
    State(state): State<SharedState>,
    Auth(ctx): Auth,
    Path((course_id, resource_id)): Path<(String, String)>,
    Json(req): Json<AddCommentRequest>,
) -> Result<impl IntoResponse> {
    let course_id = parse_id(&course_id, "course")?;
    let resource_id = parse_id(&resource_id, "resource")?;

    let comment = state
        .app
        .courses
        .add_comment(&ctx, course_id, resource_id, &req.text)
        .await?;

    Ok((StatusCode::CREATED, Json(CommentResponse::from(comment))))
}
