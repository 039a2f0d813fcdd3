use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use super::courses::CourseResponse;
use super::extract::Auth;
use super::{parse_id, SharedState};
use crate::entities::{Category, CategoryKind, Semester, University};
use crate::handlers::course::NewCourse;
use crate::handlers::{Error, Result};

pub fn categories_router() -> Router<SharedState> {
    Router::new()
        .route("/", get(categories).post(create_category))
        .route("/:category_id/universities", post(add_university))
        .route("/:category_id/courses", post(add_course_to_category))
}

pub fn universities_router() -> Router<SharedState> {
    Router::new()
        .route("/", get(universities))
        .route("/:university_id", get(university))
        .route("/:university_id/semesters", post(add_semester))
        .route("/semester/:semester_id/courses", post(add_course_to_semester))
}

#[derive(Debug, Deserialize)]
struct CreateCategoryRequest {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    icon: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AddUniversityRequest {
    name: String,
}

#[derive(Debug, Deserialize)]
struct AddSemesterRequest {
    number: u32,
}

#[derive(Debug, Deserialize)]
struct AddCourseRequest {
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

impl From<AddCourseRequest> for NewCourse {
    fn from(req: AddCourseRequest) -> Self {
        NewCourse {
            name: req.name,
            image: req.image,
            description: req.description,
            instructor: req.instructor,
            badge: req.badge,
        }
    }
}

#[derive(Debug, Serialize)]
struct CategoryResponse {
    id: String,
    name: String,
    #[serde(rename = "type")]
    kind: &'static str,
    icon: String,
    universities: Vec<String>,
    courses: Vec<String>,
}

#[derive(Debug, Serialize)]
struct UniversityResponse {
    id: String,
    name: String,
    semesters: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SemesterResponse {
    id: String,
    number: u32,
    courses: Vec<String>,
}

impl From<Category> for CategoryResponse {
    fn from(category: Category) -> Self {
        CategoryResponse {
            id: category.id.to_string(),
            name: category.name,
            kind: category.kind.as_str(),
            icon: category.icon,
            universities: category.universities.iter().map(|u| u.to_string()).collect(),
            courses: category.courses.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl From<University> for UniversityResponse {
    fn from(university: University) -> Self {
        UniversityResponse {
            id: university.id.to_string(),
            name: university.name,
            semesters: university.semesters.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl From<Semester> for SemesterResponse {
    fn from(semester: Semester) -> Self {
        SemesterResponse {
            id: semester.id.to_string(),
            number: semester.number,
            courses: semester.courses.iter().map(|c| c.to_string()).collect(),
        }
    }
}

async fn categories(
    State(state): State<SharedState>,
) -> Result<Json<Vec<CategoryResponse>>> {
    let categories = state.app.catalog.categories().await?;

    Ok(Json(categories.into_iter().map(|c| c.into()).collect()))
}

async fn create_category(
    State(state): State<SharedState>,
    Auth(ctx): Auth,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse> {
    let kind = CategoryKind::parse(&req.kind).ok_or_else(|| {
        Error::Validation("category type must be 'university' or 'general'".to_owned())
    })?;

    let category = state
        .app
        .catalog
        .create_category(&ctx, &req.name, kind, req.icon)
        .await?;

    Ok((StatusCode::CREATED, Json(CategoryResponse::from(category))))
}

async fn add_university(
    State(state): State<SharedState>,
    Auth(ctx): Auth,
    Path(category_id): Path<String>,
    Json(req): Json<AddUniversityRequest>,
) -> Result<impl IntoResponse> {
    let category_id = parse_id(&category_id, "category")?;
    let university = state
        .app
        .catalog
        .add_university(&ctx, category_id, &req.name)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UniversityResponse::from(university)),
    ))
}

async fn add_course_to_category(
    State(state): State<SharedState>,
    Auth(ctx): Auth,
    Path(category_id): Path<String>,
    Json(req): Json<AddCourseRequest>,
) -> Result<impl IntoResponse> {
    let category_id = parse_id(&category_id, "category")?;
    let course = state
        .app
        .catalog
        .add_course_to_category(&ctx, category_id, req.into())
        .await?;

    Ok((StatusCode::CREATED, Json(CourseResponse::from(course))))
}

async fn universities(
    State(state): State<SharedState>,
) -> Result<Json<Vec<UniversityResponse>>> {
    let universities = state.app.catalog.universities().await?;

    Ok(Json(universities.into_iter().map(|u| u.into()).collect()))
}

async fn university(
    State(state): State<SharedState>,
    Path(university_id): Path<String>,
) -> Result<Json<UniversityResponse>> {
    let university_id = parse_id(&university_id, "university")?;
    let university = state.app.catalog.university(university_id).await?;

    Ok(Json(university.into()))
}

async fn add_semester(
    State(state): State<SharedState>,
    Auth(ctx): Auth,
    Path(university_id): Path<String>,
    Json(req): Json<AddSemesterRequest>,
) -> Result<impl IntoResponse> {
    let university_id = parse_id(&university_id, "university")?;
    let semester = state
        .app
        .catalog
        .add_semester(&ctx, university_id, req.number)
        .await?;

    Ok((StatusCode::CREATED, Json(SemesterResponse::from(semester))))
}

async fn add_course_to_semester(
    State(state): State<SharedState>,
    Auth(ctx): Auth,
    Path(semester_id): Path<String>,
    Json(req): Json<AddCourseRequest>,
) -> Result<impl IntoResponse> {
    let semester_id = parse_id(&semester_id, "semester")?;
    let course = state
        .app
        .catalog
        .add_course_to_semester(&ctx, semester_id, req.into())
        .await?;

    Ok((StatusCode::CREATED, Json(CourseResponse::from(course))))
}
