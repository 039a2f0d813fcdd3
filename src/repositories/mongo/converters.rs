use anyhow::anyhow;
use chrono::SecondsFormat;
use mongodb::bson::{doc, Document};
use mongodb::error::Result as MongoResult;

use super::models::{
    MongoCategoryModel, MongoCheckpointModel, MongoCommentModel, MongoCourseModel,
    MongoPostModel, MongoProgressModel, MongoResourceModel, MongoSemesterModel,
    MongoUniversityModel, MongoUserModel,
};
use super::{RepositoryError, Result as RepoResult};
use crate::entities::{
    Category, CategoryKind, Checkpoint, Comment, Course, CourseProgress, Date, PasswordReset,
    Post, Resource, ResourceKind, Role, Semester, University, User,
};
use crate::repositories::{CourseQuery, UserMutation};

pub fn convert_repo_err<T, E>(result: Result<T, E>) -> RepoResult<T>
where E: Sync + Send + ::std::error::Error + 'static {
    result.map_err(|e| RepositoryError::Internal(anyhow!(e)))
}

pub fn try_unique_check<T>(result: MongoResult<T>) -> RepoResult<bool> {
    match match match result {
        Ok(_) => return Ok(true),
        Err(e) => (*e.kind.clone(), e),
    } {
        (
            ::mongodb::error::ErrorKind::Write(::mongodb::error::WriteFailure::WriteError(e)),
            src,
        ) => (e.code, src),
        (_, src) => return Err(RepositoryError::Internal(anyhow!(src))),
    } {
        (11000, _) => Ok(false),
        (_, src) => Err(RepositoryError::Internal(anyhow!(src))),
    }
}

pub fn convert_404_or<T>(option: Option<T>) -> RepoResult<T> {
    match option {
        Some(t) => Ok(t),
        None => Err(RepositoryError::NotFound),
    }
}

pub fn to_bool<N>(number: N) -> bool
where N: ::core::convert::TryInto<i8> + ::core::fmt::Debug + Clone {
    match match ::core::convert::TryInto::<i8>::try_into(number.clone()) {
        Ok(n) => n,
        Err(_) => unreachable!("expected 0 or 1, found: {:?}", number),
    } {
        0 => false,
        1 => true,
        n => unreachable!("expected 0 or 1, found: {}", n),
    }
}

// fixed-precision RFC 3339 so lexicographic order equals time order
pub fn date_to_wire(date: Date) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn date_from_wire(raw: &str) -> Date {
    ::chrono::DateTime::parse_from_rfc3339(raw)
        .unwrap()
        .with_timezone(&::chrono::Utc)
}

impl From<CourseQuery> for Document {
    fn from(CourseQuery { name }: CourseQuery) -> Self {
        let mut query = doc! {};

        if let Some(re) = name {
            // inline flags like (?i) travel inside the pattern itself
            query.insert("name", doc! { "$regex": re.as_str() });
        }

        query
    }
}

impl From<UserMutation> for Document {
    fn from(
        UserMutation {
            name,
            email,
            bio,
            location,
            profession,
        }: UserMutation,
    ) -> Self {
        let mut mutation = doc! {};

        if let Some(val) = name {
            mutation.insert("name", val);
        }
        if let Some(val) = email {
            mutation.insert("email", val);
        }
        if let Some(val) = bio {
            mutation.insert("bio", val);
        }
        if let Some(val) = location {
            mutation.insert("location", val);
        }
        if let Some(val) = profession {
            mutation.insert("profession", val);
        }

        mutation
    }
}

impl From<MongoUserModel> for User {
    fn from(
        MongoUserModel {
            id,
            name,
            email,
            password,
            bio,
            location,
            profession,
            role,
            avatar,
            saved_courses,
            progress,
            reset_otp,
            reset_expires,
            created,
        }: MongoUserModel,
    ) -> Self {
        let password_reset = match (reset_otp, reset_expires) {
            (Some(otp), Some(millis)) => Some(PasswordReset {
                otp,
                expires: ::chrono::DateTime::from_timestamp_millis(millis).unwrap(),
            }),
            _ => None,
        };

        User {
            id: id.parse().unwrap(),
            name,
            email,
            password_hash: password,
            bio,
            location,
            profession,
            role: Role::parse(&role),
            avatar,
            saved_courses: saved_courses
                .iter()
                .map(|s| s.parse().unwrap())
                .collect(),
            progress: progress.into_iter().map(|m| m.into()).collect(),
            password_reset,
            created: date_from_wire(&created),
        }
    }
}
impl From<User> for MongoUserModel {
    fn from(
        User {
            id,
            name,
            email,
            password_hash,
            bio,
            location,
            profession,
            role,
            avatar,
            saved_courses,
            progress,
            password_reset,
            created,
        }: User,
    ) -> Self {
        let (reset_otp, reset_expires) = match password_reset {
            Some(PasswordReset { otp, expires }) => {
                (Some(otp), Some(expires.timestamp_millis()))
            },
            None => (None, None),
        };

        MongoUserModel {
            id: id.to_string(),
            name,
            email,
            password: password_hash,
            bio,
            location,
            profession,
            role: role.as_str().to_owned(),
            avatar,
            saved_courses: saved_courses.iter().map(|c| c.to_string()).collect(),
            progress: progress.into_iter().map(|p| p.into()).collect(),
            reset_otp,
            reset_expires,
            created: date_to_wire(created),
        }
    }
}

impl From<MongoProgressModel> for CourseProgress {
    fn from(
        MongoProgressModel {
            course,
            mut completed_checkpoints,
        }: MongoProgressModel,
    ) -> Self {
        CourseProgress {
            course: course.parse().unwrap(),
            completed_checkpoints: completed_checkpoints
                .drain()
                .map(|s| s.parse().unwrap())
                .collect(),
        }
    }
}
impl From<CourseProgress> for MongoProgressModel {
    fn from(
        CourseProgress {
            course,
            mut completed_checkpoints,
        }: CourseProgress,
    ) -> Self {
        MongoProgressModel {
            course: course.to_string(),
            completed_checkpoints: completed_checkpoints
                .drain()
                .map(|c| c.to_string())
                .collect(),
        }
    }
}

impl From<MongoCourseModel> for Course {
    fn from(
        MongoCourseModel {
            id,
            name,
            image,
            description,
            views,
            instructor,
            badge,
            resources,
            checkpoints,
        }: MongoCourseModel,
    ) -> Self {
        Course {
            id: id.parse().unwrap(),
            name,
            image,
            description,
            views,
            instructor,
            badge,
            resources: resources.into_iter().map(|m| m.into()).collect(),
            checkpoints: checkpoints.into_iter().map(|m| m.into()).collect(),
        }
    }
}
impl From<Course> for MongoCourseModel {
    fn from(
        Course {
            id,
            name,
            image,
            description,
            views,
            instructor,
            badge,
            resources,
            checkpoints,
        }: Course,
    ) -> Self {
        MongoCourseModel {
            id: id.to_string(),
            name,
            image,
            description,
            views,
            instructor,
            badge,
            resources: resources.into_iter().map(|r| r.into()).collect(),
            checkpoints: checkpoints.into_iter().map(|c| c.into()).collect(),
        }
    }
}

impl From<MongoResourceModel> for Resource {
    fn from(
        MongoResourceModel {
            id,
            title,
            url,
            description,
            tags,
            kind,
            added_by,
            mut upvoted_by,
            upvotes: _,
            comments,
        }: MongoResourceModel,
    ) -> Self {
        Resource {
            id: id.parse().unwrap(),
            title,
            url,
            description,
            tags,
            kind: ResourceKind::parse(&kind),
            added_by: added_by.parse().unwrap(),
            upvoted_by: upvoted_by.drain().map(|s| s.parse().unwrap()).collect(),
            comments: comments.into_iter().map(|m| m.into()).collect(),
        }
    }
}
impl From<Resource> for MongoResourceModel {
    fn from(
        Resource {
            id,
            title,
            url,
            description,
            tags,
            kind,
            added_by,
            mut upvoted_by,
            comments,
        }: Resource,
    ) -> Self {
        MongoResourceModel {
            id: id.to_string(),
            title,
            url,
            description,
            tags,
            kind: kind.as_str().to_owned(),
            added_by: added_by.to_string(),
            upvotes: upvoted_by.len() as i64,
            upvoted_by: upvoted_by.drain().map(|u| u.to_string()).collect(),
            comments: comments.into_iter().map(|c| c.into()).collect(),
        }
    }
}

impl From<MongoCheckpointModel> for Checkpoint {
    fn from(MongoCheckpointModel { id, title, resources }: MongoCheckpointModel) -> Self {
        Checkpoint {
            id: id.parse().unwrap(),
            title,
            resources: resources.iter().map(|s| s.parse().unwrap()).collect(),
        }
    }
}
impl From<Checkpoint> for MongoCheckpointModel {
    fn from(Checkpoint { id, title, resources }: Checkpoint) -> Self {
        MongoCheckpointModel {
            id: id.to_string(),
            title,
            resources: resources.iter().map(|r| r.to_string()).collect(),
        }
    }
}

impl From<MongoCommentModel> for Comment {
    fn from(MongoCommentModel { user, text, created }: MongoCommentModel) -> Self {
        Comment {
            user: user.parse().unwrap(),
            text,
            created: date_from_wire(&created),
        }
    }
}
impl From<Comment> for MongoCommentModel {
    fn from(Comment { user, text, created }: Comment) -> Self {
        MongoCommentModel {
            user: user.to_string(),
            text,
            created: date_to_wire(created),
        }
    }
}

impl From<MongoCategoryModel> for Category {
    fn from(
        MongoCategoryModel {
            id,
            name,
            kind,
            icon,
            universities,
            courses,
        }: MongoCategoryModel,
    ) -> Self {
        Category {
            id: id.parse().unwrap(),
            name,
            kind: CategoryKind::parse(&kind).unwrap_or(CategoryKind::General),
            icon,
            universities: universities.iter().map(|s| s.parse().unwrap()).collect(),
            courses: courses.iter().map(|s| s.parse().unwrap()).collect(),
        }
    }
}
impl From<Category> for MongoCategoryModel {
    fn from(
        Category {
            id,
            name,
            kind,
            icon,
            universities,
            courses,
        }: Category,
    ) -> Self {
        MongoCategoryModel {
            id: id.to_string(),
            name,
            kind: kind.as_str().to_owned(),
            icon,
            universities: universities.iter().map(|u| u.to_string()).collect(),
            courses: courses.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl From<MongoUniversityModel> for University {
    fn from(MongoUniversityModel { id, name, semesters }: MongoUniversityModel) -> Self {
        University {
            id: id.parse().unwrap(),
            name,
            semesters: semesters.iter().map(|s| s.parse().unwrap()).collect(),
        }
    }
}
impl From<University> for MongoUniversityModel {
    fn from(University { id, name, semesters }: University) -> Self {
        MongoUniversityModel {
            id: id.to_string(),
            name,
            semesters: semesters.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl From<MongoSemesterModel> for Semester {
    fn from(MongoSemesterModel { id, number, courses }: MongoSemesterModel) -> Self {
        Semester {
            id: id.parse().unwrap(),
            number: number as u32,
            courses: courses.iter().map(|s| s.parse().unwrap()).collect(),
        }
    }
}
impl From<Semester> for MongoSemesterModel {
    fn from(Semester { id, number, courses }: Semester) -> Self {
        MongoSemesterModel {
            id: id.to_string(),
            number: number as i64,
            courses: courses.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl From<MongoPostModel> for Post {
    fn from(
        MongoPostModel {
            id,
            user,
            content,
            created,
            mut likes,
            comments,
        }: MongoPostModel,
    ) -> Self {
        Post {
            id: id.parse().unwrap(),
            user: user.parse().unwrap(),
            content,
            created: date_from_wire(&created),
            likes: likes.drain().map(|s| s.parse().unwrap()).collect(),
            comments: comments.into_iter().map(|m| m.into()).collect(),
        }
    }
}
impl From<Post> for MongoPostModel {
    fn from(
        Post {
            id,
            user,
            content,
            created,
            mut likes,
            comments,
        }: Post,
    ) -> Self {
        MongoPostModel {
            id: id.to_string(),
            user: user.to_string(),
            content,
            created: date_to_wire(created),
            likes: likes.drain().map(|u| u.to_string()).collect(),
            comments: comments.into_iter().map(|c| c.into()).collect(),
        }
    }
}
