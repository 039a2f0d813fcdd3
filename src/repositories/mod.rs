use std::collections::HashSet;

use async_trait::async_trait;
use regex::Regex;
use smallvec::SmallVec;

use crate::entities::{
    Category, CategoryId, Checkpoint, CheckpointId, Comment, Course, CourseId, Date, PasswordReset,
    Post, PostId, Resource, ResourceId, Semester, SemesterId, University, UniversityId, User,
    UserId,
};

pub mod mock;
pub mod mongo;

pub const FEED_PAGE: usize = 20;

type Result<T> = ::std::result::Result<T, RepositoryError>;

#[async_trait]
pub trait UserRepository {
    /// `false` means the unique email constraint rejected the insert.
    async fn insert(&self, item: User) -> Result<bool>;
    async fn is_exists(&self, id: UserId) -> Result<bool>;

    async fn find(&self, id: UserId) -> Result<User>;
    async fn find_by_email(&self, email: &str) -> Result<User>;
    async fn is_email_taken(&self, email: &str, excluding: UserId) -> Result<bool>;

    async fn update(&self, id: UserId, mutation: UserMutation) -> Result<User>;

    async fn is_saved_course(&self, id: UserId, course_id: CourseId) -> Result<bool>;
    async fn insert_saved_course(&self, id: UserId, course_id: CourseId) -> Result<bool>;
    async fn delete_saved_course(&self, id: UserId, course_id: CourseId) -> Result<bool>;

    async fn set_progress(
        &self,
        id: UserId,
        course_id: CourseId,
        completed: HashSet<CheckpointId>,
    ) -> Result<()>;

    async fn set_password_reset(&self, id: UserId, reset: PasswordReset) -> Result<()>;
    /// Single conditional update: matches (email, otp, unexpired), replaces
    /// the password hash and clears the reset fields. `false` = no match.
    async fn consume_password_reset(
        &self,
        email: &str,
        otp: &str,
        now: Date,
        password_hash: String,
    ) -> Result<bool>;
}

#[async_trait]
pub trait CourseRepository {
    async fn insert(&self, item: Course) -> Result<bool>;
    async fn is_exists(&self, id: CourseId) -> Result<bool>;

    async fn find(&self, id: CourseId) -> Result<Course>;
    async fn finds(&self, query: CourseQuery) -> Result<Vec<Course>>;

    async fn push_resource(&self, id: CourseId, resource: Resource) -> Result<()>;
    async fn push_checkpoint(&self, id: CourseId, checkpoint: Checkpoint) -> Result<()>;

    async fn is_upvoted(
        &self,
        id: CourseId,
        resource_id: ResourceId,
        user_id: UserId,
    ) -> Result<bool>;
    /// Add-if-absent; `false` means the user had already upvoted.
    async fn insert_upvote(
        &self,
        id: CourseId,
        resource_id: ResourceId,
        user_id: UserId,
    ) -> Result<bool>;
    /// Remove-if-present; `false` means the user had not upvoted.
    async fn delete_upvote(
        &self,
        id: CourseId,
        resource_id: ResourceId,
        user_id: UserId,
    ) -> Result<bool>;

    async fn push_resource_comment(
        &self,
        id: CourseId,
        resource_id: ResourceId,
        comment: Comment,
    ) -> Result<()>;

    /// Returns the incremented value.
    async fn incr_views(&self, id: CourseId) -> Result<i64>;
}

#[async_trait]
pub trait CategoryRepository {
    /// `false` means the unique name constraint rejected the insert.
    async fn insert(&self, item: Category) -> Result<bool>;
    async fn find(&self, id: CategoryId) -> Result<Category>;
    async fn finds(&self) -> Result<Vec<Category>>;

    async fn push_university(&self, id: CategoryId, university_id: UniversityId) -> Result<()>;
    async fn push_course(&self, id: CategoryId, course_id: CourseId) -> Result<()>;
}

#[async_trait]
pub trait UniversityRepository {
    async fn insert(&self, item: University) -> Result<bool>;
    async fn find(&self, id: UniversityId) -> Result<University>;
    async fn finds(&self) -> Result<Vec<University>>;

    async fn push_semester(&self, id: UniversityId, semester_id: SemesterId) -> Result<()>;
}

#[async_trait]
pub trait SemesterRepository {
    async fn insert(&self, item: Semester) -> Result<bool>;
    async fn find(&self, id: SemesterId) -> Result<Semester>;

    async fn push_course(&self, id: SemesterId, course_id: CourseId) -> Result<()>;
}

#[async_trait]
pub trait PostRepository {
    async fn insert(&self, item: Post) -> Result<bool>;
    async fn find(&self, id: PostId) -> Result<Post>;

    /// Fixed-size page, newest first. `page` is zero-based.
    async fn page(&self, page: u32) -> Result<SmallVec<[Post; FEED_PAGE]>>;

    async fn insert_like(&self, id: PostId, user_id: UserId) -> Result<bool>;
    async fn delete_like(&self, id: PostId, user_id: UserId) -> Result<bool>;

    async fn push_comment(&self, id: PostId, comment: Comment) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct CourseQuery {
    pub name: Option<Regex>,
}

#[derive(Debug, Clone, Default)]
pub struct UserMutation {
    pub name: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub profession: Option<String>,
}

#[derive(Debug)]
pub enum RepositoryError {
    NotFound,
    NoUnique { matched: u32 },
    Internal(anyhow::Error),
}

impl ::std::fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        match self {
            RepositoryError::NotFound => write!(f, "cannot find object."),
            RepositoryError::NoUnique { matched } => write!(
                f,
                "expected unique object, found non-unique objects (matched: {})",
                matched
            ),
            RepositoryError::Internal(e) => write!(f, "internal error: {}", e),
        }
    }
}

impl ::std::error::Error for RepositoryError {}
