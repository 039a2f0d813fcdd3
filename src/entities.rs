use std::collections::HashSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub type Date = DateTime<Utc>;

macro_rules! id_type {
    ($( $name:ident ),* $(,)?) => {$(
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self { Self(Uuid::new_v4()) }
        }

        impl Default for $name {
            fn default() -> Self { Self::new() }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::uuid::Error;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                Ok(Self(s.parse()?))
            }
        }
    )*};
}

id_type! {
    UserId,
    CourseId,
    ResourceId,
    CheckpointId,
    CategoryId,
    UniversityId,
    SemesterId,
    PostId,
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub bio: String,
    pub location: String,
    pub profession: String,
    pub role: Role,
    pub avatar: String,
    // ordered, unique at the application level
    pub saved_courses: Vec<CourseId>,
    // at most one entry per course
    pub progress: Vec<CourseProgress>,
    pub password_reset: Option<PasswordReset>,
    pub created: Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw {
            "admin" => Role::Admin,
            _ => Role::User,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CourseProgress {
    pub course: CourseId,
    pub completed_checkpoints: HashSet<CheckpointId>,
}

// single valid instance per user; overwritten by each new request
#[derive(Debug, Clone)]
pub struct PasswordReset {
    pub otp: String,
    pub expires: Date,
}

#[derive(Debug, Clone)]
pub struct Course {
    pub id: CourseId,
    pub name: String,
    pub image: String,
    pub description: String,
    pub views: i64,
    pub instructor: String,
    pub badge: String,
    pub resources: Vec<Resource>,
    pub checkpoints: Vec<Checkpoint>,
}

#[derive(Debug, Clone)]
pub struct Resource {
    pub id: ResourceId,
    pub title: String,
    pub url: String,
    pub description: String,
    pub tags: Vec<String>,
    pub kind: ResourceKind,
    pub added_by: UserId,
    pub upvoted_by: HashSet<UserId>,
    pub comments: Vec<Comment>,
}

impl Resource {
    pub fn upvotes(&self) -> usize { self.upvoted_by.len() }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Video,
    Article,
    Documentation,
    Other,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Video => "video",
            ResourceKind::Article => "article",
            ResourceKind::Documentation => "documentation",
            ResourceKind::Other => "other",
        }
    }

    // unknown kinds degrade to Other rather than failing
    pub fn parse(raw: &str) -> Self {
        match raw {
            "video" => ResourceKind::Video,
            "article" => ResourceKind::Article,
            "documentation" => ResourceKind::Documentation,
            _ => ResourceKind::Other,
        }
    }
}

// a named grouping over a subset of the owning course's resources
#[derive(Debug, Clone)]
pub struct Checkpoint {
    pub id: CheckpointId,
    pub title: String,
    pub resources: Vec<ResourceId>,
}

#[derive(Debug, Clone)]
pub struct Comment {
    pub user: UserId,
    pub text: String,
    pub created: Date,
}

#[derive(Debug, Clone)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub kind: CategoryKind,
    pub icon: String,
    // populated only when kind is University
    pub universities: Vec<UniversityId>,
    // populated only when kind is General
    pub courses: Vec<CourseId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryKind {
    University,
    General,
}

impl CategoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryKind::University => "university",
            CategoryKind::General => "general",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "university" => Some(CategoryKind::University),
            "general" => Some(CategoryKind::General),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct University {
    pub id: UniversityId,
    pub name: String,
    pub semesters: Vec<SemesterId>,
}

#[derive(Debug, Clone)]
pub struct Semester {
    pub id: SemesterId,
    pub number: u32,
    pub courses: Vec<CourseId>,
}

#[derive(Debug, Clone)]
pub struct Post {
    pub id: PostId,
    pub user: UserId,
    pub content: String,
    pub created: Date,
    pub likes: HashSet<UserId>,
    pub comments: Vec<Comment>,
}

impl Post {
    pub fn like_count(&self) -> usize { self.likes.len() }
}
