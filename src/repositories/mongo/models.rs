use std::collections::HashSet;

#[derive(Debug, Clone, ::serde::Serialize, ::serde::Deserialize)]
pub struct MongoUserModel {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub bio: String,
    pub location: String,
    pub profession: String,
    pub role: String,
    pub avatar: String,
    pub saved_courses: Vec<String>,
    pub progress: Vec<MongoProgressModel>,
    pub reset_otp: Option<String>,
    // millis since epoch so the store can compare it in a filter
    pub reset_expires: Option<i64>,
    pub created: String,
}

#[derive(Debug, Clone, ::serde::Serialize, ::serde::Deserialize)]
pub struct MongoProgressModel {
    pub course: String,
    pub completed_checkpoints: HashSet<String>,
}

#[derive(Debug, Clone, ::serde::Serialize, ::serde::Deserialize)]
pub struct MongoCourseModel {
    pub id: String,
    pub name: String,
    pub image: String,
    pub description: String,
    pub views: i64,
    pub instructor: String,
    pub badge: String,
    pub resources: Vec<MongoResourceModel>,
    pub checkpoints: Vec<MongoCheckpointModel>,
}

#[derive(Debug, Clone, ::serde::Serialize, ::serde::Deserialize)]
pub struct MongoResourceModel {
    pub id: String,
    pub title: String,
    pub url: String,
    pub description: String,
    pub tags: Vec<String>,
    pub kind: String,
    pub added_by: String,
    pub upvoted_by: HashSet<String>,
    // denormalized; always mutated together with `upvoted_by`
    pub upvotes: i64,
    pub comments: Vec<MongoCommentModel>,
}

#[derive(Debug, Clone, ::serde::Serialize, ::serde::Deserialize)]
pub struct MongoCheckpointModel {
    pub id: String,
    pub title: String,
    pub resources: Vec<String>,
}

#[derive(Debug, Clone, ::serde::Serialize, ::serde::Deserialize)]
pub struct MongoCommentModel {
    pub user: String,
    pub text: String,
    pub created: String,
}

#[derive(Debug, Clone, ::serde::Serialize, ::serde::Deserialize)]
pub struct MongoCategoryModel {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub icon: String,
    pub universities: Vec<String>,
    pub courses: Vec<String>,
}

#[derive(Debug, Clone, ::serde::Serialize, ::serde::Deserialize)]
pub struct MongoUniversityModel {
    pub id: String,
    pub name: String,
    pub semesters: Vec<String>,
}

#[derive(Debug, Clone, ::serde::Serialize, ::serde::Deserialize)]
pub struct MongoSemesterModel {
    pub id: String,
    pub number: i64,
    pub courses: Vec<String>,
}

#[derive(Debug, Clone, ::serde::Serialize, ::serde::Deserialize)]
pub struct MongoPostModel {
    pub id: String,
    pub user: String,
    pub content: String,
    pub created: String,
    pub likes: HashSet<String>,
    pub comments: Vec<MongoCommentModel>,
}
