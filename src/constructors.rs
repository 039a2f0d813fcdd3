use std::sync::Arc;

use crate::entities::{Category, Course, Post, Semester, University, User};
use crate::handlers::catalog::CatalogHandler;
use crate::handlers::course::CourseHandler;
use crate::handlers::post::PostHandler;
use crate::handlers::user::UserHandler;
use crate::repositories::mock::InMemoryRepository;
use crate::repositories::mongo::{
    MongoCategoryRepository, MongoCourseRepository, MongoPostRepository, MongoSemesterRepository,
    MongoUniversityRepository, MongoUserRepository,
};

pub struct App {
    pub users: UserHandler,
    pub courses: CourseHandler,
    pub catalog: CatalogHandler,
    pub posts: PostHandler,
}

pub fn in_memory() -> App {
    let users = Arc::new(InMemoryRepository::<User>::new());
    let courses = Arc::new(InMemoryRepository::<Course>::new());
    let categories = Arc::new(InMemoryRepository::<Category>::new());
    let universities = Arc::new(InMemoryRepository::<University>::new());
    let semesters = Arc::new(InMemoryRepository::<Semester>::new());
    let posts = Arc::new(InMemoryRepository::<Post>::new());

    App {
        users: UserHandler {
            users,
            courses: courses.clone(),
        },
        courses: CourseHandler {
            courses: courses.clone(),
        },
        catalog: CatalogHandler {
            categories,
            universities,
            semesters,
            courses,
        },
        posts: PostHandler { posts },
    }
}

pub async fn mongo(
    uri_str: impl AsRef<str>,
    db_name: impl AsRef<str>,
) -> ::anyhow::Result<App> {
    let c = ::mongodb::Client::with_uri_str(uri_str.as_ref()).await?;
    let db = c.database(db_name.as_ref());

    let users = Arc::new(MongoUserRepository::new_with(c.clone(), db.clone()).await?);
    let courses = Arc::new(MongoCourseRepository::new_with(c.clone(), db.clone()).await?);
    let categories = Arc::new(MongoCategoryRepository::new_with(db.clone()).await?);
    let universities = Arc::new(MongoUniversityRepository::new_with(db.clone()).await?);
    let semesters = Arc::new(MongoSemesterRepository::new_with(db.clone()).await?);
    let posts = Arc::new(MongoPostRepository::new_with(db).await?);

    Ok(App {
        users: UserHandler {
            users,
            courses: courses.clone(),
        },
        courses: CourseHandler {
            courses: courses.clone(),
        },
        catalog: CatalogHandler {
            categories,
            universities,
            semesters,
            courses,
        },
        posts: PostHandler { posts },
    })
}
