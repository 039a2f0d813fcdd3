use std::collections::HashSet;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::error::{Result as MongoResult, TRANSIENT_TRANSACTION_ERROR};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use mongodb::{Client, Collection, Database};
use smallvec::SmallVec;
use tracing::Instrument;

use super::{
    CategoryRepository, CourseQuery, CourseRepository, PostRepository, RepositoryError, Result,
    SemesterRepository, UniversityRepository, UserMutation, UserRepository, FEED_PAGE,
};
use crate::entities::{
    Category, CategoryId, Checkpoint, CheckpointId, Comment, Course, CourseId, Date,
    PasswordReset, Post, PostId, Resource, ResourceId, Semester, SemesterId, University,
    UniversityId, User, UserId,
};
use crate::utils::LetChain;

mod converters;
mod helpers;
mod models;

use converters::{convert_404_or, convert_repo_err, to_bool, try_unique_check};
use helpers::{
    initialize_coll, is_contains, make_session, modify_set, modify_upvote_set,
    process_transaction, ModifyOpTy,
};
use models::{
    MongoCategoryModel, MongoCheckpointModel, MongoCommentModel, MongoCourseModel, MongoPostModel,
    MongoResourceModel, MongoSemesterModel, MongoUniversityModel, MongoUserModel,
};

pub struct MongoUserRepository {
    client: Client,
    coll: Collection<MongoUserModel>,
}

impl MongoUserRepository {
    pub async fn new_with(client: Client, db: Database) -> ::anyhow::Result<Self> {
        initialize_coll("user", &db, &["id", "email"])
            .await
            .map_err(::anyhow::Error::new)?;

        Ok(Self {
            client,
            coll: db.collection("user"),
        })
    }
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    async fn insert(&self, item: User) -> Result<bool> {
        let model: MongoUserModel = item.into();

        self.coll
            .insert_one(model, None)
            .instrument(tracing::trace_span!("insert_one"))
            .await
            .let_(try_unique_check)
    }

    async fn is_exists(&self, id: UserId) -> Result<bool> {
        let res = self
            .coll
            .count_documents(doc! { "id": id.to_string() }, None)
            .instrument(tracing::trace_span!("count_documents"))
            .await
            .let_(convert_repo_err)?
            .let_(to_bool);

        Ok(res)
    }

    async fn find(&self, id: UserId) -> Result<User> {
        let user: User = self
            .coll
            .find_one(doc! { "id": id.to_string() }, None)
            .instrument(tracing::trace_span!("find_one"))
            .await
            .let_(convert_repo_err)?
            .let_(convert_404_or)?
            .into();

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<User> {
        let user: User = self
            .coll
            .find_one(doc! { "email": email }, None)
            .instrument(tracing::trace_span!("find_one"))
            .await
            .let_(convert_repo_err)?
            .let_(convert_404_or)?
            .into();

        Ok(user)
    }

    async fn is_email_taken(&self, email: &str, excluding: UserId) -> Result<bool> {
        let res = self
            .coll
            .count_documents(
                doc! { "email": email, "id": { "$ne": excluding.to_string() } },
                None,
            )
            .instrument(tracing::trace_span!("count_documents"))
            .await
            .let_(convert_repo_err)?
            .let_(to_bool);

        Ok(res)
    }

    async fn update(&self, id: UserId, mutation: UserMutation) -> Result<User> {
        let mutation_doc: Document = mutation.into();

        async fn transaction(
            this: &MongoUserRepository,
            id: UserId,
            mutation: Document,
        ) -> MongoResult<Option<User>> {
            let mut session = make_session(&this.client).await?;

            match this
                .coll
                .update_one_with_session(
                    doc! { "id": id.to_string() },
                    doc! { "$set": mutation },
                    None,
                    &mut session,
                )
                .instrument(tracing::trace_span!("update_one_with_session"))
                .await?
                .matched_count
                .let_(to_bool)
            {
                false => return Ok(None),
                true => (),
            };

            let user: User = this
                .coll
                .find_one_with_session(doc! { "id": id.to_string() }, None, &mut session)
                .instrument(tracing::trace_span!("find_one_with_session"))
                .await?
                .unwrap()
                .into();

            process_transaction(&mut session).await.map(|_| Some(user))
        }

        let res = loop {
            let r = transaction(self, id, mutation_doc.clone()).await;
            if let Err(ref e) = r {
                if e.contains_label(TRANSIENT_TRANSACTION_ERROR) {
                    continue;
                }
            }

            break r;
        };

        res.let_(convert_repo_err)?.let_(convert_404_or)
    }

    async fn is_saved_course(&self, id: UserId, course_id: CourseId) -> Result<bool> {
        is_contains(
            "saved_courses",
            &self.coll,
            id.to_string(),
            course_id.to_string(),
        )
        .await
    }

    async fn insert_saved_course(&self, id: UserId, course_id: CourseId) -> Result<bool> {
        modify_set(
            "saved_courses",
            &self.coll,
            id.to_string(),
            course_id.to_string(),
            ModifyOpTy::Push,
        )
        .await
    }

    async fn delete_saved_course(&self, id: UserId, course_id: CourseId) -> Result<bool> {
        modify_set(
            "saved_courses",
            &self.coll,
            id.to_string(),
            course_id.to_string(),
            ModifyOpTy::Pull,
        )
        .await
    }

    async fn set_progress(
        &self,
        id: UserId,
        course_id: CourseId,
        completed: HashSet<CheckpointId>,
    ) -> Result<()> {
        let list = completed.iter().map(|c| c.to_string()).collect::<Vec<_>>();

        async fn transaction(
            this: &MongoUserRepository,
            id: UserId,
            course_id: CourseId,
            list: Vec<String>,
        ) -> MongoResult<Option<()>> {
            let mut session = make_session(&this.client).await?;

            let res = this
                .coll
                .update_one_with_session(
                    doc! { "id": id.to_string(), "progress.course": course_id.to_string() },
                    doc! { "$set": { "progress.$.completed_checkpoints": list.clone() } },
                    None,
                    &mut session,
                )
                .instrument(tracing::trace_span!("update_one_with_session"))
                .await?;

            if !res.matched_count.let_(to_bool) {
                let res = this
                    .coll
                    .update_one_with_session(
                        doc! { "id": id.to_string() },
                        doc! { "$push": { "progress": {
                            "course": course_id.to_string(),
                            "completed_checkpoints": list,
                        } } },
                        None,
                        &mut session,
                    )
                    .instrument(tracing::trace_span!("update_one_with_session"))
                    .await?;

                if !res.matched_count.let_(to_bool) {
                    return Ok(None);
                }
            }

            process_transaction(&mut session).await.map(|_| Some(()))
        }

        let res = loop {
            let r = transaction(self, id, course_id, list.clone()).await;
            if let Err(ref e) = r {
                if e.contains_label(TRANSIENT_TRANSACTION_ERROR) {
                    continue;
                }
            }

            break r;
        };

        res.let_(convert_repo_err)?.let_(convert_404_or)
    }

    async fn set_password_reset(&self, id: UserId, reset: PasswordReset) -> Result<()> {
        let PasswordReset { otp, expires } = reset;

        let res = self
            .coll
            .update_one(
                doc! { "id": id.to_string() },
                doc! { "$set": {
                    "reset_otp": otp,
                    "reset_expires": expires.timestamp_millis(),
                } },
                None,
            )
            .instrument(tracing::trace_span!("update_one"))
            .await
            .let_(convert_repo_err)?;

        match res.matched_count.let_(to_bool) {
            true => Ok(()),
            false => Err(RepositoryError::NotFound),
        }
    }

    async fn consume_password_reset(
        &self,
        email: &str,
        otp: &str,
        now: Date,
        password_hash: String,
    ) -> Result<bool> {
        let res = self
            .coll
            .update_one(
                doc! {
                    "email": email,
                    "reset_otp": otp,
                    "reset_expires": { "$gt": now.timestamp_millis() },
                },
                doc! {
                    "$set": { "password": password_hash },
                    "$unset": { "reset_otp": "", "reset_expires": "" },
                },
                None,
            )
            .instrument(tracing::trace_span!("update_one"))
            .await
            .let_(convert_repo_err)?;

        Ok(res.matched_count.let_(to_bool))
    }
}

pub struct MongoCourseRepository {
    client: Client,
    coll: Collection<MongoCourseModel>,
}

impl MongoCourseRepository {
    pub async fn new_with(client: Client, db: Database) -> ::anyhow::Result<Self> {
        initialize_coll("course", &db, &["id"])
            .await
            .map_err(::anyhow::Error::new)?;

        Ok(Self {
            client,
            coll: db.collection("course"),
        })
    }
}

#[async_trait]
impl CourseRepository for MongoCourseRepository {
    async fn insert(&self, item: Course) -> Result<bool> {
        let model: MongoCourseModel = item.into();

        self.coll
            .insert_one(model, None)
            .instrument(tracing::trace_span!("insert_one"))
            .await
            .let_(try_unique_check)
    }

    async fn is_exists(&self, id: CourseId) -> Result<bool> {
        let res = self
            .coll
            .count_documents(doc! { "id": id.to_string() }, None)
            .instrument(tracing::trace_span!("count_documents"))
            .await
            .let_(convert_repo_err)?
            .let_(to_bool);

        Ok(res)
    }

    async fn find(&self, id: CourseId) -> Result<Course> {
        let course: Course = self
            .coll
            .find_one(doc! { "id": id.to_string() }, None)
            .instrument(tracing::trace_span!("find_one"))
            .await
            .let_(convert_repo_err)?
            .let_(convert_404_or)?
            .into();

        Ok(course)
    }

    async fn finds(&self, query: CourseQuery) -> Result<Vec<Course>> {
        let query_doc: Document = query.into();

        let res = self
            .coll
            .find(query_doc, None)
            .instrument(tracing::trace_span!("find"))
            .await
            .let_(convert_repo_err)?
            .try_collect::<Vec<_>>()
            .await
            .let_(convert_repo_err)?
            .drain(..)
            .map(|m| m.into())
            .collect();

        Ok(res)
    }

    async fn push_resource(&self, id: CourseId, resource: Resource) -> Result<()> {
        let model: MongoResourceModel = resource.into();
        let model_doc = ::mongodb::bson::to_document(&model).let_(convert_repo_err)?;

        let res = self
            .coll
            .update_one(
                doc! { "id": id.to_string() },
                doc! { "$push": { "resources": Bson::Document(model_doc) } },
                None,
            )
            .instrument(tracing::trace_span!("update_one"))
            .await
            .let_(convert_repo_err)?;

        match res.matched_count.let_(to_bool) {
            true => Ok(()),
            false => Err(RepositoryError::NotFound),
        }
    }

    async fn push_checkpoint(&self, id: CourseId, checkpoint: Checkpoint) -> Result<()> {
        let model: MongoCheckpointModel = checkpoint.into();
        let model_doc = ::mongodb::bson::to_document(&model).let_(convert_repo_err)?;

        let res = self
            .coll
            .update_one(
                doc! { "id": id.to_string() },
                doc! { "$push": { "checkpoints": Bson::Document(model_doc) } },
                None,
            )
            .instrument(tracing::trace_span!("update_one"))
            .await
            .let_(convert_repo_err)?;

        match res.matched_count.let_(to_bool) {
            true => Ok(()),
            false => Err(RepositoryError::NotFound),
        }
    }

    async fn is_upvoted(
        &self,
        id: CourseId,
        resource_id: ResourceId,
        user_id: UserId,
    ) -> Result<bool> {
        let res = self
            .coll
            .count_documents(
                doc! {
                    "id": id.to_string(),
                    "resources": { "$elemMatch": {
                        "id": resource_id.to_string(),
                        "upvoted_by": { "$in": [user_id.to_string()] },
                    } },
                },
                None,
            )
            .instrument(tracing::trace_span!("count_documents"))
            .await
            .let_(convert_repo_err)?
            .let_(to_bool);

        Ok(res)
    }

    async fn insert_upvote(
        &self,
        id: CourseId,
        resource_id: ResourceId,
        user_id: UserId,
    ) -> Result<bool> {
        modify_upvote_set(
            &self.coll,
            &self.client,
            &Bson::String(id.to_string()),
            &Bson::String(resource_id.to_string()),
            &Bson::String(user_id.to_string()),
            ModifyOpTy::Push,
        )
        .await
    }

    async fn delete_upvote(
        &self,
        id: CourseId,
        resource_id: ResourceId,
        user_id: UserId,
    ) -> Result<bool> {
        modify_upvote_set(
            &self.coll,
            &self.client,
            &Bson::String(id.to_string()),
            &Bson::String(resource_id.to_string()),
            &Bson::String(user_id.to_string()),
            ModifyOpTy::Pull,
        )
        .await
    }

    async fn push_resource_comment(
        &self,
        id: CourseId,
        resource_id: ResourceId,
        comment: Comment,
    ) -> Result<()> {
        let model: MongoCommentModel = comment.into();
        let model_doc = ::mongodb::bson::to_document(&model).let_(convert_repo_err)?;

        let res = self
            .coll
            .update_one(
                doc! { "id": id.to_string(), "resources.id": resource_id.to_string() },
                doc! { "$push": { "resources.$.comments": Bson::Document(model_doc) } },
                None,
            )
            .instrument(tracing::trace_span!("update_one"))
            .await
            .let_(convert_repo_err)?;

        match res.matched_count.let_(to_bool) {
            true => Ok(()),
            false => Err(RepositoryError::NotFound),
        }
    }

    async fn incr_views(&self, id: CourseId) -> Result<i64> {
        let opts = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let model = self
            .coll
            .find_one_and_update(
                doc! { "id": id.to_string() },
                doc! { "$inc": { "views": 1 } },
                opts,
            )
            .instrument(tracing::trace_span!("find_one_and_update"))
            .await
            .let_(convert_repo_err)?
            .let_(convert_404_or)?;

        Ok(model.views)
    }
}

pub struct MongoCategoryRepository {
    coll: Collection<MongoCategoryModel>,
}

impl MongoCategoryRepository {
    pub async fn new_with(db: Database) -> ::anyhow::Result<Self> {
        initialize_coll("category", &db, &["id", "name"])
            .await
            .map_err(::anyhow::Error::new)?;

        Ok(Self {
            coll: db.collection("category"),
        })
    }
}

#[async_trait]
impl CategoryRepository for MongoCategoryRepository {
    async fn insert(&self, item: Category) -> Result<bool> {
        let model: MongoCategoryModel = item.into();

        self.coll
            .insert_one(model, None)
            .instrument(tracing::trace_span!("insert_one"))
            .await
            .let_(try_unique_check)
    }

    async fn find(&self, id: CategoryId) -> Result<Category> {
        let category: Category = self
            .coll
            .find_one(doc! { "id": id.to_string() }, None)
            .instrument(tracing::trace_span!("find_one"))
            .await
            .let_(convert_repo_err)?
            .let_(convert_404_or)?
            .into();

        Ok(category)
    }

    async fn finds(&self) -> Result<Vec<Category>> {
        let res = self
            .coll
            .find(None, None)
            .instrument(tracing::trace_span!("find"))
            .await
            .let_(convert_repo_err)?
            .try_collect::<Vec<_>>()
            .await
            .let_(convert_repo_err)?
            .drain(..)
            .map(|m| m.into())
            .collect();

        Ok(res)
    }

    async fn push_university(&self, id: CategoryId, university_id: UniversityId) -> Result<()> {
        push_child(&self.coll, "universities", id.to_string(), university_id.to_string()).await
    }

    async fn push_course(&self, id: CategoryId, course_id: CourseId) -> Result<()> {
        push_child(&self.coll, "courses", id.to_string(), course_id.to_string()).await
    }
}

pub struct MongoUniversityRepository {
    coll: Collection<MongoUniversityModel>,
}

impl MongoUniversityRepository {
    pub async fn new_with(db: Database) -> ::anyhow::Result<Self> {
        initialize_coll("university", &db, &["id"])
            .await
            .map_err(::anyhow::Error::new)?;

        Ok(Self {
            coll: db.collection("university"),
        })
    }
}

#[async_trait]
impl UniversityRepository for MongoUniversityRepository {
    async fn insert(&self, item: University) -> Result<bool> {
        let model: MongoUniversityModel = item.into();

        self.coll
            .insert_one(model, None)
            .instrument(tracing::trace_span!("insert_one"))
            .await
            .let_(try_unique_check)
    }

    async fn find(&self, id: UniversityId) -> Result<University> {
        let university: University = self
            .coll
            .find_one(doc! { "id": id.to_string() }, None)
            .instrument(tracing::trace_span!("find_one"))
            .await
            .let_(convert_repo_err)?
            .let_(convert_404_or)?
            .into();

        Ok(university)
    }

    async fn finds(&self) -> Result<Vec<University>> {
        let res = self
            .coll
            .find(None, None)
            .instrument(tracing::trace_span!("find"))
            .await
            .let_(convert_repo_err)?
            .try_collect::<Vec<_>>()
            .await
            .let_(convert_repo_err)?
            .drain(..)
            .map(|m| m.into())
            .collect();

        Ok(res)
    }

    async fn push_semester(&self, id: UniversityId, semester_id: SemesterId) -> Result<()> {
        push_child(&self.coll, "semesters", id.to_string(), semester_id.to_string()).await
    }
}

pub struct MongoSemesterRepository {
    coll: Collection<MongoSemesterModel>,
}

impl MongoSemesterRepository {
    pub async fn new_with(db: Database) -> ::anyhow::Result<Self> {
        initialize_coll("semester", &db, &["id"])
            .await
            .map_err(::anyhow::Error::new)?;

        Ok(Self {
            coll: db.collection("semester"),
        })
    }
}

#[async_trait]
impl SemesterRepository for MongoSemesterRepository {
    async fn insert(&self, item: Semester) -> Result<bool> {
        let model: MongoSemesterModel = item.into();

        self.coll
            .insert_one(model, None)
            .instrument(tracing::trace_span!("insert_one"))
            .await
            .let_(try_unique_check)
    }

    async fn find(&self, id: SemesterId) -> Result<Semester> {
        let semester: Semester = self
            .coll
            .find_one(doc! { "id": id.to_string() }, None)
            .instrument(tracing::trace_span!("find_one"))
            .await
            .let_(convert_repo_err)?
            .let_(convert_404_or)?
            .into();

        Ok(semester)
    }

    async fn push_course(&self, id: SemesterId, course_id: CourseId) -> Result<()> {
        push_child(&self.coll, "courses", id.to_string(), course_id.to_string()).await
    }
}

pub struct MongoPostRepository {
    coll: Collection<MongoPostModel>,
}

impl MongoPostRepository {
    pub async fn new_with(db: Database) -> ::anyhow::Result<Self> {
        initialize_coll("post", &db, &["id"])
            .await
            .map_err(::anyhow::Error::new)?;

        Ok(Self {
            coll: db.collection("post"),
        })
    }
}

#[async_trait]
impl PostRepository for MongoPostRepository {
    async fn insert(&self, item: Post) -> Result<bool> {
        let model: MongoPostModel = item.into();

        self.coll
            .insert_one(model, None)
            .instrument(tracing::trace_span!("insert_one"))
            .await
            .let_(try_unique_check)
    }

    async fn find(&self, id: PostId) -> Result<Post> {
        let post: Post = self
            .coll
            .find_one(doc! { "id": id.to_string() }, None)
            .instrument(tracing::trace_span!("find_one"))
            .await
            .let_(convert_repo_err)?
            .let_(convert_404_or)?
            .into();

        Ok(post)
    }

    async fn page(&self, page: u32) -> Result<SmallVec<[Post; FEED_PAGE]>> {
        let opts = FindOptions::builder()
            .sort(doc! { "created": -1 })
            .skip(page as u64 * FEED_PAGE as u64)
            .limit(FEED_PAGE as i64)
            .build();

        let res = self
            .coll
            .find(None, opts)
            .instrument(tracing::trace_span!("find"))
            .await
            .let_(convert_repo_err)?
            .try_collect::<Vec<_>>()
            .await
            .let_(convert_repo_err)?
            .drain(..)
            .map(|m| m.into())
            .collect();

        Ok(res)
    }

    async fn insert_like(&self, id: PostId, user_id: UserId) -> Result<bool> {
        modify_set(
            "likes",
            &self.coll,
            id.to_string(),
            user_id.to_string(),
            ModifyOpTy::Push,
        )
        .await
    }

    async fn delete_like(&self, id: PostId, user_id: UserId) -> Result<bool> {
        modify_set(
            "likes",
            &self.coll,
            id.to_string(),
            user_id.to_string(),
            ModifyOpTy::Pull,
        )
        .await
    }

    async fn push_comment(&self, id: PostId, comment: Comment) -> Result<()> {
        let model: MongoCommentModel = comment.into();
        let model_doc = ::mongodb::bson::to_document(&model).let_(convert_repo_err)?;

        let res = self
            .coll
            .update_one(
                doc! { "id": id.to_string() },
                doc! { "$push": { "comments": Bson::Document(model_doc) } },
                None,
            )
            .instrument(tracing::trace_span!("update_one"))
            .await
            .let_(convert_repo_err)?;

        match res.matched_count.let_(to_bool) {
            true => Ok(()),
            false => Err(RepositoryError::NotFound),
        }
    }
}

// reference lists append freshly created children, so a plain $push is
// enough; membership can never pre-exist
async fn push_child<T>(
    coll: &Collection<T>,
    name: &str,
    id: String,
    child_id: String,
) -> Result<()> {
    let res = coll
        .update_one(
            doc! { "id": id },
            doc! { "$push": { name: child_id } },
            None,
        )
        .instrument(tracing::trace_span!("update_one"))
        .await
        .let_(convert_repo_err)?;

    match res.matched_count.let_(to_bool) {
        true => Ok(()),
        false => Err(RepositoryError::NotFound),
    }
}
