use std::collections::HashSet;
use std::sync::Arc;

use anyhow::anyhow;
use chrono::Utc;

use super::{course_err, resource_err, Context, Error, Result};
use crate::entities::{
    Checkpoint, CheckpointId, Comment, Course, CourseId, Resource, ResourceId, ResourceKind,
};
use crate::repositories::{CourseQuery, CourseRepository};
use crate::validate;

pub struct CourseHandler {
    pub courses: Arc<dyn CourseRepository + Sync + Send>,
}

#[derive(Debug, Clone, Default)]
pub struct NewCourse {
    pub name: String,
    pub image: String,
    pub description: String,
    pub instructor: String,
    pub badge: String,
}

#[derive(Debug, Clone)]
pub struct NewResource {
    pub title: String,
    pub url: String,
    pub description: String,
    pub tags: Vec<String>,
    pub kind: ResourceKind,
}

impl CourseHandler {
    pub async fn create_course(&self, ctx: &Context, new: NewCourse) -> Result<Course> {
        ctx.require_admin()?;

        let NewCourse {
            name,
            image,
            description,
            instructor,
            badge,
        } = new;

        let course = Course {
            id: CourseId::new(),
            name: validate::non_empty(&name, "course name")?,
            image,
            description,
            views: 0,
            instructor,
            badge,
            resources: vec![],
            checkpoints: vec![],
        };

        let can_insert = self.courses.insert(course.clone()).await.map_err(course_err)?;
        if !can_insert {
            return Err(Error::Internal(anyhow!("course id duplicated")));
        }

        Ok(course)
    }

    pub async fn course(&self, course_id: CourseId) -> Result<Course> {
        self.courses.find(course_id).await.map_err(course_err)
    }

    pub async fn list_courses(&self, query: CourseQuery) -> Result<Vec<Course>> {
        self.courses.finds(query).await.map_err(course_err)
    }

    pub async fn add_resource(
        &self,
        ctx: &Context,
        course_id: CourseId,
        new: NewResource,
    ) -> Result<Resource> {
        let NewResource {
            title,
            url,
            description,
            tags,
            kind,
        } = new;

        let resource = Resource {
            id: ResourceId::new(),
            title: validate::non_empty(&title, "resource title")?,
            url: validate::url(&url)?,
            description,
            tags,
            kind,
            added_by: ctx.user_id,
            upvoted_by: HashSet::new(),
            comments: vec![],
        };

        self.courses
            .push_resource(course_id, resource.clone())
            .await
            .map_err(course_err)?;

        Ok(resource)
    }

    pub async fn add_checkpoint(
        &self,
        ctx: &Context,
        course_id: CourseId,
        title: &str,
        resource_ids: Vec<ResourceId>,
    ) -> Result<Checkpoint> {
        ctx.require_admin()?;

        let title = validate::non_empty(title, "checkpoint title")?;

        // every referenced resource must live in this course
        let course = self.courses.find(course_id).await.map_err(course_err)?;
        let known = course
            .resources
            .iter()
            .map(|r| r.id)
            .collect::<HashSet<_>>();
        for resource_id in &resource_ids {
            if !known.contains(resource_id) {
                return Err(Error::Validation(format!(
                    "unknown resource id: {}",
                    resource_id
                )));
            }
        }

        let checkpoint = Checkpoint {
            id: CheckpointId::new(),
            title,
            resources: resource_ids,
        };

        self.courses
            .push_checkpoint(course_id, checkpoint.clone())
            .await
            .map_err(course_err)?;

        Ok(checkpoint)
    }

    /// One-way idempotent add, not a toggle: a second upvote by the same
    /// user is rejected.
    pub async fn upvote_resource(
        &self,
        ctx: &Context,
        course_id: CourseId,
        resource_id: ResourceId,
    ) -> Result<usize> {
        let can_insert = self
            .courses
            .insert_upvote(course_id, resource_id, ctx.user_id)
            .await
            .map_err(resource_err)?;
        if !can_insert {
            return Err(Error::AlreadyDone("resource already upvoted"));
        }

        self.upvote_count(course_id, resource_id).await
    }

    pub async fn remove_upvote(
        &self,
        ctx: &Context,
        course_id: CourseId,
        resource_id: ResourceId,
    ) -> Result<usize> {
        let can_delete = self
            .courses
            .delete_upvote(course_id, resource_id, ctx.user_id)
            .await
            .map_err(resource_err)?;
        if !can_delete {
            return Err(Error::NotDone("resource not upvoted"));
        }

        self.upvote_count(course_id, resource_id).await
    }

    pub async fn add_comment(
        &self,
        ctx: &Context,
        course_id: CourseId,
        resource_id: ResourceId,
        text: &str,
    ) -> Result<Comment> {
        let comment = Comment {
            user: ctx.user_id,
            text: validate::non_empty(text, "comment text")?,
            created: Utc::now(),
        };

        self.courses
            .push_resource_comment(course_id, resource_id, comment.clone())
            .await
            .map_err(resource_err)?;

        Ok(comment)
    }

    pub async fn comments(
        &self,
        course_id: CourseId,
        resource_id: ResourceId,
    ) -> Result<Vec<Comment>> {
        let course = self.courses.find(course_id).await.map_err(course_err)?;
        let resource = resource_of(&course, resource_id)?;

        Ok(resource.comments.clone())
    }

    /// Every call counts; there is no per-viewer dedup.
    pub async fn view_course(&self, course_id: CourseId) -> Result<i64> {
        self.courses.incr_views(course_id).await.map_err(course_err)
    }

    async fn upvote_count(&self, course_id: CourseId, resource_id: ResourceId) -> Result<usize> {
        let course = self.courses.find(course_id).await.map_err(course_err)?;
        let resource = resource_of(&course, resource_id)?;

        Ok(resource.upvotes())
    }
}

fn resource_of(course: &Course, resource_id: ResourceId) -> Result<&Resource> {
    course
        .resources
        .iter()
        .find(|r| r.id == resource_id)
        .ok_or(Error::NotFound("resource"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::UserId;
    use crate::repositories::mock::InMemoryRepository;

    fn handler() -> CourseHandler {
        CourseHandler {
            courses: Arc::new(InMemoryRepository::<Course>::new()),
        }
    }

    fn admin() -> Context {
        Context {
            user_id: UserId::new(),
            admin: true,
        }
    }

    fn member() -> Context {
        Context {
            user_id: UserId::new(),
            admin: false,
        }
    }

    fn intro_resource() -> NewResource {
        NewResource {
            title: "Intro".to_owned(),
            url: "https://x.test/a".to_owned(),
            description: String::new(),
            tags: vec![],
            kind: ResourceKind::Video,
        }
    }

    async fn created_course(handler: &CourseHandler) -> Course {
        handler
            .create_course(
                &admin(),
                NewCourse {
                    name: "Operating Systems".to_owned(),
                    ..NewCourse::default()
                },
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_course_is_admin_only() {
        let handler = handler();

        let err = handler
            .create_course(
                &member(),
                NewCourse {
                    name: "Operating Systems".to_owned(),
                    ..NewCourse::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Forbidden));
    }

    #[tokio::test]
    async fn added_resource_starts_with_no_upvotes() {
        let handler = handler();
        let course = created_course(&handler).await;
        let user = member();

        let resource = handler
            .add_resource(&user, course.id, intro_resource())
            .await
            .unwrap();

        let stored = handler.course(course.id).await.unwrap();
        assert_eq!(stored.resources.len(), 1);
        assert_eq!(stored.resources[0].title, "Intro");
        assert_eq!(stored.resources[0].added_by, user.user_id);
        assert!(stored.resources[0].upvoted_by.is_empty());
        assert_eq!(resource.upvotes(), 0);
    }

    #[tokio::test]
    async fn resource_requires_a_well_formed_url() {
        let handler = handler();
        let course = created_course(&handler).await;

        let err = handler
            .add_resource(
                &member(),
                course.id,
                NewResource {
                    url: "not-a-url".to_owned(),
                    ..intro_resource()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn upvote_is_one_way_idempotent() {
        let handler = handler();
        let course = created_course(&handler).await;
        let resource = handler
            .add_resource(&member(), course.id, intro_resource())
            .await
            .unwrap();
        let voter = member();

        let count = handler
            .upvote_resource(&voter, course.id, resource.id)
            .await
            .unwrap();
        assert_eq!(count, 1);

        let err = handler
            .upvote_resource(&voter, course.id, resource.id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyDone(_)));

        let stored = handler.course(course.id).await.unwrap();
        assert_eq!(stored.resources[0].upvotes(), 1);

        let count = handler
            .remove_upvote(&voter, course.id, resource.id)
            .await
            .unwrap();
        assert_eq!(count, 0);

        let err = handler
            .remove_upvote(&voter, course.id, resource.id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotDone(_)));

        // legal again after the removal
        let count = handler
            .upvote_resource(&voter, course.id, resource.id)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn upvote_count_tracks_the_set() {
        let handler = handler();
        let course = created_course(&handler).await;
        let resource = handler
            .add_resource(&member(), course.id, intro_resource())
            .await
            .unwrap();

        for expected in 1..=3 {
            let count = handler
                .upvote_resource(&member(), course.id, resource.id)
                .await
                .unwrap();
            assert_eq!(count, expected);
        }

        let stored = handler.course(course.id).await.unwrap();
        assert_eq!(stored.resources[0].upvoted_by.len(), 3);
    }

    #[tokio::test]
    async fn checkpoint_rejects_unknown_resource_ids() {
        let handler = handler();
        let course = created_course(&handler).await;
        let resource = handler
            .add_resource(&member(), course.id, intro_resource())
            .await
            .unwrap();

        let err = handler
            .add_checkpoint(
                &admin(),
                course.id,
                "Week 1",
                vec![resource.id, ResourceId::new()],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let checkpoint = handler
            .add_checkpoint(&admin(), course.id, "Week 1", vec![resource.id])
            .await
            .unwrap();
        assert_eq!(checkpoint.resources, vec![resource.id]);

        let err = handler
            .add_checkpoint(&member(), course.id, "Week 2", vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden));
    }

    #[tokio::test]
    async fn comments_append_in_order() {
        let handler = handler();
        let course = created_course(&handler).await;
        let resource = handler
            .add_resource(&member(), course.id, intro_resource())
            .await
            .unwrap();

        let err = handler
            .add_comment(&member(), course.id, resource.id, "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        handler
            .add_comment(&member(), course.id, resource.id, "great intro")
            .await
            .unwrap();
        handler
            .add_comment(&member(), course.id, resource.id, " watch at 2x ")
            .await
            .unwrap();

        let comments = handler.comments(course.id, resource.id).await.unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].text, "great intro");
        assert_eq!(comments[1].text, "watch at 2x");
    }

    #[tokio::test]
    async fn every_view_increments() {
        let handler = handler();
        let course = created_course(&handler).await;

        assert_eq!(handler.view_course(course.id).await.unwrap(), 1);
        assert_eq!(handler.view_course(course.id).await.unwrap(), 2);
        assert_eq!(handler.view_course(course.id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn operations_on_a_missing_course_fail() {
        let handler = handler();

        let err = handler
            .add_resource(&member(), CourseId::new(), intro_resource())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let err = handler.view_course(CourseId::new()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound("course")));
    }
}
