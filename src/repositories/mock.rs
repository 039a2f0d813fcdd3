use std::collections::HashSet;

use async_trait::async_trait;
use smallvec::SmallVec;
use tokio::sync::Mutex;

use super::{
    CategoryRepository, CourseQuery, CourseRepository, PostRepository, RepositoryError, Result,
    SemesterRepository, UniversityRepository, UserMutation, UserRepository, FEED_PAGE,
};
use crate::entities::{
    Category, CategoryId, Checkpoint, CheckpointId, Comment, Course, CourseId, CourseProgress,
    Date, PasswordReset, Post, PostId, Resource, ResourceId, Semester, SemesterId, University,
    UniversityId, User, UserId,
};

mod helpers;

use helpers::{find_mut, find_ref};

pub struct InMemoryRepository<T>(Mutex<Vec<T>>);

impl<T> InMemoryRepository<T> {
    pub fn new() -> Self { Self(Mutex::new(vec![])) }
}
impl<T> Default for InMemoryRepository<T> {
    fn default() -> Self { Self::new() }
}

#[async_trait]
impl UserRepository for InMemoryRepository<User> {
    async fn insert(&self, item: User) -> Result<bool> {
        let mut guard = self.0.lock().await;

        match find_ref(&guard, |v| v.id == item.id || v.email == item.email) {
            Ok(_) => return Ok(false),
            Err(RepositoryError::NotFound) => (),
            Err(e) => return Err(e),
        }

        guard.push(item);
        Ok(true)
    }

    async fn is_exists(&self, id: UserId) -> Result<bool> {
        let guard = self.0.lock().await;

        match find_ref(&guard, |v| v.id == id) {
            Ok(_) => Ok(true),
            Err(RepositoryError::NotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn find(&self, id: UserId) -> Result<User> {
        let guard = self.0.lock().await;

        Ok(find_ref(&guard, |v| v.id == id)?.clone())
    }

    async fn find_by_email(&self, email: &str) -> Result<User> {
        let guard = self.0.lock().await;

        Ok(find_ref(&guard, |v| v.email == email)?.clone())
    }

    async fn is_email_taken(&self, email: &str, excluding: UserId) -> Result<bool> {
        let guard = self.0.lock().await;

        match find_ref(&guard, |v| v.email == email && v.id != excluding) {
            Ok(_) => Ok(true),
            Err(RepositoryError::NotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn update(&self, id: UserId, mutation: UserMutation) -> Result<User> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |v| v.id == id)?;

        let UserMutation {
            name,
            email,
            bio,
            location,
            profession,
        } = mutation;
        if let Some(val) = name {
            item.name = val;
        }
        if let Some(val) = email {
            item.email = val;
        }
        if let Some(val) = bio {
            item.bio = val;
        }
        if let Some(val) = location {
            item.location = val;
        }
        if let Some(val) = profession {
            item.profession = val;
        }

        Ok(item.clone())
    }

    async fn is_saved_course(&self, id: UserId, course_id: CourseId) -> Result<bool> {
        let guard = self.0.lock().await;
        let item = find_ref(&guard, |v| v.id == id)?;

        Ok(item.saved_courses.contains(&course_id))
    }

    async fn insert_saved_course(&self, id: UserId, course_id: CourseId) -> Result<bool> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |v| v.id == id)?;

        if item.saved_courses.contains(&course_id) {
            return Ok(false);
        }

        item.saved_courses.push(course_id);
        Ok(true)
    }

    async fn delete_saved_course(&self, id: UserId, course_id: CourseId) -> Result<bool> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |v| v.id == id)?;

        let present = item.saved_courses.contains(&course_id);
        item.saved_courses.retain(|c| *c != course_id);

        Ok(present)
    }

    async fn set_progress(
        &self,
        id: UserId,
        course_id: CourseId,
        completed: HashSet<CheckpointId>,
    ) -> Result<()> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |v| v.id == id)?;

        match item.progress.iter_mut().find(|p| p.course == course_id) {
            Some(entry) => entry.completed_checkpoints = completed,
            None => item.progress.push(CourseProgress {
                course: course_id,
                completed_checkpoints: completed,
            }),
        }

        Ok(())
    }

    async fn set_password_reset(&self, id: UserId, reset: PasswordReset) -> Result<()> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |v| v.id == id)?;

        item.password_reset = Some(reset);
        Ok(())
    }

    async fn consume_password_reset(
        &self,
        email: &str,
        otp: &str,
        now: Date,
        password_hash: String,
    ) -> Result<bool> {
        let mut guard = self.0.lock().await;
        let item = match find_mut(&mut guard, |v| v.email == email) {
            Ok(i) => i,
            Err(RepositoryError::NotFound) => return Ok(false),
            Err(e) => return Err(e),
        };

        match &item.password_reset {
            Some(reset) if reset.otp == otp && reset.expires > now => (),
            _ => return Ok(false),
        }

        item.password_hash = password_hash;
        item.password_reset = None;
        Ok(true)
    }
}

#[async_trait]
impl CourseRepository for InMemoryRepository<Course> {
    async fn insert(&self, item: Course) -> Result<bool> {
        let mut guard = self.0.lock().await;

        match find_ref(&guard, |v| v.id == item.id) {
            Ok(_) => return Ok(false),
            Err(RepositoryError::NotFound) => (),
            Err(e) => return Err(e),
        }

        guard.push(item);
        Ok(true)
    }

    async fn is_exists(&self, id: CourseId) -> Result<bool> {
        let guard = self.0.lock().await;

        match find_ref(&guard, |v| v.id == id) {
            Ok(_) => Ok(true),
            Err(RepositoryError::NotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn find(&self, id: CourseId) -> Result<Course> {
        let guard = self.0.lock().await;

        Ok(find_ref(&guard, |v| v.id == id)?.clone())
    }

    async fn finds(&self, CourseQuery { name }: CourseQuery) -> Result<Vec<Course>> {
        Ok(self
            .0
            .lock()
            .await
            .iter()
            .filter(|c| name.as_ref().map(|re| re.is_match(&c.name)).unwrap_or(true))
            .cloned()
            .collect())
    }

    async fn push_resource(&self, id: CourseId, resource: Resource) -> Result<()> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |v| v.id == id)?;

        item.resources.push(resource);
        Ok(())
    }

    async fn push_checkpoint(&self, id: CourseId, checkpoint: Checkpoint) -> Result<()> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |v| v.id == id)?;

        item.checkpoints.push(checkpoint);
        Ok(())
    }

    async fn is_upvoted(
        &self,
        id: CourseId,
        resource_id: ResourceId,
        user_id: UserId,
    ) -> Result<bool> {
        let guard = self.0.lock().await;
        let item = find_ref(&guard, |v| v.id == id)?;
        let resource = find_ref(&item.resources, |r| r.id == resource_id)?;

        Ok(resource.upvoted_by.contains(&user_id))
    }

    async fn insert_upvote(
        &self,
        id: CourseId,
        resource_id: ResourceId,
        user_id: UserId,
    ) -> Result<bool> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |v| v.id == id)?;
        let resource = find_mut(&mut item.resources, |r| r.id == resource_id)?;

        Ok(resource.upvoted_by.insert(user_id))
    }

    async fn delete_upvote(
        &self,
        id: CourseId,
        resource_id: ResourceId,
        user_id: UserId,
    ) -> Result<bool> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |v| v.id == id)?;
        let resource = find_mut(&mut item.resources, |r| r.id == resource_id)?;

        Ok(resource.upvoted_by.remove(&user_id))
    }

    async fn push_resource_comment(
        &self,
        id: CourseId,
        resource_id: ResourceId,
        comment: Comment,
    ) -> Result<()> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |v| v.id == id)?;
        let resource = find_mut(&mut item.resources, |r| r.id == resource_id)?;

        resource.comments.push(comment);
        Ok(())
    }

    async fn incr_views(&self, id: CourseId) -> Result<i64> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |v| v.id == id)?;

        item.views += 1;
        Ok(item.views)
    }
}

#[async_trait]
impl CategoryRepository for InMemoryRepository<Category> {
    async fn insert(&self, item: Category) -> Result<bool> {
        let mut guard = self.0.lock().await;

        match find_ref(&guard, |v| v.id == item.id || v.name == item.name) {
            Ok(_) => return Ok(false),
            Err(RepositoryError::NotFound) => (),
            Err(e) => return Err(e),
        }

        guard.push(item);
        Ok(true)
    }

    async fn find(&self, id: CategoryId) -> Result<Category> {
        let guard = self.0.lock().await;

        Ok(find_ref(&guard, |v| v.id == id)?.clone())
    }

    async fn finds(&self) -> Result<Vec<Category>> {
        Ok(self.0.lock().await.iter().cloned().collect())
    }

    async fn push_university(&self, id: CategoryId, university_id: UniversityId) -> Result<()> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |v| v.id == id)?;

        item.universities.push(university_id);
        Ok(())
    }

    async fn push_course(&self, id: CategoryId, course_id: CourseId) -> Result<()> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |v| v.id == id)?;

        item.courses.push(course_id);
        Ok(())
    }
}

#[async_trait]
impl UniversityRepository for InMemoryRepository<University> {
    async fn insert(&self, item: University) -> Result<bool> {
        let mut guard = self.0.lock().await;

        match find_ref(&guard, |v| v.id == item.id) {
            Ok(_) => return Ok(false),
            Err(RepositoryError::NotFound) => (),
            Err(e) => return Err(e),
        }

        guard.push(item);
        Ok(true)
    }

    async fn find(&self, id: UniversityId) -> Result<University> {
        let guard = self.0.lock().await;

        Ok(find_ref(&guard, |v| v.id == id)?.clone())
    }

    async fn finds(&self) -> Result<Vec<University>> {
        Ok(self.0.lock().await.iter().cloned().collect())
    }

    async fn push_semester(&self, id: UniversityId, semester_id: SemesterId) -> Result<()> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |v| v.id == id)?;

        item.semesters.push(semester_id);
        Ok(())
    }
}

#[async_trait]
impl SemesterRepository for InMemoryRepository<Semester> {
    async fn insert(&self, item: Semester) -> Result<bool> {
        let mut guard = self.0.lock().await;

        match find_ref(&guard, |v| v.id == item.id) {
            Ok(_) => return Ok(false),
            Err(RepositoryError::NotFound) => (),
            Err(e) => return Err(e),
        }

        guard.push(item);
        Ok(true)
    }

    async fn find(&self, id: SemesterId) -> Result<Semester> {
        let guard = self.0.lock().await;

        Ok(find_ref(&guard, |v| v.id == id)?.clone())
    }

    async fn push_course(&self, id: SemesterId, course_id: CourseId) -> Result<()> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |v| v.id == id)?;

        item.courses.push(course_id);
        Ok(())
    }
}

#[async_trait]
impl PostRepository for InMemoryRepository<Post> {
    async fn insert(&self, item: Post) -> Result<bool> {
        let mut guard = self.0.lock().await;

        match find_ref(&guard, |v| v.id == item.id) {
            Ok(_) => return Ok(false),
            Err(RepositoryError::NotFound) => (),
            Err(e) => return Err(e),
        }

        guard.push(item);
        Ok(true)
    }

    async fn find(&self, id: PostId) -> Result<Post> {
        let guard = self.0.lock().await;

        Ok(find_ref(&guard, |v| v.id == id)?.clone())
    }

    async fn page(&self, page: u32) -> Result<SmallVec<[Post; FEED_PAGE]>> {
        let mut all = self.0.lock().await.iter().cloned().collect::<Vec<_>>();
        all.sort_by(|a, b| b.created.cmp(&a.created));

        Ok(all
            .into_iter()
            .skip(page as usize * FEED_PAGE)
            .take(FEED_PAGE)
            .collect())
    }

    async fn insert_like(&self, id: PostId, user_id: UserId) -> Result<bool> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |v| v.id == id)?;

        Ok(item.likes.insert(user_id))
    }

    async fn delete_like(&self, id: PostId, user_id: UserId) -> Result<bool> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |v| v.id == id)?;

        Ok(item.likes.remove(&user_id))
    }

    async fn push_comment(&self, id: PostId, comment: Comment) -> Result<()> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |v| v.id == id)?;

        item.comments.push(comment);
        Ok(())
    }
}
