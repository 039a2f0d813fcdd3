use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;

use super::{course_err, user_err, Context, Error, Result};
use crate::auth;
use crate::entities::{CheckpointId, Course, CourseId, Role, User, UserId};
use crate::repositories::{CourseRepository, RepositoryError, UserMutation, UserRepository};
use crate::validate;

pub const DEFAULT_AVATAR: &str = "https://www.gravatar.com/avatar/";

pub struct UserHandler {
    pub users: Arc<dyn UserRepository + Sync + Send>,
    pub courses: Arc<dyn CourseRepository + Sync + Send>,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub profession: Option<String>,
}

impl UserHandler {
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<User> {
        let name = validate::name(name)?;
        let email = validate::email(email)?;
        validate::strong_password(password)?;

        let new_user = User {
            id: UserId::new(),
            name,
            email,
            password_hash: auth::hash_password(password)?,
            bio: String::new(),
            location: String::new(),
            profession: String::new(),
            role: Role::User,
            avatar: DEFAULT_AVATAR.to_owned(),
            saved_courses: vec![],
            progress: vec![],
            password_reset: None,
            created: Utc::now(),
        };

        let can_insert = self
            .users
            .insert(new_user.clone())
            .await
            .map_err(user_err)?;
        if !can_insert {
            return Err(Error::Validation(
                "an account with this email already exists".to_owned(),
            ));
        }

        Ok(new_user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        // unknown email and wrong password are indistinguishable to the caller
        let user = match self.users.find_by_email(email.trim()).await {
            Ok(u) => u,
            Err(RepositoryError::NotFound) => return Err(Error::Unauthorized),
            Err(e) => return Err(user_err(e)),
        };

        match auth::verify_password(password, &user.password_hash) {
            true => Ok(user),
            false => Err(Error::Unauthorized),
        }
    }

    pub async fn profile(&self, user_id: UserId) -> Result<User> {
        self.users.find(user_id).await.map_err(user_err)
    }

    pub async fn update_profile(&self, ctx: &Context, update: ProfileUpdate) -> Result<User> {
        let ProfileUpdate {
            name,
            email,
            bio,
            location,
            profession,
        } = update;

        let mut mutation = UserMutation::default();
        if let Some(raw) = name {
            mutation.name = Some(validate::name(&raw)?);
        }
        if let Some(raw) = email {
            let email = validate::email(&raw)?;
            let taken = self
                .users
                .is_email_taken(&email, ctx.user_id)
                .await
                .map_err(user_err)?;
            if taken {
                return Err(Error::Validation(
                    "an account with this email already exists".to_owned(),
                ));
            }
            mutation.email = Some(email);
        }
        if let Some(raw) = bio {
            mutation.bio = Some(validate::capped(&raw, validate::BIO_MAX, "bio")?);
        }
        if let Some(raw) = location {
            mutation.location = Some(validate::capped(&raw, validate::LOCATION_MAX, "location")?);
        }
        if let Some(raw) = profession {
            mutation.profession = Some(validate::capped(
                &raw,
                validate::PROFESSION_MAX,
                "profession",
            )?);
        }

        // nothing supplied, nothing to write
        if matches!(
            mutation,
            UserMutation {
                name: None,
                email: None,
                bio: None,
                location: None,
                profession: None,
            }
        ) {
            return self.profile(ctx.user_id).await;
        }

        self.users
            .update(ctx.user_id, mutation)
            .await
            .map_err(user_err)
    }

    /// Rejecting add: saving an already-saved course fails. The inverse,
    /// [`Self::unsave_course`], is a tolerant remove.
    pub async fn save_course(&self, ctx: &Context, course_id: CourseId) -> Result<()> {
        let course_exists = self
            .courses
            .is_exists(course_id)
            .await
            .map_err(course_err)?;
        if !course_exists {
            return Err(Error::NotFound("course"));
        }

        let can_insert = self
            .users
            .insert_saved_course(ctx.user_id, course_id)
            .await
            .map_err(user_err)?;
        if !can_insert {
            return Err(Error::AlreadyDone("course already saved"));
        }

        Ok(())
    }

    pub async fn unsave_course(&self, ctx: &Context, course_id: CourseId) -> Result<()> {
        // removing an absent id is a no-op success
        self.users
            .delete_saved_course(ctx.user_id, course_id)
            .await
            .map_err(user_err)?;

        Ok(())
    }

    pub async fn saved_courses(&self, ctx: &Context) -> Result<Vec<Course>> {
        let user = self.users.find(ctx.user_id).await.map_err(user_err)?;

        let mut courses = Vec::with_capacity(user.saved_courses.len());
        for course_id in user.saved_courses {
            match self.courses.find(course_id).await {
                Ok(c) => courses.push(c),
                // a saved id whose course has vanished is silently skipped
                Err(RepositoryError::NotFound) => (),
                Err(e) => return Err(course_err(e)),
            }
        }

        Ok(courses)
    }

    /// Wholesale overwrite of the completed set for (user, course); never
    /// produces a second progress entry for the same course.
    pub async fn update_progress(
        &self,
        ctx: &Context,
        course_id: CourseId,
        completed: HashSet<CheckpointId>,
    ) -> Result<()> {
        let course_exists = self
            .courses
            .is_exists(course_id)
            .await
            .map_err(course_err)?;
        if !course_exists {
            return Err(Error::NotFound("course"));
        }

        self.users
            .set_progress(ctx.user_id, course_id, completed)
            .await
            .map_err(user_err)
    }

    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        let email = validate::email(email)?;
        let user = self.users.find_by_email(&email).await.map_err(user_err)?;

        let reset = auth::generate_reset(Utc::now());
        // mail delivery is out of scope; the code is surfaced in the log
        tracing::info!("password reset code for {}: {}", email, reset.otp);

        self.users
            .set_password_reset(user.id, reset)
            .await
            .map_err(user_err)
    }

    pub async fn reset_password(&self, email: &str, otp: &str, new_password: &str) -> Result<()> {
        let email = validate::email(email)?;
        validate::strong_password(new_password)?;

        let password_hash = auth::hash_password(new_password)?;
        let consumed = self
            .users
            .consume_password_reset(&email, otp.trim(), Utc::now(), password_hash)
            .await
            .map_err(user_err)?;

        match consumed {
            true => Ok(()),
            false => Err(Error::Validation(
                "invalid or expired reset code".to_owned(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::entities::PasswordReset;
    use crate::repositories::mock::InMemoryRepository;

    fn handler() -> (UserHandler, Arc<InMemoryRepository<Course>>) {
        let courses = Arc::new(InMemoryRepository::<Course>::new());
        let handler = UserHandler {
            users: Arc::new(InMemoryRepository::<User>::new()),
            courses: courses.clone(),
        };

        (handler, courses)
    }

    fn sample_course() -> Course {
        Course {
            id: CourseId::new(),
            name: "Algorithms".to_owned(),
            image: String::new(),
            description: String::new(),
            views: 0,
            instructor: String::new(),
            badge: String::new(),
            resources: vec![],
            checkpoints: vec![],
        }
    }

    async fn registered(handler: &UserHandler) -> User {
        handler
            .register("Ada Lovelace", "ada@example.test", "Sup3r$ecret")
            .await
            .unwrap()
    }

    fn ctx(user: &User) -> Context {
        Context {
            user_id: user.id,
            admin: false,
        }
    }

    #[tokio::test]
    async fn register_rejects_password_without_digit() {
        let (handler, _) = handler();

        let err = handler
            .register("Ada Lovelace", "ada@example.test", "NoDigits$here")
            .await
            .unwrap_err();

        match err {
            Error::Validation(msg) => assert!(msg.contains("number"), "{}", msg),
            e => panic!("expected validation error, got {:?}", e),
        }
    }

    #[tokio::test]
    async fn register_stores_only_a_hash() {
        let (handler, _) = handler();

        let user = registered(&handler).await;

        assert_ne!(user.password_hash, "Sup3r$ecret");
        assert!(auth::verify_password("Sup3r$ecret", &user.password_hash));

        handler
            .login("ada@example.test", "Sup3r$ecret")
            .await
            .unwrap();
        let err = handler
            .login("ada@example.test", "wrong-password")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized));
    }

    #[tokio::test]
    async fn register_rejects_taken_email() {
        let (handler, _) = handler();

        registered(&handler).await;
        let err = handler
            .register("Ada Byron", "ada@example.test", "An0ther$ecret")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn save_is_rejecting_unsave_is_tolerant() {
        let (handler, courses) = handler();
        let course = sample_course();
        courses.insert(course.clone()).await.unwrap();

        let user = registered(&handler).await;
        let ctx = ctx(&user);

        handler.save_course(&ctx, course.id).await.unwrap();
        let err = handler.save_course(&ctx, course.id).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyDone(_)));

        let saved = handler.saved_courses(&ctx).await.unwrap();
        assert_eq!(saved.len(), 1);

        handler.unsave_course(&ctx, course.id).await.unwrap();
        // absent id: still a success
        handler.unsave_course(&ctx, course.id).await.unwrap();

        assert!(handler.saved_courses(&ctx).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_requires_an_existing_course() {
        let (handler, _) = handler();
        let user = registered(&handler).await;

        let err = handler
            .save_course(&ctx(&user), CourseId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound("course")));
    }

    #[tokio::test]
    async fn progress_overwrites_instead_of_merging() {
        let (handler, courses) = handler();
        let course = sample_course();
        courses.insert(course.clone()).await.unwrap();

        let user = registered(&handler).await;
        let ctx = ctx(&user);

        let first = [CheckpointId::new(), CheckpointId::new()]
            .into_iter()
            .collect::<HashSet<_>>();
        let second = [CheckpointId::new()].into_iter().collect::<HashSet<_>>();

        handler
            .update_progress(&ctx, course.id, first)
            .await
            .unwrap();
        handler
            .update_progress(&ctx, course.id, second.clone())
            .await
            .unwrap();

        let stored = handler.profile(user.id).await.unwrap();
        assert_eq!(stored.progress.len(), 1);
        assert_eq!(stored.progress[0].completed_checkpoints, second);
    }

    #[tokio::test]
    async fn new_reset_code_invalidates_the_previous_one() {
        let (handler, _) = handler();
        let user = registered(&handler).await;

        handler.forgot_password("ada@example.test").await.unwrap();
        let first_otp = handler
            .profile(user.id)
            .await
            .unwrap()
            .password_reset
            .unwrap()
            .otp;

        handler.forgot_password("ada@example.test").await.unwrap();
        let second_otp = handler
            .profile(user.id)
            .await
            .unwrap()
            .password_reset
            .unwrap()
            .otp;

        if first_otp != second_otp {
            let err = handler
                .reset_password("ada@example.test", &first_otp, "Fresh$ecret1")
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
        }

        handler
            .reset_password("ada@example.test", &second_otp, "Fresh$ecret1")
            .await
            .unwrap();
        handler
            .login("ada@example.test", "Fresh$ecret1")
            .await
            .unwrap();

        // single use: the code is cleared on success
        let err = handler
            .reset_password("ada@example.test", &second_otp, "Other$ecret1")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn expired_reset_code_is_rejected() {
        let (handler, _) = handler();
        let user = registered(&handler).await;

        handler
            .users
            .set_password_reset(
                user.id,
                PasswordReset {
                    otp: "123456".to_owned(),
                    expires: Utc::now() - Duration::minutes(1),
                },
            )
            .await
            .unwrap();

        let err = handler
            .reset_password("ada@example.test", "123456", "Fresh$ecret1")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn profile_update_is_partial() {
        let (handler, _) = handler();
        let user = registered(&handler).await;

        let updated = handler
            .update_profile(
                &ctx(&user),
                ProfileUpdate {
                    bio: Some("Analytical engines enthusiast".to_owned()),
                    ..ProfileUpdate::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.bio, "Analytical engines enthusiast");
        assert_eq!(updated.name, "Ada Lovelace");
        assert_eq!(updated.email, "ada@example.test");
    }

    #[tokio::test]
    async fn changing_email_checks_other_accounts() {
        let (handler, _) = handler();
        registered(&handler).await;
        let other = handler
            .register("Grace Hopper", "grace@example.test", "C0bol$forever")
            .await
            .unwrap();

        let err = handler
            .update_profile(
                &ctx(&other),
                ProfileUpdate {
                    email: Some("ada@example.test".to_owned()),
                    ..ProfileUpdate::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
    }
}
