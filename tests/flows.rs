use std::collections::HashSet;

use edulearn::entities::{CategoryKind, CheckpointId, ResourceKind, UserId};
use edulearn::handlers::course::{NewCourse, NewResource};
use edulearn::handlers::{Context, Error};
use edulearn::in_memory;
use edulearn::repositories::UserRepository;

fn admin() -> Context {
    Context {
        user_id: UserId::new(),
        admin: true,
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

#[tokio::test]
async fn resource_upvote_lifecycle() {
    let app = in_memory();
    let admin = admin();

    let course = app
        .courses
        .create_course(
            &admin,
            NewCourse {
                name: "Distributed Systems".to_owned(),
                ..NewCourse::default()
            },
        )
        .await
        .unwrap();

    let u1 = app
        .users
        .register("Alan Turing", "alan@example.test", "Enigma#1936ok")
        .await
        .unwrap();
    let u2 = app
        .users
        .register("Grace Hopper", "grace@example.test", "C0bol$forever")
        .await
        .unwrap();

    let resource = app
        .courses
        .add_resource(
            &Context {
                user_id: u1.id,
                admin: false,
            },
            course.id,
            intro_resource(),
        )
        .await
        .unwrap();

    let stored = app.courses.course(course.id).await.unwrap();
    assert_eq!(stored.resources.len(), 1);
    assert!(stored.resources[0].upvoted_by.is_empty());

    let voter = Context {
        user_id: u2.id,
        admin: false,
    };

    assert_eq!(
        app.courses
            .upvote_resource(&voter, course.id, resource.id)
            .await
            .unwrap(),
        1
    );
    assert!(matches!(
        app.courses
            .upvote_resource(&voter, course.id, resource.id)
            .await
            .unwrap_err(),
        Error::AlreadyDone(_)
    ));
    assert_eq!(
        app.courses
            .course(course.id)
            .await
            .unwrap()
            .resources[0]
            .upvotes(),
        1
    );
    assert_eq!(
        app.courses
            .remove_upvote(&voter, course.id, resource.id)
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn catalog_save_and_progress() {
    let app = in_memory();
    let admin = admin();

    let general = app
        .catalog
        .create_category(&admin, "General Skills", CategoryKind::General, None)
        .await
        .unwrap();
    let course = app
        .catalog
        .add_course_to_category(
            &admin,
            general.id,
            NewCourse {
                name: "Public Speaking".to_owned(),
                ..NewCourse::default()
            },
        )
        .await
        .unwrap();

    assert!(matches!(
        app.catalog
            .add_university(&admin, general.id, "MIT")
            .await
            .unwrap_err(),
        Error::Validation(_)
    ));

    let user = app
        .users
        .register("Ada Lovelace", "ada@example.test", "Sup3r$ecret")
        .await
        .unwrap();
    let ctx = Context {
        user_id: user.id,
        admin: false,
    };

    app.users.save_course(&ctx, course.id).await.unwrap();
    assert!(matches!(
        app.users.save_course(&ctx, course.id).await.unwrap_err(),
        Error::AlreadyDone(_)
    ));

    let resource = app
        .courses
        .add_resource(&ctx, course.id, intro_resource())
        .await
        .unwrap();
    let checkpoint = app
        .courses
        .add_checkpoint(&admin, course.id, "Basics", vec![resource.id])
        .await
        .unwrap();

    let first = [checkpoint.id, CheckpointId::new()]
        .into_iter()
        .collect::<HashSet<_>>();
    let second = [checkpoint.id].into_iter().collect::<HashSet<_>>();

    app.users
        .update_progress(&ctx, course.id, first)
        .await
        .unwrap();
    app.users
        .update_progress(&ctx, course.id, second.clone())
        .await
        .unwrap();

    let profile = app.users.profile(user.id).await.unwrap();
    assert_eq!(profile.progress.len(), 1);
    assert_eq!(profile.progress[0].completed_checkpoints, second);
    assert_eq!(profile.saved_courses, vec![course.id]);
}

#[tokio::test]
async fn password_reset_round_trip() {
    let app = in_memory();

    app.users
        .register("Ada Lovelace", "ada@example.test", "Sup3r$ecret")
        .await
        .unwrap();

    assert!(matches!(
        app.users
            .forgot_password("nobody@example.test")
            .await
            .unwrap_err(),
        Error::NotFound("user")
    ));

    app.users.forgot_password("ada@example.test").await.unwrap();
    let first_otp = stored_otp(&app).await;

    // a second request replaces the code; the first one stops working
    app.users.forgot_password("ada@example.test").await.unwrap();
    let second_otp = stored_otp(&app).await;

    if first_otp != second_otp {
        assert!(matches!(
            app.users
                .reset_password("ada@example.test", &first_otp, "Fresh$ecret1")
                .await
                .unwrap_err(),
            Error::Validation(_)
        ));
    }

    app.users
        .reset_password("ada@example.test", &second_otp, "Fresh$ecret1")
        .await
        .unwrap();
    app.users
        .login("ada@example.test", "Fresh$ecret1")
        .await
        .unwrap();
    assert!(matches!(
        app.users
            .login("ada@example.test", "Sup3r$ecret")
            .await
            .unwrap_err(),
        Error::Unauthorized
    ));
}

async fn stored_otp(app: &edulearn::App) -> String {
    app.users
        .users
        .find_by_email("ada@example.test")
        .await
        .unwrap()
        .password_reset
        .unwrap()
        .otp
}

#[tokio::test]
async fn feed_toggle_and_comment() {
    let app = in_memory();

    let author = app
        .users
        .register("Ada Lovelace", "ada@example.test", "Sup3r$ecret")
        .await
        .unwrap();
    let ctx = Context {
        user_id: author.id,
        admin: false,
    };

    let post = app.posts.create_post(&ctx, "hello world").await.unwrap();

    let liked = app.posts.toggle_like(&ctx, post.id).await.unwrap();
    assert_eq!(liked.like_count(), 1);
    let unliked = app.posts.toggle_like(&ctx, post.id).await.unwrap();
    assert_eq!(unliked.like_count(), 0);

    app.posts.add_comment(&ctx, post.id, "welcome!").await.unwrap();

    let feed = app.posts.feed(0).await.unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].comments.len(), 1);
}
