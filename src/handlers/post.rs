use std::collections::HashSet;
use std::sync::Arc;

use anyhow::anyhow;
use chrono::Utc;
use smallvec::SmallVec;

use super::{post_err, Context, Error, Result};
use crate::entities::{Comment, Post, PostId};
use crate::repositories::{PostRepository, FEED_PAGE};
use crate::validate;

pub struct PostHandler {
    pub posts: Arc<dyn PostRepository + Sync + Send>,
}

impl PostHandler {
    pub async fn create_post(&self, ctx: &Context, content: &str) -> Result<Post> {
        let content = validate::non_empty(content, "post content")?;
        let content = validate::capped(&content, validate::POST_MAX, "posts")?;

        let post = Post {
            id: PostId::new(),
            user: ctx.user_id,
            content,
            created: Utc::now(),
            likes: HashSet::new(),
            comments: vec![],
        };

        let can_insert = self.posts.insert(post.clone()).await.map_err(post_err)?;
        if !can_insert {
            return Err(Error::Internal(anyhow!("post id duplicated")));
        }

        Ok(post)
    }

    pub async fn feed(&self, page: u32) -> Result<SmallVec<[Post; FEED_PAGE]>> {
        self.posts.page(page).await.map_err(post_err)
    }

    pub async fn post(&self, post_id: PostId) -> Result<Post> {
        self.posts.find(post_id).await.map_err(post_err)
    }

    /// True toggle, unlike the resource upvote: liking twice nets out to
    /// unliked, and neither direction is ever rejected.
    pub async fn toggle_like(&self, ctx: &Context, post_id: PostId) -> Result<Post> {
        let inserted = self
            .posts
            .insert_like(post_id, ctx.user_id)
            .await
            .map_err(post_err)?;
        if !inserted {
            self.posts
                .delete_like(post_id, ctx.user_id)
                .await
                .map_err(post_err)?;
        }

        self.post(post_id).await
    }

    pub async fn add_comment(&self, ctx: &Context, post_id: PostId, text: &str) -> Result<Comment> {
        let comment = Comment {
            user: ctx.user_id,
            text: validate::non_empty(text, "comment text")?,
            created: Utc::now(),
        };

        self.posts
            .push_comment(post_id, comment.clone())
            .await
            .map_err(post_err)?;

        Ok(comment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::UserId;
    use crate::repositories::mock::InMemoryRepository;

    fn handler() -> PostHandler {
        PostHandler {
            posts: Arc::new(InMemoryRepository::<Post>::new()),
        }
    }

    fn member() -> Context {
        Context {
            user_id: UserId::new(),
            admin: false,
        }
    }

    #[tokio::test]
    async fn toggle_like_is_its_own_inverse() {
        let handler = handler();
        let author = member();
        let liker = member();

        let post = handler.create_post(&author, "first post").await.unwrap();

        let liked = handler.toggle_like(&liker, post.id).await.unwrap();
        assert!(liked.likes.contains(&liker.user_id));
        assert_eq!(liked.like_count(), 1);

        let unliked = handler.toggle_like(&liker, post.id).await.unwrap();
        assert!(!unliked.likes.contains(&liker.user_id));
        assert_eq!(unliked.like_count(), 0);

        // two likers count independently
        handler.toggle_like(&liker, post.id).await.unwrap();
        let both = handler.toggle_like(&member(), post.id).await.unwrap();
        assert_eq!(both.like_count(), 2);
    }

    #[tokio::test]
    async fn post_content_is_trimmed_and_capped() {
        let handler = handler();
        let author = member();

        let err = handler.create_post(&author, "   ").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = handler
            .create_post(&author, &"x".repeat(validate::POST_MAX + 1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let post = handler
            .create_post(&author, &"x".repeat(validate::POST_MAX))
            .await
            .unwrap();
        assert_eq!(post.content.len(), validate::POST_MAX);
    }

    #[tokio::test]
    async fn feed_is_paged_newest_first() {
        let handler = handler();
        let author = member();

        for i in 0..(FEED_PAGE + 3) {
            handler
                .create_post(&author, &format!("post {}", i))
                .await
                .unwrap();
            // distinct timestamps keep the ordering deterministic
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        let first = handler.feed(0).await.unwrap();
        assert_eq!(first.len(), FEED_PAGE);
        assert_eq!(first[0].content, format!("post {}", FEED_PAGE + 2));

        let second = handler.feed(1).await.unwrap();
        assert_eq!(second.len(), 3);
        assert_eq!(second[2].content, "post 0");
    }

    #[tokio::test]
    async fn comments_require_text_and_a_post() {
        let handler = handler();
        let author = member();

        let post = handler.create_post(&author, "first post").await.unwrap();

        let err = handler
            .add_comment(&member(), post.id, "  ")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = handler
            .add_comment(&member(), PostId::new(), "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound("post")));

        handler
            .add_comment(&member(), post.id, " hello ")
            .await
            .unwrap();
        let stored = handler.post(post.id).await.unwrap();
        assert_eq!(stored.comments.len(), 1);
        assert_eq!(stored.comments[0].text, "hello");
    }
}
