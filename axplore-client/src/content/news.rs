use std::sync::Arc;

use axplore_core::PreferenceBackend;
use chrono::{DateTime, Utc};
use log::info;

use super::ContentError;
use crate::{
    Backend, ClientContext, ClientEvent, Collection, NewRecord, NewsRecord, RecordId, Session,
};

/// A news post ready for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsPost {
    pub id: RecordId,
    pub title: String,
    /// Human-readable display date the author picked
    pub date: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Form input for a new post, every field is required
#[derive(Debug, Clone)]
pub struct NewNews {
    pub title: String,
    pub date: String,
    pub content: String,
}

/// Reads and publishes news updates
pub struct NewsBoard<B, P> {
    context: ClientContext<B, P>,
    session: Arc<Session<B, P>>,
}

impl<B, P> NewsBoard<B, P>
where
    B: Backend,
    P: PreferenceBackend,
{
    pub fn new(context: &ClientContext<B, P>, session: &Arc<Session<B, P>>) -> Self {
        Self {
            context: context.clone(),
            session: session.clone(),
        }
    }

    /// Every post, newest first
    pub async fn list(&self) -> Result<Vec<NewsPost>, ContentError> {
        let records = self
            .context
            .backend
            .list(Collection::NewsUpdates, None)
            .await?;

        let mut posts = Vec::with_capacity(records.len());

        for record in records {
            let wire: NewsRecord = record.decode()?;

            posts.push(NewsPost {
                id: record.id,
                title: wire.title,
                date: wire.date,
                content: wire.content,
                created_at: record.created_at,
            });
        }

        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    /// Case-insensitive substring match over title and body
    pub async fn search(&self, query: &str) -> Result<Vec<NewsPost>, ContentError> {
        let query = query.to_lowercase();
        let mut posts = self.list().await?;

        posts.retain(|post| {
            post.title.to_lowercase().contains(&query)
                || post.content.to_lowercase().contains(&query)
        });

        Ok(posts)
    }

    /// Publishes a post, teachers only
    pub async fn publish(&self, new_post: NewNews) -> Result<RecordId, ContentError> {
        if !self.session.can_upload_news() {
            return Err(ContentError::PermissionDenied);
        }

        if new_post.title.is_empty() {
            return Err(ContentError::MissingField("title"));
        }
        if new_post.date.is_empty() {
            return Err(ContentError::MissingField("date"));
        }
        if new_post.content.is_empty() {
            return Err(ContentError::MissingField("content"));
        }

        let record = NewRecord::encode(&NewsRecord {
            title: new_post.title,
            date: new_post.date,
            content: new_post.content,
        })?;

        let id = self
            .context
            .backend
            .add(Collection::NewsUpdates, record)
            .await?;

        info!("Published news update {}", id);

        self.context.emit(ClientEvent::ContentChanged {
            collection: Collection::NewsUpdates,
        });

        Ok(id)
    }

    /// Deletes a post, teachers only
    pub async fn remove(&self, id: &str) -> Result<(), ContentError> {
        if !self.session.can_delete_content() {
            return Err(ContentError::PermissionDenied);
        }

        self.context
            .backend
            .delete(Collection::NewsUpdates, id)
            .await?;

        self.context.emit(ClientEvent::ContentChanged {
            collection: Collection::NewsUpdates,
        });

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_support::{sign_in_student, sign_in_teacher, test_client};

    fn holiday_post() -> NewNews {
        NewNews {
            title: "Holiday".to_string(),
            date: "Jun 03, 2025".to_string(),
            content: "No class".to_string(),
        }
    }

    #[tokio::test]
    async fn test_student_sees_what_a_teacher_published() {
        let (client, backend) = test_client();

        sign_in_teacher(&client).await;
        client.news.publish(holiday_post()).await.unwrap();
        client.session.sign_out().await.unwrap();

        sign_in_student(&client).await;
        let posts = client.news.list().await.unwrap();

        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "Holiday");
        assert_eq!(posts[0].content, "No class");
        drop(backend);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let (client, _) = test_client();

        sign_in_teacher(&client).await;
        client.news.publish(holiday_post()).await.unwrap();
        client
            .news
            .publish(NewNews {
                title: "Exam schedule".to_string(),
                date: "Jun 10, 2025".to_string(),
                content: "Semester finals".to_string(),
            })
            .await
            .unwrap();

        let matched = client.news.search("holi").await.unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].title, "Holiday");

        // Body text matches too
        let matched = client.news.search("FINALS").await.unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].title, "Exam schedule");
    }

    #[tokio::test]
    async fn test_students_cannot_publish() {
        let (client, backend) = test_client();

        sign_in_student(&client).await;
        let before = backend.operation_count();

        let result = client.news.publish(holiday_post()).await;

        assert!(matches!(result, Err(ContentError::PermissionDenied)));
        assert_eq!(
            backend.operation_count(),
            before,
            "the rejection must not reach the gateway"
        );
    }

    #[tokio::test]
    async fn test_publish_requires_every_field() {
        let (client, _) = test_client();

        sign_in_teacher(&client).await;

        let mut missing_date = holiday_post();
        missing_date.date.clear();

        assert!(matches!(
            client.news.publish(missing_date).await,
            Err(ContentError::MissingField("date"))
        ));
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let (client, _) = test_client();

        sign_in_teacher(&client).await;
        client.news.publish(holiday_post()).await.unwrap();
        client
            .news
            .publish(NewNews {
                title: "Later".to_string(),
                date: "Jun 04, 2025".to_string(),
                content: "Posted second".to_string(),
            })
            .await
            .unwrap();

        let posts = client.news.list().await.unwrap();
        assert_eq!(posts[0].title, "Later");
        assert_eq!(posts[1].title, "Holiday");
    }

    #[tokio::test]
    async fn test_teacher_can_remove() {
        let (client, _) = test_client();

        sign_in_teacher(&client).await;
        let id = client.news.publish(holiday_post()).await.unwrap();

        client.news.remove(&id).await.unwrap();
        assert!(client.news.list().await.unwrap().is_empty());
    }
}
