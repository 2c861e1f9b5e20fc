use std::sync::Arc;

use axplore_core::{epoch_ms, PreferenceBackend};
use chrono::{DateTime, Utc};
use log::info;

use super::ContentError;
use crate::{
    intake::{feed_image_path, PickedImage},
    Backend, ClientContext, ClientEvent, Collection, FeedRecord, NewRecord, RecordId, Session,
};

/// A recent-updates entry, a titled image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub id: RecordId,
    pub title: String,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

/// Form input for a new feed entry. The image stays optional here
/// because the form allows submitting before one was picked.
#[derive(Debug, Clone)]
pub struct NewFeed {
    pub title: String,
    pub image: Option<PickedImage>,
}

/// Reads and publishes the recent-updates wall
pub struct FeedWall<B, P> {
    context: ClientContext<B, P>,
    session: Arc<Session<B, P>>,
}

impl<B, P> FeedWall<B, P>
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

    /// Every feed entry, newest first
    pub async fn list(&self) -> Result<Vec<FeedItem>, ContentError> {
        let records = self
            .context
            .backend
            .list(Collection::RecentUpdates, None)
            .await?;

        let mut items = Vec::with_capacity(records.len());

        for record in records {
            let wire: FeedRecord = record.decode()?;

            items.push(FeedItem {
                id: record.id,
                title: wire.title,
                image_url: wire.image_url,
                created_at: record.created_at,
            });
        }

        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    /// Publishes a feed entry, teachers only
    pub async fn publish(&self, new_feed: NewFeed) -> Result<RecordId, ContentError> {
        if !self.session.can_upload_feed() {
            return Err(ContentError::PermissionDenied);
        }

        if new_feed.title.is_empty() {
            return Err(ContentError::MissingField("title"));
        }

        let image = new_feed.image.ok_or(ContentError::MissingField("image"))?;

        let path = feed_image_path(epoch_ms());
        let image_url = self
            .context
            .backend
            .upload_blob(&path, image.bytes, &image.mime)
            .await?;

        let record = NewRecord::encode(&FeedRecord {
            title: new_feed.title,
            image_url,
        })?;

        let id = self
            .context
            .backend
            .add(Collection::RecentUpdates, record)
            .await?;

        info!("Published feed {}", id);

        self.context.emit(ClientEvent::ContentChanged {
            collection: Collection::RecentUpdates,
        });

        Ok(id)
    }

    /// Deletes a feed entry, teachers only
    pub async fn remove(&self, id: &str) -> Result<(), ContentError> {
        if !self.session.can_delete_content() {
            return Err(ContentError::PermissionDenied);
        }

        self.context
            .backend
            .delete(Collection::RecentUpdates, id)
            .await?;

        self.context.emit(ClientEvent::ContentChanged {
            collection: Collection::RecentUpdates,
        });

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_support::{sign_in_student, sign_in_teacher, test_client};

    fn campus_feed() -> NewFeed {
        NewFeed {
            title: "Campus fair".to_string(),
            image: Some(PickedImage {
                bytes: vec![0xFF, 0xD8, 0xFF],
                mime: "image/jpeg".to_string(),
            }),
        }
    }

    #[tokio::test]
    async fn test_publish_and_list() {
        let (client, _) = test_client();

        sign_in_teacher(&client).await;
        client.feeds.publish(campus_feed()).await.unwrap();

        let items = client.feeds.list().await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Campus fair");
        assert!(items[0].image_url.contains("recentUpdates/"));
    }

    #[tokio::test]
    async fn test_publish_requires_a_picked_image() {
        let (client, _) = test_client();

        sign_in_teacher(&client).await;

        let result = client
            .feeds
            .publish(NewFeed {
                title: "No image".to_string(),
                image: None,
            })
            .await;

        assert!(matches!(result, Err(ContentError::MissingField("image"))));
    }

    #[tokio::test]
    async fn test_students_cannot_publish_feeds() {
        let (client, backend) = test_client();

        sign_in_student(&client).await;
        let before = backend.operation_count();

        assert!(matches!(
            client.feeds.publish(campus_feed()).await,
            Err(ContentError::PermissionDenied)
        ));
        assert_eq!(backend.operation_count(), before);
    }
}
