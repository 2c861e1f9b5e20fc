use std::sync::Arc;

use axplore_core::PreferenceBackend;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use log::{info, warn};

use super::{ContentError, EventSpan};
use crate::{
    Backend, ClientContext, ClientEvent, Collection, EventRecord, NewRecord, RecordId, Session,
};

/// What the read shows when a record has no venue
const NO_VENUE: &str = "No venue specified";

/// An upcoming event ready for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub id: RecordId,
    pub title: String,
    pub span: EventSpan,
    /// The raw stored date string, searched against as-is
    pub date: String,
    pub venue: String,
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// The zero-padded start day, for the date badge
    pub fn day(&self) -> String {
        self.span.day()
    }

    /// The start month abbreviation, for the date badge
    pub fn month(&self) -> String {
        self.span.month()
    }
}

/// Form input for a new event, title and start date are required
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub start: NaiveDate,
    /// Defaults to the start for single-day events
    pub end: Option<NaiveDate>,
    pub venue: Option<String>,
}

/// Reads and publishes upcoming events, and tracks which ones this
/// device joined
pub struct EventBoard<B, P> {
    context: ClientContext<B, P>,
    session: Arc<Session<B, P>>,
    /// In memory only, joining does not survive a reload
    joined: DashMap<RecordId, ()>,
}

impl<B, P> EventBoard<B, P>
where
    B: Backend,
    P: PreferenceBackend,
{
    pub fn new(context: &ClientContext<B, P>, session: &Arc<Session<B, P>>) -> Self {
        Self {
            context: context.clone(),
            session: session.clone(),
            joined: Default::default(),
        }
    }

    /// Every parseable event, newest first. Records whose date string
    /// doesn't follow the stored shape are skipped.
    pub async fn list(&self) -> Result<Vec<Event>, ContentError> {
        let records = self
            .context
            .backend
            .list(Collection::UpcomingEvents, None)
            .await?;

        let mut events = Vec::with_capacity(records.len());

        for record in records {
            let wire: EventRecord = record.decode()?;

            let span = match EventSpan::parse(&wire.date) {
                Some(span) => span,
                None => {
                    warn!("Skipping event {} with malformed date", record.id);
                    continue;
                }
            };

            events.push(Event {
                id: record.id,
                title: wire.title,
                span,
                date: wire.date,
                venue: wire.venue.unwrap_or_else(|| NO_VENUE.to_string()),
                created_at: record.created_at,
            });
        }

        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(events)
    }

    /// Case-insensitive substring match over title and the stored date
    pub async fn search(&self, query: &str) -> Result<Vec<Event>, ContentError> {
        let query = query.to_lowercase();
        let mut events = self.list().await?;

        events.retain(|event| {
            event.title.to_lowercase().contains(&query)
                || event.date.to_lowercase().contains(&query)
        });

        Ok(events)
    }

    /// Publishes an event, teachers only. Single-day events store the
    /// bare date, ranges store the separated pair plus structured
    /// start/end fields for newer readers.
    pub async fn publish(&self, new_event: NewEvent) -> Result<RecordId, ContentError> {
        if !self.session.can_upload_event() {
            return Err(ContentError::PermissionDenied);
        }

        if new_event.title.is_empty() {
            return Err(ContentError::MissingField("title"));
        }

        let end = new_event.end.unwrap_or(new_event.start);
        let span = EventSpan::new(new_event.start, end).ok_or(ContentError::EndBeforeStart)?;

        let record = NewRecord::encode(&EventRecord {
            title: new_event.title,
            date: span.encode(),
            start_date: Some(span.start_display()),
            end_date: Some(span.end_display()),
            venue: new_event.venue,
        })?;

        let id = self
            .context
            .backend
            .add(Collection::UpcomingEvents, record)
            .await?;

        info!("Published event {}", id);

        self.context.emit(ClientEvent::ContentChanged {
            collection: Collection::UpcomingEvents,
        });

        Ok(id)
    }

    /// Deletes an event, teachers only
    pub async fn remove(&self, id: &str) -> Result<(), ContentError> {
        if !self.session.can_delete_content() {
            return Err(ContentError::PermissionDenied);
        }

        self.context
            .backend
            .delete(Collection::UpcomingEvents, id)
            .await?;

        self.joined.remove(id);

        self.context.emit(ClientEvent::ContentChanged {
            collection: Collection::UpcomingEvents,
        });

        Ok(())
    }

    pub fn join(&self, id: &str) {
        self.joined.insert(id.to_string(), ());
    }

    pub fn leave(&self, id: &str) {
        self.joined.remove(id);
    }

    pub fn is_joined(&self, id: &str) -> bool {
        self.joined.contains_key(id)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_support::{sign_in_student, sign_in_teacher, test_client};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn tech_fest() -> NewEvent {
        NewEvent {
            title: "Tech Fest".to_string(),
            start: date(2025, 6, 3),
            end: Some(date(2025, 6, 5)),
            venue: None,
        }
    }

    #[tokio::test]
    async fn test_range_rendering() {
        let (client, _) = test_client();

        sign_in_teacher(&client).await;
        client.events.publish(tech_fest()).await.unwrap();

        let events = client.events.list().await.unwrap();
        let event = &events[0];

        assert_eq!(event.date, "Jun 03, 2025 to Jun 05, 2025");
        assert_eq!(event.span.start_display(), "Jun 03, 2025");
        assert_eq!(event.span.end_display(), "Jun 05, 2025");
        assert_eq!(event.day(), "03");
        assert_eq!(event.month(), "Jun");
    }

    #[tokio::test]
    async fn test_single_day_stores_bare_date() {
        let (client, _) = test_client();

        sign_in_teacher(&client).await;
        client
            .events
            .publish(NewEvent {
                title: "Orientation".to_string(),
                start: date(2025, 6, 3),
                end: None,
                venue: Some("Auditorium".to_string()),
            })
            .await
            .unwrap();

        let events = client.events.list().await.unwrap();

        assert_eq!(events[0].date, "Jun 03, 2025");
        assert!(events[0].span.is_single_day());
        assert_eq!(events[0].venue, "Auditorium");
    }

    #[tokio::test]
    async fn test_missing_venue_reads_with_default() {
        let (client, _) = test_client();

        sign_in_teacher(&client).await;
        client.events.publish(tech_fest()).await.unwrap();

        let events = client.events.list().await.unwrap();
        assert_eq!(events[0].venue, NO_VENUE);
    }

    #[tokio::test]
    async fn test_end_before_start_is_rejected() {
        let (client, _) = test_client();

        sign_in_teacher(&client).await;

        let result = client
            .events
            .publish(NewEvent {
                title: "Backwards".to_string(),
                start: date(2025, 6, 5),
                end: Some(date(2025, 6, 3)),
                venue: None,
            })
            .await;

        assert!(matches!(result, Err(ContentError::EndBeforeStart)));
    }

    #[tokio::test]
    async fn test_students_cannot_publish_events() {
        let (client, backend) = test_client();

        sign_in_student(&client).await;
        let before = backend.operation_count();

        assert!(matches!(
            client.events.publish(tech_fest()).await,
            Err(ContentError::PermissionDenied)
        ));
        assert_eq!(backend.operation_count(), before);
    }

    #[tokio::test]
    async fn test_search_matches_title_and_date() {
        let (client, _) = test_client();

        sign_in_teacher(&client).await;
        client.events.publish(tech_fest()).await.unwrap();

        assert_eq!(client.events.search("tech").await.unwrap().len(), 1);
        assert_eq!(client.events.search("jun 03").await.unwrap().len(), 1);
        assert_eq!(client.events.search("december").await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_joined_set_is_per_device() {
        let (client, _) = test_client();

        sign_in_student(&client).await;

        client.events.join("evt-1");
        assert!(client.events.is_joined("evt-1"));
        assert!(!client.events.is_joined("evt-2"));

        client.events.leave("evt-1");
        assert!(!client.events.is_joined("evt-1"));
    }
}
