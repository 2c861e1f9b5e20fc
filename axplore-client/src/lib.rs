mod content;
mod events;
mod gateway;
mod intake;
mod navigation;
mod session;

use std::{sync::Arc, thread};

use axplore_core::{Config, PreferenceBackend, Preferences, Reachability, ReachabilityReceiver};
use crossbeam::channel::unbounded;

pub use content::*;
pub use events::*;
pub use gateway::*;
pub use intake::*;
pub use navigation::*;
pub use session::*;

/// The axplore client core, wiring the session, the content model, and
/// the navigation gate over a backend implementation.
pub struct Client<B, P> {
    context: ClientContext<B, P>,

    pub session: Arc<Session<B, P>>,
    pub news: NewsBoard<B, P>,
    pub events: EventBoard<B, P>,
    pub documents: DocumentShelf<B, P>,
    pub feeds: FeedWall<B, P>,
    pub navigation: NavigationGate<B, P>,

    event_receiver: EventReceiver,
}

/// A type passed to the controllers to access the backend, the
/// preferences, and the event channel.
pub struct ClientContext<B, P> {
    pub config: Config,
    pub backend: Arc<B>,
    pub preferences: Preferences<P>,

    event_sender: EventSender,
}

impl<B, P> Client<B, P>
where
    B: Backend,
    P: PreferenceBackend,
{
    pub fn new(
        config: Config,
        backend: &Arc<B>,
        preferences: &Arc<P>,
        reachability: &Arc<Reachability>,
    ) -> Self {
        let (event_sender, event_receiver) = unbounded();

        let context = ClientContext {
            config,
            backend: backend.clone(),
            preferences: Preferences::new(preferences),
            event_sender,
        };

        let session = Arc::new(Session::new(&context));

        let news = NewsBoard::new(&context, &session);
        let events = EventBoard::new(&context, &session);
        let documents = DocumentShelf::new(&context, &session);
        let feeds = FeedWall::new(&context, &session);
        let navigation = NavigationGate::new(&session, reachability);

        spawn_reachability_forwarder(&context, reachability.subscribe());

        Self {
            context,
            session,
            news,
            events,
            documents,
            feeds,
            navigation,
            event_receiver,
        }
    }

    /// The typed preference view, for the settings surface
    pub fn preferences(&self) -> &Preferences<P> {
        &self.context.preferences
    }

    /// Blocks until the client emits an event
    pub fn wait_for_event(&self) -> ClientEvent {
        self.event_receiver
            .recv()
            .expect("event is received without error")
    }

    /// A pending event, if any
    pub fn try_event(&self) -> Option<ClientEvent> {
        self.event_receiver.try_recv().ok()
    }
}

impl<B, P> ClientContext<B, P>
where
    B: Backend,
    P: PreferenceBackend,
{
    pub fn emit(&self, event: ClientEvent) {
        // A host that dropped the client stops observing events
        let _ = self.event_sender.send(event);
    }
}

impl<B, P> Clone for ClientContext<B, P>
where
    B: Backend,
    P: PreferenceBackend,
{
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            backend: self.backend.clone(),
            preferences: self.preferences.clone(),
            event_sender: self.event_sender.clone(),
        }
    }
}

/// Forwards reachability transitions onto the client event channel, so
/// hosts watch one stream. Ends when either side goes away.
fn spawn_reachability_forwarder<B, P>(
    context: &ClientContext<B, P>,
    receiver: ReachabilityReceiver,
) where
    B: Backend,
    P: PreferenceBackend,
{
    let sender = context.event_sender.clone();

    let run = move || loop {
        match receiver.recv() {
            Ok(online) => {
                if sender
                    .send(ClientEvent::ReachabilityChanged { online })
                    .is_err()
                {
                    break;
                }
            }
            Err(_) => break,
        }
    };

    thread::spawn(run);
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_support::{student_sign_up, teacher_sign_up, test_client};

    #[tokio::test]
    async fn test_events_are_emitted() {
        let (client, _) = test_client();

        client.session.sign_up(teacher_sign_up()).await.unwrap();
        client.session.accept_terms().unwrap();
        client
            .news
            .publish(NewNews {
                title: "Holiday".to_string(),
                date: "Jun 03, 2025".to_string(),
                content: "No class".to_string(),
            })
            .await
            .unwrap();

        // The reachability forwarder races the main thread, so only the
        // relative order of same-origin events is asserted
        let events: Vec<_> = (0..4).map(|_| client.wait_for_event()).collect();

        assert!(events.contains(&ClientEvent::ReachabilityChanged { online: true }));
        assert!(events.contains(&ClientEvent::ContentChanged {
            collection: Collection::NewsUpdates,
        }));

        let phases: Vec<_> = events
            .iter()
            .filter_map(|event| match event {
                ClientEvent::SessionChanged { phase } => Some(*phase),
                _ => None,
            })
            .collect();

        assert_eq!(
            phases,
            vec![SessionPhase::PendingTerms, SessionPhase::Authenticated]
        );

        assert_eq!(client.try_event(), None, "nothing else is pending");
    }

    #[tokio::test]
    async fn test_remembered_email_survives_a_restart() {
        use crate::test_support::test_client_with_parts;
        use axplore_core::implementors::MemoryPreferences;

        let backend = Arc::new(MemoryBackend::new());
        let device_store = Arc::new(MemoryPreferences::new());

        let client = test_client_with_parts(&backend, &device_store);
        client.session.sign_up(student_sign_up()).await.unwrap();
        client.session.accept_terms().unwrap();
        client.session.sign_out().await.unwrap();

        client
            .session
            .sign_in(SignInRequest {
                email: "asha@x.edu".to_string(),
                password: "secret1".to_string(),
                remember_me: true,
            })
            .await
            .unwrap();

        drop(client);

        // Same device store, fresh process
        let restarted = test_client_with_parts(&backend, &device_store);

        assert_eq!(
            restarted.preferences().remembered_email().await,
            Some("asha@x.edu".to_string()),
            "the sign-in email must pre-fill after a restart"
        );
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axplore_core::{implementors::MemoryPreferences, Config, Reachability};

    use crate::{Client, MemoryBackend, Role, Semester, SignInRequest, SignUpRequest};

    pub type TestClient = Client<MemoryBackend, MemoryPreferences>;

    pub fn test_client() -> (TestClient, Arc<MemoryBackend>) {
        let (client, backend, _) = test_client_with_reachability(true);
        (client, backend)
    }

    pub fn test_client_with_reachability(
        online: bool,
    ) -> (TestClient, Arc<MemoryBackend>, Arc<Reachability>) {
        let backend = Arc::new(MemoryBackend::new());
        let preferences = Arc::new(MemoryPreferences::new());
        let reachability = Arc::new(Reachability::new(online));

        let client = Client::new(
            Config::default(),
            &backend,
            &preferences,
            &reachability,
        );

        (client, backend, reachability)
    }

    /// A client over shared parts, for simulating an app restart
    pub fn test_client_with_parts(
        backend: &Arc<MemoryBackend>,
        preferences: &Arc<MemoryPreferences>,
    ) -> TestClient {
        let reachability = Arc::new(Reachability::new(true));
        Client::new(Config::default(), backend, preferences, &reachability)
    }

    pub fn student_sign_up() -> SignUpRequest {
        SignUpRequest {
            name: "Asha".to_string(),
            email: "asha@x.edu".to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
            role: Role::Student,
            semester: Semester::new(3).unwrap(),
            teacher_code: String::new(),
        }
    }

    pub fn teacher_sign_up() -> SignUpRequest {
        SignUpRequest {
            name: "Verma".to_string(),
            email: "verma@x.edu".to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
            role: Role::Teacher,
            semester: Semester::FIRST,
            teacher_code: "NIELITTEACHER".to_string(),
        }
    }

    /// Enrolls the student on first use, signs back in afterwards
    pub async fn sign_in_student(client: &TestClient) {
        sign_in_as(client, student_sign_up()).await;
    }

    /// Enrolls the teacher on first use, signs back in afterwards
    pub async fn sign_in_teacher(client: &TestClient) {
        sign_in_as(client, teacher_sign_up()).await;
    }

    async fn sign_in_as(client: &TestClient, request: SignUpRequest) {
        match client.session.sign_up(request.clone()).await {
            Ok(_) => client.session.accept_terms().unwrap(),
            Err(_) => {
                client
                    .session
                    .sign_in(SignInRequest {
                        email: request.email,
                        password: request.password,
                        remember_me: false,
                    })
                    .await
                    .unwrap();
            }
        }
    }
}
