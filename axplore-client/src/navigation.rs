use std::sync::Arc;

use axplore_core::{PreferenceBackend, Reachability};

use crate::{Backend, Role, Session, SessionPhase};

/// The screen surface the host should render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    /// No connectivity, only a manual retry is offered
    Offline,
    /// The session controller has a call in flight
    Loading,
    /// The anonymous flow: introduction, sign-in, sign-up
    Introduction,
    /// Signed up, terms not yet accepted
    Terms,
    /// The authenticated shell, with the admin tab for teachers
    Shell { admin_tab: bool },
}

/// Decides the visible surface from reachability and session state.
///
/// Deciding only reads snapshots, so while offline no gateway
/// operation is ever initiated from here.
pub struct NavigationGate<B, P> {
    session: Arc<Session<B, P>>,
    reachability: Arc<Reachability>,
}

impl<B, P> NavigationGate<B, P>
where
    B: Backend,
    P: PreferenceBackend,
{
    pub fn new(session: &Arc<Session<B, P>>, reachability: &Arc<Reachability>) -> Self {
        Self {
            session: session.clone(),
            reachability: reachability.clone(),
        }
    }

    pub fn decide(&self) -> Surface {
        if !self.reachability.is_online() {
            return Surface::Offline;
        }

        if self.session.is_busy() {
            return Surface::Loading;
        }

        match self.session.phase() {
            SessionPhase::Anonymous => Surface::Introduction,
            SessionPhase::PendingTerms => Surface::Terms,
            SessionPhase::Authenticated => Surface::Shell {
                admin_tab: self.session.role() == Some(Role::Teacher),
            },
        }
    }

    /// Manual retry from the offline surface, re-reads the sensor only
    pub fn retry(&self) -> Surface {
        self.decide()
    }
}
