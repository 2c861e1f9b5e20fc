use crossbeam::channel::{Receiver, Sender};

use crate::{Collection, SessionPhase};

pub type EventSender = Sender<ClientEvent>;
pub type EventReceiver = Receiver<ClientEvent>;

/// Events emitted by the client core
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// The session advanced through its state machine
    SessionChanged { phase: SessionPhase },
    /// Network reachability flipped
    ReachabilityChanged { online: bool },
    /// A mutation landed in a collection, stale screens should refetch
    ContentChanged { collection: Collection },
}
