use crossbeam::channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

pub type ReachabilityReceiver = Receiver<bool>;

/// Process-wide network reachability signal.
///
/// The platform layer is the single writer via [Reachability::set_online].
/// `online == false` means no backend operation will succeed and consumers
/// should present an offline surface.
pub struct Reachability {
    online: Mutex<bool>,
    subscribers: Mutex<Vec<Sender<bool>>>,
}

impl Reachability {
    pub fn new(initially_online: bool) -> Self {
        Self {
            online: Mutex::new(initially_online),
            subscribers: Default::default(),
        }
    }

    /// The current value as a snapshot
    pub fn is_online(&self) -> bool {
        *self.online.lock()
    }

    /// Records a transition reported by the OS sensor.
    /// Setting the same value twice does not notify subscribers.
    pub fn set_online(&self, online: bool) {
        let mut current = self.online.lock();

        if *current == online {
            return;
        }

        *current = online;

        self.subscribers
            .lock()
            .retain(|subscriber| subscriber.send(online).is_ok());
    }

    /// Subscribes to the signal. The current value is emitted immediately,
    /// then one message per transition.
    pub fn subscribe(&self) -> ReachabilityReceiver {
        let (sender, receiver) = unbounded();

        sender
            .send(self.is_online())
            .expect("receiver is alive on subscribe");

        self.subscribers.lock().push(sender);
        receiver
    }
}

impl Default for Reachability {
    fn default() -> Self {
        Self::new(true)
    }
}
