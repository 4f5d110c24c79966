use parking_lot::Mutex;

/// A minimal insertion-ordered listener table, mirroring the one
/// `jstp-protocol`'s `Connection` keeps for its own event and
/// packet-rejected callbacks.
pub(crate) struct ListenerTable<T> {
    listeners: Mutex<Vec<Box<dyn Fn(T) + Send + Sync>>>,
}

impl<T: Clone> ListenerTable<T> {
    pub(crate) fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn add(&self, listener: impl Fn(T) + Send + Sync + 'static) {
        self.listeners.lock().push(Box::new(listener));
    }

    pub(crate) fn emit(&self, value: T) {
        for listener in self.listeners.lock().iter() {
            listener(value.clone());
        }
    }
}
