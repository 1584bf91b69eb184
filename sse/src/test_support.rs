use crate::connection::ConnectionHandle;
use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory sink that records every chunk written to it.
#[derive(Default)]
pub(crate) struct MockConnection {
    data: Mutex<String>,
    closed: AtomicBool,
    fail_writes: AtomicBool,
    fail_close: AtomicBool,
    close_calls: AtomicUsize,
}

impl MockConnection {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A sink whose remote end already went away.
    pub(crate) fn already_closed() -> Arc<Self> {
        let mock = Self::default();
        mock.closed.store(true, Ordering::SeqCst);
        Arc::new(mock)
    }

    /// An open sink that rejects every write.
    pub(crate) fn broken() -> Arc<Self> {
        let mock = Self::default();
        mock.fail_writes.store(true, Ordering::SeqCst);
        Arc::new(mock)
    }

    pub(crate) fn fail_on_close(&self) {
        self.fail_close.store(true, Ordering::SeqCst);
    }

    pub(crate) fn data(&self) -> String {
        self.data.lock().unwrap().clone()
    }

    pub(crate) fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

impl ConnectionHandle for MockConnection {
    fn write(&self, chunk: &str) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::Closed);
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Disconnected("broken pipe".to_string()));
        }
        self.data.lock().unwrap().push_str(chunk);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(Error::Disconnected("socket already reset".to_string()));
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
