use std::sync::{Arc, Mutex, MutexGuard};

use crate::firely::log::LOGGER;
use crate::logger::{LogLevel, TEST_GUARD};

/// Records every message sent to the crate logger until dropped.
///
/// Holds the shared logging guard so captures never interleave.
pub struct LogCapture {
    records: Arc<Mutex<Vec<(LogLevel, String)>>>,
    _guard: MutexGuard<'static, ()>,
}

impl LogCapture {
    pub fn start() -> Self {
        let guard = TEST_GUARD.lock().unwrap_or_else(|e| e.into_inner());
        let records = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&records);
        LOGGER.set_log_handler(move |_, level, message| {
            sink.lock().unwrap().push((level, message.to_string()));
        });
        Self {
            records,
            _guard: guard,
        }
    }

    pub fn records(&self) -> Vec<(LogLevel, String)> {
        self.records.lock().unwrap().clone()
    }

    pub fn count(&self, message: &str) -> usize {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, recorded)| recorded == message)
            .count()
    }
}

impl Drop for LogCapture {
    fn drop(&mut self) {
        LOGGER.reset_log_handler();
    }
}
