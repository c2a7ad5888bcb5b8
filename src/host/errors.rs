/*!
Per-thread error queue behind the host's error capabilities.

Providers report through `put_error` and `add_error_data`; the host reads
the records back with [`take_errors`].
*/

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;

/// Oldest records are discarded beyond this many
const MAX_QUEUED: usize = 16;

/// One reported error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    pub library: u32,
    pub reason: u32,
    pub file: &'static str,
    pub line: u32,
    /// Free-form text attached after the error was raised
    pub data: Option<String>,
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lib({}) reason({}) at {}:{}", self.library, self.reason, self.file, self.line)?;
        if let Some(data) = &self.data {
            write!(f, ": {}", data)?;
        }
        Ok(())
    }
}

thread_local! {
    static QUEUE: RefCell<VecDeque<ErrorRecord>> = const { RefCell::new(VecDeque::new()) };
}

pub(crate) fn put(library: u32, reason: u32, file: &'static str, line: u32) {
    QUEUE.with(|queue| {
        let mut queue = queue.borrow_mut();
        if queue.len() == MAX_QUEUED {
            queue.pop_front();
        }
        queue.push_back(ErrorRecord {
            library,
            reason,
            file,
            line,
            data: None,
        });
    });
}

pub(crate) fn add_data(data: &str) {
    QUEUE.with(|queue| {
        if let Some(record) = queue.borrow_mut().back_mut() {
            match &mut record.data {
                Some(existing) => {
                    existing.push_str("; ");
                    existing.push_str(data);
                }
                None => record.data = Some(data.to_string()),
            }
        }
    });
}

/// Drain this thread's queued errors, oldest first
pub fn take_errors() -> Vec<ErrorRecord> {
    QUEUE.with(|queue| queue.borrow_mut().drain(..).collect())
}

/// Most recent error on this thread, if any
pub fn peek_last() -> Option<ErrorRecord> {
    QUEUE.with(|queue| queue.borrow().back().cloned())
}

/// Discard this thread's queued errors
pub fn clear() {
    QUEUE.with(|queue| queue.borrow_mut().clear());
}
