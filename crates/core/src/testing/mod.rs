//! Testing utilities and mock implementations.
//!
//! This module provides a scripted [`MockProvider`] standing in for a real
//! database and a [`SharedBuffer`] sink that captures the log stream,
//! allowing dispatcher runs to be tested without external infrastructure.
//!
//! # Example
//!
//! ```rust,ignore
//! use lockscope_core::testing::{MockProvider, MockResponse, SharedBuffer};
//!
//! let provider = MockProvider::new().on("select 1", MockResponse::rows(&["1"], &[&["1"]]));
//! let buffer = SharedBuffer::new();
//!
//! // Run an Inspector with Box::new(buffer.clone()) as the sink...
//!
//! assert_eq!(buffer.lines()[0], "1:QUERY:select 1");
//! ```

mod mock_connection;

pub use mock_connection::{MockCall, MockConnection, MockProvider, MockResponse};

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

/// Cloneable in-memory sink; every clone writes to the same buffer.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far.
    pub fn contents(&self) -> String {
        let bytes = self.bytes.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Written lines, without terminators.
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(String::from).collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
