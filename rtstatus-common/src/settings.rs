use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{Result, RtStatusError};

/// Worker pool dimensions. Fixed for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    pub server_limit: usize,
    pub thread_limit: usize,
}

impl Limits {
    pub fn new(server_limit: usize, thread_limit: usize) -> Self {
        Self { server_limit, thread_limit }
    }

    /// Total number of worker slots.
    pub fn slots(&self) -> usize {
        self.server_limit * self.thread_limit
    }
}

/// Server settings as read from the optional JSON settings file.
/// Every field has a default, so `{}` is a valid file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub listen_addr: String,
    pub server_limit: usize,
    pub thread_limit: usize,
    pub document_root: PathBuf,
    pub listen_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            server_limit: 16,
            thread_limit: 25,
            document_root: PathBuf::from("htdocs"),
            listen_file: None,
        }
    }
}

impl Settings {
    /// Check the limits and return them.
    pub fn limits(&self) -> Result<Limits> {
        if self.server_limit == 0 {
            return Err(RtStatusError::InvalidSettings("server_limit must be at least 1".to_string()));
        }
        if self.thread_limit == 0 {
            return Err(RtStatusError::InvalidSettings("thread_limit must be at least 1".to_string()));
        }
        Ok(Limits::new(self.server_limit, self.thread_limit))
    }
}
