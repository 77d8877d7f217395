use std::path::PathBuf;

use crate::{capture::CaptureWriter, policy::OpenPolicy};

pub const DEFAULT_LOG_DIR: &str = "/tmp/.pwn-sandbox";
pub const DEFAULT_PREFIX: &str = "timestamp";
/// Longest path, NUL included, read out of the tracee.
pub const PATH_CAPACITY: usize = 4096;

/// Session-wide settings. Nothing in here changes while tracing.
pub struct State {
  pub capture: CaptureWriter,
  pub open_policy: OpenPolicy,
  pub path_capacity: usize
}

impl State {
  pub fn new(log_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> State {
    State {
      capture: CaptureWriter::new(log_dir, prefix),
      ..Default::default()
    }
  }
}

impl Default for State {
  fn default() -> Self {
    State {
      capture: CaptureWriter::new(DEFAULT_LOG_DIR, DEFAULT_PREFIX),
      open_policy: OpenPolicy::default(),
      path_capacity: PATH_CAPACITY
    }
  }
}
