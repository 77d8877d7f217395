use tracing::warn;

use crate::capture::{CaptureKey, MAX_RECORD_LEN};
use crate::dispatcher::{self, SyscallStop};
use crate::memory;
use crate::policy::Decision;
use crate::ptrace::Tracee;
use crate::state::State;

/// write(fd, buf, count): captures `count` bytes of `buf` under `fd`. The
/// kernel takes `fd` as an `unsigned int`, so only its low 32 bits count.
pub fn handler(state: &State, tracee: &dyn Tracee, stop: &SyscallStop) -> Decision {
  let [fd, buf, count, ..] = stop.args;
  let len = usize::try_from(count).unwrap_or(usize::MAX).min(MAX_RECORD_LEN);
  match memory::read_buffer(tracee, stop.abi, buf, len) {
    Ok(data) => dispatcher::capture(state, CaptureKey::Fd(fd as u32), &data),
    Err(err) => warn!(%err, fd, "write buffer not captured")
  }
  Decision::LogOnly
}
