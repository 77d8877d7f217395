use tracing::warn;

use crate::capture::{CaptureKey, MAX_RECORD_LEN};
use crate::dispatcher::{self, SyscallStop};
use crate::memory;
use crate::ptrace::Tracee;
use crate::state::State;

/// read(fd, buf, count) = retval: captures the `retval` bytes the kernel
/// actually stored in `buf`. Failed reads leave nothing behind.
pub fn post_handler(state: &State, tracee: &dyn Tracee, stop: &SyscallStop, retval: i64) {
  let [fd, buf, ..] = stop.args;
  let Ok(len) = usize::try_from(retval) else {
    return;
  };
  match memory::read_buffer(tracee, stop.abi, buf, len.min(MAX_RECORD_LEN)) {
    Ok(data) => dispatcher::capture(state, CaptureKey::Fd(fd as u32), &data),
    Err(err) => warn!(%err, fd, "read buffer not captured")
  }
}
