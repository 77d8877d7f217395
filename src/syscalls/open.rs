use crate::dispatcher::{self, SyscallStop};
use crate::policy::{Decision, Violation};
use crate::ptrace::Tracee;
use crate::state::State;

/// Opens are allowed only for a fully read path the open policy accepts.
pub fn handler(state: &State, tracee: &dyn Tracee, stop: &SyscallStop, path_arg: usize) -> Decision {
  let path = dispatcher::read_path(state, tracee, stop, path_arg);
  dispatcher::log(state, &dispatcher::call_line(stop.name(), Some(&path.bytes)));
  if path.complete && state.open_policy.permits(&path.bytes) {
    Decision::Allow
  } else {
    Decision::Terminate(Violation { syscall: stop.name(), path: Some(path.bytes) })
  }
}
