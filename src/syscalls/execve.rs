use crate::dispatcher::{self, SyscallStop};
use crate::policy::{Decision, Violation};
use crate::ptrace::Tracee;
use crate::state::State;

/// Program replacement is never allowed; the path is only logged.
pub fn handler(state: &State, tracee: &dyn Tracee, stop: &SyscallStop, path_arg: usize) -> Decision {
  let path = dispatcher::read_path(state, tracee, stop, path_arg);
  dispatcher::log(state, &dispatcher::call_line(stop.name(), Some(&path.bytes)));
  Decision::Terminate(Violation { syscall: stop.name(), path: Some(path.bytes) })
}
