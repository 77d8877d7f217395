use crate::dispatcher::{self, SyscallStop};
use crate::policy::{Decision, Violation};
use crate::state::State;

/// fork, vfork, clone and clone3.
pub fn handler(state: &State, stop: &SyscallStop) -> Decision {
  dispatcher::log(state, &dispatcher::call_line(stop.name(), None));
  Decision::Terminate(Violation { syscall: stop.name(), path: None })
}
