use nix::sys::{signal::Signal, wait::{waitpid, WaitStatus}};
use tracing::{debug, error, info, warn};

use crate::dispatcher::{self, SyscallStop};
use crate::error::{Error, Result};
use crate::policy::Decision;
use crate::ptrace::{self, Options, Pid, PtraceTracee, Tracee};
use crate::regs::read_registers;
use crate::state::State;

/// Supervises `pid` until it exits. Returns its exit status, or `128 + n`
/// when it died from signal `n`. A policy violation kills the tracee and
/// comes back as [`Error::Violation`]; any other error also kills it.
pub fn run(state: &State, pid: Pid) -> Result<i32> {
  let tracee = PtraceTracee::new(pid);
  let result = trace(state, &tracee);
  if let Err(err) = &result {
    if !matches!(err, Error::Violation(_)) {
      error!(%pid, %err, "cannot supervise tracee, killing it");
      terminate(&tracee);
    }
  }
  result
}

fn trace(state: &State, tracee: &dyn Tracee) -> Result<i32> {
  let pid = tracee.pid();
  waitpid(pid, None)?;
  ptrace::setoptions(pid, Options::PTRACE_O_TRACESYSGOOD | Options::PTRACE_O_EXITKILL)?;

  let mut entry: Option<SyscallStop> = None;
  let mut signal = None;
  loop {
    ptrace::syscall(pid, signal.take())?;
    match waitpid(pid, None)? {
      WaitStatus::PtraceSyscall(_) => match entry.take() {
        None => {
          let stop = SyscallStop::capture(tracee)?;
          match dispatcher::on_entry(state, tracee, &stop) {
            Decision::Terminate(violation) => {
              error!(%pid, %violation, "policy violation, killing tracee");
              terminate(tracee);
              return Err(Error::Violation(violation));
            }
            Decision::Allow | Decision::LogOnly => entry = Some(stop)
          }
        }
        Some(stop) => {
          let retval = read_registers(tracee)?.return_value();
          dispatcher::on_exit(state, tracee, &stop, retval);
        }
      },
      WaitStatus::Exited(_, code) => {
        info!(%pid, code, "tracee exited");
        return Ok(code);
      }
      WaitStatus::Signaled(_, sig, _) => {
        info!(%pid, ?sig, "tracee killed by signal");
        return Ok(128 + sig as i32);
      }
      WaitStatus::Stopped(_, Signal::SIGTRAP) => {}
      WaitStatus::Stopped(_, sig) => signal = Some(sig),
      status => debug!(?status, "ignoring stop")
    }
  }
}

fn terminate(tracee: &dyn Tracee) {
  if let Err(err) = tracee.kill() {
    warn!(pid = %tracee.pid(), %err, "kill failed");
  }
  let _ = waitpid(tracee.pid(), None);
}
