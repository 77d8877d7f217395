use tracing::{debug, warn};

use crate::capture::CaptureKey;
use crate::error::{Error, Result};
use crate::memory;
use crate::policy::Decision;
use crate::ptrace::Tracee;
use crate::regs::{extract_args, read_entry_registers, Abi, RegisterSnapshot};
use crate::state::State;
use crate::syscall_table::{Category, SyscallDescriptor, SyscallTable};
use crate::syscalls;

/// Everything captured at a syscall-entry stop that the matching exit stop
/// still needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyscallStop {
  pub abi: Abi,
  pub args: [u64; 6],
  pub descriptor: SyscallDescriptor
}

impl SyscallStop {
  pub fn from_snapshot(snapshot: &RegisterSnapshot) -> Result<SyscallStop> {
    let abi = snapshot.abi();
    let descriptor = SyscallTable::for_abi(abi).lookup(snapshot.syscall_number())?;
    Ok(SyscallStop { abi, args: extract_args(snapshot), descriptor })
  }

  pub fn capture(tracee: &dyn Tracee) -> Result<SyscallStop> {
    SyscallStop::from_snapshot(&read_entry_registers(tracee)?)
  }

  pub fn name(&self) -> &'static str {
    self.descriptor.name
  }
}

pub fn on_entry(state: &State, tracee: &dyn Tracee, stop: &SyscallStop) -> Decision {
  debug!(pid = %tracee.pid(), abi = %stop.abi, syscall = stop.name(), args = ?stop.args, "enter");
  let decision = match stop.descriptor.category {
    Category::WriteLike => syscalls::write::handler(state, tracee, stop),
    Category::ReadLike => Decision::LogOnly,
    Category::Execve { path_arg } => syscalls::execve::handler(state, tracee, stop, path_arg),
    Category::Fork | Category::Clone => syscalls::fork::handler(state, stop),
    Category::Open { path_arg } => syscalls::open::handler(state, tracee, stop, path_arg),
    Category::Other => Decision::Allow
  };
  if !matches!(decision, Decision::Terminate(_)) {
    log(state, &call_line(stop.name(), None));
  }
  decision
}

pub fn on_exit(state: &State, tracee: &dyn Tracee, stop: &SyscallStop, retval: i64) {
  debug!(pid = %tracee.pid(), syscall = stop.name(), retval, "exit");
  if stop.descriptor.category == Category::ReadLike {
    syscalls::read::post_handler(state, tracee, stop, retval);
  }
}

/// `name(arg)\n`, the line format of the syscall log.
pub(crate) fn call_line(name: &str, arg: Option<&[u8]>) -> Vec<u8> {
  let mut line = Vec::with_capacity(name.len() + arg.map_or(0, <[u8]>::len) + 3);
  line.extend_from_slice(name.as_bytes());
  line.push(b'(');
  line.extend_from_slice(arg.unwrap_or_default());
  line.extend_from_slice(b")\n");
  line
}

pub(crate) fn log(state: &State, line: &[u8]) {
  if let Err(err) = state.capture.log_line(line) {
    warn!(%err, "syscall log line dropped");
  }
}

pub(crate) fn capture(state: &State, key: CaptureKey, payload: &[u8]) {
  if let Err(err) = state.capture.append(key, payload) {
    warn!(%err, ?key, "capture dropped");
  }
}

/// A path argument as far as it could be read out of the tracee.
pub(crate) struct PathArg {
  pub bytes: Vec<u8>,
  /// False when the string was unreadable or ran past the path capacity.
  pub complete: bool
}

/// Reads the path argument. An unterminated path keeps the prefix that fits
/// the capacity; an unreadable one comes back empty.
pub(crate) fn read_path(state: &State, tracee: &dyn Tracee, stop: &SyscallStop, path_arg: usize) -> PathArg {
  let addr = stop.args[path_arg];
  match memory::read_c_string(tracee, stop.abi, addr, state.path_capacity) {
    Ok(bytes) => PathArg { bytes, complete: true },
    Err(Error::UnterminatedString { capacity, .. }) => {
      warn!(syscall = stop.name(), capacity, "path argument not terminated");
      let bytes = memory::read_buffer(tracee, stop.abi, addr, capacity.saturating_sub(1)).unwrap_or_default();
      PathArg { bytes, complete: false }
    }
    Err(err) => {
      warn!(%err, syscall = stop.name(), "path argument unreadable");
      PathArg { bytes: Vec::new(), complete: false }
    }
  }
}
