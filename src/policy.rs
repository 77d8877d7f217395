use std::fmt;

/// What the monitor does about one syscall entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
  Allow,
  LogOnly,
  Terminate(Violation)
}

/// A syscall the tracee is not allowed to make.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
  pub syscall: &'static str,
  pub path: Option<Vec<u8>>
}

impl fmt::Display for Violation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.path {
      Some(path) => write!(f, "{}({})", self.syscall, String::from_utf8_lossy(path)),
      None => write!(f, "{}()", self.syscall)
    }
  }
}

/// Path rules for open-like syscalls. A path must contain one of `allowed`
/// and none of `denied`; matching is byte-wise and unanchored.
#[derive(Clone, Debug)]
pub struct OpenPolicy {
  pub allowed: Vec<Vec<u8>>,
  pub denied: Vec<Vec<u8>>
}

impl Default for OpenPolicy {
  fn default() -> Self {
    OpenPolicy {
      allowed: ["/lib", "/etc", "/usr", "/dev/urandom"].iter().map(|s| s.as_bytes().to_vec()).collect(),
      denied: ["flag", "/tmp"].iter().map(|s| s.as_bytes().to_vec()).collect()
    }
  }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
  needle.is_empty() || haystack.windows(needle.len()).any(|window| window == needle)
}

impl OpenPolicy {
  pub fn permits(&self, path: &[u8]) -> bool {
    self.allowed.iter().any(|fragment| contains(path, fragment))
      && !self.denied.iter().any(|fragment| contains(path, fragment))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn whitelisted_paths_are_allowed() {
    let policy = OpenPolicy::default();
    assert!(policy.permits(b"/etc/passwd"));
    assert!(policy.permits(b"/lib/x86_64-linux-gnu/libc.so.6"));
    assert!(policy.permits(b"/dev/urandom"));
    assert!(policy.permits(b"./usr/share"));
  }

  #[test]
  fn overrides_beat_the_whitelist() {
    let policy = OpenPolicy::default();
    assert!(!policy.permits(b"/usr/lib/flag.so"));
    assert!(!policy.permits(b"/tmp/payload"));
    assert!(!policy.permits(b"/tmp/../etc/passwd"));
  }

  #[test]
  fn everything_else_is_denied() {
    let policy = OpenPolicy::default();
    assert!(!policy.permits(b"/home/user/data"));
    assert!(!policy.permits(b""));
    assert!(!policy.permits(b"/ETC/passwd"));
    assert!(!policy.permits(b"/dev/random"));
  }

  #[test]
  fn violation_names_the_call() {
    let open = Violation { syscall: "open", path: Some(b"/home/user/data".to_vec()) };
    assert_eq!(open.to_string(), "open(/home/user/data)");
    assert_eq!(Violation { syscall: "fork", path: None }.to_string(), "fork()");
  }
}
