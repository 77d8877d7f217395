//! Append-only capture files.
//!
//! Data seen on descriptors 0 and 1 goes to `<dir>/<prefix>-std` as framed
//! records:
//!
//! ```text
//! record := tag (1 byte, 0x00 in / 0x01 out) || length (3 bytes, big-endian) || payload
//! ```
//!
//! Every other key gets its own `<dir>/<prefix>-<key>` file holding raw bytes.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

/// Largest payload a 3-byte length can describe.
pub const MAX_RECORD_LEN: usize = 0xff_ffff;
/// Key of the per-session text log of syscall names.
pub const SYSCALL_LOG: &str = "syscall";
const STD_SUFFIX: &str = "std";
const HEADER_LEN: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamTag {
  In = 0,
  Out = 1
}

impl StreamTag {
  pub fn from_byte(byte: u8) -> Option<StreamTag> {
    match byte {
      0 => Some(StreamTag::In),
      1 => Some(StreamTag::Out),
      _ => None
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureKey<'a> {
  Fd(u32),
  Name(&'a str)
}

impl CaptureKey<'_> {
  pub fn stream_tag(&self) -> Option<StreamTag> {
    match self {
      CaptureKey::Fd(0) => Some(StreamTag::In),
      CaptureKey::Fd(1) => Some(StreamTag::Out),
      _ => None
    }
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
  pub tag: StreamTag,
  pub payload: Vec<u8>
}

pub fn encode_record(tag: StreamTag, payload: &[u8]) -> Result<Vec<u8>> {
  if payload.len() > MAX_RECORD_LEN {
    return Err(Error::RecordTooLarge(payload.len()));
  }
  let len = (payload.len() as u32).to_be_bytes();
  let mut record = Vec::with_capacity(HEADER_LEN + payload.len());
  record.push(tag as u8);
  record.extend_from_slice(&len[1..]);
  record.extend_from_slice(payload);
  Ok(record)
}

pub fn decode_records(bytes: &[u8]) -> Result<Vec<Record>> {
  let mut records = Vec::new();
  let mut offset = 0;
  while offset < bytes.len() {
    let header = bytes.get(offset..offset + HEADER_LEN).ok_or(Error::TruncatedRecord(offset))?;
    let tag = StreamTag::from_byte(header[0]).ok_or(Error::InvalidTag { tag: header[0], offset })?;
    let len = u32::from_be_bytes([0, header[1], header[2], header[3]]) as usize;
    let start = offset + HEADER_LEN;
    let payload = bytes.get(start..start + len).ok_or(Error::TruncatedRecord(offset))?;
    records.push(Record { tag, payload: payload.to_vec() });
    offset = start + len;
  }
  Ok(records)
}

pub fn read_std_capture(path: &Path) -> Result<Vec<Record>> {
  decode_records(&fs::read(path)?)
}

/// Writes capture data under `<dir>/<prefix>-*`. Files are opened, appended
/// to and closed on every call.
#[derive(Clone, Debug)]
pub struct CaptureWriter {
  dir: PathBuf,
  prefix: String
}

impl CaptureWriter {
  pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> CaptureWriter {
    CaptureWriter { dir: dir.into(), prefix: prefix.into() }
  }

  pub fn path_for(&self, key: CaptureKey) -> PathBuf {
    let suffix = match key {
      _ if key.stream_tag().is_some() => STD_SUFFIX.to_string(),
      CaptureKey::Fd(fd) => (fd as i32).to_string(),
      CaptureKey::Name(name) => name.to_string()
    };
    self.dir.join(format!("{}-{}", self.prefix, suffix))
  }

  pub fn std_path(&self) -> PathBuf {
    self.path_for(CaptureKey::Fd(0))
  }

  /// Appends `payload` under `key` and returns the number of bytes written,
  /// framing included. Framed payloads are cut to [`MAX_RECORD_LEN`].
  pub fn append(&self, key: CaptureKey, payload: &[u8]) -> Result<usize> {
    let data = match key.stream_tag() {
      Some(tag) => {
        if payload.len() > MAX_RECORD_LEN {
          debug!(len = payload.len(), "truncating capture record");
        }
        encode_record(tag, &payload[..payload.len().min(MAX_RECORD_LEN)])?
      }
      None => payload.to_vec()
    };
    let mut file = OpenOptions::new()
      .create(true)
      .append(true)
      .mode(0o666)
      .open(self.path_for(key))?;
    file.write_all(&data)?;
    Ok(data.len())
  }

  pub fn log_line(&self, line: &[u8]) -> Result<usize> {
    self.append(CaptureKey::Name(SYSCALL_LOG), line)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn record_header_is_tag_then_big_endian_length() {
    assert_eq!(encode_record(StreamTag::Out, b"hi").unwrap(), [0x01, 0x00, 0x00, 0x02, b'h', b'i']);
    let big = vec![0u8; 0x01_0203];
    assert_eq!(&encode_record(StreamTag::In, &big).unwrap()[..4], &[0x00, 0x01, 0x02, 0x03]);
  }

  #[test]
  fn oversized_record_is_rejected() {
    let payload = vec![0u8; MAX_RECORD_LEN + 1];
    assert!(matches!(encode_record(StreamTag::In, &payload), Err(Error::RecordTooLarge(_))));
    assert!(encode_record(StreamTag::In, &payload[..MAX_RECORD_LEN]).is_ok());
  }

  #[test]
  fn decoder_rejects_damaged_input() {
    assert!(matches!(decode_records(&[0x01, 0x00, 0x00]), Err(Error::TruncatedRecord(0))));
    assert!(matches!(decode_records(&[0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x05, b'a']), Err(Error::TruncatedRecord(4))));
    assert!(matches!(decode_records(&[0x07, 0x00, 0x00, 0x00]), Err(Error::InvalidTag { tag: 7, offset: 0 })));
    assert!(decode_records(&[]).unwrap().is_empty());
  }

  #[test]
  fn paths_follow_key() {
    let writer = CaptureWriter::new("/tmp/.pwn-sandbox", "timestamp");
    assert_eq!(writer.path_for(CaptureKey::Fd(0)), Path::new("/tmp/.pwn-sandbox/timestamp-std"));
    assert_eq!(writer.path_for(CaptureKey::Fd(1)), Path::new("/tmp/.pwn-sandbox/timestamp-std"));
    assert_eq!(writer.path_for(CaptureKey::Fd(2)), Path::new("/tmp/.pwn-sandbox/timestamp-2"));
    assert_eq!(writer.path_for(CaptureKey::Fd(u32::MAX)), Path::new("/tmp/.pwn-sandbox/timestamp--1"));
    assert_eq!(writer.path_for(CaptureKey::Name(SYSCALL_LOG)), Path::new("/tmp/.pwn-sandbox/timestamp-syscall"));
  }
}
