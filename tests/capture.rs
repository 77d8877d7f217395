use pwnbox::capture::{decode_records, read_std_capture, CaptureKey, CaptureWriter, Record, StreamTag, MAX_RECORD_LEN};

#[test]
fn append_reopens_and_accumulates() {
  let dir = tempfile::tempdir().unwrap();
  let writer = CaptureWriter::new(dir.path(), "run");
  assert_eq!(writer.append(CaptureKey::Fd(1), b"hi").unwrap(), 6);
  assert_eq!(writer.append(CaptureKey::Fd(0), b"").unwrap(), 4);
  assert_eq!(writer.append(CaptureKey::Fd(7), b"raw").unwrap(), 3);
  writer.log_line(b"open()\n").unwrap();
  writer.log_line(b"read()\n").unwrap();

  assert_eq!(std::fs::read(dir.path().join("run-std")).unwrap(), b"\x01\x00\x00\x02hi\x00\x00\x00\x00");
  assert_eq!(std::fs::read(dir.path().join("run-7")).unwrap(), b"raw");
  assert_eq!(std::fs::read_to_string(dir.path().join("run-syscall")).unwrap(), "open()\nread()\n");
}

#[test]
fn oversized_std_payload_is_truncated() {
  let dir = tempfile::tempdir().unwrap();
  let writer = CaptureWriter::new(dir.path(), "big");
  let payload = vec![0x5a; MAX_RECORD_LEN + 10];
  writer.append(CaptureKey::Fd(1), &payload).unwrap();

  let records = read_std_capture(&writer.std_path()).unwrap();
  assert_eq!(records.len(), 1);
  assert_eq!(records[0].payload.len(), MAX_RECORD_LEN);
}

#[test]
fn missing_directory_is_an_error() {
  let dir = tempfile::tempdir().unwrap();
  let writer = CaptureWriter::new(dir.path().join("nope"), "x");
  assert!(writer.append(CaptureKey::Fd(1), b"hi").is_err());
}

#[test]
fn decode_concatenated_records() {
  let bytes = b"\x00\x00\x00\x03abc\x01\x00\x00\x01d\x01\x00\x00\x00";
  assert_eq!(decode_records(bytes).unwrap(), vec![
    Record { tag: StreamTag::In, payload: b"abc".to_vec() },
    Record { tag: StreamTag::Out, payload: b"d".to_vec() },
    Record { tag: StreamTag::Out, payload: Vec::new() },
  ]);
}
