//! Binary snapshot format (version 1).
//!
//! ## File layout
//! ```text
//! Magic "IYFR" (4 bytes) + version (u8)
//! Flags: frame_data_missing (u8), any_records (u8), with_cookie (u8)
//! threadCount: u64, then threadCount strings
//! frameCount: u64, then frameCount x (number: u64, start: i64, end: i64)
//! tagCount: u64, then tagCount x (id: u32, name, r: u8, g: u8, b: u8, a: u8)
//! scopeCount: u64, then scopeCount x (key: u32, tag: u32, name, function, file, line: u32)
//! per thread, in slot order:
//!     eventCount: u64, then eventCount x
//!         (key: u32, depth: i32, start: i64, end: i64 [, cookie: u64 if with_cookie])
//! ```
//!
//! All integers are little-endian. Strings are a `u16` length prefix
//! followed by raw UTF-8 bytes, no terminator. Timestamps stay in
//! nanoseconds; no precision is shed at the wire boundary.
//!
//! A reader built without the `cookie` feature skips cookies found in a
//! file; a reader built with it zero-fills cookies a file does not carry.

use super::events::{Frame, ScopeEvent, TimeSpan};
use super::results::ProfileSnapshot;
use super::scope::{ScopeKey, ScopeRecord, TagInfo};
use crate::error::Error;
use crate::settings::{Tag, TagColor};
use std::collections::HashMap;
use std::io::{Read, Write};

pub const MAGIC: &[u8; 4] = b"IYFR";
pub const VERSION: u8 = 1;

fn write_u64(w: &mut impl Write, value: u64) -> std::io::Result<()> {
    w.write_all(&value.to_le_bytes())
}

fn write_u32(w: &mut impl Write, value: u32) -> std::io::Result<()> {
    w.write_all(&value.to_le_bytes())
}

fn write_i64(w: &mut impl Write, value: i64) -> std::io::Result<()> {
    w.write_all(&value.to_le_bytes())
}

fn write_i32(w: &mut impl Write, value: i32) -> std::io::Result<()> {
    w.write_all(&value.to_le_bytes())
}

fn write_string(w: &mut impl Write, value: &str) -> std::io::Result<()> {
    // The length prefix is u16; longer strings are truncated so the
    // header always matches the bytes actually written.
    let bytes = &value.as_bytes()[..value.len().min(u16::MAX as usize)];
    w.write_all(&(bytes.len() as u16).to_le_bytes())?;
    w.write_all(bytes)
}

fn read_u64(r: &mut impl Read) -> std::io::Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_u32(r: &mut impl Read) -> std::io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_i64(r: &mut impl Read) -> std::io::Result<i64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(i64::from_le_bytes(buf))
}

fn read_i32(r: &mut impl Read) -> std::io::Result<i32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_u8(r: &mut impl Read) -> std::io::Result<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_string(r: &mut impl Read) -> Result<String, Error> {
    let mut len = [0u8; 2];
    r.read_exact(&mut len)?;
    let mut bytes = vec![0u8; u16::from_le_bytes(len) as usize];
    r.read_exact(&mut bytes)?;
    String::from_utf8(bytes).map_err(|_| Error::Format("string is not valid UTF-8".into()))
}

/// Encode a snapshot. The writer is typically a buffered file, but any
/// sink works (tests use an in-memory cursor).
pub fn write_snapshot(w: &mut impl Write, snapshot: &ProfileSnapshot) -> Result<(), Error> {
    debug_assert_eq!(snapshot.thread_names.len(), snapshot.events.len());

    w.write_all(MAGIC)?;
    w.write_all(&[VERSION])?;
    w.write_all(&[
        snapshot.frame_data_missing as u8,
        snapshot.any_records as u8,
        snapshot.with_cookie as u8,
    ])?;

    write_u64(w, snapshot.thread_names.len() as u64)?;
    for name in &snapshot.thread_names {
        write_string(w, name)?;
    }

    write_u64(w, snapshot.frames.len() as u64)?;
    for frame in &snapshot.frames {
        write_u64(w, frame.number)?;
        write_i64(w, frame.span.start_ns)?;
        write_i64(w, frame.span.end_ns)?;
    }

    write_u64(w, snapshot.tags.len() as u64)?;
    for (id, info) in &snapshot.tags {
        write_u32(w, *id)?;
        write_string(w, &info.name)?;
        w.write_all(&[info.color.r, info.color.g, info.color.b, info.color.a])?;
    }

    write_u64(w, snapshot.scopes.len() as u64)?;
    for record in snapshot.scopes.values() {
        write_u32(w, record.key.value())?;
        write_u32(w, record.tag.id())?;
        write_string(w, &record.name)?;
        write_string(w, &record.function)?;
        write_string(w, &record.file)?;
        write_u32(w, record.line)?;
    }

    for events in &snapshot.events {
        write_u64(w, events.len() as u64)?;
        for event in events {
            write_u32(w, event.key.value())?;
            write_i32(w, event.depth)?;
            write_i64(w, event.span.start_ns)?;
            write_i64(w, event.span.end_ns)?;
            if snapshot.with_cookie {
                #[cfg(feature = "cookie")]
                write_u64(w, event.cookie)?;
                #[cfg(not(feature = "cookie"))]
                write_u64(w, 0)?;
            }
        }
    }

    Ok(())
}

/// Decode a snapshot written by [`write_snapshot`].
pub fn read_snapshot(r: &mut impl Read) -> Result<ProfileSnapshot, Error> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(Error::Format("bad magic bytes".into()));
    }
    let version = read_u8(r)?;
    if version != VERSION {
        return Err(Error::Format(format!("unsupported version {version}")));
    }

    let frame_data_missing = read_u8(r)? != 0;
    let any_records = read_u8(r)? != 0;
    let file_has_cookie = read_u8(r)? != 0;

    let thread_count = read_u64(r)? as usize;
    let mut thread_names = Vec::with_capacity(thread_count);
    for _ in 0..thread_count {
        thread_names.push(read_string(r)?);
    }

    let frame_count = read_u64(r)? as usize;
    let mut frames = Vec::with_capacity(frame_count);
    for _ in 0..frame_count {
        let number = read_u64(r)?;
        let start_ns = read_i64(r)?;
        let end_ns = read_i64(r)?;
        frames.push(Frame {
            number,
            span: TimeSpan::new(start_ns, end_ns),
        });
    }

    let tag_count = read_u64(r)? as usize;
    let mut tags = HashMap::with_capacity(tag_count);
    for _ in 0..tag_count {
        let id = read_u32(r)?;
        let name = read_string(r)?;
        let mut rgba = [0u8; 4];
        r.read_exact(&mut rgba)?;
        tags.insert(
            id,
            TagInfo {
                name,
                color: TagColor::new(rgba[0], rgba[1], rgba[2], rgba[3]),
            },
        );
    }

    let scope_count = read_u64(r)? as usize;
    let mut scopes = HashMap::with_capacity(scope_count);
    for _ in 0..scope_count {
        let key = ScopeKey::from_raw(read_u32(r)?);
        let tag = Tag(read_u32(r)?);
        let name = read_string(r)?;
        let function = read_string(r)?;
        let file = read_string(r)?;
        let line = read_u32(r)?;
        scopes.insert(
            key,
            ScopeRecord {
                key,
                tag,
                name,
                function,
                file,
                line,
            },
        );
    }

    let mut events = Vec::with_capacity(thread_count);
    for _ in 0..thread_count {
        let event_count = read_u64(r)? as usize;
        let mut thread_events = Vec::with_capacity(event_count);
        for _ in 0..event_count {
            let key = ScopeKey::from_raw(read_u32(r)?);
            let depth = read_i32(r)?;
            let start_ns = read_i64(r)?;
            let end_ns = read_i64(r)?;
            let cookie = if file_has_cookie { read_u64(r)? } else { 0 };
            #[cfg(not(feature = "cookie"))]
            let _ = cookie;
            thread_events.push(ScopeEvent {
                key,
                depth,
                span: TimeSpan::new(start_ns, end_ns),
                #[cfg(feature = "cookie")]
                cookie,
            });
        }
        events.push(thread_events);
    }

    Ok(ProfileSnapshot::from_parts(
        frames,
        scopes,
        tags,
        events,
        thread_names,
        frame_data_missing,
        any_records,
        cfg!(feature = "cookie") && file_has_cookie,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiler::results::tests::sample_snapshot;
    use std::io::Cursor;

    fn roundtrip(snapshot: &ProfileSnapshot) -> ProfileSnapshot {
        let mut buf = Vec::new();
        write_snapshot(&mut buf, snapshot).unwrap();
        read_snapshot(&mut Cursor::new(buf)).unwrap()
    }

    #[test]
    fn header_layout_is_stable() {
        let snapshot = sample_snapshot();
        let mut buf = Vec::new();
        write_snapshot(&mut buf, &snapshot).unwrap();
        assert_eq!(&buf[0..4], b"IYFR");
        assert_eq!(buf[4], VERSION);
        assert_eq!(buf[5], 0); // frame_data_missing
        assert_eq!(buf[6], 1); // any_records
        assert_eq!(buf[7], cfg!(feature = "cookie") as u8);
        // threadCount immediately follows the flags.
        assert_eq!(buf[8..16], 1u64.to_le_bytes());
    }

    #[test]
    fn snapshot_roundtrips_structurally() {
        let snapshot = sample_snapshot();
        assert_eq!(roundtrip(&snapshot), snapshot);
    }

    #[test]
    fn empty_snapshot_roundtrips() {
        let snapshot = ProfileSnapshot::from_parts(
            vec![Frame {
                number: 0,
                span: TimeSpan::new(0, 1),
            }],
            HashMap::new(),
            HashMap::new(),
            Vec::new(),
            Vec::new(),
            true,
            false,
            false,
        );
        assert_eq!(roundtrip(&snapshot), snapshot);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let snapshot = sample_snapshot();
        let mut buf = Vec::new();
        write_snapshot(&mut buf, &snapshot).unwrap();
        buf[0] = b'X';
        let err = read_snapshot(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let snapshot = sample_snapshot();
        let mut buf = Vec::new();
        write_snapshot(&mut buf, &snapshot).unwrap();
        buf[4] = 99;
        let err = read_snapshot(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn truncated_input_is_an_io_error() {
        let snapshot = sample_snapshot();
        let mut buf = Vec::new();
        write_snapshot(&mut buf, &snapshot).unwrap();
        buf.truncate(buf.len() - 3);
        let err = read_snapshot(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn overlong_string_truncates_without_desyncing_the_stream() {
        let mut snapshot = sample_snapshot();
        snapshot.thread_names[0] = "x".repeat(u16::MAX as usize + 500);
        let mut buf = Vec::new();
        write_snapshot(&mut buf, &snapshot).unwrap();
        let decoded = read_snapshot(&mut Cursor::new(buf)).unwrap();
        // The name lost its tail, but every field after it still parses.
        assert_eq!(decoded.thread_name(0).len(), u16::MAX as usize);
        assert_eq!(decoded.frames(), snapshot.frames());
        assert_eq!(decoded.events(0), snapshot.events(0));
        assert_eq!(decoded.scopes(), snapshot.scopes());
    }

    #[test]
    fn cookie_flag_mismatch_is_tolerated() {
        // Hand-assemble a file claiming the opposite cookie setting from
        // this build and check it still parses.
        let mut snapshot = sample_snapshot();
        snapshot.with_cookie = false;
        let mut buf = Vec::new();
        write_snapshot(&mut buf, &snapshot).unwrap();
        let decoded = read_snapshot(&mut Cursor::new(buf)).unwrap();
        assert!(!decoded.carries_cookies());
        assert_eq!(decoded.events(0).len(), snapshot.events(0).len());
    }
}
