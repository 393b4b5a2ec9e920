//! Build-time configuration.
//!
//! Everything here is deliberately a plain constant or a free function so
//! that embedding projects can adjust it by editing this file (or by
//! vendoring the crate), without the profiler growing a runtime
//! configuration surface that instrumented hot paths would have to
//! consult.

use serde::Serialize;
use std::hash::{Hash, Hasher};

/// Capacity of the thread identity table. Threads beyond this many never
/// get a dense id and their events are dropped. Must be >= 1.
pub const MAX_THREADS: usize = 16;

/// Unit suffix used by the text renderer.
pub const TEXT_DURATION_NAME: &str = "ms";

/// Convert a nanosecond count to the text renderer's unit.
pub fn text_duration(ns: i64) -> f64 {
    ns as f64 / 1_000_000.0
}

/// Hash a call-site identifier (canonically `"<file>:<line>"`) to the 32
/// bits a [`ScopeKey`](crate::profiler::ScopeKey) wraps.
///
/// The default is the standard library hasher truncated to 32 bits.
/// Collisions are treated as identity by the scope table, so a custom
/// hash must keep the same signature.
pub fn scope_hash(identifier: &str) -> u32 {
    let mut hasher = std::hash::DefaultHasher::new();
    identifier.hash(&mut hasher);
    hasher.finish() as u32
}

/// An enumerable label attached to a scope at instrumentation time.
///
/// Tag 0 is reserved for untagged scopes. The profiler never interprets
/// tag semantics; it only carries the id plus the name/color pair below
/// into snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Tag(pub u32);

impl Tag {
    /// The reserved "untagged" tag.
    pub const NONE: Tag = Tag(0);

    pub const fn id(self) -> u32 {
        self.0
    }
}

/// RGBA color assigned to a tag, each channel in `[0, 255]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TagColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl TagColor {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

// ---- custom tags start ----
// Add project tags here, e.g.:
//   pub const RENDER: Tag = Tag(1);
//   pub const AUDIO: Tag = Tag(2);
// then bump TAG_COUNT and extend tag_name/tag_color below. Ids must stay
// sequential starting at 0.
// ---- custom tags end ----

/// Total number of defined tags, including [`Tag::NONE`].
pub const TAG_COUNT: u32 = 1;

/// Human-readable name for a tag.
pub fn tag_name(tag: Tag) -> &'static str {
    match tag.id() {
        0 => "Untagged",
        _ => "ERROR-INVALID-TAG",
    }
}

/// Color assigned to a tag.
pub fn tag_color(tag: Tag) -> TagColor {
    match tag.id() {
        0 => TagColor::new(255, 255, 255, 255),
        _ => TagColor::new(0, 0, 0, 255),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_for_equal_identifiers() {
        assert_eq!(scope_hash("src/lib.rs:10"), scope_hash("src/lib.rs:10"));
        assert_ne!(scope_hash("src/lib.rs:10"), scope_hash("src/lib.rs:11"));
    }

    #[test]
    fn every_declared_tag_resolves() {
        for id in 0..TAG_COUNT {
            let tag = Tag(id);
            assert_ne!(tag_name(tag), "ERROR-INVALID-TAG");
        }
        assert_eq!(tag_name(Tag::NONE), "Untagged");
        assert_eq!(tag_color(Tag::NONE), TagColor::new(255, 255, 255, 255));
    }

    #[test]
    fn text_duration_is_milliseconds_by_default() {
        assert_eq!(text_duration(5_000_000), 5.0);
        assert_eq!(TEXT_DURATION_NAME, "ms");
    }
}
