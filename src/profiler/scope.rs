//! Scope identity and the interned metadata table.

use super::spinlock::{Spinlock, SpinlockGuard};
use crate::settings::{self, Tag, TagColor};
use serde::Serialize;
use std::collections::HashMap;

/// Identity of a profiled scope: a 32-bit hash of its call-site
/// identifier (canonically `"<file>:<line>"`).
///
/// Equality is by hash value, so two call sites whose identifiers collide
/// are treated as the same scope. With the default hash that is a
/// one-in-four-billion event per pair and accepted by design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ScopeKey(u32);

impl ScopeKey {
    /// Hash `identifier` with [`settings::scope_hash`].
    pub fn from_identifier(identifier: &str) -> Self {
        Self(settings::scope_hash(identifier))
    }

    /// Wrap an already-computed hash (snapshot decoding).
    pub fn from_raw(value: u32) -> Self {
        Self(value)
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

/// Metadata captured once per scope, immutable after interning.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopeRecord {
    pub key: ScopeKey,
    pub tag: Tag,
    /// The name the instrumentation site chose.
    pub name: String,
    /// Enclosing function path.
    pub function: String,
    pub file: String,
    pub line: u32,
}

/// A tag's display name and color, captured into snapshots so that a
/// recording stays renderable even when it is loaded by a build with a
/// different tag table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagInfo {
    pub name: String,
    pub color: TagColor,
}

impl TagInfo {
    pub(crate) fn for_tag(tag: Tag) -> Self {
        Self {
            name: settings::tag_name(tag).to_string(),
            color: settings::tag_color(tag),
        }
    }
}

/// The shared scope-metadata table.
///
/// Interning happens once per call site (the `profile_scope!` expansion
/// caches the returned key in a per-site `OnceLock`), so the spinlock
/// here is essentially uncontended after warm-up. Records are never
/// evicted; snapshot extraction clones the map so later extractions keep
/// resolving keys that call sites cached earlier.
pub struct ScopeTable {
    records: Spinlock<HashMap<ScopeKey, ScopeRecord>>,
}

impl ScopeTable {
    pub fn new() -> Self {
        Self {
            records: Spinlock::new(HashMap::new()),
        }
    }

    /// Intern a scope, returning its key. A key already present keeps its
    /// original record; the new metadata is ignored.
    pub fn intern(
        &self,
        name: &str,
        identifier: &str,
        function: &str,
        file: &str,
        line: u32,
        tag: Tag,
    ) -> ScopeKey {
        let key = ScopeKey::from_identifier(identifier);
        let mut records = self.records.lock();
        records.entry(key).or_insert_with(|| ScopeRecord {
            key,
            tag,
            name: name.to_string(),
            function: function.to_string(),
            file: file.to_string(),
            line,
        });
        key
    }

    /// Clone the table for snapshot extraction.
    pub(crate) fn snapshot(&self) -> HashMap<ScopeKey, ScopeRecord> {
        self.lock().clone()
    }

    /// Raw access for result extraction, which holds this together with
    /// the frame-ledger lock while swapping data out.
    pub(crate) fn lock(&self) -> SpinlockGuard<'_, HashMap<ScopeKey, ScopeRecord>> {
        self.records.lock()
    }
}

impl Default for ScopeTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let table = ScopeTable::new();
        let a = table.intern("update", "game.rs:10", "game::update", "game.rs", 10, Tag::NONE);
        let b = table.intern("update", "game.rs:10", "game::update", "game.rs", 10, Tag::NONE);
        assert_eq!(a, b);
        assert_eq!(table.snapshot().len(), 1);
    }

    #[test]
    fn first_sighting_wins() {
        let table = ScopeTable::new();
        let key = table.intern("first", "lib.rs:1", "f", "lib.rs", 1, Tag::NONE);
        table.intern("second", "lib.rs:1", "g", "lib.rs", 1, Tag::NONE);
        let records = table.snapshot();
        assert_eq!(records[&key].name, "first");
        assert_eq!(records[&key].function, "f");
    }

    #[test]
    fn distinct_identifiers_get_distinct_records() {
        let table = ScopeTable::new();
        let a = table.intern("a", "lib.rs:1", "f", "lib.rs", 1, Tag::NONE);
        let b = table.intern("b", "lib.rs:2", "f", "lib.rs", 2, Tag::NONE);
        assert_ne!(a, b);
        assert_eq!(table.snapshot().len(), 2);
    }
}
