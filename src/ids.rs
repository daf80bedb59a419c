//! Identifier allocation for newly created document elements.
//!
//! Every document owns one [`IdAllocator`]. Counters are kept per element kind, start
//! at zero and only ever grow, so an id handed out once is never handed out again. When a
//! document is read back from an archive, [`IdAllocator::observe`] advances the counters
//! past every id already present.

use std::collections::HashMap;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Kinds of markup elements that receive a `(short id, meta id)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Species,
    /// Species of a kinetic model (`S0`, `S1`, ...)
    ModelSpecies,
    Compartment,
    Unit,
    Reaction,
}

impl ElementKind {
    pub const ALL: [ElementKind; 5] = [
        ElementKind::Species,
        ElementKind::ModelSpecies,
        ElementKind::Compartment,
        ElementKind::Unit,
        ElementKind::Reaction,
    ];

    /// Prefix of the short id.
    pub fn prefix(&self) -> &'static str {
        match self {
            ElementKind::Species => "s",
            ElementKind::ModelSpecies => "S",
            ElementKind::Compartment => "c",
            ElementKind::Unit => "u",
            ElementKind::Reaction => "r",
        }
    }

    /// Prefix of the meta id, completed by the counter value.
    pub fn meta_prefix(&self) -> &'static str {
        match self {
            ElementKind::Species | ElementKind::ModelSpecies => "META_SPECIES_",
            ElementKind::Compartment => "META_COMPARTMENT_",
            ElementKind::Unit => "META_UNIT_",
            ElementKind::Reaction => "META_REACTION_",
        }
    }
}

/// The two identifiers allocated for every created element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementId {
    /// Used for cross-references between elements, e.g. `s0`
    pub short_id: String,
    /// Used to attach annotations and cross-references, e.g. `META_SPECIES_0`
    pub meta_id: String,
}

impl ElementId {
    pub fn new(short_id: impl Into<String>, meta_id: impl Into<String>) -> Self {
        Self {
            short_id: short_id.into(),
            meta_id: meta_id.into(),
        }
    }

    /// Returns true if `id` is either the short id or the meta id.
    pub fn matches(&self, id: &str) -> bool {
        self.short_id == id || self.meta_id == id
    }
}

impl Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.short_id)
    }
}

/// A monotonically increasing sequence of ids sharing one prefix (`format0`, `file3`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdSequence {
    prefix: &'static str,
    next: usize,
}

impl IdSequence {
    pub fn new(prefix: &'static str) -> Self {
        Self { prefix, next: 0 }
    }

    pub fn prefix(&self) -> &'static str {
        self.prefix
    }

    /// The value the next allocation will use.
    pub fn peek(&self) -> usize {
        self.next
    }

    pub fn allocate(&mut self) -> String {
        let id = format!("{}{}", self.prefix, self.next);
        self.next += 1;
        id
    }

    /// Advances the sequence past `id` if it carries this prefix and a numeric suffix.
    pub fn observe(&mut self, id: &str) {
        if let Some(n) = numeric_suffix(id, self.prefix) {
            self.next = self.next.max(n + 1);
        }
    }
}

/// Per-document, per-kind counters for markup elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdAllocator {
    counters: HashMap<ElementKind, usize>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The pair the next call to [`IdAllocator::next_id`] would return, without
    /// consuming it.
    pub fn peek(&self, kind: ElementKind) -> ElementId {
        let n = self.counters.get(&kind).copied().unwrap_or(0);
        ElementId::new(
            format!("{}{n}", kind.prefix()),
            format!("{}{n}", kind.meta_prefix()),
        )
    }

    /// Allocates the next pair for `kind`.
    pub fn next_id(&mut self, kind: ElementKind) -> ElementId {
        let id = self.peek(kind);
        *self.counters.entry(kind).or_insert(0) += 1;
        log::debug!("Allocated {} / {}", id.short_id, id.meta_id);
        id
    }

    /// Re-seeds the counter of `kind` from an existing short id.
    pub fn observe(&mut self, kind: ElementKind, short_id: &str) {
        if let Some(n) = numeric_suffix(short_id, kind.prefix()) {
            let counter = self.counters.entry(kind).or_insert(0);
            *counter = (*counter).max(n + 1);
        }
    }

    /// Re-seeds from an id of unknown kind by matching it against every prefix.
    pub fn observe_any(&mut self, short_id: &str) {
        for kind in ElementKind::ALL {
            self.observe(kind, short_id);
        }
    }
}

fn numeric_suffix(id: &str, prefix: &str) -> Option<usize> {
    let digits = id.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
