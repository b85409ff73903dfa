//! The identifier symbol table.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

/// Characters outside the identifier alphabet.
static ILLEGAL_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_]+").expect("valid identifier regex"));

/// Runs of underscores.
static UNDERSCORE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_{2,}").expect("valid underscore regex"));

/// Kind of object an identifier names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Catalog,
    Connection,
    Model,
    Dataset,
    Metric,
    MetricCalc,
    Dimension,
    Hierarchy,
    LevelAttribute,
    SecondaryAttribute,
    Relationship,
    Perspective,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Catalog => "catalog",
            ObjectKind::Connection => "connection",
            ObjectKind::Model => "model",
            ObjectKind::Dataset => "dataset",
            ObjectKind::Metric => "metric",
            ObjectKind::MetricCalc => "metric calc",
            ObjectKind::Dimension => "dimension",
            ObjectKind::Hierarchy => "hierarchy",
            ObjectKind::LevelAttribute => "level attribute",
            ObjectKind::SecondaryAttribute => "secondary attribute",
            ObjectKind::Relationship => "relationship",
            ObjectKind::Perspective => "perspective",
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request for a new identifier.
#[derive(Debug, Clone)]
pub struct NameRequest<'a> {
    /// Preferred identifier, usually the source object's name.
    pub candidate: &'a str,
    /// Fully qualified key of the source object (see [`key`](super::key)).
    pub verbose_key: &'a str,
    pub kind: ObjectKind,
    /// Name of the owning table, used to qualify colliding names.
    pub owner: &'a str,
    /// Suffix tried first when a long name has to be truncated.
    pub preferred_suffix: Option<&'a str>,
}

impl<'a> NameRequest<'a> {
    pub fn new(candidate: &'a str, verbose_key: &'a str, kind: ObjectKind, owner: &'a str) -> Self {
        Self {
            candidate,
            verbose_key,
            kind,
            owner,
            preferred_suffix: None,
        }
    }

    pub fn with_suffix(mut self, suffix: &'a str) -> Self {
        self.preferred_suffix = Some(suffix);
        self
    }
}

/// How the allocated identifier relates to the candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameResolution {
    /// The candidate was used unchanged, or the key was already registered.
    Unchanged,
    /// The candidate was sanitized, qualified, truncated or suffixed.
    Renamed,
    /// No free identifier was found; the unsafe candidate was returned.
    Exhausted,
}

/// Result of [`NameRegistry::allocate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub name: String,
    pub resolution: NameResolution,
}

/// Owner of a registered identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub kind: ObjectKind,
    pub owner: String,
    pub verbose_key: String,
}

/// Symbol table mapping identifiers to their owners and verbose keys to identifiers.
///
/// Identifiers are compared case-insensitively. Allocation is order dependent:
/// the first object to ask for a name gets it.
#[derive(Debug, Clone)]
pub struct NameRegistry {
    max_length: usize,
    max_suffix: u32,
    /// Lower-cased identifier → owner.
    names: HashMap<String, Registration>,
    /// Verbose key → identifier.
    verbose: HashMap<String, String>,
}

impl Default for NameRegistry {
    fn default() -> Self {
        Self::new(63, 999)
    }
}

impl NameRegistry {
    pub fn new(max_length: usize, max_suffix: u32) -> Self {
        Self {
            max_length,
            max_suffix,
            names: HashMap::new(),
            verbose: HashMap::new(),
        }
    }

    /// Identifier previously allocated for `verbose_key`. Never allocates.
    pub fn lookup(&self, verbose_key: &str) -> Option<&str> {
        self.verbose.get(verbose_key).map(String::as_str)
    }

    /// Owner of an identifier, compared case-insensitively.
    pub fn registration(&self, identifier: &str) -> Option<&Registration> {
        self.names.get(&identifier.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Allocate (or return the already allocated) identifier for a source object.
    pub fn allocate(&mut self, request: &NameRequest<'_>) -> Allocation {
        if let Some(existing) = self.verbose.get(request.verbose_key) {
            return Allocation {
                name: existing.clone(),
                resolution: NameResolution::Unchanged,
            };
        }

        let sanitized = sanitize(request.candidate);
        let clean = sanitized == request.candidate;

        if clean {
            if self.fits(&sanitized) && self.is_free(&sanitized) {
                return self.register(sanitized, request, NameResolution::Unchanged);
            }
            if !self.fits(&sanitized) {
                if let Some(name) = self.truncated(&sanitized, request.preferred_suffix) {
                    return self.register(name, request, NameResolution::Renamed);
                }
            }
        }

        // Sanitized or colliding: qualify with the owner, then fall back to numbering.
        let qualified = if request.owner.trim().is_empty() {
            sanitized.clone()
        } else {
            sanitize(&format!("{}_{}", sanitized, request.owner))
        };

        if self.fits(&qualified) {
            if self.is_free(&qualified) {
                return self.register(qualified, request, NameResolution::Renamed);
            }
        } else if let Some(name) = self.truncated(&qualified, request.preferred_suffix) {
            return self.register(name, request, NameResolution::Renamed);
        }

        if let Some(name) = self.numbered(&qualified) {
            return self.register(name, request, NameResolution::Renamed);
        }

        // Keep lookups stable even when nothing could be registered.
        self.verbose
            .insert(request.verbose_key.to_string(), request.candidate.to_string());
        Allocation {
            name: request.candidate.to_string(),
            resolution: NameResolution::Exhausted,
        }
    }

    fn fits(&self, name: &str) -> bool {
        name.chars().count() <= self.max_length
    }

    fn is_free(&self, name: &str) -> bool {
        !self.names.contains_key(&name.to_lowercase())
    }

    /// Truncate `base` to make room for the preferred suffix, else for a number.
    fn truncated(&self, base: &str, preferred_suffix: Option<&str>) -> Option<String> {
        if let Some(suffix) = preferred_suffix {
            let name = with_suffix(base, suffix, self.max_length);
            if self.fits(&name) && self.is_free(&name) {
                return Some(name);
            }
        }
        let plain = with_suffix(base, "", self.max_length);
        if self.is_free(&plain) {
            return Some(plain);
        }
        self.numbered(base)
    }

    fn numbered(&self, base: &str) -> Option<String> {
        (1..=self.max_suffix)
            .map(|n| with_suffix(base, &format!("_{}", n), self.max_length))
            .find(|name| self.is_free(name))
    }

    fn register(
        &mut self,
        name: String,
        request: &NameRequest<'_>,
        resolution: NameResolution,
    ) -> Allocation {
        self.names.insert(
            name.to_lowercase(),
            Registration {
                kind: request.kind,
                owner: request.owner.to_string(),
                verbose_key: request.verbose_key.to_string(),
            },
        );
        self.verbose
            .insert(request.verbose_key.to_string(), name.clone());
        Allocation { name, resolution }
    }
}

/// Replace characters outside `[A-Za-z0-9_]` with `_` and collapse repeats.
pub fn sanitize(name: &str) -> String {
    let replaced = ILLEGAL_CHARS.replace_all(name, "_");
    let collapsed = UNDERSCORE_RUNS.replace_all(&replaced, "_");
    let trimmed = collapsed.trim_matches('_');
    if trimmed.is_empty() {
        "unnamed".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Truncate `base` so that `base + suffix` fits in `max_length` characters.
fn with_suffix(base: &str, suffix: &str, max_length: usize) -> String {
    let room = max_length.saturating_sub(suffix.chars().count());
    let mut name: String = base.chars().take(room).collect();
    name.push_str(suffix);
    name
}
