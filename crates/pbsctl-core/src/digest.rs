//! Opaque optimistic-concurrency digest.

use std::fmt;

/// An opaque version token echoed by digest-supporting endpoints and sent
/// back verbatim on Update/Delete. The core MUST NOT interpret its
/// contents — it is compared for equality only, never parsed.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Digest(String);

impl Digest {
    /// Wrap a server-supplied digest string.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrow the raw digest string, e.g. to echo it back in a request body.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Digests are opaque but not secret; show them for diagnostics.
        write!(f, "Digest({:?})", self.0)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
