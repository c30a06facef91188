//! Process-unique handles for caves and chunks.
//!
//! Back-references (shot → chunk, event → cave) store these ids instead of
//! pointers, so holding one never keeps the referenced object alive.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

// =============================================================================
// CaveId
// =============================================================================

static CAVE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Opaque cave identifier, unique within the process lifetime.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct CaveId(u64);

impl CaveId {
  pub fn new() -> Self {
    Self(CAVE_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
  }

  pub fn raw(&self) -> u64 {
    self.0
  }
}

impl Default for CaveId {
  fn default() -> Self {
    Self::new()
  }
}

impl fmt::Display for CaveId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "cave#{}", self.0)
  }
}

// =============================================================================
// ChunkId
// =============================================================================

static CHUNK_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Opaque chunk identifier. Copy-on-write clones of a chunk keep its id.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ChunkId(u64);

impl ChunkId {
  pub fn new() -> Self {
    Self(CHUNK_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
  }

  pub fn raw(&self) -> u64 {
    self.0
  }
}

impl Default for ChunkId {
  fn default() -> Self {
    Self::new()
  }
}
