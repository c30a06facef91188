//! Survey hierarchy: Region → Cave → Trip → Chunk → Station/Shot.
//!
//! ```text
//! Region ── Arc<RwLock<Cave>> ── Arc<Trip> ── Arc<SurveyChunk> ──┬── Arc<Station>
//!                  │                                              └── Shot
//!                  └── name → Weak<Station>   (registry, non-owning)
//! ```
//!
//! The hierarchy is edited on the owning thread only. Background runs read a
//! [`RegionSnapshot`] or [`CaveSnapshot`] captured before the run, which
//! shares the copy-on-write trips and chunks instead of copying them.

pub mod cave;
pub mod chunk;
pub mod events;
pub mod ids;
pub mod positions;
pub mod region;
pub mod shot;
pub mod station;
pub mod trip;
pub mod types;

pub use cave::{Cave, CaveSnapshot};
pub use chunk::SurveyChunk;
pub use events::SurveyEvent;
pub use ids::{CaveId, ChunkId};
pub use positions::{StationKey, StationPositionLookup};
pub use region::{Region, RegionSnapshot, SharedCave};
pub use shot::Shot;
pub use station::{split_trailing_number, Station};
pub use trip::Trip;
pub use types::{DataRole, Direction, SurveyError};
