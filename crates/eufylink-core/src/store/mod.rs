// ── Two-tier state store ──
//
// Live snapshot (replaced on listen, patched by live events) plus a
// per-device property cache (patched by cached events).

mod snapshot;
mod state_store;

pub use snapshot::{Entity, LiveSnapshot, MergedState, PropertyCache};
pub use state_store::StateStore;
