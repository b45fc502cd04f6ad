//! Core primitives for conflux-rs: the local-document merge engine of a
//! replicated, conflict-free document model.
//!
//! A stream of patches describing concurrent remote operations is applied to
//! an in-memory document of nested maps, ordered lists, and counters. Every
//! container keeps the full set of concurrently written candidates per slot,
//! so replicas that see the same patches materialize the same value no matter
//! which writer they heard from first.

pub mod document;
pub mod op_id;
pub mod patch;

use rand::Rng;

/// Number of hex characters in a generated actor id.
pub const ACTOR_ID_HEX_LEN: usize = 32;

/// Generates a random 128-bit actor id in the conventional hex encoding.
/// Allocation policy (uniqueness across a deployment, reuse rules) belongs to
/// the caller.
pub fn generate_actor_id() -> String {
    let mut rng = rand::thread_rng();
    let mut bytes = [0u8; ACTOR_ID_HEX_LEN / 2];
    rng.fill(&mut bytes[..]);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Returns the crate version at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
