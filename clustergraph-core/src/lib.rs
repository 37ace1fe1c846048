//! clustergraph-core: types and algorithms for precomputing a hierarchical
//! pathfinding (HPA*-style) cluster graph over a chunked, multi-plane tile
//! grid.
//!
//! This crate owns the read-mostly Tile Store contract, the Neighbor
//! Policy, the JPS Accelerator, the bounded-region A* engine, waypoint
//! compression, and the persistence primitives (schema, retry, transaction
//! guard) shared by the builder phases. It does not itself run the build —
//! see `clustergraph-builder`.

pub mod astar;
pub mod crossing;
pub mod db;
pub mod error;
pub mod jps;
pub mod movement;
pub mod policy;
pub mod tile;
pub mod waypoints;

pub use error::{ClusterGraphError, Result};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
