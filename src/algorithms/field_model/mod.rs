//! Precomputed spatial lookup structures over the static field map.
//!
//! [`FieldModel`] answers "which field feature is closest to this point"
//! without any per-query geometry; [`GoalNetTable`] answers "could this
//! observation be goal net rather than a line". Both are built once from
//! the field geometry and cached on disk keyed by a geometry fingerprint.

pub mod goal_net;
pub mod serialization;
pub mod tables;

pub use goal_net::GoalNetTable;
pub use tables::{ClosestPointTable, FieldModel};

use std::path::Path;

use crate::core::field::FieldDimensions;
use crate::error::Result;

/// Load the tables from the cache, rebuilding (and rewriting the cache)
/// when the cache is missing, stale or damaged.
pub fn load_or_build<P: AsRef<Path>>(
    field: &FieldDimensions,
    max_crossing_length: f32,
    cache_path: P,
) -> Result<(FieldModel, GoalNetTable)> {
    let key = cache_key(field, max_crossing_length);
    match serialization::load(&cache_path, key) {
        Ok(loaded) => Ok(loaded),
        Err(err) => {
            log::info!(
                "field model cache unusable ({}), rebuilding tables",
                err
            );
            let model = FieldModel::build(field, max_crossing_length);
            let goal_net = GoalNetTable::build(field);
            if let Err(err) = serialization::save(&cache_path, key, &model, &goal_net) {
                log::warn!("could not write field model cache: {}", err);
            }
            Ok((model, goal_net))
        }
    }
}

/// Build the tables without touching any cache.
pub fn build(field: &FieldDimensions, max_crossing_length: f32) -> (FieldModel, GoalNetTable) {
    (
        FieldModel::build(field, max_crossing_length),
        GoalNetTable::build(field),
    )
}

fn cache_key(field: &FieldDimensions, max_crossing_length: f32) -> u64 {
    // The crossing length influences the line tables, so it is part of the
    // cache identity alongside the geometry itself.
    field.geometry_key() ^ (max_crossing_length.to_bits() as u64)
}
