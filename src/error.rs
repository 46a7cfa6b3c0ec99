//! Unified error handling for the stop-cluster library.
//!
//! Every variant maps to a defined degradation rather than a hard failure:
//! a failed batch snap downgrades the whole request to distance-only
//! clustering, a failed naming lookup downgrades one road to the
//! unknown-road sentinel, and a broken cache is treated as empty.

use thiserror::Error;

/// Errors raised while resolving road data for a grouping request.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// The batched snap-to-roads call failed or returned an unusable shape.
    #[error("road snapping failed: {message}")]
    RoadData { message: String },

    /// A naming lookup for a single road identifier failed.
    #[error("naming lookup for road '{road_id}' failed: {message}")]
    NamingLookup { road_id: String, message: String },

    /// The persisted road cache could not be read or written.
    #[error("road cache error: {0}")]
    Cache(#[from] rusqlite::Error),
}

impl ClusterError {
    /// Shorthand for a [`ClusterError::RoadData`] with a formatted message.
    pub fn road_data(message: impl Into<String>) -> Self {
        ClusterError::RoadData {
            message: message.into(),
        }
    }

    /// Shorthand for a [`ClusterError::NamingLookup`] for one road identifier.
    pub fn naming(road_id: impl Into<String>, message: impl ToString) -> Self {
        ClusterError::NamingLookup {
            road_id: road_id.into(),
            message: message.to_string(),
        }
    }
}

/// Result type used throughout the library.
pub type Result<T> = std::result::Result<T, ClusterError>;
