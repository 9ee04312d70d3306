//! Unified error handling for the registry core.
//!
//! Missing geometry is never an error: the computation engines return empty
//! results for entities without geometry. Errors cover unknown identifiers,
//! spatial-engine failures and malformed interchange data. State-machine
//! rejections are typed reason codes, not errors — see
//! [`crate::validation::ValidationRejection`].

use thiserror::Error;

/// Errors produced by the registry core.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The referenced entity (trail or point feature) is not known.
    #[error("unknown entity '{entity_id}'")]
    UnknownEntity { entity_id: String },

    /// The referenced territorial unit is not known.
    #[error("unknown territorial unit '{unit_id}'")]
    UnknownUnit { unit_id: String },

    /// A spatial computation failed. The association ledger is left
    /// untouched when this is returned; the surrounding task queue retries.
    #[error("spatial computation failed for '{entity_id}': {detail}")]
    Computation { entity_id: String, detail: String },

    /// Geometry or link data that violates a structural invariant, e.g. an
    /// overlap fraction outside (0, 1].
    #[error("invalid geometry data for '{entity_id}': {detail}")]
    InvalidGeometry { entity_id: String, detail: String },

    /// WKT that could not be parsed during sync import.
    #[error("malformed WKT: {detail}")]
    Wkt { detail: String },

    /// Underlying storage failure in the SQLite-backed ledger.
    #[cfg(feature = "persistence")]
    #[error("ledger storage error: {0}")]
    Persistence(#[from] rusqlite::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RegistryError>;
