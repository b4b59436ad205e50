//! Domain entities and business logic
//!
//! This module contains the core domain types for Bases Adresses Locales:
//! - Newtypes for identifiers, commune codes, emails and content hashes
//! - The `BaseLocale` dataset and its embedded `SyncRecord`
//! - Child entities: `Voie`, `Numero`, `Toponyme` and their positions
//! - Read-only deposit records: `Habilitation`, `Revision`
//! - Domain-specific error types

pub mod base_locale;
pub mod deposit;
pub mod errors;
pub mod geometry;
pub mod newtypes;
pub mod numero;
pub mod position;
pub mod sync;
pub mod toponyme;
pub mod voie;

// Re-export commonly used types
pub use base_locale::{BaseLocale, BaseLocaleStatus};
pub use deposit::{Habilitation, HabilitationStatus, Revision, RevisionFile};
pub use errors::DomainError;
pub use geometry::{BBox, GeoPoint, LineTrace};
pub use newtypes::*;
pub use numero::Numero;
pub use position::{Position, PositionType};
pub use sync::{SyncRecord, SyncStatus};
pub use toponyme::Toponyme;
pub use voie::{NomAlt, TypeNumerotation, Voie};
