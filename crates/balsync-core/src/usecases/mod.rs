//! Use cases (interactors) for balsync
//!
//! This module contains the services that mutate a dataset and its
//! children. Each mutation runs its cascade explicitly: derived voie
//! centroids are recomputed and the owning dataset's `updatedAt` is
//! bumped before the call returns.
//!
//! ## Use Cases
//!
//! - [`BaseLocaleService`] - Dataset lifecycle (create, demo transform, soft delete)
//! - [`VoieService`] - Voie mutations, soft-delete cascade, toponyme conversion
//! - [`NumeroService`] - Numero mutations and batch operations
//! - [`ToponymeService`] - Toponyme mutations

pub mod base_locale;
pub(crate) mod cascade;
pub mod error;
pub mod numero;
pub mod toponyme;
pub mod voie;

#[cfg(test)]
pub(crate) mod testing;

pub use base_locale::{BaseLocaleService, CreateBaseLocale};
pub use error::{ServiceError, ServiceResult};
pub use numero::{CreateNumero, NumeroService, UpdateNumero};
pub use toponyme::{CreateToponyme, ToponymeService, UpdateToponyme};
pub use voie::{CreateVoie, UpdateVoie, VoieService};
