//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IAddressRepository`] - Persistent storage for datasets and their children
//! - [`IDepositClient`] - Habilitation lookup and revision publication
//! - [`IGeometry`] - Centroid and bounding-box computations
//! - [`IExporter`] - Canonical BAL CSV export
//! - [`IMailer`] - Notification emails

pub mod address_repository;
pub mod deposit_client;
pub mod exporter;
pub mod geometry;
pub mod mailer;

pub use address_repository::{
    BaseLocaleFilter, IAddressRepository, NumeroChanges, NumeroFilter, SyncGuard,
};
pub use deposit_client::IDepositClient;
pub use exporter::IExporter;
pub use geometry::IGeometry;
pub use mailer::{EmailMessage, IMailer};
