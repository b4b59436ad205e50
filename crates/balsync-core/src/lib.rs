//! balsync Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `BaseLocale`, `SyncRecord`, `Voie`, `Numero`, `Toponyme`
//! - **Use cases** - `BaseLocaleService`, `VoieService`, `NumeroService`, `ToponymeService`
//! - **Port definitions** - Traits for adapters: `IAddressRepository`, `IDepositClient`,
//!   `IGeometry`, `IExporter`, `IMailer`
//! - **Configuration** - YAML configuration shared by the binaries
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure business logic with no I/O.
//! Ports define trait interfaces that adapter crates implement.
//! Use cases orchestrate domain entities through port interfaces.

pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;
