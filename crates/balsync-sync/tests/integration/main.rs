//! Integration tests for balsync-sync
//!
//! Runs the publication engine against an in-memory SQLite repository,
//! the real CSV exporter and in-process doubles of the deposit service
//! and the mailer.

mod common;

mod test_pause;
mod test_publication;
mod test_reconciliation;
mod test_scheduler;
