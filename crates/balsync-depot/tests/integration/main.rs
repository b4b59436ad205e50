//! Integration tests for balsync-depot
//!
//! Uses wiremock to simulate the deposit service and verifies the
//! request shapes, token header and status mapping of the client and
//! the publication chain of the port adapter.

mod common;

mod test_habilitation;
mod test_publish;
mod test_revision;
