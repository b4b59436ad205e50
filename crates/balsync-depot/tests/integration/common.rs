//! Shared helpers for deposit service integration tests

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use balsync_depot::client::DepotClient;

pub const TOKEN: &str = "test-token";
pub const COMMUNE: &str = "54084";

/// Hash the mocked service reports for uploaded files
pub fn remote_hash() -> String {
    "ab".repeat(32)
}

/// Starts a mock server and returns a client authenticated against it
pub async fn setup_depot_mock() -> (MockServer, DepotClient) {
    let server = MockServer::start().await;
    let client = DepotClient::with_base_url(Some(TOKEN.to_string()), server.uri());
    (server, client)
}

/// JSON body of a revision carrying a BAL file with `hash`
pub fn revision_json(id: &str, hash: Option<&str>) -> serde_json::Value {
    let files = match hash {
        Some(hash) => serde_json::json!([{ "type": "bal", "hash": hash }]),
        None => serde_json::json!([]),
    };
    serde_json::json!({
        "_id": id,
        "codeCommune": COMMUNE,
        "status": "published",
        "files": files
    })
}

/// Mounts the four endpoints of a successful publication
pub async fn mount_publication(server: &MockServer, revision_id: &str) {
    Mock::given(method("POST"))
        .and(path(format!("/communes/{COMMUNE}/revisions")))
        .and(header("Authorization", "Token test-token"))
        .respond_with(ResponseTemplate::new(201).set_body_json(revision_json(revision_id, None)))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("PUT"))
        .and(path(format!("/revisions/{revision_id}/files/bal")))
        .and(header("Content-Type", "text/csv"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/revisions/{revision_id}/compute")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(revision_json(revision_id, None)),
        )
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("/revisions/{revision_id}/publish")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(revision_json(revision_id, Some(&remote_hash()))),
        )
        .expect(1)
        .mount(server)
        .await;
}
