//! Habilitation lookup tests

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

use balsync_core::domain::{HabilitationId, HabilitationStatus};
use balsync_core::ports::IDepositClient;
use balsync_depot::{DepotDepositClient, DepotError};

use crate::common::setup_depot_mock;

#[tokio::test]
async fn test_get_habilitation_sends_token() {
    let (server, client) = setup_depot_mock().await;

    Mock::given(method("GET"))
        .and(path("/habilitations/hab-1"))
        .and(header("Authorization", "Token test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "_id": "hab-1",
            "status": "accepted",
            "codeCommune": "54084",
            "expiresAt": "2099-01-01T00:00:00.000Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let hab = client.get_habilitation("hab-1").await.unwrap().unwrap();
    assert_eq!(hab.id, "hab-1");
    assert_eq!(hab.status, "accepted");
}

#[tokio::test]
async fn test_unknown_habilitation_is_none() {
    let (server, client) = setup_depot_mock().await;

    Mock::given(method("GET"))
        .and(path("/habilitations/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not found"))
        .mount(&server)
        .await;

    let provider = DepotDepositClient::new(client);
    let hab = provider
        .find_habilitation(&HabilitationId::new("missing").unwrap())
        .await
        .unwrap();
    assert!(hab.is_none());
}

#[tokio::test]
async fn test_habilitation_maps_to_domain() {
    let (server, client) = setup_depot_mock().await;

    Mock::given(method("GET"))
        .and(path("/habilitations/hab-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "_id": "hab-2",
            "status": "pending",
            "expiresAt": null
        })))
        .mount(&server)
        .await;

    let provider = DepotDepositClient::new(client);
    let hab = provider
        .find_habilitation(&HabilitationId::new("hab-2").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(hab.status, HabilitationStatus::Pending);
    assert!(hab.expires_at.is_none());
}

#[tokio::test]
async fn test_forbidden_is_unauthorized() {
    let (server, client) = setup_depot_mock().await;

    Mock::given(method("GET"))
        .and(path("/habilitations/hab-3"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .mount(&server)
        .await;

    let err = client.get_habilitation("hab-3").await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DepotError>(),
        Some(DepotError::Unauthorized(_))
    ));
}
