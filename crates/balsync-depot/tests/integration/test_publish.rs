//! Revision publication tests

use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use balsync_core::domain::{BaseLocaleId, CodeCommune, HabilitationId};
use balsync_core::ports::IDepositClient;
use balsync_depot::{DepotDepositClient, DepotError};

use crate::common::{mount_publication, remote_hash, setup_depot_mock, COMMUNE};

#[tokio::test]
async fn test_publish_chains_all_steps() {
    let (server, client) = setup_depot_mock().await;
    mount_publication(&server, "rev-new").await;

    let provider = DepotDepositClient::new(client);
    let revision = provider
        .publish_new_revision(
            &CodeCommune::new(COMMUNE).unwrap(),
            &BaseLocaleId::new(),
            "cle_interop;commune_insee\n",
            &HabilitationId::new("hab-1").unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(revision.id.as_str(), "rev-new");
    assert_eq!(revision.bal_file_hash().unwrap().as_str(), remote_hash());
    // `expect(1)` on every mock is verified when the server drops
}

#[tokio::test]
async fn test_create_revision_carries_bal_id() {
    let (server, client) = setup_depot_mock().await;
    let bal_id = BaseLocaleId::new();

    Mock::given(method("POST"))
        .and(path(format!("/communes/{COMMUNE}/revisions")))
        .and(body_json(serde_json::json!({
            "context": { "extras": { "balId": bal_id.to_string() } }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "_id": "rev-x"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let revision = client
        .create_revision(COMMUNE, &bal_id.to_string())
        .await
        .unwrap();
    assert_eq!(revision.id, "rev-x");
    assert!(revision.files.is_empty());
}

#[tokio::test]
async fn test_publish_sends_habilitation_id() {
    let (server, client) = setup_depot_mock().await;

    Mock::given(method("POST"))
        .and(path("/revisions/rev-1/publish"))
        .and(body_json(serde_json::json!({ "habilitationId": "hab-9" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "_id": "rev-1",
            "files": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    client.publish_revision("rev-1", "hab-9").await.unwrap();
}

#[tokio::test]
async fn test_rejected_upload_stops_the_chain() {
    let (server, client) = setup_depot_mock().await;

    Mock::given(method("POST"))
        .and(path(format!("/communes/{COMMUNE}/revisions")))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "_id": "rev-bad"
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/revisions/rev-bad/files/bal"))
        .respond_with(ResponseTemplate::new(400).set_body_string("fichier invalide"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/revisions/rev-bad/publish"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let provider = DepotDepositClient::new(client);
    let err = provider
        .publish_new_revision(
            &CodeCommune::new(COMMUNE).unwrap(),
            &BaseLocaleId::new(),
            "bad",
            &HabilitationId::new("hab-1").unwrap(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<DepotError>(),
        Some(DepotError::Rejected { status: 400, .. })
    ));
}
