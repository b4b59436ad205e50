//! Current revision lookup tests

use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use balsync_core::domain::CodeCommune;
use balsync_core::ports::IDepositClient;
use balsync_depot::{DepotDepositClient, DepotError};

use crate::common::{remote_hash, revision_json, setup_depot_mock, COMMUNE};

#[tokio::test]
async fn test_current_revision_with_bal_hash() {
    let (server, client) = setup_depot_mock().await;

    Mock::given(method("GET"))
        .and(path(format!("/communes/{COMMUNE}/current-revision")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(revision_json("rev-1", Some(&remote_hash()))),
        )
        .mount(&server)
        .await;

    let provider = DepotDepositClient::new(client);
    let revision = provider
        .get_current_revision(&CodeCommune::new(COMMUNE).unwrap())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(revision.id.as_str(), "rev-1");
    assert_eq!(revision.bal_file_hash().unwrap().as_str(), remote_hash());
}

#[tokio::test]
async fn test_never_published_commune_is_none() {
    let (server, client) = setup_depot_mock().await;

    Mock::given(method("GET"))
        .and(path(format!("/communes/{COMMUNE}/current-revision")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    assert!(client.get_current_revision(COMMUNE).await.unwrap().is_none());
}

#[tokio::test]
async fn test_server_error_is_propagated() {
    let (server, client) = setup_depot_mock().await;

    Mock::given(method("GET"))
        .and(path(format!("/communes/{COMMUNE}/current-revision")))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = client.get_current_revision(COMMUNE).await.unwrap_err();
    match err.downcast_ref::<DepotError>() {
        Some(DepotError::ServerError { status, message }) => {
            assert_eq!(*status, 503);
            assert_eq!(message, "maintenance");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_body_is_invalid_response() {
    let (server, client) = setup_depot_mock().await;

    Mock::given(method("GET"))
        .and(path(format!("/communes/{COMMUNE}/current-revision")))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = client.get_current_revision(COMMUNE).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DepotError>(),
        Some(DepotError::InvalidResponse(_))
    ));
}
