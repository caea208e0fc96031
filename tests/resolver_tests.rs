//! Identifier resolution over HTTP.

mod common;

use reqwest::StatusCode;
use serde_json::Value;

use algo_did::{LedgerParams, OwnerKey, DEFAULT_NETWORK};
use common::*;

#[tokio::test]
async fn test_resolve_raw_document() {
    let net = deploy(LedgerParams::default());
    let owner = OwnerKey::from_name("alice");
    let document = br#"{"id":"did:algo:alice","verificationMethod":[]}"#;
    net.client
        .upload_document(owner, bytes::Bytes::from_static(document))
        .await
        .unwrap();

    let server = TestServer::start(resolver_for(&net)).await;
    let client = reqwest::Client::new();
    let url = server.identifier_url(&net.identifier(owner).to_string());

    let resp = client.get(&url).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "application/did");
    assert!(resp.headers().contains_key("x-request-id"));
    let date = resp.headers()["date"].to_str().unwrap();
    assert!(date.ends_with(" GMT"), "{}", date);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["id"], "did:algo:alice");

    for media in ["application/did+ld+json", "application/json"] {
        let resp = client
            .get(&url)
            .header("Accept", media)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["content-type"], media);
    }
}

#[tokio::test]
async fn test_raw_document_is_served_byte_for_byte() {
    let net = deploy(LedgerParams::default());
    let owner = OwnerKey::from_name("alice");
    let document: &[u8] =
        br#"{"id":"did:algo:x", "@context":"https://www.w3.org/ns/did/v1","a":[ 1, 2 ]}"#;
    net.client
        .upload_document(owner, bytes::Bytes::from_static(document))
        .await
        .unwrap();

    let server = TestServer::start(resolver_for(&net)).await;
    let client = reqwest::Client::new();
    let url = server.identifier_url(&net.identifier(owner).to_string());

    for media in ["application/did", "application/did+ld+json", "application/json"] {
        let resp = client
            .get(&url)
            .header("Accept", media)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.bytes().await.unwrap().as_ref(), document, "{}", media);
    }
}

#[tokio::test]
async fn test_resolution_result_envelope() {
    let net = deploy(LedgerParams::default());
    let owner = OwnerKey::from_name("alice");
    net.client
        .upload_document(owner, json_document(40_000))
        .await
        .unwrap();

    let server = TestServer::start(resolver_for(&net)).await;
    let did = net.identifier(owner).to_string();
    let resp = reqwest::Client::new()
        .get(server.identifier_url(&did))
        .header("Accept", "application/did-resolution")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert!(body["@context"].is_string());
    assert_eq!(body["didDocument"]["pad"].as_str().unwrap().len(), 39_990);
    assert_eq!(body["didResolutionMetadata"]["contentType"], "application/did");
    assert_eq!(body["didResolutionMetadata"]["did"]["didString"], did.as_str());
    assert_eq!(body["didDocumentMetadata"]["pages"]["end"], 1);
}

#[tokio::test]
async fn test_unsupported_representation() {
    let net = deploy(LedgerParams::default());
    let owner = OwnerKey::from_name("alice");
    net.client
        .upload_document(owner, json_document(100))
        .await
        .unwrap();

    let server = TestServer::start(resolver_for(&net)).await;
    let resp = reqwest::Client::new()
        .get(server.identifier_url(&net.identifier(owner).to_string()))
        .header("Accept", "text/html")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_ACCEPTABLE);
    let text = resp.text().await.unwrap();
    assert!(text.contains("application/did+ld+json"));
}

#[tokio::test]
async fn test_protocol_errors() {
    let net = deploy(LedgerParams::default());
    let server = TestServer::start(resolver_for(&net)).await;
    let client = reqwest::Client::new();
    let key = OwnerKey::from_name("alice").to_hex();

    let cases = [
        (format!("did:web:custom:app:1001:{}", key), "invalid DID method"),
        (format!("did:algo:custom:asa:1001:{}", key), "invalid namespace"),
        (format!("did:algo:custom:app:x:{}", key), "invalid app ID"),
        ("did:algo:custom:app:1001:zz".to_string(), "public key"),
        (format!("did:algo:betanet:app:1001:{}", key), "Unsupported network: betanet"),
    ];
    for (did, fragment) in cases {
        let resp = client.get(server.identifier_url(&did)).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", did);
        assert_eq!(resp.headers()["content-type"], "text/plain; charset=utf-8");
        let text = resp.text().await.unwrap();
        assert!(text.contains(fragment), "{}: {}", did, text);
    }
}

#[tokio::test]
async fn test_not_found() {
    let net = deploy(LedgerParams::default());
    let server = TestServer::start(resolver_for(&net)).await;
    let client = reqwest::Client::new();
    let owner = OwnerKey::from_name("nobody");

    let resp = client
        .get(server.identifier_url(&net.identifier(owner).to_string()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let text = resp.text().await.unwrap();
    assert!(text.contains(&owner.to_hex()));

    let missing_app = format!("did:algo:custom:app:9999:{}", owner.to_hex());
    let resp = client
        .get(server.identifier_url(&missing_app))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_uploading_document_is_bad_request() {
    let net = deploy(LedgerParams::default());
    let flaky = FlakyLedger::new(net.ledger.clone());
    let owner = OwnerKey::from_name("alice");
    flaky.block(|group| calls(group, "finishUpload"));
    client_through(&net, flaky.clone())
        .upload_document(owner, json_document(80))
        .await
        .unwrap_err();

    let server = TestServer::start(resolver_for(&net)).await;
    let resp = reqwest::get(server.identifier_url(&net.identifier(owner).to_string()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.text().await.unwrap(), "DID document is still being uploaded");
}

#[tokio::test]
async fn test_invalid_json_document() {
    let net = deploy(LedgerParams::default());
    let owner = OwnerKey::from_name("alice");
    net.client
        .upload_document(owner, bytes::Bytes::from_static(b"not json"))
        .await
        .unwrap();

    let server = TestServer::start(resolver_for(&net)).await;
    let resp = reqwest::get(server.identifier_url(&net.identifier(owner).to_string()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(resp.text().await.unwrap().starts_with("Invalid JSON"));
}

#[tokio::test]
async fn test_five_segment_identifier_uses_default_network() {
    let net = deploy(LedgerParams::default());
    let owner = OwnerKey::from_name("alice");
    net.client
        .upload_document(owner, json_document(64))
        .await
        .unwrap();

    let resolver = resolver_for(&net).with_network(DEFAULT_NETWORK, net.ledger.clone());
    let server = TestServer::start(resolver).await;

    let did = format!("did:algo:app:{}:{}", net.app_id, owner.to_hex());
    let resp = reqwest::get(server.identifier_url(&did)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_seeded_documents_resolve() {
    let net = deploy(LedgerParams::default());
    let owner = OwnerKey::from_name("seeded");
    let document = br#"{"id":"seeded"}"#;
    let (_dir, seed) = seed_file(owner, document);

    let identifiers = net.seed(&[seed]).await.unwrap();
    assert_eq!(identifiers, vec![net.identifier(owner)]);

    let server = TestServer::start(resolver_for(&net)).await;
    let resp = reqwest::get(server.identifier_url(&identifiers[0].to_string()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["id"], "seeded");
}
