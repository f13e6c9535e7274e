// Integration tests for `NetBoxStore` against a wiremock NetBox.

#![allow(clippy::unwrap_used)]

use std::collections::BTreeSet;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use netsync_api::{NetBoxClient, TransportConfig};
use netsync_core::{
    CoreError, DeviceAttrs, Entity, EntityKind, Field, FieldChange, FieldValue, Filter,
    InterfaceAttrs, InterfaceType, InventoryStore, NaturalKey, NetBoxStore,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, NetBoxStore) {
    let server = MockServer::start().await;
    let token = secrecy::SecretString::from("token".to_owned());
    let client =
        NetBoxClient::from_token(&server.uri(), &token, &TransportConfig::default()).unwrap();
    (server, NetBoxStore::new(client))
}

fn page(results: serde_json::Value) -> ResponseTemplate {
    let count = results.as_array().map_or(0, Vec::len);
    ResponseTemplate::new(200).set_body_json(json!({
        "count": count, "next": null, "previous": null, "results": results
    }))
}

fn device_json(id: u64, name: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "site": { "id": 1, "name": "Denver", "slug": "den" },
        "device_type": { "id": 4, "model": "WS-C3850-48P" },
        "platform": null,
        "status": { "value": "active", "label": "Active" },
        "primary_ip4": { "id": 9, "address": "10.1.1.1/24" },
        "tags": [{ "id": 2, "name": "Network-IOS", "slug": "network-ios" }]
    })
}

// ── Listing ─────────────────────────────────────────────────────────

#[tokio::test]
async fn devices_map_to_entities() {
    let (server, store) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/dcim/devices/"))
        .and(query_param("site", "den"))
        .and(query_param("status", "active"))
        .respond_with(page(json!([device_json(11, "RDEN01ER01")])))
        .mount(&server)
        .await;

    let devices = store
        .list(EntityKind::Device, &Filter::site("den"))
        .await
        .unwrap();

    assert_eq!(devices.len(), 1);
    let expected = Entity::device(
        "RDEN01ER01",
        DeviceAttrs {
            platform: None,
            site: Some("den".into()),
            model: Some("WS-C3850-48P".into()),
            status: Some("active".into()),
            primary_ip: Some("10.1.1.1".into()),
        },
    )
    .with_tags(["Network-IOS"]);
    assert_eq!(devices[0], expected);
}

#[tokio::test]
async fn tag_filter_uses_slug() {
    let (server, store) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/dcim/devices/"))
        .and(query_param("tag", "core-router"))
        .respond_with(page(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let filter = Filter::default()
        .with_tag(Some("Core Router".into()))
        .with_inactive(true);
    assert!(store.list(EntityKind::Device, &filter).await.unwrap().is_empty());
}

// ── Mutations ───────────────────────────────────────────────────────

#[tokio::test]
async fn device_update_resolves_platform_and_tags() {
    let (server, store) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/dcim/devices/"))
        .respond_with(page(json!([device_json(11, "RDEN01ER01")])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/dcim/platforms/"))
        .respond_with(page(json!([{ "id": 7, "name": "Cisco IOS", "slug": "ios" }])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/dcim/devices/11/"))
        .and(body_partial_json(json!({
            "platform": 7,
            "tags": [{ "name": "Network-IOS" }, { "name": "edge-router" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(device_json(11, "RDEN01ER01")))
        .expect(1)
        .mount(&server)
        .await;

    let key = NaturalKey::device("RDEN01ER01");
    let tags: BTreeSet<String> = ["Network-IOS".to_owned(), "edge-router".to_owned()].into();
    store
        .update(
            &key,
            &[
                FieldChange {
                    field: Field::Platform,
                    old: FieldValue::None,
                    new: FieldValue::Text("ios".into()),
                },
                FieldChange {
                    field: Field::Tags,
                    old: FieldValue::None,
                    new: FieldValue::Tags(tags),
                },
            ],
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn interface_create_resolves_device_and_vlan_ids() {
    let (server, store) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/dcim/devices/"))
        .and(query_param("name", "RDEN01ER01"))
        .respond_with(page(json!([device_json(11, "RDEN01ER01")])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/ipam/vlans/"))
        .and(query_param("vid", "20"))
        .respond_with(page(json!([{
            "id": 55, "vid": 20, "name": "USERS",
            "site": { "id": 1, "slug": "den" },
            "status": { "value": "active" }
        }])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/dcim/interfaces/"))
        .and(body_partial_json(json!({
            "device": 11,
            "name": "GigabitEthernet1/0/1",
            "type": "1000base-t",
            "mac_address": "AA:BB:CC:00:01:01",
            "untagged_vlan": 55
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 900,
            "device": { "id": 11, "name": "RDEN01ER01" },
            "name": "GigabitEthernet1/0/1",
            "type": { "value": "1000base-t", "label": "1000BASE-T (1GE)" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let entity = Entity::interface(
        "RDEN01ER01",
        "GigabitEthernet1/0/1",
        InterfaceAttrs {
            kind: Some(InterfaceType::Base1000T),
            mac: Some("aabb.cc00.0101".into()),
            untagged_vlan: Some(20),
            mode: Some("access".parse().unwrap()),
            ..InterfaceAttrs::default()
        },
    );
    store.create(&entity).await.unwrap();
}

#[tokio::test]
async fn devices_are_never_created() {
    let (_server, store) = setup().await;
    let err = store
        .create(&Entity::device("RDEN01ER01", DeviceAttrs::default()))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Unsupported { .. }));
}

#[tokio::test]
async fn missing_tags_are_created_once() {
    let (server, store) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/extras/tags/"))
        .respond_with(page(json!([{ "id": 1, "name": "primary", "slug": "primary" }])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/extras/tags/"))
        .and(body_partial_json(json!({ "name": "stp-root-primary", "slug": "stp-root-primary" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 2, "name": "stp-root-primary", "slug": "stp-root-primary"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let wanted: BTreeSet<String> = ["primary".to_owned(), "stp-root-primary".to_owned()].into();
    let created = store.ensure_tags(&wanted).await.unwrap();
    assert_eq!(created, vec!["stp-root-primary".to_owned()]);

    // second call is served from the cached tag list
    assert!(store.ensure_tags(&wanted).await.unwrap().is_empty());
}
