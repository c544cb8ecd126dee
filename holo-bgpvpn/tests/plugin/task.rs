//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use holo_bgpvpn::api::{Operation, Request};
use holo_bgpvpn::error::Status;
use holo_bgpvpn::{PluginSender, start};
use serde_json::json;
use tokio::sync::oneshot;

use super::*;

async fn send(
    plugin_tx: &PluginSender,
    context: Context,
    operation: Operation,
) -> Result<Response> {
    let (responder_tx, responder_rx) = oneshot::channel();
    let mut request = Request::new(context, operation);
    request.responder = Some(responder_tx);
    plugin_tx.send(request).await.unwrap();
    responder_rx.await.unwrap()
}

#[tokio::test]
async fn test_requests_are_processed_in_order() {
    let env = setup();
    let network_id = env.add_network(TENANT);
    let plugin_tx = start(env.plugin);

    let response = send(
        &plugin_tx,
        tenant_cxt(),
        Operation::CreateResource {
            body: bgpvpn_body(),
        },
    )
    .await
    .unwrap();
    let bgpvpn_id = id_of(&response.data["bgpvpn"]);

    let operation = Operation::CreateAssociation {
        bgpvpn_id: bgpvpn_id.clone(),
        kind: AssocKind::Network,
        body: json!({"network_association": {"network_id": network_id}}),
    };
    let response = send(&plugin_tx, tenant_cxt(), operation).await.unwrap();
    assert_eq!(response.status(), Status::Ok);

    let operation = Operation::GetResource {
        id: bgpvpn_id.clone(),
        fields: vec!["networks".to_owned()],
    };
    let response = send(&plugin_tx, tenant_cxt(), operation).await.unwrap();
    assert_eq!(
        response.data,
        json!({"bgpvpn": {"networks": [network_id]}})
    );

    let operation = Operation::DeleteResource { id: bgpvpn_id };
    let response = send(&plugin_tx, tenant_cxt(), operation).await.unwrap();
    assert_eq!(response.data, Value::Null);
    assert_eq!(
        env.driver.take_events().last(),
        Some(&(Phase::Postcommit, HookEvent::DeleteBgpvpn))
    );
}

#[tokio::test]
async fn test_errors_are_sent_back() {
    let env = setup();
    let plugin_tx = start(env.plugin);

    let operation = Operation::GetResource {
        id: "foo".to_owned(),
        fields: vec![],
    };
    let result = send(&plugin_tx, tenant_cxt(), operation).await;
    assert_eq!(status(&result), Status::NotFound);

    // The task keeps serving requests after a failure.
    let operation = Operation::ListResources {
        filters: Default::default(),
        fields: vec![],
    };
    let response = send(&plugin_tx, tenant_cxt(), operation).await.unwrap();
    assert_eq!(response.data, json!({"bgpvpns": []}));
}

#[tokio::test]
async fn test_requests_without_responder() {
    let env = setup();
    let plugin_tx = start(env.plugin);

    let request = Request::new(
        tenant_cxt(),
        Operation::CreateResource {
            body: bgpvpn_body(),
        },
    );
    plugin_tx.send(request).await.unwrap();

    let operation = Operation::ListResources {
        filters: Default::default(),
        fields: vec!["name".to_owned()],
    };
    let response = send(&plugin_tx, tenant_cxt(), operation).await.unwrap();
    assert_eq!(response.data, json!({"bgpvpns": [{"name": "v1"}]}));
}

#[tokio::test]
async fn test_decode_request() {
    let env = setup();
    let plugin_tx = start(env.plugin);

    let line = r#"{
        "context": {"tenant_id": "tenant1"},
        "operation": {
            "verb": "create_resource",
            "body": {"bgpvpn": {"name": "v1", "type": "l2"}}
        }
    }"#;
    let request = serde_json::from_str::<Request>(line).unwrap();
    assert!(request.responder.is_none());
    assert!(!request.context.is_admin);

    let response = send(&plugin_tx, request.context, request.operation)
        .await
        .unwrap();
    assert_eq!(response.data["bgpvpn"]["type"], "l2");

    let line = r#"{
        "context": {"tenant_id": "admin", "is_admin": true},
        "operation": {
            "verb": "list_associations",
            "bgpvpn_id": "foo",
            "kind": "router"
        }
    }"#;
    let request = serde_json::from_str::<Request>(line).unwrap();
    assert!(request.context.is_admin);
    let result = send(&plugin_tx, request.context, request.operation).await;
    assert_eq!(status(&result), Status::NotFound);
}
