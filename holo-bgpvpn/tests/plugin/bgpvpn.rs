//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use holo_bgpvpn::driver::{HookEvent, Phase};
use holo_bgpvpn::error::{Error, Status};
use holo_bgpvpn::model::Context;
use maplit::btreemap;
use serde_json::json;

use super::*;

#[test]
fn test_create_defaults() {
    let mut env = setup();
    let cxt = tenant_cxt();

    let response = env.plugin.create_resource(&cxt, bgpvpn_body()).unwrap();
    assert_eq!(response.status(), Status::Ok);
    let bgpvpn = &response.data["bgpvpn"];
    assert_eq!(bgpvpn["name"], "v1");
    assert_eq!(bgpvpn["type"], "l3");
    assert_eq!(bgpvpn["tenant_id"], TENANT);
    assert_eq!(bgpvpn["route_targets"], json!(["1234:56"]));
    assert_eq!(bgpvpn["import_targets"], json!([]));
    assert_eq!(bgpvpn["export_targets"], json!([]));
    assert_eq!(bgpvpn["route_distinguishers"], json!([]));
    assert_eq!(bgpvpn["auto_aggregate"], false);
    assert_eq!(bgpvpn["networks"], json!([]));
    assert_eq!(bgpvpn["routers"], json!([]));

    // A body without any attribute is valid too.
    let response = env
        .plugin
        .create_resource(&cxt, json!({"bgpvpn": {}}))
        .unwrap();
    assert_eq!(response.data["bgpvpn"]["type"], "l3");
    assert_eq!(response.data["bgpvpn"]["name"], "");
}

#[test]
fn test_create_hooks() {
    let mut env = setup();
    let cxt = tenant_cxt();

    let response = env.plugin.create_resource(&cxt, bgpvpn_body()).unwrap();
    let calls = env.driver.take();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].phase, Phase::Precommit);
    assert_eq!(calls[0].event, HookEvent::CreateBgpvpn);
    assert_eq!(calls[1].phase, Phase::Postcommit);
    assert_eq!(calls[1].event, HookEvent::CreateBgpvpn);

    // Both hooks see the normalized record, with defaulted attributes, and
    // not the request body.
    let stored = &response.data["bgpvpn"];
    assert_eq!(calls[0].args, [stored.clone()]);
    assert_eq!(calls[1].args, [stored.clone()]);
    assert_eq!(calls[1].args[0]["import_targets"], json!([]));
}

#[test]
fn test_create_on_behalf_of_another_tenant() {
    let mut env = setup();
    let body = json!({"bgpvpn": {"tenant_id": OTHER_TENANT}});

    let result = env.plugin.create_resource(&tenant_cxt(), body.clone());
    assert_eq!(status(&result), Status::Forbidden);
    assert!(env.driver.take().is_empty());

    let response = env
        .plugin
        .create_resource(&Context::admin("admin"), body)
        .unwrap();
    assert_eq!(response.data["bgpvpn"]["tenant_id"], OTHER_TENANT);
}

#[test]
fn test_create_malformed() {
    let mut env = setup();
    let cxt = tenant_cxt();

    for body in [
        json!({}),
        json!({"bgpvpn": null}),
        json!({"bgpvpn": {"type": "l4"}}),
        json!({"bgpvpn": {"route_targets": "1234:56"}}),
        json!({"bgpvpn": {"route_targets": ["1234"]}}),
        json!({"bgpvpn": {"route_distinguishers": ["1.2.3.4:65536"]}}),
        json!({"bgpvpn": {"id": Uuid::new_v4()}}),
    ] {
        let result = env.plugin.create_resource(&cxt, body);
        assert_eq!(status(&result), Status::BadRequest);
    }

    assert!(env.driver.take().is_empty());
    let response = env
        .plugin
        .list_resources(&cxt, &Default::default(), &[])
        .unwrap();
    assert_eq!(response.data["bgpvpns"], json!([]));
}

#[test]
fn test_get_unknown() {
    let env = setup();
    let cxt = tenant_cxt();

    let id = Uuid::new_v4().to_string();
    let result = env.plugin.get_resource(&cxt, &id, &[]);
    assert!(matches!(result, Err(Error::NotFound(..))));
    let result = env.plugin.get_resource(&cxt, "not-a-uuid", &[]);
    assert_eq!(status(&result), Status::NotFound);
}

#[test]
fn test_get_fields() {
    let mut env = setup();
    let cxt = tenant_cxt();
    let bgpvpn = env.create_bgpvpn(&cxt, bgpvpn_body());

    let fields = ["id".to_owned(), "name".to_owned()];
    let response = env
        .plugin
        .get_resource(&cxt, &id_of(&bgpvpn), &fields)
        .unwrap();
    assert_eq!(
        response.data["bgpvpn"],
        json!({"id": bgpvpn["id"], "name": "v1"})
    );
}

#[test]
fn test_get_from_another_tenant() {
    let mut env = setup();
    let bgpvpn = env.create_bgpvpn(&tenant_cxt(), bgpvpn_body());

    let result = env.plugin.get_resource(&other_cxt(), &id_of(&bgpvpn), &[]);
    assert!(matches!(result, Err(Error::Unauthorized(..))));
    assert_eq!(status(&result), Status::Forbidden);
}

#[test]
fn test_list_filters() {
    let mut env = setup();
    let cxt = tenant_cxt();
    env.create_bgpvpn(&cxt, bgpvpn_body());
    env.create_bgpvpn(
        &cxt,
        json!({"bgpvpn": {"name": "v2", "type": "l2"}}),
    );
    env.create_bgpvpn(&other_cxt(), json!({"bgpvpn": {"name": "v3"}}));

    // Tenants only see their own BGPVPNs.
    let response = env
        .plugin
        .list_resources(&cxt, &Default::default(), &[])
        .unwrap();
    assert_eq!(response.data["bgpvpns"].as_array().unwrap().len(), 2);
    let response = env
        .plugin
        .list_resources(&Context::admin("admin"), &Default::default(), &[])
        .unwrap();
    assert_eq!(response.data["bgpvpns"].as_array().unwrap().len(), 3);

    let filters = btreemap! {
        "type".to_owned() => vec!["l2".to_owned()],
    };
    let fields = ["name".to_owned()];
    let response = env.plugin.list_resources(&cxt, &filters, &fields).unwrap();
    assert_eq!(response.data["bgpvpns"], json!([{"name": "v2"}]));

    let filters = btreemap! {
        "route_targets".to_owned() => vec!["1234:56".to_owned()],
    };
    let response = env.plugin.list_resources(&cxt, &filters, &fields).unwrap();
    assert_eq!(response.data["bgpvpns"], json!([{"name": "v1"}]));
}

#[test]
fn test_update_hooks() {
    let mut env = setup();
    let cxt = tenant_cxt();
    let old = env.create_bgpvpn(&cxt, bgpvpn_body());

    let body = json!({"bgpvpn": {"name": "foo"}});
    let response = env
        .plugin
        .update_resource(&cxt, &id_of(&old), body)
        .unwrap();
    let new = &response.data["bgpvpn"];
    assert_eq!(new["name"], "foo");
    assert_eq!(new["route_targets"], old["route_targets"]);
    assert_eq!(new["type"], old["type"]);

    let calls = env.driver.take();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].phase, Phase::Precommit);
    assert_eq!(calls[1].phase, Phase::Postcommit);
    assert_eq!(calls[1].event, HookEvent::UpdateBgpvpn);
    assert_eq!(calls[1].args, [old.clone(), new.clone()]);
}

#[test]
fn test_update_immutable_fields() {
    let mut env = setup();
    let cxt = tenant_cxt();
    let bgpvpn = env.create_bgpvpn(&cxt, bgpvpn_body());
    let id = id_of(&bgpvpn);

    for body in [
        json!({"bgpvpn": {"type": "l2"}}),
        json!({"bgpvpn": {"tenant_id": OTHER_TENANT}}),
        json!({"bgpvpn": {"id": Uuid::new_v4()}}),
        json!({"bgpvpn": {"import_targets": ["foo"]}}),
    ] {
        let result = env.plugin.update_resource(&cxt, &id, body);
        assert_eq!(status(&result), Status::BadRequest);
    }
    assert!(env.driver.take().is_empty());
    assert_eq!(env.get_bgpvpn(&id), bgpvpn);
}

#[test]
fn test_update_unknown() {
    let mut env = setup();
    let body = json!({"bgpvpn": {"name": "foo"}});
    let result = env.plugin.update_resource(
        &tenant_cxt(),
        &Uuid::new_v4().to_string(),
        body,
    );
    assert_eq!(status(&result), Status::NotFound);
}

#[test]
fn test_delete_twice() {
    let mut env = setup();
    let cxt = tenant_cxt();
    let bgpvpn = env.create_bgpvpn(&cxt, bgpvpn_body());
    let id = id_of(&bgpvpn);

    let response = env.plugin.delete_resource(&cxt, &id).unwrap();
    assert_eq!(response.status(), Status::Ok);
    let calls = env.driver.take();
    assert_eq!(
        calls
            .iter()
            .map(|call| (call.phase, call.event))
            .collect::<Vec<_>>(),
        [
            (Phase::Precommit, HookEvent::DeleteBgpvpn),
            (Phase::Postcommit, HookEvent::DeleteBgpvpn),
        ]
    );
    // The postcommit hook gets the record that was just removed.
    assert_eq!(calls[1].args, [bgpvpn]);

    // Deleting it again succeeds without notifying the drivers.
    let response = env.plugin.delete_resource(&cxt, &id).unwrap();
    assert_eq!(response.status(), Status::Ok);
    assert!(env.driver.take().is_empty());

    let result = env.plugin.get_resource(&cxt, &id, &[]);
    assert_eq!(status(&result), Status::NotFound);
}

#[test]
fn test_delete_unknown() {
    let mut env = setup();
    let cxt = tenant_cxt();

    let result =
        env.plugin.delete_resource(&cxt, &Uuid::new_v4().to_string());
    assert_eq!(status(&result), Status::NotFound);
    let result = env.plugin.delete_resource(&cxt, "foo");
    assert_eq!(status(&result), Status::NotFound);
}

#[test]
fn test_delete_from_another_tenant() {
    let mut env = setup();
    let bgpvpn = env.create_bgpvpn(&tenant_cxt(), bgpvpn_body());
    let id = id_of(&bgpvpn);

    let result = env.plugin.delete_resource(&other_cxt(), &id);
    assert_eq!(status(&result), Status::Forbidden);
    assert!(env.driver.take().is_empty());
    assert_eq!(env.get_bgpvpn(&id), bgpvpn);
}

#[test]
fn test_delete_twice_from_another_tenant() {
    let mut env = setup();
    let bgpvpn = env.create_bgpvpn(&tenant_cxt(), bgpvpn_body());
    let id = id_of(&bgpvpn);
    env.plugin.delete_resource(&tenant_cxt(), &id).unwrap();
    env.driver.take();

    // Only those allowed to delete the BGPVPN learn that it's gone.
    let result = env.plugin.delete_resource(&other_cxt(), &id);
    assert_eq!(status(&result), Status::Forbidden);
    let response = env
        .plugin
        .delete_resource(&Context::admin("admin"), &id)
        .unwrap();
    assert_eq!(response.status(), Status::Ok);
    assert!(env.driver.take().is_empty());
}
