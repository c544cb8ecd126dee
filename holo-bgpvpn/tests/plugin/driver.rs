//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use holo_bgpvpn::driver::{
    DriverRegistry, HookEvent, Phase, ServiceProvider, recorder,
};
use holo_bgpvpn::error::{DriverError, Error, Status};
use holo_bgpvpn::model::AssocKind;
use serde_json::json;

use super::*;

// Sets up a plugin with two drivers sharing the same call log.
fn setup_two_drivers() -> (TestEnv, RecordingDriver) {
    let registry = StaticRegistry::default();
    let first = RecordingDriver::new("first");
    let second = first.sibling("second");
    let mut drivers = DriverRegistry::new();
    drivers.register("first", Box::new(first.clone())).unwrap();
    drivers.register("second", Box::new(second.clone())).unwrap();
    let manager = AssociationManager::new(
        Store::new(),
        Box::new(registry.clone()),
        drivers,
    );

    let env = TestEnv {
        plugin: Plugin::new(manager),
        registry,
        driver: first,
    };
    (env, second)
}

#[test]
fn test_precommit_veto() {
    let mut env = setup();
    let cxt = tenant_cxt();
    env.driver.fail_on(Phase::Precommit, HookEvent::CreateBgpvpn);

    let result = env.plugin.create_resource(&cxt, bgpvpn_body());
    let Err(Error::DriverPrecommitRejected(error)) = &result else {
        panic!("unexpected result: {:?}", result);
    };
    assert_eq!(error.driver, "recording");
    assert_eq!(error.event, "create_bgpvpn");
    assert_eq!(error.reason, "recording refused create_bgpvpn");
    assert_eq!(status(&result), Status::Conflict);

    // Nothing was stored and no postcommit hook ran.
    assert_eq!(
        env.driver.take_events(),
        [(Phase::Precommit, HookEvent::CreateBgpvpn)]
    );
    let response = env
        .plugin
        .list_resources(&cxt, &Default::default(), &[])
        .unwrap();
    assert_eq!(response.data["bgpvpns"], json!([]));
}

#[test]
fn test_precommit_veto_on_update() {
    let mut env = setup();
    let cxt = tenant_cxt();
    let bgpvpn = env.create_bgpvpn(&cxt, bgpvpn_body());
    let id = id_of(&bgpvpn);
    env.driver.fail_on(Phase::Precommit, HookEvent::UpdateBgpvpn);

    let body = json!({"bgpvpn": {"name": "foo"}});
    let result = env.plugin.update_resource(&cxt, &id, body);
    assert_eq!(status(&result), Status::Conflict);
    assert_eq!(env.get_bgpvpn(&id), bgpvpn);
}

#[test]
fn test_precommit_veto_on_cascade() {
    let mut env = setup();
    let cxt = tenant_cxt();
    let bgpvpn = env.create_bgpvpn(&cxt, bgpvpn_body());
    let bgpvpn_id = id_of(&bgpvpn);
    let network_id = env.add_network(TENANT);
    let assoc = env.associate_network(&cxt, &bgpvpn_id, &network_id);
    env.driver.fail_on(Phase::Precommit, HookEvent::DeleteNetAssoc);

    let result = env.plugin.delete_resource(&cxt, &bgpvpn_id);
    assert_eq!(status(&result), Status::Conflict);
    assert_eq!(
        env.driver.take_events(),
        [
            (Phase::Precommit, HookEvent::DeleteBgpvpn),
            (Phase::Precommit, HookEvent::DeleteNetAssoc),
        ]
    );

    // The BGPVPN and its association are left untouched.
    let bgpvpn = env.get_bgpvpn(&bgpvpn_id);
    assert_eq!(bgpvpn["networks"], json!([network_id]));
    let response = env
        .plugin
        .get_association(
            &cxt,
            &id_of(&assoc),
            &bgpvpn_id,
            AssocKind::Network,
            &[],
        )
        .unwrap();
    assert_eq!(response.data["network_association"], assoc);
}

#[test]
fn test_postcommit_failure() {
    let mut env = setup();
    let cxt = tenant_cxt();
    env.driver.fail_on(Phase::Postcommit, HookEvent::CreateBgpvpn);

    let response = env.plugin.create_resource(&cxt, bgpvpn_body()).unwrap();
    assert_eq!(response.status(), Status::CompletedWithWarnings);
    assert_eq!(
        response.warnings,
        [DriverError {
            driver: "recording".to_owned(),
            event: "create_bgpvpn".to_owned(),
            reason: "recording refused create_bgpvpn".to_owned(),
        }]
    );

    // The change is kept.
    let bgpvpn = &response.data["bgpvpn"];
    assert_eq!(env.get_bgpvpn(&id_of(bgpvpn)), *bgpvpn);
}

#[test]
fn test_postcommit_failure_on_delete() {
    let mut env = setup();
    let cxt = tenant_cxt();
    let bgpvpn = env.create_bgpvpn(&cxt, bgpvpn_body());
    let id = id_of(&bgpvpn);
    env.driver.fail_on(Phase::Postcommit, HookEvent::DeleteBgpvpn);

    let response = env.plugin.delete_resource(&cxt, &id).unwrap();
    assert_eq!(response.status(), Status::CompletedWithWarnings);
    assert_eq!(response.warnings.len(), 1);
    let result = env.plugin.get_resource(&cxt, &id, &[]);
    assert_eq!(status(&result), Status::NotFound);
}

#[test]
fn test_drivers_run_in_order() {
    let (mut env, _second) = setup_two_drivers();
    let cxt = tenant_cxt();

    env.plugin.create_resource(&cxt, bgpvpn_body()).unwrap();
    let calls = env
        .driver
        .take()
        .into_iter()
        .map(|call| (call.driver, call.phase))
        .collect::<Vec<_>>();
    assert_eq!(
        calls,
        [
            ("first".to_owned(), Phase::Precommit),
            ("second".to_owned(), Phase::Precommit),
            ("first".to_owned(), Phase::Postcommit),
            ("second".to_owned(), Phase::Postcommit),
        ]
    );
}

#[test]
fn test_second_driver_veto() {
    let (mut env, second) = setup_two_drivers();
    let cxt = tenant_cxt();
    second.fail_on(Phase::Precommit, HookEvent::CreateBgpvpn);

    let result = env.plugin.create_resource(&cxt, bgpvpn_body());
    let Err(Error::DriverPrecommitRejected(error)) = &result else {
        panic!("unexpected result: {:?}", result);
    };
    assert_eq!(error.driver, "second");

    // The first driver accepted the change, but no postcommit hook ran.
    let calls = env.driver.take();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|call| call.phase == Phase::Precommit));
}

#[test]
fn test_postcommit_failures_are_collected() {
    let (mut env, second) = setup_two_drivers();
    let cxt = tenant_cxt();
    env.driver.fail_on(Phase::Postcommit, HookEvent::CreateBgpvpn);
    second.fail_on(Phase::Postcommit, HookEvent::CreateBgpvpn);

    // A failing driver doesn't prevent the next ones from being notified.
    let response = env.plugin.create_resource(&cxt, bgpvpn_body()).unwrap();
    let drivers = response
        .warnings
        .iter()
        .map(|warning| warning.driver.as_str())
        .collect::<Vec<_>>();
    assert_eq!(drivers, ["first", "second"]);
}

#[test]
fn test_duplicate_driver() {
    let mut drivers = DriverRegistry::new();
    drivers
        .register("first", Box::new(RecordingDriver::new("first")))
        .unwrap();
    let result =
        drivers.register("first", Box::new(RecordingDriver::new("first")));
    assert!(matches!(result, Err(Error::Conflict(..))));
    assert_eq!(drivers.len(), 1);
}

#[test]
fn test_load_providers() {
    let providers = [
        "BGPVPN:dummy:dummy:default",
        "BGPVPN:noop:dummy",
        "L3_ROUTER_NAT:router:dummy",
    ]
    .into_iter()
    .map(|provider| provider.parse::<ServiceProvider>().unwrap())
    .collect::<Vec<_>>();

    let drivers =
        DriverRegistry::load(&providers, &recorder::Config::default())
            .unwrap();
    assert_eq!(drivers.names().collect::<Vec<_>>(), ["dummy", "noop"]);

    let providers = [
        "BGPVPN:foo:bagpipe".parse::<ServiceProvider>().unwrap(),
    ];
    let result =
        DriverRegistry::load(&providers, &recorder::Config::default());
    assert!(matches!(result, Err(Error::DriverLoad(..))));
}
