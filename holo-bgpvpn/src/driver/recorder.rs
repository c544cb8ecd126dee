//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::driver::{Driver, HookEvent, HookResult, Phase};
use crate::model::{Bgpvpn, Context, NetAssoc, RouterAssoc};

// Driver that appends every hook invocation as a JSON line to a file.
#[derive(Debug)]
pub struct RecorderDriver(std::fs::File);

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub dir: String,
}

#[derive(Debug, Serialize)]
struct Record<'a, T: Serialize> {
    date: DateTime<Utc>,
    phase: Phase,
    event: HookEvent,
    context: &'a Context,
    data: T,
}

#[derive(Debug, Serialize)]
struct Change<'a, T: Serialize> {
    old: &'a T,
    new: &'a T,
}

// ===== impl RecorderDriver =====

impl RecorderDriver {
    // Creates a recorder writing to `<dir>/holo-bgpvpn-<name>.jsonl`. An
    // existing file is truncated.
    pub fn new(name: &str, config: &Config) -> std::io::Result<RecorderDriver> {
        let path = format!("{}/holo-bgpvpn-{}.jsonl", config.dir, name);
        let file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(RecorderDriver(file))
    }

    fn record<T>(
        &mut self,
        phase: Phase,
        event: HookEvent,
        cxt: &Context,
        data: T,
    ) -> HookResult
    where
        T: Serialize,
    {
        let record = Record {
            date: Utc::now(),
            phase,
            event,
            context: cxt,
            data,
        };
        match serde_json::to_string(&record) {
            Ok(line) => {
                if let Err(error) = writeln!(self.0, "{line}") {
                    warn!(%error, "couldn't write to file");
                }
            }
            Err(error) => {
                warn!(%error, "couldn't encode record");
            }
        }

        Ok(())
    }
}

impl Driver for RecorderDriver {
    fn create_bgpvpn_precommit(
        &mut self,
        cxt: &Context,
        bgpvpn: &Bgpvpn,
    ) -> HookResult {
        self.record(Phase::Precommit, HookEvent::CreateBgpvpn, cxt, bgpvpn)
    }

    fn create_bgpvpn_postcommit(
        &mut self,
        cxt: &Context,
        bgpvpn: &Bgpvpn,
    ) -> HookResult {
        self.record(Phase::Postcommit, HookEvent::CreateBgpvpn, cxt, bgpvpn)
    }

    fn update_bgpvpn_precommit(
        &mut self,
        cxt: &Context,
        old: &Bgpvpn,
        new: &Bgpvpn,
    ) -> HookResult {
        let change = Change { old, new };
        self.record(Phase::Precommit, HookEvent::UpdateBgpvpn, cxt, change)
    }

    fn update_bgpvpn_postcommit(
        &mut self,
        cxt: &Context,
        old: &Bgpvpn,
        new: &Bgpvpn,
    ) -> HookResult {
        let change = Change { old, new };
        self.record(Phase::Postcommit, HookEvent::UpdateBgpvpn, cxt, change)
    }

    fn delete_bgpvpn_precommit(
        &mut self,
        cxt: &Context,
        bgpvpn: &Bgpvpn,
    ) -> HookResult {
        self.record(Phase::Precommit, HookEvent::DeleteBgpvpn, cxt, bgpvpn)
    }

    fn delete_bgpvpn_postcommit(
        &mut self,
        cxt: &Context,
        bgpvpn: &Bgpvpn,
    ) -> HookResult {
        self.record(Phase::Postcommit, HookEvent::DeleteBgpvpn, cxt, bgpvpn)
    }

    fn create_net_assoc_precommit(
        &mut self,
        cxt: &Context,
        assoc: &NetAssoc,
    ) -> HookResult {
        self.record(Phase::Precommit, HookEvent::CreateNetAssoc, cxt, assoc)
    }

    fn create_net_assoc_postcommit(
        &mut self,
        cxt: &Context,
        assoc: &NetAssoc,
    ) -> HookResult {
        self.record(Phase::Postcommit, HookEvent::CreateNetAssoc, cxt, assoc)
    }

    fn update_net_assoc_precommit(
        &mut self,
        cxt: &Context,
        old: &NetAssoc,
        new: &NetAssoc,
    ) -> HookResult {
        let change = Change { old, new };
        self.record(Phase::Precommit, HookEvent::UpdateNetAssoc, cxt, change)
    }

    fn update_net_assoc_postcommit(
        &mut self,
        cxt: &Context,
        old: &NetAssoc,
        new: &NetAssoc,
    ) -> HookResult {
        let change = Change { old, new };
        self.record(Phase::Postcommit, HookEvent::UpdateNetAssoc, cxt, change)
    }

    fn delete_net_assoc_precommit(
        &mut self,
        cxt: &Context,
        assoc: &NetAssoc,
    ) -> HookResult {
        self.record(Phase::Precommit, HookEvent::DeleteNetAssoc, cxt, assoc)
    }

    fn delete_net_assoc_postcommit(
        &mut self,
        cxt: &Context,
        assoc: &NetAssoc,
    ) -> HookResult {
        self.record(Phase::Postcommit, HookEvent::DeleteNetAssoc, cxt, assoc)
    }

    fn create_router_assoc_precommit(
        &mut self,
        cxt: &Context,
        assoc: &RouterAssoc,
    ) -> HookResult {
        let event = HookEvent::CreateRouterAssoc;
        self.record(Phase::Precommit, event, cxt, assoc)
    }

    fn create_router_assoc_postcommit(
        &mut self,
        cxt: &Context,
        assoc: &RouterAssoc,
    ) -> HookResult {
        let event = HookEvent::CreateRouterAssoc;
        self.record(Phase::Postcommit, event, cxt, assoc)
    }

    fn update_router_assoc_precommit(
        &mut self,
        cxt: &Context,
        old: &RouterAssoc,
        new: &RouterAssoc,
    ) -> HookResult {
        let change = Change { old, new };
        let event = HookEvent::UpdateRouterAssoc;
        self.record(Phase::Precommit, event, cxt, change)
    }

    fn update_router_assoc_postcommit(
        &mut self,
        cxt: &Context,
        old: &RouterAssoc,
        new: &RouterAssoc,
    ) -> HookResult {
        let change = Change { old, new };
        let event = HookEvent::UpdateRouterAssoc;
        self.record(Phase::Postcommit, event, cxt, change)
    }

    fn delete_router_assoc_precommit(
        &mut self,
        cxt: &Context,
        assoc: &RouterAssoc,
    ) -> HookResult {
        let event = HookEvent::DeleteRouterAssoc;
        self.record(Phase::Precommit, event, cxt, assoc)
    }

    fn delete_router_assoc_postcommit(
        &mut self,
        cxt: &Context,
        assoc: &RouterAssoc,
    ) -> HookResult {
        let event = HookEvent::DeleteRouterAssoc;
        self.record(Phase::Postcommit, event, cxt, assoc)
    }
}

// ===== impl Config =====

impl Default for Config {
    fn default() -> Config {
        Config {
            dir: "/var/opt/holo".to_owned(),
        }
    }
}

// ===== unit tests =====
