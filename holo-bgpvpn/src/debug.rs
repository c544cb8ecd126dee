//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use tracing::{debug, debug_span, trace, trace_span};
use uuid::Uuid;

use crate::api::Operation;
use crate::driver::{HookEvent, Phase};
use crate::model::{AssocKind, Bgpvpn};

// BGPVPN debug messages.
#[derive(Debug)]
pub enum Debug<'a> {
    RequestRx(&'a Operation),
    BgpvpnCreate(&'a Bgpvpn),
    BgpvpnUpdate(&'a Bgpvpn),
    BgpvpnDelete(&'a Bgpvpn),
    BgpvpnDeleteRepeated(&'a Uuid),
    AssocCreate(AssocKind, &'a Uuid, &'a Uuid),
    AssocUpdate(AssocKind, &'a Uuid),
    AssocDelete(AssocKind, &'a Uuid, &'a Uuid),
    AssocDeleteRepeated(AssocKind, &'a Uuid),
    DriverHook(Phase, HookEvent, &'a str),
    StoreLoad(usize, usize, usize),
}

// ===== impl Debug =====

impl Debug<'_> {
    pub(crate) fn log(&self) {
        match self {
            Debug::RequestRx(operation) => {
                trace_span!("plugin").in_scope(|| {
                    trace!(?operation, "{}", self);
                });
            }
            Debug::BgpvpnCreate(bgpvpn)
            | Debug::BgpvpnUpdate(bgpvpn)
            | Debug::BgpvpnDelete(bgpvpn) => {
                debug_span!("bgpvpn", id = %bgpvpn.id).in_scope(|| {
                    debug!(tenant_id = %bgpvpn.tenant_id, name = %bgpvpn.name,
                        "{}", self);
                });
            }
            Debug::BgpvpnDeleteRepeated(id) => {
                debug_span!("bgpvpn", %id).in_scope(|| {
                    debug!("{}", self);
                });
            }
            Debug::AssocCreate(kind, bgpvpn_id, resource_id)
            | Debug::AssocDelete(kind, bgpvpn_id, resource_id) => {
                debug_span!("bgpvpn", id = %bgpvpn_id).in_scope(|| {
                    debug!(%kind, %resource_id, "{}", self);
                });
            }
            Debug::AssocUpdate(kind, id)
            | Debug::AssocDeleteRepeated(kind, id) => {
                debug!(%kind, %id, "{}", self);
            }
            Debug::DriverHook(phase, event, driver) => {
                trace!(?phase, %event, %driver, "{}", self);
            }
            Debug::StoreLoad(bgpvpns, net_assocs, router_assocs) => {
                debug!(%bgpvpns, %net_assocs, %router_assocs, "{}", self);
            }
        }
    }
}

impl std::fmt::Display for Debug<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Debug::RequestRx(..) => {
                write!(f, "received request")
            }
            Debug::BgpvpnCreate(..) => {
                write!(f, "BGPVPN created")
            }
            Debug::BgpvpnUpdate(..) => {
                write!(f, "BGPVPN updated")
            }
            Debug::BgpvpnDelete(..) => {
                write!(f, "BGPVPN deleted")
            }
            Debug::BgpvpnDeleteRepeated(..) => {
                write!(f, "BGPVPN already deleted, nothing to do")
            }
            Debug::AssocCreate(..) => {
                write!(f, "association created")
            }
            Debug::AssocUpdate(..) => {
                write!(f, "association updated")
            }
            Debug::AssocDelete(..) => {
                write!(f, "association deleted")
            }
            Debug::AssocDeleteRepeated(..) => {
                write!(f, "association already deleted, nothing to do")
            }
            Debug::DriverHook(..) => {
                write!(f, "invoking driver hook")
            }
            Debug::StoreLoad(..) => {
                write!(f, "loaded resources from non-volatile storage")
            }
        }
    }
}
