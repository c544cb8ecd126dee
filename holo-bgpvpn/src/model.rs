//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use derive_new::new;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Requester identity, resolved by the hosting layer.
#[derive(Clone, Debug, Eq, PartialEq, new)]
#[derive(Deserialize, Serialize)]
pub struct Context {
    pub tenant_id: String,
    #[new(default)]
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VpnType {
    L2,
    #[default]
    L3,
}

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssocKind {
    Network,
    Router,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResourceKind {
    Bgpvpn,
    NetAssoc,
    RouterAssoc,
    Network,
    Router,
}

/// BGP VPN resource.
///
/// The `networks` and `routers` lists are derived from the associations of
/// the BGPVPN. They are recomputed by the store on every read and are never
/// persisted.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct Bgpvpn {
    pub id: Uuid,
    pub tenant_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub vpn_type: VpnType,
    pub route_targets: Vec<String>,
    pub import_targets: Vec<String>,
    pub export_targets: Vec<String>,
    pub route_distinguishers: Vec<String>,
    pub auto_aggregate: bool,
    #[serde(default)]
    pub networks: Vec<Uuid>,
    #[serde(default)]
    pub routers: Vec<Uuid>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct NetAssoc {
    pub id: Uuid,
    pub bgpvpn_id: Uuid,
    pub network_id: Uuid,
    pub tenant_id: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct RouterAssoc {
    pub id: Uuid,
    pub bgpvpn_id: Uuid,
    pub router_id: Uuid,
    pub tenant_id: String,
    pub advertise_extra_routes: bool,
}

// Network or router managed outside of this service.
#[derive(Clone, Debug, Eq, PartialEq, new)]
#[derive(Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalResource {
    pub id: Uuid,
    pub tenant_id: String,
}

//
// Request bodies.
//
// Fields left out of a request body are `None`. Unknown fields (including
// the immutable ones on update) are rejected when the body is parsed.
//

#[derive(Clone, Debug, Default)]
#[derive(Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BgpvpnCreate {
    pub tenant_id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub vpn_type: Option<VpnType>,
    pub route_targets: Option<Vec<String>>,
    pub import_targets: Option<Vec<String>>,
    pub export_targets: Option<Vec<String>>,
    pub route_distinguishers: Option<Vec<String>>,
    pub auto_aggregate: Option<bool>,
}

#[derive(Clone, Debug, Default)]
#[derive(Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BgpvpnUpdate {
    pub name: Option<String>,
    pub route_targets: Option<Vec<String>>,
    pub import_targets: Option<Vec<String>>,
    pub export_targets: Option<Vec<String>>,
    pub route_distinguishers: Option<Vec<String>>,
    pub auto_aggregate: Option<bool>,
}

#[derive(Clone, Debug, Default)]
#[derive(Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NetAssocCreate {
    pub network_id: Option<Uuid>,
    pub tenant_id: Option<String>,
}

// Network associations don't have mutable attributes.
#[derive(Clone, Debug, Default)]
#[derive(Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NetAssocUpdate {}

#[derive(Clone, Debug, Default)]
#[derive(Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RouterAssocCreate {
    pub router_id: Option<Uuid>,
    pub tenant_id: Option<String>,
    pub advertise_extra_routes: Option<bool>,
}

#[derive(Clone, Debug, Default)]
#[derive(Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RouterAssocUpdate {
    pub advertise_extra_routes: Option<bool>,
}

// Common view over network and router associations.
pub trait Association:
    Clone + std::fmt::Debug + Serialize + DeserializeOwned + Send + 'static
{
    const KIND: AssocKind;

    fn id(&self) -> Uuid;

    fn bgpvpn_id(&self) -> Uuid;

    // ID of the associated network or router.
    fn resource_id(&self) -> Uuid;

    fn tenant_id(&self) -> &str;
}

// ===== impl Context =====

impl Context {
    pub fn admin(tenant_id: impl Into<String>) -> Context {
        Context {
            tenant_id: tenant_id.into(),
            is_admin: true,
        }
    }
}

// ===== impl AssocKind =====

impl AssocKind {
    // Name of the request/response envelope for a single association.
    pub fn resource_name(&self) -> &'static str {
        match self {
            AssocKind::Network => "network_association",
            AssocKind::Router => "router_association",
        }
    }

    // Name of the response envelope for a list of associations.
    pub fn collection_name(&self) -> &'static str {
        match self {
            AssocKind::Network => "network_associations",
            AssocKind::Router => "router_associations",
        }
    }

    pub(crate) fn resource_kind(&self) -> ResourceKind {
        match self {
            AssocKind::Network => ResourceKind::NetAssoc,
            AssocKind::Router => ResourceKind::RouterAssoc,
        }
    }
}

impl std::fmt::Display for AssocKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssocKind::Network => write!(f, "network"),
            AssocKind::Router => write!(f, "router"),
        }
    }
}

// ===== impl ResourceKind =====

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Bgpvpn => write!(f, "BGPVPN"),
            ResourceKind::NetAssoc => write!(f, "network association"),
            ResourceKind::RouterAssoc => write!(f, "router association"),
            ResourceKind::Network => write!(f, "network"),
            ResourceKind::Router => write!(f, "router"),
        }
    }
}

// ===== impl Bgpvpn =====

impl Bgpvpn {
    // Builds a new BGPVPN out of a creation request. Omitted attributes are
    // set to their default values.
    pub(crate) fn from_request(
        tenant_id: String,
        request: BgpvpnCreate,
    ) -> Bgpvpn {
        Bgpvpn {
            id: Uuid::new_v4(),
            tenant_id,
            name: request.name.unwrap_or_default(),
            vpn_type: request.vpn_type.unwrap_or_default(),
            route_targets: request.route_targets.unwrap_or_default(),
            import_targets: request.import_targets.unwrap_or_default(),
            export_targets: request.export_targets.unwrap_or_default(),
            route_distinguishers: request
                .route_distinguishers
                .unwrap_or_default(),
            auto_aggregate: request.auto_aggregate.unwrap_or(false),
            networks: vec![],
            routers: vec![],
        }
    }

    // Returns a copy of the BGPVPN with the attributes present in the update
    // request replaced.
    pub(crate) fn updated(&self, request: BgpvpnUpdate) -> Bgpvpn {
        let mut bgpvpn = self.clone();
        if let Some(name) = request.name {
            bgpvpn.name = name;
        }
        if let Some(route_targets) = request.route_targets {
            bgpvpn.route_targets = route_targets;
        }
        if let Some(import_targets) = request.import_targets {
            bgpvpn.import_targets = import_targets;
        }
        if let Some(export_targets) = request.export_targets {
            bgpvpn.export_targets = export_targets;
        }
        if let Some(route_distinguishers) = request.route_distinguishers {
            bgpvpn.route_distinguishers = route_distinguishers;
        }
        if let Some(auto_aggregate) = request.auto_aggregate {
            bgpvpn.auto_aggregate = auto_aggregate;
        }
        bgpvpn
    }
}

// ===== impl NetAssoc =====

impl Association for NetAssoc {
    const KIND: AssocKind = AssocKind::Network;

    fn id(&self) -> Uuid {
        self.id
    }

    fn bgpvpn_id(&self) -> Uuid {
        self.bgpvpn_id
    }

    fn resource_id(&self) -> Uuid {
        self.network_id
    }

    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }
}

// ===== impl RouterAssoc =====

impl RouterAssoc {
    pub(crate) fn updated(&self, request: RouterAssocUpdate) -> RouterAssoc {
        let mut assoc = self.clone();
        if let Some(advertise_extra_routes) = request.advertise_extra_routes {
            assoc.advertise_extra_routes = advertise_extra_routes;
        }
        assoc
    }
}

impl Association for RouterAssoc {
    const KIND: AssocKind = AssocKind::Router;

    fn id(&self) -> Uuid {
        self.id
    }

    fn bgpvpn_id(&self) -> Uuid {
        self.bgpvpn_id
    }

    fn resource_id(&self) -> Uuid {
        self.router_id
    }

    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }
}

// ===== unit tests =====
