//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use uuid::Uuid;

use crate::model::ExternalResource;

// Lookup of the networks and routers that BGPVPNs can be associated with.
// These resources are owned by the hosting framework; this service only
// reads them.
pub trait ResourceRegistry: Send {
    fn get_network(&self, id: Uuid) -> Option<ExternalResource>;

    fn get_router(&self, id: Uuid) -> Option<ExternalResource>;
}

// Registry backed by an in-memory table. Clones share the same table, so the
// owner of a handle can keep adding resources after the registry was handed
// over to the plugin.
#[derive(Clone, Debug, Default)]
pub struct StaticRegistry {
    inner: Arc<RwLock<StaticRegistryInner>>,
}

#[derive(Debug, Default)]
struct StaticRegistryInner {
    networks: BTreeMap<Uuid, ExternalResource>,
    routers: BTreeMap<Uuid, ExternalResource>,
}

// ===== impl StaticRegistry =====

impl StaticRegistry {
    pub fn new(
        networks: impl IntoIterator<Item = ExternalResource>,
        routers: impl IntoIterator<Item = ExternalResource>,
    ) -> StaticRegistry {
        let registry = StaticRegistry::default();
        for network in networks {
            registry.add_network(network);
        }
        for router in routers {
            registry.add_router(router);
        }
        registry
    }

    pub fn add_network(&self, network: ExternalResource) {
        let mut inner = self.inner.write().unwrap();
        inner.networks.insert(network.id, network);
    }

    pub fn add_router(&self, router: ExternalResource) {
        let mut inner = self.inner.write().unwrap();
        inner.routers.insert(router.id, router);
    }

    pub fn remove_network(&self, id: Uuid) -> Option<ExternalResource> {
        let mut inner = self.inner.write().unwrap();
        inner.networks.remove(&id)
    }

    pub fn remove_router(&self, id: Uuid) -> Option<ExternalResource> {
        let mut inner = self.inner.write().unwrap();
        inner.routers.remove(&id)
    }
}

impl ResourceRegistry for StaticRegistry {
    fn get_network(&self, id: Uuid) -> Option<ExternalResource> {
        let inner = self.inner.read().unwrap();
        inner.networks.get(&id).cloned()
    }

    fn get_router(&self, id: Uuid) -> Option<ExternalResource> {
        let inner = self.inner.read().unwrap();
        inner.routers.get(&id).cloned()
    }
}
