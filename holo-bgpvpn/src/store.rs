//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeMap;

use itertools::Itertools;
use pickledb::PickleDb;
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::debug::Debug;
use crate::error::{Error, Result};
use crate::model::{Association, Bgpvpn, NetAssoc, ResourceKind, RouterAssoc};

pub type AssocTable<A> = BTreeMap<Uuid, A>;

// Persistent state of the BGPVPN service.
//
// The in-memory tables are authoritative for reads. When a database is
// attached, every mutation is written to it first and only applied to the
// in-memory tables if the write succeeded.
#[derive(Default)]
pub struct Store {
    db: Option<PickleDb>,
    bgpvpns: BTreeMap<Uuid, Bgpvpn>,
    net_assocs: AssocTable<NetAssoc>,
    router_assocs: AssocTable<RouterAssoc>,
    // Resources deleted since startup, indexed by ID.
    deleted: BTreeMap<Uuid, Tombstone>,
}

// Trace left by a deleted resource, used to answer repeated deletes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Tombstone {
    pub kind: ResourceKind,
    // Parent BGPVPN. For a BGPVPN, its own ID.
    pub bgpvpn_id: Uuid,
    // Tenant owning the BGPVPN.
    pub tenant_id: String,
}

// Access to the table holding a given association kind.
pub(crate) trait AssocStorage: Association {
    const KEY_PREFIX: &'static str;

    fn table(store: &Store) -> &AssocTable<Self>;

    fn table_mut(store: &mut Store) -> &mut AssocTable<Self>;
}

// ===== impl Store =====

impl Store {
    pub fn new() -> Store {
        Default::default()
    }

    // Creates a store backed by the given database, loading all resources
    // previously saved to it.
    pub fn with_db(db: PickleDb) -> Store {
        let mut store = Store::default();

        for entry in db.iter() {
            let key = entry.get_key();
            let Some((prefix, _)) = key.split_once('/') else {
                continue;
            };
            let loaded = match prefix {
                "bgpvpn" => entry.get_value::<Bgpvpn>().map(|bgpvpn| {
                    store.bgpvpns.insert(bgpvpn.id, bgpvpn);
                }),
                prefix if prefix == NetAssoc::KEY_PREFIX => {
                    entry.get_value::<NetAssoc>().map(|assoc| {
                        store.net_assocs.insert(assoc.id, assoc);
                    })
                }
                prefix if prefix == RouterAssoc::KEY_PREFIX => {
                    entry.get_value::<RouterAssoc>().map(|assoc| {
                        store.router_assocs.insert(assoc.id, assoc);
                    })
                }
                _ => continue,
            };
            if loaded.is_none() {
                warn!(%key, "failed to decode stored resource");
            }
        }

        Debug::StoreLoad(
            store.bgpvpns.len(),
            store.net_assocs.len(),
            store.router_assocs.len(),
        )
        .log();

        store.db = Some(db);
        store
    }

    // Returns the tombstone of a resource deleted since startup.
    pub fn tombstone(&self, id: &Uuid) -> Option<&Tombstone> {
        self.deleted.get(id)
    }

    pub fn create_bgpvpn(&mut self, bgpvpn: Bgpvpn) -> Result<Bgpvpn> {
        if self.bgpvpns.contains_key(&bgpvpn.id) {
            return Err(Error::Conflict(format!(
                "BGPVPN {} already exists",
                bgpvpn.id
            )));
        }

        self.persist(bgpvpn_key(&bgpvpn.id), &bgpvpn)?;
        let id = bgpvpn.id;
        self.bgpvpns.insert(id, bgpvpn);
        self.get_bgpvpn(&id)
    }

    // Returns the BGPVPN with its associated networks and routers.
    pub fn get_bgpvpn(&self, id: &Uuid) -> Result<Bgpvpn> {
        self.bgpvpns
            .get(id)
            .map(|bgpvpn| self.bgpvpn_view(bgpvpn))
            .ok_or_else(|| {
                Error::NotFound(ResourceKind::Bgpvpn, id.to_string())
            })
    }

    pub fn list_bgpvpns(&self) -> Vec<Bgpvpn> {
        self.bgpvpns
            .values()
            .map(|bgpvpn| self.bgpvpn_view(bgpvpn))
            .collect()
    }

    pub fn update_bgpvpn(&mut self, bgpvpn: Bgpvpn) -> Result<Bgpvpn> {
        if !self.bgpvpns.contains_key(&bgpvpn.id) {
            return Err(Error::NotFound(
                ResourceKind::Bgpvpn,
                bgpvpn.id.to_string(),
            ));
        }

        let bgpvpn = Bgpvpn {
            networks: vec![],
            routers: vec![],
            ..bgpvpn
        };
        self.persist(bgpvpn_key(&bgpvpn.id), &bgpvpn)?;
        let id = bgpvpn.id;
        self.bgpvpns.insert(id, bgpvpn);
        self.get_bgpvpn(&id)
    }

    // Removes the BGPVPN. Its associations are expected to have been removed
    // beforehand.
    pub fn delete_bgpvpn(&mut self, id: &Uuid) -> Result<Bgpvpn> {
        let bgpvpn = self.get_bgpvpn(id)?;

        self.unpersist(bgpvpn_key(id))?;
        self.bgpvpns.remove(id);

        // The tombstones of the BGPVPN's associations are no longer needed,
        // as their parent is gone.
        self.deleted.retain(|_, tombstone| tombstone.bgpvpn_id != *id);
        self.deleted.insert(
            *id,
            Tombstone {
                kind: ResourceKind::Bgpvpn,
                bgpvpn_id: *id,
                tenant_id: bgpvpn.tenant_id.clone(),
            },
        );
        Ok(bgpvpn)
    }

    // Checks that the network or router isn't associated to the BGPVPN yet.
    pub(crate) fn check_assoc_unique<A>(
        &self,
        bgpvpn_id: &Uuid,
        resource_id: &Uuid,
    ) -> Result<()>
    where
        A: AssocStorage,
    {
        let exists = A::table(self).values().any(|assoc| {
            assoc.bgpvpn_id() == *bgpvpn_id
                && assoc.resource_id() == *resource_id
        });
        if exists {
            return Err(Error::Conflict(format!(
                "{} {} is already associated to BGPVPN {}",
                A::KIND,
                resource_id,
                bgpvpn_id
            )));
        }

        Ok(())
    }

    pub(crate) fn create_assoc<A>(&mut self, assoc: A) -> Result<A>
    where
        A: AssocStorage,
    {
        self.get_bgpvpn(&assoc.bgpvpn_id())?;
        self.check_assoc_unique::<A>(&assoc.bgpvpn_id(), &assoc.resource_id())?;

        self.persist(assoc_key::<A>(&assoc.id()), &assoc)?;
        A::table_mut(self).insert(assoc.id(), assoc.clone());
        Ok(assoc)
    }

    // Returns the association, provided that it belongs to the given BGPVPN.
    pub(crate) fn get_assoc<A>(&self, id: &Uuid, bgpvpn_id: &Uuid) -> Result<A>
    where
        A: AssocStorage,
    {
        A::table(self)
            .get(id)
            .filter(|assoc| assoc.bgpvpn_id() == *bgpvpn_id)
            .cloned()
            .ok_or_else(|| {
                Error::NotFound(A::KIND.resource_kind(), id.to_string())
            })
    }

    pub(crate) fn list_assocs<A>(&self, bgpvpn_id: &Uuid) -> Result<Vec<A>>
    where
        A: AssocStorage,
    {
        self.get_bgpvpn(bgpvpn_id)?;
        let assocs = A::table(self)
            .values()
            .filter(|assoc| assoc.bgpvpn_id() == *bgpvpn_id)
            .cloned()
            .collect();
        Ok(assocs)
    }

    pub(crate) fn update_assoc<A>(&mut self, assoc: A) -> Result<A>
    where
        A: AssocStorage,
    {
        self.get_assoc::<A>(&assoc.id(), &assoc.bgpvpn_id())?;

        self.persist(assoc_key::<A>(&assoc.id()), &assoc)?;
        A::table_mut(self).insert(assoc.id(), assoc.clone());
        Ok(assoc)
    }

    pub(crate) fn delete_assoc<A>(
        &mut self,
        id: &Uuid,
        bgpvpn_id: &Uuid,
    ) -> Result<A>
    where
        A: AssocStorage,
    {
        let assoc = self.get_assoc::<A>(id, bgpvpn_id)?;
        let tenant_id = self.get_bgpvpn(bgpvpn_id)?.tenant_id;

        self.unpersist(assoc_key::<A>(id))?;
        A::table_mut(self).remove(id);
        self.deleted.insert(
            *id,
            Tombstone {
                kind: A::KIND.resource_kind(),
                bgpvpn_id: *bgpvpn_id,
                tenant_id,
            },
        );
        Ok(assoc)
    }

    fn bgpvpn_view(&self, bgpvpn: &Bgpvpn) -> Bgpvpn {
        let networks = associated_resources(&self.net_assocs, &bgpvpn.id);
        let routers = associated_resources(&self.router_assocs, &bgpvpn.id);
        Bgpvpn {
            networks,
            routers,
            ..bgpvpn.clone()
        }
    }

    fn persist<T>(&mut self, key: String, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        if let Some(db) = &mut self.db {
            db.set(&key, value)?;
        }
        Ok(())
    }

    fn unpersist(&mut self, key: String) -> Result<()> {
        if let Some(db) = &mut self.db {
            db.rem(&key)?;
        }
        Ok(())
    }
}

// ===== impl NetAssoc =====

impl AssocStorage for NetAssoc {
    const KEY_PREFIX: &'static str = "net-assoc";

    fn table(store: &Store) -> &AssocTable<Self> {
        &store.net_assocs
    }

    fn table_mut(store: &mut Store) -> &mut AssocTable<Self> {
        &mut store.net_assocs
    }
}

// ===== impl RouterAssoc =====

impl AssocStorage for RouterAssoc {
    const KEY_PREFIX: &'static str = "router-assoc";

    fn table(store: &Store) -> &AssocTable<Self> {
        &store.router_assocs
    }

    fn table_mut(store: &mut Store) -> &mut AssocTable<Self> {
        &mut store.router_assocs
    }
}

// ===== helper functions =====

fn bgpvpn_key(id: &Uuid) -> String {
    format!("bgpvpn/{}", id)
}

fn assoc_key<A: AssocStorage>(id: &Uuid) -> String {
    format!("{}/{}", A::KEY_PREFIX, id)
}

fn associated_resources<A: Association>(
    table: &AssocTable<A>,
    bgpvpn_id: &Uuid,
) -> Vec<Uuid> {
    table
        .values()
        .filter(|assoc| assoc.bgpvpn_id() == *bgpvpn_id)
        .map(|assoc| assoc.resource_id())
        .sorted()
        .collect()
}

// ===== unit tests =====
