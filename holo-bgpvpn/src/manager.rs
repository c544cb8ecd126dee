//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use tracing::warn;
use uuid::Uuid;

use crate::debug::Debug;
use crate::driver::{AssocHooks, DriverRegistry, HookEvent};
use crate::error::{DriverError, Error, Result};
use crate::model::{
    Bgpvpn, BgpvpnCreate, BgpvpnUpdate, Context, NetAssoc, NetAssocCreate,
    NetAssocUpdate, ResourceKind, RouterAssoc, RouterAssocCreate,
    RouterAssocUpdate,
};
use crate::registry::ResourceRegistry;
use crate::store::{AssocStorage, Store};
use crate::validator;

// Runs every change through validation, driver precommit hooks, the store
// and driver postcommit hooks, in that order.
pub struct AssociationManager {
    store: Store,
    resources: Box<dyn ResourceRegistry>,
    drivers: DriverRegistry,
}

// Result of an operation that reached the store. Postcommit failures don't
// undo the change and are reported as warnings instead.
#[derive(Clone, Debug)]
pub struct Committed<T> {
    pub data: T,
    pub warnings: Vec<DriverError>,
}

// Association kinds handled by the manager.
pub(crate) trait ManagedAssoc: AssocStorage + AssocHooks {}

impl<A> ManagedAssoc for A where A: AssocStorage + AssocHooks {}

// ===== impl AssociationManager =====

impl AssociationManager {
    pub fn new(
        store: Store,
        resources: Box<dyn ResourceRegistry>,
        drivers: DriverRegistry,
    ) -> AssociationManager {
        AssociationManager {
            store,
            resources,
            drivers,
        }
    }

    pub fn drivers(&self) -> &DriverRegistry {
        &self.drivers
    }

    pub fn create_bgpvpn(
        &mut self,
        cxt: &Context,
        request: BgpvpnCreate,
    ) -> Result<Committed<Bgpvpn>> {
        // Only administrators can create resources on behalf of other
        // tenants.
        let tenant_id = request
            .tenant_id
            .clone()
            .unwrap_or_else(|| cxt.tenant_id.clone());
        validator::check_tenant_access(cxt, &tenant_id)?;
        validate_bgpvpn_targets(
            request.route_targets.as_deref(),
            request.import_targets.as_deref(),
            request.export_targets.as_deref(),
            request.route_distinguishers.as_deref(),
        )?;

        let bgpvpn = Bgpvpn::from_request(tenant_id, request);
        self.drivers.precommit(HookEvent::CreateBgpvpn, |driver| {
            driver.create_bgpvpn_precommit(cxt, &bgpvpn)
        })?;

        let bgpvpn = self.store.create_bgpvpn(bgpvpn)?;
        Debug::BgpvpnCreate(&bgpvpn).log();

        let warnings =
            self.drivers.postcommit(HookEvent::CreateBgpvpn, |driver| {
                driver.create_bgpvpn_postcommit(cxt, &bgpvpn)
            });
        Ok(Committed::new(bgpvpn, warnings))
    }

    pub fn get_bgpvpn(&self, cxt: &Context, id: &Uuid) -> Result<Bgpvpn> {
        let bgpvpn = self.store.get_bgpvpn(id)?;
        validator::check_bgpvpn_owner(cxt, &bgpvpn)?;
        Ok(bgpvpn)
    }

    // Returns the BGPVPNs visible to the requester.
    pub fn list_bgpvpns(&self, cxt: &Context) -> Vec<Bgpvpn> {
        self.store
            .list_bgpvpns()
            .into_iter()
            .filter(|bgpvpn| {
                validator::check_bgpvpn_owner(cxt, bgpvpn).is_ok()
            })
            .collect()
    }

    pub fn update_bgpvpn(
        &mut self,
        cxt: &Context,
        id: &Uuid,
        request: BgpvpnUpdate,
    ) -> Result<Committed<Bgpvpn>> {
        let old = self.get_bgpvpn(cxt, id)?;
        validate_bgpvpn_targets(
            request.route_targets.as_deref(),
            request.import_targets.as_deref(),
            request.export_targets.as_deref(),
            request.route_distinguishers.as_deref(),
        )?;

        let new = old.updated(request);
        self.drivers.precommit(HookEvent::UpdateBgpvpn, |driver| {
            driver.update_bgpvpn_precommit(cxt, &old, &new)
        })?;

        let new = self.store.update_bgpvpn(new)?;
        Debug::BgpvpnUpdate(&new).log();

        let warnings =
            self.drivers.postcommit(HookEvent::UpdateBgpvpn, |driver| {
                driver.update_bgpvpn_postcommit(cxt, &old, &new)
            });
        Ok(Committed::new(new, warnings))
    }

    // Deletes the BGPVPN along with all of its associations.
    //
    // The precommit hooks of the BGPVPN and of all its associations run
    // before anything is removed, so any driver can still veto the whole
    // operation.
    pub fn delete_bgpvpn(
        &mut self,
        cxt: &Context,
        id: &Uuid,
    ) -> Result<Committed<()>> {
        if self.is_deleted(cxt, id, ResourceKind::Bgpvpn, id)? {
            Debug::BgpvpnDeleteRepeated(id).log();
            return Ok(Committed::new((), vec![]));
        }

        let bgpvpn = self.get_bgpvpn(cxt, id)?;
        let net_assocs = self.store.list_assocs::<NetAssoc>(id)?;
        let router_assocs = self.store.list_assocs::<RouterAssoc>(id)?;

        self.drivers.precommit(HookEvent::DeleteBgpvpn, |driver| {
            driver.delete_bgpvpn_precommit(cxt, &bgpvpn)
        })?;
        for assoc in &net_assocs {
            self.drivers.precommit(HookEvent::DeleteNetAssoc, |driver| {
                driver.delete_net_assoc_precommit(cxt, assoc)
            })?;
        }
        for assoc in &router_assocs {
            self.drivers.precommit(HookEvent::DeleteRouterAssoc, |driver| {
                driver.delete_router_assoc_precommit(cxt, assoc)
            })?;
        }

        let mut warnings = vec![];
        let result = self.remove_bgpvpn(
            cxt,
            id,
            &net_assocs,
            &router_assocs,
            &mut warnings,
        );
        if let Err(error) = result {
            // The associations removed so far stay removed.
            for warning in &warnings {
                warn!(%id, %warning, "BGPVPN delete aborted");
            }
            return Err(error);
        }

        Ok(Committed::new((), warnings))
    }

    pub fn create_net_assoc(
        &mut self,
        cxt: &Context,
        bgpvpn_id: &Uuid,
        request: NetAssocCreate,
    ) -> Result<Committed<NetAssoc>> {
        self.get_bgpvpn(cxt, bgpvpn_id)?;
        let network = validator::validate_network_reference(
            cxt,
            self.resources.as_ref(),
            &request,
        )?;
        let tenant_id = request
            .tenant_id
            .unwrap_or_else(|| cxt.tenant_id.clone());
        validator::check_tenant_access(cxt, &tenant_id)?;

        let assoc = NetAssoc {
            id: Uuid::new_v4(),
            bgpvpn_id: *bgpvpn_id,
            network_id: network.id,
            tenant_id,
        };
        self.create_assoc(cxt, assoc)
    }

    pub fn create_router_assoc(
        &mut self,
        cxt: &Context,
        bgpvpn_id: &Uuid,
        request: RouterAssocCreate,
    ) -> Result<Committed<RouterAssoc>> {
        self.get_bgpvpn(cxt, bgpvpn_id)?;
        let router = validator::validate_router_reference(
            cxt,
            self.resources.as_ref(),
            &request,
        )?;
        let tenant_id = request
            .tenant_id
            .unwrap_or_else(|| cxt.tenant_id.clone());
        validator::check_tenant_access(cxt, &tenant_id)?;

        let assoc = RouterAssoc {
            id: Uuid::new_v4(),
            bgpvpn_id: *bgpvpn_id,
            router_id: router.id,
            tenant_id,
            advertise_extra_routes: request
                .advertise_extra_routes
                .unwrap_or(true),
        };
        self.create_assoc(cxt, assoc)
    }

    pub fn update_net_assoc(
        &mut self,
        cxt: &Context,
        id: &Uuid,
        bgpvpn_id: &Uuid,
        _request: NetAssocUpdate,
    ) -> Result<Committed<NetAssoc>> {
        self.update_assoc(cxt, id, bgpvpn_id, NetAssoc::clone)
    }

    pub fn update_router_assoc(
        &mut self,
        cxt: &Context,
        id: &Uuid,
        bgpvpn_id: &Uuid,
        request: RouterAssocUpdate,
    ) -> Result<Committed<RouterAssoc>> {
        self.update_assoc(cxt, id, bgpvpn_id, |old: &RouterAssoc| {
            old.updated(request)
        })
    }

    pub(crate) fn get_assoc<A>(
        &self,
        cxt: &Context,
        id: &Uuid,
        bgpvpn_id: &Uuid,
    ) -> Result<A>
    where
        A: ManagedAssoc,
    {
        self.get_bgpvpn(cxt, bgpvpn_id)?;
        self.store.get_assoc(id, bgpvpn_id)
    }

    pub(crate) fn list_assocs<A>(
        &self,
        cxt: &Context,
        bgpvpn_id: &Uuid,
    ) -> Result<Vec<A>>
    where
        A: ManagedAssoc,
    {
        self.get_bgpvpn(cxt, bgpvpn_id)?;
        self.store.list_assocs(bgpvpn_id)
    }

    pub(crate) fn delete_assoc<A>(
        &mut self,
        cxt: &Context,
        id: &Uuid,
        bgpvpn_id: &Uuid,
    ) -> Result<Committed<()>>
    where
        A: ManagedAssoc,
    {
        let kind = A::KIND.resource_kind();
        if self.is_deleted(cxt, id, kind, bgpvpn_id)? {
            Debug::AssocDeleteRepeated(A::KIND, id).log();
            return Ok(Committed::new((), vec![]));
        }

        let assoc = self.get_assoc::<A>(cxt, id, bgpvpn_id)?;
        self.drivers.precommit(A::DELETE, |driver| {
            A::delete_precommit(driver, cxt, &assoc)
        })?;

        let warnings = self.remove_assoc(cxt, &assoc)?;
        Ok(Committed::new((), warnings))
    }

    fn create_assoc<A>(
        &mut self,
        cxt: &Context,
        assoc: A,
    ) -> Result<Committed<A>>
    where
        A: ManagedAssoc,
    {
        self.store
            .check_assoc_unique::<A>(&assoc.bgpvpn_id(), &assoc.resource_id())?;
        self.drivers.precommit(A::CREATE, |driver| {
            A::create_precommit(driver, cxt, &assoc)
        })?;

        let assoc = self.store.create_assoc(assoc)?;
        Debug::AssocCreate(A::KIND, &assoc.bgpvpn_id(), &assoc.resource_id())
            .log();

        let warnings = self.drivers.postcommit(A::CREATE, |driver| {
            A::create_postcommit(driver, cxt, &assoc)
        });
        Ok(Committed::new(assoc, warnings))
    }

    fn update_assoc<A, F>(
        &mut self,
        cxt: &Context,
        id: &Uuid,
        bgpvpn_id: &Uuid,
        update: F,
    ) -> Result<Committed<A>>
    where
        A: ManagedAssoc,
        F: FnOnce(&A) -> A,
    {
        let old = self.get_assoc::<A>(cxt, id, bgpvpn_id)?;
        let new = update(&old);
        self.drivers.precommit(A::UPDATE, |driver| {
            A::update_precommit(driver, cxt, &old, &new)
        })?;

        let new = self.store.update_assoc(new)?;
        Debug::AssocUpdate(A::KIND, id).log();

        let warnings = self.drivers.postcommit(A::UPDATE, |driver| {
            A::update_postcommit(driver, cxt, &old, &new)
        });
        Ok(Committed::new(new, warnings))
    }

    // Checks whether the resource was deleted by an earlier request, in which
    // case deleting it again is a no-op. The earlier delete must have been
    // for the same kind of resource under the same BGPVPN, and the requester
    // must still have access to it.
    fn is_deleted(
        &self,
        cxt: &Context,
        id: &Uuid,
        kind: ResourceKind,
        bgpvpn_id: &Uuid,
    ) -> Result<bool> {
        let Some(tombstone) = self.store.tombstone(id) else {
            return Ok(false);
        };
        if tombstone.kind != kind || tombstone.bgpvpn_id != *bgpvpn_id {
            return Err(Error::NotFound(kind, id.to_string()));
        }
        validator::check_tenant_access(cxt, &tombstone.tenant_id)?;

        Ok(true)
    }

    // Removes the associations and then the BGPVPN itself, once all their
    // precommit hooks passed. Postcommit failures are added to `warnings`.
    fn remove_bgpvpn(
        &mut self,
        cxt: &Context,
        id: &Uuid,
        net_assocs: &[NetAssoc],
        router_assocs: &[RouterAssoc],
        warnings: &mut Vec<DriverError>,
    ) -> Result<()> {
        for assoc in net_assocs {
            warnings.extend(self.remove_assoc(cxt, assoc)?);
        }
        for assoc in router_assocs {
            warnings.extend(self.remove_assoc(cxt, assoc)?);
        }

        let bgpvpn = self.store.delete_bgpvpn(id)?;
        Debug::BgpvpnDelete(&bgpvpn).log();
        warnings.extend(self.drivers.postcommit(
            HookEvent::DeleteBgpvpn,
            |driver| driver.delete_bgpvpn_postcommit(cxt, &bgpvpn),
        ));

        Ok(())
    }

    // Removes an association whose precommit hooks already ran, and notifies
    // the drivers.
    fn remove_assoc<A>(
        &mut self,
        cxt: &Context,
        assoc: &A,
    ) -> Result<Vec<DriverError>>
    where
        A: ManagedAssoc,
    {
        let assoc = self
            .store
            .delete_assoc::<A>(&assoc.id(), &assoc.bgpvpn_id())?;
        Debug::AssocDelete(A::KIND, &assoc.bgpvpn_id(), &assoc.resource_id())
            .log();

        let warnings = self.drivers.postcommit(A::DELETE, |driver| {
            A::delete_postcommit(driver, cxt, &assoc)
        });
        Ok(warnings)
    }
}

impl std::fmt::Debug for AssociationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssociationManager")
            .field("drivers", &self.drivers)
            .finish_non_exhaustive()
    }
}

// ===== impl Committed =====

impl<T> Committed<T> {
    pub(crate) fn new(data: T, warnings: Vec<DriverError>) -> Committed<T> {
        Committed { data, warnings }
    }
}

// ===== helper functions =====

fn validate_bgpvpn_targets(
    route_targets: Option<&[String]>,
    import_targets: Option<&[String]>,
    export_targets: Option<&[String]>,
    route_distinguishers: Option<&[String]>,
) -> Result<()> {
    for (attribute, values) in [
        ("route_targets", route_targets),
        ("import_targets", import_targets),
        ("export_targets", export_targets),
        ("route_distinguishers", route_distinguishers),
    ] {
        if let Some(values) = values {
            validator::validate_route_targets(attribute, values)?;
        }
    }

    Ok(())
}

// ===== unit tests =====
