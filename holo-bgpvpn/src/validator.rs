//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Request validation.
//!
//! All checks are read-only. Authorization is split into two independent
//! predicates so that the error always tells which rule fired:
//!
//! * [`check_bgpvpn_owner`]: the requester must own the BGPVPN (or be an
//!   administrator).
//! * [`check_reference_tenant`]: the tenant declared by an association must
//!   own the referenced network or router.
//!
//! The tenant of an association may differ from the tenant of the BGPVPN.

use std::net::Ipv4Addr;

use crate::error::{Error, Result};
use crate::model::{
    Bgpvpn, Context, ExternalResource, NetAssocCreate, ResourceKind,
    RouterAssocCreate,
};
use crate::registry::ResourceRegistry;

// Checks whether the requester is allowed to act on resources of the given
// tenant.
pub fn check_tenant_access(cxt: &Context, tenant_id: &str) -> Result<()> {
    if cxt.is_admin || cxt.tenant_id == tenant_id {
        return Ok(());
    }

    Err(Error::Unauthorized(cxt.tenant_id.clone()))
}

// Checks whether the requester is allowed to act on the BGPVPN.
pub fn check_bgpvpn_owner(cxt: &Context, bgpvpn: &Bgpvpn) -> Result<()> {
    check_tenant_access(cxt, &bgpvpn.tenant_id)
}

// Checks whether the tenant declared by an association owns the referenced
// resource.
pub fn check_reference_tenant(
    kind: ResourceKind,
    assoc_tenant_id: &str,
    resource: &ExternalResource,
) -> Result<()> {
    if resource.tenant_id != assoc_tenant_id {
        return Err(Error::ReferenceTenantMismatch(
            kind,
            resource.id,
            assoc_tenant_id.to_owned(),
        ));
    }

    Ok(())
}

// Resolves the network referenced by a network association request.
pub fn validate_network_reference(
    cxt: &Context,
    resources: &dyn ResourceRegistry,
    request: &NetAssocCreate,
) -> Result<ExternalResource> {
    let network_id = request.network_id.ok_or_else(|| {
        Error::MalformedRequest("missing network_id".to_owned())
    })?;
    let network = resources
        .get_network(network_id)
        .ok_or(Error::ReferenceNotFound(ResourceKind::Network, network_id))?;

    let tenant_id = request.tenant_id.as_deref().unwrap_or(&cxt.tenant_id);
    check_reference_tenant(ResourceKind::Network, tenant_id, &network)?;

    Ok(network)
}

// Resolves the router referenced by a router association request.
pub fn validate_router_reference(
    cxt: &Context,
    resources: &dyn ResourceRegistry,
    request: &RouterAssocCreate,
) -> Result<ExternalResource> {
    let router_id = request.router_id.ok_or_else(|| {
        Error::MalformedRequest("missing router_id".to_owned())
    })?;
    let router = resources
        .get_router(router_id)
        .ok_or(Error::ReferenceNotFound(ResourceKind::Router, router_id))?;

    let tenant_id = request.tenant_id.as_deref().unwrap_or(&cxt.tenant_id);
    check_reference_tenant(ResourceKind::Router, tenant_id, &router)?;

    Ok(router)
}

// Checks the syntax of a list of route targets or route distinguishers.
pub fn validate_route_targets(
    attribute: &str,
    values: &[String],
) -> Result<()> {
    match values.iter().find(|value| !is_valid_rtrd(value)) {
        Some(value) => Err(Error::MalformedRequest(format!(
            "invalid value in {}: {}",
            attribute, value
        ))),
        None => Ok(()),
    }
}

// ===== helper functions =====

// Accepts the three RFC 4360/4364 administrator formats:
// * <2-octet ASN>:<4-octet number>
// * <4-octet ASN>:<2-octet number>
// * <IPv4 address>:<2-octet number>
fn is_valid_rtrd(value: &str) -> bool {
    let Some((admin, assigned)) = value.rsplit_once(':') else {
        return false;
    };
    if !is_decimal(assigned) {
        return false;
    }

    if let Ok(_addr) = admin.parse::<Ipv4Addr>() {
        return assigned.parse::<u16>().is_ok();
    }

    if !is_decimal(admin) {
        return false;
    }
    match admin.parse::<u32>() {
        Ok(asn) if asn <= u16::MAX as u32 => assigned.parse::<u32>().is_ok(),
        Ok(_) => assigned.parse::<u16>().is_ok(),
        Err(_) => false,
    }
}

fn is_decimal(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

// ===== unit tests =====
