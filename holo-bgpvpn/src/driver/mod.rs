//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

pub mod dummy;
pub mod recorder;

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::debug::Debug;
use crate::error::{DriverError, Error, Result};
use crate::model::{Association, Bgpvpn, Context, NetAssoc, RouterAssoc};

// Outcome of a driver hook. The error string explains why the driver
// refused or failed to handle the event.
pub type HookResult = std::result::Result<(), String>;

// Service type of the providers handled by this plugin.
pub const SERVICE_TYPE: &str = "BGPVPN";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Precommit,
    Postcommit,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HookEvent {
    CreateBgpvpn,
    UpdateBgpvpn,
    DeleteBgpvpn,
    CreateNetAssoc,
    UpdateNetAssoc,
    DeleteNetAssoc,
    CreateRouterAssoc,
    UpdateRouterAssoc,
    DeleteRouterAssoc,
}

/// Backend notified about changes to BGPVPN resources.
///
/// Precommit hooks run before the change is stored and can veto it by
/// returning an error. Postcommit hooks run after the change is stored and
/// receive the stored records; their errors are reported back to the
/// requester as warnings.
///
/// All hooks default to doing nothing.
#[allow(unused_variables)]
pub trait Driver: Send {
    // BGPVPN hooks.
    fn create_bgpvpn_precommit(
        &mut self,
        cxt: &Context,
        bgpvpn: &Bgpvpn,
    ) -> HookResult {
        Ok(())
    }

    fn create_bgpvpn_postcommit(
        &mut self,
        cxt: &Context,
        bgpvpn: &Bgpvpn,
    ) -> HookResult {
        Ok(())
    }

    fn update_bgpvpn_precommit(
        &mut self,
        cxt: &Context,
        old: &Bgpvpn,
        new: &Bgpvpn,
    ) -> HookResult {
        Ok(())
    }

    fn update_bgpvpn_postcommit(
        &mut self,
        cxt: &Context,
        old: &Bgpvpn,
        new: &Bgpvpn,
    ) -> HookResult {
        Ok(())
    }

    fn delete_bgpvpn_precommit(
        &mut self,
        cxt: &Context,
        bgpvpn: &Bgpvpn,
    ) -> HookResult {
        Ok(())
    }

    fn delete_bgpvpn_postcommit(
        &mut self,
        cxt: &Context,
        bgpvpn: &Bgpvpn,
    ) -> HookResult {
        Ok(())
    }

    // Network association hooks.
    fn create_net_assoc_precommit(
        &mut self,
        cxt: &Context,
        assoc: &NetAssoc,
    ) -> HookResult {
        Ok(())
    }

    fn create_net_assoc_postcommit(
        &mut self,
        cxt: &Context,
        assoc: &NetAssoc,
    ) -> HookResult {
        Ok(())
    }

    fn update_net_assoc_precommit(
        &mut self,
        cxt: &Context,
        old: &NetAssoc,
        new: &NetAssoc,
    ) -> HookResult {
        Ok(())
    }

    fn update_net_assoc_postcommit(
        &mut self,
        cxt: &Context,
        old: &NetAssoc,
        new: &NetAssoc,
    ) -> HookResult {
        Ok(())
    }

    fn delete_net_assoc_precommit(
        &mut self,
        cxt: &Context,
        assoc: &NetAssoc,
    ) -> HookResult {
        Ok(())
    }

    fn delete_net_assoc_postcommit(
        &mut self,
        cxt: &Context,
        assoc: &NetAssoc,
    ) -> HookResult {
        Ok(())
    }

    // Router association hooks.
    fn create_router_assoc_precommit(
        &mut self,
        cxt: &Context,
        assoc: &RouterAssoc,
    ) -> HookResult {
        Ok(())
    }

    fn create_router_assoc_postcommit(
        &mut self,
        cxt: &Context,
        assoc: &RouterAssoc,
    ) -> HookResult {
        Ok(())
    }

    fn update_router_assoc_precommit(
        &mut self,
        cxt: &Context,
        old: &RouterAssoc,
        new: &RouterAssoc,
    ) -> HookResult {
        Ok(())
    }

    fn update_router_assoc_postcommit(
        &mut self,
        cxt: &Context,
        old: &RouterAssoc,
        new: &RouterAssoc,
    ) -> HookResult {
        Ok(())
    }

    fn delete_router_assoc_precommit(
        &mut self,
        cxt: &Context,
        assoc: &RouterAssoc,
    ) -> HookResult {
        Ok(())
    }

    fn delete_router_assoc_postcommit(
        &mut self,
        cxt: &Context,
        assoc: &RouterAssoc,
    ) -> HookResult {
        Ok(())
    }
}

// Ordered set of named drivers.
#[derive(Default)]
pub struct DriverRegistry {
    drivers: Vec<(String, Box<dyn Driver>)>,
}

// Service provider entry, in the
// `<service_type>:<name>:<driver>[:default]` notation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ServiceProvider {
    pub service_type: String,
    pub name: String,
    pub driver: String,
    pub default: bool,
}

// Per association kind dispatch of the driver hooks.
pub(crate) trait AssocHooks: Association {
    const CREATE: HookEvent;
    const UPDATE: HookEvent;
    const DELETE: HookEvent;

    fn create_precommit(
        driver: &mut dyn Driver,
        cxt: &Context,
        assoc: &Self,
    ) -> HookResult;

    fn create_postcommit(
        driver: &mut dyn Driver,
        cxt: &Context,
        assoc: &Self,
    ) -> HookResult;

    fn update_precommit(
        driver: &mut dyn Driver,
        cxt: &Context,
        old: &Self,
        new: &Self,
    ) -> HookResult;

    fn update_postcommit(
        driver: &mut dyn Driver,
        cxt: &Context,
        old: &Self,
        new: &Self,
    ) -> HookResult;

    fn delete_precommit(
        driver: &mut dyn Driver,
        cxt: &Context,
        assoc: &Self,
    ) -> HookResult;

    fn delete_postcommit(
        driver: &mut dyn Driver,
        cxt: &Context,
        assoc: &Self,
    ) -> HookResult;
}

// ===== impl HookEvent =====

impl std::fmt::Display for HookEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HookEvent::CreateBgpvpn => "create_bgpvpn",
            HookEvent::UpdateBgpvpn => "update_bgpvpn",
            HookEvent::DeleteBgpvpn => "delete_bgpvpn",
            HookEvent::CreateNetAssoc => "create_net_assoc",
            HookEvent::UpdateNetAssoc => "update_net_assoc",
            HookEvent::DeleteNetAssoc => "delete_net_assoc",
            HookEvent::CreateRouterAssoc => "create_router_assoc",
            HookEvent::UpdateRouterAssoc => "update_router_assoc",
            HookEvent::DeleteRouterAssoc => "delete_router_assoc",
        };
        write!(f, "{}", name)
    }
}

// ===== impl DriverRegistry =====

impl DriverRegistry {
    pub fn new() -> DriverRegistry {
        Default::default()
    }

    // Loads the drivers of all BGPVPN service providers. Providers of other
    // service types are ignored.
    pub fn load(
        providers: &[ServiceProvider],
        recorder: &recorder::Config,
    ) -> Result<DriverRegistry> {
        let mut registry = DriverRegistry::new();

        let providers = providers
            .iter()
            .filter(|provider| provider.service_type == SERVICE_TYPE)
            .collect::<Vec<_>>();
        if providers.iter().filter(|provider| provider.default).count() > 1 {
            return Err(Error::DriverLoad(
                SERVICE_TYPE.to_owned(),
                "multiple default providers".to_owned(),
            ));
        }

        for provider in providers {
            let driver: Box<dyn Driver> = match provider.driver.as_str() {
                "dummy" => Box::new(dummy::DummyDriver),
                "recorder" => {
                    let driver =
                        recorder::RecorderDriver::new(&provider.name, recorder)
                            .map_err(|error| {
                                Error::DriverLoad(
                                    provider.name.clone(),
                                    error.to_string(),
                                )
                            })?;
                    Box::new(driver)
                }
                driver => {
                    return Err(Error::DriverLoad(
                        provider.name.clone(),
                        format!("unknown driver: {}", driver),
                    ));
                }
            };
            registry.register(&provider.name, driver)?;
        }

        Ok(registry)
    }

    // Appends a driver. Its hooks run after the hooks of the drivers
    // registered before it.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        driver: Box<dyn Driver>,
    ) -> Result<()> {
        let name = name.into();
        if self.drivers.iter().any(|(other, _)| *other == name) {
            return Err(Error::Conflict(format!(
                "driver {} is already registered",
                name
            )));
        }

        self.drivers.push((name, driver));
        Ok(())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.drivers.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }

    // Runs a precommit hook on all drivers, stopping at the first one that
    // fails.
    pub(crate) fn precommit<F>(
        &mut self,
        event: HookEvent,
        mut hook: F,
    ) -> Result<()>
    where
        F: FnMut(&mut dyn Driver) -> HookResult,
    {
        for (name, driver) in &mut self.drivers {
            Debug::DriverHook(Phase::Precommit, event, name).log();
            if let Err(reason) = hook(driver.as_mut()) {
                return Err(Error::DriverPrecommitRejected(DriverError {
                    driver: name.clone(),
                    event: event.to_string(),
                    reason,
                }));
            }
        }

        Ok(())
    }

    // Runs a postcommit hook on all drivers, collecting their failures.
    pub(crate) fn postcommit<F>(
        &mut self,
        event: HookEvent,
        mut hook: F,
    ) -> Vec<DriverError>
    where
        F: FnMut(&mut dyn Driver) -> HookResult,
    {
        let mut errors = vec![];

        for (name, driver) in &mut self.drivers {
            Debug::DriverHook(Phase::Postcommit, event, name).log();
            if let Err(reason) = hook(driver.as_mut()) {
                warn!(driver = %name, %event, %reason,
                    "postcommit hook failed");
                errors.push(DriverError {
                    driver: name.clone(),
                    event: event.to_string(),
                    reason,
                });
            }
        }

        errors
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

// ===== impl ServiceProvider =====

impl FromStr for ServiceProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<ServiceProvider> {
        let error = |reason: &str| {
            Error::DriverLoad(s.to_owned(), reason.to_owned())
        };

        let parts = s.split(':').collect::<Vec<_>>();
        let default = match parts.len() {
            3 => false,
            4 if parts[3] == "default" => true,
            4 => return Err(error("invalid default flag")),
            _ => return Err(error("invalid number of fields")),
        };
        if parts[..3].iter().any(|part| part.is_empty()) {
            return Err(error("empty field"));
        }

        Ok(ServiceProvider {
            service_type: parts[0].to_owned(),
            name: parts[1].to_owned(),
            driver: parts[2].to_owned(),
            default,
        })
    }
}

impl std::fmt::Display for ServiceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.service_type, self.name, self.driver)?;
        if self.default {
            write!(f, ":default")?;
        }
        Ok(())
    }
}

// ===== impl NetAssoc =====

impl AssocHooks for NetAssoc {
    const CREATE: HookEvent = HookEvent::CreateNetAssoc;
    const UPDATE: HookEvent = HookEvent::UpdateNetAssoc;
    const DELETE: HookEvent = HookEvent::DeleteNetAssoc;

    fn create_precommit(
        driver: &mut dyn Driver,
        cxt: &Context,
        assoc: &Self,
    ) -> HookResult {
        driver.create_net_assoc_precommit(cxt, assoc)
    }

    fn create_postcommit(
        driver: &mut dyn Driver,
        cxt: &Context,
        assoc: &Self,
    ) -> HookResult {
        driver.create_net_assoc_postcommit(cxt, assoc)
    }

    fn update_precommit(
        driver: &mut dyn Driver,
        cxt: &Context,
        old: &Self,
        new: &Self,
    ) -> HookResult {
        driver.update_net_assoc_precommit(cxt, old, new)
    }

    fn update_postcommit(
        driver: &mut dyn Driver,
        cxt: &Context,
        old: &Self,
        new: &Self,
    ) -> HookResult {
        driver.update_net_assoc_postcommit(cxt, old, new)
    }

    fn delete_precommit(
        driver: &mut dyn Driver,
        cxt: &Context,
        assoc: &Self,
    ) -> HookResult {
        driver.delete_net_assoc_precommit(cxt, assoc)
    }

    fn delete_postcommit(
        driver: &mut dyn Driver,
        cxt: &Context,
        assoc: &Self,
    ) -> HookResult {
        driver.delete_net_assoc_postcommit(cxt, assoc)
    }
}

// ===== impl RouterAssoc =====

impl AssocHooks for RouterAssoc {
    const CREATE: HookEvent = HookEvent::CreateRouterAssoc;
    const UPDATE: HookEvent = HookEvent::UpdateRouterAssoc;
    const DELETE: HookEvent = HookEvent::DeleteRouterAssoc;

    fn create_precommit(
        driver: &mut dyn Driver,
        cxt: &Context,
        assoc: &Self,
    ) -> HookResult {
        driver.create_router_assoc_precommit(cxt, assoc)
    }

    fn create_postcommit(
        driver: &mut dyn Driver,
        cxt: &Context,
        assoc: &Self,
    ) -> HookResult {
        driver.create_router_assoc_postcommit(cxt, assoc)
    }

    fn update_precommit(
        driver: &mut dyn Driver,
        cxt: &Context,
        old: &Self,
        new: &Self,
    ) -> HookResult {
        driver.update_router_assoc_precommit(cxt, old, new)
    }

    fn update_postcommit(
        driver: &mut dyn Driver,
        cxt: &Context,
        old: &Self,
        new: &Self,
    ) -> HookResult {
        driver.update_router_assoc_postcommit(cxt, old, new)
    }

    fn delete_precommit(
        driver: &mut dyn Driver,
        cxt: &Context,
        assoc: &Self,
    ) -> HookResult {
        driver.delete_router_assoc_precommit(cxt, assoc)
    }

    fn delete_postcommit(
        driver: &mut dyn Driver,
        cxt: &Context,
        assoc: &Self,
    ) -> HookResult {
        driver.delete_router_assoc_postcommit(cxt, assoc)
    }
}

// ===== unit tests =====
