//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Generic CRUD entry points of the BGPVPN service.
//!
//! Request bodies are JSON objects wrapped in an envelope named after the
//! resource (`{"bgpvpn": {...}}`, `{"network_association": {...}}` or
//! `{"router_association": {...}}`). Resource and association IDs are
//! received as strings; a string that isn't a valid UUID can't name any
//! resource and is reported as not found.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{DriverError, Error, Result, Status};
use crate::manager::{AssociationManager, Committed, ManagedAssoc};
use crate::model::{
    AssocKind, BgpvpnCreate, BgpvpnUpdate, Context, NetAssoc, NetAssocCreate,
    NetAssocUpdate, ResourceKind, RouterAssoc, RouterAssocCreate,
    RouterAssocUpdate,
};

// Field name -> accepted values.
pub type Filters = BTreeMap<String, Vec<String>>;

pub struct Plugin {
    manager: AssociationManager,
}

#[derive(Clone, Debug, Default, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct Response {
    pub data: Value,
    #[serde(default)]
    pub warnings: Vec<DriverError>,
}

// ===== impl Plugin =====

impl Plugin {
    const BGPVPN: &'static str = "bgpvpn";
    const BGPVPNS: &'static str = "bgpvpns";

    pub fn new(manager: AssociationManager) -> Plugin {
        Plugin { manager }
    }

    pub fn manager(&self) -> &AssociationManager {
        &self.manager
    }

    pub fn create_resource(
        &mut self,
        cxt: &Context,
        body: Value,
    ) -> Result<Response> {
        let request = parse_body::<BgpvpnCreate>(body, Plugin::BGPVPN)?;
        let committed = self.manager.create_bgpvpn(cxt, request)?;
        Response::with_record(Plugin::BGPVPN, committed)
    }

    pub fn get_resource(
        &self,
        cxt: &Context,
        id: &str,
        fields: &[String],
    ) -> Result<Response> {
        let id = parse_id(ResourceKind::Bgpvpn, id)?;
        let bgpvpn = self.manager.get_bgpvpn(cxt, &id)?;
        let record = select_fields(serde_json::to_value(bgpvpn)?, fields);
        Ok(Response::new(envelope(Plugin::BGPVPN, record), vec![]))
    }

    pub fn list_resources(
        &self,
        cxt: &Context,
        filters: &Filters,
        fields: &[String],
    ) -> Result<Response> {
        let bgpvpns = self.manager.list_bgpvpns(cxt);
        let records = select_records(bgpvpns, filters, fields)?;
        Ok(Response::new(envelope(Plugin::BGPVPNS, records), vec![]))
    }

    pub fn update_resource(
        &mut self,
        cxt: &Context,
        id: &str,
        body: Value,
    ) -> Result<Response> {
        let id = parse_id(ResourceKind::Bgpvpn, id)?;
        let request = parse_body::<BgpvpnUpdate>(body, Plugin::BGPVPN)?;
        let committed = self.manager.update_bgpvpn(cxt, &id, request)?;
        Response::with_record(Plugin::BGPVPN, committed)
    }

    pub fn delete_resource(
        &mut self,
        cxt: &Context,
        id: &str,
    ) -> Result<Response> {
        let id = parse_id(ResourceKind::Bgpvpn, id)?;
        let committed = self.manager.delete_bgpvpn(cxt, &id)?;
        Ok(Response::new(Value::Null, committed.warnings))
    }

    pub fn create_association(
        &mut self,
        cxt: &Context,
        bgpvpn_id: &str,
        kind: AssocKind,
        body: Value,
    ) -> Result<Response> {
        let bgpvpn_id = parse_id(ResourceKind::Bgpvpn, bgpvpn_id)?;
        let name = kind.resource_name();
        match kind {
            AssocKind::Network => {
                let request = parse_body::<NetAssocCreate>(body, name)?;
                let committed =
                    self.manager.create_net_assoc(cxt, &bgpvpn_id, request)?;
                Response::with_record(name, committed)
            }
            AssocKind::Router => {
                let request = parse_body::<RouterAssocCreate>(body, name)?;
                let committed = self
                    .manager
                    .create_router_assoc(cxt, &bgpvpn_id, request)?;
                Response::with_record(name, committed)
            }
        }
    }

    pub fn get_association(
        &self,
        cxt: &Context,
        assoc_id: &str,
        bgpvpn_id: &str,
        kind: AssocKind,
        fields: &[String],
    ) -> Result<Response> {
        let bgpvpn_id = parse_id(ResourceKind::Bgpvpn, bgpvpn_id)?;
        let assoc_id = parse_id(kind.resource_kind(), assoc_id)?;
        let record = match kind {
            AssocKind::Network => {
                self.get_assoc::<NetAssoc>(cxt, &assoc_id, &bgpvpn_id)?
            }
            AssocKind::Router => {
                self.get_assoc::<RouterAssoc>(cxt, &assoc_id, &bgpvpn_id)?
            }
        };
        let record = select_fields(record, fields);
        Ok(Response::new(envelope(kind.resource_name(), record), vec![]))
    }

    pub fn list_associations(
        &self,
        cxt: &Context,
        bgpvpn_id: &str,
        kind: AssocKind,
        filters: &Filters,
        fields: &[String],
    ) -> Result<Response> {
        let bgpvpn_id = parse_id(ResourceKind::Bgpvpn, bgpvpn_id)?;
        let records = match kind {
            AssocKind::Network => {
                let assocs = self
                    .manager
                    .list_assocs::<NetAssoc>(cxt, &bgpvpn_id)?;
                select_records(assocs, filters, fields)?
            }
            AssocKind::Router => {
                let assocs = self
                    .manager
                    .list_assocs::<RouterAssoc>(cxt, &bgpvpn_id)?;
                select_records(assocs, filters, fields)?
            }
        };
        Ok(Response::new(envelope(kind.collection_name(), records), vec![]))
    }

    pub fn update_association(
        &mut self,
        cxt: &Context,
        assoc_id: &str,
        bgpvpn_id: &str,
        kind: AssocKind,
        body: Value,
    ) -> Result<Response> {
        let bgpvpn_id = parse_id(ResourceKind::Bgpvpn, bgpvpn_id)?;
        let assoc_id = parse_id(kind.resource_kind(), assoc_id)?;
        let name = kind.resource_name();
        match kind {
            AssocKind::Network => {
                let request = parse_body::<NetAssocUpdate>(body, name)?;
                let committed = self.manager.update_net_assoc(
                    cxt, &assoc_id, &bgpvpn_id, request,
                )?;
                Response::with_record(name, committed)
            }
            AssocKind::Router => {
                let request = parse_body::<RouterAssocUpdate>(body, name)?;
                let committed = self.manager.update_router_assoc(
                    cxt, &assoc_id, &bgpvpn_id, request,
                )?;
                Response::with_record(name, committed)
            }
        }
    }

    pub fn delete_association(
        &mut self,
        cxt: &Context,
        assoc_id: &str,
        bgpvpn_id: &str,
        kind: AssocKind,
    ) -> Result<Response> {
        let bgpvpn_id = parse_id(ResourceKind::Bgpvpn, bgpvpn_id)?;
        let assoc_id = parse_id(kind.resource_kind(), assoc_id)?;
        let committed = match kind {
            AssocKind::Network => self
                .manager
                .delete_assoc::<NetAssoc>(cxt, &assoc_id, &bgpvpn_id)?,
            AssocKind::Router => self
                .manager
                .delete_assoc::<RouterAssoc>(cxt, &assoc_id, &bgpvpn_id)?,
        };
        Ok(Response::new(Value::Null, committed.warnings))
    }

    fn get_assoc<A>(
        &self,
        cxt: &Context,
        assoc_id: &Uuid,
        bgpvpn_id: &Uuid,
    ) -> Result<Value>
    where
        A: ManagedAssoc,
    {
        let assoc = self.manager.get_assoc::<A>(cxt, assoc_id, bgpvpn_id)?;
        Ok(serde_json::to_value(assoc)?)
    }
}

impl std::fmt::Debug for Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugin")
            .field("manager", &self.manager)
            .finish()
    }
}

// ===== impl Response =====

impl Response {
    pub fn new(data: Value, warnings: Vec<DriverError>) -> Response {
        Response { data, warnings }
    }

    fn with_record<T>(name: &str, committed: Committed<T>) -> Result<Response>
    where
        T: Serialize,
    {
        let record = serde_json::to_value(committed.data)?;
        Ok(Response::new(envelope(name, record), committed.warnings))
    }

    // Returns the record wrapped in the given envelope, if present.
    pub fn record(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    pub fn status(&self) -> Status {
        if self.warnings.is_empty() {
            Status::Ok
        } else {
            Status::CompletedWithWarnings
        }
    }
}

// ===== helper functions =====

fn parse_id(kind: ResourceKind, id: &str) -> Result<Uuid> {
    Uuid::parse_str(id).map_err(|_| Error::NotFound(kind, id.to_owned()))
}

// Extracts and decodes the payload of a request envelope.
fn parse_body<T>(body: Value, name: &str) -> Result<T>
where
    T: DeserializeOwned,
{
    let Value::Object(mut body) = body else {
        return Err(Error::MalformedRequest(
            "request body must be an object".to_owned(),
        ));
    };
    let payload = body.remove(name).ok_or_else(|| {
        Error::MalformedRequest(format!("missing {} object", name))
    })?;
    if !payload.is_object() {
        return Err(Error::MalformedRequest(format!(
            "{} must be an object",
            name
        )));
    }

    serde_json::from_value(payload)
        .map_err(|error| Error::MalformedRequest(error.to_string()))
}

fn envelope(name: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(name.to_owned(), value);
    Value::Object(map)
}

// Keeps only the requested fields of a record. An empty list keeps all of
// them.
fn select_fields(record: Value, fields: &[String]) -> Value {
    match record {
        Value::Object(map) if !fields.is_empty() => Value::Object(
            map.into_iter()
                .filter(|(key, _)| fields.contains(key))
                .collect(),
        ),
        record => record,
    }
}

fn select_records<T>(
    records: Vec<T>,
    filters: &Filters,
    fields: &[String],
) -> Result<Value>
where
    T: Serialize,
{
    let mut selected = vec![];
    for record in records {
        let record = serde_json::to_value(record)?;
        if matches_filters(&record, filters) {
            selected.push(select_fields(record, fields));
        }
    }
    Ok(Value::Array(selected))
}

// Checks whether every filtered field of the record holds one of the
// accepted values. For list fields, any element can match.
fn matches_filters(record: &Value, filters: &Filters) -> bool {
    filters.iter().all(|(field, accepted)| match record.get(field) {
        Some(Value::Array(values)) => {
            values.iter().any(|value| matches_value(value, accepted))
        }
        Some(value) => matches_value(value, accepted),
        None => false,
    })
}

fn matches_value(value: &Value, accepted: &[String]) -> bool {
    let value = match value {
        Value::String(value) => value.clone(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        _ => return false,
    };
    accepted.contains(&value)
}

// ===== unit tests =====
