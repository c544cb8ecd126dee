//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Responder;
use crate::debug::Debug;
use crate::error::Result;
use crate::model::{AssocKind, Context};
use crate::plugin::{Filters, Plugin, Response};

// Request sent to the plugin task.
#[derive(Debug, Deserialize, Serialize)]
pub struct Request {
    pub context: Context,
    pub operation: Operation,
    #[serde(skip)]
    pub responder: Option<Responder<Result<Response>>>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "verb", rename_all = "snake_case")]
pub enum Operation {
    CreateResource {
        body: Value,
    },
    GetResource {
        id: String,
        #[serde(default)]
        fields: Vec<String>,
    },
    ListResources {
        #[serde(default)]
        filters: Filters,
        #[serde(default)]
        fields: Vec<String>,
    },
    UpdateResource {
        id: String,
        body: Value,
    },
    DeleteResource {
        id: String,
    },
    CreateAssociation {
        bgpvpn_id: String,
        kind: AssocKind,
        body: Value,
    },
    GetAssociation {
        id: String,
        bgpvpn_id: String,
        kind: AssocKind,
        #[serde(default)]
        fields: Vec<String>,
    },
    ListAssociations {
        bgpvpn_id: String,
        kind: AssocKind,
        #[serde(default)]
        filters: Filters,
        #[serde(default)]
        fields: Vec<String>,
    },
    UpdateAssociation {
        id: String,
        bgpvpn_id: String,
        kind: AssocKind,
        body: Value,
    },
    DeleteAssociation {
        id: String,
        bgpvpn_id: String,
        kind: AssocKind,
    },
}

// ===== impl Request =====

impl Request {
    pub fn new(context: Context, operation: Operation) -> Request {
        Request {
            context,
            operation,
            responder: None,
        }
    }
}

// ===== global functions =====

// Runs the requested operation and sends the outcome back to the requester,
// if it's still waiting for it.
pub fn process_request(plugin: &mut Plugin, request: Request) {
    Debug::RequestRx(&request.operation).log();

    let response = execute(plugin, &request.context, request.operation);
    if let Err(error) = &response {
        error.log();
    }
    if let Some(responder) = request.responder {
        let _ = responder.send(response);
    }
}

pub fn execute(
    plugin: &mut Plugin,
    cxt: &Context,
    operation: Operation,
) -> Result<Response> {
    match operation {
        Operation::CreateResource { body } => plugin.create_resource(cxt, body),
        Operation::GetResource { id, fields } => {
            plugin.get_resource(cxt, &id, &fields)
        }
        Operation::ListResources { filters, fields } => {
            plugin.list_resources(cxt, &filters, &fields)
        }
        Operation::UpdateResource { id, body } => {
            plugin.update_resource(cxt, &id, body)
        }
        Operation::DeleteResource { id } => plugin.delete_resource(cxt, &id),
        Operation::CreateAssociation {
            bgpvpn_id,
            kind,
            body,
        } => plugin.create_association(cxt, &bgpvpn_id, kind, body),
        Operation::GetAssociation {
            id,
            bgpvpn_id,
            kind,
            fields,
        } => plugin.get_association(cxt, &id, &bgpvpn_id, kind, &fields),
        Operation::ListAssociations {
            bgpvpn_id,
            kind,
            filters,
            fields,
        } => {
            plugin.list_associations(cxt, &bgpvpn_id, kind, &filters, &fields)
        }
        Operation::UpdateAssociation {
            id,
            bgpvpn_id,
            kind,
            body,
        } => plugin.update_association(cxt, &id, &bgpvpn_id, kind, body),
        Operation::DeleteAssociation {
            id,
            bgpvpn_id,
            kind,
        } => plugin.delete_association(cxt, &id, &bgpvpn_id, kind),
    }
}
