//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use uuid::Uuid;

use crate::model::ResourceKind;

//
// Type aliases.
//
pub type Result<T> = std::result::Result<T, Error>;

// BGPVPN service errors.
#[derive(Debug)]
pub enum Error {
    // Request validation
    MalformedRequest(String),
    ReferenceNotFound(ResourceKind, Uuid),
    ReferenceTenantMismatch(ResourceKind, Uuid, String),
    Unauthorized(String),
    // Resource lookup
    NotFound(ResourceKind, String),
    Conflict(String),
    // Drivers
    DriverPrecommitRejected(DriverError),
    DriverLoad(String, String),
    // Non-volatile storage
    Storage(pickledb::error::Error),
    // Response encoding
    Encode(serde_json::Error),
}

// Failure reported by a driver hook.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct DriverError {
    pub driver: String,
    pub event: String,
    pub reason: String,
}

// Caller-visible outcome of a plugin operation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum Status {
    Ok,
    CompletedWithWarnings,
    BadRequest,
    Forbidden,
    NotFound,
    Conflict,
    InternalError,
}

// ===== impl Error =====

impl Error {
    pub fn log(&self) {
        match self {
            Error::MalformedRequest(reason) => {
                warn!(%reason, "{}", self);
            }
            Error::ReferenceNotFound(kind, id) => {
                warn!(%kind, %id, "{}", self);
            }
            Error::ReferenceTenantMismatch(kind, id, tenant_id) => {
                warn!(%kind, %id, %tenant_id, "{}", self);
            }
            Error::Unauthorized(tenant_id) => {
                warn!(%tenant_id, "{}", self);
            }
            Error::NotFound(kind, id) => {
                warn!(%kind, %id, "{}", self);
            }
            Error::Conflict(reason) => {
                warn!(%reason, "{}", self);
            }
            Error::DriverPrecommitRejected(error) => {
                warn!(driver = %error.driver, event = %error.event,
                    reason = %error.reason, "{}", self);
            }
            Error::DriverLoad(provider, reason) => {
                error!(%provider, %reason, "{}", self);
            }
            Error::Storage(error) => {
                error!(%error, "{}", self);
            }
            Error::Encode(error) => {
                error!(%error, "{}", self);
            }
        }
    }

    // Maps the error to the outcome reported to the hosting layer.
    pub fn status(&self) -> Status {
        match self {
            Error::MalformedRequest(..) => Status::BadRequest,
            Error::ReferenceNotFound(..) | Error::NotFound(..) => {
                Status::NotFound
            }
            Error::ReferenceTenantMismatch(..) | Error::Unauthorized(..) => {
                Status::Forbidden
            }
            Error::Conflict(..) | Error::DriverPrecommitRejected(..) => {
                Status::Conflict
            }
            Error::DriverLoad(..) | Error::Storage(..) | Error::Encode(..) => {
                Status::InternalError
            }
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::MalformedRequest(reason) => {
                write!(f, "malformed request: {}", reason)
            }
            Error::ReferenceNotFound(kind, id) => {
                write!(f, "referenced {} {} not found", kind, id)
            }
            Error::ReferenceTenantMismatch(kind, ..) => {
                write!(
                    f,
                    "association tenant doesn't match the tenant of the {}",
                    kind
                )
            }
            Error::Unauthorized(..) => {
                write!(f, "operation not permitted for this tenant")
            }
            Error::NotFound(kind, id) => {
                write!(f, "{} {} not found", kind, id)
            }
            Error::Conflict(reason) => {
                write!(f, "conflict: {}", reason)
            }
            Error::DriverPrecommitRejected(error) => {
                write!(f, "operation rejected by driver {}", error.driver)
            }
            Error::DriverLoad(provider, reason) => {
                write!(
                    f,
                    "failed to load service provider {}: {}",
                    provider, reason
                )
            }
            Error::Storage(..) => {
                write!(f, "failed to update non-volatile storage")
            }
            Error::Encode(..) => {
                write!(f, "failed to encode response")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::DriverPrecommitRejected(error) => Some(error),
            Error::Storage(error) => Some(error),
            Error::Encode(error) => Some(error),
            _ => None,
        }
    }
}

impl From<pickledb::error::Error> for Error {
    fn from(error: pickledb::error::Error) -> Error {
        Error::Storage(error)
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Error {
        Error::Encode(error)
    }
}

// ===== impl DriverError =====

impl std::fmt::Display for DriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "driver {} failed on {}: {}",
            self.driver, self.event, self.reason
        )
    }
}

impl std::error::Error for DriverError {}

// ===== impl Status =====

impl Status {
    // Equivalent HTTP status code.
    pub fn code(&self) -> u16 {
        match self {
            Status::Ok | Status::CompletedWithWarnings => 200,
            Status::BadRequest => 400,
            Status::Forbidden => 403,
            Status::NotFound => 404,
            Status::Conflict => 409,
            Status::InternalError => 500,
        }
    }
}
