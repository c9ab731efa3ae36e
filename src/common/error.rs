//! Error types for enipam

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === Request validation ===
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    // === Store errors ===
    #[error("Store operation failed: {0}")]
    StoreOp(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Write conflict on {0}: resource version mismatch")]
    Conflict(String),

    // === Cloud provider errors ===
    #[error("Query ENI {eni_id} failed: {reason}")]
    QueryEniFailed { eni_id: String, reason: String },

    #[error("Describe subnet {subnet_id} failed: {reason}")]
    DescribeSubnetFailed { subnet_id: String, reason: String },

    #[error("Assign IP to ENI {eni_id} failed: {reason}")]
    AssignFailed { eni_id: String, reason: String },

    #[error("Unassign IP {address} from ENI {eni_id} failed: {reason}")]
    UnassignFailed {
        address: String,
        eni_id: String,
        reason: String,
    },

    #[error("Migrate IP {address} from {from_eni} to {to_eni} failed: {reason}")]
    MigrateFailed {
        address: String,
        from_eni: String,
        to_eni: String,
        reason: String,
    },

    // === Domain state conflicts ===
    #[error("Subnet {0} is disabled")]
    SubnetDisabled(String),

    #[error("ENI {eni_id} attachment mismatch: {reason}")]
    EniMismatch { eni_id: String, reason: String },

    #[error("Address {0} is already active")]
    AddressActive(String),

    #[error("Ownership mismatch on {address}: {reason}")]
    OwnershipMismatch { address: String, reason: String },

    #[error("Address {0} is not a fixed IP")]
    NotFixed(String),

    #[error("Address {0} is a fixed IP")]
    IsFixed(String),

    // === Config errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // === Generic ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Numeric wire code returned in RPC responses (0 is reserved for success).
    pub fn code(&self) -> u32 {
        match self {
            Error::InvalidParams(_) | Error::InvalidConfig(_) => 1001,
            Error::StoreOp(_) => 2001,
            Error::NotFound(_) => 2002,
            Error::Conflict(_) => 2003,
            Error::QueryEniFailed { .. } => 3001,
            Error::DescribeSubnetFailed { .. } => 3002,
            Error::AssignFailed { .. } => 3003,
            Error::UnassignFailed { .. } => 3004,
            Error::MigrateFailed { .. } => 3005,
            Error::SubnetDisabled(_) => 4001,
            Error::EniMismatch { .. } => 4002,
            Error::AddressActive(_) => 4003,
            Error::OwnershipMismatch { .. } => 4004,
            Error::NotFixed(_) => 4005,
            Error::IsFixed(_) => 4006,
            Error::Internal(_) => 5001,
        }
    }

    /// Is this error worth a client retry?
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Conflict(_) | Error::StoreOp(_))
    }

    /// Convert to HTTP status code for non-RPC endpoints
    pub fn to_http_status(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Error::InvalidParams(_) | Error::InvalidConfig(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_)
            | Error::AddressActive(_)
            | Error::OwnershipMismatch { .. }
            | Error::NotFixed(_)
            | Error::IsFixed(_) => StatusCode::CONFLICT,
            Error::SubnetDisabled(_) | Error::EniMismatch { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}
