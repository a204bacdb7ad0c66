//! HTTP response types not covered by the bootstrap wire model.

use serde::{Deserialize, Serialize};

// Bootstrap request/response bodies live in `tenantgate_core::wire`.
pub use tenantgate_core::{BootstrapAuthRequest, BootstrapAuthResponse, BootstrapJoinResponse};

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
