//! # versioned-response
//!
//! Response-body model version negotiation for HTTP APIs.
//!
//! An endpoint declares where a client may ask for a version of the response
//! model (a query parameter, then a header) and which version to fall back to.
//! Right before the body is serialized, the resolved version is written into
//! the one member of the model marked as its version sink, so the model can
//! shape its own JSON accordingly.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use versioned_response::prelude::*;
//!
//! #[derive(Serialize, VersionedModel)]
//! struct Order {
//!     id: u64,
//!     #[version_sink]
//!     model_version: Option<String>,
//! }
//!
//! #[versioned_body(default = "3", query_param = "v", header = "Model-Version")]
//! async fn get_order() -> Order {
//!     Order { id: 5, model_version: None }
//! }
//!
//! let mut endpoints = VersionedEndpoints::new();
//! endpoints.register(Method::GET, "/orders/{id}", get_order_version_policy())?;
//! let advice = VersionedBodyAdvice::new(endpoints);
//!
//! // GET /orders/5?v=1  ->  {"id":5,"model_version":"1"}
//! let response = advice.write_body(get_order().await, &key, &parts);
//! ```
//!
//! ## Configuration
//!
//! - `VERSIONED_RESPONSE_ENV` - `production` hides error details in 500 bodies
//! - `EndpointVersionPolicy::from_env_prefixed("ORDERS")` reads
//!   `ORDERS_DEFAULT_VERSION`, `ORDERS_QUERY_PARAM_NAME` and
//!   `ORDERS_HEADER_NAME`

// Re-export core functionality
pub use versioned_response_core::*;

// Re-export macros
pub use versioned_response_macros::*;

// Re-exports used by generated and user code
pub use http;
pub use serde;
pub use tracing;

/// Prelude module - import everything you need with `use versioned_response::prelude::*`
pub mod prelude {
    pub use versioned_response_core::{
        // Endpoint registration
        EndpointKey,
        EndpointVersionPolicy,
        // Errors
        Result,
        SinkWriteError,
        VersionedBodyAdvice,
        VersionedEndpoints,
        VersionedModel,
        VersioningError,
    };

    pub use versioned_response_macros::{versioned_body, VersionedModel};

    pub use http::Method;
    pub use serde::{Deserialize, Serialize};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn prelude_imports_work() {
        let _: fn() -> Result<()> = || Ok(());
    }
}
