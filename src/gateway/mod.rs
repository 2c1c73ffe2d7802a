//! Gateway server implementation

pub mod auth;
pub mod cors;
pub mod credentials;
mod router;
mod server;
pub mod tools;

pub use auth::{AuthContext, AuthDecision, auth_middleware, authorize};
pub use credentials::{
    CredentialSet, CredentialSource, Extraction, IncomingRequest, QueryParams,
    extract_credential,
};
pub use router::{AppState, create_router};
pub use server::Gateway;
pub use tools::{ToolInvocation, ToolKind, ToolResult};
