pub mod auth;
pub mod response;
pub mod telemetry;

pub use auth::{require_auth, AuthUser};
pub use response::{ApiResponse, ApiResult};
