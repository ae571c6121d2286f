pub mod jwt;
pub mod middleware;
pub mod models;

pub use jwt::{issue_access_token, validate_access_token, ACCESS_TOKEN_ISSUER};
pub use models::UserContext;
