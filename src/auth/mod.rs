mod helpers;
mod middleware;
mod token;

pub use middleware::{AuthError, Caller, RequireAuth};
pub use token::{IssuedToken, TokenGenerator, parse_token};
