//! Authentication adapters implementing the `SessionValidator` port.
//!
//! - `JwtSessionValidator` - HS256 access tokens
//! - `MockSessionValidator` - fixed token table for tests

mod jwt;
mod mock;

pub use jwt::{AccessClaims, JwtConfig, JwtSessionValidator, SubjectClaim};
pub use mock::MockSessionValidator;
