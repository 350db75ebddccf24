//! Authentication module
//!
//! JWT verification for live event connections:
//! - [`JwtService`] - token generation and validation
//! - [`Claims`] - staff identity carried in the token

pub mod jwt;

pub use jwt::{Claims, JwtConfig, JwtError, JwtService};
