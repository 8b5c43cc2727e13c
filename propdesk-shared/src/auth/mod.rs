//! Authentication and authorization primitives
//!
//! - [`password`]: Argon2id hashing for user credentials
//! - [`jwt`]: HS256 session tokens carrying the user's home company
//! - [`context`]: the authenticated principal attached to a request
//! - [`authorization`]: company membership and role checks

pub mod authorization;
pub mod context;
pub mod jwt;
pub mod password;
