//! Auth domain - bearer tokens that identify the calling user and role
//!
//! Tokens are issued elsewhere; this service only verifies them and turns
//! their claims into an [`Actor`](crate::common::Actor).

pub mod jwt;

pub use jwt::{Claims, JwtService};
