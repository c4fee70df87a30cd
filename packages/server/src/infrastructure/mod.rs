//! Infrastructure layer.
//!
//! Wire formats, the in-memory hub registry and the shipped authenticator.

pub mod auth;
pub mod dto;
pub mod repository;
