//! Domain models for hearth.
//!
//! Only the credential and session lifecycle lives here; listings and
//! other marketplace data belong to collaborator services.

pub mod account;
pub mod role;
