//! Team pairing API library
//!
//! Users form single-gender teams through invitations, teams that are ready
//! pair up through mutual match requests. The `services` layer owns every
//! rule; `api` is a thin HTTP adapter over it.

pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod services;
