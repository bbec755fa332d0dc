//! Library crate for the blind clock: server state, HTTP routes and the
//! polling viewer, exposed for the binaries and integration tests.

pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;
pub mod viewer;
