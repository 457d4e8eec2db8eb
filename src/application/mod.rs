//! Provider contract and the services built on top of it.

pub mod error;
pub mod provider;
pub mod queries;
pub mod routes;
pub mod tags;
