// Library exports for Bhasa
// This allows integration tests and external code to use Bhasa modules

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod media;
pub mod routes;
pub mod social;
pub mod state;
