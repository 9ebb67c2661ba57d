// Library exports for clubhub
// The binary, the integration tests and client front-ends all build on these modules

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;
