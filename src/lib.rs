pub mod aggregates;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod integrations;
pub mod models;
pub mod routes;
pub mod schema;
pub mod slug;
pub mod state;
pub mod utils;
pub mod workflow;
