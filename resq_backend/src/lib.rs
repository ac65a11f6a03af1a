pub mod api;
pub mod auth;
pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod contacts;
pub mod events;
pub mod feed;
pub mod locations;
pub mod news;
pub mod node;
pub mod posts;
pub mod store;
pub mod telemetry;
pub mod utils;
