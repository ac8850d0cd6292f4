pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod generator;
pub mod health;
pub mod premium;
pub mod recipes;
pub mod state;
