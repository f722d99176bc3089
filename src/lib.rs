pub mod app;
pub mod auth;
pub mod budgets;
pub mod config;
pub mod couples;
pub mod db;
pub mod error;
pub mod expenses;
pub mod extract;
pub mod reports;
pub mod settings;
pub mod state;
pub mod templates;
pub mod transfers;
