pub mod app;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod links;
pub mod output;
pub mod pairing;
pub mod projects;
pub mod results;
pub mod rows;
pub mod tui;
