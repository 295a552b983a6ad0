pub mod catalog;
pub mod config;
pub mod db;
pub mod filter;
pub mod geo;
pub mod notify;
pub mod rating;
pub mod repository;
pub mod schema;
pub mod seed;
