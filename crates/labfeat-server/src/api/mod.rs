//! API surface of the ETL service

pub mod rest;

pub use rest::create_router;
