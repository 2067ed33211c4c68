//! REST API implementation
//!
//! Modular REST API with clean separation of concerns:
//! - types: Application state
//! - views: HTML views for the index and trigger endpoints
//! - conversions: Table-to-JSON conversion utilities
//! - handlers: API endpoint handlers
//! - router: Router creation and configuration
//! - tests: Unit tests for all components

mod conversions;
mod handlers;
mod router;
pub mod types;
mod views;

// Re-export public API
pub use router::create_router;
pub use types::AppState;
