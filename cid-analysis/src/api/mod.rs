//! HTTP API for cid-analysis

pub mod analysis;
pub mod health;
pub mod history;

pub use analysis::analysis_routes;
pub use health::health_routes;
pub use history::history_routes;
