//! HTTP handlers.

pub mod dto;
pub mod error;
pub mod health;
pub mod languages;
pub mod results;
pub mod sessions;

pub use error::ApiError;
pub use health::health_routes;
pub use languages::list_languages;
pub use results::{export_attempt_log, export_item_report, get_results};
pub use sessions::{
    end_session, get_session, list_sessions, locate_item, skip_attempt, start_session,
    submit_attempt,
};
