//! HTTP request handlers.

pub mod health;
pub mod login;
pub mod metrics;
pub mod token;
pub mod users;

pub use health::{health_check, index, readiness_check};
pub use login::login;
pub use metrics::metrics_handler;
pub use token::issue_token;
pub use users::{create_user, delete_user, get_user, list_users, update_user};
