//! Database repositories.

pub mod users;
