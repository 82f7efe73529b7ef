pub mod audit;
pub mod auth;
pub mod middleware;
pub mod tracing;
pub mod users;
