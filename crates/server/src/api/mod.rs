pub mod auth;
pub mod error;
pub mod files;
pub mod handlers;
pub mod lafzize;
pub mod middleware;
pub mod recitations;
pub mod routes;
pub mod timings;
pub mod users;

pub use routes::create_router;
