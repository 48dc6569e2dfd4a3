pub mod entities;
pub mod error;
pub mod games;
pub mod handlers;
pub mod locations;
pub mod middleware;
pub mod routes;
pub mod search;
pub mod stats;

pub use routes::create_router;
