pub mod app;
pub mod cli;
pub mod config;
pub mod database;
pub mod docs;
pub mod endpoints;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod pipeline;
pub mod routes;
pub mod schema;
pub mod state;
pub mod testing;
pub mod types;

pub use app::build_router;
pub use state::AppState;
