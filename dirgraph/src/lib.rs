// Include routes module directly from routes.rs
#[path = "routes.rs"]
pub mod routes;

// Re-export the server surface for embedding and tests
pub use routes::{AppState, router};
