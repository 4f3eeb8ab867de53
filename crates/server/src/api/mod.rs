pub mod cache;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod settings;
pub mod stats;
pub mod ws;

pub use routes::create_router;
pub use ws::{WsBroadcaster, WsMessage};
