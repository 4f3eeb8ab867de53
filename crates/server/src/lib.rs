//! HTTP and WebSocket front end for Ubuntu translation statistics.

pub mod api;
pub mod metrics;
pub mod session;
pub mod state;

pub use api::{create_router, WsBroadcaster, WsMessage};
pub use session::{Session, SessionSnapshot, SessionStatus};
pub use state::AppState;
