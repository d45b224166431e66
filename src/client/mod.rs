//! The terminal client: talks to the server and keeps a local snapshot to
//! fall back on when the server cannot be reached.

mod api;
mod render;
mod snapshot;
mod state;

pub use api::ApiClient;
pub use render::{BAR_WIDTH, DashboardText};
pub use snapshot::LocalSnapshot;
pub use state::{AddOutcome, ClientState, ConnectionMode};
