pub mod error;
pub mod handlers;
pub mod pipeline;
pub mod routes;
pub mod server;
pub mod state;
pub mod store;
pub mod stream;

pub use error::*;
pub use handlers::*;
pub use routes::*;
pub use server::*;
pub use state::*;
pub use store::{ExperimentRecord, ExperimentStore, ExperimentSummary};
pub use stream::StreamMessage;
