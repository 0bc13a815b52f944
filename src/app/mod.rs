pub mod context;
pub mod error;
pub mod orchestrator;

pub use context::AppContext;
pub use error::{GenError, Result};
pub use orchestrator::{handle, GenRequest, Operation, Reply};
