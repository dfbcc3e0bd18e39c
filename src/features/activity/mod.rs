pub mod handler;
pub mod models;
pub mod recorder;

pub use handler::create_activity_router;
pub use models::{ShareEventRequest, ShareEventResponse};
pub use recorder::{ActivityRecorder, apply_optimistic};
