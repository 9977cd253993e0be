pub mod selectors;
pub mod session_flow;
pub mod stabilizer;
pub mod task;

pub use session_flow::{SessionOrchestrator, Step};
pub use stabilizer::ResponseStabilizer;
pub use task::{FileAttachment, Media, ResponseEnvelope, SessionTarget, Task, NEW_SESSION};
