//! 业务能力层
//!
//! 每个服务只负责一种页面能力，不关心流程顺序，也不持有句柄。

pub mod message_service;
pub mod model_service;
pub mod session_service;
pub mod upload_service;

use crate::infrastructure::AutomationHandle;

pub use message_service::MessageService;
pub use model_service::ModelService;
pub use session_service::{SessionResolution, SessionService};
pub use upload_service::{decode_base64_payload, UploadService, IMAGE_EXTENSIONS};

/// 服务调用时借用的页面：句柄 + 所属 Worker（用于日志）
#[derive(Clone, Copy)]
pub struct PageCtx<'a> {
    pub handle: &'a dyn AutomationHandle,
    pub worker_id: usize,
}

impl<'a> PageCtx<'a> {
    pub fn new(handle: &'a dyn AutomationHandle, worker_id: usize) -> Self {
        Self { handle, worker_id }
    }
}
