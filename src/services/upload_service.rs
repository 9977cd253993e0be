//! 上传服务 - 业务能力层
//!
//! 只负责"把图片或文件交给页面的上传控件"。临时文件放在 [`tempfile`] 管理的
//! 文件 / 目录里，离开作用域即删除，不论上传成功与否。

use std::io::Write;
use std::path::{Path, PathBuf};

use base64::Engine;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::PageCtx;
use crate::config::UiTimings;
use crate::error::{GatewayError, GatewayResult};
use crate::infrastructure::Locator;
use crate::workflow::selectors::{
    DIALOG_DISMISS, DOCUMENT_FILE_INPUT, IMAGE_FILE_INPUT, UPLOAD_BUTTON, UPLOAD_ERROR,
};
use crate::workflow::FileAttachment;

/// 走图片通道、不走文件通道的扩展名
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];

/// 上传服务
pub struct UploadService {
    ui: UiTimings,
    upload_dir: PathBuf,
}

impl UploadService {
    pub fn new(ui: UiTimings, upload_dir: PathBuf) -> Self {
        Self { ui, upload_dir }
    }

    /// 上传单张图片
    ///
    /// # 参数
    /// - `payload`: base64 图片数据，可带 `data:image/...;base64,` 前缀
    pub async fn upload_image(&self, page: PageCtx<'_>, payload: &str) -> GatewayResult<()> {
        info!("标签页 {}: 🖼️ 开始上传图片...", page.worker_id);
        let bytes = decode_base64_payload(payload)
            .map_err(|e| GatewayError::upload(format!("图片数据解码失败: {}", e)))?;

        let mut artifact = tempfile::Builder::new()
            .prefix("temp_img_")
            .suffix(image_suffix(payload))
            .tempfile_in(&self.upload_dir)
            .map_err(|e| GatewayError::upload(format!("创建临时图片失败: {}", e)))?;
        artifact
            .write_all(&bytes)
            .and_then(|_| artifact.flush())
            .map_err(|e| GatewayError::upload(format!("写入临时图片失败: {}", e)))?;
        debug!(
            "标签页 {}: 图片已写入 {}",
            page.worker_id,
            artifact.path().display()
        );

        self.submit(page, IMAGE_FILE_INPUT, &[artifact.path().to_path_buf()])
            .await?;
        sleep(self.ui.upload_settle).await;

        info!("标签页 {}: 图片上传完成", page.worker_id);
        Ok(())
    }

    /// 上传多个文件附件，图片扩展名的附件跳过
    ///
    /// # 返回
    /// 实际提交的文件数量（全部被跳过时为 0，且不触碰页面）
    pub async fn upload_files(
        &self,
        page: PageCtx<'_>,
        files: &[FileAttachment],
    ) -> GatewayResult<usize> {
        let documents: Vec<&FileAttachment> = files
            .iter()
            .filter(|file| {
                let image = is_image(file);
                if image {
                    info!(
                        "标签页 {}: 跳过图片附件 {} ({})",
                        page.worker_id, file.filename, file.key
                    );
                }
                !image
            })
            .collect();

        if documents.is_empty() {
            info!("标签页 {}: 没有需要上传的文件", page.worker_id);
            return Ok(0);
        }

        info!(
            "标签页 {}: 📎 开始上传 {} 个文件...",
            page.worker_id,
            documents.len()
        );
        let staging = tempfile::Builder::new()
            .prefix("upload_")
            .tempdir_in(&self.upload_dir)
            .map_err(|e| GatewayError::upload(format!("创建临时目录失败: {}", e)))?;

        let mut paths = Vec::with_capacity(documents.len());
        for file in documents {
            let bytes = decode_base64_payload(&file.data).map_err(|e| {
                GatewayError::upload(format!("文件 {} 解码失败: {}", file.filename, e))
            })?;

            let mut path = staging.path().join(safe_file_name(&file.filename, &file.key));
            if paths.contains(&path) {
                path = staging
                    .path()
                    .join(format!("{}_{}", file.key, safe_file_name(&file.filename, &file.key)));
            }
            tokio::fs::write(&path, bytes).await.map_err(|e| {
                GatewayError::upload(format!("写入文件 {} 失败: {}", file.filename, e))
            })?;
            debug!("标签页 {}: 文件已写入 {}", page.worker_id, path.display());
            paths.push(path);
        }

        self.submit(page, DOCUMENT_FILE_INPUT, &paths).await?;
        sleep(self.ui.upload_settle).await;

        let outcome = match self.find_upload_error(page).await {
            Some(message) => Err(GatewayError::upload(message)),
            None => Ok(paths.len()),
        };
        self.dismiss_dialog(page).await;

        if outcome.is_ok() {
            info!("标签页 {}: 文件上传完成", page.worker_id);
        }
        outcome
    }

    /// 点击上传按钮，把文件交给对应的文件输入控件
    async fn submit(
        &self,
        page: PageCtx<'_>,
        inputs: &[&str],
        paths: &[PathBuf],
    ) -> GatewayResult<()> {
        let button = Locator::required("上传按钮", UPLOAD_BUTTON.iter().copied(), self.ui.upload_locator_timeout)
            .find(page.handle, self.ui.poll_interval)
            .await
            .map_err(|e| GatewayError::upload(e.to_string()))?;
        page.handle
            .click(&button, 0)
            .await
            .map_err(|e| GatewayError::upload(format!("点击上传按钮失败: {}", e)))?;
        sleep(self.ui.action_settle).await;

        let input = Locator::required("文件输入框", inputs.iter().copied(), self.ui.upload_locator_timeout)
            .find(page.handle, self.ui.poll_interval)
            .await
            .map_err(|e| GatewayError::upload(e.to_string()))?;
        page.handle
            .set_files(&input, paths)
            .await
            .map_err(|e| GatewayError::upload(format!("提交文件失败: {}", e)))
    }

    /// 依次检查已知的错误提示，返回第一个出现的提示文字
    async fn find_upload_error(&self, page: PageCtx<'_>) -> Option<String> {
        for selector in UPLOAD_ERROR {
            match page.handle.texts(selector).await {
                Ok(texts) if !texts.is_empty() => {
                    let message = texts
                        .into_iter()
                        .map(|t| t.trim().to_string())
                        .find(|t| !t.is_empty())
                        .unwrap_or_else(|| "文件上传失败".to_string());
                    warn!("标签页 {}: 文件上传出错: {}", page.worker_id, message);
                    return Some(message);
                }
                Ok(_) => {}
                Err(e) => debug!("标签页 {}: 检查 {} 出错: {}", page.worker_id, selector, e),
            }
        }
        None
    }

    async fn dismiss_dialog(&self, page: PageCtx<'_>) {
        if let Err(e) = page.handle.click(DIALOG_DISMISS, 0).await {
            debug!("标签页 {}: 关闭上传对话框失败: {}", page.worker_id, e);
        }
        sleep(self.ui.action_settle).await;
    }
}

/// 解码 base64，接受带 data URI 前缀和不带前缀两种形式
pub fn decode_base64_payload(payload: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let payload = payload.trim();
    let encoded = match payload.split_once(',') {
        Some((header, body)) if header.starts_with("data:") => body,
        _ => payload,
    };
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD.decode(compact)
}

/// 从 data URI 的 MIME 推断临时图片的后缀
fn image_suffix(payload: &str) -> &'static str {
    let mime = payload
        .trim()
        .strip_prefix("data:")
        .and_then(|rest| rest.split([';', ',']).next())
        .unwrap_or_default();
    match mime {
        "image/jpeg" | "image/jpg" => ".jpg",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        "image/bmp" => ".bmp",
        _ => ".png",
    }
}

fn is_image(file: &FileAttachment) -> bool {
    file.extension()
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// 只保留最后一段路径，空或非法时用字段名代替
fn safe_file_name(filename: &str, fallback: &str) -> String {
    let last = filename.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    match last {
        "" | "." | ".." => fallback.to_string(),
        name if Path::new(name).file_name().is_some() => name.to_string(),
        _ => fallback.to_string(),
    }
}
