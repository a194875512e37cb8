//! Outbound delivery of results back to the requester.
//!
//! The pipeline only hands over structured values; all user-facing text is
//! rendered here through `Display`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};

use crate::config::DeliveryConfig;
use crate::error::DeliveryError;
use crate::types::JobOutcome;

/// Caption sent with a single transformed image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageReceipt {
    pub file_name: String,
    pub elapsed: Duration,
}

impl fmt::Display for ImageReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "✅ Image processed: {}\n⏱️ Execution time: {:.2} seconds",
            self.file_name,
            self.elapsed.as_secs_f64()
        )
    }
}

/// Per-image condition reported back instead of a result file.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageNotice {
    NotFound { name: String },
    AspectRatio { name: String, ratio: f64 },
    Failed { name: String },
}

impl fmt::Display for ImageNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { name } => write!(f, "❌ Image not found: {name}"),
            Self::AspectRatio { name, .. } => {
                write!(f, "❌ Image {name} does not match the required aspect ratio.")
            }
            Self::Failed { name } => {
                write!(f, "❌ An error occurred while processing image {name}.")
            }
        }
    }
}

/// Caption sent with a result archive.
pub struct ArchiveCaption<'a>(pub &'a JobOutcome);

impl fmt::Display for ArchiveCaption<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = self.0;
        write!(
            f,
            "✅ Processing complete!\nSuccessfully processed: {}\nErrors: {}\n⏱️ Execution time: {:.2} seconds",
            outcome.success_count,
            outcome.error_count,
            outcome.elapsed.as_secs_f64()
        )
    }
}

/// Channel results are sent back through.
#[async_trait]
pub trait Delivery: Send + Sync {
    /// Deliver one transformed image.
    async fn send_image(
        &self,
        requester: &str,
        path: &Path,
        receipt: &ImageReceipt,
    ) -> Result<(), DeliveryError>;

    /// Deliver a packaged result archive.
    async fn send_archive(
        &self,
        requester: &str,
        path: &Path,
        outcome: &JobOutcome,
    ) -> Result<(), DeliveryError>;

    /// Report a per-image condition that produced no file.
    async fn report(&self, requester: &str, notice: &ImageNotice) -> Result<(), DeliveryError>;
}

/// Resolve `${VAR}` references against the environment. Empty values and
/// unset variables resolve to `None`.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok().filter(|v| !v.is_empty())
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Delivery through a bot-style HTTP API (`/bot<token>/<method>`).
pub struct HttpDelivery {
    api_base: String,
    token: String,
    client: reqwest::Client,
}

impl fmt::Debug for HttpDelivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpDelivery")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl HttpDelivery {
    pub fn new(api_base: &str, token: &str, timeout: Duration) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeliveryError::Http {
                message: format!("Failed to build HTTP client: {e}"),
                status_code: None,
            })?;
        Ok(Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
            client,
        })
    }

    /// Build from config. Returns `Ok(None)` when no token is configured.
    pub fn from_config(config: &DeliveryConfig) -> Result<Option<Self>, DeliveryError> {
        match resolve_env_var(&config.token) {
            Some(token) => Self::new(
                &config.api_base,
                &token,
                Duration::from_secs(config.timeout_secs),
            )
            .map(Some),
            None => Ok(None),
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), DeliveryError> {
        let resp = self
            .client
            .post(self.endpoint("sendMessage"))
            .form(&[("chat_id", chat_id), ("text", text)])
            .send()
            .await
            .map_err(|e| DeliveryError::Http {
                message: format!("sendMessage request failed: {e}"),
                status_code: None,
            })?;
        check_status("sendMessage", resp).await
    }

    async fn send_document(
        &self,
        chat_id: &str,
        path: &Path,
        caption: &str,
    ) -> Result<(), DeliveryError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .part("document", Part::bytes(bytes).file_name(file_name));

        let resp = self
            .client
            .post(self.endpoint("sendDocument"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| DeliveryError::Http {
                message: format!("sendDocument request failed: {e}"),
                status_code: None,
            })?;
        check_status("sendDocument", resp).await
    }
}

async fn check_status(method: &str, resp: reqwest::Response) -> Result<(), DeliveryError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    let text = resp.text().await.unwrap_or_default();
    Err(DeliveryError::Http {
        message: format!("{method} HTTP {status}: {text}"),
        status_code: Some(status.as_u16()),
    })
}

#[async_trait]
impl Delivery for HttpDelivery {
    async fn send_image(
        &self,
        requester: &str,
        path: &Path,
        receipt: &ImageReceipt,
    ) -> Result<(), DeliveryError> {
        self.send_document(requester, path, &receipt.to_string())
            .await
    }

    async fn send_archive(
        &self,
        requester: &str,
        path: &Path,
        outcome: &JobOutcome,
    ) -> Result<(), DeliveryError> {
        self.send_document(requester, path, &ArchiveCaption(outcome).to_string())
            .await
    }

    async fn report(&self, requester: &str, notice: &ImageNotice) -> Result<(), DeliveryError> {
        self.send_message(requester, &notice.to_string()).await
    }
}

/// Delivery into a local directory, one sub-directory per requester.
///
/// Notices are logged and kept in memory so callers can inspect them.
#[derive(Debug)]
pub struct LocalDelivery {
    dir: PathBuf,
    notices: Mutex<Vec<String>>,
}

impl LocalDelivery {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            notices: Mutex::new(Vec::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Rendered notices reported so far, oldest first.
    pub fn notices(&self) -> Vec<String> {
        match self.notices.lock() {
            Ok(notices) => notices.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    async fn copy_in(&self, requester: &str, path: &Path) -> Result<PathBuf, DeliveryError> {
        let target_dir = self.dir.join(requester);
        tokio::fs::create_dir_all(&target_dir).await?;
        let name = path.file_name().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name")
        })?;
        let target = target_dir.join(name);
        tokio::fs::copy(path, &target).await?;
        Ok(target)
    }
}

#[async_trait]
impl Delivery for LocalDelivery {
    async fn send_image(
        &self,
        requester: &str,
        path: &Path,
        receipt: &ImageReceipt,
    ) -> Result<(), DeliveryError> {
        let target = self.copy_in(requester, path).await?;
        tracing::info!("Delivered {:?} to {}: {}", target, requester, receipt);
        Ok(())
    }

    async fn send_archive(
        &self,
        requester: &str,
        path: &Path,
        outcome: &JobOutcome,
    ) -> Result<(), DeliveryError> {
        let target = self.copy_in(requester, path).await?;
        tracing::info!(
            "Delivered {:?} to {}: {}",
            target,
            requester,
            ArchiveCaption(outcome)
        );
        Ok(())
    }

    async fn report(&self, requester: &str, notice: &ImageNotice) -> Result<(), DeliveryError> {
        let text = notice.to_string();
        tracing::info!("Notice for {}: {}", requester, text);
        match self.notices.lock() {
            Ok(mut notices) => notices.push(text),
            Err(poisoned) => poisoned.into_inner().push(text),
        }
        Ok(())
    }
}
