//! Image-host collaborator with an inline `data:` URL fallback.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tasknest_core::{Language, image::resized_url};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{DEFAULT_MAX_IMAGE_BYTES, ImageConfig};

/// Content types accepted for upload.
pub const ACCEPTED_CONTENT_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Guess an accepted content type from a file name.
#[must_use]
pub fn content_type_for_name(name: &str) -> Option<&'static str> {
    let (_, extension) = name.rsplit_once('.')?;
    match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Image rejected before reaching the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    /// Content type outside [`ACCEPTED_CONTENT_TYPES`].
    #[error("unsupported image type: {content_type}")]
    UnsupportedType {
        /// Offending content type.
        content_type: String,
    },
    /// Payload larger than the configured limit.
    #[error("image is {size} bytes, limit is {max}")]
    TooLarge {
        /// Payload size.
        size: usize,
        /// Configured limit.
        max: usize,
    },
    /// Malformed `data:` URL.
    #[error("invalid data URL: {0}")]
    InvalidDataUrl(String),
}

impl ImageError {
    /// Convert the error into a message that is friendly for end-users.
    #[must_use]
    pub fn describe_user_facing(&self, language: Language) -> String {
        match (self, language) {
            (Self::UnsupportedType { .. }, Language::Fr) => {
                "Seules les images JPEG, PNG, GIF et WEBP sont acceptées".to_owned()
            }
            (Self::UnsupportedType { .. }, Language::En) => "Only JPEG, PNG, GIF and WEBP images are accepted".to_owned(),
            (Self::TooLarge { max, .. }, Language::Fr) => {
                format!("L'image ne doit pas dépasser {}MB", max / (1024 * 1024))
            }
            (Self::TooLarge { max, .. }, Language::En) => {
                format!("The image must not exceed {}MB", max / (1024 * 1024))
            }
            (Self::InvalidDataUrl(_), _) => self.to_string(),
        }
    }
}

/// Image payload waiting for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    /// Original file name.
    pub name: String,
    /// MIME type.
    pub content_type: String,
    /// Raw bytes.
    pub bytes: Vec<u8>,
}

impl ImageFile {
    /// Wrap raw bytes.
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Decode a base64 `data:` URL.
    ///
    /// # Errors
    /// Returns [`ImageError::InvalidDataUrl`] when the header or payload is malformed.
    pub fn from_data_url(data_url: &str, name: impl Into<String>) -> Result<Self, ImageError> {
        let (header, payload) = data_url
            .split_once(',')
            .ok_or_else(|| ImageError::InvalidDataUrl("missing payload separator".into()))?;
        let header = header
            .strip_prefix("data:")
            .ok_or_else(|| ImageError::InvalidDataUrl("missing data: scheme".into()))?;
        let content_type = header
            .strip_suffix(";base64")
            .filter(|mime| !mime.is_empty())
            .ok_or_else(|| ImageError::InvalidDataUrl("could not extract MIME type".into()))?;
        let bytes = STANDARD
            .decode(payload)
            .map_err(|err| ImageError::InvalidDataUrl(err.to_string()))?;
        Ok(Self::new(name, content_type, bytes))
    }

    /// Encode as a base64 `data:` URL.
    #[must_use]
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.content_type, STANDARD.encode(&self.bytes))
    }

    /// Check the content type and size.
    ///
    /// # Errors
    /// Returns the first rule the payload breaks.
    pub fn validate(&self, max_bytes: usize) -> Result<(), ImageError> {
        if !ACCEPTED_CONTENT_TYPES.contains(&self.content_type.as_str()) {
            return Err(ImageError::UnsupportedType {
                content_type: self.content_type.clone(),
            });
        }
        if self.bytes.len() > max_bytes {
            return Err(ImageError::TooLarge {
                size: self.bytes.len(),
                max: max_bytes,
            });
        }
        Ok(())
    }
}

/// Failure reported by an image host.
#[derive(Debug, Error)]
pub enum HostError {
    /// Account or preset missing.
    #[error("image host is not configured")]
    NotConfigured,
    /// The host answered with an error payload.
    #[error("image host rejected the upload ({status}): {message}")]
    Rejected {
        /// HTTP status.
        status: u16,
        /// Host-provided message.
        message: String,
    },
    /// The request never completed.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// Hosted image CDN.
#[allow(async_fn_in_trait)]
pub trait ImageHost {
    /// Whether uploads can be attempted at all.
    fn is_configured(&self) -> bool;

    /// Upload the payload and return its public URL.
    ///
    /// # Errors
    /// Returns the host failure.
    async fn upload(&self, file: &ImageFile) -> Result<String, HostError>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

/// [`ImageHost`] speaking the unsigned-upload HTTP API.
#[derive(Debug, Clone)]
pub struct HttpImageHost {
    client: Client,
    config: ImageConfig,
}

impl HttpImageHost {
    /// Build a host from configuration.
    #[must_use]
    pub fn new(config: ImageConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

impl ImageHost for HttpImageHost {
    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    async fn upload(&self, file: &ImageFile) -> Result<String, HostError> {
        let (Some(url), Some(preset)) = (self.config.upload_url(), self.config.upload_preset.clone()) else {
            return Err(HostError::NotConfigured);
        };
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.content_type)?;
        let form = Form::new().part("file", part).text("upload_preset", preset);
        let response = self.client.post(url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body: serde_json::Value = response.json().await.unwrap_or_default();
            let message = body
                .pointer("/error/message")
                .and_then(serde_json::Value::as_str)
                .map_or_else(|| status.to_string(), str::to_owned);
            return Err(HostError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        let body: UploadResponse = response.json().await?;
        Ok(body.secure_url)
    }
}

/// Why an upload ended up inline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// No account or preset configured.
    NotConfigured,
    /// The host refused the upload preset.
    PresetRejected(String),
    /// Any other host failure.
    HostFailed(String),
}

impl FallbackReason {
    fn from_host_error(err: &HostError) -> Self {
        match err {
            HostError::NotConfigured => Self::NotConfigured,
            HostError::Rejected { message, .. }
                if message.contains("upload preset") || message.contains("whitelist") =>
            {
                Self::PresetRejected(message.clone())
            }
            other => Self::HostFailed(other.to_string()),
        }
    }
}

/// Result of [`ImageUploader::upload`]: which path produced the URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Stored on the image host.
    Hosted {
        /// Public URL.
        url: String,
    },
    /// Encoded inline.
    Inline {
        /// `data:` URL carrying the payload.
        data_url: String,
        /// Why the host was not used.
        reason: FallbackReason,
    },
}

impl UploadOutcome {
    /// URL to store on the task.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Hosted { url } => url,
            Self::Inline { data_url, .. } => data_url,
        }
    }

    /// True when the image host stored the payload.
    #[must_use]
    pub const fn is_hosted(&self) -> bool {
        matches!(self, Self::Hosted { .. })
    }
}

/// URL of a resized rendition; inline and foreign URLs are returned unchanged.
#[must_use]
pub fn resize_url(url: &str, width: u32, height: u32) -> String {
    resized_url(url, width, height)
}

/// Validates payloads, tries the host, and falls back to inline encoding.
pub struct ImageUploader<H> {
    host: H,
    max_bytes: usize,
}

impl<H: ImageHost> ImageUploader<H> {
    /// Uploader with the default 5 MiB limit.
    pub const fn new(host: H) -> Self {
        Self {
            host,
            max_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }

    /// Override the size limit.
    #[must_use]
    pub const fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Upload `file`, falling back to a `data:` URL when the host is unusable.
    ///
    /// # Errors
    /// Returns [`ImageError`] when the payload is rejected before any network call.
    pub async fn upload(&self, file: &ImageFile) -> Result<UploadOutcome, ImageError> {
        file.validate(self.max_bytes)?;
        let reason = if self.host.is_configured() {
            match self.host.upload(file).await {
                Ok(url) => {
                    info!(name = %file.name, "Uploaded image");
                    return Ok(UploadOutcome::Hosted { url });
                }
                Err(err) => FallbackReason::from_host_error(&err),
            }
        } else {
            FallbackReason::NotConfigured
        };
        warn!(name = %file.name, ?reason, "Falling back to inline image");
        Ok(UploadOutcome::Inline {
            data_url: file.to_data_url(),
            reason,
        })
    }

    /// Borrow the underlying host.
    pub const fn host(&self) -> &H {
        &self.host
    }
}
