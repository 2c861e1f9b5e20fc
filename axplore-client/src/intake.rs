use async_trait::async_trait;
use thiserror::Error;

use crate::Collection;

#[derive(Debug, Error)]
pub enum IntakeError {
    /// The OS picker failed, distinct from the user cancelling
    #[error("Picker failure: {0}")]
    Picker(String),
}

/// An image acquired from the device, full resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickedImage {
    pub bytes: Vec<u8>,
    pub mime: String,
}

/// A document acquired from the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickedDocument {
    /// The original filename, kept as the record title
    pub name: String,
    pub bytes: Vec<u8>,
    pub mime: String,
}

/// Represents the device's media acquisition surface.
///
/// `None` means the user cancelled the picker. Picked bytes are
/// transient, nothing may assume they survive an app restart.
#[async_trait]
pub trait MediaPicker: Send + Sync {
    async fn pick_image(&self) -> Result<Option<PickedImage>, IntakeError>;
    async fn pick_document(&self) -> Result<Option<PickedDocument>, IntakeError>;
}

/// The document types teachers may upload
pub const SUPPORTED_DOCUMENT_MIME: [&str; 7] = [
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
];

pub fn is_supported_document(mime: &str) -> bool {
    SUPPORTED_DOCUMENT_MIME.contains(&mime)
}

/// Blob path for a principal's avatar, one per account
pub fn profile_picture_path(uid: &str) -> String {
    format!("profilePictures/{}", uid)
}

/// Blob path for a feed image, keyed by upload time
pub fn feed_image_path(epoch_ms: u128) -> String {
    format!("recentUpdates/{}", epoch_ms)
}

/// Blob path for a filed document.
///
/// The token keeps two uploads of the same filename from overwriting
/// each other, the extension stays at the end so viewers resolve it.
pub fn document_path(collection: Collection, original_name: &str, token: &str) -> String {
    let name = match original_name.rsplit_once('.') {
        Some((stem, extension)) => format!("{}-{}.{}", stem, token, extension),
        None => format!("{}-{}", original_name, token),
    };

    format!("{}/{}", collection.wire_name(), name)
}

/// A picker that always yields the same media, for tests and previews
#[derive(Default)]
pub struct StubPicker {
    image: Option<PickedImage>,
    document: Option<PickedDocument>,
}

impl StubPicker {
    /// A picker where the user cancels everything
    pub fn empty() -> Self {
        Default::default()
    }

    pub fn with_image(image: PickedImage) -> Self {
        Self {
            image: Some(image),
            document: None,
        }
    }

    pub fn with_document(document: PickedDocument) -> Self {
        Self {
            image: None,
            document: Some(document),
        }
    }
}

#[async_trait]
impl MediaPicker for StubPicker {
    async fn pick_image(&self) -> Result<Option<PickedImage>, IntakeError> {
        Ok(self.image.clone())
    }

    async fn pick_document(&self) -> Result<Option<PickedDocument>, IntakeError> {
        Ok(self.document.clone())
    }
}
