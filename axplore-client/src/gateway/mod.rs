use std::fmt::{self, Display};

use async_trait::async_trait;
use thiserror::Error;

mod data;
pub use data::*;

mod rest;
pub use rest::*;

mod memory;
pub use memory::*;

pub type Result<T> = std::result::Result<T, GatewayError>;
pub type BoxedBackend = Box<dyn Backend>;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The identity provider rejected the credentials
    #[error("Incorrect email or password. Please try again.")]
    InvalidCredential,
    #[error("An account with this email already exists")]
    EmailInUse,
    #[error("Password should be at least 6 characters.")]
    WeakPassword,
    /// A record or account doesn't exist on the backend
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: String,
    },
    /// The backend refused a mutation for this principal
    #[error("Permission denied")]
    PermissionDenied,
    /// Offline, timed out, or the transport failed
    #[error("Network error: {0}")]
    Network(String),
    /// Any other failure reported by the managed provider
    #[error("Backend error: {0}")]
    Backend(String),
}

/// The document collections the backend keeps.
///
/// Wire names are compatibility-critical, existing data lives under them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    NewsUpdates,
    UpcomingEvents,
    RecentUpdates,
    StudyMaterials,
    QuestionPapers,
}

impl Collection {
    pub fn wire_name(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::NewsUpdates => "newsUpdates",
            Collection::UpcomingEvents => "upcomingEvents",
            Collection::RecentUpdates => "recentUpdates",
            Collection::StudyMaterials => "studyMaterials",
            Collection::QuestionPapers => "questionPapers",
        }
    }
}

impl Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}

/// The filters [Backend::list] supports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFilter {
    /// Equality on the numeric semester field
    SemesterEquals(Semester),
}

/// Represents the managed identity/datastore/blob provider the client
/// talks to. The gateway neither enforces authorization nor retries,
/// both are the backend's and the caller's jobs respectively.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser>;
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser>;
    async fn send_password_reset(&self, email: &str) -> Result<()>;
    /// Clears the provider session
    async fn sign_out(&self) -> Result<()>;

    async fn user_record(&self, uid: &str) -> Result<Option<UserRecord>>;
    async fn create_user_record(&self, uid: &str, record: NewUserRecord) -> Result<()>;
    /// Partial semantics, only the provided fields are mutated
    async fn update_user_record(&self, uid: &str, patch: UserPatch) -> Result<()>;

    async fn list(
        &self,
        collection: Collection,
        filter: Option<RecordFilter>,
    ) -> Result<Vec<RawRecord>>;
    /// Adds a record. `createdAt` is assigned server-side.
    async fn add(&self, collection: Collection, record: NewRecord) -> Result<RecordId>;
    async fn delete(&self, collection: Collection, id: &str) -> Result<()>;

    /// Uploads an opaque blob and returns its public URL.
    /// The path is caller-chosen and must be unique per upload.
    async fn upload_blob(&self, path: &str, bytes: Vec<u8>, mime: &str) -> Result<String>;
}
