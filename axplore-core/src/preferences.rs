use std::sync::Arc;

use async_trait::async_trait;
use log::warn;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PreferenceError>;

/// The recognized preference keys.
///
/// Absence of a key means "use the default".
pub mod keys {
    pub const NOTIFICATIONS: &str = "notifications";
    pub const EMAIL_NOTIFICATIONS: &str = "emailNotifications";
    pub const DOWNLOAD_OVER_WIFI: &str = "downloadOverWifi";
    pub const AUTO_PLAY: &str = "autoPlay";
    pub const REMEMBER_ME: &str = "rememberMe";
    /// Present only while [REMEMBER_ME] is set
    pub const EMAIL: &str = "email";
}

#[derive(Debug, Error)]
pub enum PreferenceError {
    /// The device key-value store could not be reached
    #[error("preference store unavailable: {0}")]
    Unavailable(String),
}

/// Represents a device-local key-value store preferences are kept in.
/// Values are textual, booleans encode as "true"/"false".
#[async_trait]
pub trait PreferenceBackend: Send + Sync {
    async fn read(&self, key: &str) -> Result<Option<String>>;
    async fn write(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

/// Typed view over the preference store.
///
/// Reads never fail the caller: a store failure is logged and the
/// default answer is returned instead.
pub struct Preferences<P> {
    backend: Arc<P>,
}

impl<P> Preferences<P>
where
    P: PreferenceBackend,
{
    pub fn new(backend: &Arc<P>) -> Self {
        Self {
            backend: backend.clone(),
        }
    }

    pub async fn notifications(&self) -> bool {
        self.flag(keys::NOTIFICATIONS, true).await
    }

    pub async fn email_notifications(&self) -> bool {
        self.flag(keys::EMAIL_NOTIFICATIONS, true).await
    }

    pub async fn download_over_wifi(&self) -> bool {
        self.flag(keys::DOWNLOAD_OVER_WIFI, true).await
    }

    pub async fn auto_play(&self) -> bool {
        self.flag(keys::AUTO_PLAY, false).await
    }

    pub async fn remember_me(&self) -> bool {
        self.flag(keys::REMEMBER_ME, false).await
    }

    pub async fn set_notifications(&self, on: bool) -> Result<()> {
        self.backend
            .write(keys::NOTIFICATIONS, bool_str(on))
            .await
    }

    pub async fn set_email_notifications(&self, on: bool) -> Result<()> {
        self.backend
            .write(keys::EMAIL_NOTIFICATIONS, bool_str(on))
            .await
    }

    pub async fn set_download_over_wifi(&self, on: bool) -> Result<()> {
        self.backend
            .write(keys::DOWNLOAD_OVER_WIFI, bool_str(on))
            .await
    }

    pub async fn set_auto_play(&self, on: bool) -> Result<()> {
        self.backend.write(keys::AUTO_PLAY, bool_str(on)).await
    }

    /// The email to pre-fill at sign-in, if the user opted in earlier
    pub async fn remembered_email(&self) -> Option<String> {
        if !self.remember_me().await {
            return None;
        }

        match self.backend.read(keys::EMAIL).await {
            Ok(email) => email,
            Err(e) => {
                warn!("Failed to read remembered email: {}", e);
                None
            }
        }
    }

    /// Persists the email for pre-fill. The password is never stored.
    pub async fn remember_email(&self, email: &str) -> Result<()> {
        self.backend.write(keys::EMAIL, email).await?;
        self.backend.write(keys::REMEMBER_ME, "true").await
    }

    /// Removes the remembered email and the opt-in flag
    pub async fn forget_email(&self) -> Result<()> {
        self.backend.remove(keys::EMAIL).await?;
        self.backend.remove(keys::REMEMBER_ME).await
    }

    /// Wipes every stored preference
    pub async fn clear_all(&self) -> Result<()> {
        self.backend.clear().await
    }

    async fn flag(&self, key: &str, default: bool) -> bool {
        let value = match self.backend.read(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to read preference {}: {}", key, e);
                return default;
            }
        };

        match value {
            // Default-on keys stay on unless explicitly turned off,
            // default-off keys need an explicit opt-in
            Some(value) if default => value != "false",
            Some(value) => value == "true",
            None => default,
        }
    }
}

impl<P> Clone for Preferences<P> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
        }
    }
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}
