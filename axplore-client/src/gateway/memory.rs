use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;

use super::{
    AuthUser, Backend, Collection, GatewayError, NewRecord, NewUserRecord, RawRecord, RecordFilter,
    RecordId, Result, UserPatch, UserRecord,
};

struct StoredAccount {
    uid: String,
    password: String,
}

/// An in-process backend.
///
/// It plays the managed provider for tests and offline previews:
/// ids and `createdAt` are assigned here, the way the real provider
/// assigns them server-side.
#[derive(Default)]
pub struct MemoryBackend {
    accounts: DashMap<String, StoredAccount>,
    users: DashMap<String, UserRecord>,
    collections: DashMap<Collection, Vec<RawRecord>>,
    blobs: DashMap<String, usize>,
    current_uid: Mutex<Option<String>>,
    next_id: AtomicU64,
    operations: AtomicUsize,
}

impl MemoryBackend {
    const MIN_PASSWORD_LENGTH: usize = 6;

    pub fn new() -> Self {
        Default::default()
    }

    /// How many gateway operations have been initiated, used to assert
    /// that gated surfaces make none
    pub fn operation_count(&self) -> usize {
        self.operations.load(Ordering::SeqCst)
    }

    /// The uid of the signed-in account, if any
    pub fn current_uid(&self) -> Option<String> {
        self.current_uid.lock().clone()
    }

    fn count(&self) {
        self.operations.fetch_add(1, Ordering::SeqCst);
    }

    fn assign_id(&self) -> RecordId {
        format!("rec-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        self.count();

        let account = self
            .accounts
            .get(email)
            .ok_or(GatewayError::InvalidCredential)?;

        if account.password != password {
            return Err(GatewayError::InvalidCredential);
        }

        *self.current_uid.lock() = Some(account.uid.clone());

        Ok(AuthUser {
            uid: account.uid.clone(),
            email: email.to_string(),
        })
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser> {
        self.count();

        if self.accounts.contains_key(email) {
            return Err(GatewayError::EmailInUse);
        }

        if password.len() < Self::MIN_PASSWORD_LENGTH {
            return Err(GatewayError::WeakPassword);
        }

        let uid = format!("uid-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);

        self.accounts.insert(
            email.to_string(),
            StoredAccount {
                uid: uid.clone(),
                password: password.to_string(),
            },
        );

        *self.current_uid.lock() = Some(uid.clone());

        Ok(AuthUser {
            uid,
            email: email.to_string(),
        })
    }

    async fn send_password_reset(&self, email: &str) -> Result<()> {
        self.count();

        if !self.accounts.contains_key(email) {
            return Err(GatewayError::NotFound {
                resource: "account",
                identifier: email.to_string(),
            });
        }

        Ok(())
    }

    async fn sign_out(&self) -> Result<()> {
        self.count();
        *self.current_uid.lock() = None;
        Ok(())
    }

    async fn user_record(&self, uid: &str) -> Result<Option<UserRecord>> {
        self.count();
        Ok(self.users.get(uid).map(|r| r.clone()))
    }

    async fn create_user_record(&self, uid: &str, record: NewUserRecord) -> Result<()> {
        self.count();

        let mut record = record.into_record();
        record.created_at = Some(Utc::now().to_rfc3339());

        self.users.insert(uid.to_string(), record);
        Ok(())
    }

    async fn update_user_record(&self, uid: &str, patch: UserPatch) -> Result<()> {
        self.count();

        let mut record = self.users.get_mut(uid).ok_or(GatewayError::NotFound {
            resource: "user",
            identifier: uid.to_string(),
        })?;

        if let Some(name) = patch.name {
            record.name = name;
        }
        if let Some(semester) = patch.semester {
            record.semester = Some(semester);
        }
        if let Some(bio) = patch.bio {
            record.bio = Some(bio);
        }
        if let Some(phone) = patch.phone {
            record.phone = Some(phone);
        }
        if let Some(picture) = patch.profile_picture {
            record.profile_picture = Some(picture);
        }

        Ok(())
    }

    async fn list(
        &self,
        collection: Collection,
        filter: Option<RecordFilter>,
    ) -> Result<Vec<RawRecord>> {
        self.count();

        let records = self
            .collections
            .get(&collection)
            .map(|r| r.clone())
            .unwrap_or_default();

        let records = match filter {
            Some(RecordFilter::SemesterEquals(semester)) => records
                .into_iter()
                .filter(|r| r.body["semester"].as_u64() == Some(semester.value() as u64))
                .collect(),
            None => records,
        };

        Ok(records)
    }

    async fn add(&self, collection: Collection, record: NewRecord) -> Result<RecordId> {
        self.count();

        let id = self.assign_id();

        self.collections
            .entry(collection)
            .or_default()
            .push(RawRecord {
                id: id.clone(),
                created_at: Utc::now(),
                body: record.body,
            });

        Ok(id)
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<()> {
        self.count();

        let mut records = self.collections.entry(collection).or_default();

        let exists = records.iter().any(|r| r.id == id);
        if !exists {
            return Err(GatewayError::NotFound {
                resource: collection.wire_name(),
                identifier: id.to_string(),
            });
        }

        records.retain(|r| r.id != id);
        Ok(())
    }

    async fn upload_blob(&self, path: &str, bytes: Vec<u8>, _mime: &str) -> Result<String> {
        self.count();

        self.blobs.insert(path.to_string(), bytes.len());
        Ok(format!("memory://blobs/{}", path))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_sign_up_then_in() {
        let backend = MemoryBackend::new();

        let created = backend.sign_up("asha@x.edu", "secret1").await.unwrap();
        let signed_in = backend.sign_in("asha@x.edu", "secret1").await.unwrap();

        assert_eq!(created.uid, signed_in.uid);
        assert!(matches!(
            backend.sign_in("asha@x.edu", "wrong").await,
            Err(GatewayError::InvalidCredential)
        ));
    }

    #[tokio::test]
    async fn test_sign_up_conflicts() {
        let backend = MemoryBackend::new();

        backend.sign_up("asha@x.edu", "secret1").await.unwrap();

        assert!(matches!(
            backend.sign_up("asha@x.edu", "secret2").await,
            Err(GatewayError::EmailInUse)
        ));
        assert!(matches!(
            backend.sign_up("new@x.edu", "short").await,
            Err(GatewayError::WeakPassword)
        ));
    }

    #[tokio::test]
    async fn test_delete_requires_existing_record() {
        let backend = MemoryBackend::new();

        let record = NewRecord::encode(&serde_json::json!({ "title": "Holiday" })).unwrap();
        let id = backend.add(Collection::NewsUpdates, record).await.unwrap();

        backend.delete(Collection::NewsUpdates, &id).await.unwrap();

        assert!(matches!(
            backend.delete(Collection::NewsUpdates, &id).await,
            Err(GatewayError::NotFound { .. })
        ));
    }
}
