use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{
    AuthUser, Backend, Collection, GatewayError, NewRecord, NewUserRecord, RawRecord, RecordFilter,
    RecordId, Result, UserPatch, UserRecord,
};

/// Where the managed provider's REST surfaces live
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Identity operations, sign-in/up/reset
    pub identity_base: String,
    /// Document collections
    pub data_base: String,
    /// Blob uploads
    pub blob_base: String,
    /// Appended to identity calls
    pub api_key: String,
    /// Per-request upper bound
    pub timeout: Duration,
}

/// The managed provider, reached over its REST surface.
///
/// The bearer token of the signed-in account is held here and attached
/// to every datastore and blob call.
pub struct RestBackend {
    config: RestConfig,
    client: Client,
    token: Mutex<Option<String>>,
}

/// The provider's identity responses
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityUser {
    local_id: String,
    email: String,
    id_token: String,
}

#[derive(Debug, Deserialize)]
struct AddedRecord {
    id: RecordId,
}

#[derive(Debug, Deserialize)]
struct UploadedBlob {
    url: String,
}

/// An identity call outcome before per-operation code mapping
enum IdentityError {
    /// The provider rejected the call with one of its code strings
    Code(String),
    Transport(GatewayError),
}

impl RestBackend {
    pub fn new(config: RestConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Backend(e.to_string()))?;

        Ok(Self {
            config,
            client,
            token: Default::default(),
        })
    }

    /// Performs an identity operation, returning the provider's code
    /// string on rejection so callers can map it per operation
    async fn identity(
        &self,
        operation: &str,
        body: Value,
    ) -> std::result::Result<Value, IdentityError> {
        let url = format!(
            "{}/{}?key={}",
            self.config.identity_base, operation, self.config.api_key
        );

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| IdentityError::Transport(transport_error(e)))?;

        if !response.status().is_success() {
            return Err(IdentityError::Code(provider_code(response).await));
        }

        response
            .json()
            .await
            .map_err(|e| IdentityError::Transport(GatewayError::Backend(e.to_string())))
    }

    async fn identity_user(
        &self,
        operation: &str,
        body: Value,
    ) -> std::result::Result<AuthUser, IdentityError> {
        let value = self.identity(operation, body).await?;

        let user: IdentityUser = serde_json::from_value(value)
            .map_err(|e| IdentityError::Transport(GatewayError::Backend(e.to_string())))?;

        *self.token.lock() = Some(user.id_token);

        Ok(AuthUser {
            uid: user.local_id,
            email: user.email,
        })
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.token.lock().as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn collection_url(&self, collection: Collection) -> String {
        format!("{}/{}", self.config.data_base, collection.wire_name())
    }

    fn user_url(&self, uid: &str) -> String {
        format!("{}/users/{}", self.config.data_base, uid)
    }
}

#[async_trait]
impl Backend for RestBackend {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        let body = json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });

        self.identity_user("accounts:signInWithPassword", body)
            .await
            .map_err(|e| match e {
                // The provider distinguishes unknown emails from wrong
                // passwords, the client must not
                IdentityError::Code(code) => match code.as_str() {
                    "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_EMAIL"
                    | "INVALID_LOGIN_CREDENTIALS" => GatewayError::InvalidCredential,
                    code => GatewayError::Backend(code.to_string()),
                },
                IdentityError::Transport(e) => e,
            })
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser> {
        let body = json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });

        self.identity_user("accounts:signUp", body)
            .await
            .map_err(|e| match e {
                IdentityError::Code(code) => match code.as_str() {
                    "EMAIL_EXISTS" => GatewayError::EmailInUse,
                    code if code.starts_with("WEAK_PASSWORD") => GatewayError::WeakPassword,
                    code => GatewayError::Backend(code.to_string()),
                },
                IdentityError::Transport(e) => e,
            })
    }

    async fn send_password_reset(&self, email: &str) -> Result<()> {
        let body = json!({
            "requestType": "PASSWORD_RESET",
            "email": email,
        });

        self.identity("accounts:sendOobCode", body)
            .await
            .map(|_| ())
            .map_err(|e| match e {
                IdentityError::Code(code) => match code.as_str() {
                    "EMAIL_NOT_FOUND" => GatewayError::NotFound {
                        resource: "account",
                        identifier: email.to_string(),
                    },
                    code => GatewayError::Backend(code.to_string()),
                },
                IdentityError::Transport(e) => e,
            })
    }

    async fn sign_out(&self) -> Result<()> {
        // Provider sessions are client-held tokens, dropping ours ends it
        *self.token.lock() = None;
        Ok(())
    }

    async fn user_record(&self, uid: &str) -> Result<Option<UserRecord>> {
        let response = self
            .authorized(self.client.get(self.user_url(uid)))
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(handle_unsuccessful(response, "user", uid).await);
        }

        let record = response
            .json()
            .await
            .map_err(|e| GatewayError::Backend(e.to_string()))?;

        Ok(Some(record))
    }

    async fn create_user_record(&self, uid: &str, record: NewUserRecord) -> Result<()> {
        let response = self
            .authorized(self.client.put(self.user_url(uid)))
            .json(&record.into_record())
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(handle_unsuccessful(response, "user", uid).await);
        }

        Ok(())
    }

    async fn update_user_record(&self, uid: &str, patch: UserPatch) -> Result<()> {
        let response = self
            .authorized(self.client.patch(self.user_url(uid)))
            .json(&patch)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(handle_unsuccessful(response, "user", uid).await);
        }

        Ok(())
    }

    async fn list(
        &self,
        collection: Collection,
        filter: Option<RecordFilter>,
    ) -> Result<Vec<RawRecord>> {
        let mut request = self.client.get(self.collection_url(collection));

        if let Some(RecordFilter::SemesterEquals(semester)) = filter {
            request = request.query(&[("semester", semester.value())]);
        }

        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(handle_unsuccessful(response, collection.wire_name(), "*").await);
        }

        let values: Vec<Value> = response
            .json()
            .await
            .map_err(|e| GatewayError::Backend(e.to_string()))?;

        values.into_iter().map(into_raw).collect()
    }

    async fn add(&self, collection: Collection, record: NewRecord) -> Result<RecordId> {
        let response = self
            .authorized(self.client.post(self.collection_url(collection)))
            .json(&record.body)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(handle_unsuccessful(response, collection.wire_name(), "*").await);
        }

        let added: AddedRecord = response
            .json()
            .await
            .map_err(|e| GatewayError::Backend(e.to_string()))?;

        Ok(added.id)
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<()> {
        let url = format!("{}/{}", self.collection_url(collection), id);

        let response = self
            .authorized(self.client.delete(url))
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(handle_unsuccessful(response, collection.wire_name(), id).await);
        }

        Ok(())
    }

    async fn upload_blob(&self, path: &str, bytes: Vec<u8>, mime: &str) -> Result<String> {
        let url = format!("{}/{}", self.config.blob_base, path);

        let response = self
            .authorized(self.client.post(url))
            .header(header::CONTENT_TYPE, mime)
            .body(bytes)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(handle_unsuccessful(response, "blob", path).await);
        }

        let uploaded: UploadedBlob = response
            .json()
            .await
            .map_err(|e| GatewayError::Backend(e.to_string()))?;

        Ok(uploaded.url)
    }
}

fn transport_error(error: reqwest::Error) -> GatewayError {
    if error.is_timeout() || error.is_connect() {
        GatewayError::Network(error.to_string())
    } else {
        GatewayError::Backend(error.to_string())
    }
}

/// Extracts the provider's code string from a rejected identity call
async fn provider_code(response: Response) -> String {
    let value: Value = match response.json().await {
        Ok(value) => value,
        Err(e) => return e.to_string(),
    };

    value["error"]["message"]
        .as_str()
        .unwrap_or("UNKNOWN")
        .to_string()
}

async fn handle_unsuccessful(
    response: Response,
    resource: &'static str,
    identifier: &str,
) -> GatewayError {
    match response.status() {
        StatusCode::NOT_FOUND => GatewayError::NotFound {
            resource,
            identifier: identifier.to_string(),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::PermissionDenied,
        _ => match response.text().await {
            Ok(text) => GatewayError::Backend(text),
            Err(e) => GatewayError::Backend(e.to_string()),
        },
    }
}

fn into_raw(value: Value) -> Result<RawRecord> {
    let mut object = match value {
        Value::Object(object) => object,
        _ => return Err(GatewayError::Backend("record is not an object".to_string())),
    };

    let id = object
        .remove("id")
        .and_then(|v| v.as_str().map(str::to_string))
        .ok_or_else(|| GatewayError::Backend("record is missing an id".to_string()))?;

    let created_at = object
        .remove("createdAt")
        .and_then(|v| {
            v.as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        })
        .map(|d| d.with_timezone(&Utc))
        .ok_or_else(|| GatewayError::Backend("record is missing createdAt".to_string()))?;

    Ok(RawRecord {
        id,
        created_at,
        body: Value::Object(object),
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_into_raw_splits_envelope_from_body() {
        let record = into_raw(json!({
            "id": "rec-1",
            "createdAt": "2025-06-03T10:00:00Z",
            "title": "Holiday",
            "content": "No class",
        }))
        .unwrap();

        assert_eq!(record.id, "rec-1");
        assert_eq!(record.body["title"], "Holiday");
        assert!(
            record.body.get("createdAt").is_none(),
            "envelope fields must not leak into the body"
        );
    }

    #[test]
    fn test_into_raw_rejects_malformed_records() {
        assert!(into_raw(json!("not an object")).is_err());
        assert!(into_raw(json!({ "title": "no envelope" })).is_err());
    }
}
