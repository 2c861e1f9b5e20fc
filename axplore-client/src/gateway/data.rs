use std::fmt::{self, Display};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use super::{GatewayError, Result};

/// Backend-assigned record identifier
pub type RecordId = String;

/// A semester, always within 1 to 6
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Semester(u8);

impl Semester {
    pub const FIRST: Semester = Semester(1);
    pub const LAST: Semester = Semester(6);

    pub const ALL: [Semester; 6] = [
        Semester(1),
        Semester(2),
        Semester(3),
        Semester(4),
        Semester(5),
        Semester(6),
    ];

    pub fn new(value: u8) -> Option<Self> {
        (1..=6).contains(&value).then_some(Self(value))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Semester {
    type Error = &'static str;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        Semester::new(value).ok_or("semester must be within 1 to 6")
    }
}

impl From<Semester> for u8 {
    fn from(value: Semester) -> Self {
        value.0
    }
}

impl Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role a principal holds, server-side truth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    #[default]
    Student,
    Teacher,
}

impl Role {
    /// Missing or unknown wire values resolve to the least privilege
    pub fn from_wire(value: Option<&str>) -> Self {
        match value {
            Some("teacher") => Role::Teacher,
            _ => Role::Student,
        }
    }

    pub fn wire_name(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
        }
    }

    pub fn is_teacher(&self) -> bool {
        matches!(self, Role::Teacher)
    }
}

/// The account the identity provider resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
}

/// The signed-in user as the client knows it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub uid: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    /// Present for students only
    pub semester: Option<Semester>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub profile_picture: Option<String>,
}

/// A record in the users collection, in its wire shape.
/// Students carry their semester as a string, existing records do.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semester: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl UserRecord {
    pub fn into_principal(self, auth: &AuthUser) -> Principal {
        Principal {
            uid: auth.uid.clone(),
            email: auth.email.clone(),
            name: self.name,
            role: Role::from_wire(self.role.as_deref()),
            semester: self
                .semester
                .and_then(|s| s.parse().ok())
                .and_then(Semester::new),
            bio: self.bio,
            phone: self.phone,
            profile_picture: self.profile_picture,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUserRecord {
    pub name: String,
    pub email: String,
    pub role: Role,
    /// Attached for students only
    pub semester: Option<Semester>,
}

impl NewUserRecord {
    /// The wire shape the record is stored under
    pub fn into_record(self) -> UserRecord {
        UserRecord {
            name: self.name,
            email: self.email,
            role: Some(self.role.wire_name().to_string()),
            semester: self.semester.map(|s| s.to_string()),
            bio: None,
            phone: None,
            profile_picture: None,
            created_at: None,
        }
    }
}

/// A partial update to a users record, absent fields stay untouched
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semester: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

/// An untyped collection record as the backend returns it
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub id: RecordId,
    pub created_at: DateTime<Utc>,
    pub body: Value,
}

impl RawRecord {
    /// Decodes the body into a typed wire shape
    pub fn decode<T>(&self) -> Result<T>
    where
        T: DeserializeOwned,
    {
        serde_json::from_value(self.body.clone()).map_err(|e| GatewayError::Backend(e.to_string()))
    }
}

/// A record about to be added to a collection
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub body: Value,
}

impl NewRecord {
    pub fn encode<T>(value: &T) -> Result<Self>
    where
        T: Serialize,
    {
        let body =
            serde_json::to_value(value).map_err(|e| GatewayError::Backend(e.to_string()))?;

        Ok(Self { body })
    }
}

/// A news post in its wire shape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsRecord {
    pub title: String,
    /// Human-readable display date, e.g. "Jun 03, 2025"
    pub date: String,
    pub content: String,
}

/// An event in its wire shape.
///
/// The `date` field is "<start>" or "<start> to <end>", kept for existing
/// readers. New writes also carry the structured start/end fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub title: String,
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
}

/// A feed entry in its wire shape
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedRecord {
    pub title: String,
    pub image_url: String,
}

/// A filed document in its wire shape
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    /// The original filename
    pub title: String,
    pub file_url: String,
    pub semester: Semester,
}
