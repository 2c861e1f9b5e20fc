use std::sync::atomic::{AtomicUsize, Ordering};

use axplore_core::PreferenceBackend;
use lazy_static::lazy_static;
use log::{info, warn};
use parking_lot::Mutex;
use regex::Regex;
use thiserror::Error;

use crate::{
    intake::{profile_picture_path, PickedImage},
    Backend, ClientContext, ClientEvent, GatewayError, NewUserRecord, Principal, Role, Semester,
    UserPatch,
};

lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(r"\S+@\S+\.\S+").unwrap();
}

/// Tracks the authenticated principal and resolves its role.
///
/// Holds at most one principal. Role is server-side truth, a missing or
/// unknown users record resolves to student.
pub struct Session<B, P> {
    context: ClientContext<B, P>,
    state: Mutex<SessionState>,
    busy: AtomicUsize,
}

#[derive(Debug, Default)]
enum SessionState {
    #[default]
    Anonymous,
    /// Signed up, terms not yet accepted
    PendingTerms { principal: Principal },
    Authenticated { principal: Principal },
}

/// The externally visible phase of the session state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Anonymous,
    PendingTerms,
    Authenticated,
}

#[derive(Debug, Error)]
pub enum SessionError {
    /// A local form check failed, no backend call was made
    #[error("{0}")]
    InvalidInput(&'static str),
    #[error("Not signed in")]
    NotSignedIn,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

#[derive(Debug, Clone)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
    pub remember_me: bool,
}

#[derive(Debug, Clone)]
pub struct SignUpRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub role: Role,
    /// What the semester picker shows, attached for students only
    pub semester: Semester,
    pub teacher_code: String,
}

impl<B, P> Session<B, P>
where
    B: Backend,
    P: PreferenceBackend,
{
    pub fn new(context: &ClientContext<B, P>) -> Self {
        Self {
            context: context.clone(),
            state: Default::default(),
            busy: AtomicUsize::new(0),
        }
    }

    /// Signs in an existing account and resolves its role
    pub async fn sign_in(&self, request: SignInRequest) -> Result<Principal, SessionError> {
        if !EMAIL_REGEX.is_match(&request.email) {
            return Err(SessionError::InvalidInput("Invalid email format."));
        }
        if request.password.is_empty() {
            return Err(SessionError::InvalidInput("Password is required."));
        }

        let _busy = self.begin_busy();

        let auth = self
            .context
            .backend
            .sign_in(&request.email, &request.password)
            .await?;

        let principal = self.resolve_principal(auth).await?;

        // Only the email is ever persisted for pre-fill, never the password
        let remembered = if request.remember_me {
            self.context.preferences.remember_email(&request.email).await
        } else {
            self.context.preferences.forget_email().await
        };

        if let Err(e) = remembered {
            warn!("Failed to update remembered credentials: {}", e);
        }

        info!("{} signed in as {:?}", principal.email, principal.role);

        self.transition(SessionState::Authenticated {
            principal: principal.clone(),
        });

        Ok(principal)
    }

    /// Creates an account and its users record, ending up at the terms
    /// screen. Teacher enrollment is gated by the shared code, which is
    /// advisory only, the backend re-validates role assignment.
    pub async fn sign_up(&self, request: SignUpRequest) -> Result<Principal, SessionError> {
        if request.name.trim().is_empty() {
            return Err(SessionError::InvalidInput("Name is required."));
        }
        if !EMAIL_REGEX.is_match(&request.email) {
            return Err(SessionError::InvalidInput("Invalid email format."));
        }
        if request.password.len() < self.context.config.min_password_length {
            return Err(SessionError::InvalidInput(
                "Password should be at least 6 characters.",
            ));
        }
        if request.password != request.confirm_password {
            return Err(SessionError::InvalidInput("Passwords do not match."));
        }
        if request.role.is_teacher()
            && request.teacher_code != self.context.config.teacher_enrollment_code
        {
            return Err(SessionError::InvalidInput("Invalid teacher code."));
        }

        let _busy = self.begin_busy();

        let auth = self
            .context
            .backend
            .sign_up(&request.email, &request.password)
            .await?;

        let semester = match request.role {
            Role::Student => Some(request.semester),
            Role::Teacher => None,
        };

        self.context
            .backend
            .create_user_record(
                &auth.uid,
                NewUserRecord {
                    name: request.name.trim().to_string(),
                    email: request.email.clone(),
                    role: request.role,
                    semester,
                },
            )
            .await?;

        let principal = Principal {
            uid: auth.uid,
            email: auth.email,
            name: request.name.trim().to_string(),
            role: request.role,
            semester,
            bio: None,
            phone: None,
            profile_picture: None,
        };

        info!(
            "Account created for {} as {:?}",
            principal.email, principal.role
        );

        self.transition(SessionState::PendingTerms {
            principal: principal.clone(),
        });

        Ok(principal)
    }

    /// Sends the reset email for an existing account
    pub async fn send_password_reset(&self, email: &str) -> Result<(), SessionError> {
        if email.is_empty() {
            return Err(SessionError::InvalidInput(
                "Please enter your email address to reset your password.",
            ));
        }

        let _busy = self.begin_busy();

        self.context.backend.send_password_reset(email).await?;
        Ok(())
    }

    /// Advances past the terms screen, permanent for this session
    pub fn accept_terms(&self) -> Result<(), SessionError> {
        let mut state = self.state.lock();

        match std::mem::take(&mut *state) {
            SessionState::PendingTerms { principal } => {
                *state = SessionState::Authenticated { principal };
                drop(state);

                self.context.emit(ClientEvent::SessionChanged {
                    phase: SessionPhase::Authenticated,
                });

                Ok(())
            }
            // Accepting twice stays accepted
            authenticated @ SessionState::Authenticated { .. } => {
                *state = authenticated;
                Ok(())
            }
            SessionState::Anonymous => Err(SessionError::NotSignedIn),
        }
    }

    /// Ends the provider session and drops the cached principal
    pub async fn sign_out(&self) -> Result<(), SessionError> {
        let _busy = self.begin_busy();

        self.context.backend.sign_out().await?;

        info!("Signed out");
        self.transition(SessionState::Anonymous);

        Ok(())
    }

    /// Called when the backend revokes authentication out of band
    pub fn revoke(&self) {
        warn!("Authentication revoked, dropping session");
        self.transition(SessionState::Anonymous);
    }

    /// A snapshot of the signed-in principal
    pub fn principal(&self) -> Option<Principal> {
        match &*self.state.lock() {
            SessionState::Anonymous => None,
            SessionState::PendingTerms { principal } => Some(principal.clone()),
            SessionState::Authenticated { principal } => Some(principal.clone()),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        match &*self.state.lock() {
            SessionState::Anonymous => SessionPhase::Anonymous,
            SessionState::PendingTerms { .. } => SessionPhase::PendingTerms,
            SessionState::Authenticated { .. } => SessionPhase::Authenticated,
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.principal().map(|p| p.role)
    }

    /// True while a backend call of this controller is in flight
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst) > 0
    }

    pub fn can_upload_news(&self) -> bool {
        self.is_teacher()
    }

    pub fn can_upload_event(&self) -> bool {
        self.is_teacher()
    }

    pub fn can_upload_feed(&self) -> bool {
        self.is_teacher()
    }

    pub fn can_upload_document(&self) -> bool {
        self.is_teacher()
    }

    pub fn can_delete_content(&self) -> bool {
        self.is_teacher()
    }

    pub fn can_edit_own_profile(&self) -> bool {
        self.principal().is_some()
    }

    /// Content is visible once signed in with the terms accepted
    pub fn can_view_content(&self) -> bool {
        self.phase() == SessionPhase::Authenticated
    }

    /// Updates the display name, and for students the semester
    pub async fn update_profile(
        &self,
        name: &str,
        semester: Option<Semester>,
    ) -> Result<(), SessionError> {
        let principal = self.principal().ok_or(SessionError::NotSignedIn)?;

        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::InvalidInput("Name cannot be empty"));
        }

        let semester = match principal.role {
            Role::Student => semester,
            Role::Teacher => None,
        };

        let _busy = self.begin_busy();

        self.context
            .backend
            .update_user_record(
                &principal.uid,
                UserPatch {
                    name: Some(name.to_string()),
                    semester: semester.map(|s| s.to_string()),
                    ..Default::default()
                },
            )
            .await?;

        self.with_principal(|p| {
            p.name = name.to_string();
            if semester.is_some() {
                p.semester = semester;
            }
        });

        Ok(())
    }

    pub async fn update_bio(&self, bio: &str) -> Result<(), SessionError> {
        self.patch_field(UserPatch {
            bio: Some(bio.trim().to_string()),
            ..Default::default()
        })
        .await
    }

    pub async fn update_phone(&self, phone: &str) -> Result<(), SessionError> {
        self.patch_field(UserPatch {
            phone: Some(phone.trim().to_string()),
            ..Default::default()
        })
        .await
    }

    /// Uploads a new avatar and records its URL, returning it
    pub async fn update_profile_picture(
        &self,
        image: PickedImage,
    ) -> Result<String, SessionError> {
        let principal = self.principal().ok_or(SessionError::NotSignedIn)?;

        let _busy = self.begin_busy();

        let url = self
            .context
            .backend
            .upload_blob(
                &profile_picture_path(&principal.uid),
                image.bytes,
                &image.mime,
            )
            .await?;

        self.context
            .backend
            .update_user_record(
                &principal.uid,
                UserPatch {
                    profile_picture: Some(url.clone()),
                    ..Default::default()
                },
            )
            .await?;

        self.with_principal(|p| p.profile_picture = Some(url.clone()));

        Ok(url)
    }

    async fn patch_field(&self, patch: UserPatch) -> Result<(), SessionError> {
        let principal = self.principal().ok_or(SessionError::NotSignedIn)?;

        let _busy = self.begin_busy();

        self.context
            .backend
            .update_user_record(&principal.uid, patch.clone())
            .await?;

        self.with_principal(|p| {
            if let Some(bio) = patch.bio {
                p.bio = Some(bio);
            }
            if let Some(phone) = patch.phone {
                p.phone = Some(phone);
            }
        });

        Ok(())
    }

    fn is_teacher(&self) -> bool {
        matches!(self.role(), Some(Role::Teacher))
    }

    /// Resolves the users record into a principal, falling back to the
    /// least privilege when the record is absent
    async fn resolve_principal(
        &self,
        auth: crate::AuthUser,
    ) -> Result<Principal, SessionError> {
        let record = self.context.backend.user_record(&auth.uid).await?;

        let principal = match record {
            Some(record) => record.into_principal(&auth),
            None => {
                warn!("No users record for {}, treating as student", auth.uid);

                Principal {
                    uid: auth.uid.clone(),
                    email: auth.email.clone(),
                    name: String::new(),
                    role: Role::Student,
                    semester: None,
                    bio: None,
                    phone: None,
                    profile_picture: None,
                }
            }
        };

        Ok(principal)
    }

    fn transition(&self, new_state: SessionState) {
        let phase = match &new_state {
            SessionState::Anonymous => SessionPhase::Anonymous,
            SessionState::PendingTerms { .. } => SessionPhase::PendingTerms,
            SessionState::Authenticated { .. } => SessionPhase::Authenticated,
        };

        *self.state.lock() = new_state;
        self.context.emit(ClientEvent::SessionChanged { phase });
    }

    fn with_principal(&self, mutate: impl FnOnce(&mut Principal)) {
        let mut state = self.state.lock();

        match &mut *state {
            SessionState::PendingTerms { principal } => mutate(principal),
            SessionState::Authenticated { principal } => mutate(principal),
            SessionState::Anonymous => {}
        }
    }

    fn begin_busy(&self) -> BusyGuard<'_> {
        self.busy.fetch_add(1, Ordering::SeqCst);
        BusyGuard(&self.busy)
    }
}

struct BusyGuard<'a>(&'a AtomicUsize);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
