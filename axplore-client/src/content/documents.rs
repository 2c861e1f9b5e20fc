use std::sync::Arc;

use axplore_core::{random_string, PreferenceBackend};
use chrono::{DateTime, Utc};
use log::info;
use parking_lot::Mutex;

use super::ContentError;
use crate::{
    intake::{document_path, is_supported_document, PickedDocument},
    Backend, ClientContext, ClientEvent, Collection, DocumentRecord, NewRecord, RecordFilter,
    RecordId, Semester, Session,
};

/// Length of the token that keeps upload paths unique
const PATH_TOKEN_LENGTH: usize = 8;

/// The two shelves filed documents live on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    StudyMaterials,
    QuestionPapers,
}

impl DocumentKind {
    pub fn collection(&self) -> Collection {
        match self {
            DocumentKind::StudyMaterials => Collection::StudyMaterials,
            DocumentKind::QuestionPapers => Collection::QuestionPapers,
        }
    }
}

/// A semester-scoped, teacher-uploaded file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiledDocument {
    pub id: RecordId,
    /// The original filename
    pub title: String,
    pub file_url: String,
    pub semester: Semester,
    pub created_at: DateTime<Utc>,
}

/// Reads and uploads filed documents, scoped to the picked semester
pub struct DocumentShelf<B, P> {
    context: ClientContext<B, P>,
    session: Arc<Session<B, P>>,
    semester: Mutex<Semester>,
}

impl<B, P> DocumentShelf<B, P>
where
    B: Backend,
    P: PreferenceBackend,
{
    pub fn new(context: &ClientContext<B, P>, session: &Arc<Session<B, P>>) -> Self {
        let semester =
            Semester::new(context.config.default_semester).unwrap_or(Semester::LAST);

        Self {
            context: context.clone(),
            session: session.clone(),
            semester: Mutex::new(semester),
        }
    }

    /// The semester the picker currently shows
    pub fn semester(&self) -> Semester {
        *self.semester.lock()
    }

    pub fn set_semester(&self, semester: Semester) {
        *self.semester.lock() = semester;
    }

    /// Documents of the picked semester, newest first
    pub async fn list(&self, kind: DocumentKind) -> Result<Vec<FiledDocument>, ContentError> {
        let filter = RecordFilter::SemesterEquals(self.semester());

        let records = self
            .context
            .backend
            .list(kind.collection(), Some(filter))
            .await?;

        let mut documents = Vec::with_capacity(records.len());

        for record in records {
            let wire: DocumentRecord = record.decode()?;

            documents.push(FiledDocument {
                id: record.id,
                title: wire.title,
                file_url: wire.file_url,
                semester: wire.semester,
                created_at: record.created_at,
            });
        }

        documents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(documents)
    }

    /// Uploads a picked document to the picked semester, teachers only.
    /// The blob path gets a unique token so equal filenames don't
    /// overwrite each other, the record title keeps the original name.
    pub async fn upload(
        &self,
        kind: DocumentKind,
        document: PickedDocument,
    ) -> Result<RecordId, ContentError> {
        if !self.session.can_upload_document() {
            return Err(ContentError::PermissionDenied);
        }

        if !is_supported_document(&document.mime) {
            return Err(ContentError::UnsupportedFile(document.mime));
        }

        let semester = self.semester();
        let path = document_path(
            kind.collection(),
            &document.name,
            &random_string(PATH_TOKEN_LENGTH),
        );

        let file_url = self
            .context
            .backend
            .upload_blob(&path, document.bytes, &document.mime)
            .await?;

        let record = NewRecord::encode(&DocumentRecord {
            title: document.name.clone(),
            file_url,
            semester,
        })?;

        let id = self.context.backend.add(kind.collection(), record).await?;

        info!(
            "Uploaded {} to {} for semester {}",
            document.name,
            kind.collection(),
            semester
        );

        self.context.emit(ClientEvent::ContentChanged {
            collection: kind.collection(),
        });

        Ok(id)
    }

    /// Deletes a document record, teachers only
    pub async fn remove(&self, kind: DocumentKind, id: &str) -> Result<(), ContentError> {
        if !self.session.can_delete_content() {
            return Err(ContentError::PermissionDenied);
        }

        self.context.backend.delete(kind.collection(), id).await?;

        self.context.emit(ClientEvent::ContentChanged {
            collection: kind.collection(),
        });

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_support::{sign_in_student, sign_in_teacher, test_client};

    fn pdf(name: &str) -> PickedDocument {
        PickedDocument {
            name: name.to_string(),
            bytes: b"%PDF-1.4".to_vec(),
            mime: "application/pdf".to_string(),
        }
    }

    #[tokio::test]
    async fn test_upload_scopes_to_current_semester() {
        let (client, _) = test_client();

        sign_in_teacher(&client).await;
        assert_eq!(client.documents.semester(), Semester::LAST);

        client
            .documents
            .upload(DocumentKind::StudyMaterials, pdf("DS.pdf"))
            .await
            .unwrap();

        let documents = client
            .documents
            .list(DocumentKind::StudyMaterials)
            .await
            .unwrap();

        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].title, "DS.pdf");
        assert_eq!(documents[0].semester, Semester::LAST);

        // Switching the picker hides it
        client.documents.set_semester(Semester::new(3).unwrap());
        assert!(client
            .documents
            .list(DocumentKind::StudyMaterials)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_semester_filter_is_exact() {
        let (client, _) = test_client();

        sign_in_teacher(&client).await;

        for semester in Semester::ALL {
            client.documents.set_semester(semester);
            client
                .documents
                .upload(
                    DocumentKind::QuestionPapers,
                    pdf(&format!("sem{}.pdf", semester)),
                )
                .await
                .unwrap();
        }

        for semester in Semester::ALL {
            client.documents.set_semester(semester);

            let documents = client
                .documents
                .list(DocumentKind::QuestionPapers)
                .await
                .unwrap();

            assert_eq!(documents.len(), 1);
            assert_eq!(documents[0].semester, semester);
        }
    }

    #[tokio::test]
    async fn test_equal_filenames_get_distinct_paths() {
        let (client, _) = test_client();

        sign_in_teacher(&client).await;
        client
            .documents
            .upload(DocumentKind::StudyMaterials, pdf("DS.pdf"))
            .await
            .unwrap();
        client
            .documents
            .upload(DocumentKind::StudyMaterials, pdf("DS.pdf"))
            .await
            .unwrap();

        let documents = client
            .documents
            .list(DocumentKind::StudyMaterials)
            .await
            .unwrap();

        assert_eq!(documents.len(), 2);
        assert_ne!(
            documents[0].file_url, documents[1].file_url,
            "uploads must never overwrite each other"
        );
    }

    #[tokio::test]
    async fn test_unsupported_types_are_rejected_before_upload() {
        let (client, backend) = test_client();

        sign_in_teacher(&client).await;
        let before = backend.operation_count();

        let result = client
            .documents
            .upload(
                DocumentKind::StudyMaterials,
                PickedDocument {
                    name: "photo.png".to_string(),
                    bytes: vec![1, 2, 3],
                    mime: "image/png".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(ContentError::UnsupportedFile(_))));
        assert_eq!(backend.operation_count(), before);
    }

    #[tokio::test]
    async fn test_students_cannot_upload_or_delete() {
        let (client, _) = test_client();

        sign_in_student(&client).await;

        assert!(matches!(
            client
                .documents
                .upload(DocumentKind::StudyMaterials, pdf("DS.pdf"))
                .await,
            Err(ContentError::PermissionDenied)
        ));
        assert!(matches!(
            client.documents.remove(DocumentKind::StudyMaterials, "rec-1").await,
            Err(ContentError::PermissionDenied)
        ));
    }
}
