//! KYC review: approval copies identity fields onto the account.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use mintgate_core::{Email, KycSubmissionId, Username};

use super::{ApprovalTarget, ApprovalWorkflow, WorkflowError};
use crate::models::{KycProfile, KycSubmission, NewKycSubmission};
use crate::store::{CredentialStore, StoreError};

/// KYC review workflow.
pub type KycWorkflow = ApprovalWorkflow<KycTarget>;

/// Pending KYC rows and the accounts they verify.
#[derive(Clone)]
pub struct KycTarget {
    store: Arc<dyn CredentialStore>,
}

impl KycTarget {
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ApprovalTarget for KycTarget {
    type Id = KycSubmissionId;
    type Submission = KycSubmission;
    type Draft = NewKycSubmission;

    const LABEL: &'static str = "KYC submission";

    fn validate(draft: &NewKycSubmission) -> Result<(), WorkflowError> {
        let details = &draft.details;
        let required = [
            ("legal name", &details.legal_name),
            ("address", &details.address),
            ("country", &details.country),
            ("phone", &details.phone),
            ("identity document", &details.document_ref),
            ("face image", &details.face_image_ref),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(WorkflowError::InvalidInput(format!("{field} is required")));
        }
        if details.date_of_birth >= Utc::now().date_naive() {
            return Err(WorkflowError::InvalidInput(
                "date of birth must be in the past".into(),
            ));
        }
        Ok(())
    }

    fn id_of(submission: &KycSubmission) -> KycSubmissionId {
        submission.id
    }

    fn submitter(submission: &KycSubmission) -> &Username {
        &submission.username
    }

    async fn insert(&self, draft: NewKycSubmission) -> Result<KycSubmission, StoreError> {
        self.store.insert_pending_kyc(draft).await
    }

    async fn list(&self) -> Result<Vec<KycSubmission>, StoreError> {
        self.store.list_pending_kyc().await
    }

    async fn get(&self, id: KycSubmissionId) -> Result<Option<KycSubmission>, StoreError> {
        self.store.get_pending_kyc(id).await
    }

    async fn delete(&self, id: KycSubmissionId) -> Result<bool, StoreError> {
        self.store.delete_pending_kyc(id).await
    }

    async fn apply(&self, submission: &KycSubmission) -> Result<(), WorkflowError> {
        let profile = KycProfile::from(&submission.details);
        if self.store.apply_kyc(&submission.username, &profile).await? {
            Ok(())
        } else {
            Err(WorkflowError::SubmitterMissing)
        }
    }

    async fn default_contact(&self, submission: &KycSubmission) -> Result<Option<Email>, StoreError> {
        Ok(Some(submission.details.email.clone()))
    }
}
