//! Release review: approval hands the release to the minting queue.

use std::sync::Arc;

use async_trait::async_trait;

use mintgate_core::{Email, ReleaseSubmissionId, Username};

use super::{ApprovalTarget, ApprovalWorkflow, WorkflowError};
use crate::models::{MintJob, NewReleaseSubmission, ReleaseSubmission};
use crate::store::{CredentialStore, MintQueue, StoreError};

/// Release review workflow.
pub type ReleaseWorkflow = ApprovalWorkflow<ReleaseTarget>;

/// Pending release rows and the queue approved releases go to.
#[derive(Clone)]
pub struct ReleaseTarget {
    store: Arc<dyn CredentialStore>,
    mint_queue: Arc<dyn MintQueue>,
}

impl ReleaseTarget {
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>, mint_queue: Arc<dyn MintQueue>) -> Self {
        Self { store, mint_queue }
    }
}

#[async_trait]
impl ApprovalTarget for ReleaseTarget {
    type Id = ReleaseSubmissionId;
    type Submission = ReleaseSubmission;
    type Draft = NewReleaseSubmission;

    const LABEL: &'static str = "release submission";

    fn validate(draft: &NewReleaseSubmission) -> Result<(), WorkflowError> {
        if draft.title.trim().is_empty() {
            return Err(WorkflowError::InvalidInput("title is required".into()));
        }
        if draft.estimated_count <= 0 {
            return Err(WorkflowError::InvalidInput(
                "estimated count must be positive".into(),
            ));
        }
        if draft.media_ref.trim().is_empty() {
            return Err(WorkflowError::InvalidInput("media is required".into()));
        }
        Ok(())
    }

    fn id_of(submission: &ReleaseSubmission) -> ReleaseSubmissionId {
        submission.id
    }

    fn submitter(submission: &ReleaseSubmission) -> &Username {
        &submission.username
    }

    async fn insert(&self, draft: NewReleaseSubmission) -> Result<ReleaseSubmission, StoreError> {
        self.store.insert_pending_release(draft).await
    }

    async fn list(&self) -> Result<Vec<ReleaseSubmission>, StoreError> {
        self.store.list_pending_release().await
    }

    async fn get(&self, id: ReleaseSubmissionId) -> Result<Option<ReleaseSubmission>, StoreError> {
        self.store.get_pending_release(id).await
    }

    async fn delete(&self, id: ReleaseSubmissionId) -> Result<bool, StoreError> {
        self.store.delete_pending_release(id).await
    }

    async fn apply(&self, submission: &ReleaseSubmission) -> Result<(), WorkflowError> {
        let job = MintJob {
            source_release: submission.id,
            release_name: submission.title.clone(),
            owner_address: submission.username.to_string(),
        };
        if !self.mint_queue.enqueue(job).await? {
            tracing::info!(id = %submission.id, "Mint job already queued for this release");
        }
        Ok(())
    }

    async fn default_contact(
        &self,
        submission: &ReleaseSubmission,
    ) -> Result<Option<Email>, StoreError> {
        Ok(self
            .store
            .find_by_username(&submission.username)
            .await?
            .map(|account| account.email))
    }
}
