//! Two-stage review of pending submissions.
//!
//! [`ApprovalWorkflow`] moves a submission from pending to approved or
//! declined. What "approved" means is supplied by an [`ApprovalTarget`]:
//! KYC copies identity fields onto the account, a release enqueues a mint
//! job.
//!
//! Approval applies the side effect first and only then removes the pending
//! row. If the side effect fails the row is left alone so a reviewer can try
//! again. If removal fails, only removal is retried. Decline notifies the
//! submitter first and removes the row only once the notice went out.

mod error;
pub mod kyc;
pub mod release;

pub use error::WorkflowError;
pub use kyc::{KycTarget, KycWorkflow};
pub use release::{ReleaseTarget, ReleaseWorkflow};

use std::fmt::{Debug, Display};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info, instrument, warn};

use mintgate_core::{Email, Username};

use crate::services::email::{Notification, Notifier};
use crate::store::StoreError;

/// Attempts made to remove an approved row before giving up.
const DELETE_ATTEMPTS: u32 = 3;

/// Base delay between removal attempts; grows linearly per attempt.
const DELETE_BACKOFF: Duration = Duration::from_millis(100);

/// A kind of submission that can be reviewed.
#[async_trait]
pub trait ApprovalTarget: Send + Sync {
    type Id: Copy + Debug + Display + Send + Sync + 'static;
    type Submission: Send + Sync + 'static;
    type Draft: Send + 'static;

    /// Name used in logs and decline notices.
    const LABEL: &'static str;

    fn validate(draft: &Self::Draft) -> Result<(), WorkflowError>;

    fn id_of(submission: &Self::Submission) -> Self::Id;

    fn submitter(submission: &Self::Submission) -> &Username;

    async fn insert(&self, draft: Self::Draft) -> Result<Self::Submission, StoreError>;

    async fn list(&self) -> Result<Vec<Self::Submission>, StoreError>;

    async fn get(&self, id: Self::Id) -> Result<Option<Self::Submission>, StoreError>;

    /// Conditional delete; `false` means the row was already gone.
    async fn delete(&self, id: Self::Id) -> Result<bool, StoreError>;

    /// The approval side effect.
    async fn apply(&self, submission: &Self::Submission) -> Result<(), WorkflowError>;

    /// Where a decline notice goes when the reviewer names no contact.
    async fn default_contact(
        &self,
        submission: &Self::Submission,
    ) -> Result<Option<Email>, StoreError>;
}

/// Pending to approved/declined engine over one [`ApprovalTarget`].
#[derive(Clone)]
pub struct ApprovalWorkflow<T> {
    target: T,
    notifier: Arc<dyn Notifier>,
    delete_attempts: u32,
    delete_backoff: Duration,
}

impl<T: ApprovalTarget> ApprovalWorkflow<T> {
    #[must_use]
    pub fn new(target: T, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            target,
            notifier,
            delete_attempts: DELETE_ATTEMPTS,
            delete_backoff: DELETE_BACKOFF,
        }
    }

    /// Override how removal of an approved row is retried.
    #[must_use]
    pub fn with_delete_retries(mut self, attempts: u32, backoff: Duration) -> Self {
        self.delete_attempts = attempts.max(1);
        self.delete_backoff = backoff;
        self
    }

    /// Record a new pending submission. Several may be pending per account.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::InvalidInput` if validation fails and
    /// `WorkflowError::Store` if the insert fails.
    #[instrument(skip(self, draft), fields(kind = T::LABEL))]
    pub async fn submit(&self, draft: T::Draft) -> Result<T::Id, WorkflowError> {
        T::validate(&draft)?;
        let submission = self.target.insert(draft).await?;
        let id = T::id_of(&submission);
        let submitter = T::submitter(&submission);
        info!(
            id = %id,
            username = %submitter,
            "{} received",
            T::LABEL
        );
        Ok(id)
    }

    /// Pending submissions in the store's order.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::Store` if the read fails.
    pub async fn list(&self) -> Result<Vec<T::Submission>, WorkflowError> {
        Ok(self.target.list().await?)
    }

    /// Approve a pending submission.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::NotFound` if no such row is pending, including
    /// when a concurrent approval removed it first. A failed side effect is
    /// returned as-is with the row untouched. If the side effect landed but
    /// the row could not be removed after retrying, returns
    /// `WorkflowError::CleanupFailed`.
    #[instrument(skip(self), fields(kind = T::LABEL))]
    pub async fn approve(&self, id: T::Id) -> Result<(), WorkflowError> {
        let submission = self.target.get(id).await?.ok_or(WorkflowError::NotFound)?;

        if let Err(e) = self.target.apply(&submission).await {
            warn!(id = %id, error = %e, "Approval side effect failed, submission left pending");
            return Err(e);
        }
        let submitter = T::submitter(&submission);
        info!(
            target: "audit",
            id = %id,
            username = %submitter,
            "{} approved",
            T::LABEL
        );

        self.remove_approved(id).await
    }

    /// Remove the approved row. A row that is already gone on the first
    /// attempt was taken by another approval; on a later attempt an earlier
    /// failed-looking delete may have landed.
    async fn remove_approved(&self, id: T::Id) -> Result<(), WorkflowError> {
        let mut attempt = 1;
        loop {
            match self.target.delete(id).await {
                Ok(true) => return Ok(()),
                Ok(false) if attempt == 1 => {
                    warn!(id = %id, "Submission was approved concurrently");
                    return Err(WorkflowError::NotFound);
                }
                Ok(false) => {
                    warn!(id = %id, attempt, "Approved submission was already removed");
                    return Ok(());
                }
                Err(e) if attempt < self.delete_attempts && e.is_retryable() => {
                    warn!(id = %id, attempt, error = %e, "Removing approved submission failed, retrying");
                    tokio::time::sleep(self.delete_backoff * attempt).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(id = %id, attempt, error = %e, "Could not remove approved submission");
                    return Err(WorkflowError::CleanupFailed(e));
                }
            }
        }
    }

    /// Decline a pending submission and tell the submitter.
    ///
    /// `contact` overrides the target's default contact. The row is removed
    /// only after the notice was delivered.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::NotFound` if no such row is pending and
    /// `WorkflowError::Notify` if the notice could not be sent, in which case
    /// the submission stays pending.
    #[instrument(skip(self, contact), fields(kind = T::LABEL))]
    pub async fn decline(&self, id: T::Id, contact: Option<Email>) -> Result<(), WorkflowError> {
        let submission = self.target.get(id).await?.ok_or(WorkflowError::NotFound)?;

        let contact = match contact {
            Some(contact) => Some(contact),
            None => self.target.default_contact(&submission).await?,
        };
        match contact {
            Some(to) => {
                let message = Notification::submission_declined(T::LABEL)?;
                if let Err(e) = self.notifier.send(&to, &message).await {
                    warn!(id = %id, error = %e, "Decline notice failed, submission left pending");
                    return Err(e.into());
                }
            }
            None => warn!(id = %id, "No contact for submitter, declining without notice"),
        }

        if !self.target.delete(id).await? {
            return Err(WorkflowError::NotFound);
        }
        let submitter = T::submitter(&submission);
        info!(
            target: "audit",
            id = %id,
            username = %submitter,
            "{} declined",
            T::LABEL
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::{KycDetails, NewAccount, NewKycSubmission, NewReleaseSubmission};
    use crate::services::email::MemoryNotifier;
    use crate::store::{AccountStore, MemoryStore};
    use mintgate_core::AccountType;

    struct Harness {
        store: Arc<MemoryStore>,
        notifier: Arc<MemoryNotifier>,
        kyc: KycWorkflow,
        releases: ReleaseWorkflow,
    }

    async fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(MemoryNotifier::new());
        for name in ["alice", "bob"] {
            store
                .insert_account(NewAccount {
                    username: Username::parse(name).unwrap(),
                    email: Email::parse(&format!("{name}@mintgate.test")).unwrap(),
                    password_hash: "$argon2id$stub".to_owned(),
                    account_type: AccountType::Creator,
                })
                .await
                .unwrap();
        }
        let kyc = KycWorkflow::new(KycTarget::new(store.clone()), notifier.clone())
            .with_delete_retries(3, Duration::from_millis(1));
        let releases = ReleaseWorkflow::new(
            ReleaseTarget::new(store.clone(), store.clone()),
            notifier.clone(),
        )
        .with_delete_retries(3, Duration::from_millis(1));
        Harness {
            store,
            notifier,
            kyc,
            releases,
        }
    }

    fn kyc_draft(username: &str) -> NewKycSubmission {
        NewKycSubmission {
            username: Username::parse(username).unwrap(),
            details: KycDetails {
                legal_name: "Alice Liddell".to_owned(),
                address: "1 Rabbit Hole".to_owned(),
                country: "GB".to_owned(),
                email: Email::parse("kyc-contact@mintgate.test").unwrap(),
                phone: "+44 20 7946 0000".to_owned(),
                date_of_birth: NaiveDate::from_ymd_opt(1990, 5, 4).unwrap(),
                document_ref: "https://blobs.test/doc.png".to_owned(),
                face_image_ref: "https://blobs.test/face.png".to_owned(),
            },
        }
    }

    fn release_draft(username: &str, title: &str) -> NewReleaseSubmission {
        NewReleaseSubmission {
            username: Username::parse(username).unwrap(),
            title: title.to_owned(),
            release_date: NaiveDate::from_ymd_opt(2026, 12, 1).unwrap(),
            estimated_count: 100,
            notes: String::new(),
            media_ref: "https://blobs.test/ep1.mp3".to_owned(),
        }
    }

    async fn account(store: &MemoryStore, name: &str) -> crate::models::Account {
        store
            .find_by_username(&Username::parse(name).unwrap())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_kyc_approve_copies_fields_and_removes_row() {
        let h = harness().await;
        let id = h.kyc.submit(kyc_draft("alice")).await.unwrap();
        assert_eq!(h.kyc.list().await.unwrap().len(), 1);

        h.kyc.approve(id).await.unwrap();

        let alice = account(&h.store, "alice").await;
        assert!(alice.kyc_verified);
        assert_eq!(alice.kyc.legal_name.as_deref(), Some("Alice Liddell"));
        assert_eq!(alice.kyc.country.as_deref(), Some("GB"));
        assert!(h.kyc.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_approve_is_not_found() {
        let h = harness().await;
        let id = h.releases.submit(release_draft("bob", "EP1")).await.unwrap();
        h.releases.approve(id).await.unwrap();

        assert!(matches!(
            h.releases.approve(id).await,
            Err(WorkflowError::NotFound)
        ));
        assert_eq!(h.store.mint_jobs().len(), 1);
    }

    /// Serves reads from a snapshot taken before the row was removed, which
    /// is what an approval racing another one sees.
    struct SnapshotReads {
        inner: ReleaseTarget,
        snapshot: crate::models::ReleaseSubmission,
    }

    #[async_trait]
    impl ApprovalTarget for SnapshotReads {
        type Id = <ReleaseTarget as ApprovalTarget>::Id;
        type Submission = <ReleaseTarget as ApprovalTarget>::Submission;
        type Draft = <ReleaseTarget as ApprovalTarget>::Draft;

        const LABEL: &'static str = ReleaseTarget::LABEL;

        fn validate(draft: &Self::Draft) -> Result<(), WorkflowError> {
            ReleaseTarget::validate(draft)
        }

        fn id_of(submission: &Self::Submission) -> Self::Id {
            ReleaseTarget::id_of(submission)
        }

        fn submitter(submission: &Self::Submission) -> &Username {
            ReleaseTarget::submitter(submission)
        }

        async fn insert(&self, draft: Self::Draft) -> Result<Self::Submission, StoreError> {
            self.inner.insert(draft).await
        }

        async fn list(&self) -> Result<Vec<Self::Submission>, StoreError> {
            self.inner.list().await
        }

        async fn get(&self, _id: Self::Id) -> Result<Option<Self::Submission>, StoreError> {
            Ok(Some(self.snapshot.clone()))
        }

        async fn delete(&self, id: Self::Id) -> Result<bool, StoreError> {
            self.inner.delete(id).await
        }

        async fn apply(&self, submission: &Self::Submission) -> Result<(), WorkflowError> {
            self.inner.apply(submission).await
        }

        async fn default_contact(
            &self,
            submission: &Self::Submission,
        ) -> Result<Option<Email>, StoreError> {
            self.inner.default_contact(submission).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_approve_loser_is_not_found() {
        let h = harness().await;
        let id = h.releases.submit(release_draft("bob", "EP1")).await.unwrap();
        let snapshot = h.releases.list().await.unwrap().pop().unwrap();

        h.releases.approve(id).await.unwrap();

        let racing = ApprovalWorkflow::new(
            SnapshotReads {
                inner: ReleaseTarget::new(h.store.clone(), h.store.clone()),
                snapshot,
            },
            h.notifier.clone(),
        )
        .with_delete_retries(3, Duration::from_millis(1));
        assert!(matches!(
            racing.approve(id).await,
            Err(WorkflowError::NotFound)
        ));
        assert_eq!(h.store.mint_jobs().len(), 1);
    }

    #[tokio::test]
    async fn test_release_approve_enqueues_one_job() {
        let h = harness().await;
        let id = h.releases.submit(release_draft("bob", "EP1")).await.unwrap();
        h.releases.approve(id).await.unwrap();

        let jobs = h.store.mint_jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].release_name, "EP1");
        assert_eq!(jobs[0].owner_address, "bob");
        assert_eq!(jobs[0].source_release, id);
        assert!(h.releases.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_side_effect_leaves_row_pending() {
        let h = harness().await;
        let id = h.releases.submit(release_draft("bob", "EP1")).await.unwrap();

        h.store.set_mint_queue_down(true);
        assert!(matches!(
            h.releases.approve(id).await,
            Err(WorkflowError::Store(_))
        ));
        assert_eq!(h.releases.list().await.unwrap().len(), 1);
        assert!(h.store.mint_jobs().is_empty());

        h.store.set_mint_queue_down(false);
        h.releases.approve(id).await.unwrap();
        assert_eq!(h.store.mint_jobs().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_failure_retries_removal_only() {
        let h = harness().await;
        let id = h.releases.submit(release_draft("bob", "EP1")).await.unwrap();

        h.store.fail_next_deletes(2);
        h.releases.approve(id).await.unwrap();

        assert_eq!(h.store.mint_jobs().len(), 1);
        assert!(h.releases.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_exhausted_removal_does_not_double_mint() {
        let h = harness().await;
        let id = h.releases.submit(release_draft("bob", "EP1")).await.unwrap();

        h.store.fail_next_deletes(3);
        assert!(matches!(
            h.releases.approve(id).await,
            Err(WorkflowError::CleanupFailed(_))
        ));
        assert_eq!(h.releases.list().await.unwrap().len(), 1);

        // A reviewer retrying the approval does not queue a second job.
        h.releases.approve(id).await.unwrap();
        assert_eq!(h.store.mint_jobs().len(), 1);
        assert!(h.releases.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_kyc_approve_for_missing_account() {
        let h = harness().await;
        let id = h.kyc.submit(kyc_draft("ghost")).await.unwrap();
        assert!(matches!(
            h.kyc.approve(id).await,
            Err(WorkflowError::SubmitterMissing)
        ));
        assert_eq!(h.kyc.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_decline_notifies_kyc_contact_and_never_verifies() {
        let h = harness().await;
        let id = h.kyc.submit(kyc_draft("alice")).await.unwrap();

        h.kyc.decline(id, None).await.unwrap();

        assert!(h.kyc.list().await.unwrap().is_empty());
        assert!(!account(&h.store, "alice").await.kyc_verified);
        let contact = Email::parse("kyc-contact@mintgate.test").unwrap();
        assert_eq!(h.notifier.sent_to(&contact).len(), 1);
    }

    #[tokio::test]
    async fn test_decline_uses_explicit_contact() {
        let h = harness().await;
        let id = h.releases.submit(release_draft("bob", "EP1")).await.unwrap();
        let reviewer_pick = Email::parse("label@mintgate.test").unwrap();

        h.releases
            .decline(id, Some(reviewer_pick.clone()))
            .await
            .unwrap();

        assert_eq!(h.notifier.sent_to(&reviewer_pick).len(), 1);
        assert!(h.store.mint_jobs().is_empty());
    }

    #[tokio::test]
    async fn test_release_decline_defaults_to_account_email() {
        let h = harness().await;
        let id = h.releases.submit(release_draft("bob", "EP1")).await.unwrap();
        h.releases.decline(id, None).await.unwrap();

        let bob = Email::parse("bob@mintgate.test").unwrap();
        let sent = h.notifier.sent_to(&bob);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Your release submission was declined");
    }

    #[tokio::test]
    async fn test_decline_notify_failure_keeps_submission() {
        let h = harness().await;
        let id = h.kyc.submit(kyc_draft("alice")).await.unwrap();

        h.notifier.set_failing(true);
        let result = h.kyc.decline(id, None).await;
        assert!(matches!(result, Err(WorkflowError::Notify(_))));
        assert!(result.unwrap_err().is_retryable());
        assert_eq!(h.kyc.list().await.unwrap().len(), 1);

        h.notifier.set_failing(false);
        h.kyc.decline(id, None).await.unwrap();
        assert!(h.kyc.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_ids_are_not_found() {
        let h = harness().await;
        let missing = mintgate_core::KycSubmissionId::new(999);
        assert!(matches!(
            h.kyc.approve(missing).await,
            Err(WorkflowError::NotFound)
        ));
        assert!(matches!(
            h.kyc.decline(missing, None).await,
            Err(WorkflowError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_list_is_insertion_ordered_and_allows_duplicates() {
        let h = harness().await;
        let first = h.releases.submit(release_draft("bob", "EP1")).await.unwrap();
        let second = h.releases.submit(release_draft("bob", "EP2")).await.unwrap();
        let third = h.releases.submit(release_draft("alice", "EP1")).await.unwrap();

        let ids: Vec<_> = h
            .releases
            .list()
            .await
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![first, second, third]);
    }

    #[tokio::test]
    async fn test_store_outage_surfaces_as_retryable() {
        let h = harness().await;
        let id = h.kyc.submit(kyc_draft("alice")).await.unwrap();
        h.store.set_unavailable(true);
        let err = h.kyc.approve(id).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
