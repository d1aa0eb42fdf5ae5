//! Domain models.
//!
//! These types represent validated domain objects separate from database row
//! types. Row types live next to the queries in [`crate::db`].

pub mod account;
pub mod marketplace;
pub mod submission;

pub use account::{
    Account, AccountUpdate, CreatorApplication, KycProfile, NewAccount, NewCreatorApplication,
    NewResetToken, Profile, ResetToken,
};
pub use marketplace::{Listing, MintJob, NewListing, NewTransaction, Transaction};
pub use submission::{
    KycDetails, KycSubmission, NewKycSubmission, NewReleaseSubmission, ReleaseSubmission,
};
