//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::services::accounts::AccountService;
use crate::services::approval::{KycTarget, KycWorkflow, ReleaseTarget, ReleaseWorkflow};
use crate::services::email::Notifier;
use crate::services::marketplace::MarketplaceService;
use crate::services::uploads::BlobUploader;
use crate::store::{CredentialStore, MarketplaceStore, MintQueue};
use crate::tokens::TokenService;

/// Boundary collaborators the services are built on.
#[derive(Clone)]
pub struct Backends {
    pub credentials: Arc<dyn CredentialStore>,
    pub marketplace: Arc<dyn MarketplaceStore>,
    pub mint_queue: Arc<dyn MintQueue>,
    pub notifier: Arc<dyn Notifier>,
    pub uploader: Arc<dyn BlobUploader>,
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. The signing secret and the
/// store handles are read-only after construction.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    tokens: TokenService,
    credentials: Arc<dyn CredentialStore>,
    uploader: Arc<dyn BlobUploader>,
    accounts: AccountService,
    kyc: KycWorkflow,
    releases: ReleaseWorkflow,
    marketplace: MarketplaceService,
}

impl AppState {
    /// Wire the services together.
    #[must_use]
    pub fn new(config: ServerConfig, backends: Backends) -> Self {
        let tokens = TokenService::new(&config.token_secret);
        let accounts = AccountService::new(
            backends.credentials.clone(),
            tokens.clone(),
            backends.notifier.clone(),
            &config.base_url,
            &config.app_url,
            config.signup_codes.clone(),
        );
        let kyc = KycWorkflow::new(
            KycTarget::new(backends.credentials.clone()),
            backends.notifier.clone(),
        );
        let releases = ReleaseWorkflow::new(
            ReleaseTarget::new(backends.credentials.clone(), backends.mint_queue),
            backends.notifier,
        );
        let marketplace = MarketplaceService::new(backends.marketplace);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                tokens,
                credentials: backends.credentials,
                uploader: backends.uploader,
                accounts,
                kyc,
                releases,
                marketplace,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    /// Credential store, used directly by extractors and readiness checks.
    #[must_use]
    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.inner.credentials
    }

    #[must_use]
    pub fn uploader(&self) -> &Arc<dyn BlobUploader> {
        &self.inner.uploader
    }

    #[must_use]
    pub fn accounts(&self) -> &AccountService {
        &self.inner.accounts
    }

    #[must_use]
    pub fn kyc(&self) -> &KycWorkflow {
        &self.inner.kyc
    }

    #[must_use]
    pub fn releases(&self) -> &ReleaseWorkflow {
        &self.inner.releases
    }

    #[must_use]
    pub fn marketplace(&self) -> &MarketplaceService {
        &self.inner.marketplace
    }
}
