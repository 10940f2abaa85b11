use std::sync::Arc;

use tilawah_core::{
    create_authenticator, AccountStore, Aligner, Authenticator, Config, FsArtifactStore,
    LafzizeCoordinator, RecitationStore, SanitizedConfig, Transcoder, UploadService,
};

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    accounts: Arc<dyn AccountStore>,
    recitations: Arc<dyn RecitationStore>,
    artifacts: Arc<FsArtifactStore>,
    uploads: UploadService,
    lafzize: LafzizeCoordinator,
}

impl AppState {
    /// Wire the services together. The transcoder and aligner are passed in
    /// so tests can swap in mocks.
    pub fn new(
        config: Config,
        accounts: Arc<dyn AccountStore>,
        recitations: Arc<dyn RecitationStore>,
        transcoder: Arc<dyn Transcoder>,
        aligner: Arc<dyn Aligner>,
    ) -> Self {
        let authenticator: Arc<dyn Authenticator> =
            Arc::from(create_authenticator(&config.auth, Arc::clone(&accounts)));
        let artifacts = Arc::new(FsArtifactStore::new(config.storage.uploads_dir()));
        let uploads = UploadService::new(
            Arc::clone(&recitations),
            Arc::clone(&artifacts),
            transcoder,
        );
        let lafzize = LafzizeCoordinator::new(
            Arc::clone(&recitations),
            Arc::clone(&artifacts),
            aligner,
            config.lafzize.on_failure,
        );

        Self {
            config,
            authenticator,
            accounts,
            recitations,
            artifacts,
            uploads,
            lafzize,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn accounts(&self) -> &dyn AccountStore {
        self.accounts.as_ref()
    }

    pub fn recitations(&self) -> &dyn RecitationStore {
        self.recitations.as_ref()
    }

    pub fn artifacts(&self) -> &FsArtifactStore {
        &self.artifacts
    }

    pub fn uploads(&self) -> &UploadService {
        &self.uploads
    }

    pub fn lafzize(&self) -> &LafzizeCoordinator {
        &self.lafzize
    }
}
