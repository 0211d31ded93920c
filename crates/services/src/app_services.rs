use std::sync::Arc;

use quiz_core::model::EngineSettings;
use storage::repository::Storage;

use crate::Clock;
use crate::catalog_service::CatalogService;
use crate::completion_service::CompletionService;
use crate::dashboard::DashboardService;
use crate::error::AppServicesError;
use crate::events::EventBus;
use crate::ledger::ProgressionLedger;
use crate::sessions::SessionDriver;
use crate::submission_service::SubmissionService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    settings: EngineSettings,
    driver: SessionDriver,
    catalog: Arc<CatalogService>,
    completion: Arc<CompletionService>,
    dashboard: Arc<DashboardService>,
    submissions: Arc<SubmissionService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        settings: EngineSettings,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock, settings))
    }

    #[must_use]
    pub fn in_memory(clock: Clock, settings: EngineSettings) -> Self {
        Self::from_storage(&Storage::in_memory(), clock, settings)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock, settings: EngineSettings) -> Self {
        let ledger = Arc::new(ProgressionLedger::new(
            clock,
            Arc::clone(&storage.quizzes),
            Arc::clone(&storage.submissions),
            Arc::clone(&storage.profiles),
            Arc::clone(&storage.progression),
        ));
        let completion = Arc::new(CompletionService::new(
            ledger,
            Arc::clone(&storage.submissions),
            Arc::clone(&storage.badges),
            EventBus::default(),
        ));
        let dashboard = Arc::new(DashboardService::new(
            clock,
            Arc::clone(&storage.quizzes),
            Arc::clone(&storage.submissions),
            Arc::clone(&storage.profiles),
            Arc::clone(&storage.badges),
            Arc::clone(&storage.rosters),
        ));
        let catalog = Arc::new(CatalogService::new(
            Arc::clone(&storage.quizzes),
            Arc::clone(&storage.rosters),
        ));
        let submissions = Arc::new(SubmissionService::new(
            clock,
            Arc::clone(&storage.submissions),
        ));

        Self {
            settings,
            driver: SessionDriver::new(&settings),
            catalog,
            completion,
            dashboard,
            submissions,
        }
    }

    #[must_use]
    pub fn settings(&self) -> EngineSettings {
        self.settings
    }

    #[must_use]
    pub fn driver(&self) -> SessionDriver {
        self.driver
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn completion(&self) -> Arc<CompletionService> {
        Arc::clone(&self.completion)
    }

    #[must_use]
    pub fn dashboard(&self) -> Arc<DashboardService> {
        Arc::clone(&self.dashboard)
    }

    #[must_use]
    pub fn submissions(&self) -> Arc<SubmissionService> {
        Arc::clone(&self.submissions)
    }
}
