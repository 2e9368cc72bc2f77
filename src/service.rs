use std::sync::Arc;

use chrono::{Local, NaiveDate, Utc};
use serde::Serialize;
use tracing::info;

use crate::banner;
use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::error::{EngineError, Result};
use crate::loader::LoadSummary;
use crate::models::{Dataset, FilterParams, QaaOptions, RawTable, Report, ReportMode, SchemaKind};
use crate::report::{self, AlumniListPreview, Preview, WorkplacePreview};
use crate::store::{DatasetStore, MemoryStore, SessionId};

/// What the caller gets back from a successful upload.
#[derive(Debug, Clone, Serialize)]
pub struct Upload {
    pub session: SessionId,
    pub summary: LoadSummary,
    pub warnings: Vec<String>,
}

/// Session-keyed front door: uploads go into the store, reports read from it.
pub struct ReportService<S = MemoryStore> {
    engine: Engine,
    store: S,
}

impl ReportService<MemoryStore> {
    pub fn in_memory(config: EngineConfig) -> Result<Self> {
        let store = MemoryStore::new(config.retention());
        Ok(Self::new(Engine::new(config)?, store))
    }
}

impl<S: DatasetStore> ReportService<S> {
    pub fn new(engine: Engine, store: S) -> Self {
        Self { engine, store }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Validates and stores an upload under a fresh session id. Rejected
    /// uploads leave the store untouched.
    pub fn upload(
        &mut self,
        table: RawTable,
        hint: Option<SchemaKind>,
        source_name: &str,
    ) -> Result<Upload> {
        let now = Utc::now();
        self.store.evict(now);

        let loaded = self.engine.load(table, hint, source_name)?;
        let session = SessionId::new();
        self.store.put(session, Arc::new(loaded.dataset), now);
        info!(%session, source = source_name, "stored upload");

        Ok(Upload {
            session,
            summary: loaded.summary,
            warnings: loaded.warnings,
        })
    }

    /// Drops an upload before its retention window runs out.
    pub fn close_session(&mut self, session: &SessionId) -> Result<()> {
        match self.store.remove(session) {
            Some(_) => {
                info!(%session, "closed session");
                Ok(())
            }
            None => Err(EngineError::SessionNotFound(session.to_string())),
        }
    }

    pub fn dataset(&mut self, session: &SessionId) -> Result<Arc<Dataset>> {
        let now = Utc::now();
        self.store.evict(now);
        self.store
            .get(session, now)
            .ok_or_else(|| EngineError::SessionNotFound(session.to_string()))
    }

    pub fn generate_qaa_report(
        &mut self,
        session: &SessionId,
        params: &FilterParams,
        options: QaaOptions,
    ) -> Result<Report> {
        let dataset = self.dataset(session)?;
        report::qaa_report(&self.engine, &dataset, params, options)
    }

    pub fn generate_alumni_list(
        &mut self,
        session: &SessionId,
        params: &FilterParams,
        allowed_statuses: &[String],
    ) -> Result<Report> {
        let dataset = self.dataset(session)?;
        report::alumni_list(&self.engine, &dataset, params, allowed_statuses)
    }

    pub fn generate_workplace_report(
        &mut self,
        session: &SessionId,
        params: &FilterParams,
    ) -> Result<Report> {
        let dataset = self.dataset(session)?;
        report::workplace_report(&self.engine, &dataset, params)
    }

    pub fn generate_banner_diff(
        &mut self,
        banner: &SessionId,
        alumni: &SessionId,
    ) -> Result<Report> {
        self.generate_banner_diff_on(banner, alumni, Local::now().date_naive())
    }

    /// Banner diff with an explicit date for the "Added from Banner" comment.
    pub fn generate_banner_diff_on(
        &mut self,
        banner: &SessionId,
        alumni: &SessionId,
        today: NaiveDate,
    ) -> Result<Report> {
        let banner_roster = self.dataset(banner)?;
        let alumni_roster = self.dataset(alumni)?;
        let config = self.engine.config();
        let diff = banner::diff_rosters(
            &banner_roster,
            &alumni_roster,
            &config.banner_field_map,
            &config.statuses.new_graduate,
            today,
        )?;
        Ok(report::banner_report(&diff, &alumni_roster))
    }

    pub fn preview(
        &mut self,
        session: &SessionId,
        params: &FilterParams,
        mode: ReportMode,
    ) -> Result<Preview> {
        let dataset = self.dataset(session)?;
        Ok(report::preview(&self.engine, &dataset, params, mode))
    }

    pub fn preview_alumni_list(
        &mut self,
        session: &SessionId,
        params: &FilterParams,
        allowed_statuses: &[String],
    ) -> Result<AlumniListPreview> {
        let dataset = self.dataset(session)?;
        report::alumni_list_preview(&self.engine, &dataset, params, allowed_statuses)
    }

    pub fn preview_workplace(
        &mut self,
        session: &SessionId,
        params: &FilterParams,
    ) -> Result<WorkplacePreview> {
        let dataset = self.dataset(session)?;
        report::workplace_preview(&self.engine, &dataset, params)
    }
}
