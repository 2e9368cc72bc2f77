pub mod aggregate;
pub mod banner;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod loader;
pub mod models;
pub mod normalize;
pub mod positions;
pub mod report;
pub mod service;
pub mod store;
pub mod workplace;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, Result};
pub use models::{
    DegreeLevel, FilterParams, GenderFilter, NationalityFilter, QaaOptions, Report, ReportMode,
    SchemaKind, Sheet,
};
pub use service::{ReportService, Upload};
pub use store::{DatasetStore, MemoryStore, SessionId};
