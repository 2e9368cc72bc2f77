use crate::aggregate::StatusBuckets;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::loader::{self, Loaded};
use crate::models::{RawTable, SchemaKind};
use crate::normalize::CompanyNormalizer;
use crate::positions::TitleClassifier;

/// Configuration plus the lookup structures compiled from it once.
pub struct Engine {
    config: EngineConfig,
    companies: CompanyNormalizer,
    titles: TitleClassifier,
    buckets: StatusBuckets,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let companies = CompanyNormalizer::new(&config.companies);
        let titles = TitleClassifier::new(&config.titles)?;
        let buckets = StatusBuckets::new(&config.statuses);
        Ok(Self {
            config,
            companies,
            titles,
            buckets,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn companies(&self) -> &CompanyNormalizer {
        &self.companies
    }

    pub fn titles(&self) -> &TitleClassifier {
        &self.titles
    }

    pub fn buckets(&self) -> &StatusBuckets {
        &self.buckets
    }

    pub fn load(
        &self,
        table: RawTable,
        hint: Option<SchemaKind>,
        source_name: &str,
    ) -> Result<Loaded> {
        loader::load(table, hint, source_name, &self.config)
    }
}
