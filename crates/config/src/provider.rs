//! Config provider handle
//!
//! Produced by an explicit startup step and passed into the engine; there
//! is no lazy module-level initialization. The engine asks for a company's
//! runtime by id once per turn.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::lexicon::CompiledLexicon;
use crate::runtime::RuntimeConfig;
use crate::ConfigError;

/// One company's fully-resolved runtime: the config plus everything
/// precomputed from it.
#[derive(Debug)]
pub struct CompanyRuntime {
    pub config: RuntimeConfig,
    pub lexicon: CompiledLexicon,
}

impl CompanyRuntime {
    pub fn new(config: RuntimeConfig) -> Self {
        let lexicon = CompiledLexicon::compile(&config);
        Self { config, lexicon }
    }
}

/// Read-only source of per-company runtime configuration
pub trait ConfigProvider: Send + Sync {
    /// The company's runtime, or `None` when nothing is on file.
    fn company_runtime(&self, company_id: &str) -> Option<Arc<CompanyRuntime>>;
}

/// Provider over a fixed set of companies, built once at startup.
#[derive(Default)]
pub struct StaticConfigProvider {
    companies: HashMap<String, Arc<CompanyRuntime>>,
}

impl StaticConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_company(mut self, config: RuntimeConfig) -> Self {
        self.insert(config);
        self
    }

    pub fn insert(&mut self, config: RuntimeConfig) {
        let company_id = config.company_id.clone();
        self.companies
            .insert(company_id, Arc::new(CompanyRuntime::new(config)));
    }

    /// Load every `*.yaml` in a directory as one company config.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut provider = Self::new();
        let entries = std::fs::read_dir(dir.as_ref())?;

        for entry in entries {
            let path = entry?.path();
            let is_yaml = path
                .extension()
                .map(|e| e == "yaml" || e == "yml")
                .unwrap_or(false);
            if !is_yaml {
                continue;
            }
            match RuntimeConfig::load(&path) {
                Ok(config) => provider.insert(config),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unparseable company config");
                }
            }
        }

        Ok(provider)
    }

    pub fn len(&self) -> usize {
        self.companies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
    }
}

impl ConfigProvider for StaticConfigProvider {
    fn company_runtime(&self, company_id: &str) -> Option<Arc<CompanyRuntime>> {
        self.companies.get(company_id).cloned()
    }
}
