use crate::store::ExperimentStore;
use codeoptim_ai::{CodeAnalyzer, LLMProvider, LLMProviderFactory, VariantGenerator};
use codeoptim_core::{CodeOptimError, ConfigManager, ExperimentConfig};
use codeoptim_services::{ResearchService, SandboxRunner};
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ConfigManager>,
    pub store: Arc<ExperimentStore>,
    pub analyzer: Arc<CodeAnalyzer>,
    pub research: Arc<ResearchService>,
    pub generator: Arc<VariantGenerator>,
    pub sandbox: Arc<SandboxRunner>,
    pub started_at: Instant,
}

impl AppState {
    /// Build providers from the configuration; services without a key fall back.
    pub async fn new(config: Arc<ConfigManager>) -> codeoptim_core::Result<Self> {
        let captain = LLMProviderFactory::captain(&config.config().captain);
        let morph = LLMProviderFactory::morph(&config.config().morph);
        Self::with_providers(config, captain, morph)
    }

    pub fn with_providers(
        config: Arc<ConfigManager>,
        captain: Option<Arc<dyn LLMProvider>>,
        morph: Option<Arc<dyn LLMProvider>>,
    ) -> codeoptim_core::Result<Self> {
        let settings = config.config();
        let research = ResearchService::new(settings.research.clone())
            .map_err(|e| CodeOptimError::ExternalService(format!("{:#}", e)))?;

        Ok(Self {
            store: Arc::new(ExperimentStore::new()),
            analyzer: Arc::new(CodeAnalyzer::new(captain, &settings.captain)),
            research: Arc::new(research),
            generator: Arc::new(VariantGenerator::new(morph)),
            sandbox: Arc::new(SandboxRunner::new(settings.sandbox.clone())),
            started_at: Instant::now(),
            config,
        })
    }

    pub fn experiment_settings(&self) -> &ExperimentConfig {
        &self.config.config().experiment
    }
}
