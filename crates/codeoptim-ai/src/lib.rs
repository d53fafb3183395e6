pub mod analysis;
pub mod llm_factory;
pub mod llm_provider;
pub mod mock_provider;
pub mod openai_compatible_provider;
pub mod update_patterns;
pub mod variants;

pub use analysis::{CodeAnalyzer, CodebaseAnalysis};
pub use llm_factory::LLMProviderFactory;
pub use llm_provider::*;
pub use openai_compatible_provider::{OpenAICompatibleConfig, OpenAICompatibleProvider};
pub use variants::VariantGenerator;
