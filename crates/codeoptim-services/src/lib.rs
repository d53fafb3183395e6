pub mod doc_templates;
pub mod docs;
pub mod github;
pub mod research;
pub mod sandbox;
pub mod simulate;

pub use docs::{
    generate_implementation_variants, ApiPatterns, DocsService, Implementation, ScrapedDocumentation,
};
pub use github::{GitHubService, RepositoryAnalysis};
pub use research::ResearchService;
pub use sandbox::{BenchmarkReport, SandboxRunner};
pub use simulate::simulate_performance;
