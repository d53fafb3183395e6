// ABOUTME: MCP server exposing CodeOptim tools over the rmcp SDK
// ABOUTME: Wraps code optimization, documentation-driven generation and repository analysis

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler,
};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::reports;
use codeoptim_ai::{CodeAnalyzer, LLMProvider, LLMProviderFactory, VariantGenerator};
use codeoptim_core::CodeOptimConfig;
use codeoptim_services::{
    generate_implementation_variants, DocsService, GitHubService, ResearchService, SandboxRunner,
};

const MAX_TOOL_VARIANTS: usize = 10;
const MEASURE_ITERATIONS: u32 = 10;

#[derive(Deserialize, JsonSchema)]
pub struct OptimizeCodeRequest {
    /// Source code to optimize
    pub code: String,
    /// Programming language of the code (python, javascript, ...)
    #[serde(default = "default_language")]
    pub language: String,
    /// Optimization goal, e.g. performance or memory
    #[serde(default = "default_target")]
    pub target: String,
    /// Number of variants to generate (1-10)
    #[serde(default = "default_variants")]
    pub variants: usize,
}

fn default_language() -> String {
    "python".to_string()
}

fn default_target() -> String {
    "performance".to_string()
}

fn default_variants() -> usize {
    5
}

#[derive(Deserialize, JsonSchema)]
pub struct GenerateFromDocsRequest {
    /// Documentation pages to learn the API from
    pub documentation_urls: Vec<String>,
    /// What the generated code should do
    pub requirements: String,
    /// Language of the generated implementations
    #[serde(default = "default_target_language")]
    pub target_language: String,
    /// Implementation style, e.g. production or minimal
    #[serde(default = "default_style")]
    pub implementation_style: String,
}

fn default_target_language() -> String {
    "JavaScript".to_string()
}

fn default_style() -> String {
    "production".to_string()
}

#[derive(Deserialize, JsonSchema)]
pub struct AnalyzeRepoRequest {
    /// Repository URL such as https://github.com/owner/repo
    pub github_url: String,
    /// quick, comprehensive or deep. deep adds a holistic codebase review
    #[serde(default = "default_depth")]
    pub analysis_depth: String,
    /// Aspects to emphasize in the report
    #[serde(default = "default_focus_areas")]
    pub focus_areas: Vec<String>,
}

fn default_depth() -> String {
    "comprehensive".to_string()
}

fn default_focus_areas() -> Vec<String> {
    vec![
        "performance".to_string(),
        "algorithms".to_string(),
        "complexity".to_string(),
    ]
}

#[derive(Clone)]
pub struct CodeOptimMcpServer {
    analyzer: Arc<CodeAnalyzer>,
    research: Arc<ResearchService>,
    generator: Arc<VariantGenerator>,
    sandbox: Arc<SandboxRunner>,
    docs: Arc<DocsService>,
    github: Arc<GitHubService>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl CodeOptimMcpServer {
    pub fn new(config: &CodeOptimConfig) -> anyhow::Result<Self> {
        let captain = LLMProviderFactory::captain(&config.captain);
        let morph = LLMProviderFactory::morph(&config.morph);
        Self::with_providers(config, captain, morph)
    }

    pub fn with_providers(
        config: &CodeOptimConfig,
        captain: Option<Arc<dyn LLMProvider>>,
        morph: Option<Arc<dyn LLMProvider>>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            analyzer: Arc::new(CodeAnalyzer::new(captain, &config.captain)),
            research: Arc::new(ResearchService::new(config.research.clone())?),
            generator: Arc::new(VariantGenerator::new(morph)),
            sandbox: Arc::new(SandboxRunner::new(config.sandbox.clone())),
            docs: Arc::new(DocsService::new(config.docs.clone())?),
            github: Arc::new(GitHubService::new(config.github.clone())?),
            tool_router: Self::tool_router(),
        })
    }

    /// Analyze, research and generate variants; the first variant is measured.
    pub async fn run_optimization(&self, request: &OptimizeCodeRequest) -> Result<String, McpError> {
        if request.code.trim().is_empty() {
            return Err(McpError::invalid_params("code must not be empty", None));
        }
        let count = request.variants.clamp(1, MAX_TOOL_VARIANTS);
        info!(
            "optimize_code: {} variants of {} code for {}",
            count, request.language, request.target
        );

        let analysis = self
            .analyzer
            .analyze_code(&request.code, &request.language, &request.target)
            .await;
        let findings = self
            .research
            .research_optimizations(&request.language, &request.target, &analysis.patterns)
            .await;

        let mut variants = Vec::with_capacity(count);
        for n in 1..=count {
            variants.push(
                self.generator
                    .generate_variant(&request.code, &analysis, &findings, n)
                    .await,
            );
        }

        let measured = match variants.first() {
            Some(first) => {
                let baseline = if self.sandbox.is_enabled() {
                    Some(
                        self.sandbox
                            .execute(&request.code, &request.language, MEASURE_ITERATIONS)
                            .await,
                    )
                } else {
                    None
                };
                Some(
                    self.sandbox
                        .measure_variant(baseline.as_ref(), &first.code, &request.language, MEASURE_ITERATIONS)
                        .await,
                )
            }
            None => None,
        };

        Ok(reports::optimization_report(
            &request.language,
            &request.target,
            &analysis,
            &variants,
            measured.as_ref(),
        ))
    }

    /// Scrape the pages, extract API patterns and render implementations.
    pub async fn run_docs_generation(&self, request: &GenerateFromDocsRequest) -> Result<String, McpError> {
        let urls: Vec<String> = request
            .documentation_urls
            .iter()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .collect();
        if urls.is_empty() {
            return Err(McpError::invalid_params("documentation_urls must not be empty", None));
        }
        if request.requirements.trim().is_empty() {
            return Err(McpError::invalid_params("requirements must not be empty", None));
        }
        info!("generate_from_docs: {} urls, {}", urls.len(), request.target_language);

        let docs = self.docs.scrape_documentation(&urls).await;
        let patterns = self.docs.extract_api_patterns(&docs).await;
        let implementations = generate_implementation_variants(
            &patterns,
            &docs,
            &request.requirements,
            &request.target_language,
        );

        Ok(reports::documentation_report(
            &docs,
            &implementations,
            &request.requirements,
            &request.target_language,
            &request.implementation_style,
        ))
    }

    /// Analyze a repository; failures come back as `Ok(Err(text))` so the
    /// tool can report them without a protocol error.
    pub async fn run_repository_analysis(
        &self,
        request: &AnalyzeRepoRequest,
    ) -> Result<Result<String, String>, McpError> {
        if request.github_url.trim().is_empty() {
            return Err(McpError::invalid_params("github_url must not be empty", None));
        }
        info!(
            "analyze_github_repo: {} ({})",
            request.github_url, request.analysis_depth
        );

        let analysis = self
            .github
            .analyze_repository(request.github_url.trim(), &self.analyzer, &self.research)
            .await;
        if let Some(error) = &analysis.error {
            return Ok(Err(format!("Repository analysis failed: {}", error)));
        }

        let codebase = if request.analysis_depth.eq_ignore_ascii_case("deep") {
            let files: Vec<(String, String)> = analysis
                .files
                .iter()
                .map(|f| (f.path.clone(), f.content.clone()))
                .collect();
            Some(self.analyzer.analyze_codebase(&files, "performance").await)
        } else {
            None
        };

        Ok(Ok(reports::repository_report(
            &analysis,
            &request.analysis_depth,
            &request.focus_areas,
            codebase.as_ref(),
        )))
    }

    #[tool(
        description = "Optimize source code. Analyzes complexity and bottlenecks, researches techniques and generates optimized variants with a performance estimate. Required: code. Optional: language (default python), target (default performance), variants (1-10, default 5)."
    )]
    async fn optimize_code(
        &self,
        params: Parameters<OptimizeCodeRequest>,
    ) -> Result<CallToolResult, McpError> {
        let report = self.run_optimization(&params.0).await?;
        Ok(CallToolResult::success(vec![Content::text(report)]))
    }

    #[tool(
        description = "Generate implementations from API documentation. Scrapes the given pages, extracts endpoints and examples, and renders Simple, Advanced and Production code. Required: documentation_urls, requirements. Optional: target_language (default JavaScript), implementation_style."
    )]
    async fn generate_from_docs(
        &self,
        params: Parameters<GenerateFromDocsRequest>,
    ) -> Result<CallToolResult, McpError> {
        let report = self.run_docs_generation(&params.0).await?;
        Ok(CallToolResult::success(vec![Content::text(report)]))
    }

    #[tool(
        description = "Analyze a GitHub repository for optimization opportunities. Returns detected algorithms, performance issues, hotspots and recommendations. Required: github_url. Optional: analysis_depth (quick, comprehensive, deep), focus_areas."
    )]
    async fn analyze_github_repo(
        &self,
        params: Parameters<AnalyzeRepoRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self.run_repository_analysis(&params.0).await? {
            Ok(report) => Ok(CallToolResult::success(vec![Content::text(report)])),
            Err(message) => Ok(CallToolResult::error(vec![Content::text(message)])),
        }
    }
}

#[tool_handler]
impl ServerHandler for CodeOptimMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "CodeOptim: use optimize_code to improve a snippet, generate_from_docs to turn API \
                 documentation into working code, and analyze_github_repo to find optimization \
                 opportunities across a repository."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
