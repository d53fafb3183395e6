//! Whole-repository analysis for GitHub projects.
//!
//! Files are pulled through the REST v3 API, then each language group gets a
//! Captain analysis, a research pass and per-file keyword heuristics.

use crate::research::ResearchService;
use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use codeoptim_ai::CodeAnalyzer;
use codeoptim_core::{CodeAnalysis, GitHubConfig, ResearchFindings};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

const CODE_EXTENSIONS: [&str; 13] = [
    ".py", ".js", ".ts", ".jsx", ".tsx", ".java", ".cpp", ".c", ".cs", ".go", ".rs", ".php", ".rb",
];

/// Files per language sent to the analyzer.
const ANALYZED_FILES_PER_LANGUAGE: usize = 5;
const REPORT_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub full_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryFile {
    pub path: String,
    pub extension: String,
    pub content: String,
    pub size: u64,
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedAlgorithm {
    #[serde(rename = "type")]
    pub kind: String,
    pub algorithm: String,
    pub optimization_potential: String,
    pub suggestion: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceIssue {
    pub issue: String,
    pub severity: String,
    pub description: String,
    pub suggestion: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInsights {
    pub file_path: String,
    pub language: String,
    pub size: u64,
    pub algorithms_detected: Vec<DetectedAlgorithm>,
    pub performance_issues: Vec<PerformanceIssue>,
    pub complexity_score: u32,
    pub optimization_priority: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationPotential {
    pub score: f64,
    pub priority: String,
    pub high_priority_files: usize,
    pub medium_priority_files: usize,
    pub total_files: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageAnalysis {
    pub files_count: usize,
    pub captain_analysis: CodeAnalysis,
    pub research_findings: ResearchFindings,
    pub file_analysis: Vec<FileInsights>,
    pub optimization_potential: OptimizationPotential,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSummary {
    pub path: String,
    pub size: u64,
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryOverview {
    pub total_files: usize,
    pub languages_detected: Vec<String>,
    pub largest_files: Vec<FileSummary>,
}

/// A finding together with the file it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Located<T> {
    #[serde(flatten)]
    pub item: T,
    pub file: String,
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hotspot {
    pub file: String,
    pub complexity: u32,
    pub language: String,
    pub priority: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: String,
    pub priority: String,
    pub title: String,
    pub description: String,
    pub impact: String,
    pub files_affected: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total_files_analyzed: usize,
    pub languages_found: Vec<String>,
    pub algorithms_detected: usize,
    pub optimization_opportunities: usize,
    pub performance_hotspots: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimatedImprovements {
    pub performance_gain: String,
    pub memory_reduction: String,
    pub code_quality: String,
}

impl Default for EstimatedImprovements {
    fn default() -> Self {
        Self {
            performance_gain: "15-45% faster execution".to_string(),
            memory_reduction: "10-30% less memory usage".to_string(),
            code_quality: "Significant maintainability improvement".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub repository_name: String,
    pub analysis_summary: AnalysisSummary,
    pub top_algorithms: Vec<Located<DetectedAlgorithm>>,
    pub optimization_opportunities: Vec<Located<PerformanceIssue>>,
    pub performance_hotspots: Vec<Hotspot>,
    pub recommendations: Vec<Recommendation>,
    pub estimated_improvements: EstimatedImprovements,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryAnalysis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<RepositoryInfo>,
    pub files_analyzed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overview: Option<RepositoryOverview>,
    pub language_analysis: BTreeMap<String, LanguageAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimization_report: Option<OptimizationReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Fetched sources, kept for follow-up analyses
    #[serde(skip)]
    pub files: Vec<RepositoryFile>,
}

impl RepositoryAnalysis {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    #[serde(default)]
    tree: Vec<TreeEntry>,
}

#[derive(Debug, Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    size: u64,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    content: String,
}

/// Owner and repository from a `github.com` URL; the branch is always `main`.
pub fn parse_github_url(url: &str) -> Option<RepositoryInfo> {
    if !url.contains("github.com") {
        return None;
    }
    let parsed = Url::parse(url.trim_end_matches('/')).ok()?;
    let mut segments = parsed.path_segments()?.filter(|s| !s.is_empty());
    let owner = segments.next()?.to_string();
    let repo = segments.next()?;
    let repo = repo.strip_suffix(".git").unwrap_or(repo).to_string();
    if repo.is_empty() {
        return None;
    }

    Some(RepositoryInfo {
        full_name: format!("{}/{}", owner, repo),
        owner,
        repo,
        branch: "main".to_string(),
    })
}

pub fn detect_language(extension: &str) -> &'static str {
    match extension {
        ".py" => "python",
        ".js" | ".jsx" => "javascript",
        ".ts" | ".tsx" => "typescript",
        ".java" => "java",
        ".cpp" => "cpp",
        ".c" => "c",
        ".cs" => "csharp",
        ".go" => "go",
        ".rs" => "rust",
        ".php" => "php",
        ".rb" => "ruby",
        _ => "unknown",
    }
}

fn extension_of(path: &str) -> Option<String> {
    let name = path.rsplit('/').next()?;
    let dot = name.rfind('.').filter(|&i| i > 0)?;
    Some(name[dot..].to_lowercase())
}

fn algorithm(kind: &str, name: &str, potential: &str, suggestion: &str) -> DetectedAlgorithm {
    DetectedAlgorithm {
        kind: kind.to_string(),
        algorithm: name.to_string(),
        optimization_potential: potential.to_string(),
        suggestion: suggestion.to_string(),
    }
}

fn issue(name: &str, severity: &str, description: &str, suggestion: &str) -> PerformanceIssue {
    PerformanceIssue {
        issue: name.to_string(),
        severity: severity.to_string(),
        description: description.to_string(),
        suggestion: suggestion.to_string(),
    }
}

/// Keyword-based algorithm detection. Counts are plain substring counts.
pub fn detect_algorithms(code: &str) -> Vec<DetectedAlgorithm> {
    let lower = code.to_lowercase();
    let fors = lower.matches("for").count();
    let mut found = Vec::new();

    if lower.contains("sort") {
        if lower.contains("bubble") || fors >= 2 {
            found.push(algorithm(
                "sorting",
                "bubble_sort",
                "high",
                "Replace with quicksort or native sort function",
            ));
        } else if lower.contains("quick") || lower.contains("partition") {
            found.push(algorithm(
                "sorting",
                "quicksort",
                "medium",
                "Consider hybrid approach for small arrays",
            ));
        }
    }

    if ["find", "search", "indexof"].iter().any(|t| lower.contains(t)) && fors > 0 {
        found.push(algorithm(
            "search",
            "linear_search",
            "high",
            "Use binary search for sorted data or hash map for frequent lookups",
        ));
    }

    if fors + lower.matches("while").count() >= 2 {
        found.push(algorithm(
            "loops",
            "nested_loops",
            "high",
            "Consider vectorization, caching, or algorithmic optimization",
        ));
    }

    if code.contains("def ") && (code.contains("fibonacci") || code.contains("factorial")) {
        found.push(algorithm(
            "recursion",
            "recursive_function",
            "high",
            "Add memoization or convert to iterative approach",
        ));
    }

    found
}

pub fn detect_performance_issues(code: &str, language: &str) -> Vec<PerformanceIssue> {
    let lower = code.to_lowercase();
    let mut issues = Vec::new();

    match language {
        "python" => {
            if code.contains("+=") && lower.contains("str") {
                issues.push(issue(
                    "string_concatenation",
                    "medium",
                    "String concatenation in loop",
                    "Use join() or f-strings",
                ));
            }
            if code.contains("list(") && code.contains("range(") {
                issues.push(issue(
                    "inefficient_list_creation",
                    "low",
                    "Inefficient list creation",
                    "Use list comprehension",
                ));
            }
        }
        "javascript" => {
            if lower.contains("document.getelementby") {
                issues.push(issue(
                    "dom_queries",
                    "medium",
                    "Repeated DOM queries",
                    "Cache DOM elements",
                ));
            }
            if code.matches("var ").count() > 5 {
                issues.push(issue(
                    "var_usage",
                    "low",
                    "Using var instead of let/const",
                    "Use let/const for better performance",
                ));
            }
        }
        _ => {}
    }

    if lower.matches("for").count() >= 3 {
        issues.push(issue(
            "deeply_nested_loops",
            "high",
            "Deeply nested loops detected",
            "Consider algorithmic optimization",
        ));
    }

    issues
}

/// Loops, branches, functions and indentation depth, capped at 10.
pub fn complexity_score(code: &str) -> u32 {
    let lower = code.to_lowercase();
    let count = |needle: &str| lower.matches(needle).count();

    let mut score = count("for") * 2 + count("while") * 2;
    score += count("if") + count("elif") + count("else if");
    score += code.matches("def ").count() + code.matches("function ").count();

    let max_indent = code
        .lines()
        .map(|line| (line.len() - line.trim_start().len()) / 4)
        .max()
        .unwrap_or(0);
    score += max_indent;

    score.min(10) as u32
}

pub fn optimization_priority(score: u32) -> &'static str {
    if score > 7 {
        "high"
    } else if score > 3 {
        "medium"
    } else {
        "low"
    }
}

/// Weighted share of high (3) and medium (2) priority files.
pub fn optimization_potential(files: &[FileInsights]) -> OptimizationPotential {
    let total = files.len();
    let high = files.iter().filter(|f| f.optimization_priority == "high").count();
    let medium = files.iter().filter(|f| f.optimization_priority == "medium").count();

    let score = if total == 0 {
        0.0
    } else {
        ((high * 3 + medium * 2) as f64 / total as f64 * 100.0).round() / 100.0
    };
    let priority = if score >= 2.0 {
        "high"
    } else if score >= 1.0 {
        "medium"
    } else {
        "low"
    };

    OptimizationPotential {
        score,
        priority: priority.to_string(),
        high_priority_files: high,
        medium_priority_files: medium,
        total_files: total,
    }
}

pub fn analyze_file(file: &RepositoryFile) -> FileInsights {
    let score = complexity_score(&file.content);
    FileInsights {
        file_path: file.path.clone(),
        language: file.language.clone(),
        size: file.size,
        algorithms_detected: detect_algorithms(&file.content),
        performance_issues: detect_performance_issues(&file.content, &file.language),
        complexity_score: score,
        optimization_priority: optimization_priority(score).to_string(),
    }
}

pub struct GitHubService {
    config: GitHubConfig,
    client: Client,
}

impl GitHubService {
    pub fn new(config: GitHubConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("codeoptim/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { config, client })
    }

    fn get(&self, path: &str) -> RequestBuilder {
        let request = self
            .client
            .get(format!("{}{}", self.config.api_base.trim_end_matches('/'), path))
            .header("Accept", "application/vnd.github.v3+json");
        match &self.config.token {
            Some(token) => request.header("Authorization", format!("token {}", token)),
            None => request,
        }
    }

    /// Code files of the repository, at most `max_files`.
    pub async fn fetch_repository_files(&self, repo: &RepositoryInfo) -> Result<Vec<RepositoryFile>> {
        let response = self
            .get(&format!("/repos/{}/git/trees/{}?recursive=1", repo.full_name, repo.branch))
            .send()
            .await
            .context("Failed to fetch repository tree")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("GitHub API error: {}", status));
        }
        let tree: TreeResponse = response
            .json()
            .await
            .context("Failed to parse repository tree")?;

        let mut files = Vec::new();
        for entry in tree.tree.into_iter().filter(|e| e.kind == "blob") {
            let Some(extension) = extension_of(&entry.path) else {
                continue;
            };
            if !CODE_EXTENSIONS.contains(&extension.as_str()) {
                continue;
            }

            match self.fetch_file_content(repo, &entry.path).await {
                Ok(Some(content)) => files.push(RepositoryFile {
                    language: detect_language(&extension).to_string(),
                    path: entry.path,
                    extension,
                    content,
                    size: entry.size,
                }),
                Ok(None) => debug!("Skipping {} (not base64 text)", entry.path),
                Err(e) => warn!("Error fetching file {}: {:#}", entry.path, e),
            }

            if files.len() >= self.config.max_files {
                break;
            }
        }

        Ok(files)
    }

    async fn fetch_file_content(&self, repo: &RepositoryInfo, path: &str) -> Result<Option<String>> {
        let response = self
            .get(&format!("/repos/{}/contents/{}", repo.full_name, path))
            .send()
            .await
            .context("Failed to fetch file content")?;
        if !response.status().is_success() {
            return Ok(None);
        }

        let content: ContentResponse = response.json().await.context("Failed to parse file content")?;
        if content.encoding.as_deref() != Some("base64") {
            return Ok(None);
        }

        let compact: String = content.content.split_whitespace().collect();
        let bytes = STANDARD.decode(compact).context("Invalid base64 file content")?;
        Ok(String::from_utf8(bytes).ok())
    }

    /// Fetch, group by language, analyze and summarize. Failures land in `error`.
    pub async fn analyze_repository(
        &self,
        url: &str,
        analyzer: &CodeAnalyzer,
        research: &ResearchService,
    ) -> RepositoryAnalysis {
        let Some(repo) = parse_github_url(url) else {
            return RepositoryAnalysis::failed("Invalid GitHub URL");
        };
        info!("Analyzing GitHub repository {}", repo.full_name);

        let files = match self.fetch_repository_files(&repo).await {
            Ok(files) if !files.is_empty() => files,
            Ok(_) => return RepositoryAnalysis::failed("Could not fetch repository files"),
            Err(e) => {
                warn!("Error fetching repository files: {:#}", e);
                return RepositoryAnalysis::failed(format!("Could not fetch repository files: {:#}", e));
            }
        };
        info!("Analyzing {} files", files.len());

        let mut by_language: BTreeMap<String, Vec<&RepositoryFile>> = BTreeMap::new();
        for file in &files {
            by_language.entry(file.language.clone()).or_default().push(file);
        }

        let mut language_analysis = BTreeMap::new();
        for (language, group) in &by_language {
            let combined: String = group
                .iter()
                .take(ANALYZED_FILES_PER_LANGUAGE)
                .map(|f| format!("\n# File: {}\n{}\n", f.path, f.content))
                .collect();
            if combined.trim().is_empty() {
                continue;
            }

            let captain_analysis = analyzer.analyze_code(&combined, language, "performance").await;
            let research_findings = research
                .research_optimizations(language, "performance", &captain_analysis.patterns)
                .await;
            let file_analysis: Vec<FileInsights> = group.iter().map(|f| analyze_file(f)).collect();

            language_analysis.insert(
                language.clone(),
                LanguageAnalysis {
                    files_count: group.len(),
                    optimization_potential: optimization_potential(&file_analysis),
                    captain_analysis,
                    research_findings,
                    file_analysis,
                },
            );
        }

        let mut largest: Vec<&RepositoryFile> = files.iter().collect();
        largest.sort_by(|a, b| b.size.cmp(&a.size));
        let overview = RepositoryOverview {
            total_files: files.len(),
            languages_detected: by_language.keys().cloned().collect(),
            largest_files: largest
                .into_iter()
                .take(5)
                .map(|f| FileSummary {
                    path: f.path.clone(),
                    size: f.size,
                    language: f.language.clone(),
                })
                .collect(),
        };

        let report = build_report(&repo, &overview, &language_analysis);

        RepositoryAnalysis {
            repository: Some(repo),
            files_analyzed: files.len(),
            overview: Some(overview),
            language_analysis,
            optimization_report: Some(report),
            error: None,
            files,
        }
    }
}

fn build_report(
    repo: &RepositoryInfo,
    overview: &RepositoryOverview,
    languages: &BTreeMap<String, LanguageAnalysis>,
) -> OptimizationReport {
    let mut algorithms = Vec::new();
    let mut opportunities = Vec::new();
    let mut hotspots = Vec::new();

    for (language, analysis) in languages {
        for file in &analysis.file_analysis {
            algorithms.extend(file.algorithms_detected.iter().cloned().map(|item| Located {
                item,
                file: file.file_path.clone(),
                language: language.clone(),
            }));
            opportunities.extend(file.performance_issues.iter().cloned().map(|item| Located {
                item,
                file: file.file_path.clone(),
                language: language.clone(),
            }));
            if file.complexity_score > 6 {
                hotspots.push(Hotspot {
                    file: file.file_path.clone(),
                    complexity: file.complexity_score,
                    language: language.clone(),
                    priority: file.optimization_priority.clone(),
                });
            }
        }
    }

    let recommendations = recommendations(&algorithms, &hotspots);
    let analysis_summary = AnalysisSummary {
        total_files_analyzed: overview.total_files,
        languages_found: overview.languages_detected.clone(),
        algorithms_detected: algorithms.len(),
        optimization_opportunities: opportunities.len(),
        performance_hotspots: hotspots.len(),
    };

    // Stable sorts: high first, original order otherwise.
    algorithms.sort_by_key(|a| a.item.optimization_potential != "high");
    opportunities.sort_by_key(|o| o.item.severity != "high");
    hotspots.sort_by(|a, b| b.complexity.cmp(&a.complexity));
    algorithms.truncate(REPORT_LIMIT);
    opportunities.truncate(REPORT_LIMIT);
    hotspots.truncate(REPORT_LIMIT);

    OptimizationReport {
        repository_name: repo.full_name.clone(),
        analysis_summary,
        top_algorithms: algorithms,
        optimization_opportunities: opportunities,
        performance_hotspots: hotspots,
        recommendations,
        estimated_improvements: EstimatedImprovements::default(),
    }
}

fn recommendations(algorithms: &[Located<DetectedAlgorithm>], hotspots: &[Hotspot]) -> Vec<Recommendation> {
    let files_with = |name: &str| -> Vec<String> {
        algorithms
            .iter()
            .filter(|a| a.item.algorithm == name)
            .map(|a| a.file.clone())
            .collect()
    };

    let mut recommendations = Vec::new();
    let mut push = |kind: &str, priority: &str, title: &str, description: String, impact: &str, files: Vec<String>| {
        recommendations.push(Recommendation {
            kind: kind.to_string(),
            priority: priority.to_string(),
            title: title.to_string(),
            description,
            impact: impact.to_string(),
            files_affected: files,
        });
    };

    let bubble = files_with("bubble_sort");
    if !bubble.is_empty() {
        push(
            "algorithmic",
            "high",
            "Replace Bubble Sort Algorithms",
            format!("Found {} bubble sort implementations that can be optimized", bubble.len()),
            "60-90% performance improvement",
            bubble,
        );
    }

    let searches = files_with("linear_search");
    if !searches.is_empty() {
        push(
            "algorithmic",
            "high",
            "Optimize Search Operations",
            format!("Found {} linear search patterns", searches.len()),
            "50-80% faster search operations",
            searches,
        );
    }

    let loops = files_with("nested_loops");
    if !loops.is_empty() {
        push(
            "performance",
            "medium",
            "Optimize Nested Loops",
            format!("Found {} nested loop patterns", loops.len()),
            "20-50% performance improvement",
            loops,
        );
    }

    if !hotspots.is_empty() {
        push(
            "refactoring",
            "medium",
            "Simplify Complex Functions",
            format!("Found {} files with high complexity", hotspots.len()),
            "Better maintainability and performance",
            hotspots.iter().map(|h| h.file.clone()).collect(),
        );
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::Path,
        http::{HeaderMap, StatusCode},
        routing::get,
        Json, Router,
    };
    use codeoptim_core::{CaptainConfig, ResearchConfig};
    use serde_json::json;

    const BUBBLE_SORT: &str = "def bubble_sort(arr):\n    for i in range(len(arr)):\n        for j in range(len(arr) - 1):\n            if arr[j] > arr[j + 1]:\n                arr[j], arr[j + 1] = arr[j + 1], arr[j]\n    return arr\n";

    fn encoded(source: &str) -> String {
        // GitHub wraps base64 content at 60 columns
        let raw = STANDARD.encode(source);
        raw.as_bytes()
            .chunks(60)
            .map(|c| String::from_utf8_lossy(c).into_owned())
            .collect::<Vec<_>>()
            .join("\n")
    }

    async fn spawn_github() -> String {
        let app = Router::new()
            .route(
                "/repos/{owner}/{repo}/git/trees/{branch}",
                get(|Path((owner, repo, branch)): Path<(String, String, String)>| async move {
                    if owner != "acme" || repo != "algos" || branch != "main" {
                        return (StatusCode::NOT_FOUND, Json(json!({"message": "Not Found"})));
                    }
                    (
                        StatusCode::OK,
                        Json(json!({
                            "tree": [
                                {"path": "src", "type": "tree"},
                                {"path": "src/sort.py", "type": "blob", "size": 240},
                                {"path": "src/app.js", "type": "blob", "size": 80},
                                {"path": "README.md", "type": "blob", "size": 10},
                                {"path": "assets/logo.png", "type": "blob", "size": 999}
                            ]
                        })),
                    )
                }),
            )
            .route(
                "/repos/{owner}/{repo}/contents/{*path}",
                get(|headers: HeaderMap, Path((_, _, path)): Path<(String, String, String)>| async move {
                    assert_eq!(headers["authorization"], "token gh-token");
                    let source = match path.as_str() {
                        "src/sort.py" => BUBBLE_SORT,
                        "src/app.js" => "const el = document.getElementById('x');\n",
                        _ => return (StatusCode::NOT_FOUND, Json(json!({}))),
                    };
                    (
                        StatusCode::OK,
                        Json(json!({"encoding": "base64", "content": encoded(source)})),
                    )
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn service(api_base: String) -> GitHubService {
        GitHubService::new(GitHubConfig {
            api_base,
            token: Some("gh-token".to_string()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn parses_repository_urls() {
        let info = parse_github_url("https://github.com/acme/algos.git").unwrap();
        assert_eq!(info.full_name, "acme/algos");
        assert_eq!(info.branch, "main");
        assert_eq!(parse_github_url("https://github.com/acme/algos/tree/dev").unwrap().repo, "algos");
        assert!(parse_github_url("https://gitlab.com/acme/algos").is_none());
        assert!(parse_github_url("https://github.com/acme").is_none());
    }

    #[test]
    fn extensions_map_to_languages() {
        assert_eq!(extension_of("src/Main.JAVA").as_deref(), Some(".java"));
        assert_eq!(extension_of(".gitignore"), None);
        assert_eq!(detect_language(".tsx"), "typescript");
        assert_eq!(detect_language(".md"), "unknown");
    }

    #[test]
    fn bubble_sort_is_flagged() {
        let algorithms = detect_algorithms(BUBBLE_SORT);
        let names: Vec<&str> = algorithms.iter().map(|a| a.algorithm.as_str()).collect();
        assert_eq!(names, vec!["bubble_sort", "nested_loops"]);
    }

    #[test]
    fn javascript_issues() {
        let code = "var a; var b; var c; var d; var e; var f;\ndocument.getElementById('x');";
        let issues: Vec<String> = detect_performance_issues(code, "javascript")
            .into_iter()
            .map(|i| i.issue)
            .collect();
        assert_eq!(issues, vec!["dom_queries", "var_usage"]);
    }

    #[test]
    fn complexity_is_capped() {
        assert_eq!(complexity_score(BUBBLE_SORT), 10);
        assert_eq!(complexity_score("x = 1"), 0);
        assert_eq!(optimization_priority(8), "high");
        assert_eq!(optimization_priority(4), "medium");
        assert_eq!(optimization_priority(3), "low");
    }

    #[test]
    fn potential_weights_priorities() {
        let insight = |priority: &str| FileInsights {
            file_path: "f".to_string(),
            language: "python".to_string(),
            size: 0,
            algorithms_detected: Vec::new(),
            performance_issues: Vec::new(),
            complexity_score: 0,
            optimization_priority: priority.to_string(),
        };
        let potential = optimization_potential(&[insight("high"), insight("medium"), insight("low")]);
        assert_eq!(potential.score, 1.67);
        assert_eq!(potential.priority, "medium");
        assert_eq!(optimization_potential(&[]).priority, "low");
    }

    #[tokio::test]
    async fn fetches_only_code_blobs() {
        let base = spawn_github().await;
        let repo = parse_github_url("https://github.com/acme/algos").unwrap();
        let files = service(base).fetch_repository_files(&repo).await.unwrap();

        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["src/sort.py", "src/app.js"]);
        assert_eq!(files[0].content, BUBBLE_SORT);
        assert_eq!(files[1].language, "javascript");
    }

    #[tokio::test]
    async fn analyzes_a_repository() {
        let base = spawn_github().await;
        let analyzer = CodeAnalyzer::new(None, &CaptainConfig::default());
        let research = ResearchService::new(ResearchConfig::default()).unwrap();

        let analysis = service(base)
            .analyze_repository("https://github.com/acme/algos", &analyzer, &research)
            .await;

        assert!(analysis.error.is_none());
        assert_eq!(analysis.files_analyzed, 2);
        assert_eq!(analysis.files.len(), 2);
        assert_eq!(
            analysis.language_analysis.keys().collect::<Vec<_>>(),
            vec!["javascript", "python"]
        );

        let report = analysis.optimization_report.unwrap();
        assert_eq!(report.repository_name, "acme/algos");
        assert_eq!(report.performance_hotspots[0].file, "src/sort.py");
        assert_eq!(report.recommendations[0].title, "Replace Bubble Sort Algorithms");
        assert_eq!(report.analysis_summary.optimization_opportunities, 1);
    }

    #[tokio::test]
    async fn missing_repository_is_reported() {
        let base = spawn_github().await;
        let analyzer = CodeAnalyzer::new(None, &CaptainConfig::default());
        let research = ResearchService::new(ResearchConfig::default()).unwrap();

        let analysis = service(base)
            .analyze_repository("https://github.com/acme/unknown", &analyzer, &research)
            .await;
        assert!(analysis.error.unwrap().starts_with("Could not fetch repository files"));

        let invalid = service("http://127.0.0.1:1".to_string())
            .analyze_repository("not a url", &analyzer, &research)
            .await;
        assert_eq!(invalid.error.as_deref(), Some("Invalid GitHub URL"));
    }
}
