use anyhow::Result;
use clap::Parser;
use codeoptim_core::ConfigManager;
use codeoptim_mcp_server::CodeOptimMcpServer;
use rmcp::ServiceExt;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, Registry};

#[derive(Parser)]
#[command(
    name = "codeoptim-mcp",
    version,
    about = "CodeOptim MCP server over stdio",
    long_about = "Exposes optimize_code, generate_from_docs and analyze_github_repo to MCP clients. Logs go to stderr; stdout carries the protocol."
)]
struct Cli {
    #[arg(short, long, help = "Enable verbose logging")]
    verbose: bool,

    #[arg(long, help = "Configuration file path")]
    config: Option<PathBuf>,

    #[arg(
        long,
        help = "Write a default config to --config (or ./.codeoptim.toml) and exit"
    )]
    init_config: bool,

    #[arg(long, requires = "init_config", help = "Overwrite an existing config file")]
    force: bool,
}

const LOCAL_CONFIG: &str = ".codeoptim.toml";

/// Returns false when the file exists and `force` is not set.
fn init_config(path: &Path, force: bool) -> Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    ConfigManager::create_default_config(path)?;
    Ok(true)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.init_config {
        let path = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(LOCAL_CONFIG));
        if init_config(&path, cli.force)? {
            eprintln!("Created config file: {}", path.display());
        } else {
            eprintln!(
                "Config file already exists: {} (use --force to overwrite)",
                path.display()
            );
        }
        return Ok(());
    }

    let manager = match &cli.config {
        Some(path) => ConfigManager::from_file(path)?,
        None => ConfigManager::load()?,
    };
    let config = manager.config();

    let default_level = if cli.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "codeoptim_mcp_server={level},codeoptim_ai={level},codeoptim_services={level},rmcp=warn",
            level = default_level
        ))
    });
    let subscriber = Registry::default().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(false),
    );
    tracing::subscriber::set_global_default(subscriber).ok();

    let server = CodeOptimMcpServer::new(config)?;
    info!(
        "Starting CodeOptim MCP server (config: {})",
        manager
            .config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "defaults".to_string())
    );

    let service = server
        .serve(rmcp::transport::stdio())
        .await
        .map_err(|e| anyhow::anyhow!("MCP server startup failed: {}", e))?;

    service
        .waiting()
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_config_respects_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        assert!(init_config(&path, false).unwrap());
        assert!(std::fs::read_to_string(&path).unwrap().contains("[sandbox]"));

        std::fs::write(&path, "# edited").unwrap();
        assert!(!init_config(&path, false).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# edited");

        assert!(init_config(&path, true).unwrap());
        assert_ne!(std::fs::read_to_string(&path).unwrap(), "# edited");
    }

    #[test]
    fn force_requires_init_config() {
        assert!(Cli::try_parse_from(["codeoptim-mcp", "--force"]).is_err());
        let cli = Cli::try_parse_from(["codeoptim-mcp", "--init-config", "--force"]).unwrap();
        assert!(cli.init_config && cli.force);
    }
}
