use std::{env, fs, path::PathBuf, process::ExitCode, time::Duration};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use query_framework::logging;

use lending_query::{
    completion_client,
    config::Config,
    materializer, prompt,
    registry::{self, ServiceType, SubgraphResolver as _},
    service::QueryService,
    subgraph_client,
};

const EXECUTABLE_NAME: &str = "lending-query";

#[derive(Debug, Parser)]
#[command(name = EXECUTABLE_NAME, about = "Query lending protocol metrics from Messari subgraphs")]
struct Cli {
    /// Path to the JSON configuration file
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve every protocol and chain pair and write the consolidated registry
    Materialize,
    /// Print the subgraph serving a protocol on a chain
    Resolve {
        #[command(flatten)]
        target: Target,
    },
    /// Run a GraphQL query against the subgraph of a protocol on a chain
    Query {
        #[command(flatten)]
        target: Target,
        /// GraphQL query text
        #[arg(long, required_unless_present = "query_file", conflicts_with = "query_file")]
        query: Option<String>,
        /// File containing the GraphQL query
        #[arg(long)]
        query_file: Option<PathBuf>,
    },
    /// Ask the completion endpoint to write a lending metrics query
    Synthesize,
}

#[derive(Debug, clap::Args)]
struct Target {
    /// Protocol name (default: `default_protocol` from the config)
    #[arg(long)]
    protocol: Option<String>,
    /// Chain name (default: `default_chain` from the config)
    #[arg(long)]
    chain: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::from_file(&cli.config) {
        Ok(config) => config.with_env_secrets(|name| env::var(name).ok()),
        Err(config_err) => {
            logging::error_log(EXECUTABLE_NAME, &config_err.to_string());
            return ExitCode::FAILURE;
        }
    };

    logging::init(EXECUTABLE_NAME, config.log_json);
    tracing::debug!(config = ?config);

    match run(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: Config) -> anyhow::Result<()> {
    match command {
        Command::Materialize => {
            let deployments = registry::load_deployment_registry(&config)
                .context("failed to load deployment registry")?;
            let report = materializer::materialize_to_file(
                &deployments,
                &config.chains,
                &config.consolidated_registry,
            )?;
            println!(
                "wrote {} entries to {} ({} pairs skipped)",
                report.resolved,
                config.consolidated_registry.display(),
                report.skipped.len(),
            );
        }
        Command::Resolve { target } => {
            let (protocol, chain) = target.or_defaults(&config);
            let reference = registry::load_resolver(&config)
                .context("failed to load subgraph registry")?
                .resolve(protocol, chain)?;
            println!("{}", serde_json::to_string_pretty(&reference)?);
        }
        Command::Query {
            target,
            query,
            query_file,
        } => {
            let query = match (query, query_file) {
                (Some(query), _) => query,
                (None, Some(path)) => fs::read_to_string(&path)
                    .with_context(|| format!("failed to read query file {}", path.display()))?,
                (None, None) => anyhow::bail!("missing query"),
            };
            let (protocol, chain) = target.or_defaults(&config);
            let reference = registry::load_resolver(&config)
                .context("failed to load subgraph registry")?
                .resolve(protocol, chain)?;
            if reference.service_type() == ServiceType::DecentralizedNetwork {
                config.gateway_api_key()?;
            }
            tracing::info!(
                %protocol,
                %chain,
                service_type = %reference.service_type(),
                query_id = %reference.query_id(),
                "querying subgraph"
            );

            let client = subgraph_client::Client::new(http_client(&config)?, config.indexing_endpoints());
            let records = QueryService::new(client, reference).query(&query).await?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Command::Synthesize => {
            let api_key = config.completion_api_key()?.clone();
            let client = completion_client::Client::new(
                http_client(&config)?,
                config.completion.url.clone(),
                api_key,
                config.completion.max_tokens,
            );
            let answer = prompt::synthesize_query(&client).await?;
            println!("{answer}");
        }
    }
    Ok(())
}

impl Target {
    fn or_defaults<'a>(&'a self, config: &'a Config) -> (&'a str, &'a str) {
        (
            self.protocol.as_deref().unwrap_or(&config.default_protocol),
            self.chain.as_deref().unwrap_or(&config.default_chain),
        )
    }
}

fn http_client(config: &Config) -> anyhow::Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = config.http_timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder.build().context("failed to build HTTP client")
}
