//! One run: sources, collection, filtering, analysis, rendering.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use ingest::client::{Disconnected, DockerOps, SshDocker};
use ingest::collect::{Collection, Collector};
use ingest::deadline::Deadline;
use ingest::docker::DockerClient;
use ingest::filter::FilterPlan;
use ingest::parser::Normalizer;
use ingest::record::Window;
use ingest::source::remote::expand_tilde;
use ingest::source::{
    DockerSource, FetchHints, LocalJournal, LogSource, RemoteJournal, SshCredential, SshTarget,
};

use crate::analysis::context::load_system_info;
use crate::analysis::{AnalysisContext, ComparisonReport, Orchestrator};
use crate::cli::Cli;
use crate::config::InsightConfig;
use crate::provider::{Credentials, ProviderKind, ProviderRegistry};
use crate::render::{self, RenderOptions, RunReport};

/// Sources selected by the flags. `lookup` resolves `--password-env`.
pub fn build_sources<F>(cli: &Cli, config: &InsightConfig, lookup: F) -> Result<Vec<Box<dyn LogSource>>>
where
    F: Fn(&str) -> Option<String>,
{
    let mut sources: Vec<Box<dyn LogSource>> = Vec::new();

    if cli.wants_local() {
        sources.push(Box::new(LocalJournal::detect()));
    }

    let mut remote = None;
    if let Some(host) = &cli.host {
        let credential = match (&cli.key, &cli.password_env) {
            (Some(key), _) => SshCredential::KeyFile(expand_tilde(key)),
            (None, Some(var)) => {
                let password = lookup(var)
                    .filter(|p| !p.is_empty())
                    .with_context(|| format!("--password-env: environment variable {} is not set", var))?;
                SshCredential::Password(password)
            }
            (None, None) => SshCredential::Agent,
        };
        let mut target = SshTarget::new(host.clone())
            .with_port(cli.port)
            .with_credential(credential);
        if let Some(user) = &cli.user {
            target = target.with_user(user.clone());
        }
        sources.push(Box::new(RemoteJournal::new(target.clone(), config.ssh.clone())));
        remote = Some(target);
    }

    if cli.docker {
        let source = match remote {
            Some(target) => {
                let host = target.host.clone();
                let ops = SshDocker::new(target, config.ssh.clone(), config.docker.socket.clone());
                DockerSource::new(Arc::new(ops), config.docker.clone()).on_host(host)
            }
            None => DockerSource::new(local_docker(&config.docker.socket), config.docker.clone()),
        };
        sources.push(Box::new(source));
    }

    Ok(sources)
}

/// A daemon that cannot be set up still yields a source; it reports itself
/// unavailable at fetch time while the other sources run.
fn local_docker(socket: &str) -> Arc<dyn DockerOps> {
    match DockerClient::new(socket) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::warn!(socket = %socket, error = %e, "Docker client setup failed");
            Arc::new(Disconnected::new(format!("Failed to connect to Docker at '{}': {}", socket, e)))
        }
    }
}

/// Resolve keys, then fan the selected records out to every provider.
async fn analyze(
    cli: &Cli,
    config: &InsightConfig,
    providers: &[ProviderKind],
    collection: &Collection,
    selected: &[ingest::record::Record],
    window: Window,
    deadline: &Deadline,
) -> Result<ComparisonReport> {
    let explicit = match (&cli.api_key, providers) {
        (None, _) => None,
        (Some(key), [only]) => Some((only, key.expose())),
        (Some(_), _) => bail!("--api-key needs exactly one provider (got {})", providers.len()),
    };
    let credentials =
        Credentials::resolve(providers, explicit, &config.api_keys, |var| std::env::var(var).ok());

    let mut context = AnalysisContext::new(window).with_container_stats(collection.container_stats.clone());
    if let Some(path) = &cli.system_info {
        context = context.with_system_info(load_system_info(path)?);
    }

    let registry = ProviderRegistry::from_config(&config.providers)
        .map_err(|e| anyhow::anyhow!("Failed to set up AI providers: {}", e))?;
    let orchestrator = Orchestrator::new(
        registry,
        credentials,
        config.analysis.retry_policy(),
        config.analysis.prompt_builder(),
    );

    orchestrator
        .analyze(selected, providers, &context, deadline)
        .await
        .map_err(|e| anyhow::anyhow!("{} ({})", e, e.kind()))
}

pub async fn run(cli: Cli, config: InsightConfig, deadline: Deadline) -> Result<()> {
    let window = Window::last_hours(cli.hours, Utc::now()).context("Invalid --time")?;
    let severities = cli.severities().map_err(anyhow::Error::msg).context("Invalid severity filter")?;
    let plan = FilterPlan::from_config(&config.filter, severities, &cli.exclude, cli.summary_mode())
        .context("Invalid exclusion pattern")?;
    let normalizer =
        Normalizer::from_config(window, &config.normalizer).context("Invalid volatile rule")?;
    let providers = cli.providers();

    let sources = build_sources(&cli, &config, |var| std::env::var(var).ok())?;
    let collector = Collector::new(sources, normalizer);
    let source_names: Vec<String> = collector.sources().collect();
    tracing::info!(sources = ?source_names, start = %window.start, end = %window.end, "collecting logs");

    let hints = FetchHints { container: cli.container.clone(), tail_lines: None };
    let collection = collector
        .collect(window, &hints, &deadline)
        .await
        .map_err(|e| anyhow::anyhow!("{} ({})", e, e.kind()))?;
    for warning in &collection.warnings {
        tracing::warn!(source = %warning.source, kind = %warning.kind, "{}", warning.message);
    }

    let selected = plan.select(collection.records.clone());
    let records = plan.condense(selected.clone());
    let filter = plan.exclusion_counts();
    tracing::info!(
        selected = selected.len(),
        excluded = filter.excluded,
        groups = records.len(),
        "records filtered"
    );

    let analysis = if providers.is_empty() {
        ComparisonReport::default()
    } else {
        analyze(&cli, &config, &providers, &collection, &selected, window, &deadline).await?
    };

    let report = RunReport {
        window,
        sources: source_names,
        records,
        warnings: collection.warnings,
        container_stats: collection.container_stats,
        stats: collection.stats,
        filter,
        analysis,
    };
    let options = RenderOptions {
        json: cli.json,
        color: config.output.color && cli.output.is_none(),
        full: config.output.full,
    };
    let content = render::render(&report, &options)?;
    render::write_output(&content, cli.output.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["insight"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    fn names(sources: &[Box<dyn LogSource>]) -> Vec<String> {
        sources.iter().map(|s| s.name()).collect()
    }

    #[test]
    fn test_local_by_default() {
        let sources = build_sources(&cli(&[]), &InsightConfig::default(), |_| None).unwrap();
        assert_eq!(sources.len(), 1);
        assert!(names(&sources)[0].starts_with("local journal"));
    }

    #[test]
    fn test_host_and_docker_together() {
        let sources = build_sources(
            &cli(&["--host", "pve1", "--port", "2222", "--docker"]),
            &InsightConfig::default(),
            |_| None,
        )
        .unwrap();
        let names = names(&sources);
        assert_eq!(names.len(), 2, "no local source when --host or --docker is given");
        assert_eq!(names[0], "remote journal (pve1:2222)");
        assert_eq!(names[1], "docker (pve1)", "containers are read on the remote host");
    }

    #[tokio::test]
    async fn test_docker_setup_failure_is_reported_at_fetch() {
        let args = cli(&["--docker", "--docker-socket", "/nonexistent/insight.sock"]);
        let mut config = InsightConfig::default();
        args.apply_overrides(&mut config);
        let sources = build_sources(&args, &config, |_| None).expect("setup failure does not abort the run");
        assert_eq!(sources.len(), 1);

        let window = Window::last_hours(1.0, Utc::now()).unwrap();
        let err = sources[0]
            .fetch(window, &FetchHints::default(), &Deadline::unbounded())
            .await
            .err()
            .expect("no daemon behind the socket");
        assert_eq!(err.kind(), ingest::error::ErrorKind::SourceUnavailable);
    }

    #[test]
    fn test_password_env_must_be_set() {
        let args = cli(&["--host", "pve1", "--password-env", "PVE_PASSWORD"]);
        let err = build_sources(&args, &InsightConfig::default(), |_| None).err().unwrap();
        assert!(err.to_string().contains("PVE_PASSWORD"), "got {}", err);

        let ok = build_sources(&args, &InsightConfig::default(), |_| Some("hunter2".into()));
        assert!(ok.is_ok());
    }
}
