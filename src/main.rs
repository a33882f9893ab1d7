use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use kubeguide_k8s::{
    AccessError, KubeCluster, RequestGuard, ResourceAccessor, ResourceDescriptor, ResourceId,
    ResourceRegistry, strip_managed_fields, summarize,
};

mod config;
mod connect;
mod render;
mod resolve;

use config::Config;
use connect::{KubeConnector, connect};
use render::{
    ObjectFormat, OutputFormat, contexts_table, resources_table, summaries_table, to_pretty_json,
    to_yaml,
};
use resolve::resolve_resource;

/// Kubeguide - A terminal browser for Kubernetes resources
#[derive(Parser, Debug)]
#[command(name = "kubeguide")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Kubernetes context name (defaults to the current context)
    #[arg(long, global = true)]
    context: Option<String>,

    /// Config file (defaults to ~/.config/kubeguide/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log discovery and request details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List kubeconfig contexts
    Contexts,

    /// List the resource kinds the cluster serves
    Resources {
        /// Only kinds installed by custom resource definitions
        #[arg(long)]
        custom: bool,
    },

    /// List namespace names
    Namespaces,

    /// List objects of a kind
    List {
        /// Kind, as `pods`, `pod`, `widgets.example.io` or `example.io/v1/widgets`
        resource: String,

        #[arg(short, long)]
        namespace: Option<String>,

        /// List across every namespace
        #[arg(short = 'A', long, conflicts_with = "namespace")]
        all_namespaces: bool,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Summary)]
        output: OutputFormat,
    },

    /// Show one object
    Get {
        resource: String,
        name: String,

        #[arg(short, long)]
        namespace: Option<String>,

        #[arg(short, long, value_enum, default_value_t = ObjectFormat::Yaml)]
        output: ObjectFormat,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing for debugging
    let mut filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::WARN.into());
    if args.verbose {
        filter = filter
            .add_directive("kubeguide=debug".parse()?)
            .add_directive("kubeguide_k8s=debug".parse()?);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Run the application
    let result = run(args).await;

    // Handle any errors
    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
        if is_retryable(e) {
            eprintln!("Hint: the cluster may be busy or its resource list changed; retry shortly");
        }
    }

    result
}

async fn run(args: Args) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;

    if let Command::Contexts = args.command {
        let connector = KubeConnector::load()?;
        tracing::debug!(current = ?connector.current_context(), "kubeconfig loaded");
        println!("{}", contexts_table(&connector.contexts()));
        return Ok(());
    }

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let client = connect(args.context.as_deref()).await?;
    let guard = RequestGuard::new(config.request_timeout()).with_cancellation(cancel);
    let registry = Arc::new(
        ResourceRegistry::new(Arc::new(KubeCluster::new(client)))
            .with_ttl(config.cache_ttl())
            .with_guard(guard.clone()),
    );
    let accessor = ResourceAccessor::new(Arc::clone(&registry))
        .with_unmapped_policy(config.access.unmapped_builtins)
        .with_guard(guard);

    match args.command {
        Command::Contexts => {}

        Command::Resources { custom } => {
            let descriptors = if custom {
                registry.list_custom().await?
            } else {
                registry.list_all().await?
            };
            println!("{}", resources_table(&descriptors));
        }

        Command::Namespaces => {
            let namespaces = accessor
                .list_dynamic(&ResourceId::core("v1", "namespaces"), None)
                .await
                .context("Failed to list namespaces")?;
            let mut names: Vec<String> = namespaces
                .into_iter()
                .filter_map(|ns| ns.metadata.name)
                .collect();
            names.sort();
            for name in names {
                println!("{}", name);
            }
        }

        Command::List {
            resource,
            namespace,
            all_namespaces,
            output,
        } => {
            let descriptor = resolve_resource(&registry, &resource).await?;
            let namespace = if all_namespaces {
                None
            } else {
                effective_namespace(&descriptor, namespace, &config, args.context.as_deref())
            };

            let mut objects = accessor
                .list_dynamic(&descriptor.id, namespace.as_deref())
                .await?;
            match output {
                OutputFormat::Summary => {
                    if objects.is_empty() {
                        eprintln!("No {} found", descriptor.id.plural);
                    } else {
                        let summaries: Vec<_> = objects.iter().map(summarize).collect();
                        println!("{}", summaries_table(&summaries));
                    }
                }
                OutputFormat::Json => {
                    objects.iter_mut().for_each(strip_managed_fields);
                    println!("{}", to_pretty_json(&objects)?);
                }
                OutputFormat::Yaml => {
                    objects.iter_mut().for_each(strip_managed_fields);
                    print!("{}", to_yaml(&objects)?);
                }
            }
        }

        Command::Get {
            resource,
            name,
            namespace,
            output,
        } => {
            let descriptor = resolve_resource(&registry, &resource).await?;
            let namespace =
                effective_namespace(&descriptor, namespace, &config, args.context.as_deref());

            let mut object = accessor
                .get_dynamic(&descriptor.id, namespace.as_deref(), &name)
                .await?;
            strip_managed_fields(&mut object);
            match output {
                ObjectFormat::Yaml => print!("{}", to_yaml(&object)?),
                ObjectFormat::Json => println!("{}", to_pretty_json(&object)?),
            }
        }
    }

    Ok(())
}

/// Whether any error in the chain is an access failure worth retrying
fn is_retryable(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<AccessError>())
        .any(AccessError::is_retryable)
}

/// Namespace to send for a kind.
///
/// Cluster-scoped kinds only get one the user typed, so the scope check can
/// reject it. Namespaced kinds fall back to the configured default, then the
/// context's namespace, then `default`. A blank `-n` counts as none.
fn effective_namespace(
    descriptor: &ResourceDescriptor,
    explicit: Option<String>,
    config: &Config,
    context: Option<&str>,
) -> Option<String> {
    let explicit = explicit.filter(|ns| !ns.trim().is_empty());
    if explicit.is_some() || !descriptor.namespaced {
        return explicit;
    }
    config
        .access
        .default_namespace
        .clone()
        .or_else(|| {
            KubeConnector::load()
                .ok()
                .and_then(|connector| connector.context_namespace(context))
        })
        .or_else(|| Some("default".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_namespace_wins() {
        let pods = ResourceDescriptor::builtin(ResourceId::core("v1", "pods"), "Pod", true);
        let mut config = Config::default();
        config.access.default_namespace = Some("team-a".to_string());

        let ns = effective_namespace(&pods, Some("team-b".to_string()), &config, None);
        assert_eq!(ns.as_deref(), Some("team-b"));

        let ns = effective_namespace(&pods, None, &config, None);
        assert_eq!(ns.as_deref(), Some("team-a"));
    }

    #[test]
    fn test_cluster_scoped_kinds_get_no_default() {
        let namespaces =
            ResourceDescriptor::builtin(ResourceId::core("v1", "namespaces"), "Namespace", false);
        let mut config = Config::default();
        config.access.default_namespace = Some("team-a".to_string());

        assert_eq!(effective_namespace(&namespaces, None, &config, None), None);
        assert_eq!(
            effective_namespace(&namespaces, Some("x".to_string()), &config, None).as_deref(),
            Some("x")
        );
    }

    #[test]
    fn test_blank_namespace_falls_back() {
        let pods = ResourceDescriptor::builtin(ResourceId::core("v1", "pods"), "Pod", true);
        let namespaces =
            ResourceDescriptor::builtin(ResourceId::core("v1", "namespaces"), "Namespace", false);
        let mut config = Config::default();
        config.access.default_namespace = Some("team-a".to_string());

        let ns = effective_namespace(&pods, Some(String::new()), &config, None);
        assert_eq!(ns.as_deref(), Some("team-a"));
        let ns = effective_namespace(&pods, Some("  ".to_string()), &config, None);
        assert_eq!(ns.as_deref(), Some("team-a"));
        assert_eq!(
            effective_namespace(&namespaces, Some(String::new()), &config, None),
            None
        );
    }

    #[test]
    fn test_retry_hint_follows_error_chain() {
        let not_found = anyhow::Error::from(AccessError::NotFound(ResourceId::core("v1", "pods")))
            .context("Failed to list pods");
        assert!(is_retryable(&not_found));

        let unsupported =
            anyhow::Error::from(AccessError::UnsupportedKind(ResourceId::core("v1", "pods")));
        assert!(!is_retryable(&unsupported));
        assert!(!is_retryable(&anyhow::anyhow!("bad config")));
    }

    #[test]
    fn test_cli_parses_get_output() {
        let args = Args::try_parse_from(["kubeguide", "get", "pods", "web-0"]).unwrap();
        match args.command {
            Command::Get { output, .. } => assert_eq!(output, ObjectFormat::Yaml),
            other => panic!("unexpected command: {other:?}"),
        }

        let args =
            Args::try_parse_from(["kubeguide", "get", "pods", "web-0", "-o", "json"]).unwrap();
        match args.command {
            Command::Get { output, .. } => assert_eq!(output, ObjectFormat::Json),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parses_list() {
        let args = Args::try_parse_from([
            "kubeguide", "list", "pods", "-n", "team-a", "-o", "json", "--verbose",
        ])
        .unwrap();
        assert!(args.verbose);
        match args.command {
            Command::List {
                resource,
                namespace,
                output,
                all_namespaces,
            } => {
                assert_eq!(resource, "pods");
                assert_eq!(namespace.as_deref(), Some("team-a"));
                assert_eq!(output, OutputFormat::Json);
                assert!(!all_namespaces);
            }
            other => panic!("unexpected command: {other:?}"),
        }

        assert!(Args::try_parse_from(["kubeguide", "list", "pods", "-n", "a", "-A"]).is_err());
    }
}
