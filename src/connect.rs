//! Cluster connection from kubeconfig

use anyhow::{Context, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use tracing::debug;

use kubeguide_k8s::ContextInfo;

/// Kubeconfig contexts and client construction
pub struct KubeConnector {
    kubeconfig: Kubeconfig,
    current_context: Option<String>,
}

impl KubeConnector {
    /// Load the kubeconfig kubectl would use
    pub fn load() -> Result<Self> {
        let kubeconfig =
            Kubeconfig::read().context("Failed to read kubeconfig. Is kubectl configured?")?;
        Ok(Self::from_kubeconfig(kubeconfig))
    }

    pub fn from_kubeconfig(kubeconfig: Kubeconfig) -> Self {
        let current_context = kubeconfig.current_context.clone();
        Self {
            kubeconfig,
            current_context,
        }
    }

    /// Get all available contexts from kubeconfig
    pub fn contexts(&self) -> Vec<ContextInfo> {
        self.kubeconfig
            .contexts
            .iter()
            .map(|ctx| {
                let context = ctx.context.as_ref();
                ContextInfo::new(
                    ctx.name.clone(),
                    context.map(|c| c.cluster.clone()).unwrap_or_default(),
                    context.and_then(|c| c.user.clone()).unwrap_or_default(),
                    context.and_then(|c| c.namespace.clone()),
                    Some(&ctx.name) == self.current_context.as_ref(),
                )
            })
            .collect()
    }

    pub fn current_context(&self) -> Option<&str> {
        self.current_context.as_deref()
    }

    /// Namespace set on `context`, or on the current context
    pub fn context_namespace(&self, context: Option<&str>) -> Option<String> {
        let name = context.or(self.current_context.as_deref())?;
        self.contexts()
            .into_iter()
            .find(|c| c.name == name)
            .and_then(|c| c.namespace)
    }

    /// Create a kube::Client for a specific context
    pub async fn client_for_context(&self, context_name: &str) -> Result<kube::Client> {
        let config = kube::Config::from_custom_kubeconfig(
            self.kubeconfig.clone(),
            &KubeConfigOptions {
                context: Some(context_name.to_string()),
                ..Default::default()
            },
        )
        .await
        .context(format!(
            "Failed to create config for context: {}",
            context_name
        ))?;

        kube::Client::try_from(config).context(format!(
            "Failed to create client for context: {}",
            context_name
        ))
    }
}

/// Client for `context`, or whatever the environment points at when none is
/// given (kubeconfig current context, or the in-cluster service account)
pub async fn connect(context: Option<&str>) -> Result<kube::Client> {
    match context {
        Some(name) => {
            debug!(context = name, "connecting to named context");
            KubeConnector::load()?.client_for_context(name).await
        }
        None => {
            let config = kube::Config::infer()
                .await
                .context("Failed to infer cluster configuration")?;
            kube::Client::try_from(config).context("Failed to create client")
        }
    }
}
