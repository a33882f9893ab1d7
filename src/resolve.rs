//! Turning command-line resource names into identity triples

use anyhow::{Result, bail};

use kubeguide_k8s::{ClusterApi, ResourceDescriptor, ResourceId, ResourceRegistry};

/// Resolve `name` to a discovered kind.
///
/// Accepts the triple text form (`v1/pods`, `example.io/v1/widgets`) or a short
/// name (`pods`, `pod`, `widgets.example.io`). A short name served at several
/// versions of one group picks the first version in identity order.
pub async fn resolve_resource<C: ClusterApi>(
    registry: &ResourceRegistry<C>,
    name: &str,
) -> Result<ResourceDescriptor> {
    if name.contains('/') {
        let id: ResourceId = name.parse()?;
        return Ok(registry.get(&id).await?);
    }

    let matches = registry.search(name).await?;
    let Some(first) = matches.first() else {
        bail!("unknown resource type: {}", name);
    };

    let ambiguous = matches
        .iter()
        .any(|d| d.id.group != first.id.group || d.id.plural != first.id.plural);
    if ambiguous {
        let candidates: Vec<String> = matches.iter().map(|d| d.id.to_string()).collect();
        bail!(
            "resource type {} is ambiguous, use one of: {}",
            name,
            candidates.join(", ")
        );
    }

    Ok(first.clone())
}
