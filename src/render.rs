//! Tables, JSON and YAML output for the command line

use anyhow::Result;
use clap::ValueEnum;
use comfy_table::{Table, presets::NOTHING};
use serde::Serialize;

use kubeguide_k8s::{ContextInfo, ObjectSummary, ResourceDescriptor};

/// Output format for object listings
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One line per object
    #[default]
    Summary,
    /// Full objects as a JSON array
    Json,
    /// Full objects as a YAML sequence
    Yaml,
}

/// Output format for a single object
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ObjectFormat {
    #[default]
    Yaml,
    Json,
}

/// Borderless table in the style of kubectl
fn plain_table(headers: Vec<&str>) -> Table {
    let mut table = Table::new();
    // NOTHING drops every border and separator line
    table.load_preset(NOTHING);
    table.set_header(headers);
    for column in table.column_iter_mut() {
        column.set_padding((0, 3));
    }
    table
}

pub fn contexts_table(contexts: &[ContextInfo]) -> Table {
    let mut table = plain_table(vec!["CURRENT", "NAME", "CLUSTER", "USER", "NAMESPACE"]);
    for ctx in contexts {
        table.add_row(vec![
            if ctx.is_current { "*" } else { "" }.to_string(),
            ctx.name.clone(),
            ctx.cluster.clone(),
            ctx.user.clone(),
            ctx.namespace.clone().unwrap_or_default(),
        ]);
    }
    table
}

pub fn resources_table(descriptors: &[ResourceDescriptor]) -> Table {
    let mut table = plain_table(vec!["RESOURCE", "KIND", "SCOPE", "ORIGIN"]);
    for descriptor in descriptors {
        table.add_row(vec![
            descriptor.id.to_string(),
            descriptor.kind.kind.clone(),
            descriptor.scope_label().to_string(),
            descriptor.origin_label().to_string(),
        ]);
    }
    table
}

/// Namespace column only when some object has one
pub fn summaries_table(summaries: &[ObjectSummary]) -> Table {
    let namespaced = summaries.iter().any(|s| s.namespace.is_some());
    let mut headers = vec!["NAME", "KIND", "STATUS"];
    if namespaced {
        headers.insert(0, "NAMESPACE");
    }

    let mut table = plain_table(headers);
    for summary in summaries {
        let mut row = vec![summary.name.clone(), summary.kind.clone(), summary.status.clone()];
        if namespaced {
            row.insert(0, summary.namespace.clone().unwrap_or_default());
        }
        table.add_row(row);
    }
    table
}

pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn to_yaml<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_yaml::to_string(value)?)
}
