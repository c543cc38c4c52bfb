//! Stage manifests: JSON descriptions of a workflow's shape.
//!
//! A manifest carries names, dependencies and descriptions only. The CLI
//! turns each entry into a stage whose action just logs, which is enough to
//! validate, render and dry-run the ordering.

use std::path::Path;

use anyhow::Context as _;
use serde::Deserialize;
use tracing::info;

use stagewise::{EngineError, Stage, Workflow, WorkflowBuilder};

#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub name: Option<String>,
    pub stages: Vec<StageEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StageEntry {
    pub name: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub description: String,
    /// Context keys that must be visible when the stage runs, either host
    /// values or the names of stages that already ran.
    #[serde(default)]
    pub requires: Vec<String>,
}

impl Manifest {
    /// Read and parse a manifest file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read manifest {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid manifest {}", path.display()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Display name: the manifest's own name, or `"workflow"`.
    pub fn title(&self) -> &str {
        self.name.as_deref().unwrap_or("workflow")
    }

    /// Build a workflow whose stages check their required keys, log their
    /// name and mark it done in the context.
    pub fn into_workflow(self) -> Result<Workflow<String>, EngineError> {
        let stages = self.stages.into_iter().map(|entry| {
            let label = entry.name.clone();
            let requires = entry.requires;
            Stage::new(entry.name, move |ctx| {
                info!("running stage '{}' (scope depth {})", label, ctx.depth());
                for key in &requires {
                    anyhow::ensure!(ctx.contains(key), "missing required value '{key}'");
                }
                ctx.set(label.clone(), "done");
                Ok(())
            })
            .depends_on(entry.depends_on)
            .with_description(entry.description)
        });

        WorkflowBuilder::with_stages(stages)?.build()
    }
}

/// Parse a `key=value` pair; the value is read as JSON when it parses, else as a string.
pub fn parse_host_value(pair: &str) -> Result<(String, serde_json::Value), String> {
    let (key, raw) = pair
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{pair}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{pair}'"));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DEPLOY: &str = r#"{
        "name": "deploy",
        "stages": [
            { "name": "delete", "depends_on": ["update"] },
            { "name": "init", "description": "bootstrap" },
            { "name": "create", "depends_on": ["init"] },
            { "name": "update", "depends_on": ["create"] }
        ]
    }"#;

    #[test]
    fn manifest_builds_sorted_workflow() {
        let manifest = Manifest::parse(DEPLOY).unwrap();
        assert_eq!(manifest.title(), "deploy");

        let workflow = manifest.into_workflow().unwrap();
        let order: Vec<&str> = workflow.order().into_iter().map(String::as_str).collect();
        assert_eq!(order, vec!["init", "create", "update", "delete"]);
        assert_eq!(
            workflow.stage(&"init".to_string()).map(|s| s.description()),
            Some("bootstrap")
        );

        workflow.work(&()).unwrap();
    }

    #[test]
    fn manifest_errors_surface_as_engine_errors() {
        let manifest = Manifest::parse(
            r#"{ "stages": [ { "name": "a", "depends_on": ["missing"] } ] }"#,
        )
        .unwrap();
        assert_eq!(manifest.title(), "workflow");

        let err = manifest.into_workflow().unwrap_err();
        assert_eq!(err.code(), 10003);
    }

    #[test]
    fn required_keys_come_from_host_or_upstream_stages() {
        let manifest = Manifest::parse(
            r#"{ "stages": [
                { "name": "fetch", "requires": ["region"] },
                { "name": "deploy", "depends_on": ["fetch"], "requires": ["fetch"] }
            ] }"#,
        )
        .unwrap();
        let workflow = manifest.into_workflow().unwrap();

        let err = workflow.work(&()).unwrap_err();
        assert_eq!(err.failed_stage(), Some("fetch"));

        let host: std::collections::HashMap<String, serde_json::Value> =
            [("region".to_string(), json!("eu"))].into();
        workflow.work(&host).unwrap();
    }

    #[test]
    fn malformed_manifest_is_rejected() {
        assert!(Manifest::parse(r#"{ "stages": [ { "depends_on": [] } ] }"#).is_err());
    }

    #[test]
    fn host_values_parse_as_json_or_string() {
        assert_eq!(parse_host_value("retries=3").unwrap(), ("retries".into(), json!(3)));
        assert_eq!(parse_host_value("env=prod").unwrap(), ("env".into(), json!("prod")));
        assert_eq!(parse_host_value("flag=true").unwrap().1, json!(true));
        assert!(parse_host_value("novalue").is_err());
        assert!(parse_host_value("=x").is_err());
    }
}
