//! Dependency diagrams for a built [`Workflow`].
//!
//! [`Workflow::graph`] flattens the workflow into a serializable [`GraphView`]:
//! every stage with its dependencies and description, plus the list of
//! stages hanging off a synthetic start node (those with no dependencies).
//! The view renders to Graphviz DOT, Mermaid or JSON.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use tracing::info;

use crate::stage::StageName;
use crate::workflow::Workflow;
use crate::EngineError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Layout direction of a rendered diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    TopDown,
    LeftRight,
}

/// Tuning knobs for diagram rendering.
#[derive(Debug, Clone)]
pub struct DiagramConfig {
    /// Label of the synthetic node linked to every stage without dependencies.
    pub start_label: String,
    pub direction: Direction,
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            start_label: "Σ graph start".to_string(),
            direction: Direction::TopDown,
        }
    }
}

/// Output format of [`GraphView::render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagramFormat {
    Dot,
    Mermaid,
    Json,
}

impl DiagramFormat {
    /// File extension written by [`Workflow::write_diagram`].
    pub fn extension(self) -> &'static str {
        match self {
            DiagramFormat::Dot => "dot",
            DiagramFormat::Mermaid => "mmd",
            DiagramFormat::Json => "json",
        }
    }
}

impl FromStr for DiagramFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dot" | "graphviz" => Ok(DiagramFormat::Dot),
            "mermaid" | "mmd" => Ok(DiagramFormat::Mermaid),
            "json" => Ok(DiagramFormat::Json),
            other => Err(format!("unknown diagram format '{other}' (expected dot, mermaid or json)")),
        }
    }
}

// ---------------------------------------------------------------------------
// Graph view
// ---------------------------------------------------------------------------

/// One stage as seen by a renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeView {
    pub name: String,
    pub dependencies: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// Renderer-facing snapshot of a workflow's dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphView {
    /// Stages in execution order.
    pub nodes: Vec<NodeView>,
    /// Stages linked from the synthetic start node.
    pub entry: Vec<String>,
}

impl GraphView {
    pub fn render(&self, format: DiagramFormat, config: &DiagramConfig) -> Result<String, EngineError> {
        match format {
            DiagramFormat::Dot => Ok(self.to_dot(config)),
            DiagramFormat::Mermaid => Ok(self.to_mermaid(config)),
            DiagramFormat::Json => Ok(serde_json::to_string_pretty(self)?),
        }
    }

    /// Graphviz DOT; descriptions become node tooltips.
    pub fn to_dot(&self, config: &DiagramConfig) -> String {
        let rankdir = match config.direction {
            Direction::TopDown => "TB",
            Direction::LeftRight => "LR",
        };

        let mut out = String::from("digraph workflow {\n");
        let _ = writeln!(out, "    rankdir={rankdir};");
        let _ = writeln!(
            out,
            "    start [label=\"{}\", shape=circle];",
            dot_escape(&config.start_label)
        );

        for (i, node) in self.nodes.iter().enumerate() {
            let _ = write!(out, "    s{i} [label=\"{}\"", dot_escape(&node.name));
            if !node.description.is_empty() {
                let _ = write!(out, ", tooltip=\"{}\"", dot_escape(&node.description));
            }
            out.push_str("];\n");
        }

        for (from, to) in self.links() {
            let _ = writeln!(out, "    {from} -> {to};");
        }

        out.push_str("}\n");
        out
    }

    /// Mermaid flowchart; descriptions are appended to node labels.
    pub fn to_mermaid(&self, config: &DiagramConfig) -> String {
        let direction = match config.direction {
            Direction::TopDown => "TD",
            Direction::LeftRight => "LR",
        };

        let mut out = format!("flowchart {direction}\n");
        let _ = writeln!(
            out,
            "    start([\"{}\"])",
            mermaid_escape(&config.start_label)
        );

        for (i, node) in self.nodes.iter().enumerate() {
            let label = if node.description.is_empty() {
                mermaid_escape(&node.name)
            } else {
                format!(
                    "{}<br/><small>{}</small>",
                    mermaid_escape(&node.name),
                    mermaid_escape(&node.description)
                )
            };
            let _ = writeln!(out, "    s{i}[\"{label}\"]");
        }

        for (from, to) in self.links() {
            let _ = writeln!(out, "    {from} --> {to}");
        }
        out
    }

    /// Edges as renderer node ids: start links first, then dependency edges.
    fn links(&self) -> Vec<(String, String)> {
        let ids: HashMap<&str, usize> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.name.as_str(), i))
            .collect();

        let mut links: Vec<(String, String)> = self
            .entry
            .iter()
            .filter_map(|name| ids.get(name.as_str()))
            .map(|to| ("start".to_string(), format!("s{to}")))
            .collect();

        let mut seen: HashSet<(usize, usize)> = HashSet::new();
        for (i, node) in self.nodes.iter().enumerate() {
            for dep in &node.dependencies {
                if let Some(&from) = ids.get(dep.as_str()) {
                    if seen.insert((from, i)) {
                        links.push((format!("s{from}"), format!("s{i}")));
                    }
                }
            }
        }
        links
    }
}

fn dot_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn mermaid_escape(s: &str) -> String {
    s.replace('"', "#quot;").replace('\n', "<br/>")
}

// ---------------------------------------------------------------------------
// Workflow integration
// ---------------------------------------------------------------------------

impl<N: StageName> Workflow<N> {
    /// Snapshot of the dependency graph for renderers.
    pub fn graph(&self) -> GraphView {
        let nodes: Vec<NodeView> = self
            .stages()
            .map(|stage| NodeView {
                name: stage.name().to_string(),
                dependencies: stage.dependencies().iter().map(ToString::to_string).collect(),
                description: stage.description().to_string(),
            })
            .collect();

        let entry = nodes
            .iter()
            .filter(|n| n.dependencies.is_empty())
            .map(|n| n.name.clone())
            .collect();

        GraphView { nodes, entry }
    }

    /// Render the dependency diagram to `dir/name`, appending the format's
    /// extension when `name` lacks it. Returns the written path.
    ///
    /// # Errors
    /// [`EngineError::Io`] if the file cannot be written.
    pub fn write_diagram(
        &self,
        dir: impl AsRef<Path>,
        name: &str,
        format: DiagramFormat,
        config: &DiagramConfig,
    ) -> Result<PathBuf, EngineError> {
        let mut path = dir.as_ref().join(name);
        let ext = format.extension();
        if path.extension().and_then(|e| e.to_str()) != Some(ext) {
            let mut file_name = path.file_name().unwrap_or_default().to_os_string();
            file_name.push(".");
            file_name.push(ext);
            path.set_file_name(file_name);
        }

        let rendered = self.graph().render(format, config)?;
        std::fs::write(&path, rendered)?;
        info!("wrote {} stage diagram to {}", self.len(), path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Stage, WorkflowBuilder};

    fn sample() -> Workflow<&'static str> {
        WorkflowBuilder::with_stages([
            Stage::noop("init").with_description("prepare \"inputs\""),
            Stage::noop("create").depends_on(["init"]),
            Stage::noop("audit"),
            Stage::noop("update").depends_on(["create", "audit"]),
        ])
        .unwrap()
        .build()
        .unwrap()
    }

    #[test]
    fn graph_lists_entry_stages_and_dependencies() {
        let graph = sample().graph();
        assert_eq!(graph.nodes.len(), 4);
        assert_eq!(graph.entry, vec!["init", "audit"]);

        let update = graph.nodes.iter().find(|n| n.name == "update").unwrap();
        assert_eq!(update.dependencies, vec!["create", "audit"]);
    }

    #[test]
    fn dot_links_start_node_and_escapes_labels() {
        let dot = sample().graph().to_dot(&DiagramConfig::default());
        assert!(dot.starts_with("digraph workflow {\n    rankdir=TB;"));
        assert!(dot.contains("start [label=\"Σ graph start\", shape=circle];"));
        assert!(dot.contains("s0 [label=\"init\", tooltip=\"prepare \\\"inputs\\\"\"];"));
        assert!(dot.contains("start -> s0;"));
        assert!(dot.contains("s0 -> s2;")); // init -> create
        assert!(dot.trim_end().ends_with('}'));
    }

    #[test]
    fn mermaid_uses_configured_direction() {
        let config = DiagramConfig {
            direction: Direction::LeftRight,
            ..DiagramConfig::default()
        };
        let mermaid = sample().graph().to_mermaid(&config);
        assert!(mermaid.starts_with("flowchart LR\n"));
        assert!(mermaid.contains("prepare #quot;inputs#quot;"));
        assert!(mermaid.contains("start --> s1"));
    }

    #[test]
    fn json_view_omits_empty_descriptions() {
        let json = sample()
            .graph()
            .render(DiagramFormat::Json, &DiagramConfig::default())
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["nodes"][0]["description"], "prepare \"inputs\"");
        assert!(value["nodes"][1].get("description").is_none());
    }

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!("DOT".parse::<DiagramFormat>(), Ok(DiagramFormat::Dot));
        assert_eq!("mmd".parse::<DiagramFormat>(), Ok(DiagramFormat::Mermaid));
        assert!("svg".parse::<DiagramFormat>().is_err());
    }

    #[test]
    fn write_diagram_appends_missing_extension() {
        let dir = tempfile::tempdir().unwrap();

        let workflow = sample();
        let path = workflow
            .write_diagram(dir.path(), "deps", DiagramFormat::Dot, &DiagramConfig::default())
            .unwrap();
        assert_eq!(path, dir.path().join("deps.dot"));
        assert!(std::fs::read_to_string(&path).unwrap().contains("digraph"));

        let path = workflow
            .write_diagram(dir.path(), "deps.mmd", DiagramFormat::Mermaid, &DiagramConfig::default())
            .unwrap();
        assert_eq!(path, dir.path().join("deps.mmd"));
    }

    #[test]
    fn repeated_dependency_draws_one_edge() {
        let workflow = WorkflowBuilder::with_stages([
            Stage::noop("init"),
            Stage::noop("create").depends_on(["init", "init"]),
        ])
        .unwrap()
        .build()
        .unwrap();

        let dot = workflow.graph().to_dot(&DiagramConfig::default());
        assert_eq!(dot.matches("s0 -> s1;").count(), 1);
        let mermaid = workflow.graph().to_mermaid(&DiagramConfig::default());
        assert_eq!(mermaid.matches("s0 --> s1").count(), 1);
    }
}
