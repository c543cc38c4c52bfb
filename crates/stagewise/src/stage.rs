//! Stage definitions: the named units of work a workflow orders and runs.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use crate::context::Context;

/// Identifier type for stages.
///
/// Anything with equality, hashing and a display form works: integers,
/// strings, or a caller-defined enum.
pub trait StageName: Clone + Eq + Hash + fmt::Display {}

impl<T: Clone + Eq + Hash + fmt::Display> StageName for T {}

/// The function a stage runs. Returning an error aborts the workflow.
pub type Action = Arc<dyn Fn(&mut Context<'_>) -> anyhow::Result<()> + Send + Sync>;

/// A named unit of work with declared predecessors.
///
/// Stages are immutable once built; configure them with the chained
/// builder methods before handing them to a [`crate::WorkflowBuilder`]:
///
/// ```
/// use stagewise::Stage;
///
/// let create = Stage::new("create", |ctx| {
///     ctx.set("create", "done");
///     Ok(())
/// })
/// .depends_on(["init"])
/// .with_description("create the resources");
///
/// assert_eq!(create.dependencies(), &["init"]);
/// ```
#[derive(Clone)]
pub struct Stage<N> {
    name: N,
    dependencies: Vec<N>,
    description: String,
    action: Action,
}

impl<N: StageName> Stage<N> {
    /// A stage with no dependencies and an empty description.
    pub fn new<F>(name: N, action: F) -> Self
    where
        F: Fn(&mut Context<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            name,
            dependencies: Vec::new(),
            description: String::new(),
            action: Arc::new(action),
        }
    }

    /// A stage whose action does nothing; useful for ordering-only graphs.
    pub fn noop(name: N) -> Self {
        Self::new(name, |_| Ok(()))
    }

    /// Append stages that must complete before this one runs.
    pub fn depends_on(mut self, dependencies: impl IntoIterator<Item = N>) -> Self {
        self.dependencies.extend(dependencies);
        self
    }

    /// Set the human-readable description shown in diagrams.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn name(&self) -> &N {
        &self.name
    }

    /// Declared predecessors, in declaration order.
    pub fn dependencies(&self) -> &[N] {
        &self.dependencies
    }

    /// Description, or `""` when none was given.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Invoke the stage's action against `ctx`.
    pub fn run(&self, ctx: &mut Context<'_>) -> anyhow::Result<()> {
        (self.action)(ctx)
    }
}

impl<N: fmt::Debug> fmt::Debug for Stage<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_are_empty() {
        let stage = Stage::noop(1u8);
        assert_eq!(*stage.name(), 1);
        assert!(stage.dependencies().is_empty());
        assert_eq!(stage.description(), "");
    }

    #[test]
    fn dependencies_accumulate_in_order() {
        let stage = Stage::noop("delete")
            .depends_on(["create"])
            .depends_on(vec!["update"]);
        assert_eq!(stage.dependencies(), &["create", "update"]);
    }

    #[test]
    fn run_invokes_the_action() {
        let stage = Stage::new("init", |ctx| {
            ctx.set("init", "success");
            Ok(())
        });
        let mut ctx = Context::new(&());
        stage.run(&mut ctx).unwrap();
        assert_eq!(ctx.get("init").as_deref(), Some(&json!("success")));
    }

    #[test]
    fn action_errors_are_returned() {
        let stage = Stage::new("boom", |_| anyhow::bail!("something broke"));
        let err = stage.run(&mut Context::new(&())).unwrap_err();
        assert_eq!(err.to_string(), "something broke");
    }
}
