//! Workflow construction and validation. Run this before executing anything.
//!
//! Rules enforced:
//! 1. Stage names must be unique (checked at registration).
//! 2. Every dependency must name a registered stage.
//! 3. The dependency graph must be acyclic (topological sort must succeed).
//!
//! A successful [`WorkflowBuilder::build`] yields a [`Workflow`] whose stages
//! are already in a valid execution order.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::sort::{topological_sort, Adjacency};
use crate::stage::{Stage, StageName};
use crate::workflow::Workflow;
use crate::EngineError;

/// Accumulates stages by name and compiles them into a [`Workflow`].
pub struct WorkflowBuilder<N> {
    stages: HashMap<N, Stage<N>>,
    /// Registration order, so builds are reproducible.
    order: Vec<N>,
}

impl<N: StageName> Default for WorkflowBuilder<N> {
    fn default() -> Self {
        Self {
            stages: HashMap::new(),
            order: Vec::new(),
        }
    }
}

impl<N: StageName> WorkflowBuilder<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder pre-loaded with `stages`.
    ///
    /// # Errors
    /// [`EngineError::DuplicateStage`] on the first repeated name.
    pub fn with_stages(stages: impl IntoIterator<Item = Stage<N>>) -> Result<Self, EngineError> {
        let mut builder = Self::new();
        for stage in stages {
            builder.add_stage(stage)?;
        }
        Ok(builder)
    }

    /// Register one stage. A rejected stage leaves earlier registrations intact.
    ///
    /// # Errors
    /// [`EngineError::DuplicateStage`] if the name is already registered.
    pub fn add_stage(&mut self, stage: Stage<N>) -> Result<(), EngineError> {
        if self.stages.contains_key(stage.name()) {
            return Err(EngineError::DuplicateStage(stage.name().to_string()));
        }
        self.order.push(stage.name().clone());
        self.stages.insert(stage.name().clone(), stage);
        Ok(())
    }

    /// Number of registered stages.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Validate the dependency graph and produce the sorted workflow.
    ///
    /// # Errors
    /// - [`EngineError::UnknownDependency`] if a stage depends on an unregistered name.
    /// - [`EngineError::CircularDependency`] if the graph contains a cycle.
    pub fn build(mut self) -> Result<Workflow<N>, EngineError> {
        // -----------------------------------------------------------------------
        // 1. Resolve dependency names and build dependency -> dependent edges
        // -----------------------------------------------------------------------
        let mut edges: Adjacency<N> = Adjacency::new();
        for name in &self.order {
            edges.add_node(name.clone());
        }

        for name in &self.order {
            let stage = &self.stages[name];
            for dep in stage.dependencies() {
                if !self.stages.contains_key(dep) {
                    return Err(EngineError::UnknownDependency {
                        stage: name.to_string(),
                        dependency: dep.to_string(),
                    });
                }
                edges.add_edge(dep.clone(), name.clone());
            }
        }

        // -----------------------------------------------------------------------
        // 2. Topological sort (Kahn's algorithm)
        // -----------------------------------------------------------------------
        let sorted = topological_sort(&edges).map_err(|cycle| {
            let cycle: Vec<String> = cycle.witness.iter().map(ToString::to_string).collect();
            warn!("rejecting workflow, dependency cycle: {}", cycle.join(" -> "));
            EngineError::CircularDependency { cycle }
        })?;

        debug!(
            "workflow validated, {} stages in order: {}",
            sorted.len(),
            sorted.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
        );

        // -----------------------------------------------------------------------
        // 3. Materialize the stage sequence in sorted order
        // -----------------------------------------------------------------------
        let stages = sorted
            .iter()
            .filter_map(|name| self.stages.remove(name))
            .collect();

        Ok(Workflow::from_sorted(stages))
    }
}
