//! Workflow execution.
//!
//! A [`Workflow`] is the immutable output of [`crate::WorkflowBuilder::build`]:
//! 1. Stages are held in a valid topological order.
//! 2. [`Workflow::work`] creates a fresh root [`Context`] over the host values.
//! 3. Stages run one after another against that same context.
//! 4. The first stage error aborts the run and is returned, tagged with the
//!    failing stage's name.

use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::context::{Context, HostContext};
use crate::stage::{Stage, StageName};
use crate::EngineError;

/// A validated, sorted set of stages.
pub struct Workflow<N> {
    stages: Vec<Stage<N>>,
    index: HashMap<N, usize>,
}

impl<N: StageName> Workflow<N> {
    /// Wrap stages that are already in execution order.
    pub(crate) fn from_sorted(stages: Vec<Stage<N>>) -> Self {
        let index = stages
            .iter()
            .enumerate()
            .map(|(i, stage)| (stage.name().clone(), i))
            .collect();
        Self { stages, index }
    }

    /// Run every stage against a fresh root context that falls back to `host`.
    ///
    /// # Errors
    /// [`EngineError::StageFailed`] for the first stage whose action fails;
    /// no later stage runs.
    pub fn work(&self, host: &dyn HostContext) -> Result<(), EngineError> {
        let mut ctx = Context::new(host);
        self.run(&mut ctx)
    }

    /// Run every stage against a caller-provided context.
    ///
    /// Passing `ctx.child()` from inside a stage nests this workflow in its
    /// own scope: its writes stay out of the outer workflow's context.
    ///
    /// # Errors
    /// Same as [`Workflow::work`].
    #[instrument(skip_all, fields(run_id = %Uuid::new_v4(), stages = self.stages.len()))]
    pub fn run(&self, ctx: &mut Context<'_>) -> Result<(), EngineError> {
        let started = Instant::now();

        for stage in &self.stages {
            debug!("stage '{}' starting", stage.name());
            let stage_started = Instant::now();

            if let Err(source) = stage.run(ctx) {
                error!("stage '{}' failed: {:#}", stage.name(), source);
                return Err(EngineError::StageFailed {
                    stage: stage.name().to_string(),
                    source,
                });
            }

            info!(
                "stage '{}' succeeded in {:?}",
                stage.name(),
                stage_started.elapsed()
            );
        }

        info!(
            "workflow finished {} stages in {:?}",
            self.stages.len(),
            started.elapsed()
        );
        Ok(())
    }

    /// The stage named `name`, if it is part of this workflow.
    pub fn stage(&self, name: &N) -> Option<&Stage<N>> {
        self.index.get(name).map(|&i| &self.stages[i])
    }

    /// Stages in execution order.
    pub fn stages(&self) -> impl Iterator<Item = &Stage<N>> {
        self.stages.iter()
    }

    /// Stage names in execution order.
    pub fn order(&self) -> Vec<&N> {
        self.stages.iter().map(Stage::name).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl<N: fmt::Debug> fmt::Debug for Workflow<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workflow")
            .field("stages", &self.stages)
            .finish()
    }
}
