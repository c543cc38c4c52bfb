//! `Recorder`: a test double that builds stage actions and logs which ran.
//!
//! Useful in unit and integration tests where the ordering of stages matters
//! more than what they do.

use std::sync::{Arc, Mutex, PoisonError};

use crate::stage::{Stage, StageName};

/// Behaviour injected into a recorded stage at construction time.
#[derive(Debug, Clone)]
pub enum MockBehaviour {
    /// Succeed without touching the context.
    Succeed,
    /// Succeed after writing `true` under the stage's own name.
    MarkContext,
    /// Fail with the given message.
    Fail(String),
}

/// Shared log of stage executions, in call order.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A stage that records its name and then behaves as `behaviour` says.
    pub fn stage<N: StageName>(&self, name: N, behaviour: MockBehaviour) -> Stage<N> {
        let calls = Arc::clone(&self.calls);
        let label = name.to_string();

        Stage::new(name, move |ctx| {
            calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(label.clone());

            match &behaviour {
                MockBehaviour::Succeed => Ok(()),
                MockBehaviour::MarkContext => {
                    ctx.set(label.clone(), true);
                    Ok(())
                }
                MockBehaviour::Fail(msg) => Err(anyhow::anyhow!("{msg}")),
            }
        })
    }

    /// Shorthand for a stage that always succeeds.
    pub fn succeeding<N: StageName>(&self, name: N) -> Stage<N> {
        self.stage(name, MockBehaviour::Succeed)
    }

    /// Shorthand for a stage that always fails with `msg`.
    pub fn failing<N: StageName>(&self, name: N, msg: impl Into<String>) -> Stage<N> {
        self.stage(name, MockBehaviour::Fail(msg.into()))
    }

    /// Names of the stages run so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of times a stage called `name` has run.
    pub fn call_count(&self, name: &str) -> usize {
        self.calls().iter().filter(|c| *c == name).count()
    }
}
