//! `stagewise` crate: named stages, dependency validation, and sequential execution.
//!
//! Build a [`Workflow`] from [`Stage`]s with a [`WorkflowBuilder`]; the builder
//! rejects duplicate names, dangling dependencies and cycles before anything
//! runs. [`Workflow::work`] then runs the stages in dependency order, sharing
//! one scoped [`Context`] between them and stopping at the first failure.
//!
//! ```
//! use stagewise::{Stage, WorkflowBuilder};
//!
//! let workflow = WorkflowBuilder::with_stages([
//!     Stage::new("init", |ctx| {
//!         ctx.set("init", "success");
//!         Ok(())
//!     }),
//!     Stage::new("create", |ctx| {
//!         anyhow::ensure!(ctx.contains("init"), "init did not run");
//!         Ok(())
//!     })
//!     .depends_on(["init"]),
//! ])?
//! .build()?;
//!
//! workflow.work(&())?;
//! # Ok::<(), stagewise::EngineError>(())
//! ```

pub mod builder;
pub mod context;
pub mod error;
pub mod mock;
pub mod render;
pub mod sort;
pub mod stage;
pub mod workflow;

pub use builder::WorkflowBuilder;
pub use context::{Context, HostContext};
pub use error::{EngineError, Result};
pub use render::{DiagramConfig, DiagramFormat, Direction, GraphView, NodeView};
pub use sort::{topological_sort, Adjacency, Cycle};
pub use stage::{Action, Stage, StageName};
pub use workflow::Workflow;
