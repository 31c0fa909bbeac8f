//! Icebox Pipeline - experiment generation orchestration
//!
//! Wires the component crates into the end-to-end flow: goal
//! resolution, context enrichment, prompt assembly, single-shot
//! generation, response recovery, mapping, and atomic persistence.
//! Also hosts the lifecycle service that moves persisted experiments
//! through their status machine.

#![warn(unreachable_pub)]

pub mod enricher;
pub mod error;
pub mod lifecycle;
pub mod mapper;
pub mod pipeline;
pub mod resolver;

pub use enricher::{enrich, GoalProfile};
pub use error::{MappingError, PipelineError};
pub use lifecycle::LifecycleService;
pub use mapper::map_candidates;
pub use pipeline::{GenerateRequest, GenerationOutcome, GenerationPipeline};
pub use resolver::resolve_goal;
