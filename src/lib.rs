//! lectograph - structured documents from recorded speech
//!
//! Segments a lecture recording acoustically, transcribes the segments
//! concurrently, refines boundaries at discourse markers, and reconstructs
//! the logical relations between segments into an immutable document.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod analysis;
pub mod assemble;
pub mod audio;
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod markers;
pub mod model;
pub mod pipeline;
pub mod relations;
pub mod resegment;

// Core data model
pub use model::{
    Document, LogicChain, ParagraphRelation, RelationOrigin, RelationType, Segment, TopicTree,
};

// Pipeline
pub use pipeline::{Pipeline, PipelineConfig};
pub use relations::{ReconstructionOutcome, Reconstructor};
pub use resegment::Resegmenter;

// Collaborator seams
pub use analysis::{DeepAnalyzer, SpeechToText};

// Error handling
pub use error::{ExternalServiceError, LectographError, Result};

// Config
pub use config::Config;
