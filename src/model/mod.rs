//! Data model: segments, relations, chains, and the assembled document.

pub mod chain;
pub mod document;
pub mod relation;
pub mod segment;

pub use chain::LogicChain;
pub use document::{Document, TopicNode, TopicTree};
pub use relation::{ParagraphRelation, RelationOrigin, RelationType};
pub use segment::{AudioSpan, MarkerOccurrence, RawSegment, Segment, SegmentId, TranscribedSegment};
