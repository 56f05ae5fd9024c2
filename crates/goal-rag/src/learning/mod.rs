//! Learning system for improving answers over time

pub mod knowledge_store;
pub mod feedback;
pub mod answer_cache;

pub use knowledge_store::KnowledgeStore;
pub use feedback::{Feedback, FeedbackType};
pub use answer_cache::{AnswerCache, CachedAnswer, CachedCitation, CacheStats};
