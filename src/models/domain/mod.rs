pub mod candidate;
pub mod choice_set;
pub mod evaluation;
pub mod generation;
pub mod profile;
pub mod quality;
pub mod source_document;
pub mod source_text;
pub use candidate::{CandidateItem, Category, ItemOrigin, ValidatedItem};
pub use choice_set::{ChoiceSet, WordBank};
pub use evaluation::{
    BlankQuestion, EvaluationDocument, EvaluationKey, Flashcard, MultipleChoiceQuestion, Phase,
};
pub use generation::{CategoryQuota, ComplexityTier, GenerationParameters};
pub use profile::{LearnerProfile, LearningGoal, ProficiencyBand};
pub use quality::QualityWarning;
pub use source_document::SourceDocument;
pub use source_text::{SourceText, Span};
