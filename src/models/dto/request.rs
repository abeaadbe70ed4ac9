use serde::Deserialize;
use validator::Validate;

use crate::models::domain::LearnerProfile;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GenerateEvaluationRequest {
    #[validate(length(min = 1, max = 200))]
    pub source_id: String,

    #[validate(length(min = 1, max = 200))]
    pub personalization_id: String,

    /// Overrides the stored profile for this personalization.
    #[validate(nested)]
    pub profile: Option<LearnerProfile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationQuery {
    pub personalization_id: Option<String>,
}
