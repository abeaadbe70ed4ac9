use serde::Serialize;

use crate::models::domain::EvaluationDocument;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
    pub message: String,
}

pub type GenerateEvaluationResponse = ApiResponse<EvaluationDocument>;
