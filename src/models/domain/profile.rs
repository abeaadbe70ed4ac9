use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::errors::{AppError, AppResult};

/// Six-level proficiency scale, ordered A1 < A2 < ... < C2. Parsed through `FromStr`, so
/// an unknown band is an `InvalidProfile` wherever it is read from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, JsonSchema)]
pub enum ProficiencyBand {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl ProficiencyBand {
    pub const ALL: [ProficiencyBand; 6] = [
        ProficiencyBand::A1,
        ProficiencyBand::A2,
        ProficiencyBand::B1,
        ProficiencyBand::B2,
        ProficiencyBand::C1,
        ProficiencyBand::C2,
    ];
}

impl fmt::Display for ProficiencyBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProficiencyBand::A1 => "A1",
            ProficiencyBand::A2 => "A2",
            ProficiencyBand::B1 => "B1",
            ProficiencyBand::B2 => "B2",
            ProficiencyBand::C1 => "C1",
            ProficiencyBand::C2 => "C2",
        };
        write!(f, "{}", label)
    }
}

impl FromStr for ProficiencyBand {
    type Err = AppError;

    fn from_str(value: &str) -> AppResult<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "A1" => Ok(ProficiencyBand::A1),
            "A2" => Ok(ProficiencyBand::A2),
            "B1" => Ok(ProficiencyBand::B1),
            "B2" => Ok(ProficiencyBand::B2),
            "C1" => Ok(ProficiencyBand::C1),
            "C2" => Ok(ProficiencyBand::C2),
            other => Err(AppError::InvalidProfile(format!(
                "unknown proficiency band '{}'",
                other
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for ProficiencyBand {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LearningGoal {
    Vocabulary,
    ReadingComprehension,
    Grammar,
    General,
}

impl Default for LearningGoal {
    fn default() -> Self {
        LearningGoal::General
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, Validate, JsonSchema)]
pub struct LearnerProfile {
    pub band: ProficiencyBand,
    #[serde(default)]
    pub goal: LearningGoal,
    #[validate(length(min = 1, max = 5, message = "between 1 and 5 interests are required"))]
    pub interests: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub study_field: Option<String>,
    /// Self-reported confidence in [0, 1].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub confidence: Option<f32>,
}

impl LearnerProfile {
    pub fn new(band: ProficiencyBand, goal: LearningGoal, interests: &[&str]) -> Self {
        LearnerProfile {
            band,
            goal,
            interests: interests.iter().map(|i| i.to_string()).collect(),
            study_field: None,
            confidence: None,
        }
    }

    /// Checks the profile shape; every failure is an `InvalidProfile`.
    pub fn ensure_valid(&self) -> AppResult<()> {
        self.validate()
            .map_err(|e| AppError::InvalidProfile(e.to_string()))?;

        if self.interests.iter().any(|i| i.trim().is_empty()) {
            return Err(AppError::InvalidProfile(
                "interests must not be blank".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_are_ordered() {
        assert!(ProficiencyBand::A1 < ProficiencyBand::A2);
        assert!(ProficiencyBand::B2 < ProficiencyBand::C1);
        let mut sorted = ProficiencyBand::ALL.to_vec();
        sorted.sort();
        assert_eq!(sorted, ProficiencyBand::ALL.to_vec());
    }

    #[test]
    fn band_deserializes_through_the_parser() {
        let band: ProficiencyBand = serde_json::from_str("\"c1\"").unwrap();
        assert_eq!(band, ProficiencyBand::C1);
        assert_eq!(serde_json::to_string(&band).unwrap(), "\"C1\"");

        let err = serde_json::from_str::<LearnerProfile>(r#"{"band": "D1", "interests": ["Sport"]}"#)
            .unwrap_err();
        assert!(err.to_string().contains("unknown proficiency band 'D1'"));
    }

    #[test]
    fn band_parsing_rejects_unknown_values() {
        assert_eq!("b2".parse::<ProficiencyBand>().unwrap(), ProficiencyBand::B2);
        let err = "D1".parse::<ProficiencyBand>().unwrap_err();
        assert!(matches!(err, AppError::InvalidProfile(_)));
    }

    #[test]
    fn profile_requires_one_to_five_interests() {
        let mut profile = LearnerProfile::new(ProficiencyBand::A1, LearningGoal::General, &[]);
        assert!(matches!(
            profile.ensure_valid(),
            Err(AppError::InvalidProfile(_))
        ));

        profile.interests = vec!["a", "b", "c", "d", "e", "f"]
            .into_iter()
            .map(String::from)
            .collect();
        assert!(profile.ensure_valid().is_err());

        profile.interests.truncate(3);
        assert!(profile.ensure_valid().is_ok());
    }

    #[test]
    fn profile_rejects_out_of_range_confidence() {
        let mut profile =
            LearnerProfile::new(ProficiencyBand::B1, LearningGoal::Grammar, &["sport"]);
        profile.confidence = Some(1.5);
        assert!(profile.ensure_valid().is_err());
    }

    #[test]
    fn goal_uses_snake_case_on_the_wire() {
        let json = serde_json::to_string(&LearningGoal::ReadingComprehension).unwrap();
        assert_eq!(json, "\"reading_comprehension\"");
    }
}
