use crate::{
    errors::AppResult,
    models::domain::{
        candidate::Category,
        generation::{CategoryQuota, ComplexityTier, GenerationParameters},
        profile::{LearnerProfile, LearningGoal, ProficiencyBand},
    },
};

const LOW_CONFIDENCE: f32 = 0.35;
const HIGH_CONFIDENCE: f32 = 0.8;

pub struct LevelConfigResolver;

impl LevelConfigResolver {
    /// Validates the profile and derives its generation parameters.
    pub fn resolve(profile: &LearnerProfile) -> AppResult<GenerationParameters> {
        profile.ensure_valid()?;
        Ok(Self::parameters_for(
            profile.band,
            profile.goal,
            profile.confidence,
        ))
    }

    pub fn parameters_for(
        band: ProficiencyBand,
        goal: LearningGoal,
        confidence: Option<f32>,
    ) -> GenerationParameters {
        let (choice_count, blank_count, complexity) = match band {
            ProficiencyBand::A1 | ProficiencyBand::A2 => (3, 1, ComplexityTier::Basic),
            ProficiencyBand::B1 | ProficiencyBand::B2 => (4, 2, ComplexityTier::Intermediate),
            ProficiencyBand::C1 | ProficiencyBand::C2 => (5, 3, ComplexityTier::Advanced),
        };

        let base_items: usize = match band {
            ProficiencyBand::A1 => 4,
            ProficiencyBand::A2 => 5,
            ProficiencyBand::B1 | ProficiencyBand::B2 => 6,
            ProficiencyBand::C1 => 7,
            ProficiencyBand::C2 => 8,
        };
        let item_count_per_phase = match confidence {
            Some(c) if c < LOW_CONFIDENCE => base_items.saturating_sub(1).max(1),
            Some(c) if c > HIGH_CONFIDENCE => base_items + 1,
            _ => base_items,
        };

        let max_sentence_words = match complexity {
            ComplexityTier::Basic => 12,
            ComplexityTier::Intermediate => 20,
            ComplexityTier::Advanced => 30,
        };

        GenerationParameters {
            choice_count,
            blank_count,
            item_count_per_phase,
            complexity,
            max_sentence_words,
            quota: quota_for(goal, item_count_per_phase),
        }
    }
}

fn quota_for(goal: LearningGoal, total: usize) -> CategoryQuota {
    let weights: &[(Category, usize)] = match goal {
        LearningGoal::Vocabulary => &[
            (Category::Noun, 2),
            (Category::Verb, 1),
            (Category::Adjective, 1),
        ],
        LearningGoal::Grammar => &[
            (Category::Verb, 2),
            (Category::Noun, 1),
            (Category::Adjective, 1),
        ],
        LearningGoal::ReadingComprehension => &[
            (Category::Expression, 1),
            (Category::Noun, 1),
            (Category::Verb, 1),
            (Category::Adjective, 1),
        ],
        LearningGoal::General => &[
            (Category::Noun, 4),
            (Category::Verb, 3),
            (Category::Adjective, 3),
        ],
    };
    split_by_weight(total, weights)
}

/// Floor-divides `total` by weight, then hands out the remainder in table order.
fn split_by_weight(total: usize, weights: &[(Category, usize)]) -> CategoryQuota {
    let weight_sum: usize = weights.iter().map(|(_, w)| w).sum();
    let mut counts: Vec<(Category, usize)> = weights
        .iter()
        .map(|(category, w)| (*category, total * w / weight_sum.max(1)))
        .collect();

    let mut assigned: usize = counts.iter().map(|(_, n)| n).sum();
    let mut i = 0;
    while assigned < total && !counts.is_empty() {
        let slot = i % counts.len();
        counts[slot].1 += 1;
        assigned += 1;
        i += 1;
    }
    CategoryQuota::new(&counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;

    #[test]
    fn band_groups_follow_the_table() {
        let a = LevelConfigResolver::parameters_for(ProficiencyBand::A2, LearningGoal::General, None);
        let b = LevelConfigResolver::parameters_for(ProficiencyBand::B1, LearningGoal::General, None);
        let c = LevelConfigResolver::parameters_for(ProficiencyBand::C2, LearningGoal::General, None);

        assert_eq!((a.choice_count, a.blank_count), (3, 1));
        assert_eq!((b.choice_count, b.blank_count), (4, 2));
        assert_eq!((c.choice_count, c.blank_count), (5, 3));
    }

    #[test]
    fn counts_are_non_decreasing_in_band() {
        let params: Vec<GenerationParameters> = ProficiencyBand::ALL
            .iter()
            .map(|b| LevelConfigResolver::parameters_for(*b, LearningGoal::Vocabulary, None))
            .collect();

        for pair in params.windows(2) {
            assert!(pair[0].choice_count <= pair[1].choice_count);
            assert!(pair[0].blank_count <= pair[1].blank_count);
            assert!(pair[0].blank_count < pair[0].choice_count);
        }
    }

    #[test]
    fn quota_adds_up_to_item_count() {
        for goal in [
            LearningGoal::Vocabulary,
            LearningGoal::Grammar,
            LearningGoal::ReadingComprehension,
            LearningGoal::General,
        ] {
            let p = LevelConfigResolver::parameters_for(ProficiencyBand::B2, goal, None);
            assert_eq!(p.quota.total(), p.item_count_per_phase);
        }
    }

    #[test]
    fn goal_shifts_the_category_mix() {
        let vocab =
            LevelConfigResolver::parameters_for(ProficiencyBand::B1, LearningGoal::Vocabulary, None);
        assert_eq!(vocab.quota.get(Category::Noun), 4);
        assert_eq!(vocab.quota.get(Category::Verb), 1);

        let grammar =
            LevelConfigResolver::parameters_for(ProficiencyBand::B1, LearningGoal::Grammar, None);
        assert!(grammar.quota.get(Category::Verb) > grammar.quota.get(Category::Noun));

        let reading = LevelConfigResolver::parameters_for(
            ProficiencyBand::B1,
            LearningGoal::ReadingComprehension,
            None,
        );
        assert!(reading.quota.get(Category::Expression) >= 1);
    }

    #[test]
    fn confidence_nudges_item_count() {
        let low = LevelConfigResolver::parameters_for(ProficiencyBand::A1, LearningGoal::General, Some(0.1));
        let high = LevelConfigResolver::parameters_for(ProficiencyBand::A1, LearningGoal::General, Some(0.9));
        assert_eq!(low.item_count_per_phase, 3);
        assert_eq!(high.item_count_per_phase, 5);
    }

    #[test]
    fn resolve_rejects_invalid_profiles() {
        let profile = LearnerProfile::new(ProficiencyBand::B1, LearningGoal::General, &[]);
        assert!(matches!(
            LevelConfigResolver::resolve(&profile),
            Err(AppError::InvalidProfile(_))
        ));
    }
}
