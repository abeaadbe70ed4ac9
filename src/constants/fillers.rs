use crate::models::domain::candidate::Category;

/// Low-risk answers used to pad a choice set that ran out of distractors.
pub fn filler_answers(category: Option<Category>) -> &'static [&'static str] {
    match category {
        Some(Category::Noun) => &["Tisch", "Fenster", "Stadt", "Buch", "Garten", "Straße"],
        Some(Category::Verb) => &["machen", "finden", "bringen", "halten", "legen", "stellen"],
        Some(Category::Adjective) => &["klein", "neu", "leise", "hell", "ruhig", "breit"],
        Some(Category::Expression) => &[
            "ab und zu",
            "auf jeden Fall",
            "nach wie vor",
            "im Grunde",
            "vor allem",
        ],
        None => &["keine Angabe", "nicht im Text", "unbekannt", "etwas anderes"],
    }
}

/// Label words for last-resort option text. A target can leak at most some of them.
pub const PLACEHOLDER_LABELS: &[&str] = &["Option", "Antwort", "Variante"];

/// Last-resort option text.
pub fn numbered_placeholder(label: &str, n: usize) -> String {
    format!("{} {}", label, n)
}
