//! Lookup tables behind the rule-based extractor.
//!
//! These are partial by nature. They cover frequent German patterns and nothing more;
//! a noun whose ending is not listed gets [`DEFAULT_ARTICLE`], which can be wrong.

/// Tokens that may precede a word in a candidate and be dropped when matching it.
pub const REMOVABLE_PREFIXES: &[&str] = &[
    "der", "die", "das", "den", "dem", "des", "ein", "eine", "einen", "einem", "einer", "eines",
    "sich", "zu", "the", "a", "an", "to",
];

/// Determiners. Never nouns themselves; the one right before a noun feeds article inference.
pub const DETERMINERS: &[&str] = &[
    "der", "die", "das", "den", "dem", "des", "ein", "eine", "einen", "einem", "einer", "eines",
    "kein", "keine", "keinen", "keinem", "keiner", "mein", "meine", "meinen", "dein", "deine",
    "sein", "seine", "seinen", "ihr", "ihre", "ihren", "unser", "unsere", "dieser", "diese",
    "dieses", "diesen", "jeder", "jede", "jedes", "im", "am", "vom", "zum", "zur", "beim",
];

/// Capitalised tokens that are never nouns.
pub const NON_NOUNS: &[&str] = &[
    "ich", "du", "er", "sie", "es", "wir", "ihr", "man", "der", "die", "das", "ein", "eine",
    "und", "aber", "oder", "denn", "doch", "dann", "heute", "morgen", "gestern", "hier", "dort",
    "wenn", "weil", "dass", "als", "wie", "was", "wer", "wo", "warum", "auch", "noch", "schon",
    "nicht", "ja", "nein",
];

/// Noun ending → article. Checked in order; longer endings first.
pub const NOUN_SUFFIX_ARTICLES: &[(&str, &str)] = &[
    ("schaft", "die"),
    ("ismus", "der"),
    ("chen", "das"),
    ("lein", "das"),
    ("ment", "das"),
    ("heit", "die"),
    ("keit", "die"),
    ("ling", "der"),
    ("tion", "die"),
    ("sion", "die"),
    ("ung", "die"),
    ("tät", "die"),
    ("tum", "das"),
    ("ium", "das"),
    ("nis", "das"),
    ("ik", "die"),
    ("ur", "die"),
    ("ei", "die"),
    ("ie", "die"),
    ("or", "der"),
    ("um", "das"),
];

/// Used when no suffix rule matches. Feminine is the most frequent gender, nothing more.
pub const DEFAULT_ARTICLE: &str = "die";

/// Inflected verb form → infinitive.
pub const VERB_FORMS: &[(&str, &str)] = &[
    ("läuft", "laufen"),
    ("lief", "laufen"),
    ("geht", "gehen"),
    ("ging", "gehen"),
    ("gehe", "gehen"),
    ("kommt", "kommen"),
    ("kam", "kommen"),
    ("komme", "kommen"),
    ("schläft", "schlafen"),
    ("schlief", "schlafen"),
    ("macht", "machen"),
    ("machte", "machen"),
    ("sagt", "sagen"),
    ("sagte", "sagen"),
    ("gibt", "geben"),
    ("gab", "geben"),
    ("sieht", "sehen"),
    ("sah", "sehen"),
    ("nimmt", "nehmen"),
    ("nahm", "nehmen"),
    ("fährt", "fahren"),
    ("fuhr", "fahren"),
    ("isst", "essen"),
    ("aß", "essen"),
    ("trinkt", "trinken"),
    ("liest", "lesen"),
    ("las", "lesen"),
    ("spricht", "sprechen"),
    ("sprach", "sprechen"),
    ("weiß", "wissen"),
    ("wusste", "wissen"),
    ("steht", "stehen"),
    ("stand", "stehen"),
    ("liegt", "liegen"),
    ("lag", "liegen"),
    ("findet", "finden"),
    ("fand", "finden"),
    ("bleibt", "bleiben"),
    ("blieb", "bleiben"),
    ("heißt", "heißen"),
    ("arbeitet", "arbeiten"),
    ("spielt", "spielen"),
    ("wohnt", "wohnen"),
    ("lernt", "lernen"),
    ("kauft", "kaufen"),
    ("schreibt", "schreiben"),
    ("schrieb", "schreiben"),
    ("hilft", "helfen"),
    ("half", "helfen"),
    ("denkt", "denken"),
    ("dachte", "denken"),
    ("bringt", "bringen"),
    ("brachte", "bringen"),
    ("fliegt", "fliegen"),
    ("singt", "singen"),
    ("wartet", "warten"),
    ("zeigt", "zeigen"),
    ("beginnt", "beginnen"),
    ("begann", "beginnen"),
    ("braucht", "brauchen"),
    ("sucht", "suchen"),
    ("fragt", "fragen"),
    ("antwortet", "antworten"),
    ("erklärt", "erklären"),
    ("versteht", "verstehen"),
    ("verstand", "verstehen"),
];

/// Auxiliaries and modals: recognised, never offered as learning items.
pub const AUXILIARY_FORMS: &[&str] = &[
    "ist", "sind", "bin", "bist", "seid", "war", "waren", "hat", "habe", "hast", "haben", "hatte",
    "hatten", "wird", "werden", "wurde", "wurden", "kann", "können", "muss", "müssen", "will",
    "wollen", "soll", "sollen", "darf", "dürfen", "mag",
];

/// Base adjectives recognised without a suffix rule.
pub const COMMON_ADJECTIVES: &[&str] = &[
    "schnell", "langsam", "groß", "klein", "gut", "schlecht", "neu", "alt", "schön", "lang",
    "kurz", "hoch", "jung", "warm", "kalt", "leicht", "schwer", "wichtig", "laut", "leise",
    "hell", "dunkel", "früh", "spät", "stark", "schwach", "müde", "froh", "traurig", "billig",
    "teuer", "voll", "leer", "rot", "blau", "grün", "gelb", "schwarz", "weiß",
];

/// Derivational endings that mark adjectives.
pub const ADJECTIVE_SUFFIXES: &[&str] = &[
    "lich", "isch", "ig", "bar", "sam", "los", "voll", "haft", "end",
];

/// Inflectional endings stripped to reach an adjective's base form. Longest first.
pub const ADJECTIVE_INFLECTIONS: &[&str] = &["en", "em", "er", "es", "e"];

pub fn lookup_infinitive(form: &str) -> Option<&'static str> {
    VERB_FORMS
        .iter()
        .find(|(inflected, _)| *inflected == form)
        .map(|(_, infinitive)| *infinitive)
}

pub fn article_for_suffix(noun: &str) -> Option<&'static str> {
    let lowered = noun.to_lowercase();
    NOUN_SUFFIX_ARTICLES
        .iter()
        .find(|(suffix, _)| lowered.len() > suffix.len() + 1 && lowered.ends_with(suffix))
        .map(|(_, article)| *article)
}
