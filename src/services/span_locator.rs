use crate::{
    constants::morphology::REMOVABLE_PREFIXES,
    models::domain::source_text::{word_tokens, SourceText, Span},
};

/// Where a word and its usage sentence were found in the source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Occurrence {
    pub word: Span,
    pub sentence: Span,
}

/// Finds candidate strings verbatim (case and whitespace insensitive) in a source text.
pub struct SpanLocator;

impl SpanLocator {
    /// Locates a word or short phrase anywhere in the source.
    pub fn locate_word(candidate: &str, source: &SourceText) -> Option<Span> {
        let everything = Span::new(0, source.as_str().len());
        Self::locate_word_within(candidate, source, everything)
    }

    /// Locates a word or phrase inside `within`. A leading article or particle in the
    /// candidate may be dropped; the returned span covers only what the source contains.
    pub fn locate_word_within(candidate: &str, source: &SourceText, within: Span) -> Option<Span> {
        let wanted = word_tokens(candidate);
        if wanted.is_empty() {
            return None;
        }

        let spans = source.word_spans(within);
        let lowered: Vec<String> = spans
            .iter()
            .map(|s| source.slice(*s).to_lowercase())
            .collect();

        if let Some(found) = find_token_run(&wanted, &spans, &lowered) {
            return Some(found);
        }

        if wanted.len() > 1 && REMOVABLE_PREFIXES.contains(&wanted[0].as_str()) {
            return find_token_run(&wanted[1..], &spans, &lowered);
        }
        None
    }

    /// Returns the source's own sentence for a usage claim, never the claim itself.
    pub fn locate_sentence(candidate: &str, source: &SourceText) -> Option<Span> {
        Self::matching_sentences(candidate, source).into_iter().next()
    }

    /// All source sentences that match `candidate`, best first: exact matches, then
    /// sentences containing the candidate, then sentences the candidate contains.
    pub fn matching_sentences(candidate: &str, source: &SourceText) -> Vec<Span> {
        let wanted_tokens = word_tokens(candidate);
        if wanted_tokens.is_empty() {
            return Vec::new();
        }
        let wanted = padded(&wanted_tokens);

        let mut exact = Vec::new();
        let mut containing = Vec::new();
        let mut contained = Vec::new();

        for sentence in source.sentences() {
            let sentence_tokens = word_tokens(source.slice(*sentence));
            if sentence_tokens.is_empty() {
                continue;
            }
            let have = padded(&sentence_tokens);

            if have == wanted {
                exact.push(*sentence);
            } else if have.contains(&wanted) {
                containing.push(*sentence);
            } else if wanted.contains(&have) {
                contained.push(*sentence);
            }
        }

        exact.extend(containing);
        exact.extend(contained);
        exact
    }

    /// Locates `word` inside the first source sentence matching `usage` that contains it.
    pub fn locate_occurrence(word: &str, usage: &str, source: &SourceText) -> Option<Occurrence> {
        Self::matching_sentences(usage, source)
            .into_iter()
            .find_map(|sentence| {
                Self::locate_word_within(word, source, sentence)
                    .map(|word| Occurrence { word, sentence })
            })
    }
}

fn padded(tokens: &[String]) -> String {
    format!(" {} ", tokens.join(" "))
}

fn find_token_run(wanted: &[String], spans: &[Span], lowered: &[String]) -> Option<Span> {
    if wanted.is_empty() || wanted.len() > lowered.len() {
        return None;
    }
    lowered
        .windows(wanted.len())
        .position(|window| window == wanted)
        .map(|i| Span::new(spans[i].start, spans[i + wanted.len() - 1].end))
}
