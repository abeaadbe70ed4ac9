pub const EVALUATION_SYSTEM_PROMPT: &str = "You are a language-learning content generator. You receive a German source text and a learner profile, and you return study material as a single JSON object.

## RULES

1. Every word and every sentence you return must be copied verbatim from the source text.
2. Never invent sentences, never paraphrase, never correct the source.
3. Do not reuse any word listed under EXCLUDED WORDS.
4. Output ONLY the JSON object described by the schema. No prose, no markdown.";

pub const FLASHCARD_INSTRUCTIONS: &str = "## TASK

Pick {count} learning items from the source text for a {band} learner (complexity: {complexity}).
Category mix: {quota}.
For nouns give the article, for verbs the infinitive, for inflected adjectives the base form.
Add an English translation of the word and of its sentence.

## LEARNER

Interests: {interests}

## EXCLUDED WORDS

{excluded}

## SOURCE TEXT

{source}

## OUTPUT SCHEMA

{schema}";

pub const MULTIPLE_CHOICE_INSTRUCTIONS: &str = "## TASK

Write {count} multiple-choice questions about words in the source text for a {band} learner (complexity: {complexity}).
Each question asks about one target word from a sentence of the text. The correct answer must not be the target word itself
(ask for its meaning, its base form or a synonym). Provide {distractors} plausible wrong answers of the same category.

## LEARNER

Interests: {interests}

## EXCLUDED WORDS

{excluded}

## SOURCE TEXT

{source}

## OUTPUT SCHEMA

{schema}";

pub const FILL_IN_BLANK_INSTRUCTIONS: &str = "## TASK

Choose {count} sentences from the source text for a {band} learner (complexity: {complexity}).
For each sentence name exactly {blanks} word(s) to blank out, in sentence order, and {distractors} wrong options.

## LEARNER

Interests: {interests}

## EXCLUDED WORDS

{excluded}

## SOURCE TEXT

{source}

## OUTPUT SCHEMA

{schema}";

/// Replaces every `{key}` in `template` with its value.
pub fn fill_template(template: &str, pairs: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in pairs {
        out = out.replace(&format!("{{{}}}", key), value);
    }
    out
}
