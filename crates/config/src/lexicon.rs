//! Compiled keyword lexicon
//!
//! Built once per company at config load. The frontline classifier must run
//! in low single-digit milliseconds, so everything here is precomputed:
//! lowercase phrase lists, a single compiled filler regex, and a
//! longest-first synonym table.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::runtime::RuntimeConfig;

const BASE_EMERGENCY: &[&str] = &[
    "gas leak",
    "smell gas",
    "carbon monoxide",
    "flooding",
    "flooded",
    "burst pipe",
    "water everywhere",
    "sparking",
    "sparks",
    "smoke",
    "on fire",
    "no heat",
    "no air conditioning",
    "no ac",
    "sewage backup",
    "emergency",
];

const BASE_WRONG_NUMBER: &[&str] = &[
    "wrong number",
    "didn't mean to call",
    "didnt mean to call",
    "who is this",
    "i didn't call",
    "not who i was calling",
];

const BASE_SPAM: &[&str] = &[
    "extended warranty",
    "car warranty",
    "final notice",
    "you've been selected",
    "press 1",
    "press one",
    "free cruise",
    "irs",
    "social security administration",
];

const BASE_BOOKING: &[&str] = &[
    "appointment",
    "schedule",
    "book",
    "come out",
    "send someone",
    "technician",
    "set up a time",
    "get someone out",
];

const BASE_QUESTION: &[&str] = &[
    "how much",
    "what does it cost",
    "do you",
    "can you",
    "what are your hours",
    "are you open",
    "do you service",
    "what's your",
    "warranty",
    "how long",
];

const BASE_CANCEL: &[&str] = &["cancel my appointment", "cancel the appointment", "cancel it"];

const BASE_RESCHEDULE: &[&str] = &["reschedule", "move my appointment", "different day", "different time"];

const BASE_SMALL_TALK: &[&str] = &[
    "hello",
    "hi there",
    "good morning",
    "good afternoon",
    "thank you",
    "thanks",
    "how are you",
];

const BASE_FILLERS: &[&str] = &[
    "um", "uh", "ah", "er", "hmm", "you know", "i mean", "kind of", "sort of",
];

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// Precompiled lexicon for one company
#[derive(Debug)]
pub struct CompiledLexicon {
    emergency: Vec<String>,
    wrong_number: Vec<String>,
    spam: Vec<String>,
    booking: Vec<String>,
    question: Vec<String>,
    cancel: Vec<String>,
    reschedule: Vec<String>,
    small_talk: Vec<String>,
    filler_re: Option<Regex>,
    /// (phrase, canonical) pairs, longest phrase first
    synonyms: Vec<(String, String)>,
}

fn merged(base: &[&str], extra: &[String]) -> Vec<String> {
    let mut out: Vec<String> = base.iter().map(|s| s.to_string()).collect();
    out.extend(extra.iter().map(|s| s.to_lowercase()));
    out
}

impl CompiledLexicon {
    pub fn compile(config: &RuntimeConfig) -> Self {
        let fillers: Vec<String> = if config.filler_words.is_empty() {
            BASE_FILLERS.iter().map(|s| s.to_string()).collect()
        } else {
            config.filler_words.iter().map(|s| s.to_lowercase()).collect()
        };

        let filler_re = if fillers.is_empty() {
            None
        } else {
            let alternation = fillers
                .iter()
                .map(|f| regex::escape(f))
                .collect::<Vec<_>>()
                .join("|");
            Regex::new(&format!(r"\b(?:{})\b", alternation)).ok()
        };

        let mut synonyms: Vec<(String, String)> = config
            .synonyms
            .iter()
            .map(|(phrase, canonical)| (phrase.to_lowercase(), canonical.to_lowercase()))
            .collect();
        synonyms.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        Self {
            emergency: merged(BASE_EMERGENCY, &config.emergency_keywords),
            wrong_number: merged(BASE_WRONG_NUMBER, &[]),
            spam: merged(BASE_SPAM, &config.spam_keywords),
            booking: merged(BASE_BOOKING, &[]),
            question: merged(BASE_QUESTION, &[]),
            cancel: merged(BASE_CANCEL, &[]),
            reschedule: merged(BASE_RESCHEDULE, &[]),
            small_talk: merged(BASE_SMALL_TALK, &[]),
            filler_re,
            synonyms,
        }
    }

    /// Normalize an utterance for classification: lowercase, canonicalize
    /// synonyms, strip fillers, collapse whitespace.
    pub fn clean(&self, text: &str) -> String {
        let mut cleaned = text.to_lowercase();

        for (phrase, canonical) in &self.synonyms {
            if cleaned.contains(phrase.as_str()) {
                cleaned = cleaned.replace(phrase.as_str(), canonical);
            }
        }

        if let Some(ref re) = self.filler_re {
            cleaned = re.replace_all(&cleaned, " ").into_owned();
        }

        WHITESPACE.replace_all(cleaned.trim(), " ").into_owned()
    }

    fn hits(phrases: &[String], text: &str) -> usize {
        phrases.iter().filter(|p| text.contains(p.as_str())).count()
    }

    pub fn emergency_hits(&self, text: &str) -> usize {
        Self::hits(&self.emergency, text)
    }

    pub fn wrong_number_hits(&self, text: &str) -> usize {
        Self::hits(&self.wrong_number, text)
    }

    pub fn spam_hits(&self, text: &str) -> usize {
        Self::hits(&self.spam, text)
    }

    pub fn booking_hits(&self, text: &str) -> usize {
        Self::hits(&self.booking, text)
    }

    pub fn question_hits(&self, text: &str) -> usize {
        Self::hits(&self.question, text)
    }

    pub fn cancel_hits(&self, text: &str) -> usize {
        Self::hits(&self.cancel, text)
    }

    pub fn reschedule_hits(&self, text: &str) -> usize {
        Self::hits(&self.reschedule, text)
    }

    pub fn small_talk_hits(&self, text: &str) -> usize {
        Self::hits(&self.small_talk, text)
    }
}
