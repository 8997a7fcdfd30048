//! Frontline intent classifier
//!
//! Pure, synchronous, no network calls; runs on every utterance before the
//! model is consulted so that emergencies, spam and wrong numbers are
//! detected even when the LLM is unavailable. Matching works over the
//! precompiled per-company lexicon, so a pass is a handful of substring
//! scans.

use frontdesk_config::CompiledLexicon;
use frontdesk_core::{CallContext, CallerIntent, Classification, IntentSignals};

fn scaled(base: f32, hits: usize) -> f32 {
    (base + 0.05 * (hits.saturating_sub(1)) as f32).min(0.95)
}

/// Classify one cleaned utterance.
///
/// The current context only nudges ambiguous cases; a confident keyword
/// hit always wins so a caller can change direction mid-call.
pub fn classify(
    cleaned: &str,
    lexicon: &CompiledLexicon,
    context: Option<&CallContext>,
) -> Classification {
    let emergency = lexicon.emergency_hits(cleaned);
    let wrong_number = lexicon.wrong_number_hits(cleaned);
    let spam = lexicon.spam_hits(cleaned);

    let signals = IntentSignals {
        maybe_emergency: emergency > 0,
        maybe_wrong_number: wrong_number > 0,
        maybe_spam: spam > 0,
    };

    let mut classification = if emergency > 0 {
        Classification::new(CallerIntent::Emergency, scaled(0.8, emergency))
    } else if wrong_number > 0 {
        Classification::new(CallerIntent::WrongNumber, scaled(0.9, wrong_number))
    } else if spam > 0 {
        Classification::new(CallerIntent::Spam, scaled(0.85, spam))
    } else if lexicon.cancel_hits(cleaned) > 0 {
        Classification::new(CallerIntent::Cancel, 0.8)
    } else if lexicon.reschedule_hits(cleaned) > 0 {
        Classification::new(CallerIntent::Reschedule, 0.8)
    } else if lexicon.booking_hits(cleaned) > 0 {
        Classification::new(
            CallerIntent::Booking,
            scaled(0.75, lexicon.booking_hits(cleaned)),
        )
    } else if lexicon.question_hits(cleaned) > 0 {
        Classification::new(
            CallerIntent::Question,
            scaled(0.75, lexicon.question_hits(cleaned)),
        )
    } else if lexicon.small_talk_hits(cleaned) > 0 {
        // Short greetings are small talk; a long utterance that merely
        // opens with one is probably substantive.
        let word_count = cleaned.split_whitespace().count();
        let confidence = if word_count <= 6 { 0.75 } else { 0.45 };
        Classification::new(CallerIntent::SmallTalk, confidence)
    } else {
        Classification::new(CallerIntent::Unknown, 0.3)
    };

    // Mid-call continuation: an unclassifiable utterance while booking is
    // in progress is most likely an answer to our last question.
    if classification.intent == CallerIntent::Unknown {
        if let Some(ctx) = context {
            if matches!(ctx.current_intent, Some(CallerIntent::Booking)) && !cleaned.is_empty() {
                classification = Classification::new(CallerIntent::Booking, 0.4);
            }
        }
    }

    classification.signals = signals;
    classification
}
