//! Keyword-based content screening.
//!
//! # Responsibility
//! - Score text against static spam and profanity lists plus shape
//!   heuristics (links, caps, repeated characters).
//!
//! # Invariants
//! - Scanning is pure and deterministic; it never touches storage.
//! - Flags are reported in `FlagKind` order.

use crate::model::moderation::FlagKind;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

const SPAM_PHRASES: &[&str] = &[
    "buy now",
    "click here",
    "free money",
    "limited time offer",
    "act now",
    "make money fast",
    "work from home",
    "100% free",
    "earn cash",
    "guaranteed income",
    "crypto giveaway",
    "double your bitcoin",
    "cheap pills",
    "casino bonus",
];

const PROFANITY: &[&str] = &[
    "fuck", "fucking", "shit", "bitch", "bastard", "asshole", "dickhead", "cunt", "motherfucker",
];

pub const SPAM_SCORE: i64 = 2;
pub const PROFANITY_SCORE: i64 = 2;
pub const LINKS_SCORE: i64 = 3;
pub const CAPS_SCORE: i64 = 2;
pub const REPEAT_SCORE: i64 = 1;
const MAX_LINKS: usize = 5;
const CAPS_MIN_LETTERS: usize = 20;
const CAPS_RATIO: f64 = 0.6;
const REPEAT_RUN: usize = 10;

static PROFANITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)\b(?:{})\b", PROFANITY.join("|"))).expect("valid profanity regex")
});
static LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:https?://|www\.)\S+").expect("valid link regex"));

/// One raised flag with the evidence behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagHit {
    pub flag: FlagKind,
    pub matched_terms: Vec<String>,
    pub score: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    pub flags: Vec<FlagHit>,
    pub score: i64,
    pub needs_review: bool,
}

/// Scans text and returns every raised flag with its score.
pub fn scan_content(text: &str) -> ScanResult {
    let mut flags = Vec::new();

    let lowered = text.to_lowercase();
    let spam: Vec<String> = SPAM_PHRASES
        .iter()
        .filter(|phrase| lowered.contains(*phrase))
        .map(|phrase| phrase.to_string())
        .collect();
    if !spam.is_empty() {
        flags.push(FlagHit {
            flag: FlagKind::Spam,
            score: SPAM_SCORE * spam.len() as i64,
            matched_terms: spam,
        });
    }

    let mut profane_hits = 0_i64;
    let mut profane_terms: Vec<String> = Vec::new();
    for found in PROFANITY_RE.find_iter(text) {
        profane_hits += 1;
        let term = found.as_str().to_lowercase();
        if !profane_terms.contains(&term) {
            profane_terms.push(term);
        }
    }
    if profane_hits > 0 {
        flags.push(FlagHit {
            flag: FlagKind::Profanity,
            matched_terms: profane_terms,
            score: PROFANITY_SCORE * profane_hits,
        });
    }

    let links = LINK_RE.find_iter(text).count();
    if links > MAX_LINKS {
        flags.push(FlagHit {
            flag: FlagKind::ExcessiveLinks,
            matched_terms: vec![format!("{links} links")],
            score: LINKS_SCORE,
        });
    }

    let letters = text.chars().filter(|ch| ch.is_alphabetic()).count();
    let upper = text.chars().filter(|ch| ch.is_uppercase()).count();
    if letters >= CAPS_MIN_LETTERS && upper as f64 / letters as f64 > CAPS_RATIO {
        flags.push(FlagHit {
            flag: FlagKind::ExcessiveCaps,
            matched_terms: vec![format!("{upper}/{letters} uppercase")],
            score: CAPS_SCORE,
        });
    }

    if let Some(run) = longest_repeat_run(text).filter(|run| run.chars().count() >= REPEAT_RUN) {
        flags.push(FlagHit {
            flag: FlagKind::RepeatedCharacters,
            matched_terms: vec![run.chars().take(20).collect()],
            score: REPEAT_SCORE,
        });
    }

    let score = flags.iter().map(|hit| hit.score).sum();
    ScanResult {
        needs_review: !flags.is_empty(),
        flags,
        score,
    }
}

/// Longest run of one repeated non-whitespace character.
fn longest_repeat_run(text: &str) -> Option<String> {
    let mut best: Option<(char, usize)> = None;
    let mut current: Option<(char, usize)> = None;
    for ch in text.chars() {
        current = match current {
            Some((prev, len)) if prev == ch => Some((prev, len + 1)),
            _ if ch.is_whitespace() => None,
            _ => Some((ch, 1)),
        };
        if let Some((ch, len)) = current {
            if best.map_or(true, |(_, best_len)| len > best_len) {
                best = Some((ch, len));
            }
        }
    }
    best.map(|(ch, len)| std::iter::repeat(ch).take(len).collect())
}
