//! Artist-only ("partial") match detection
//!
//! A wrong guess is flagged partial when it names the right artist. The
//! decision is remembered per normalized guess for the rest of the round, so
//! re-deriving the history from a fresh server list never loses a flag.
//!
//! Decision order, first match wins:
//! 1. cached decision for the normalized guess
//! 2. structural evidence from the server: an explicit `parcial` field, or
//!    (legacy servers, behind [`PartialMatchClassifier::legacy_payload_scan`])
//!    a scan of the untyped attempt record and response payload
//! 3. the known artist of the song
//! 4. any artist of the autocomplete candidates

use crate::state::Attempt;
use crate::text::{artist_from_answer, artist_from_hint_label, artist_matches, normalize};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Boolean keys that flag an artist-only match when `true`
static ARTIST_FLAG_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)artist|artista|band|banda|partial|parcial").expect("valid flag key pattern")
});

/// Normalized string values that flag an artist-only match
const PARTIAL_VALUES: &[&str] = &[
    "partial",
    "parcial",
    "artist",
    "artista",
    "artist only",
    "artist_only",
    "solo artista",
    "band",
    "banda",
];

/// Keys holding free text or nested per-attempt data; only a boolean value
/// under one of them is inspected
const CONTENT_KEYS: &[&str] = &[
    "guess",
    "answer",
    "pista",
    "titulo",
    "title",
    "artista",
    "artist",
    "canciones_posibles",
    "preview_url",
    "error",
    "message",
    "jugadas",
    "historial_global",
];

/// Keys of an explicit partial flag in the versioned attempt schema
const EXPLICIT_KEYS: &[&str] = &["parcial", "partial"];

/// Why an attempt was flagged partial
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartialReason {
    Cached,
    ExplicitFlag,
    PayloadScan,
    KnownArtist,
    CandidateArtist,
}

/// Round context a classification runs against
#[derive(Debug, Clone, Copy)]
pub struct ClassifyContext<'a> {
    pub known_artist: Option<&'a str>,
    pub candidate_artists: &'a BTreeSet<String>,
    /// Raw response of the guess request; only consulted for the attempt
    /// that request submitted
    pub payload: Option<&'a Value>,
}

/// Decides and remembers artist-only matches
#[derive(Debug, Clone)]
pub struct PartialMatchClassifier {
    legacy_payload_scan: bool,
}

impl PartialMatchClassifier {
    pub fn new(legacy_payload_scan: bool) -> Self {
        Self {
            legacy_payload_scan,
        }
    }

    pub fn legacy_payload_scan(&self) -> bool {
        self.legacy_payload_scan
    }

    /// Decide whether a wrong attempt is partial, without side effects
    pub fn classify(
        &self,
        attempt: &Attempt,
        ctx: &ClassifyContext<'_>,
        cache: &HashMap<String, bool>,
    ) -> Option<PartialReason> {
        if attempt.correct {
            return None;
        }

        if cache.get(&normalize(&attempt.guess)).copied().unwrap_or(false) {
            return Some(PartialReason::Cached);
        }

        let explicit = attempt.record.as_ref().and_then(explicit_flag);
        if attempt.partial || explicit == Some(true) {
            return Some(PartialReason::ExplicitFlag);
        }
        if explicit.is_none() && self.legacy_payload_scan {
            let record_hit = attempt.record.as_ref().is_some_and(scan_for_partial);
            let payload_hit = ctx.payload.is_some_and(scan_for_partial);
            if record_hit || payload_hit {
                return Some(PartialReason::PayloadScan);
            }
        }

        if let Some(artist) = ctx.known_artist {
            if artist_matches(&attempt.guess, artist) {
                return Some(PartialReason::KnownArtist);
            }
        }

        if ctx
            .candidate_artists
            .iter()
            .any(|artist| artist_matches(&attempt.guess, artist))
        {
            return Some(PartialReason::CandidateArtist);
        }

        None
    }

    /// Classify one attempt and record a positive decision
    pub fn apply(
        &self,
        attempt: &mut Attempt,
        ctx: &ClassifyContext<'_>,
        cache: &mut HashMap<String, bool>,
    ) -> bool {
        match self.classify(attempt, ctx, cache) {
            Some(reason) => {
                debug!(guess = %attempt.guess, ?reason, "Attempt flagged partial");
                attempt.partial = true;
                cache.insert(normalize(&attempt.guess), true);
                true
            }
            None => {
                attempt.partial = false;
                false
            }
        }
    }

    /// Reclassify a whole history; the payload applies to the last attempt
    ///
    /// Returns the number of partial attempts.
    pub fn apply_all(
        &self,
        history: &mut [Attempt],
        ctx: &ClassifyContext<'_>,
        cache: &mut HashMap<String, bool>,
    ) -> usize {
        let last = history.len().saturating_sub(1);
        let mut partial = 0;
        for (i, attempt) in history.iter_mut().enumerate() {
            let attempt_ctx = ClassifyContext {
                payload: if i == last { ctx.payload } else { None },
                ..*ctx
            };
            if self.apply(attempt, &attempt_ctx, cache) {
                partial += 1;
            }
        }
        partial
    }
}

impl Default for PartialMatchClassifier {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Best available artist of the current song
///
/// Order: already known, artist field of the server payload, artist half of
/// a revealed "Title - Artist" answer, "Artist: X" label in the hint text.
pub fn resolve_known_artist(
    cached: Option<&str>,
    payload_artist: Option<&str>,
    answer: Option<&str>,
    hint_text: Option<&str>,
) -> Option<String> {
    let non_blank = |s: &&str| !s.trim().is_empty();
    if let Some(artist) = cached.filter(non_blank) {
        return Some(artist.to_string());
    }
    if let Some(artist) = payload_artist.filter(non_blank) {
        return Some(artist.trim().to_string());
    }
    answer
        .and_then(artist_from_answer)
        .or_else(|| hint_text.and_then(artist_from_hint_label))
}

/// Artist field (`artista`, then `artist`) at the top level of a payload
pub fn payload_artist(payload: &Value) -> Option<&str> {
    ["artista", "artist"]
        .iter()
        .filter_map(|key| payload.get(key).and_then(Value::as_str))
        .find(|artist| !artist.trim().is_empty())
}

fn explicit_flag(record: &Value) -> Option<bool> {
    EXPLICIT_KEYS
        .iter()
        .find_map(|key| record.get(key).and_then(Value::as_bool))
}

/// Recursive scan for an artist-only flag anywhere in a payload
pub fn scan_for_partial(value: &Value) -> bool {
    let mut visited = HashSet::new();
    scan(value, &mut visited)
}

fn scan(value: &Value, visited: &mut HashSet<*const Value>) -> bool {
    if !visited.insert(value as *const Value) {
        return false;
    }
    match value {
        Value::Object(map) => map.iter().any(|(key, child)| match child {
            Value::Bool(flag) => *flag && ARTIST_FLAG_KEY.is_match(key),
            _ if CONTENT_KEYS.contains(&key.as_str()) => false,
            _ => scan(child, visited),
        }),
        Value::Array(items) => items.iter().any(|item| scan(item, visited)),
        Value::String(text) => PARTIAL_VALUES.contains(&normalize(text).as_str()),
        _ => false,
    }
}
