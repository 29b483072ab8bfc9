//! Text matching utilities
//!
//! Pure functions used to compare guesses with artist names. None of them can
//! fail: empty or odd input simply produces an empty result or no match.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Hyphen, en dash or em dash with optional surrounding whitespace
static TITLE_ARTIST_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*[-\x{2013}\x{2014}]\s*").expect("valid separator pattern"));

/// "Artist: X" style labels inside hint text; the value stops at markup or
/// end of line
static ARTIST_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:artista|artist|banda|band)\s*:\s*([^<\r\n]+)")
        .expect("valid artist label pattern")
});

/// Case-fold, strip diacritics and collapse whitespace
///
/// Idempotent: `normalize(&normalize(x)) == normalize(x)`.
///
/// ```
/// use adivina_client::text::normalize;
///
/// assert_eq!(normalize("  Canción   de  AMOR "), "cancion de amor");
/// assert_eq!(normalize("Canción"), normalize("CANCION"));
/// ```
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split "Title - Artist" on the last dash-like separator
///
/// Returns the whole (trimmed) text as title and `None` when there is no
/// separator, or when splitting would leave either side empty.
///
/// ```
/// use adivina_client::text::split_title_artist;
///
/// assert_eq!(
///     split_title_artist("Bohemian Rhapsody - Queen"),
///     ("Bohemian Rhapsody".to_string(), Some("Queen".to_string()))
/// );
/// assert_eq!(split_title_artist("NoSeparatorHere"), ("NoSeparatorHere".to_string(), None));
/// ```
pub fn split_title_artist(text: &str) -> (String, Option<String>) {
    let trimmed = text.trim();
    if let Some(separator) = TITLE_ARTIST_SEPARATOR.find_iter(trimmed).last() {
        let title = trimmed[..separator.start()].trim();
        let artist = trimmed[separator.end()..].trim();
        if !title.is_empty() && !artist.is_empty() {
            return (title.to_string(), Some(artist.to_string()));
        }
    }
    (trimmed.to_string(), None)
}

/// Does `guess` name `artist`?
///
/// True when the normalized guess contains the normalized artist, or when
/// the artist half of a "Title - Artist" guess equals it.
pub fn artist_matches(guess: &str, artist: &str) -> bool {
    let artist = normalize(artist);
    if artist.is_empty() {
        return false;
    }
    if normalize(guess).contains(&artist) {
        return true;
    }
    match split_title_artist(guess) {
        (_, Some(guessed_artist)) => normalize(&guessed_artist) == artist,
        _ => false,
    }
}

/// Artist names of "Title - Artist" autocomplete entries
pub fn extract_artists_from_candidates<S: AsRef<str>>(candidates: &[S]) -> BTreeSet<String> {
    candidates
        .iter()
        .filter_map(|candidate| split_title_artist(candidate.as_ref()).1)
        .collect()
}

/// First "Artist: X" / "Band: X" label in a hint, case-insensitive
pub fn artist_from_hint_label(hint: &str) -> Option<String> {
    ARTIST_LABEL
        .captures(hint)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|artist| !artist.is_empty())
}

/// Artist half of a revealed "Title - Artist" answer
pub fn artist_from_answer(answer: &str) -> Option<String> {
    split_title_artist(answer).1
}

/// Autocomplete entry worth showing to the user
pub fn is_usable_suggestion(candidate: &str) -> bool {
    !candidate.trim().is_empty() && !candidate.contains("undefined")
}
