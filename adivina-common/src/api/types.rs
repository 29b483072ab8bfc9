//! Request/response bodies of the game server API
//!
//! The server is lenient about what it sends (missing keys, `null` where a
//! list is expected), so every response field is optional or defaulted.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ========================================
// Requests
// ========================================

/// Body of `POST /start`
///
/// Both fields are sent as `null` when absent; the server then falls back to
/// its default playlist.
///
/// # Examples
///
/// ```
/// use adivina_common::api::StartRequest;
///
/// let request = StartRequest::new(Some("14089683421".to_string()), None);
/// let json = serde_json::to_value(&request).unwrap();
/// assert_eq!(json["playlist_id"], "14089683421");
/// assert!(json["playlist_name"].is_null());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct StartRequest {
    /// Playlist identifier or playlist URL (the server extracts the id)
    pub playlist_id: Option<String>,

    /// Display name chosen on the selection screen
    pub playlist_name: Option<String>,
}

impl StartRequest {
    pub fn new(playlist_id: Option<String>, playlist_name: Option<String>) -> Self {
        Self {
            playlist_id: playlist_id.filter(|id| !id.trim().is_empty()),
            playlist_name: playlist_name.filter(|name| !name.trim().is_empty()),
        }
    }
}

/// Body of `POST /guess`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GuessRequest {
    /// Guess text, possibly empty
    pub guess: String,
}

// ========================================
// Responses
// ========================================

/// Response of `POST /start`
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct StartResponse {
    #[serde(default)]
    pub message: Option<String>,

    /// Name the server resolved for the playlist
    #[serde(default)]
    pub playlist_name: Option<String>,
}

/// Response of `GET /hint?attempt=N`
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct HintPayload {
    /// Hint text; may contain `<br>` separators between hint lines
    #[serde(default)]
    pub pista: Option<String>,

    /// Preview audio for the current song
    #[serde(default)]
    pub preview_url: Option<String>,

    /// Autocomplete entries in "Title - Artist" form
    #[serde(default, deserialize_with = "lenient_strings")]
    pub canciones_posibles: Vec<String>,

    /// Artist of the current song, when the server chooses to disclose it
    #[serde(default)]
    pub artista: Option<String>,

    /// English spelling of `artista`, sent by some server versions
    #[serde(default)]
    pub artist: Option<String>,

    /// Server-side failure (e.g. playlist exhausted)
    #[serde(default)]
    pub error: Option<String>,
}

impl HintPayload {
    /// Disclosed artist name, preferring `artista` over `artist`
    pub fn artist_name(&self) -> Option<&str> {
        non_blank(self.artista.as_deref()).or_else(|| non_blank(self.artist.as_deref()))
    }

    /// Preview URL, ignoring blank strings
    pub fn preview(&self) -> Option<&str> {
        non_blank(self.preview_url.as_deref())
    }
}

/// One entry of the per-round attempt list (`jugadas`)
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AttemptRecord {
    #[serde(default)]
    pub guess: String,

    #[serde(default)]
    pub correcta: bool,

    /// Explicit artist-only match flag (newer servers only)
    #[serde(default, alias = "partial")]
    pub parcial: Option<bool>,
}

/// Response of `POST /guess`
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct GuessResult {
    /// `Some(true)` only when the guess was right
    #[serde(default)]
    pub correcto: Option<bool>,

    /// "Title - Artist" of the song; present only when the round ends
    #[serde(default)]
    pub answer: Option<String>,

    /// Full preview to play once the round ends
    #[serde(default)]
    pub preview_url: Option<String>,

    /// Server-authoritative attempts of the current round
    #[serde(default, deserialize_with = "lenient_records")]
    pub jugadas: Vec<AttemptRecord>,

    #[serde(default)]
    pub intentos_restantes: Option<u32>,
}

impl GuessResult {
    pub fn is_correct(&self) -> bool {
        self.correcto == Some(true)
    }

    /// Revealed answer, ignoring blank strings
    pub fn revealed_answer(&self) -> Option<&str> {
        non_blank(self.answer.as_deref())
    }
}

/// Entry of `GET /historial-global`
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SolvedSong {
    #[serde(default)]
    pub titulo: String,

    #[serde(default)]
    pub artista: String,

    /// Whether the song was guessed (false when attempts ran out)
    #[serde(default)]
    pub correcta: bool,
}

/// Body the server attaches to non-2xx responses
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,

    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    /// Extract a human-readable message from an arbitrary JSON error body
    ///
    /// Prefers `error`, then `message`, then the compact JSON text itself.
    pub fn message_from(body: &Value) -> Option<String> {
        if body.is_null() {
            return None;
        }
        let parsed: ErrorBody = serde_json::from_value(body.clone()).unwrap_or_default();
        parsed
            .error
            .filter(|m| !m.is_empty())
            .or(parsed.message.filter(|m| !m.is_empty()))
            .or_else(|| Some(body.to_string()))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Accept `null`, non-string entries and missing lists
fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Option::<Vec<Value>>::deserialize(deserializer)?;
    Ok(values
        .unwrap_or_default()
        .into_iter()
        .filter_map(|value| match value {
            Value::String(s) => Some(s),
            _ => None,
        })
        .collect())
}

fn lenient_records<'de, D>(deserializer: D) -> Result<Vec<AttemptRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Option::<Vec<Value>>::deserialize(deserializer)?;
    Ok(values
        .unwrap_or_default()
        .into_iter()
        .map(|value| serde_json::from_value(value).unwrap_or_default())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hint_payload_tolerates_missing_and_null_fields() {
        let payload: HintPayload = serde_json::from_value(json!({
            "pista": "",
            "preview_url": null,
            "canciones_posibles": ["Hit - BandA", null, 7, "Other - BandB"]
        }))
        .unwrap();

        assert_eq!(payload.preview(), None);
        assert_eq!(payload.canciones_posibles, vec!["Hit - BandA", "Other - BandB"]);
        assert_eq!(payload.artist_name(), None);
        assert!(payload.error.is_none());
    }

    #[test]
    fn test_hint_payload_artist_spellings() {
        let payload: HintPayload =
            serde_json::from_value(json!({"artist": "Queen", "artista": "  "})).unwrap();
        assert_eq!(payload.artist_name(), Some("Queen"));

        let payload: HintPayload =
            serde_json::from_value(json!({"artist": "Queen", "artista": "Soda Stereo"})).unwrap();
        assert_eq!(payload.artist_name(), Some("Soda Stereo"));
    }

    #[test]
    fn test_guess_result_round_in_progress() {
        let result: GuessResult = serde_json::from_value(json!({
            "correcto": false,
            "answer": null,
            "preview_url": "http://x/a.mp3",
            "intentos_restantes": 4,
            "jugadas": [{"guess": "BandA", "correcta": false}],
            "historial_global": []
        }))
        .unwrap();

        assert!(!result.is_correct());
        assert_eq!(result.revealed_answer(), None);
        assert_eq!(result.jugadas.len(), 1);
        assert_eq!(result.jugadas[0].guess, "BandA");
        assert_eq!(result.jugadas[0].parcial, None);
    }

    #[test]
    fn test_attempt_record_partial_alias() {
        let record: AttemptRecord =
            serde_json::from_value(json!({"guess": "x", "correcta": false, "partial": true})).unwrap();
        assert_eq!(record.parcial, Some(true));
    }

    #[test]
    fn test_guess_result_malformed_attempt_defaults() {
        let result: GuessResult =
            serde_json::from_value(json!({"jugadas": ["oops", {"guess": "a"}]})).unwrap();
        assert_eq!(result.correcto, None);
        assert_eq!(result.jugadas.len(), 2);
        assert_eq!(result.jugadas[0], AttemptRecord::default());
        assert!(!result.jugadas[1].correcta);
    }

    #[test]
    fn test_error_body_message_preference() {
        assert_eq!(
            ErrorBody::message_from(&json!({"error": "No hay más canciones."})),
            Some("No hay más canciones.".to_string())
        );
        assert_eq!(
            ErrorBody::message_from(&json!({"message": "bad"})),
            Some("bad".to_string())
        );
        assert_eq!(
            ErrorBody::message_from(&json!({"detail": 1})),
            Some("{\"detail\":1}".to_string())
        );
        assert_eq!(ErrorBody::message_from(&Value::Null), None);
    }

    #[test]
    fn test_start_request_drops_blank_fields() {
        let request = StartRequest::new(Some("  ".to_string()), Some("Rock".to_string()));
        assert_eq!(request.playlist_id, None);
        assert_eq!(request.playlist_name.as_deref(), Some("Rock"));
    }
}
