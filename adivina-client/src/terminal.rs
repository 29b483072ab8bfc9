//! Terminal front end
//!
//! Turns [`GameEvent`]s into printable lines and stdin lines into commands.

use adivina_common::events::{AttemptSlot, GameEvent, ResultTone};

/// One line typed by the player
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Play the fragment for the current attempt
    Play,
    /// Start the next round
    Next,
    /// Leave the game and reset the session
    Leave,
    /// Print the command list
    Help,
    Quit,
    /// Anything else, including an empty line
    Guess(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            ":play" | ":p" => Command::Play,
            ":next" | ":n" => Command::Next,
            ":leave" | ":reset" => Command::Leave,
            ":help" | ":h" | ":?" => Command::Help,
            ":quit" | ":q" => Command::Quit,
            other => Command::Guess(other.to_string()),
        }
    }
}

pub const HELP: &str = "Commands: :play  :next  :leave  :quit  (anything else is a guess)";

fn slot_symbol(slot: AttemptSlot) -> char {
    match slot {
        AttemptSlot::Empty => '·',
        AttemptSlot::Correct => '✔',
        AttemptSlot::Wrong => '✘',
        AttemptSlot::Partial => '≈',
    }
}

/// Server hints may carry `<br>` line breaks
fn strip_markup(text: &str) -> String {
    text.replace("<br>", "\n")
        .replace("<br/>", "\n")
        .replace("<br />", "\n")
}

/// Lines to print for an event; empty when there is nothing to show
pub fn render(event: &GameEvent) -> Vec<String> {
    match event {
        GameEvent::PlaylistStarted { name } => vec![format!("🎵 {}", name)],
        GameEvent::RoundStarted { .. } => vec!["── New round ──".to_string()],
        GameEvent::HintChanged { text } => vec![strip_markup(text)],
        GameEvent::SuggestionsChanged { candidates } if !candidates.is_empty() => {
            let mut lines = vec!["Possible songs:".to_string()];
            lines.extend(candidates.iter().map(|c| format!("  {}", c)));
            lines
        }
        GameEvent::FragmentAvailability { enabled: true } => {
            vec!["Fragment ready (:play)".to_string()]
        }
        GameEvent::AttemptsChanged { slots, remaining } => {
            let row: String = slots.iter().map(|s| slot_symbol(*s)).collect();
            vec![format!("[{}] {} attempts left", row, remaining)]
        }
        GameEvent::HistoryChanged { lines } => lines
            .iter()
            .map(|line| format!("  {}. {} {}", line.number, slot_symbol(line.slot), line.guess))
            .collect(),
        GameEvent::ResultChanged { text, tone } if !text.is_empty() => {
            let marker = match tone {
                ResultTone::Success => "✅",
                ResultTone::Failure => "❌",
                ResultTone::Neutral => "ℹ",
            };
            vec![format!("{} {}", marker, text)]
        }
        GameEvent::NextRoundAvailable => vec!["Type :next for another song".to_string()],
        GameEvent::PlaybackBlocked { message } => vec![format!("⚠ {}", message)],
        GameEvent::SolvedListChanged { solved, missed } => {
            let mut lines = Vec::new();
            if !solved.is_empty() {
                lines.push(format!("Solved ({}):", solved.len()));
                lines.extend(solved.iter().map(|s| format!("  ✔ {} - {}", s.title, s.artist)));
            }
            if !missed.is_empty() {
                lines.push(format!("Missed ({}):", missed.len()));
                lines.extend(missed.iter().map(|s| format!("  ✘ {} - {}", s.title, s.artist)));
            }
            lines
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adivina_common::events::{HistoryLine, SolvedEntry};

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse(":play"), Command::Play);
        assert_eq!(Command::parse("  :n "), Command::Next);
        assert_eq!(Command::parse(":reset"), Command::Leave);
        assert_eq!(Command::parse(":q"), Command::Quit);
        assert_eq!(Command::parse(" Song - Band "), Command::Guess("Song - Band".to_string()));
        assert_eq!(Command::parse(""), Command::Guess(String::new()));
    }

    #[test]
    fn test_render_attempt_row() {
        let lines = render(&GameEvent::AttemptsChanged {
            slots: vec![
                AttemptSlot::Partial,
                AttemptSlot::Wrong,
                AttemptSlot::Empty,
                AttemptSlot::Empty,
                AttemptSlot::Empty,
            ],
            remaining: 3,
        });
        assert_eq!(lines, vec!["[≈✘···] 3 attempts left"]);
    }

    #[test]
    fn test_render_history_and_hint() {
        let lines = render(&GameEvent::HistoryChanged {
            lines: vec![HistoryLine {
                number: 1,
                guess: "BandA".to_string(),
                slot: AttemptSlot::Partial,
            }],
        });
        assert_eq!(lines, vec!["  1. ≈ BandA"]);

        let hint = render(&GameEvent::HintChanged {
            text: "💡 Year: 1999<br>Genre: rock".to_string(),
        });
        assert_eq!(hint, vec!["💡 Year: 1999\nGenre: rock"]);
    }

    #[test]
    fn test_quiet_events_render_nothing() {
        assert!(render(&GameEvent::InputRejected).is_empty());
        assert!(render(&GameEvent::FragmentAvailability { enabled: false }).is_empty());
        assert!(render(&GameEvent::ResultChanged {
            text: String::new(),
            tone: ResultTone::Neutral
        })
        .is_empty());
        assert!(render(&GameEvent::SuggestionsChanged { candidates: vec![] }).is_empty());
    }

    #[test]
    fn test_render_solved_list() {
        let lines = render(&GameEvent::SolvedListChanged {
            solved: vec![SolvedEntry {
                title: "Song".to_string(),
                artist: "Band".to_string(),
            }],
            missed: vec![],
        });
        assert_eq!(lines, vec!["Solved (1):", "  ✔ Song - Band"]);
    }
}
