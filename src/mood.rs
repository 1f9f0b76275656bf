//! Keyword mood classifier.
//!
//! Maps assistant text to a [`Mood`] by testing the lowercased text against an
//! ordered rule table. The first rule that matches wins; text that matches no
//! rule is [`Mood::Neutral`]. Rule order is flirty, happy, sad, surprised, so
//! intimate language outranks generic positive language.

use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use regex::Regex;

/// Presentation tone derived from the latest assistant turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    #[default]
    Neutral,
    Happy,
    Flirty,
    Sad,
    Surprised,
}

impl Mood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Happy => "happy",
            Self::Flirty => "flirty",
            Self::Sad => "sad",
            Self::Surprised => "surprised",
        }
    }
}

impl std::fmt::Display for Mood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Mood {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "neutral" => Ok(Self::Neutral),
            "happy" => Ok(Self::Happy),
            "flirty" => Ok(Self::Flirty),
            "sad" => Ok(Self::Sad),
            "surprised" => Ok(Self::Surprised),
            _ => Err(format!("unknown mood: {s}")),
        }
    }
}

// ── Rule table ──────────────────────────────────────────────────────────

/// (mood, keywords) in precedence order.
const MOOD_TABLE: &[(Mood, &[&str])] = &[
    (
        Mood::Flirty,
        &[
            "love", "kiss", "hot", "sexy", "babe", "baby", "naughty", "bed", "touch", "handsome",
            "longing", "desire", "lust",
        ],
    ),
    (
        Mood::Happy,
        &[
            "haha", "lol", "great", "good", "fun", "yay", "happy", "smile", "amazing", "perfect",
            "sweet",
        ],
    ),
    (
        Mood::Sad,
        &[
            "sad",
            "sorry",
            "hurt",
            "miss",
            "bad",
            "cry",
            "tears",
            "lonely",
            "heartbreak",
        ],
    ),
    (
        Mood::Surprised,
        &["wow", "oh", "really", "wait", "what", "gasp", "shook"],
    ),
];

/// A compiled classification rule.
pub struct MoodRule {
    pub mood: Mood,
    pattern: Regex,
}

impl MoodRule {
    /// Build a rule that fires when any keyword appears as a substring.
    pub fn new(mood: Mood, keywords: &[&str]) -> Self {
        let alternation = keywords
            .iter()
            .map(|k| regex::escape(k))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!("({alternation})")).expect("escaped keywords form a valid regex");
        Self { mood, pattern }
    }

    pub fn matches(&self, lowered: &str) -> bool {
        self.pattern.is_match(lowered)
    }
}

static RULES: LazyLock<Vec<MoodRule>> = LazyLock::new(|| {
    MOOD_TABLE
        .iter()
        .map(|(mood, keywords)| MoodRule::new(*mood, keywords))
        .collect()
});

/// Classify `text` with the built-in rule table.
pub fn classify(text: &str) -> Mood {
    classify_with(&RULES, text)
}

/// Classify `text` against an arbitrary ordered rule list.
pub fn classify_with(rules: &[MoodRule], text: &str) -> Mood {
    let lowered = text.to_lowercase();
    rules
        .iter()
        .find(|rule| rule.matches(&lowered))
        .map(|rule| rule.mood)
        .unwrap_or_default()
}
