use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Perceived tempo of the generated song.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TempoFeel {
    Slow,
    #[default]
    Midtempo,
    Uptempo,
    Driving,
}

impl TempoFeel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Slow => "slow",
            Self::Midtempo => "midtempo",
            Self::Uptempo => "uptempo",
            Self::Driving => "driving",
        }
    }
}

impl fmt::Display for TempoFeel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TempoFeel {
    type Err = String;

    /// Lenient: case-insensitive, tolerates "mid-tempo" / "mid tempo".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .collect();
        match norm.as_str() {
            "slow" => Ok(Self::Slow),
            "midtempo" => Ok(Self::Midtempo),
            "uptempo" => Ok(Self::Uptempo),
            "driving" => Ok(Self::Driving),
            _ => Err(format!("unknown tempo feel: {s}")),
        }
    }
}

/// The prompts synthesized for one run. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptBundle {
    /// Style tags + mood + instrumentation, formatted for the generation backend.
    pub suno_prompt: String,
    /// Descriptive prose version of the same concept.
    pub lyria_prompt: String,
    pub song_concept: String,
    pub mood: String,
    pub tempo_feel: TempoFeel,
    pub energy_estimate: f32,
    pub valence_estimate: f32,
}
