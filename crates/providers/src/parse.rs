//! Parsing of the model's JSON reply into a [`PromptBundle`].
//!
//! The three prompt strings are required; everything else falls back to a
//! neutral default so a slightly sloppy reply still produces a run.

use serde_json::Value;

use reso_domain::error::{Error, Result};
use reso_domain::prompt::{PromptBundle, TempoFeel};

use crate::util::SERVICE;

const NEUTRAL_ESTIMATE: f32 = 0.5;

/// Remove a surrounding Markdown code fence (```` ``` ```` or
/// ```` ```json ````), if present.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    // Drop the opening fence line, including any language tag.
    let body = match trimmed.split_once('\n') {
        Some((_, rest)) => rest,
        None => return "",
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

fn required_str(v: &Value, field: &str) -> Result<String> {
    match v.get(field).and_then(Value::as_str).map(str::trim) {
        Some(s) if !s.is_empty() => Ok(s.to_owned()),
        _ => Err(Error::malformed(
            SERVICE,
            format!("prompt reply missing required field '{field}'"),
        )),
    }
}

/// Accepts a number or a numeric string; clamps to 0..=1.
fn estimate(v: &Value, field: &str) -> f32 {
    let raw = match v.get(field) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match raw {
        Some(x) if x.is_finite() => (x as f32).clamp(0.0, 1.0),
        _ => NEUTRAL_ESTIMATE,
    }
}

pub fn parse_bundle(text: &str) -> Result<PromptBundle> {
    let json = strip_code_fence(text);
    let v: Value = serde_json::from_str(json)
        .map_err(|e| Error::malformed(SERVICE, format!("prompt reply is not JSON: {e}")))?;
    if !v.is_object() {
        return Err(Error::malformed(SERVICE, "prompt reply is not a JSON object"));
    }

    let tempo_feel = match v.get("tempo_feel").and_then(Value::as_str) {
        Some(s) => s.parse().unwrap_or_else(|_| {
            tracing::debug!(tempo_feel = s, "unrecognised tempo feel, using midtempo");
            TempoFeel::default()
        }),
        None => TempoFeel::default(),
    };

    Ok(PromptBundle {
        suno_prompt: required_str(&v, "suno_prompt")?,
        lyria_prompt: required_str(&v, "lyria_prompt")?,
        song_concept: required_str(&v, "song_concept")?,
        mood: v
            .get("mood")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_owned())
            .unwrap_or_default(),
        tempo_feel,
        energy_estimate: estimate(&v, "energy_estimate"),
        valence_estimate: estimate(&v, "valence_estimate"),
    })
}
