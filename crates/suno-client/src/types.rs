//! suno-api bridge DTOs.

use serde::{Deserialize, Serialize};

use reso_domain::event::Coordinate;

#[derive(Debug, Serialize)]
pub struct CustomGenerateRequest<'a> {
    pub prompt: &'a str,
    pub title: &'a str,
    pub tags: &'a str,
    pub make_instrumental: bool,
    pub model: &'a str,
}

/// Element of the `/api/custom_generate` and `/api/get` arrays.
#[derive(Debug, Clone, Deserialize)]
pub struct Clip {
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptchaPending {
    #[serde(default)]
    pub pending: bool,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SolveRequest<'a> {
    pub coordinates: &'a [Coordinate],
}

#[derive(Debug, Clone, Deserialize)]
pub struct SolveResponse {
    #[serde(default)]
    pub ok: bool,
}
