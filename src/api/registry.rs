use crate::core::presets::Stem;

pub const DEFAULT_BASE_URL: &str = "https://www.lalal.ai/api/v1/";

/// Header carrying the caller's license key on every API request.
pub const LICENSE_HEADER: &str = "X-License-Key";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Upload,
    VoiceClean,
    Demuser,
    StemSeparator,
    ChangeVoice,
    Check,
    Delete,
    VoicePacks,
    TrainStart,
    TrainCheck,
    Activate,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Upload => "upload/",
            Endpoint::VoiceClean => "split/voice_clean/",
            Endpoint::Demuser => "split/demuser/",
            Endpoint::StemSeparator => "split/stem_separator/",
            Endpoint::ChangeVoice => "change_voice/",
            Endpoint::Check => "check/",
            Endpoint::Delete => "delete/",
            Endpoint::VoicePacks => "voice_packs/list/",
            Endpoint::TrainStart => "voice_packs/train/start/",
            Endpoint::TrainCheck => "voice_packs/train/check/",
            Endpoint::Activate => "voice_packs/activate/",
        }
    }
}

/// Which split endpoint handles a stem.
pub fn endpoint_for_stem(stem: Stem) -> Endpoint {
    match stem {
        Stem::Voice => Endpoint::VoiceClean,
        Stem::Music => Endpoint::Demuser,
        _ => Endpoint::StemSeparator,
    }
}

/// Normalise a base URL so endpoint paths can be appended directly.
pub fn resolve_base_url(override_url: Option<&str>) -> String {
    let base = override_url
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_BASE_URL);
    if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{base}/")
    }
}

pub fn endpoint_url(base_url: &str, endpoint: Endpoint) -> String {
    format!("{}{}", resolve_base_url(Some(base_url)), endpoint.path())
}
