use serde::Serialize;
use serde_json::Value;

use crate::{
    api::registry::{endpoint_for_stem, Endpoint},
    error::{Result, TaskError},
};

/// Stems accepted by the split endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stem {
    Voice,
    Music,
    Vocals,
    Drum,
    Piano,
    Bass,
    ElectricGuitar,
    AcousticGuitar,
    Synthesizer,
    Strings,
    Wind,
}

impl Stem {
    pub fn all() -> &'static [Stem] {
        &[
            Stem::Voice,
            Stem::Music,
            Stem::Vocals,
            Stem::Drum,
            Stem::Piano,
            Stem::Bass,
            Stem::ElectricGuitar,
            Stem::AcousticGuitar,
            Stem::Synthesizer,
            Stem::Strings,
            Stem::Wind,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Stem::Voice => "voice",
            Stem::Music => "music",
            Stem::Vocals => "vocals",
            Stem::Drum => "drum",
            Stem::Piano => "piano",
            Stem::Bass => "bass",
            Stem::ElectricGuitar => "electric_guitar",
            Stem::AcousticGuitar => "acoustic_guitar",
            Stem::Synthesizer => "synthesizer",
            Stem::Strings => "strings",
            Stem::Wind => "wind",
        }
    }

    pub fn parse(s: &str) -> Result<Stem> {
        let s = s.trim().to_lowercase();
        Stem::all()
            .iter()
            .copied()
            .find(|stem| stem.name() == s)
            .ok_or_else(|| {
                TaskError::Validation(format!(
                    "unsupported stem '{s}', expected one of: {}",
                    Stem::all().iter().map(|s| s.name()).collect::<Vec<_>>().join(", ")
                ))
            })
    }
}

fn parse_choice(kind: &str, value: &str, choices: &[&'static str]) -> Result<&'static str> {
    let v = value.trim().to_lowercase();
    choices.iter().copied().find(|c| *c == v).ok_or_else(|| {
        TaskError::Validation(format!(
            "unsupported {kind} '{value}', expected one of: {}",
            choices.join(", ")
        ))
    })
}

/// Remote separation model. `None` at the call sites means "let the service pick".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Splitter {
    Orion,
    Perseus,
    Phoenix,
    Andromeda,
}

impl Splitter {
    pub fn parse(s: &str) -> Result<Splitter> {
        Ok(
            match parse_choice("splitter", s, &["orion", "perseus", "phoenix", "andromeda"])? {
                "orion" => Splitter::Orion,
                "perseus" => Splitter::Perseus,
                "phoenix" => Splitter::Phoenix,
                _ => Splitter::Andromeda,
            },
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionLevel {
    #[default]
    DeepExtraction,
    ClearCut,
}

impl ExtractionLevel {
    pub fn parse(s: &str) -> Result<ExtractionLevel> {
        Ok(
            match parse_choice("extraction level", s, &["deep_extraction", "clear_cut"])? {
                "clear_cut" => ExtractionLevel::ClearCut,
                _ => ExtractionLevel::DeepExtraction,
            },
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Multivocal {
    LeadBack,
}

impl Multivocal {
    pub fn parse(s: &str) -> Result<Multivocal> {
        parse_choice("multivocal mode", s, &["lead_back"])?;
        Ok(Multivocal::LeadBack)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TonalityReference {
    #[default]
    SourceFile,
    VoicePack,
}

impl TonalityReference {
    pub fn parse(s: &str) -> Result<TonalityReference> {
        Ok(
            match parse_choice("tonality reference", s, &["source_file", "voice_pack"])? {
                "voice_pack" => TonalityReference::VoicePack,
                _ => TonalityReference::SourceFile,
            },
        )
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceCleanPresets {
    pub stem: &'static str,
    pub noise_cancelling_level: u8,
    #[serde(skip_serializing_if = "is_false")]
    pub dereverb_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub splitter: Option<Splitter>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemuserPresets {
    pub stem: &'static str,
    #[serde(skip_serializing_if = "is_false")]
    pub dereverb_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StemSeparatorPresets {
    pub stem: &'static str,
    pub extraction_level: ExtractionLevel,
    #[serde(skip_serializing_if = "is_false")]
    pub dereverb_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multivocal: Option<Multivocal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub splitter: Option<Splitter>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceChangePresets {
    pub voice_pack_id: String,
    pub accent: f32,
    pub tonality_reference: TonalityReference,
    pub dereverb_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub splitter: Option<Splitter>,
}

/// Everything the user can ask of the split endpoints, before it is narrowed
/// down to the presets of one endpoint.
#[derive(Debug, Clone)]
pub struct SplitRequest {
    pub stem: Stem,
    pub noise_cancelling: u8,
    pub extraction_level: ExtractionLevel,
    pub multivocal: Option<Multivocal>,
    pub splitter: Option<Splitter>,
    pub dereverb: bool,
}

impl Default for SplitRequest {
    fn default() -> Self {
        Self {
            stem: Stem::Vocals,
            noise_cancelling: 1,
            extraction_level: ExtractionLevel::DeepExtraction,
            multivocal: None,
            splitter: None,
            dereverb: false,
        }
    }
}

/// The requested remote operation, already validated.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    VoiceClean(VoiceCleanPresets),
    Demuser(DemuserPresets),
    StemSeparator(StemSeparatorPresets),
    ChangeVoice(VoiceChangePresets),
}

/// Track label produced by the voice changer that holds the converted audio.
pub const CONVERTED_MIX_LABEL: &str = "converted_mix";

impl Operation {
    pub fn split(req: &SplitRequest) -> Result<Operation> {
        if req.multivocal.is_some() && req.stem != Stem::Vocals {
            return Err(TaskError::Validation(format!(
                "multivocal is only supported for the \"vocals\" stem, not \"{}\"",
                req.stem.name()
            )));
        }

        Ok(match endpoint_for_stem(req.stem) {
            Endpoint::VoiceClean => {
                if req.noise_cancelling > 2 {
                    return Err(TaskError::Validation(format!(
                        "noise cancelling level must be 0, 1 or 2, got {}",
                        req.noise_cancelling
                    )));
                }
                Operation::VoiceClean(VoiceCleanPresets {
                    stem: req.stem.name(),
                    noise_cancelling_level: req.noise_cancelling,
                    dereverb_enabled: req.dereverb,
                    splitter: req.splitter,
                })
            }
            Endpoint::Demuser => Operation::Demuser(DemuserPresets {
                stem: req.stem.name(),
                dereverb_enabled: req.dereverb,
            }),
            _ => Operation::StemSeparator(StemSeparatorPresets {
                stem: req.stem.name(),
                extraction_level: req.extraction_level,
                dereverb_enabled: req.dereverb,
                multivocal: req.multivocal,
                splitter: req.splitter,
            }),
        })
    }

    pub fn change_voice(presets: VoiceChangePresets) -> Result<Operation> {
        if presets.voice_pack_id.trim().is_empty() {
            return Err(TaskError::Validation("voice pack id must not be empty".into()));
        }
        if !(0.0..=1.0).contains(&presets.accent) {
            return Err(TaskError::Validation(format!(
                "accent must be within 0.0..=1.0, got {}",
                presets.accent
            )));
        }
        Ok(Operation::ChangeVoice(presets))
    }

    pub fn endpoint(&self) -> Endpoint {
        match self {
            Operation::VoiceClean(_) => Endpoint::VoiceClean,
            Operation::Demuser(_) => Endpoint::Demuser,
            Operation::StemSeparator(_) => Endpoint::StemSeparator,
            Operation::ChangeVoice(_) => Endpoint::ChangeVoice,
        }
    }

    pub fn presets(&self) -> Result<Value> {
        Ok(match self {
            Operation::VoiceClean(p) => serde_json::to_value(p)?,
            Operation::Demuser(p) => serde_json::to_value(p)?,
            Operation::StemSeparator(p) => serde_json::to_value(p)?,
            Operation::ChangeVoice(p) => serde_json::to_value(p)?,
        })
    }

    /// Track label to keep, or `None` to download every track.
    pub fn wanted_label(&self) -> Option<&'static str> {
        match self {
            Operation::ChangeVoice(_) => Some(CONVERTED_MIX_LABEL),
            _ => None,
        }
    }
}
