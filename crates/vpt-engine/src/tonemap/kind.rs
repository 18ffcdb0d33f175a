use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::backend::ProgramId;
use crate::error::Error;
use crate::params::ParamSpec;

/// Tone mapping operator, selected by its short tag.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToneMapperKind {
    Artistic,
    Range,
    Reinhard,
    Reinhard2,
    Uncharted2,
    Aces,
}

impl ToneMapperKind {
    pub const ALL: [ToneMapperKind; 6] = [
        ToneMapperKind::Artistic,
        ToneMapperKind::Range,
        ToneMapperKind::Reinhard,
        ToneMapperKind::Reinhard2,
        ToneMapperKind::Uncharted2,
        ToneMapperKind::Aces,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            ToneMapperKind::Artistic => "artistic",
            ToneMapperKind::Range => "range",
            ToneMapperKind::Reinhard => "reinhard",
            ToneMapperKind::Reinhard2 => "reinhard2",
            ToneMapperKind::Uncharted2 => "uncharted2",
            ToneMapperKind::Aces => "aces",
        }
    }

    pub fn program(self) -> ProgramId {
        match self {
            ToneMapperKind::Artistic => ProgramId("tonemap.artistic"),
            ToneMapperKind::Range => ProgramId("tonemap.range"),
            ToneMapperKind::Reinhard => ProgramId("tonemap.reinhard"),
            ToneMapperKind::Reinhard2 => ProgramId("tonemap.reinhard2"),
            ToneMapperKind::Uncharted2 => ProgramId("tonemap.uncharted2"),
            ToneMapperKind::Aces => ProgramId("tonemap.aces"),
        }
    }

    /// Operator specific parameters followed by the shared color grading ones.
    pub fn params(self) -> Vec<ParamSpec> {
        let mut params = vec![ParamSpec::spinner("exposure", "Exposure", 1.0)];
        match self {
            ToneMapperKind::Artistic => params.extend([
                ParamSpec::slider("low", "Low", 0.0, 0.0, 1.0),
                ParamSpec::slider("mid", "Mid", 0.5, 0.0, 1.0),
                ParamSpec::slider("high", "High", 1.0, 0.0, 1.0),
            ]),
            ToneMapperKind::Range => params.extend([
                ParamSpec::spinner("low", "Low", 0.0),
                ParamSpec::spinner("high", "High", 1.0),
            ]),
            ToneMapperKind::Reinhard2 | ToneMapperKind::Uncharted2 => {
                params.push(ParamSpec::spinner("white", "White point", 1.0))
            }
            ToneMapperKind::Reinhard | ToneMapperKind::Aces => {}
        }
        params.extend([
            ParamSpec::slider("saturation", "Saturation", 1.0, 0.0, 2.0),
            ParamSpec::slider("contrast", "Contrast", 1.0, 0.0, 2.0),
            ParamSpec::spinner("gamma", "Gamma", 2.2),
        ]);
        params
    }
}

impl FromStr for ToneMapperKind {
    type Err = Error;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        ToneMapperKind::ALL
            .into_iter()
            .find(|k| k.tag() == tag)
            .ok_or_else(|| Error::UnsupportedToneMapper(tag.to_string()))
    }
}

impl fmt::Display for ToneMapperKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
