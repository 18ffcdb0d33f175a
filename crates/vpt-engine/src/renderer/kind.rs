use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::backend::ProgramId;
use crate::buffer::AttachmentSpec;
use crate::error::Error;
use crate::params::ParamSpec;

use super::{depth, dos, eam, fov, iso, lao, mcm, mcs, mip};

/// Rendering algorithm, selected by its short tag.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    Mip,
    Iso,
    Eam,
    Lao,
    Mcs,
    Mcm,
    Fov,
    Dos,
    Depth,
}

impl RendererKind {
    pub const ALL: [RendererKind; 9] = [
        RendererKind::Mip,
        RendererKind::Iso,
        RendererKind::Eam,
        RendererKind::Lao,
        RendererKind::Mcs,
        RendererKind::Mcm,
        RendererKind::Fov,
        RendererKind::Dos,
        RendererKind::Depth,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            RendererKind::Mip => "mip",
            RendererKind::Iso => "iso",
            RendererKind::Eam => "eam",
            RendererKind::Lao => "lao",
            RendererKind::Mcs => "mcs",
            RendererKind::Mcm => "mcm",
            RendererKind::Fov => "fov",
            RendererKind::Dos => "dos",
            RendererKind::Depth => "depth",
        }
    }

    pub fn params(self) -> Vec<ParamSpec> {
        match self {
            RendererKind::Mip => mip::params(),
            RendererKind::Iso => iso::params(),
            RendererKind::Eam => eam::params(),
            RendererKind::Lao => lao::params(),
            RendererKind::Mcs => mcs::params(),
            RendererKind::Mcm => mcm::params(),
            RendererKind::Fov => fov::params(),
            RendererKind::Dos => dos::params(),
            RendererKind::Depth => depth::params(),
        }
    }

    /// Parameters whose change invalidates the accumulated image.
    pub fn reset_on(self) -> &'static [&'static str] {
        match self {
            RendererKind::Mip => mip::RESET_ON,
            RendererKind::Iso => iso::RESET_ON,
            RendererKind::Eam => eam::RESET_ON,
            RendererKind::Lao => lao::RESET_ON,
            RendererKind::Mcs => mcs::RESET_ON,
            RendererKind::Mcm => mcm::RESET_ON,
            RendererKind::Fov => fov::RESET_ON,
            RendererKind::Dos => dos::RESET_ON,
            RendererKind::Depth => depth::RESET_ON,
        }
    }

    pub fn frame_layout(self) -> &'static [AttachmentSpec] {
        match self {
            RendererKind::Mip | RendererKind::Depth => &[AttachmentSpec::R32F],
            _ => &[AttachmentSpec::RGBA32F],
        }
    }

    pub fn accumulation_layout(self) -> &'static [AttachmentSpec] {
        const PATH_STATE: [AttachmentSpec; 4] = [AttachmentSpec::RGBA32F; 4];
        const SPLATTED_PATH_STATE: [AttachmentSpec; 5] = [AttachmentSpec::RGBA32F; 5];
        match self {
            RendererKind::Mip | RendererKind::Depth => &[AttachmentSpec::R32F],
            RendererKind::Mcm => &PATH_STATE,
            RendererKind::Fov => &SPLATTED_PATH_STATE,
            RendererKind::Dos => &[AttachmentSpec::RGBA32F, AttachmentSpec::RGBA32F],
            _ => &[AttachmentSpec::RGBA32F],
        }
    }

    pub fn render_layout(self) -> &'static [AttachmentSpec] {
        &[AttachmentSpec::RGBA16F]
    }

    /// Every program the variant draws with.
    pub fn programs(self) -> &'static [ProgramId] {
        match self {
            RendererKind::Mip => mip::PROGRAMS,
            RendererKind::Iso => iso::PROGRAMS,
            RendererKind::Eam => eam::PROGRAMS,
            RendererKind::Lao => lao::PROGRAMS,
            RendererKind::Mcs => mcs::PROGRAMS,
            RendererKind::Mcm => mcm::PROGRAMS,
            RendererKind::Fov => fov::PROGRAMS,
            RendererKind::Dos => dos::PROGRAMS,
            RendererKind::Depth => depth::PROGRAMS,
        }
    }
}

impl FromStr for RendererKind {
    type Err = Error;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        RendererKind::ALL
            .into_iter()
            .find(|k| k.tag() == tag)
            .ok_or_else(|| Error::UnsupportedRenderer(tag.to_string()))
    }
}

impl fmt::Display for RendererKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shaders::ShaderLibrary;

    #[test]
    fn tags_round_trip() {
        for kind in RendererKind::ALL {
            assert_eq!(kind.tag().parse::<RendererKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert!(matches!(
            "vpt".parse::<RendererKind>(),
            Err(Error::UnsupportedRenderer(tag)) if tag == "vpt"
        ));
    }

    #[test]
    fn every_program_exists_in_the_builtin_library() {
        let library = ShaderLibrary::builtin();
        for kind in RendererKind::ALL {
            for program in kind.programs() {
                assert!(library.contains(*program), "{kind}: missing {program}");
                library.source(*program).unwrap();
            }
        }
    }

    #[test]
    fn reset_lists_name_declared_parameters() {
        for kind in RendererKind::ALL {
            let params = kind.params();
            for name in kind.reset_on() {
                assert!(params.iter().any(|p| p.name == *name), "{kind}: {name}");
            }
        }
    }
}
