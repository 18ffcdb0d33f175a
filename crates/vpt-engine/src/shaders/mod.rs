//! WGSL program table.
//!
//! Programs are plain WGSL modules. A line of the form `#include <name>` is
//! replaced by the named mixin (recursively, each mixin at most once per
//! program), so shared declarations like the pass uniform block live in one
//! place.
//!
//! The table is immutable after construction and shared with the backend
//! through an `Arc`.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;

use crate::backend::ProgramId;
use crate::error::{Error, Result};

macro_rules! wgsl {
    ($($name:literal => $path:literal),* $(,)?) => {
        &[$(($name, include_str!($path))),*]
    };
}

const BUILTIN_MIXINS: &[(&str, &str)] = wgsl! {
    "pass_uniforms" => "wgsl/mixins/pass_uniforms.wgsl",
    "fullscreen" => "wgsl/mixins/fullscreen.wgsl",
    "random" => "wgsl/mixins/random.wgsl",
    "ray" => "wgsl/mixins/ray.wgsl",
    "environment" => "wgsl/mixins/environment.wgsl",
    "scattering" => "wgsl/mixins/scattering.wgsl",
    "medium" => "wgsl/mixins/medium.wgsl",
    "paths" => "wgsl/mixins/paths.wgsl",
    "tonemap_common" => "wgsl/mixins/tonemap_common.wgsl",
};

const BUILTIN_PROGRAMS: &[(&str, &str)] = wgsl! {
    "common.clear" => "wgsl/common/clear.wgsl",
    "common.integrate_mean" => "wgsl/common/integrate_mean.wgsl",
    "common.render_copy" => "wgsl/common/render_copy.wgsl",

    "mip.generate" => "wgsl/mip/generate.wgsl",
    "mip.integrate" => "wgsl/mip/integrate.wgsl",
    "mip.render" => "wgsl/mip/render.wgsl",

    "iso.reset" => "wgsl/iso/reset.wgsl",
    "iso.generate" => "wgsl/iso/generate.wgsl",
    "iso.integrate" => "wgsl/iso/integrate.wgsl",
    "iso.render" => "wgsl/iso/render.wgsl",

    "eam.generate" => "wgsl/eam/generate.wgsl",
    "lao.generate" => "wgsl/lao/generate.wgsl",
    "mcs.generate" => "wgsl/mcs/generate.wgsl",

    "mcm.reset" => "wgsl/mcm/reset.wgsl",
    "mcm.integrate" => "wgsl/mcm/integrate.wgsl",
    "mcm.render" => "wgsl/mcm/render.wgsl",

    "fov.reset" => "wgsl/fov/reset.wgsl",
    "fov.integrate" => "wgsl/fov/integrate.wgsl",
    "fov.render" => "wgsl/fov/render.wgsl",
    "occupancy.downsample" => "wgsl/fov/downsample.wgsl",

    "dos.reset" => "wgsl/dos/reset.wgsl",
    "dos.generate" => "wgsl/dos/generate.wgsl",
    "dos.integrate" => "wgsl/dos/integrate.wgsl",
    "dos.render" => "wgsl/dos/render.wgsl",

    "depth.reset" => "wgsl/depth/reset.wgsl",
    "depth.generate" => "wgsl/depth/generate.wgsl",
    "depth.integrate" => "wgsl/depth/integrate.wgsl",
    "depth.render" => "wgsl/depth/render.wgsl",

    "tonemap.artistic" => "wgsl/tonemap/artistic.wgsl",
    "tonemap.range" => "wgsl/tonemap/range.wgsl",
    "tonemap.reinhard" => "wgsl/tonemap/reinhard.wgsl",
    "tonemap.reinhard2" => "wgsl/tonemap/reinhard2.wgsl",
    "tonemap.uncharted2" => "wgsl/tonemap/uncharted2.wgsl",
    "tonemap.aces" => "wgsl/tonemap/aces.wgsl",

    "blit.quad" => "wgsl/blit/quad.wgsl",
    "blit.quad_fov" => "wgsl/blit/quad_fov.wgsl",
};

/// On-disk form of a program table.
#[derive(Debug, Deserialize)]
struct Manifest {
    programs: HashMap<String, String>,
    #[serde(default)]
    mixins: HashMap<String, String>,
}

/// Immutable table of WGSL programs and mixins.
#[derive(Debug, Clone)]
pub struct ShaderLibrary {
    programs: HashMap<String, String>,
    mixins: HashMap<String, String>,
}

impl ShaderLibrary {
    /// The programs compiled into the crate.
    pub fn builtin() -> Self {
        let collect = |table: &[(&str, &str)]| {
            table
                .iter()
                .map(|(name, source)| (name.to_string(), source.to_string()))
                .collect()
        };
        Self {
            programs: collect(BUILTIN_PROGRAMS),
            mixins: collect(BUILTIN_MIXINS),
        }
    }

    /// Parses a JSON manifest: `{ "programs": {name: source}, "mixins": {name: source} }`.
    ///
    /// Entries override the built-in table, so a manifest only needs to list
    /// the programs it replaces.
    pub fn from_manifest(json: &str) -> Result<Self> {
        let manifest: Manifest = serde_json::from_str(json)?;
        let mut library = Self::builtin();
        library.programs.extend(manifest.programs);
        library.mixins.extend(manifest.mixins);
        Ok(library)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        log::info!("loading shader manifest {}", path.display());
        Self::from_manifest(&json)
    }

    pub fn contains(&self, program: ProgramId) -> bool {
        self.programs.contains_key(program.name())
    }

    pub fn program_names(&self) -> impl Iterator<Item = &str> {
        self.programs.keys().map(String::as_str)
    }

    /// Returns the program source with every `#include` expanded.
    pub fn source(&self, program: ProgramId) -> Result<String> {
        let source = self
            .programs
            .get(program.name())
            .ok_or_else(|| Error::MissingProgram(program.name().to_string()))?;

        let mut out = String::with_capacity(source.len());
        let mut included = HashSet::new();
        self.expand(source, &mut out, &mut included, &mut Vec::new())?;
        Ok(out)
    }

    fn expand<'a>(
        &'a self,
        source: &'a str,
        out: &mut String,
        included: &mut HashSet<&'a str>,
        stack: &mut Vec<&'a str>,
    ) -> Result<()> {
        for line in source.lines() {
            let Some(name) = parse_include(line) else {
                out.push_str(line);
                out.push('\n');
                continue;
            };

            let (key, mixin) = self
                .mixins
                .get_key_value(name)
                .ok_or_else(|| Error::MissingMixin(name.to_string()))?;
            if stack.contains(&key.as_str()) {
                return Err(Error::MissingMixin(format!("{name} (recursive include)")));
            }
            if !included.insert(key.as_str()) {
                continue;
            }

            stack.push(key.as_str());
            self.expand(mixin, out, included, stack)?;
            stack.pop();
        }
        Ok(())
    }
}

impl Default for ShaderLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

fn parse_include(line: &str) -> Option<&str> {
    line.trim()
        .strip_prefix("#include")?
        .trim()
        .strip_prefix('<')?
        .strip_suffix('>')
        .map(str::trim)
}
