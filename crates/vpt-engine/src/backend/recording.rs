use std::collections::HashMap;

use crate::error::{Error, Result};

use super::{
    Backend, Blend, DrawCall, DrawTarget, Filter, LoadOp, Primitive, ProgramId, TextureHandle,
    TextureRegion, TextureSpec, TexelFormat,
};

pub type TextureId = u64;

/// Texture handle of the [`RecordingBackend`].
#[derive(Debug, Clone)]
pub struct RecordedTexture {
    id: TextureId,
    spec: TextureSpec,
}

impl RecordedTexture {
    pub fn id(&self) -> TextureId {
        self.id
    }
}

impl TextureHandle for RecordedTexture {
    fn spec(&self) -> &TextureSpec {
        &self.spec
    }

    fn set_filter(&mut self, filter: Filter) {
        self.spec.filter = filter;
    }
}

/// One recorded pass.
///
/// Every write gives the written texture a fresh, globally increasing content
/// version; inputs carry the version that was current when the pass sampled them.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub label: &'static str,
    pub program: ProgramId,
    pub inputs: Vec<(TextureId, u64)>,
    pub targets: Vec<(TextureId, u64)>,
    pub to_screen: bool,
    pub primitive: Primitive,
    pub blend: Blend,
    pub load: LoadOp,
    pub uniforms: Vec<u8>,
}

impl DrawRecord {
    pub fn reads(&self, id: TextureId) -> Option<u64> {
        self.inputs.iter().find(|(t, _)| *t == id).map(|(_, v)| *v)
    }

    pub fn writes(&self, id: TextureId) -> Option<u64> {
        self.targets.iter().find(|(t, _)| *t == id).map(|(_, v)| *v)
    }

    /// Decodes the uniform block, if it has exactly the size of `U`.
    pub fn uniform_block<U: bytemuck::Pod>(&self) -> Option<U> {
        bytemuck::try_pod_read_unaligned(&self.uniforms).ok()
    }
}

#[derive(Debug)]
struct TextureState {
    spec: TextureSpec,
    version: u64,
    writer: Option<ProgramId>,
    data: Option<Vec<u8>>,
    destroyed: bool,
}

/// CPU-side backend that records GPU traffic instead of executing it.
///
/// It tracks, per texture, a content version and the program that last wrote
/// it, which is enough to check accumulation ordering, reset behavior and
/// resource lifetimes without a GPU. Uploaded data is kept so readbacks of
/// uploaded textures return it; readbacks of drawn textures return a fill byte
/// derived from the content version.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    next_id: TextureId,
    next_version: u64,
    textures: HashMap<TextureId, TextureState>,
    draws: Vec<DrawRecord>,
    submits: usize,
    diagnostics: Vec<String>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every pass recorded so far, in submission order.
    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    pub fn draws_of(&self, program: ProgramId) -> impl Iterator<Item = &DrawRecord> {
        self.draws.iter().filter(move |d| d.program == program)
    }

    pub fn clear_draws(&mut self) {
        self.draws.clear();
    }

    pub fn version(&self, texture: &RecordedTexture) -> u64 {
        self.textures.get(&texture.id).map_or(0, |t| t.version)
    }

    /// Program that produced the current contents (`None` after a clear or upload).
    pub fn last_writer(&self, texture: &RecordedTexture) -> Option<ProgramId> {
        self.textures.get(&texture.id).and_then(|t| t.writer)
    }

    pub fn is_destroyed(&self, texture: &RecordedTexture) -> bool {
        self.textures.get(&texture.id).is_none_or(|t| t.destroyed)
    }

    /// Number of textures created and not yet destroyed.
    pub fn live_textures(&self) -> usize {
        self.textures.values().filter(|t| !t.destroyed).count()
    }

    pub fn submits(&self) -> usize {
        self.submits
    }

    /// Queues a diagnostic as if the GPU had reported an error.
    pub fn push_diagnostic(&mut self, message: impl Into<String>) {
        self.diagnostics.push(message.into());
    }

    fn live(&self, texture: &RecordedTexture) -> Result<&TextureState> {
        match self.textures.get(&texture.id) {
            Some(state) if !state.destroyed => Ok(state),
            _ => Err(Error::Destroyed("texture")),
        }
    }

    fn bump(&mut self, id: TextureId, writer: Option<ProgramId>) -> u64 {
        self.next_version += 1;
        let version = self.next_version;
        if let Some(state) = self.textures.get_mut(&id) {
            state.version = version;
            state.writer = writer;
            state.data = None;
        }
        version
    }
}

impl Backend for RecordingBackend {
    type Texture = RecordedTexture;

    fn create_texture(&mut self, spec: &TextureSpec) -> Result<RecordedTexture> {
        if spec.width == 0 || spec.height == 0 || spec.depth == 0 {
            return Err(Error::Gpu(format!("texture `{}` has zero extent", spec.label)));
        }
        self.next_id += 1;
        let id = self.next_id;
        self.textures.insert(
            id,
            TextureState {
                spec: spec.clone(),
                version: 0,
                writer: None,
                data: None,
                destroyed: false,
            },
        );
        Ok(RecordedTexture {
            id,
            spec: spec.clone(),
        })
    }

    fn destroy_texture(&mut self, texture: &RecordedTexture) {
        if let Some(state) = self.textures.get_mut(&texture.id) {
            state.destroyed = true;
            state.data = None;
        }
    }

    fn write_texture(
        &mut self,
        texture: &RecordedTexture,
        region: TextureRegion,
        data: &[u8],
    ) -> Result<()> {
        let spec = self.live(texture)?.spec.clone();
        let bpt = spec.format.bytes_per_texel() as usize;
        if !region.fits(&spec) {
            return Err(Error::Gpu(format!("write outside of `{}`", spec.label)));
        }
        if data.len() != region.texel_count() * bpt {
            return Err(Error::Gpu(format!(
                "write to `{}` expected {} bytes, got {}",
                spec.label,
                region.texel_count() * bpt,
                data.len()
            )));
        }

        let previous = self.textures.get(&texture.id).and_then(|t| t.data.clone());
        self.bump(texture.id, None);

        let mut contents = previous.unwrap_or_else(|| vec![0; spec.byte_len()]);
        let row = region.size[0] as usize * bpt;
        let mut src = 0;
        for z in 0..region.size[2] as usize {
            for y in 0..region.size[1] as usize {
                let tz = region.origin[2] as usize + z;
                let ty = region.origin[1] as usize + y;
                let dst = ((tz * spec.height as usize + ty) * spec.width as usize
                    + region.origin[0] as usize)
                    * bpt;
                contents[dst..dst + row].copy_from_slice(&data[src..src + row]);
                src += row;
            }
        }

        if let Some(state) = self.textures.get_mut(&texture.id) {
            state.data = Some(contents);
        }
        Ok(())
    }

    fn clear(&mut self, targets: &[RecordedTexture]) -> Result<()> {
        for t in targets {
            self.live(t)?;
        }
        for t in targets {
            self.bump(t.id, None);
        }
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall<'_, RecordedTexture>) -> Result<()> {
        let mut inputs = Vec::with_capacity(call.inputs.len());
        for t in call.inputs {
            inputs.push((t.id, self.live(t)?.version));
        }

        let (targets, to_screen) = match call.target {
            DrawTarget::Textures(textures) => {
                for t in textures {
                    self.live(t)?;
                }
                let written = textures
                    .iter()
                    .map(|t| (t.id, self.bump(t.id, Some(call.program))))
                    .collect();
                (written, false)
            }
            DrawTarget::Screen => (Vec::new(), true),
        };

        self.draws.push(DrawRecord {
            label: call.label,
            program: call.program,
            inputs,
            targets,
            to_screen,
            primitive: call.primitive,
            blend: call.blend,
            load: call.load,
            uniforms: call.uniforms.to_vec(),
        });
        Ok(())
    }

    fn submit(&mut self) {
        self.submits += 1;
    }

    fn read_rgba8(&mut self, texture: &RecordedTexture) -> Result<Vec<u8>> {
        let state = self.live(texture)?;
        if state.spec.format != TexelFormat::Rgba8Unorm {
            return Err(Error::Gpu(format!(
                "readback of `{}` requires Rgba8Unorm, texture is {:?}",
                state.spec.label, state.spec.format
            )));
        }
        Ok(match &state.data {
            Some(data) => data.clone(),
            None => vec![(state.version & 0xff) as u8; state.spec.byte_len()],
        })
    }

    fn take_diagnostics(&mut self) -> Vec<String> {
        std::mem::take(&mut self.diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROGRAM: ProgramId = ProgramId("test.program");

    fn tex(backend: &mut RecordingBackend, w: u32, h: u32) -> RecordedTexture {
        backend
            .create_texture(&TextureSpec::new_2d("t", w, h, TexelFormat::Rgba8Unorm))
            .unwrap()
    }

    #[test]
    fn draw_records_read_and_written_versions() {
        let mut b = RecordingBackend::new();
        let src = tex(&mut b, 2, 2);
        let dst = tex(&mut b, 2, 2);
        b.clear(std::slice::from_ref(&src)).unwrap();
        let src_version = b.version(&src);

        let inputs = [&src];
        let targets = [dst.clone()];
        b.draw(&DrawCall::fullscreen("p", PROGRAM, DrawTarget::Textures(&targets)).inputs(&inputs))
            .unwrap();

        let record = &b.draws()[0];
        assert_eq!(record.reads(src.id()), Some(src_version));
        assert_eq!(record.writes(dst.id()), Some(b.version(&dst)));
        assert!(b.version(&dst) > src_version);
        assert_eq!(b.last_writer(&dst), Some(PROGRAM));
    }

    #[test]
    fn destroyed_texture_cannot_be_drawn() {
        let mut b = RecordingBackend::new();
        let t = tex(&mut b, 1, 1);
        b.destroy_texture(&t);
        let targets = [t.clone()];
        let err = b
            .draw(&DrawCall::fullscreen("p", PROGRAM, DrawTarget::Textures(&targets)))
            .unwrap_err();
        assert!(matches!(err, Error::Destroyed(_)));
        assert_eq!(b.live_textures(), 0);
    }

    #[test]
    fn partial_write_lands_in_the_right_rows() {
        let mut b = RecordingBackend::new();
        let spec = TextureSpec::new_2d("t", 2, 2, TexelFormat::Rgba8Unorm);
        let t = b.create_texture(&spec).unwrap();
        let region = TextureRegion {
            origin: [0, 1, 0],
            size: [2, 1, 1],
        };
        b.write_texture(&t, region, &[7; 8]).unwrap();

        let back = b.read_rgba8(&t).unwrap();
        assert_eq!(&back[..8], &[0; 8]);
        assert_eq!(&back[8..], &[7; 8]);
    }

    #[test]
    fn write_with_wrong_length_is_rejected() {
        let mut b = RecordingBackend::new();
        let t = tex(&mut b, 2, 2);
        let full = t.spec().full_region();
        assert!(b.write_texture(&t, full, &[0; 3]).is_err());
    }
}
