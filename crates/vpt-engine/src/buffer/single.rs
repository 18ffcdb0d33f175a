use crate::backend::Backend;
use crate::error::{Error, Result};

use super::{allocate, destroyed, release, AttachmentSpec};

/// One set of color attachments at a fixed resolution.
#[derive(Debug)]
pub struct SingleBuffer<T> {
    label: &'static str,
    resolution: u32,
    attachments: Vec<T>,
    destroyed: bool,
}

impl<T: Clone> SingleBuffer<T> {
    pub fn new<B: Backend<Texture = T>>(
        backend: &mut B,
        label: &'static str,
        resolution: u32,
        layout: &[AttachmentSpec],
    ) -> Result<Self> {
        Ok(Self {
            label,
            resolution,
            attachments: allocate(backend, label, resolution, layout)?,
            destroyed: false,
        })
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Attachments to bind as the draw target, in attachment-index order.
    pub fn target(&self) -> Result<&[T]> {
        self.attachments()
    }

    /// Attachments to sample from.
    pub fn attachments(&self) -> Result<&[T]> {
        if self.destroyed {
            return Err(destroyed(self.label));
        }
        Ok(&self.attachments)
    }

    pub fn attachment(&self, index: usize) -> Result<&T> {
        self.attachments()?
            .get(index)
            .ok_or(Error::MissingAttachment {
                buffer: self.label,
                index,
            })
    }

    /// Releases every attachment. A second call fails and leaves the backend untouched.
    pub fn destroy<B: Backend<Texture = T>>(&mut self, backend: &mut B) -> Result<()> {
        if self.destroyed {
            return Err(destroyed(self.label));
        }
        release(backend, &self.attachments);
        self.destroyed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{RecordingBackend, TextureHandle};

    #[test]
    fn attachments_follow_layout_and_resolution() {
        let mut b = RecordingBackend::new();
        let buf = SingleBuffer::new(
            &mut b,
            "frame",
            64,
            &[AttachmentSpec::RGBA32F, AttachmentSpec::R32F],
        )
        .unwrap();

        let attachments = buf.attachments().unwrap();
        assert_eq!(attachments.len(), 2);
        for a in attachments {
            assert_eq!((a.spec().width, a.spec().height), (64, 64));
        }
        assert!(matches!(
            buf.attachment(2),
            Err(Error::MissingAttachment { index: 2, .. })
        ));
    }

    #[test]
    fn zero_resolution_is_rejected() {
        let mut b = RecordingBackend::new();
        let err = SingleBuffer::new(&mut b, "frame", 0, &[AttachmentSpec::RGBA32F]).unwrap_err();
        assert!(matches!(err, Error::InvalidResolution(0)));
        assert_eq!(b.live_textures(), 0);
    }

    #[test]
    fn double_destroy_fails_without_touching_backend() {
        let mut b = RecordingBackend::new();
        let mut buf = SingleBuffer::new(&mut b, "render", 8, &[AttachmentSpec::RGBA16F]).unwrap();
        buf.destroy(&mut b).unwrap();
        assert_eq!(b.live_textures(), 0);

        assert!(matches!(buf.destroy(&mut b), Err(Error::Destroyed("render"))));
        assert!(buf.target().is_err());
    }
}
