use crate::backend::Backend;
use crate::error::{Error, Result};

use super::{allocate, destroyed, release, AttachmentSpec};

/// Two attachment sets with swappable read/write roles.
///
/// [`target`](Self::target) is the set written by the current pass,
/// [`attachments`](Self::attachments) the set holding the previous state.
/// They are never the same textures.
#[derive(Debug)]
pub struct DoubleBuffer<T> {
    label: &'static str,
    resolution: u32,
    sets: [Vec<T>; 2],
    read: usize,
    destroyed: bool,
}

impl<T: Clone> DoubleBuffer<T> {
    pub fn new<B: Backend<Texture = T>>(
        backend: &mut B,
        label: &'static str,
        resolution: u32,
        layout: &[AttachmentSpec],
    ) -> Result<Self> {
        let first = allocate(backend, label, resolution, layout)?;
        let second = match allocate(backend, label, resolution, layout) {
            Ok(set) => set,
            Err(e) => {
                release(backend, &first);
                return Err(e);
            }
        };
        Ok(Self {
            label,
            resolution,
            sets: [first, second],
            read: 0,
            destroyed: false,
        })
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Write set: the draw target of the current pass.
    pub fn target(&self) -> Result<&[T]> {
        self.live()?;
        Ok(&self.sets[self.read ^ 1])
    }

    /// Read set: state produced by the last pass before the latest swap.
    pub fn attachments(&self) -> Result<&[T]> {
        self.live()?;
        Ok(&self.sets[self.read])
    }

    pub fn attachment(&self, index: usize) -> Result<&T> {
        self.attachments()?
            .get(index)
            .ok_or(Error::MissingAttachment {
                buffer: self.label,
                index,
            })
    }

    /// Exchanges the read and write roles. No data moves.
    pub fn swap(&mut self) -> Result<()> {
        self.live()?;
        self.read ^= 1;
        Ok(())
    }

    pub fn destroy<B: Backend<Texture = T>>(&mut self, backend: &mut B) -> Result<()> {
        self.live()?;
        for set in &self.sets {
            release(backend, set);
        }
        self.destroyed = true;
        Ok(())
    }

    fn live(&self) -> Result<()> {
        if self.destroyed {
            return Err(destroyed(self.label));
        }
        Ok(())
    }
}
