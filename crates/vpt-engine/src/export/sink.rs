use std::cell::RefCell;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, RgbaImage};

use crate::error::Result;

use super::{AnimationOptions, OutputKind};

/// Destination of captured frames.
pub trait FrameSink {
    fn write_frame(&mut self, index: u32, image: RgbaImage) -> Result<()>;

    /// Flushes and closes the output.
    fn finish(self: Box<Self>) -> Result<()>;
}

/// Writes `frameNNNN.png` files into a directory.
#[derive(Debug)]
pub struct ImageSequenceSink {
    dir: PathBuf,
}

impl ImageSequenceSink {
    /// Creates `dir` (and parents) if missing.
    pub fn create(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn frame_path(&self, index: u32) -> PathBuf {
        self.dir.join(format!("frame{index:04}.png"))
    }
}

impl FrameSink for ImageSequenceSink {
    fn write_frame(&mut self, index: u32, image: RgbaImage) -> Result<()> {
        let path = self.frame_path(index);
        image.save_with_format(&path, image::ImageFormat::Png)?;
        log::debug!("wrote {}", path.display());
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

struct GifFile {
    writer: BufWriter<File>,
    error: Option<io::Error>,
}

/// Output shared between the encoder and its sink. The encoder writes the
/// trailer when dropped and swallows errors there, so failures are kept here.
#[derive(Clone)]
struct SharedGifFile(Rc<RefCell<GifFile>>);

impl SharedGifFile {
    fn record<T>(file: &mut GifFile, result: io::Result<T>) -> io::Result<T> {
        if let Err(e) = &result {
            file.error
                .get_or_insert_with(|| io::Error::new(e.kind(), e.to_string()));
        }
        result
    }
}

impl Write for SharedGifFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut file = self.0.borrow_mut();
        let result = file.writer.write(buf);
        Self::record(&mut file, result)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut file = self.0.borrow_mut();
        let result = file.writer.flush();
        Self::record(&mut file, result)
    }
}

/// Encodes frames into one animated GIF as they arrive.
pub struct GifSink {
    encoder: GifEncoder<SharedGifFile>,
    output: SharedGifFile,
    delay: Delay,
}

impl GifSink {
    pub fn create(path: &Path, frame_delay_ms: u32) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let output = SharedGifFile(Rc::new(RefCell::new(GifFile {
            writer: BufWriter::new(File::create(path)?),
            error: None,
        })));
        let mut encoder = GifEncoder::new(output.clone());
        encoder.set_repeat(Repeat::Infinite)?;
        Ok(Self {
            encoder,
            output,
            delay: Delay::from_numer_denom_ms(frame_delay_ms, 1),
        })
    }
}

impl FrameSink for GifSink {
    fn write_frame(&mut self, _index: u32, image: RgbaImage) -> Result<()> {
        self.encoder
            .encode_frame(Frame::from_parts(image, 0, 0, self.delay))?;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<()> {
        let GifSink {
            encoder, output, ..
        } = *self;
        // Writes the trailer.
        drop(encoder);

        let mut file = output.0.borrow_mut();
        if let Some(e) = file.error.take() {
            return Err(e.into());
        }
        file.writer.flush()?;
        Ok(())
    }
}

/// Opens the sink for `options`. The output type is validated before anything
/// touches the file system.
pub fn open_sink(options: &AnimationOptions, destination: &Path) -> Result<Box<dyn FrameSink>> {
    Ok(match options.validate()? {
        OutputKind::Images => Box::new(ImageSequenceSink::create(destination)?),
        OutputKind::Video => Box::new(GifSink::create(destination, options.frame_delay_ms())?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn image_sequence_names_frames_with_four_digits() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/out");
        let mut sink = ImageSequenceSink::create(&out).unwrap();
        sink.write_frame(7, RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255])))
            .unwrap();

        let saved = image::open(out.join("frame0007.png")).unwrap().to_rgba8();
        assert_eq!(saved.get_pixel(1, 1), &Rgba([1, 2, 3, 255]));
    }

    #[test]
    fn gif_sink_writes_a_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.gif");
        let mut sink: Box<dyn FrameSink> = Box::new(GifSink::create(&path, 100).unwrap());
        for i in 0..3 {
            sink.write_frame(i, RgbaImage::from_pixel(4, 4, Rgba([i as u8 * 80, 0, 0, 255])))
                .unwrap();
        }
        sink.finish().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..6], b"GIF89a");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn gif_finish_reports_write_failures() {
        // Every write to /dev/full fails with ENOSPC; small frames stay buffered
        // until the final flush.
        let full = Path::new("/dev/full");
        if !full.exists() {
            return;
        }
        let mut sink: Box<dyn FrameSink> = Box::new(GifSink::create(full, 100).unwrap());
        sink.write_frame(0, RgbaImage::from_pixel(2, 2, Rgba([9, 9, 9, 255])))
            .unwrap();
        assert!(matches!(sink.finish(), Err(crate::error::Error::Io(_))));
    }

    #[test]
    fn bogus_type_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("never");
        let options = AnimationOptions {
            output: "bogus".to_string(),
            ..AnimationOptions::default()
        };
        assert!(open_sink(&options, &target).is_err());
        assert!(!target.exists());
    }
}
