//! Frame sources
//!
//! Anything that yields RGBA frames to the keying loop: a live camera (see
//! [`crate::camera`]) or a directory of still images played back in order.

use std::path::{Path, PathBuf};

use crate::error::{KeyError, Result};
use crate::frame::Frame;

/// Extensions recognised as image frames
const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Producer of video frames
pub trait FrameSource: Send {
    /// The next frame, if one is ready.
    ///
    /// `Ok(None)` means no new frame this tick for live sources, or the end
    /// of the stream for finite ones.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Short description for logs
    fn name(&self) -> String;

    /// True once a finite source has delivered its last frame
    fn is_exhausted(&self) -> bool {
        false
    }
}

/// Numbered still images played back as a video stream
#[derive(Debug)]
pub struct ImageSequence {
    dir: PathBuf,
    files: Vec<PathBuf>,
    position: usize,
    looping: bool,
}

impl ImageSequence {
    /// Collect every image in `dir`, sorted by file name
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_image_file(path))
            .collect();
        files.sort();

        tracing::info!(dir = %dir.display(), frames = files.len(), "Opened image sequence");

        Ok(Self {
            dir: dir.to_path_buf(),
            files,
            position: 0,
            looping: false,
        })
    }

    /// Restart from the first image after the last one
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

impl FrameSource for ImageSequence {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.position >= self.files.len() {
            if !self.looping || self.files.is_empty() {
                return Ok(None);
            }
            self.position = 0;
        }

        let path = &self.files[self.position];
        self.position += 1;

        let image = image::open(path)?.to_rgba8();
        if image.width() == 0 || image.height() == 0 {
            return Err(KeyError::EmptyImage);
        }
        tracing::trace!(path = %path.display(), "Decoded frame");
        Ok(Some(Frame::from(image)))
    }

    fn name(&self) -> String {
        format!("image sequence {}", self.dir.display())
    }

    fn is_exhausted(&self) -> bool {
        self.files.is_empty() || (!self.looping && self.position >= self.files.len())
    }
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    /// Fresh per-test directory under the system temp dir
    pub(crate) fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("hue_key_{}_{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_png(path: &Path, rgba: [u8; 4]) {
        RgbaImage::from_pixel(3, 2, Rgba(rgba)).save(path).unwrap();
    }

    #[test]
    fn test_sequence_order_and_end() {
        let dir = temp_dir("sequence_order");
        write_png(&dir.join("frame_002.png"), [2, 2, 2, 255]);
        write_png(&dir.join("frame_001.png"), [1, 1, 1, 255]);
        std::fs::write(dir.join("notes.txt"), "not an image").unwrap();

        let mut seq = ImageSequence::open(&dir).unwrap();
        assert_eq!(seq.len(), 2);

        let first = seq.next_frame().unwrap().unwrap();
        assert_eq!(first.dimensions(), (3, 2));
        assert_eq!(first.pixel(0, 0), Some([1, 1, 1, 255]));
        let second = seq.next_frame().unwrap().unwrap();
        assert_eq!(second.pixel(0, 0), Some([2, 2, 2, 255]));
        assert!(seq.is_exhausted());
        assert!(seq.next_frame().unwrap().is_none());
        assert!(seq.next_frame().unwrap().is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_sequence_looping() {
        let dir = temp_dir("sequence_loop");
        write_png(&dir.join("a.png"), [9, 9, 9, 255]);

        let mut seq = ImageSequence::open(&dir).unwrap().looping(true);
        for _ in 0..3 {
            assert!(seq.next_frame().unwrap().is_some());
        }
        assert!(!seq.is_exhausted());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_empty_directory() {
        let dir = temp_dir("sequence_empty");
        let mut seq = ImageSequence::open(&dir).unwrap().looping(true);
        assert!(seq.is_empty());
        assert!(seq.is_exhausted());
        assert!(seq.next_frame().unwrap().is_none());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_directory() {
        let dir = std::env::temp_dir().join("hue_key_no_such_sequence_dir");
        assert!(matches!(ImageSequence::open(&dir), Err(KeyError::Io(_))));
    }

    #[test]
    fn test_extension_filter() {
        assert!(is_image_file(Path::new("a.PNG")));
        assert!(is_image_file(Path::new("b.jpeg")));
        assert!(!is_image_file(Path::new("c.gif")));
        assert!(!is_image_file(Path::new("noext")));
    }
}
