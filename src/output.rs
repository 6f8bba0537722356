//! Output consumers
//!
//! A [`FrameSink`] receives the rasters of every keyed frame. The bundled
//! [`PngSequenceSink`] writes the rasters selected by an [`OutputLayout`] as
//! numbered PNG files.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Deserialize;

use crate::error::Result;
use crate::frame::Frame;
use crate::keying::{HueClass, KeyOutputs};

/// Which rasters a sink publishes per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
pub enum OutputLayout {
    /// Three detection views and the combined view
    #[default]
    Combined,
    /// Three detection views and three masked views
    Gallery,
    /// Every raster
    All,
}

/// One raster of a keyed frame, identified for output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputView {
    Detection(HueClass),
    Masked(HueClass),
    Combined,
}

impl OutputView {
    /// File-name stem, e.g. `detect_blue`
    pub fn stem(&self) -> String {
        match self {
            OutputView::Detection(class) => format!("detect_{}", class),
            OutputView::Masked(class) => format!("masked_{}", class),
            OutputView::Combined => "combined".to_string(),
        }
    }

    pub fn select<'a>(&self, outputs: &'a KeyOutputs) -> &'a Frame {
        match *self {
            OutputView::Detection(class) => outputs.detection(class),
            OutputView::Masked(class) => outputs.masked(class),
            OutputView::Combined => outputs.combined(),
        }
    }
}

impl OutputLayout {
    /// Views published under this layout, in display order
    pub fn views(&self) -> Vec<OutputView> {
        let detection = HueClass::ALL.map(OutputView::Detection);
        let masked = HueClass::ALL.map(OutputView::Masked);
        let mut views: Vec<OutputView> = detection.to_vec();
        match self {
            OutputLayout::Combined => views.push(OutputView::Combined),
            OutputLayout::Gallery => views.extend(masked),
            OutputLayout::All => {
                views.extend(masked);
                views.push(OutputView::Combined);
            }
        }
        views
    }
}

/// Consumer of keyed frames
pub trait FrameSink {
    fn write(&mut self, index: u64, outputs: &KeyOutputs) -> Result<()>;
}

/// Writes each published view as `<stem>_<index>.png` into one directory
#[derive(Debug)]
pub struct PngSequenceSink {
    dir: PathBuf,
    views: Vec<OutputView>,
    written: u64,
}

impl PngSequenceSink {
    /// Create the output directory if needed
    pub fn new(dir: impl AsRef<Path>, layout: OutputLayout) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        tracing::info!(dir = %dir.display(), layout = ?layout, "Writing PNG sequence");
        Ok(Self {
            dir,
            views: layout.views(),
            written: 0,
        })
    }

    pub fn path_for(&self, view: OutputView, index: u64) -> PathBuf {
        self.dir.join(format!("{}_{:06}.png", view.stem(), index))
    }

    /// Number of frames written so far
    pub fn frames_written(&self) -> u64 {
        self.written
    }
}

impl FrameSink for PngSequenceSink {
    fn write(&mut self, index: u64, outputs: &KeyOutputs) -> Result<()> {
        let (width, height) = outputs.dimensions();
        if width == 0 || height == 0 {
            tracing::debug!(index, "Skipping empty frame");
            return Ok(());
        }

        self.views.par_iter().try_for_each(|view| -> Result<()> {
            let frame = view.select(outputs);
            image::save_buffer(
                self.path_for(*view, index),
                &frame.data,
                frame.width,
                frame.height,
                image::ColorType::Rgba8,
            )?;
            Ok(())
        })?;

        self.written += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keying::{composite, KeyConfig};
    use crate::source::tests::temp_dir;

    #[test]
    fn test_layout_views() {
        assert_eq!(OutputLayout::default(), OutputLayout::Combined);
        let combined = OutputLayout::Combined.views();
        assert_eq!(combined.len(), 4);
        assert_eq!(combined[0], OutputView::Detection(HueClass::Blue));
        assert_eq!(combined[3], OutputView::Combined);

        let gallery = OutputLayout::Gallery.views();
        assert_eq!(gallery.len(), 6);
        assert!(!gallery.contains(&OutputView::Combined));

        assert_eq!(OutputLayout::All.views().len(), 7);
    }

    #[test]
    fn test_view_stems() {
        assert_eq!(OutputView::Detection(HueClass::Yellow).stem(), "detect_yellow");
        assert_eq!(OutputView::Masked(HueClass::Red).stem(), "masked_red");
        assert_eq!(OutputView::Combined.stem(), "combined");
    }

    #[test]
    fn test_png_sink_writes_layout() {
        let dir = temp_dir("png_sink");
        let frame = Frame::filled(4, 3, [10, 10, 200, 255]);
        let outputs = composite(&frame, &KeyConfig::default()).unwrap();

        let mut sink = PngSequenceSink::new(dir.join("out"), OutputLayout::Combined).unwrap();
        sink.write(7, &outputs).unwrap();
        assert_eq!(sink.frames_written(), 1);

        let combined = image::open(dir.join("out").join("combined_000007.png"))
            .unwrap()
            .to_rgba8();
        assert_eq!(combined.dimensions(), (4, 3));
        assert_eq!(combined.get_pixel(0, 0).0, [10, 10, 200, 255]);
        assert!(dir.join("out").join("detect_red_000007.png").exists());
        assert!(!dir.join("out").join("masked_blue_000007.png").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_png_sink_skips_empty_frames() {
        let dir = temp_dir("png_sink_empty");
        let outputs = composite(&Frame::blank(0, 0), &KeyConfig::default()).unwrap();
        let mut sink = PngSequenceSink::new(&dir, OutputLayout::All).unwrap();
        sink.write(0, &outputs).unwrap();
        assert_eq!(sink.frames_written(), 0);
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
