//! Frame classifier and compositor
//!
//! One call per video frame: every pixel is tested against each hue class,
//! and seven output rasters are rewritten from scratch:
//! - a detection view per class (source pixel where the class matches, black elsewhere)
//! - a masked view per class (fitted background where the class matches, black elsewhere)
//! - the combined view (source frame with the highest-priority matching background on top)

use std::sync::Arc;

use rayon::prelude::*;

use super::class::{HueClass, Sensitivity};
use super::config::{BackgroundImage, EmptyMaskMode, KeyConfig};
use super::cover::cover_fit;
use crate::error::{KeyError, Result};
use crate::frame::{byte_len, Frame, CHANNELS};

/// Output rasters of one compositing pass
#[derive(Debug, Clone)]
pub struct KeyOutputs {
    detection: [Frame; 3],
    masked: [Frame; 3],
    combined: Frame,
    backgrounds: [bool; 3],
}

impl KeyOutputs {
    fn new(width: u32, height: u32) -> Self {
        Self {
            detection: std::array::from_fn(|_| Frame::blank(width, height)),
            masked: std::array::from_fn(|_| Frame::blank(width, height)),
            combined: Frame::blank(width, height),
            backgrounds: [false; 3],
        }
    }

    fn reshape(&mut self, width: u32, height: u32) {
        for frame in self.detection.iter_mut().chain(self.masked.iter_mut()) {
            frame.reshape(width, height);
        }
        self.combined.reshape(width, height);
    }

    /// Source frame with non-matching pixels zeroed
    pub fn detection(&self, class: HueClass) -> &Frame {
        &self.detection[class.index()]
    }

    /// Background where the class matched, black elsewhere
    pub fn masked(&self, class: HueClass) -> &Frame {
        &self.masked[class.index()]
    }

    /// All masked backgrounds merged over the source frame by priority
    pub fn combined(&self) -> &Frame {
        &self.combined
    }

    /// Whether the class had a background image during this pass
    pub fn background_present(&self, class: HueClass) -> bool {
        self.backgrounds[class.index()]
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.combined.dimensions()
    }
}

/// Background already scaled to the current frame size
struct FittedBackground {
    source: Arc<BackgroundImage>,
    frame: Frame,
}

/// Per-frame keyer holding only its working buffers
///
/// The frame size is locked by the first processed frame; call [`Compositor::reset`]
/// when a new session starts with a different source.
pub struct Compositor {
    size: Option<(u32, u32)>,
    outputs: KeyOutputs,
    fitted: [Option<FittedBackground>; 3],
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new()
    }
}

impl Compositor {
    pub fn new() -> Self {
        Self {
            size: None,
            outputs: KeyOutputs::new(0, 0),
            fitted: [None, None, None],
        }
    }

    /// Forget the session frame size and cached backgrounds
    pub fn reset(&mut self) {
        self.size = None;
        self.fitted = [None, None, None];
    }

    /// Frame size of the current session, if any frame was processed
    pub fn size(&self) -> Option<(u32, u32)> {
        self.size
    }

    /// Outputs of the most recent pass
    pub fn outputs(&self) -> &KeyOutputs {
        &self.outputs
    }

    /// Key one frame with a configuration snapshot
    pub fn process(&mut self, frame: &Frame, config: &KeyConfig) -> Result<&KeyOutputs> {
        let (width, height) = frame.dimensions();
        if frame.data.len() != byte_len(width, height) {
            return Err(KeyError::InvalidFrame {
                width,
                height,
                len: frame.data.len(),
            });
        }

        match self.size {
            Some(size) if size != (width, height) => {
                return Err(KeyError::DimensionMismatch {
                    expected: size,
                    found: (width, height),
                });
            }
            Some(_) => {}
            None => {
                tracing::info!(width, height, "Compositor session started");
                self.size = Some((width, height));
                self.outputs.reshape(width, height);
            }
        }

        self.refresh_backgrounds(config, width, height)?;

        for class in HueClass::ALL {
            self.outputs.backgrounds[class.index()] = self.fitted[class.index()].is_some();
        }

        if frame.is_empty() {
            return Ok(&self.outputs);
        }

        let sensitivities = HueClass::ALL.map(|class| config.sensitivity(class));
        let Self { outputs, fitted, .. } = self;
        let backgrounds: [Option<&[u8]>; 3] =
            std::array::from_fn(|i| fitted[i].as_ref().map(|f| f.frame.data.as_slice()));

        key_frame(
            frame,
            &sensitivities,
            &backgrounds,
            config.empty_mask,
            outputs,
        );

        Ok(&self.outputs)
    }

    /// Re-fit backgrounds whose image or target size changed; drop removed ones
    fn refresh_backgrounds(&mut self, config: &KeyConfig, width: u32, height: u32) -> Result<()> {
        for class in HueClass::ALL {
            let slot = &mut self.fitted[class.index()];
            let Some(background) = config.background(class) else {
                if slot.take().is_some() {
                    tracing::debug!(class = %class, "Background removed");
                }
                continue;
            };

            let current = slot.as_ref().is_some_and(|f| {
                Arc::ptr_eq(&f.source, background) && f.frame.dimensions() == (width, height)
            });
            if current {
                continue;
            }

            if width == 0 || height == 0 {
                *slot = Some(FittedBackground {
                    source: background.clone(),
                    frame: Frame::blank(width, height),
                });
                continue;
            }

            let frame = cover_fit(background.image(), width, height)?;
            tracing::debug!(
                class = %class,
                source = background.label(),
                width,
                height,
                "Fitted background"
            );
            *slot = Some(FittedBackground {
                source: background.clone(),
                frame,
            });
        }
        Ok(())
    }
}

/// Key a frame in one call without keeping buffers around
pub fn composite(frame: &Frame, config: &KeyConfig) -> Result<KeyOutputs> {
    let mut compositor = Compositor::new();
    compositor.process(frame, config)?;
    Ok(compositor.outputs)
}

/// Row-parallel pass over the whole frame. All slices share the frame size.
fn key_frame(
    source: &Frame,
    sensitivities: &[Sensitivity; 3],
    backgrounds: &[Option<&[u8]>; 3],
    empty_mask: EmptyMaskMode,
    outputs: &mut KeyOutputs,
) {
    let row_bytes = source.width as usize * CHANNELS;
    let [det_blue, det_red, det_yellow] = &mut outputs.detection;
    let [mask_blue, mask_red, mask_yellow] = &mut outputs.masked;

    (
        source.data.par_chunks(row_bytes),
        det_blue.data.par_chunks_mut(row_bytes),
        det_red.data.par_chunks_mut(row_bytes),
        det_yellow.data.par_chunks_mut(row_bytes),
        mask_blue.data.par_chunks_mut(row_bytes),
        mask_red.data.par_chunks_mut(row_bytes),
        mask_yellow.data.par_chunks_mut(row_bytes),
        outputs.combined.data.par_chunks_mut(row_bytes),
    )
        .into_par_iter()
        .enumerate()
        .for_each(|(y, (src, db, dr, dy, mb, mr, my, combined))| {
            let start = y * row_bytes;
            let bg_rows: [Option<&[u8]>; 3] =
                std::array::from_fn(|i| backgrounds[i].map(|bg| &bg[start..start + row_bytes]));
            key_row(
                src,
                sensitivities,
                &bg_rows,
                empty_mask,
                [db, dr, dy],
                [mb, mr, my],
                combined,
            );
        });
}

fn key_row(
    src: &[u8],
    sensitivities: &[Sensitivity; 3],
    backgrounds: &[Option<&[u8]>; 3],
    empty_mask: EmptyMaskMode,
    mut detection: [&mut [u8]; 3],
    mut masked: [&mut [u8]; 3],
    combined: &mut [u8],
) {
    for i in (0..src.len()).step_by(CHANNELS) {
        let px = &src[i..i + CHANNELS];
        let (r, g, b) = (px[0], px[1], px[2]);
        let mut winner: Option<HueClass> = None;

        for class in HueClass::ALL {
            let c = class.index();
            let hit = class.matches(r, g, b, sensitivities[c]);

            let det = &mut detection[c][i..i + CHANNELS];
            if hit {
                det.copy_from_slice(px);
            } else {
                det[..3].fill(0);
                det[3] = px[3];
            }

            let out = &mut masked[c][i..i + CHANNELS];
            match backgrounds[c] {
                Some(bg) => {
                    if hit {
                        out[..3].copy_from_slice(&bg[i..i + 3]);
                        if winner.map_or(true, |w| class.priority() < w.priority()) {
                            winner = Some(class);
                        }
                    } else {
                        out[..3].fill(0);
                    }
                    out[3] = 255;
                }
                None => match empty_mask {
                    EmptyMaskMode::Black => out.copy_from_slice(&[0, 0, 0, 255]),
                    EmptyMaskMode::Video => out.copy_from_slice(px),
                },
            }
        }

        let dst = &mut combined[i..i + CHANNELS];
        match winner {
            Some(class) => {
                dst[..3].copy_from_slice(&masked[class.index()][i..i + 3]);
                dst[3] = px[3];
            }
            None => dst.copy_from_slice(px),
        }
    }
}
