// src/frame_source.rs
//
// Still-frame input for the runner: finds frame files, decodes them, and
// cuts each camera frame into one vertical strip per lane.

use crate::types::RunnerConfig;
use anyhow::{bail, Context, Result};
use image::{imageops, GenericImage, RgbImage};
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

const FRAME_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

pub struct FrameSource {
    config: RunnerConfig,
}

impl FrameSource {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Frame files under `input_dir`, sorted by path so playback order is
    /// stable across runs.
    pub fn find_frame_files(&self) -> Result<Vec<PathBuf>> {
        let input_dir = Path::new(&self.config.input_dir);
        if !input_dir.is_dir() {
            bail!("input directory {} does not exist", input_dir.display());
        }

        let mut frames: Vec<PathBuf> = WalkDir::new(input_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && is_frame_file(e.path()))
            .map(|e| e.into_path())
            .collect();
        frames.sort();

        info!("Found {} frame files", frames.len());
        Ok(frames)
    }

    pub fn load(&self, path: &Path) -> Result<RgbImage> {
        let image = image::open(path).with_context(|| format!("decoding {}", path.display()))?;
        Ok(image.to_rgb8())
    }

    /// Write an annotated frame next to the other outputs. `None` when no
    /// output directory is configured.
    pub fn save_annotated(&self, input_path: &Path, annotated: &RgbImage) -> Result<Option<PathBuf>> {
        let Some(output_dir) = &self.config.output_dir else {
            return Ok(None);
        };

        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("creating output directory {}", output_dir))?;

        let stem = input_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("frame");
        let output_path = PathBuf::from(output_dir).join(format!("{}_annotated.png", stem));
        annotated
            .save(&output_path)
            .with_context(|| format!("writing {}", output_path.display()))?;
        Ok(Some(output_path))
    }
}

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Cut `frame` into `lanes` side-by-side strips of (near) equal width.
///
/// Strip `i` spans columns `i*w/n .. (i+1)*w/n`, so widths differ by at
/// most one pixel and every column lands in exactly one strip.
pub fn split_vertical_strips(frame: &RgbImage, lanes: usize) -> Vec<RgbImage> {
    if lanes == 0 {
        return Vec::new();
    }
    let (width, height) = frame.dimensions();
    let n = lanes as u64;
    (0..n)
        .map(|i| {
            let x0 = (i * width as u64 / n) as u32;
            let x1 = ((i + 1) * width as u64 / n) as u32;
            imageops::crop_imm(frame, x0, 0, x1 - x0, height).to_image()
        })
        .collect()
}

/// Inverse of `split_vertical_strips`: lay strips out left to right.
pub fn join_vertical_strips(strips: &[RgbImage]) -> Result<RgbImage> {
    let width = strips.iter().map(|s| s.width()).sum();
    let height = strips.iter().map(|s| s.height()).max().unwrap_or(0);

    let mut canvas = RgbImage::new(width, height);
    let mut x = 0;
    for strip in strips {
        canvas.copy_from(strip, x, 0).context("joining lane strips")?;
        x += strip.width();
    }
    Ok(canvas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("traffic_signal_core_{}_{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, _| Rgb([x as u8, 0, 0]))
    }

    #[test]
    fn test_split_covers_every_column_once() {
        let frame = gradient(10, 4);
        let strips = split_vertical_strips(&frame, 3);
        let widths: Vec<u32> = strips.iter().map(|s| s.width()).collect();
        assert_eq!(widths, vec![3, 3, 4]);
        assert!(strips.iter().all(|s| s.height() == 4));
        assert_eq!(strips[1].get_pixel(0, 0), &Rgb([3, 0, 0]));
        assert_eq!(strips[2].get_pixel(3, 2), &Rgb([9, 0, 0]));
    }

    #[test]
    fn test_split_into_zero_lanes_is_empty() {
        assert!(split_vertical_strips(&gradient(8, 8), 0).is_empty());
    }

    #[test]
    fn test_join_restores_frame() {
        let frame = gradient(17, 5);
        let strips = split_vertical_strips(&frame, 4);
        assert_eq!(join_vertical_strips(&strips).unwrap(), frame);
    }

    #[test]
    fn test_finds_only_frame_files_in_order() {
        let dir = scratch_dir("find");
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        gradient(4, 4).save(dir.join("b.png")).unwrap();
        gradient(4, 4).save(dir.join("nested").join("a.bmp")).unwrap();
        std::fs::rename(dir.join("nested").join("a.bmp"), dir.join("nested").join("a.BMP")).unwrap();
        std::fs::write(dir.join("notes.txt"), "not a frame").unwrap();

        let source = FrameSource::new(RunnerConfig {
            input_dir: dir.to_string_lossy().into_owned(),
            ..RunnerConfig::default()
        });
        let files = source.find_frame_files().unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["b.png", "a.BMP"]);

        let loaded = source.load(&files[0]).unwrap();
        assert_eq!(loaded.dimensions(), (4, 4));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_input_dir_is_an_error() {
        let source = FrameSource::new(RunnerConfig {
            input_dir: "/nonexistent/traffic_signal_core_frames".to_string(),
            ..RunnerConfig::default()
        });
        assert!(source.find_frame_files().is_err());
    }

    #[test]
    fn test_undecodable_file_is_an_error() {
        let dir = scratch_dir("decode");
        let bogus = dir.join("broken.png");
        std::fs::write(&bogus, b"not really a png").unwrap();

        let source = FrameSource::new(RunnerConfig::default());
        assert!(source.load(&bogus).is_err());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_save_annotated_respects_output_dir() {
        let dir = scratch_dir("save");
        let frame = gradient(6, 3);

        let disabled = FrameSource::new(RunnerConfig::default());
        assert_eq!(disabled.save_annotated(Path::new("x.png"), &frame).unwrap(), None);

        let enabled = FrameSource::new(RunnerConfig {
            output_dir: Some(dir.to_string_lossy().into_owned()),
            ..RunnerConfig::default()
        });
        let written = enabled
            .save_annotated(Path::new("frames/cam_0001.jpg"), &frame)
            .unwrap()
            .unwrap();
        assert_eq!(
            written.file_name().and_then(|n| n.to_str()),
            Some("cam_0001_annotated.png")
        );
        assert!(written.exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
