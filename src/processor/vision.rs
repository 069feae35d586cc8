use crate::{Error, Result, engine::VideoMetadata};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

pub const FRAME_FACTOR: u32 = 2;
pub const TARGET_FPS: f64 = 2.0;
pub const FPS_MIN_FRAMES: u32 = 4;
pub const FPS_MAX_FRAMES: u32 = 768;
pub const VIDEO_MIN_TOKENS: u64 = 128;
pub const VIDEO_MAX_TOKENS: u64 = 768;
const MAX_ASPECT_RATIO: f64 = 200.0;

/// Reads stream metadata from a video file.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoProbe: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<VideoMetadata>;
}

/// `ffprobe` on PATH.
pub struct FfprobeProbe {
    program: String,
}

impl FfprobeProbe {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl VideoProbe for FfprobeProbe {
    async fn probe(&self, path: &Path) -> Result<VideoMetadata> {
        debug!("Probing {} with {}", path.display(), self.program);

        let output = Command::new(&self.program)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height,avg_frame_rate,r_frame_rate,nb_frames,duration:format=duration",
                "-of",
                "json",
            ])
            .arg(path)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::config(format!("{} not found on PATH", self.program))
                } else {
                    Error::inference(format!("Failed to run {}: {}", self.program, e))
                }
            })?;

        if !output.status.success() {
            return Err(Error::inference(format!(
                "{} failed on {}: {}",
                self.program,
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_ffprobe_json(&String::from_utf8_lossy(&output.stdout))
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    #[serde(default)]
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

fn parse_rate(rate: &str) -> Option<f64> {
    let value = match rate.split_once('/') {
        Some((num, den)) => {
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num.trim().parse::<f64>().ok()? / den
        }
        None => rate.trim().parse().ok()?,
    };
    (value > 0.0).then_some(value)
}

pub fn parse_ffprobe_json(json: &str) -> Result<VideoMetadata> {
    let probe: ProbeOutput = serde_json::from_str(json)?;
    let stream = probe
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| Error::inference("No video stream found"))?;

    let width = stream
        .width
        .ok_or_else(|| Error::inference("Video stream has no width"))?;
    let height = stream
        .height
        .ok_or_else(|| Error::inference("Video stream has no height"))?;

    let fps = stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_rate)
        .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_rate))
        .ok_or_else(|| Error::inference("Video stream has no usable frame rate"))?;

    let duration_secs = stream
        .duration
        .as_deref()
        .or(probe.format.as_ref().and_then(|f| f.duration.as_deref()))
        .and_then(|d| d.trim().parse::<f64>().ok())
        .unwrap_or(0.0);

    // Containers without a frame count (mkv, webm) report only a duration.
    let total_num_frames = match stream.nb_frames.as_deref().and_then(|n| n.parse().ok()) {
        Some(n) => n,
        None => (duration_secs * fps).round() as u32,
    };

    Ok(VideoMetadata {
        fps,
        total_num_frames,
        width,
        height,
        duration_secs,
    })
}

fn round_by_factor(n: f64, factor: u32) -> u32 {
    (n / factor as f64).round() as u32 * factor
}

fn ceil_by_factor(n: f64, factor: u32) -> u32 {
    (n / factor as f64).ceil() as u32 * factor
}

fn floor_by_factor(n: f64, factor: u32) -> u32 {
    (n / factor as f64).floor() as u32 * factor
}

/// Number of frames to sample: about two per second, even, between
/// `FPS_MIN_FRAMES` and `min(FPS_MAX_FRAMES, total_frames)`.
pub fn smart_nframes(total_frames: u32, video_fps: f64) -> Result<u32> {
    if total_frames < FRAME_FACTOR || video_fps <= 0.0 {
        return Err(Error::inference(format!(
            "Video too short to sample: {} frames at {} fps",
            total_frames, video_fps
        )));
    }

    let min_frames = ceil_by_factor(FPS_MIN_FRAMES as f64, FRAME_FACTOR) as f64;
    let max_frames = floor_by_factor(FPS_MAX_FRAMES.min(total_frames) as f64, FRAME_FACTOR) as f64;

    let nframes = (total_frames as f64 / video_fps * TARGET_FPS)
        .max(min_frames)
        .min(max_frames)
        .min(total_frames as f64);
    let nframes = floor_by_factor(nframes, FRAME_FACTOR);

    if !(FRAME_FACTOR..=total_frames).contains(&nframes) {
        return Err(Error::inference(format!(
            "nframes should be in [{}, {}], got {}",
            FRAME_FACTOR, total_frames, nframes
        )));
    }

    Ok(nframes)
}

/// Evenly spaced frame indices covering the whole clip.
pub fn frame_indices(total_frames: u32, nframes: u32) -> Vec<u32> {
    if nframes <= 1 || total_frames <= 1 {
        return vec![0; nframes as usize];
    }
    let last = (total_frames - 1) as f64;
    let step = last / (nframes - 1) as f64;
    (0..nframes)
        .map(|i| (i as f64 * step).round() as u32)
        .collect()
}

/// Resizes to multiples of `factor` while keeping the pixel count within
/// `[min_pixels, max_pixels]` and the aspect ratio roughly unchanged.
pub fn smart_resize(
    height: u32,
    width: u32,
    factor: u32,
    min_pixels: u64,
    max_pixels: u64,
) -> Result<(u32, u32)> {
    if height == 0 || width == 0 {
        return Err(Error::inference("Video has zero-sized frames"));
    }

    let (h, w) = (height as f64, width as f64);
    let ratio = h.max(w) / h.min(w);
    if ratio > MAX_ASPECT_RATIO {
        return Err(Error::inference(format!(
            "absolute aspect ratio must be smaller than {}, got {:.1}",
            MAX_ASPECT_RATIO, ratio
        )));
    }

    let mut h_bar = factor.max(round_by_factor(h, factor));
    let mut w_bar = factor.max(round_by_factor(w, factor));

    if h_bar as u64 * w_bar as u64 > max_pixels {
        let beta = (h * w / max_pixels as f64).sqrt();
        h_bar = factor.max(floor_by_factor(h / beta, factor));
        w_bar = factor.max(floor_by_factor(w / beta, factor));
    } else if (h_bar as u64 * w_bar as u64) < min_pixels {
        let beta = (min_pixels as f64 / (h * w)).sqrt();
        h_bar = ceil_by_factor(h * beta, factor);
        w_bar = ceil_by_factor(w * beta, factor);
    }

    Ok((h_bar, w_bar))
}
