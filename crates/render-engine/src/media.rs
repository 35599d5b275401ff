//! ffmpeg-backed source and sink.
//!
//! Decoding and encoding run in external `ffmpeg` processes exchanging raw
//! RGBA over pipes. Both binaries must be on `PATH`.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;

use glide_common::error::{GlideError, GlideResult};
use glide_processing_core::source::VideoSource;
use glide_project_model::project::{ExportConfig, ExportFormat};
use image::RgbaImage;

use crate::export::{ExportArtifact, FrameSink};

pub fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

fn require_binary(binary: &str) -> GlideResult<()> {
    if command_exists(binary) {
        Ok(())
    } else {
        Err(GlideError::unsupported(format!(
            "{binary} not found (expected in PATH)"
        )))
    }
}

/// Basic stream facts reported by ffprobe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeInfo {
    pub width: u32,
    pub height: u32,
    pub duration_secs: f64,
    pub fps: f64,
}

/// Read dimensions, duration and frame rate of the first video stream.
pub fn probe_video(path: &Path) -> GlideResult<ProbeInfo> {
    require_binary("ffprobe")?;
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,avg_frame_rate:format=duration",
            "-of",
            "default=noprint_wrappers=1",
        ])
        .arg(path)
        .output()
        .map_err(|e| GlideError::media(format!("Failed to run ffprobe: {e}")))?;

    if !output.status.success() {
        return Err(GlideError::media(format!(
            "ffprobe failed on {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    parse_probe_output(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
        GlideError::media(format!("Could not read video stream of {}", path.display()))
    })
}

fn parse_probe_output(raw: &str) -> Option<ProbeInfo> {
    let mut width = None;
    let mut height = None;
    let mut duration = None;
    let mut fps = None;
    for line in raw.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        match key {
            "width" => width = value.parse::<u32>().ok(),
            "height" => height = value.parse::<u32>().ok(),
            "duration" => duration = value.parse::<f64>().ok(),
            "avg_frame_rate" => fps = parse_frame_rate(value),
            _ => {}
        }
    }

    let (width, height) = (width?, height?);
    if width == 0 || height == 0 {
        return None;
    }
    Some(ProbeInfo {
        width,
        height,
        duration_secs: duration.filter(|d| d.is_finite() && *d > 0.0)?,
        fps: fps.unwrap_or(30.0),
    })
}

/// Parse `30000/1001` or `30` into frames per second.
fn parse_frame_rate(value: &str) -> Option<f64> {
    let rate = match value.split_once('/') {
        Some((num, den)) => {
            let den = den.parse::<f64>().ok()?;
            if den == 0.0 {
                return None;
            }
            num.parse::<f64>().ok()? / den
        }
        None => value.parse::<f64>().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

/// Running decoder emitting consecutive frames from a start time.
struct DecodeStream {
    child: Child,
    stdout: ChildStdout,
    next_time: f64,
}

impl Drop for DecodeStream {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Decodes a media file through ffmpeg.
///
/// Reading frames at successive positions one frame apart reuses a single
/// decoder process. Any other seek restarts it at the new position.
pub struct FfmpegVideoSource {
    path: PathBuf,
    info: ProbeInfo,
    decode_fps: f64,
    position: f64,
    stream: Option<DecodeStream>,
}

impl FfmpegVideoSource {
    pub fn open(path: impl Into<PathBuf>) -> GlideResult<Self> {
        let path = path.into();
        require_binary("ffmpeg")?;
        let info = probe_video(&path)?;
        tracing::debug!(
            path = %path.display(),
            width = info.width,
            height = info.height,
            duration_secs = info.duration_secs,
            fps = info.fps,
            "Opened video source"
        );
        Ok(Self {
            path,
            decode_fps: info.fps,
            info,
            position: 0.0,
            stream: None,
        })
    }

    pub fn info(&self) -> ProbeInfo {
        self.info
    }

    /// Rate at which the sequential decoder emits frames. Export sets this
    /// to the output frame rate.
    pub fn set_decode_fps(&mut self, fps: u32) {
        self.decode_fps = fps.max(1) as f64;
        self.stream = None;
    }

    /// Start time of the last frame the decoder can produce. Seeking to the
    /// container duration itself yields end-of-stream.
    fn last_frame_time(&self) -> f64 {
        (self.info.duration_secs - 1.0 / self.decode_fps.max(1.0)).max(0.0)
    }

    fn frame_len(&self) -> usize {
        self.info.width as usize * self.info.height as usize * 4
    }

    fn spawn_stream(&self, start: f64) -> GlideResult<DecodeStream> {
        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-ss", &format!("{start:.6}"), "-i"])
            .arg(&self.path)
            .args([
                "-vf",
                &format!("fps={}", self.decode_fps),
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| GlideError::media(format!("Failed to start ffmpeg decoder: {e}")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| GlideError::media("Failed to capture ffmpeg stdout"))?;
        tracing::trace!(start, fps = self.decode_fps, "Decoder started");
        Ok(DecodeStream {
            child,
            stdout,
            next_time: start,
        })
    }
}

impl VideoSource for FfmpegVideoSource {
    fn dimensions(&self) -> (u32, u32) {
        (self.info.width, self.info.height)
    }

    fn duration(&self) -> f64 {
        self.info.duration_secs
    }

    fn position(&self) -> f64 {
        self.position
    }

    fn seek(&mut self, time: f64) -> GlideResult<()> {
        if !time.is_finite() {
            return Err(GlideError::media(format!("cannot seek to {time}")));
        }
        self.position = time.clamp(0.0, self.last_frame_time());
        Ok(())
    }

    fn read_frame(&mut self) -> GlideResult<RgbaImage> {
        let half_frame = 0.5 / self.decode_fps;
        let reusable = self
            .stream
            .as_ref()
            .is_some_and(|s| (s.next_time - self.position).abs() < half_frame);
        if !reusable {
            self.stream = Some(self.spawn_stream(self.position)?);
        }

        let len = self.frame_len();
        let step = 1.0 / self.decode_fps;
        let position = self.position;
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| GlideError::media("decoder is not running"))?;

        let mut buf = vec![0u8; len];
        if let Err(err) = stream.stdout.read_exact(&mut buf) {
            self.stream = None;
            return Err(GlideError::media(format!(
                "No frame at {position:.3}s: {err}"
            )));
        }
        stream.next_time = position + step;

        RgbaImage::from_raw(self.info.width, self.info.height, buf)
            .ok_or_else(|| GlideError::media("decoded frame has the wrong size"))
    }
}

/// Encoder arguments for a container format.
pub fn codec_args_for_config(config: &ExportConfig) -> Vec<String> {
    let video_bitrate = format!("{}k", config.video_bitrate_kbps.max(1000));

    match config.format {
        ExportFormat::Mp4H264 => vec![
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            "medium".to_string(),
            "-profile:v".to_string(),
            "high".to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-b:v".to_string(),
            video_bitrate,
            "-movflags".to_string(),
            "+faststart".to_string(),
        ],
        ExportFormat::Mp4H265 => vec![
            "-c:v".to_string(),
            "libx265".to_string(),
            "-preset".to_string(),
            "medium".to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-b:v".to_string(),
            video_bitrate,
            "-movflags".to_string(),
            "+faststart".to_string(),
        ],
        ExportFormat::Gif => vec![
            "-vf".to_string(),
            "fps=15,split[s0][s1];[s0]palettegen[p];[s1][p]paletteuse".to_string(),
        ],
        ExportFormat::Webm => vec![
            "-c:v".to_string(),
            "libvpx-vp9".to_string(),
            "-b:v".to_string(),
            video_bitrate,
        ],
        ExportFormat::PngSequence => vec![],
    }
}

/// Streams raw RGBA frames into an ffmpeg encoder.
pub struct FfmpegSink {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr_task: Option<JoinHandle<String>>,
    output: PathBuf,
    width: u32,
    height: u32,
}

impl FfmpegSink {
    pub fn spawn(config: &ExportConfig, output: &Path) -> GlideResult<Self> {
        if config.format == ExportFormat::PngSequence {
            return Err(GlideError::unsupported(
                "png-sequence output is written without ffmpeg",
            ));
        }
        require_binary("ffmpeg")?;

        let mut args: Vec<String> = vec![
            "-y".to_string(),
            "-v".to_string(),
            "error".to_string(),
            "-f".to_string(),
            "rawvideo".to_string(),
            "-pix_fmt".to_string(),
            "rgba".to_string(),
            "-s".to_string(),
            format!("{}x{}", config.width, config.height),
            "-r".to_string(),
            config.fps.max(1).to_string(),
            "-i".to_string(),
            "pipe:0".to_string(),
        ];
        args.extend(codec_args_for_config(config));
        args.push(output.display().to_string());

        tracing::debug!(args = ?args, "Running ffmpeg");
        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| GlideError::render(format!("Failed to start ffmpeg: {e}")))?;

        tracing::info!(pid = child.id(), output = %output.display(), "ffmpeg encoder started");

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| GlideError::render("Failed to capture ffmpeg stdin"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| GlideError::render("Failed to capture ffmpeg stderr"))?;

        Ok(Self {
            child,
            stdin: Some(stdin),
            stderr_task: Some(drain_stderr(stderr)),
            output: output.to_path_buf(),
            width: config.width,
            height: config.height,
        })
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        // never finalized: abandon the partial output
        if self.stdin.take().is_some() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

// Drain stderr concurrently so ffmpeg never blocks on a full pipe.
fn drain_stderr(mut stderr: ChildStderr) -> JoinHandle<String> {
    std::thread::spawn(move || {
        let mut output = String::new();
        match stderr.read_to_string(&mut output) {
            Ok(_) => output,
            Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
        }
    })
}

impl FrameSink for FfmpegSink {
    fn push(&mut self, frame: &RgbaImage, time: f64) -> GlideResult<()> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(GlideError::render(format!(
                "frame at {time:.3}s is {}x{}, encoder expects {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| GlideError::render("ffmpeg stdin already closed"))?;
        stdin
            .write_all(frame.as_raw())
            .map_err(|e| GlideError::render(format!("Failed writing frame to ffmpeg: {e}")))
    }

    fn finalize(mut self: Box<Self>) -> GlideResult<ExportArtifact> {
        // closing stdin signals end of input
        drop(self.stdin.take());

        let status = self
            .child
            .wait()
            .map_err(|e| GlideError::render(format!("Failed to wait on ffmpeg: {e}")))?;
        let stderr_output = self
            .stderr_task
            .take()
            .map(|task| {
                task.join()
                    .unwrap_or_else(|_| "<failed to join stderr reader>".to_string())
            })
            .unwrap_or_default();

        if !status.success() {
            return Err(GlideError::render(format!(
                "ffmpeg export failed (status {}): {}",
                status,
                stderr_output.trim()
            )));
        }

        let bytes = std::fs::metadata(&self.output).map(|m| m.len()).unwrap_or(0);
        tracing::info!(output = %self.output.display(), bytes, "ffmpeg encoder finished");
        Ok(ExportArtifact::File {
            path: self.output.clone(),
            bytes,
        })
    }
}
