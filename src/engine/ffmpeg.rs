//! ffmpeg/ffprobe implementation of [`TranscodeEngine`].

use async_trait::async_trait;
use super::{CutJob, CutStrategy, RunningCut, TranscodeEngine};
use crate::constants::export::STDERR_TAIL_BYTES;
use crate::constants::tools::{FFMPEG, FFPROBE};
use crate::error::{Error, Result};
use crate::probe::{AudioFormatInfo, probe_with_ffprobe};
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};

/// Engine backed by the `ffmpeg` and `ffprobe` executables.
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    ffmpeg: String,
    ffprobe: String,
}

impl FfmpegEngine {
    /// Engine using the given executables.
    pub fn new(ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::new(FFMPEG, FFPROBE)
    }
}

#[async_trait]
impl TranscodeEngine for FfmpegEngine {
    fn tool_name(&self) -> &str {
        &self.ffmpeg
    }

    async fn probe(&self, path: &Path) -> Result<AudioFormatInfo> {
        probe_with_ffprobe(&self.ffprobe, path).await
    }

    fn spawn_cut(&self, job: &CutJob) -> Result<RunningCut> {
        let args = cut_args(job);
        debug!("Running: {} {}", self.ffmpeg, args.join(" "));

        let mut child = Command::new(&self.ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::ToolNotFound {
                        tool: self.ffmpeg.clone(),
                    }
                } else {
                    Error::Io(e)
                }
            })?;

        let stdout = child.stdout.take().ok_or_else(|| Error::Internal {
            message: "ffmpeg stdout was not captured".to_string(),
        })?;
        let stderr = child.stderr.take().ok_or_else(|| Error::Internal {
            message: "ffmpeg stderr was not captured".to_string(),
        })?;

        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = oneshot::channel();
        let (kill_tx, kill_rx) = oneshot::channel();

        let tool = self.ffmpeg.clone();
        let duration = job.duration;

        tokio::spawn(async move {
            let progress_task = tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    trace!("ffmpeg progress: {line}");
                    if let Some(percent) = parse_progress_line(&line, duration) {
                        // Receiver may already be gone after cancellation.
                        let _ = progress_tx.send(percent);
                    }
                }
            });
            let stderr_task = tokio::spawn(read_tail(stderr));

            let result = wait_or_kill(&mut child, kill_rx).await;
            let stderr_tail = stderr_task.await.unwrap_or_default();
            let _ = progress_task.await;

            let outcome = match result {
                Exit::Finished(status) if status.success() => Ok(()),
                Exit::Finished(status) => Err(Error::Subprocess {
                    tool,
                    message: if stderr_tail.is_empty() {
                        format!("exited with {status}")
                    } else {
                        stderr_tail
                    },
                }),
                Exit::Killed => Err(Error::Subprocess {
                    tool,
                    message: "process was killed".to_string(),
                }),
                Exit::WaitFailed(e) => Err(Error::Io(e)),
            };

            let _ = done_tx.send(outcome);
        });

        Ok(RunningCut {
            progress: progress_rx,
            done: done_rx,
            kill: kill_tx,
        })
    }
}

enum Exit {
    Finished(ExitStatus),
    Killed,
    WaitFailed(std::io::Error),
}

async fn wait_or_kill(child: &mut Child, mut kill_rx: oneshot::Receiver<()>) -> Exit {
    tokio::select! {
        status = child.wait() => match status {
            Ok(status) => Exit::Finished(status),
            Err(e) => Exit::WaitFailed(e),
        },
        // A dropped sender yields Err and disables this branch.
        Ok(()) = &mut kill_rx => {
            if let Err(e) = child.kill().await {
                debug!("Failed to kill ffmpeg: {e}");
            }
            Exit::Killed
        }
    }
}

/// Read a stream to the end, keeping only the last [`STDERR_TAIL_BYTES`].
async fn read_tail<R: AsyncRead + Unpin>(mut reader: R) -> String {
    let mut buf = Vec::new();
    if let Err(e) = reader.read_to_end(&mut buf).await {
        debug!("Failed to read ffmpeg stderr: {e}");
    }
    let start = buf.len().saturating_sub(STDERR_TAIL_BYTES);
    String::from_utf8_lossy(&buf[start..]).trim().to_string()
}

/// Build the ffmpeg argument list for a cut.
///
/// The seek goes before `-i` so ffmpeg seeks the input instead of decoding
/// up to the start point.
pub fn cut_args(job: &CutJob) -> Vec<String> {
    let mut args: Vec<String> = ["-hide_banner", "-nostdin", "-y"]
        .map(String::from)
        .to_vec();
    args.extend([
        "-ss".to_string(),
        format_seconds(job.start),
        "-t".to_string(),
        format_seconds(job.duration),
        "-i".to_string(),
        job.input.to_string_lossy().into_owned(),
        "-vn".to_string(),
    ]);

    match &job.strategy {
        CutStrategy::Copy => {
            args.extend(["-c", "copy"].map(String::from));
        }
        CutStrategy::Mp3 { bitrate } => {
            args.extend(["-c:a", "libmp3lame", "-b:a"].map(String::from));
            args.push(bitrate.clone());
        }
        CutStrategy::Aac { bitrate } => {
            args.extend(["-c:a", "aac", "-b:a"].map(String::from));
            args.push(bitrate.clone());
            args.extend(["-movflags", "+faststart"].map(String::from));
        }
    }

    args.extend(["-progress", "pipe:1", "-nostats"].map(String::from));
    args.push(job.output.to_string_lossy().into_owned());
    args
}

/// Seconds at microsecond precision, ffmpeg's internal time base.
///
/// Coarser output would move frame-aligned copy cuts off their boundary.
fn format_seconds(seconds: f64) -> String {
    format!("{seconds:.6}")
}

/// Parse one line of `-progress` output into a segment percentage.
///
/// Understands `out_time_us`, `out_time_ms` (also microseconds in ffmpeg),
/// `out_time` (`HH:MM:SS.micro`) and `progress=end`.
#[allow(clippy::cast_precision_loss)]
pub fn parse_progress_line(line: &str, duration: f64) -> Option<f64> {
    let (key, value) = line.trim().split_once('=')?;

    let seconds = match key {
        "progress" if value == "end" => return Some(100.0),
        "out_time_us" | "out_time_ms" => value.parse::<i64>().ok()? as f64 / 1_000_000.0,
        "out_time" => parse_clock(value)?,
        _ => return None,
    };

    if duration <= 0.0 || seconds < 0.0 {
        return None;
    }
    Some((seconds / duration * 100.0).clamp(0.0, 100.0))
}

fn parse_clock(value: &str) -> Option<f64> {
    let mut parts = value.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    Some(hours.mul_add(3600.0, minutes * 60.0) + seconds)
}
