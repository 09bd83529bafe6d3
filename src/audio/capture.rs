//! Microphone capture with bounded digital gain
//!
//! The capture controller pulls fixed-size sample blocks from a source while
//! the trigger is held, boosts them with a saturating left-shift gain, and
//! streams the bytes to a sink. Reads have a bounded wait so the release of
//! the trigger is noticed within one block interval.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};

use crate::audio::duplex::MicrophonePort;
use crate::{Error, Result};

/// Capture parameters
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    /// Samples per block pulled from the source
    pub block_samples: usize,
    /// Bounded wait per block read
    pub read_wait: Duration,
    /// Hard cap on capture length
    pub max_duration: Duration,
    /// Left-shift gain applied to every sample (1 = x2)
    pub gain_shift: u8,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            block_samples: crate::config::DEFAULT_BLOCK_SAMPLES,
            read_wait: Duration::from_millis(100),
            max_duration: Duration::from_secs(30),
            gain_shift: 1,
        }
    }
}

/// Source of raw microphone sample blocks
pub trait SampleSource {
    /// Read up to `out.len()` samples, waiting at most `max_wait`.
    ///
    /// `Ok(0)` means nothing arrived within the wait; an `Err` is a transient
    /// read failure the caller may skip.
    ///
    /// # Errors
    ///
    /// Returns error on a failed peripheral read
    fn read_block(&mut self, out: &mut [i16], max_wait: Duration) -> Result<usize>;
}

/// Apply a saturating left-shift gain to a block of samples.
///
/// Values that would leave the signed 16-bit range clamp to the range edge
/// instead of wrapping.
pub fn apply_gain(samples: &mut [i16], shift: u8) {
    if shift == 0 {
        return;
    }

    for sample in samples {
        let boosted = i32::from(*sample) << shift;
        *sample = boosted.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16;
    }
}

/// Capture gain-adjusted audio while `trigger_held` stays true.
///
/// Blocks are read with a bounded wait, boosted, and appended to `sink` until
/// the trigger releases or `max_duration` elapses. Transient read failures
/// skip the affected block. The working buffer lives only for the duration of
/// the call.
///
/// Returns the total payload bytes written to the sink.
///
/// # Errors
///
/// Returns error only if the sink fails; source errors are skipped
pub fn capture<F, S, W>(
    mut trigger_held: F,
    source: &mut S,
    sink: &mut W,
    opts: &CaptureOptions,
) -> Result<u64>
where
    F: FnMut() -> bool,
    S: SampleSource + ?Sized,
    W: Write + ?Sized,
{
    let started = Instant::now();
    let mut block = vec![0i16; opts.block_samples];
    let mut bytes = vec![0u8; opts.block_samples * 2];
    let mut total: u64 = 0;

    while trigger_held() && started.elapsed() < opts.max_duration {
        let read = match source.read_block(&mut block, opts.read_wait) {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(error = %e, "transient read failure, skipping block");
                // Pace the error path like a timed-out read so a dead
                // source cannot busy-spin until the trigger releases
                std::thread::sleep(opts.read_wait);
                continue;
            }
        };

        if read == 0 {
            continue;
        }

        apply_gain(&mut block[..read], opts.gain_shift);

        for (sample, out) in block[..read].iter().zip(bytes.chunks_exact_mut(2)) {
            out.copy_from_slice(&sample.to_le_bytes());
        }
        sink.write_all(&bytes[..read * 2])?;
        total += (read * 2) as u64;
    }

    tracing::debug!(
        bytes = total,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "capture finished"
    );

    Ok(total)
}

/// cpal-backed microphone implementing both the duplex port and the
/// block-read source.
///
/// The input stream pushes converted i16 samples into a shared queue; reads
/// drain the queue with a bounded wait.
pub struct CpalMicrophone {
    config: StreamConfig,
    sample_rate: u32,
    queue: Arc<Mutex<Vec<i16>>>,
    stream: Option<Stream>,
}

impl CpalMicrophone {
    /// Probe the default input device for a mono config at `sample_rate`
    ///
    /// # Errors
    ///
    /// Returns error if no suitable input device or config exists
    pub fn new(sample_rate: u32) -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

        let supported = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(sample_rate)
                    && c.max_sample_rate() >= SampleRate(sample_rate)
            })
            .ok_or_else(|| Error::Audio("no suitable input config found".to_string()))?;

        let config = supported.with_sample_rate(SampleRate(sample_rate)).config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate,
            "microphone probed"
        );

        Ok(Self {
            config,
            sample_rate,
            queue: Arc::new(Mutex::new(Vec::new())),
            stream: None,
        })
    }

    /// Configured sample rate
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl MicrophonePort for CpalMicrophone {
    fn bring_up(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device".to_string()))?;

        let queue = Arc::clone(&self.queue);
        let stream = device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut q) = queue.lock() {
                        q.extend(data.iter().map(|&s| {
                            #[allow(clippy::cast_possible_truncation)]
                            let v = (s * 32767.0).clamp(-32768.0, 32767.0) as i16;
                            v
                        }));
                    }
                },
                |err| {
                    tracing::error!(error = %err, "microphone stream error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        self.stream = Some(stream);

        tracing::debug!("microphone path up");
        Ok(())
    }

    fn tear_down(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            drop(stream);
        }
        if let Ok(mut q) = self.queue.lock() {
            q.clear();
        }

        tracing::debug!("microphone path down");
        Ok(())
    }
}

impl SampleSource for CpalMicrophone {
    fn read_block(&mut self, out: &mut [i16], max_wait: Duration) -> Result<usize> {
        if self.stream.is_none() {
            return Err(Error::Audio("microphone path is not up".to_string()));
        }

        let deadline = Instant::now() + max_wait;
        loop {
            {
                let mut q = self
                    .queue
                    .lock()
                    .map_err(|_| Error::Audio("microphone queue poisoned".to_string()))?;
                if !q.is_empty() {
                    let n = q.len().min(out.len());
                    out[..n].copy_from_slice(&q[..n]);
                    q.drain(..n);
                    return Ok(n);
                }
            }

            if Instant::now() >= deadline {
                return Ok(0);
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }
}
