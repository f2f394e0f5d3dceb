use anyhow::{bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Samples per outbound audio frame.
pub const FRAME_SAMPLES: usize = 1024;

/// Frames buffered between the audio callback and the send loop.
const CHANNEL_CAPACITY: usize = 256;

/// How long the capture thread may take to report a device. The wait runs
/// on the dispatch task, so it must be bounded: a wedged audio driver
/// becomes a device error instead of a stalled session.
const DEVICE_READY_TIMEOUT: Duration = Duration::from_secs(5);

/// A fixed-size buffer of mono 16-bit PCM, in capture order.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Exactly [`FRAME_SAMPLES`] mono samples.
    pub samples: Vec<i16>,
    /// Sample rate in Hz, as reported by the device.
    pub sample_rate: u32,
}

impl AudioFrame {
    /// Wire representation: little-endian 16-bit PCM.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }
}

/// Default-device microphone capture.
///
/// The cpal stream is owned by a dedicated thread (cpal streams are not
/// `Send`); frames arrive over the channel returned by [`open`] until
/// [`stop`] is called or the handle is dropped.
///
/// [`open`]: MicrophoneCapture::open
/// [`stop`]: MicrophoneCapture::stop
pub struct MicrophoneCapture {
    sample_rate: u32,
    stop: Arc<AtomicBool>,
}

impl MicrophoneCapture {
    /// Acquire the default input device and start capturing.
    ///
    /// Blocks until the device reports its configuration, so a missing or
    /// unusable device fails here, before anything is sent to the service.
    pub fn open() -> Result<(Self, mpsc::Receiver<AudioFrame>)> {
        let (frame_tx, frame_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || match build_stream(frame_tx) {
                Ok((stream, sample_rate)) => {
                    if ready_tx.send(Ok(sample_rate)).is_err() {
                        return;
                    }
                    while !stop_flag.load(Ordering::SeqCst) {
                        thread::sleep(Duration::from_millis(50));
                    }
                    drop(stream);
                }
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                }
            })
            .context("Failed to spawn the capture thread")?;

        let sample_rate = wait_for_device(&ready_rx, DEVICE_READY_TIMEOUT)?;

        info!("Capturing from default input device at {} Hz", sample_rate);

        Ok((Self { sample_rate, stop }, frame_rx))
    }

    /// Native sample rate of the capture stream in Hz.
    ///
    /// The device decides the rate; the service must be told this value,
    /// not the one that was asked for.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Release the device. Frames already buffered remain readable.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

impl Drop for MicrophoneCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Wait for the capture thread to report its device, for at most `timeout`.
fn wait_for_device(
    ready_rx: &std::sync::mpsc::Receiver<Result<u32>>,
    timeout: Duration,
) -> Result<u32> {
    use std::sync::mpsc::RecvTimeoutError;

    match ready_rx.recv_timeout(timeout) {
        Ok(result) => result.context("Failed to acquire the audio input device"),
        Err(RecvTimeoutError::Timeout) => {
            bail!("Audio device did not respond within {:?}", timeout)
        }
        Err(RecvTimeoutError::Disconnected) => {
            bail!("Capture thread exited before reporting a device")
        }
    }
}

fn build_stream(tx: mpsc::Sender<AudioFrame>) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .context("No default audio input device found")?;

    let supported = device
        .default_input_config()
        .context("Failed to query the default input config")?;

    let sample_rate = supported.sample_rate().0;
    let channels = supported.channels() as usize;
    let config: cpal::StreamConfig = supported.config();

    let err_fn = |err: cpal::StreamError| error!("Audio stream error: {err}");

    let stream = match supported.sample_format() {
        cpal::SampleFormat::F32 => {
            let mut chunker = FrameChunker::new(sample_rate, channels);
            device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| chunker.push_f32(data, &tx),
                err_fn,
                None,
            )?
        }
        cpal::SampleFormat::I16 => {
            let mut chunker = FrameChunker::new(sample_rate, channels);
            device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| chunker.push_i16(data, &tx),
                err_fn,
                None,
            )?
        }
        other => bail!("Unsupported input sample format: {other:?}"),
    };

    stream.play().context("Failed to start the input stream")?;

    Ok((stream, sample_rate))
}

/// Accumulates callback buffers into fixed [`FRAME_SAMPLES`] frames,
/// downmixing interleaved input to mono.
struct FrameChunker {
    buf: Vec<i16>,
    sample_rate: u32,
    channels: usize,
}

impl FrameChunker {
    fn new(sample_rate: u32, channels: usize) -> Self {
        Self {
            buf: Vec::with_capacity(FRAME_SAMPLES * 2),
            sample_rate,
            channels: channels.max(1),
        }
    }

    fn push_f32(&mut self, data: &[f32], tx: &mpsc::Sender<AudioFrame>) {
        for frame in data.chunks(self.channels) {
            let sum: f32 = frame.iter().sum();
            let mono = (sum / self.channels as f32).clamp(-1.0, 1.0);
            self.buf.push((mono * i16::MAX as f32) as i16);
        }
        self.flush(tx);
    }

    fn push_i16(&mut self, data: &[i16], tx: &mpsc::Sender<AudioFrame>) {
        for frame in data.chunks(self.channels) {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            self.buf.push((sum / self.channels as i32) as i16);
        }
        self.flush(tx);
    }

    fn flush(&mut self, tx: &mpsc::Sender<AudioFrame>) {
        while self.buf.len() >= FRAME_SAMPLES {
            let samples: Vec<i16> = self.buf.drain(..FRAME_SAMPLES).collect();
            // The audio callback must never block; if the send loop has
            // fallen this far behind, drop the frame.
            let _ = tx.try_send(AudioFrame {
                samples,
                sample_rate: self.sample_rate,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_bytes_are_little_endian_pcm() {
        let frame = AudioFrame {
            samples: vec![0x0102, -2],
            sample_rate: 44_100,
        };
        assert_eq!(frame.to_le_bytes(), vec![0x02, 0x01, 0xFE, 0xFF]);
    }

    #[tokio::test]
    async fn chunker_emits_fixed_size_mono_frames() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut chunker = FrameChunker::new(16_000, 2);

        // 2.5 frames worth of interleaved stereo input.
        let input = vec![0.5_f32; FRAME_SAMPLES * 5];
        chunker.push_f32(&input, &tx);

        let first = rx.try_recv().unwrap();
        let second = rx.try_recv().unwrap();
        assert_eq!(first.samples.len(), FRAME_SAMPLES);
        assert_eq!(second.samples.len(), FRAME_SAMPLES);
        assert_eq!(first.sample_rate, 16_000);
        // Remainder stays buffered until the next callback.
        assert!(rx.try_recv().is_err());
        assert_eq!(chunker.buf.len(), FRAME_SAMPLES / 2);
    }

    #[test]
    fn device_wait_returns_the_reported_rate() {
        let (tx, rx) = std::sync::mpsc::channel();
        tx.send(Ok(44_100)).unwrap();
        assert_eq!(wait_for_device(&rx, Duration::from_millis(20)).unwrap(), 44_100);
    }

    #[test]
    fn device_wait_propagates_device_errors() {
        let (tx, rx) = std::sync::mpsc::channel();
        tx.send(Err(anyhow::anyhow!("no default input device"))).unwrap();
        assert!(wait_for_device(&rx, Duration::from_millis(20)).is_err());
    }

    #[test]
    fn device_wait_times_out_instead_of_stalling() {
        let (tx, rx) = std::sync::mpsc::channel::<Result<u32>>();
        // The capture thread is alive but wedged: it never reports.
        let _tx = tx;
        let err = wait_for_device(&rx, Duration::from_millis(20)).unwrap_err();
        assert!(err.to_string().contains("did not respond"));
    }

    #[test]
    fn device_wait_reports_a_dead_thread() {
        let (tx, rx) = std::sync::mpsc::channel::<Result<u32>>();
        drop(tx);
        let err = wait_for_device(&rx, Duration::from_millis(20)).unwrap_err();
        assert!(err.to_string().contains("exited before reporting"));
    }

    #[tokio::test]
    async fn chunker_downmixes_i16_stereo() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut chunker = FrameChunker::new(48_000, 2);

        let mut input = Vec::with_capacity(FRAME_SAMPLES * 2);
        for _ in 0..FRAME_SAMPLES {
            input.push(100_i16);
            input.push(300_i16);
        }
        chunker.push_i16(&input, &tx);

        let frame = rx.try_recv().unwrap();
        assert!(frame.samples.iter().all(|&s| s == 200));
    }
}
