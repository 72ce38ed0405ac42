//! Real audio capture using CPAL (Cross-Platform Audio Library).

use crate::audio::source::AudioSource;
use crate::audio::wav::resample;
use crate::defaults;
use crate::error::{Result, StreamscribeError};
use crate::segment::block::AudioBlock;
use crate::segment::ingest::IngestProducer;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

/// Preferred device names for desktop PipeWire/PulseAudio environments.
const PREFERRED_DEVICES: &[&str] = &["pipewire", "pulse", "PulseAudio"];

/// Device name patterns to filter out (not useful for voice input).
const FILTERED_PATTERNS: &[&str] = &[
    "surround",
    "front:",
    "rear:",
    "center:",
    "side:",
    "Digital Output",
    "HDMI",
    "S/PDIF",
];

fn should_filter_device(name: &str) -> bool {
    let lower = name.to_lowercase();
    FILTERED_PATTERNS
        .iter()
        .any(|pattern| lower.contains(&pattern.to_lowercase()))
}

fn is_preferred_device(name: &str) -> bool {
    let lower = name.to_lowercase();
    PREFERRED_DEVICES
        .iter()
        .any(|pref| lower.contains(&pref.to_lowercase()))
}

/// List available audio input devices.
///
/// Filters out obviously unusable devices (surround channels, HDMI) and
/// marks preferred ones with "\[recommended\]".
///
/// # Errors
/// Returns `StreamscribeError::AudioCapture` if enumeration fails.
pub fn list_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| StreamscribeError::AudioCapture {
            message: format!("Failed to enumerate input devices: {}", e),
        })?;

    let mut device_names = Vec::new();
    for device in devices {
        if let Ok(name) = device.name() {
            if should_filter_device(&name) {
                continue;
            }
            if is_preferred_device(&name) {
                device_names.push(format!("{} [recommended]", name));
            } else {
                device_names.push(name);
            }
        }
    }

    Ok(device_names)
}

/// Get the best default input device, preferring PipeWire/PulseAudio so
/// the desktop's device selection is respected.
fn get_best_default_device() -> Result<cpal::Device> {
    let host = cpal::default_host();

    if let Ok(devices) = host.input_devices() {
        for device in devices {
            if let Ok(name) = device.name() {
                if is_preferred_device(&name) {
                    return Ok(device);
                }
            }
        }
    }

    host.default_input_device()
        .ok_or_else(|| StreamscribeError::AudioDeviceNotFound {
            device: "default".to_string(),
        })
}

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: the stream is only touched from the thread that owns the
/// audio source; the wrapper never hands out shared access.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

/// Microphone capture source built on CPAL.
///
/// Captures f32 mono at the pipeline rate. Tries the preferred format
/// first (f32/16kHz/mono), then falls back to the device's native config
/// with software conversion (channel mixing + resampling). The capture
/// callback only converts and enqueues; it never blocks.
pub struct CpalAudioSource {
    device: cpal::Device,
    stream: Option<SendableStream>,
    sample_rate: u32,
}

impl CpalAudioSource {
    /// Open a capture source on the named device, or the best default
    /// when `device_name` is None.
    pub fn new(device_name: Option<&str>) -> Result<Self> {
        let device = if let Some(name) = device_name {
            let host = cpal::default_host();
            let devices = host
                .input_devices()
                .map_err(|e| StreamscribeError::AudioCapture {
                    message: format!("Failed to enumerate devices: {}", e),
                })?;

            let mut found_device = None;
            for dev in devices {
                if let Ok(dev_name) = dev.name() {
                    if dev_name == name {
                        found_device = Some(dev);
                        break;
                    }
                }
            }

            found_device.ok_or_else(|| StreamscribeError::AudioDeviceNotFound {
                device: name.to_string(),
            })?
        } else {
            get_best_default_device()?
        };

        Ok(Self {
            device,
            stream: None,
            sample_rate: defaults::SAMPLE_RATE,
        })
    }

    /// Build a stream delivering f32 mono at the pipeline rate.
    ///
    /// Tries f32/16kHz/mono first; PipeWire and PulseAudio convert
    /// transparently. Falls back to the device's native config with
    /// software conversion for raw ALSA devices that reject it.
    fn build_stream(&self, sink: IngestProducer) -> Result<cpal::Stream> {
        let preferred_config = cpal::StreamConfig {
            channels: defaults::CHANNELS,
            sample_rate: cpal::SampleRate(self.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let err_callback = |err| {
            log::error!("audio stream error: {}", err);
        };

        let preferred_sink = sink.clone();
        if let Ok(stream) = self.device.build_input_stream(
            &preferred_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                preferred_sink.push(AudioBlock::new(data.to_vec()));
            },
            err_callback,
            None,
        ) {
            return Ok(stream);
        }

        self.build_stream_native(sink)
    }

    /// Build a stream using the device's native config, with software
    /// channel mixing and resampling in the callback.
    fn build_stream_native(&self, sink: IngestProducer) -> Result<cpal::Stream> {
        use cpal::SampleFormat;

        let default_config =
            self.device
                .default_input_config()
                .map_err(|e| StreamscribeError::AudioCapture {
                    message: format!("Failed to query default input config: {}", e),
                })?;

        let native_rate = default_config.sample_rate().0;
        let native_channels = default_config.channels() as usize;
        let target_rate = self.sample_rate;

        let stream_config: cpal::StreamConfig = default_config.clone().into();

        log::info!(
            "using native audio format ({}ch/{}Hz/{:?}), converting in software",
            native_channels,
            native_rate,
            default_config.sample_format(),
        );

        let err_callback = |err| {
            log::error!("audio stream error: {}", err);
        };

        match default_config.sample_format() {
            SampleFormat::F32 => self
                .device
                .build_input_stream(
                    &stream_config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        let converted =
                            convert_to_mono_rate(data, native_channels, native_rate, target_rate);
                        sink.push(AudioBlock::new(converted));
                    },
                    err_callback,
                    None,
                )
                .map_err(|e| StreamscribeError::AudioCapture {
                    message: format!("Failed to build native f32 stream: {}", e),
                }),
            SampleFormat::I16 => self
                .device
                .build_input_stream(
                    &stream_config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        let float_data: Vec<f32> =
                            data.iter().map(|&s| s as f32 / 32768.0).collect();
                        let converted = convert_to_mono_rate(
                            &float_data,
                            native_channels,
                            native_rate,
                            target_rate,
                        );
                        sink.push(AudioBlock::new(converted));
                    },
                    err_callback,
                    None,
                )
                .map_err(|e| StreamscribeError::AudioCapture {
                    message: format!("Failed to build native i16 stream: {}", e),
                }),
            fmt => Err(StreamscribeError::AudioCapture {
                message: format!(
                    "Unsupported native sample format: {:?}. \
                     Try specifying a device in the config.",
                    fmt
                ),
            }),
        }
    }
}

/// Mix multi-channel audio to mono and resample to the target rate.
fn convert_to_mono_rate(
    samples: &[f32],
    channels: usize,
    source_rate: u32,
    target_rate: u32,
) -> Vec<f32> {
    let mono: Vec<f32> = if channels == 1 {
        samples.to_vec()
    } else {
        samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    if source_rate == target_rate {
        mono
    } else {
        resample(&mono, source_rate, target_rate)
    }
}

impl AudioSource for CpalAudioSource {
    fn start(&mut self, sink: IngestProducer) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let stream = self.build_stream(sink)?;
        stream
            .play()
            .map_err(|e| StreamscribeError::AudioCapture {
                message: format!("Failed to start audio stream: {}", e),
            })?;

        self.stream = Some(SendableStream(stream));
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            stream
                .0
                .pause()
                .map_err(|e| StreamscribeError::AudioCapture {
                    message: format!("Failed to stop audio stream: {}", e),
                })?;
        }
        Ok(())
    }
}
