use anyhow::Result;
use clap::Parser;
use std::time::Duration;
use streamscribe::cli::{Cli, Commands};
use streamscribe::config::Config;
use streamscribe::segment::pipeline::{Pipeline, PipelineConfig, PipelineHandle};
use streamscribe::stt::whisper::{WhisperConfig, WhisperEngine};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = match cli.config.as_deref() {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(&Config::default_path())?,
    }
    .with_env_overrides();
    cli.apply_overrides(&mut config);
    config.validate()?;

    match cli.command {
        None | Some(Commands::Listen) => run_listen(config).await,
        Some(Commands::Devices) => list_audio_devices(),
        Some(Commands::Transcribe { file }) => run_transcribe(config, &file).await,
    }
}

#[cfg(feature = "cpal-audio")]
fn list_audio_devices() -> Result<()> {
    let devices = streamscribe::audio::capture::list_devices()?;
    if devices.is_empty() {
        println!("No audio input devices found");
    } else {
        for device in devices {
            println!("{}", device);
        }
    }
    Ok(())
}

#[cfg(not(feature = "cpal-audio"))]
fn list_audio_devices() -> Result<()> {
    anyhow::bail!("this binary was built without the cpal-audio feature")
}

/// Capture from the microphone and serve transcripts until Ctrl-C.
#[cfg(feature = "cpal-audio")]
async fn run_listen(config: Config) -> Result<()> {
    use streamscribe::SpeechEngine;

    let pipeline_config = PipelineConfig::from_config(&config);
    let engine = WhisperEngine::new(WhisperConfig::from_stt(&config.stt))?;
    log::info!("loaded model {}", engine.model_name());

    let source = streamscribe::audio::capture::CpalAudioSource::new(config.audio.device.as_deref())?;
    let (handle, receiver) = Pipeline::start(
        source,
        pipeline_config.webrtc_gate_factory(),
        engine,
        &pipeline_config,
    )?;

    let server = streamscribe::server::TranscriptServer::from_config(&config.server);
    tokio::select! {
        result = server.run(receiver) => result?,
        _ = tokio::signal::ctrl_c() => {
            log::info!("interrupt received, shutting down");
        }
    }

    shutdown(handle)
}

#[cfg(not(feature = "cpal-audio"))]
async fn run_listen(_config: Config) -> Result<()> {
    anyhow::bail!("this binary was built without the cpal-audio feature")
}

/// Transcribe a WAV file and print each window's transcript.
async fn run_transcribe(config: Config, file: &std::path::Path) -> Result<()> {
    let pipeline_config = PipelineConfig::from_config(&config);
    let engine = WhisperEngine::new(WhisperConfig::from_stt(&config.stt))?;

    let source = if file == std::path::Path::new("-") {
        streamscribe::audio::wav::WavAudioSource::from_stdin()?
    } else {
        streamscribe::audio::wav::WavAudioSource::from_path(file)?
    };

    let (handle, mut receiver) = Pipeline::start(
        source,
        pipeline_config.webrtc_gate_factory(),
        engine,
        &pipeline_config,
    )?;

    // The channel closes once the file is drained and the worker exits.
    while let Some(event) = receiver.recv().await {
        println!("{}", event.text);
    }

    shutdown(handle)
}

fn shutdown(handle: PipelineHandle) -> Result<()> {
    let stats = handle.stats();
    if stats.dropped_blocks > 0 || stats.device_overruns > 0 {
        log::warn!(
            "capture health: {} blocks dropped, {} device overruns",
            stats.dropped_blocks,
            stats.device_overruns
        );
    }
    // Give the worker a moment to drain in-flight audio before joining.
    std::thread::sleep(Duration::from_millis(100));
    handle.stop()?;
    Ok(())
}
