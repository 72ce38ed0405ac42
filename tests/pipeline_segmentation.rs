//! End-to-end segmentation behavior over the public API.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use streamscribe::audio::source::{AudioSource, MockAudioSource};
use streamscribe::segment::{
    AssemblerConfig, AudioBlock, IngestProducer, MockClassifier, Pipeline, PipelineConfig,
    SegmentProcessor,
};
use streamscribe::stt::engine::{MockEngine, SpeechEngine};
use streamscribe::{Result, StreamscribeError};

const FRAME: usize = 480;
const TARGET: usize = 24_000;
const OVERLAP: usize = 4_800;

/// Engine that records every window it is asked to transcribe.
#[derive(Clone, Default)]
struct RecordingEngine {
    windows: Arc<Mutex<Vec<Vec<f32>>>>,
}

impl RecordingEngine {
    fn windows(&self) -> Vec<Vec<f32>> {
        self.windows.lock().unwrap().clone()
    }
}

impl SpeechEngine for RecordingEngine {
    fn transcribe(&self, audio: &[f32]) -> Result<Vec<String>> {
        self.windows.lock().unwrap().push(audio.to_vec());
        Ok(vec!["text".to_string()])
    }

    fn model_name(&self) -> &str {
        "recording"
    }

    fn is_ready(&self) -> bool {
        true
    }
}

fn default_processor(engine: RecordingEngine) -> SegmentProcessor<MockClassifier, RecordingEngine> {
    SegmentProcessor::new(
        FRAME,
        AssemblerConfig {
            target: TARGET,
            overlap: OVERLAP,
        },
        MockClassifier::amplitude(0),
        engine,
    )
}

#[test]
fn three_seconds_of_silence_yields_one_zero_window() {
    let engine = RecordingEngine::default();
    let mut processor = default_processor(engine.clone());

    // 3 seconds of digital silence in 30 ms blocks. Silence keeps the
    // voiced timeline running, so a full window still forms.
    let mut emitted_at_block = None;
    for block_index in 0..100 {
        processor
            .process_block(&AudioBlock::new(vec![0.0; FRAME]))
            .unwrap();
        if emitted_at_block.is_none() && !engine.windows().is_empty() {
            emitted_at_block = Some(block_index);
        }
    }

    let windows = engine.windows();
    assert_eq!(windows.len(), 1, "expected exactly one window from 3s");
    assert_eq!(windows[0].len(), TARGET + OVERLAP);
    assert!(windows[0].iter().all(|&s| s == 0.0));
    // 28800 samples of history exist after block 60, i.e. 1.8 seconds in.
    assert_eq!(emitted_at_block, Some(59));
}

#[test]
fn consecutive_windows_share_overlap_audio() {
    let engine = RecordingEngine::default();
    let mut processor = default_processor(engine.clone());

    // Distinct ramp values so window contents are position-dependent.
    let total = FRAME * 200;
    for start in (0..total).step_by(FRAME) {
        let samples: Vec<f32> = (start..start + FRAME)
            .map(|i| ((i % 30_000) as f32 + 1.0) / 32_768.0)
            .collect();
        processor.process_block(&AudioBlock::new(samples)).unwrap();
    }

    let windows = engine.windows();
    assert!(windows.len() >= 3);
    for window in &windows {
        assert_eq!(window.len(), TARGET + OVERLAP);
    }
    for pair in windows.windows(2) {
        let tail = &pair[0][pair[0].len() - OVERLAP..];
        let head = &pair[1][..OVERLAP];
        assert_eq!(tail, head, "windows must share their overlap region");
    }
}

#[test]
fn steady_speech_emits_at_chunk_cadence() {
    let engine = RecordingEngine::default();
    let mut processor = default_processor(engine.clone());

    let mut emissions = Vec::new();
    for block_index in 0..240 {
        processor
            .process_block(&AudioBlock::new(vec![0.5; FRAME]))
            .unwrap();
        let count = engine.windows().len();
        if count > emissions.len() {
            emissions.push(block_index);
        }
    }

    // First window once target + overlap samples exist, then one per
    // target samples of fresh audio.
    assert_eq!(emissions[0], (TARGET + OVERLAP) / FRAME - 1);
    for pair in emissions.windows(2) {
        assert_eq!(pair[1] - pair[0], TARGET / FRAME);
    }
}

#[test]
fn sub_frame_input_produces_nothing() {
    let engine = RecordingEngine::default();
    let mut processor = default_processor(engine.clone());

    processor
        .process_block(&AudioBlock::new(vec![0.5; FRAME - 1]))
        .unwrap();

    assert!(engine.windows().is_empty());
}

#[test]
fn silence_gaps_do_not_shorten_windows() {
    let engine = RecordingEngine::default();
    let mut processor = default_processor(engine.clone());

    // Alternate 30 ms of speech and 30 ms of silence for 6 seconds.
    for block_index in 0..200 {
        let value = if block_index % 2 == 0 { 0.5 } else { 0.0 };
        processor
            .process_block(&AudioBlock::new(vec![value; FRAME]))
            .unwrap();
    }

    let windows = engine.windows();
    assert!(!windows.is_empty());
    for window in &windows {
        assert_eq!(window.len(), TARGET + OVERLAP);
    }
}

#[test]
fn replaying_the_same_audio_reproduces_identical_windows() {
    // Deterministic input: a ramp with speech and silence stretches.
    let blocks: Vec<Vec<f32>> = (0..120)
        .map(|block_index| {
            if block_index % 7 < 2 {
                vec![0.0; FRAME]
            } else {
                (0..FRAME)
                    .map(|i| ((block_index * FRAME + i) % 5_000) as f32 / 16_384.0)
                    .collect()
            }
        })
        .collect();

    let run = || {
        let engine = RecordingEngine::default();
        let mut processor = default_processor(engine.clone());
        for samples in &blocks {
            processor
                .process_block(&AudioBlock::new(samples.clone()))
                .unwrap();
        }
        engine.windows()
    };

    let first = run();
    let second = run();
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

fn small_pipeline_config() -> PipelineConfig {
    PipelineConfig {
        sample_rate: 16_000,
        frame_ms: 30,
        chunk_seconds: 0.3,
        overlap_seconds: 0.06,
        aggressiveness: 2,
        ingest_capacity: 256,
        result_capacity: 64,
    }
}

#[tokio::test]
async fn pipeline_orders_events_monotonically() {
    let config = small_pipeline_config();
    // 100 frames of speech; window_len is 12 frames, cadence 10 frames.
    let source = MockAudioSource::new().with_samples(&vec![0.5f32; FRAME * 100], FRAME);
    let engine = MockEngine::new("m").with_segments(&["word"]);

    let (handle, mut receiver) =
        Pipeline::start(source, || Ok(MockClassifier::always(true)), engine, &config).unwrap();

    let mut events = Vec::new();
    while let Some(event) = receiver.recv().await {
        events.push(event);
    }

    assert_eq!(events.len(), 9);
    for (expected_index, event) in events.iter().enumerate() {
        assert_eq!(event.index, expected_index as u64);
        assert_eq!(event.text, "word");
    }
    handle.stop().unwrap();
}

/// Engine that stalls in transcribe, simulating a model slower than the
/// incoming audio.
#[derive(Clone)]
struct SlowEngine(Duration);

impl SpeechEngine for SlowEngine {
    fn transcribe(&self, _audio: &[f32]) -> Result<Vec<String>> {
        std::thread::sleep(self.0);
        Ok(vec!["late".to_string()])
    }

    fn model_name(&self) -> &str {
        "slow"
    }

    fn is_ready(&self) -> bool {
        true
    }
}

#[tokio::test]
async fn pipeline_reports_dropped_blocks() {
    let mut config = small_pipeline_config();
    config.ingest_capacity = 4;
    let slot = Arc::new(Mutex::new(None));
    let source = HandoffSource(slot.clone());

    let (handle, mut receiver) = Pipeline::start(
        source,
        || Ok(MockClassifier::always(true)),
        SlowEngine(Duration::from_millis(500)),
        &config,
    )
    .unwrap();
    let producer = slot.lock().unwrap().take().unwrap();

    // One full window puts the worker into its slow transcribe call.
    for _ in 0..12 {
        producer.push(AudioBlock::new(vec![0.5; FRAME]));
    }
    tokio::time::sleep(Duration::from_millis(200)).await;

    // The worker is stalled, so a burst can only fit the queue capacity.
    for _ in 0..30 {
        producer.push(AudioBlock::new(vec![0.5; FRAME]));
    }
    assert!(handle.stats().dropped_blocks > 0);

    drop(producer);
    while receiver.recv().await.is_some() {}
    handle.stop().unwrap();
}

/// Source that hands its sink back to the test instead of capturing.
#[derive(Clone)]
struct HandoffSource(Arc<Mutex<Option<IngestProducer>>>);

impl AudioSource for HandoffSource {
    fn start(&mut self, sink: IngestProducer) -> Result<()> {
        *self
            .0
            .lock()
            .map_err(|_| StreamscribeError::AudioCapture {
                message: "lock poisoned".to_string(),
            })? = Some(sink);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn websocket_clients_receive_status_then_partials() {
    use futures_util::StreamExt;
    use streamscribe::server::TranscriptServer;
    use tokio_tungstenite::tungstenite::Message;

    let config = small_pipeline_config();
    let slot = Arc::new(Mutex::new(None));
    let source = HandoffSource(slot.clone());
    let engine = MockEngine::new("m").with_segments(&["hello"]);

    let (handle, receiver) =
        Pipeline::start(source, || Ok(MockClassifier::always(true)), engine, &config).unwrap();
    let producer = slot.lock().unwrap().take().unwrap();

    let bound = TranscriptServer::new("127.0.0.1:0", Duration::from_millis(250))
        .bind()
        .await
        .unwrap();
    let addr = bound.local_addr().unwrap();
    let server = tokio::spawn(bound.run(receiver));

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}", addr))
        .await
        .unwrap();

    let status: serde_json::Value = match ws.next().await.unwrap().unwrap() {
        Message::Text(payload) => serde_json::from_str(&payload).unwrap(),
        other => panic!("expected text frame, got {other:?}"),
    };
    assert_eq!(status["type"], "status");

    // Enough speech for one window (12 frames at this config).
    for _ in 0..16 {
        assert!(producer.push(AudioBlock::new(vec![0.5; FRAME])));
    }

    let partial = loop {
        match ws.next().await.unwrap().unwrap() {
            Message::Text(payload) => {
                break serde_json::from_str::<serde_json::Value>(&payload).unwrap()
            }
            // Keep-alive pings while the worker is still chewing.
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame {other:?}"),
        }
    };
    assert_eq!(partial["type"], "partial");
    assert_eq!(partial["text"], "hello");
    assert_eq!(partial["index"], 0);

    drop(producer);
    handle.stop().unwrap();
    server.await.unwrap().unwrap();
}
