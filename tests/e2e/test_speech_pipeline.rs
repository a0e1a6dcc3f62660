use crate::e2e::helpers::{sine_wav, KeyRecordingStore, RecordingOutput, TestContext};

use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tts_relay::domain::audio::{
    decode_audio, rms, AudioError, AudioNormalizer, NormalizationParams, PlaybackChain, PlaybackState,
};
use tts_relay::domain::tts::{SpeechRequest, TtsService, TtsServiceApi, TtsServiceError};
use tts_relay::infrastructure::repositories::RemoteTtsRepository;

const API_URL: &str = "http://tts.test/v1";
const SPEECH_URL: &str = "http://tts.test/v1/audio/speech";
const SAMPLE_RATE: u32 = 24_000;

fn tts_service(ctx: &TestContext, output: Arc<RecordingOutput>) -> TtsService {
    let repo = RemoteTtsRepository::new(
        ctx.fetcher.clone(),
        API_URL.to_string(),
        Some("test-key".to_string()),
        "tts-1".to_string(),
        "alloy".to_string(),
    );
    TtsService::new(
        Arc::new(repo),
        output,
        AudioNormalizer::new(NormalizationParams::default()).unwrap(),
        PlaybackChain::default(),
        true,
    )
}

fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
    let count = Arc::new(AtomicUsize::new(0));
    let handle = count.clone();
    (count, move || {
        handle.fetch_add(1, Ordering::SeqCst);
    })
}

#[tokio::test]
async fn it_should_normalize_and_play_synthesized_speech() {
    let ctx = TestContext::new();
    let wav = sine_wav(0.02, 440.0, SAMPLE_RATE, 12_000);
    ctx.transport.respond(SPEECH_URL, 200, &wav);
    let output = Arc::new(RecordingOutput::default());
    let service = tts_service(&ctx, output.clone());

    let playback = service.prepare(&SpeechRequest::new("Hello there.")).await.unwrap();
    let (started, on_start) = counter();
    let (ended, on_end) = counter();
    playback.set_on_start(on_start);
    playback.set_on_end(on_end);
    let playback = service.play(playback).await.unwrap();
    playback.wait().await.unwrap();

    assert_eq!(playback.state(), PlaybackState::Finished);
    assert_eq!(started.load(Ordering::SeqCst), 1);
    assert_eq!(ended.load(Ordering::SeqCst), 1);
    assert_eq!(output.opened.load(Ordering::SeqCst), 1);
    assert_eq!(output.closed.load(Ordering::SeqCst), 1);

    let decoded = decode_audio(&wav).unwrap();
    let normalizer = AudioNormalizer::new(NormalizationParams::default()).unwrap();
    let expected = PlaybackChain::default().process(&normalizer.normalize(&decoded));
    let played = output.samples.lock().unwrap().clone();
    assert_eq!(played, expected.interleaved());

    // Louder than the quiet source, and never clipping
    assert!(rms(&played) > 1.5 * rms(&decoded.interleaved()));
    assert!(played.iter().all(|s| s.abs() <= 1.0));

    let request = ctx.transport.last_request().unwrap();
    assert_eq!(request.method, "POST");
    assert_eq!(request.url, SPEECH_URL);
    assert_eq!(request.headers.get("Authorization").map(String::as_str), Some("Bearer test-key"));
    let body: serde_json::Value = serde_json::from_slice(request.body.as_deref().unwrap()).unwrap();
    assert_eq!(body["input"], "Hello there.");
    assert_eq!(body["voice"], "alloy");
    assert_eq!(body["model"], "tts-1");
}

#[tokio::test]
async fn it_should_play_raw_audio_when_normalization_is_off() {
    let ctx = TestContext::new();
    let wav = sine_wav(0.02, 440.0, SAMPLE_RATE, 6_000);
    ctx.transport.respond(SPEECH_URL, 200, &wav);
    let output = Arc::new(RecordingOutput::default());
    let service = tts_service(&ctx, output.clone());

    let request = SpeechRequest::new("Quiet please.").with_normalize(false);
    let playback = service.speak(&request).await.unwrap();
    playback.wait().await.unwrap();

    let played = output.samples.lock().unwrap().clone();
    assert_eq!(played, decode_audio(&wav).unwrap().interleaved());
    assert!((rms(&played) - 0.02).abs() < 0.002);
}

#[tokio::test]
async fn it_should_replay_a_repeated_utterance_from_cache() {
    let ctx = TestContext::new();
    ctx.transport.respond(SPEECH_URL, 200, &sine_wav(0.1, 220.0, SAMPLE_RATE, 4_000));
    let output = Arc::new(RecordingOutput::default());
    let service = tts_service(&ctx, output.clone());
    let request = SpeechRequest::new("Same words twice.");

    service.speak(&request).await.unwrap().wait().await.unwrap();
    service.speak(&request).await.unwrap().wait().await.unwrap();

    assert_eq!(ctx.transport.calls(), 1);
    assert_eq!(output.opened.load(Ordering::SeqCst), 2);
    assert_eq!(output.samples.lock().unwrap().len(), 8_000);
}

#[tokio::test]
async fn it_should_release_the_device_without_an_end_event_when_stopped() {
    let ctx = TestContext::new();
    // 12 chunks at 50ms each: long enough to interrupt
    ctx.transport.respond(SPEECH_URL, 200, &sine_wav(0.1, 220.0, SAMPLE_RATE, 48_000));
    let output = Arc::new(RecordingOutput::slow(50));
    let service = tts_service(&ctx, output.clone());

    let playback = service.prepare(&SpeechRequest::new("A long sentence.")).await.unwrap();
    let (ended, on_end) = counter();
    playback.set_on_end(on_end);
    let playback = service.play(playback).await.unwrap();

    tokio::time::sleep(Duration::from_millis(80)).await;
    service.stop().await;

    assert_eq!(playback.state(), PlaybackState::Stopped);
    assert_eq!(output.closed.load(Ordering::SeqCst), 1, "device released before stop returns");

    let written = output.samples.lock().unwrap().len();
    assert!(written < 48_000);

    tokio::time::sleep(Duration::from_millis(700)).await;
    assert_eq!(ended.load(Ordering::SeqCst), 0);
    assert_eq!(output.samples.lock().unwrap().len(), written, "no writes after stop");
    playback.wait().await.unwrap();
}

#[tokio::test]
async fn it_should_stop_the_previous_utterance_when_a_new_one_starts() {
    let ctx = TestContext::new();
    ctx.transport.respond(SPEECH_URL, 200, &sine_wav(0.1, 220.0, SAMPLE_RATE, 48_000));
    let output = Arc::new(RecordingOutput::slow(50));
    let service = tts_service(&ctx, output.clone());

    let first = service.prepare(&SpeechRequest::new("First.")).await.unwrap();
    let (first_ended, on_end) = counter();
    first.set_on_end(on_end);
    let first = service.play(first).await.unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;

    let second = service.speak(&SpeechRequest::new("Second.")).await.unwrap();

    assert_eq!(first.state(), PlaybackState::Stopped);
    assert_eq!(first_ended.load(Ordering::SeqCst), 0);
    assert_eq!(second.state(), PlaybackState::Playing);
    assert_eq!(output.closed.load(Ordering::SeqCst), 1);

    service.stop().await;
    assert_eq!(second.state(), PlaybackState::Stopped);
    assert_eq!(output.closed.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn it_should_fail_when_the_payload_is_not_audio() {
    let ctx = TestContext::new();
    ctx.transport.respond(SPEECH_URL, 200, b"<html>definitely not audio</html>");
    let output = Arc::new(RecordingOutput::default());
    let service = tts_service(&ctx, output.clone());

    let result = service.speak(&SpeechRequest::new("Hello.")).await;

    assert!(matches!(result, Err(TtsServiceError::Audio(AudioError::Decode(_)))));
    assert_eq!(output.opened.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn it_should_report_provider_errors_as_dependency_failures() {
    let ctx = TestContext::new();
    ctx.transport.respond(SPEECH_URL, 500, b"upstream exploded");
    let service = tts_service(&ctx, Arc::new(RecordingOutput::default()));

    let result = service.synthesize(&SpeechRequest::new("Hello.")).await;

    match result {
        Err(TtsServiceError::Dependency(message)) => assert!(message.contains("500")),
        other => panic!("expected a dependency error, got {:?}", other.map(|audio| audio.len())),
    }
}

#[tokio::test]
async fn it_should_reject_blank_text_without_calling_the_provider() {
    let ctx = TestContext::new();
    let service = tts_service(&ctx, Arc::new(RecordingOutput::default()));

    let result = service.synthesize(&SpeechRequest::new("   ")).await;

    assert!(matches!(result, Err(TtsServiceError::Invalid(_))));
    assert_eq!(ctx.transport.calls(), 0);
}

#[tokio::test]
async fn it_should_keep_the_api_key_out_of_cache_keys() {
    let store = KeyRecordingStore::new();
    let ctx = TestContext::with_store(store.clone());
    ctx.transport.respond(SPEECH_URL, 200, &sine_wav(0.1, 220.0, SAMPLE_RATE, 1_000));
    let service = tts_service(&ctx, Arc::new(RecordingOutput::default()));

    service.synthesize(&SpeechRequest::new("Keep it secret.")).await.unwrap();

    let keys = store.keys.lock().unwrap().clone();
    assert_eq!(keys.len(), 1);
    assert!(keys[0].starts_with("sha256:"));
    assert!(!keys[0].contains("test-key"));
}
