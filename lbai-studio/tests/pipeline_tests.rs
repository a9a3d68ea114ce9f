//! End-to-end pipeline tests against in-process fakes

mod helpers;

use helpers::{drain, stages, write_tone, FakeConverter, Harness, HarnessOptions, RecordingUploader};
use lbai_common::events::StudioEvent;
use lbai_common::JobId;
use lbai_studio::db::jobs::load_job;
use lbai_studio::models::{ArtifactKind, JobRecord, JobRequest, JobState};
use lbai_studio::services::ffmpeg::render_args;
use lbai_studio::services::video_composer::Background;
use lbai_studio::utils::wav_duration;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn request(value: serde_json::Value) -> JobRequest {
    serde_json::from_value::<JobRequest>(value).unwrap().normalized()
}

fn test_song() -> JobRequest {
    request(json!({
        "title": "Test Song",
        "lyrics": "a b c",
        "genre": "pop",
        "voice_type": "default",
        "duration": 10
    }))
}

fn new_record(request: JobRequest) -> JobRecord {
    JobRecord::new(JobId::generate(&request.title), request)
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 0.01,
        "expected {:.3}s, got {:.3}s",
        expected,
        actual
    );
}

async fn wait_terminal(harness: &Harness, job_id: &str) -> JobRecord {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(20);
    loop {
        if let Some(record) = load_job(&harness.db, job_id).await.unwrap() {
            if record.is_terminal() {
                return record;
            }
        }
        assert!(tokio::time::Instant::now() < deadline, "job {} never finished", job_id);
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

#[tokio::test]
async fn test_song_produces_mix_two_videos_and_one_log_block() {
    let harness = Harness::new().await;
    let mut rx = harness.event_bus.subscribe();

    let record = harness.orchestrator.execute_job(new_record(test_song())).await;

    assert_eq!(record.state, JobState::Done);
    assert!(record.error.is_none());

    for kind in [
        ArtifactKind::Instrumental,
        ArtifactKind::Vocals,
        ArtifactKind::MixedWav,
        ArtifactKind::MixedAudio,
        ArtifactKind::LyricsText,
        ArtifactKind::SimpleVideo,
        ArtifactKind::HighVideo,
    ] {
        let path = record.artifacts.path(kind).unwrap_or_else(|| panic!("missing {:?}", kind));
        assert!(path.is_file(), "{:?} not on disk", kind);
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(record.job_id.as_str()));
    }
    assert!(record.artifacts.get(ArtifactKind::ConvertedVocals).is_none());

    let id = record.job_id.as_str();
    assert_eq!(
        harness.public_files(),
        vec![
            format!("{}_FINAL.mp3", id),
            format!("{}_FINAL_high.mp4", id),
            format!("{}_FINAL_simple.mp4", id),
        ]
    );

    let log = harness.generation_log();
    assert_eq!(log.matches("JOB: ").count(), 1);
    assert!(log.contains("TITLE: Test Song"));
    assert!(log.contains("FORMAT: mp3"));
    assert!(log.contains("PIC: none"));
    assert!(log.contains("LYRICS_LEN: 5"));
    let public_mp3 = harness.paths.public_dir.join(format!("{}_FINAL.mp3", id));
    assert!(log.contains(&format!("FILE: {}", public_mp3.display())));

    let events = drain(&mut rx);
    assert_eq!(
        stages(&events),
        vec![
            "ASSETS_SEARCHED",
            "INSTRUMENTAL_READY",
            "VOCALS_READY",
            "MIXED",
            "VIDEOS_COMPOSED",
            "PUBLISHED",
            "LOGGED",
            "DONE"
        ]
    );
    assert!(matches!(events.last(), Some(StudioEvent::JobCompleted { .. })));

    let stored = load_job(&harness.db, id).await.unwrap().unwrap();
    assert_eq!(stored.state, JobState::Done);
    assert_eq!(stored.artifacts, record.artifacts);
}

#[tokio::test]
async fn test_mix_and_videos_follow_vocal_duration() {
    let harness = Harness::new().await;
    let record = harness.orchestrator.execute_job(new_record(test_song())).await;

    // One lyric chunk → one second of vocals over a ten second beat
    let mix = record.artifacts.path(ArtifactKind::MixedWav).unwrap();
    assert_close(wav_duration(mix).unwrap(), 1.0);

    let plans = harness.renderer.plans.lock().unwrap();
    assert_eq!(plans.len(), 2);
    for plan in plans.iter() {
        assert_close(plan.duration_seconds, 1.0);
        assert_eq!(plan.fps, 24);
        assert!(plan.background.is_solid());
    }
}

#[tokio::test]
async fn test_long_lyrics_are_chunked_in_order() {
    let harness = Harness::new().await;
    let lyrics = (0..200).map(|i| format!("w{:03}", i)).collect::<Vec<_>>().join(" ");
    let record = harness
        .orchestrator
        .execute_job(new_record(request(json!({ "title": "Long", "lyrics": lyrics }))))
        .await;

    assert_eq!(record.state, JobState::Done);

    let requests = harness.vocals.requests.lock().unwrap();
    assert_eq!(requests.len(), 3);
    assert!(requests[0].0.starts_with("w000 "));
    assert!(requests[2].0.ends_with(" w199"));
    let rejoined = requests.iter().map(|r| r.0.as_str()).collect::<Vec<_>>().join(" ");
    assert_eq!(rejoined, lyrics);

    let vocals = record.artifacts.path(ArtifactKind::Vocals).unwrap();
    assert_close(wav_duration(vocals).unwrap(), 3.0);

    // chunk part files are cleaned up
    let leftovers = std::fs::read_dir(&harness.paths.output_dir)
        .unwrap()
        .filter(|e| e.as_ref().unwrap().file_name().to_string_lossy().contains("_part"))
        .count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn test_unavailable_models_fall_back_to_silence() {
    let harness = Harness::build(HarnessOptions {
        providers_available: false,
        ..Default::default()
    })
    .await;
    let mut rx = harness.event_bus.subscribe();

    let record = harness.orchestrator.execute_job(new_record(test_song())).await;

    assert_eq!(record.state, JobState::Done);
    assert!(record
        .fallbacks
        .contains(&"instrumental: music model failed to load".to_string()));
    assert!(record
        .fallbacks
        .contains(&"vocals: speech model failed to load".to_string()));

    let beat = record.artifacts.path(ArtifactKind::Instrumental).unwrap();
    assert_close(wav_duration(beat).unwrap(), 10.0);
    let mix = record.artifacts.path(ArtifactKind::MixedWav).unwrap();
    assert_close(wav_duration(mix).unwrap(), 10.0);

    let fallback_stages: Vec<String> = drain(&mut rx)
        .into_iter()
        .filter_map(|e| match e {
            StudioEvent::JobFallback { stage, .. } => Some(stage),
            _ => None,
        })
        .collect();
    assert!(fallback_stages.contains(&"instrumental".to_string()));
    assert!(fallback_stages.contains(&"vocals".to_string()));
}

#[tokio::test]
async fn test_required_stage_failure_leaves_partial_artifacts() {
    let harness = Harness::build(HarnessOptions {
        encoder_fails: true,
        ..Default::default()
    })
    .await;
    let mut rx = harness.event_bus.subscribe();

    let record = harness.orchestrator.execute_job(new_record(test_song())).await;

    assert_eq!(record.state, JobState::Failed);
    assert_eq!(record.failed_stage, Some(JobState::VocalsReady));
    assert!(record.error.as_deref().unwrap().contains("encoder exited"));

    // earlier stage outputs stay for inspection
    assert!(record.artifacts.path(ArtifactKind::Instrumental).unwrap().is_file());
    assert!(record.artifacts.path(ArtifactKind::Vocals).unwrap().is_file());
    assert!(harness.public_files().is_empty());
    assert!(harness.generation_log().is_empty());

    let events = drain(&mut rx);
    match events.last() {
        Some(StudioEvent::JobFailed { stage, error, .. }) => {
            assert_eq!(stage, "mix");
            assert!(error.contains("encoder exited"));
        }
        other => panic!("expected JobFailed, got {:?}", other),
    }

    let stored = load_job(&harness.db, record.job_id.as_str()).await.unwrap().unwrap();
    assert_eq!(stored.state, JobState::Failed);
    assert_eq!(stored.error, record.error);
}

#[tokio::test]
async fn test_unreachable_backgrounds_use_solid_color() {
    let link = "https://www.pexels.com/video/waves-123.mp4".to_string();
    let harness = Harness::build(HarnessOptions {
        asset_links: Some(vec![link.clone(), "https://example.com/x.jpg".to_string()]),
        ..Default::default()
    })
    .await;

    let record = harness.orchestrator.execute_job(new_record(test_song())).await;

    assert_eq!(record.state, JobState::Done);
    assert!(record.artifacts.path(ArtifactKind::HighVideo).unwrap().is_file());
    assert!(record
        .fallbacks
        .iter()
        .any(|f| f.starts_with("high_video_background:")));
    assert!(record
        .fallbacks
        .iter()
        .any(|f| f.starts_with("simple_video_background:")));

    let plans = harness.renderer.plans.lock().unwrap();
    assert!(plans
        .iter()
        .all(|p| p.background == Background::solid()));

    let log = harness.generation_log();
    assert!(log.contains(&format!("PIC: {}", link)));
    assert!(log.contains(&format!("VIDEO: {}", link)));
}

#[tokio::test]
async fn test_percent_and_backslash_in_text_render_literally() {
    let harness = Harness::new().await;
    let record = harness
        .orchestrator
        .execute_job(new_record(request(json!({
            "title": "100% Love \\ Mix",
            "lyrics": "give 50%\nback\\slash %{pts}",
            "genre": "pop",
            "duration": 5
        }))))
        .await;

    assert_eq!(record.state, JobState::Done);
    assert!(record.artifacts.path(ArtifactKind::SimpleVideo).unwrap().is_file());
    assert!(record.artifacts.path(ArtifactKind::HighVideo).unwrap().is_file());
    assert!(harness.generation_log().contains("TITLE: 100% Love \\ Mix"));

    let plans = harness.renderer.plans.lock().unwrap();
    assert_eq!(plans.len(), 2);
    for plan in plans.iter() {
        assert_eq!(plan.overlays[0].text, "100% Love \\ Mix");
        assert!(plan.overlays[1].text.contains("give 50%"));
        assert!(plan.overlays[1].text.contains("back\\slash %{pts}"));

        let files: Vec<_> = (0..plan.overlays.len())
            .map(|i| harness.paths.output_dir.join(format!("overlay{}.txt", i)))
            .collect();
        let args = render_args(plan, &files)
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(
            args.matches("drawtext=").count(),
            args.matches(":expansion=none:").count()
        );
        assert!(!args.contains('%'));
    }
}

#[tokio::test]
async fn test_custom_voice_without_sample_uses_male_and_skips_conversion() {
    let converter = Arc::new(FakeConverter::new(false));
    let harness = Harness::build(HarnessOptions {
        converter: Some(converter.clone()),
        voice_model: true,
        ..Default::default()
    })
    .await;

    let record = harness
        .orchestrator
        .execute_job(new_record(request(json!({
            "title": "Clone Me",
            "voice_type": "clone",
            "use_voice_conversion": true
        }))))
        .await;

    assert_eq!(record.state, JobState::Done);
    let requests = harness.vocals.requests.lock().unwrap();
    assert_eq!(requests[0].1, "male");
    assert!(!requests[0].2, "no reference sample expected");
    assert_eq!(*converter.calls.lock().unwrap(), 0);
    assert!(record.fallbacks.iter().any(|f| f.starts_with("voice_selection:")));
    // the request itself is left as submitted
    assert_eq!(record.request.voice_type.as_str(), "custom");
}

#[cfg(feature = "voice-conversion")]
#[tokio::test]
async fn test_custom_voice_with_sample_is_converted() {
    let converter = Arc::new(FakeConverter::new(false));
    let harness = Harness::build(HarnessOptions {
        converter: Some(converter.clone()),
        voice_model: true,
        ..Default::default()
    })
    .await;
    write_tone(&harness.paths.voice_sample_path(), 1.0);
    let mut rx = harness.event_bus.subscribe();

    let record = harness
        .orchestrator
        .execute_job(new_record(request(json!({ "title": "Mine", "voice_type": "custom" }))))
        .await;

    assert_eq!(record.state, JobState::Done);
    assert_eq!(*converter.calls.lock().unwrap(), 1);
    assert!(record.artifacts.path(ArtifactKind::ConvertedVocals).unwrap().is_file());

    let requests = harness.vocals.requests.lock().unwrap();
    assert_eq!(requests[0].1, "custom");
    assert!(requests[0].2);

    assert!(stages(&drain(&mut rx)).contains(&"CONVERTED_VOCALS_READY".to_string()));
}

#[cfg(feature = "voice-conversion")]
#[tokio::test]
async fn test_conversion_errors_pass_vocals_through() {
    for (fail, voice_model, expected) in [(true, true, "converter crashed"), (false, false, "no model")] {
        let converter = Arc::new(FakeConverter::new(fail));
        let harness = Harness::build(HarnessOptions {
            converter: Some(converter.clone()),
            voice_model,
            ..Default::default()
        })
        .await;
        write_tone(&harness.paths.voice_sample_path(), 1.0);

        let record = harness
            .orchestrator
            .execute_job(new_record(request(json!({ "title": "Mine", "voice_type": "custom" }))))
            .await;

        assert_eq!(record.state, JobState::Done);
        assert_eq!(*converter.calls.lock().unwrap(), 1);
        assert!(record.artifacts.get(ArtifactKind::ConvertedVocals).is_none());
        assert!(
            record
                .fallbacks
                .iter()
                .any(|f| f.starts_with("voice_conversion:") && f.contains(expected)),
            "fallbacks: {:?}",
            record.fallbacks
        );
    }
}

#[tokio::test]
async fn test_conversion_not_requested_is_skipped() {
    let converter = Arc::new(FakeConverter::new(false));
    let harness = Harness::build(HarnessOptions {
        converter: Some(converter.clone()),
        voice_model: true,
        ..Default::default()
    })
    .await;
    write_tone(&harness.paths.voice_sample_path(), 1.0);

    let record = harness
        .orchestrator
        .execute_job(new_record(request(json!({
            "title": "Mine",
            "voice_type": "custom",
            "use_voice_conversion": false
        }))))
        .await;

    assert_eq!(record.state, JobState::Done);
    assert_eq!(*converter.calls.lock().unwrap(), 0);
    assert!(!record.fallbacks.iter().any(|f| f.starts_with("voice_conversion:")));
}

#[tokio::test]
async fn test_wav_format_publishes_and_logs_mix_wav() {
    let uploader = Arc::new(RecordingUploader::default());
    let harness = Harness::build(HarnessOptions {
        uploader: Some(uploader.clone()),
        ..Default::default()
    })
    .await;

    let record = harness
        .orchestrator
        .execute_job(new_record(request(json!({ "title": "Raw", "file_format": "WAV" }))))
        .await;

    let mix_name = format!("{}_mix.wav", record.job_id);
    assert!(harness.public_files().contains(&mix_name));
    assert_eq!(uploader.uploaded.lock().unwrap().len(), 4);

    let log = harness.generation_log();
    assert!(log.contains("FORMAT: wav"));
    assert!(log.contains(&format!(
        "FILE: {}",
        harness.paths.public_dir.join(&mix_name).display()
    )));
}

#[tokio::test]
async fn test_submitted_jobs_with_same_title_never_collide() {
    let harness = Harness::new().await;

    let first = harness.orchestrator.submit(test_song()).await;
    let second = harness.orchestrator.submit(test_song()).await;
    assert_ne!(first.job_id, second.job_id);
    assert_eq!(first.state, JobState::Created);

    let first = wait_terminal(&harness, first.job_id.as_str()).await;
    let second = wait_terminal(&harness, second.job_id.as_str()).await;
    assert_eq!(first.state, JobState::Done);
    assert_eq!(second.state, JobState::Done);

    assert_eq!(harness.public_files().len(), 6);
    assert_eq!(harness.generation_log().matches("TITLE: Test Song").count(), 2);
}
