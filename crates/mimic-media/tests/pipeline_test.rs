use async_trait::async_trait;
use mimic_media::{
    decode_audio, CommandRunner, MediaError, MediaPipeline, PipelineStage, SpeechSynthesizer,
    ToolCommand, ToolConfig, TurnWorkspace,
};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const FAKE_MP3: &[u8] = &[0x49, 0x44, 0x33, 0x04, 0x00, 0xFF, 0xFB];

struct FakeSynthesizer {
    fail: bool,
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize(&self, _text: &str, output: &Path) -> Result<(), MediaError> {
        if self.fail {
            return Err(MediaError::Synthesis("quota exceeded".to_string()));
        }
        tokio::fs::write(output, FAKE_MP3).await?;
        Ok(())
    }

    async fn list_voices(&self) -> Result<Value, MediaError> {
        Ok(json!({"voices": []}))
    }
}

/// Stands in for ffmpeg and rhubarb: writes the output file named in the command.
#[derive(Default)]
struct FakeRunner {
    fail_program: Option<&'static str>,
    lipsync: Option<&'static str>,
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, command: &ToolCommand) -> Result<String, MediaError> {
        let label = command.label();
        self.calls.lock().unwrap().push(command.to_string());
        if self.fail_program == Some(label.as_str()) {
            return Err(MediaError::ToolExecution {
                program: label,
                detail: "exit status: 1: boom".to_string(),
            });
        }
        let args: Vec<PathBuf> = command.args().iter().map(PathBuf::from).collect();
        match label.as_str() {
            "ffmpeg" => {
                let output = args.last().unwrap();
                tokio::fs::write(output, b"RIFF").await?;
            }
            "rhubarb" => {
                let output = &args[3];
                let doc = self
                    .lipsync
                    .unwrap_or(r#"{"metadata":{"duration":0.5},"mouthCues":[{"start":0.0,"end":0.5,"value":"X"}]}"#);
                tokio::fs::write(output, doc).await?;
            }
            other => panic!("unexpected program {other}"),
        }
        Ok(String::new())
    }
}

fn tools() -> ToolConfig {
    ToolConfig {
        ffmpeg_binary: PathBuf::from("/opt/ffmpeg/ffmpeg"),
        rhubarb_binary: PathBuf::from("bin/rhubarb"),
        timeout_secs: 5,
    }
}

#[tokio::test]
async fn test_pipeline_produces_audio_and_lipsync() {
    let root = tempfile::tempdir().unwrap();
    let workspace = TurnWorkspace::create_in(root.path()).await.unwrap();
    let runner = Arc::new(FakeRunner::default());
    let pipeline = MediaPipeline::new(
        Arc::new(FakeSynthesizer { fail: false }),
        runner.clone(),
        tools(),
    );

    let payload = pipeline.run(&workspace, 1, "Hello there").await.unwrap();

    assert_eq!(decode_audio(&payload.audio).unwrap(), FAKE_MP3);
    assert_eq!(payload.lipsync["mouthCues"][0]["value"], "X");

    let calls = runner.calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    let dir = workspace.path().display().to_string();
    assert_eq!(
        calls[0],
        format!(
            "/opt/ffmpeg/ffmpeg -y -i {dir}/message_1.mp3 {dir}/message_1.wav"
        )
    );
    assert_eq!(
        calls[1],
        format!(
            "bin/rhubarb -f json -o {dir}/message_1.json {dir}/message_1.wav -r phonetic"
        )
    );
}

#[tokio::test]
async fn test_synthesis_failure_skips_tools() {
    let root = tempfile::tempdir().unwrap();
    let workspace = TurnWorkspace::create_in(root.path()).await.unwrap();
    let runner = Arc::new(FakeRunner::default());
    let pipeline = MediaPipeline::new(
        Arc::new(FakeSynthesizer { fail: true }),
        runner.clone(),
        tools(),
    );

    let failure = pipeline.run(&workspace, 0, "Hello").await.unwrap_err();
    assert_eq!(failure.index, 0);
    assert_eq!(failure.stage, PipelineStage::Synthesize);
    assert!(matches!(failure.source, MediaError::Synthesis(_)));
    assert!(runner.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_transcode_failure_aborts_before_visemes() {
    let root = tempfile::tempdir().unwrap();
    let workspace = TurnWorkspace::create_in(root.path()).await.unwrap();
    let runner = Arc::new(FakeRunner {
        fail_program: Some("ffmpeg"),
        ..Default::default()
    });
    let pipeline = MediaPipeline::new(
        Arc::new(FakeSynthesizer { fail: false }),
        runner.clone(),
        tools(),
    );

    let failure = pipeline.run(&workspace, 2, "Hello").await.unwrap_err();
    assert_eq!(failure.stage, PipelineStage::Transcode);
    match &failure.source {
        MediaError::ToolExecution { program, detail } => {
            assert_eq!(program, "ffmpeg");
            assert!(detail.contains("boom"));
        }
        other => panic!("expected ToolExecution, got {other:?}"),
    }
    assert_eq!(runner.calls.lock().unwrap().len(), 1);
    assert!(!workspace.path().join("message_2.json").exists());
}

#[tokio::test]
async fn test_invalid_lipsync_document_fails_at_encode() {
    let root = tempfile::tempdir().unwrap();
    let workspace = TurnWorkspace::create_in(root.path()).await.unwrap();
    let runner = Arc::new(FakeRunner {
        lipsync: Some("not json"),
        ..Default::default()
    });
    let pipeline = MediaPipeline::new(Arc::new(FakeSynthesizer { fail: false }), runner, tools());

    let failure = pipeline.run(&workspace, 0, "Hello").await.unwrap_err();
    assert_eq!(failure.stage, PipelineStage::Encode);
    assert!(matches!(failure.source, MediaError::Lipsync(_)));
    assert!(failure.to_string().starts_with("fragment 0 failed at encode"));
}

#[tokio::test]
async fn test_fragments_do_not_share_artifacts() {
    let root = tempfile::tempdir().unwrap();
    let workspace = TurnWorkspace::create_in(root.path()).await.unwrap();
    let pipeline = MediaPipeline::new(
        Arc::new(FakeSynthesizer { fail: false }),
        Arc::new(FakeRunner::default()),
        tools(),
    );

    pipeline.run(&workspace, 0, "one").await.unwrap();
    pipeline.run(&workspace, 1, "two").await.unwrap();

    for index in 0..2 {
        for ext in ["mp3", "wav", "json"] {
            assert!(workspace
                .path()
                .join(format!("message_{index}.{ext}"))
                .exists());
        }
    }
}
