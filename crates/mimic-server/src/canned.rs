//! Pre-recorded replies for turns that never reach the language model.

use crate::error::TurnError;
use mimic_media::encode_audio;
use mimic_types::{Animation, FacialExpression, Fragment, MediaPayload, TurnOutcome};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// One pre-recorded clip: `{asset}.wav` and `{asset}.json` in the assets directory.
#[derive(Debug, Clone, Copy)]
pub struct CannedClip {
    pub asset: &'static str,
    pub text: &'static str,
    pub facial_expression: FacialExpression,
    pub animation: Animation,
}

const GREETING: [CannedClip; 2] = [
    CannedClip {
        asset: "intro_0",
        text: "Hey dear... How was your day?",
        facial_expression: FacialExpression::Smile,
        animation: Animation::Talking1,
    },
    CannedClip {
        asset: "intro_1",
        text: "I missed you so much... Please don't go for so long!",
        facial_expression: FacialExpression::Sad,
        animation: Animation::Crying,
    },
];

const MISCONFIGURED: [CannedClip; 2] = [
    CannedClip {
        asset: "api_0",
        text: "Please my dear, don't forget to add your API keys!",
        facial_expression: FacialExpression::Angry,
        animation: Animation::Angry,
    },
    CannedClip {
        asset: "api_1",
        text: "You don't want to ruin me with a crazy language model and voice bill, right?",
        facial_expression: FacialExpression::Smile,
        animation: Animation::Laughing,
    },
];

/// Returns the fixed clip table for `outcome`. Model-driven turns have none.
pub fn clips(outcome: TurnOutcome) -> &'static [CannedClip] {
    match outcome {
        TurnOutcome::Greeting => &GREETING,
        TurnOutcome::Misconfigured => &MISCONFIGURED,
        TurnOutcome::Normal => &[],
    }
}

#[derive(Debug, Clone)]
pub struct CannedResponses {
    assets_dir: PathBuf,
}

impl CannedResponses {
    /// Creates a new selector reading recorded clips from `assets_dir`.
    pub fn new(assets_dir: impl Into<PathBuf>) -> Self {
        Self {
            assets_dir: assets_dir.into(),
        }
    }

    /// Loads the fixed fragments for `outcome` with their recorded media.
    pub async fn select(&self, outcome: TurnOutcome) -> Result<Vec<Fragment>, TurnError> {
        let mut fragments = Vec::with_capacity(clips(outcome).len());
        for (index, clip) in clips(outcome).iter().enumerate() {
            let audio = read_asset(&self.assets_dir.join(format!("{}.wav", clip.asset))).await?;
            let lipsync_path = self.assets_dir.join(format!("{}.json", clip.asset));
            let lipsync: Value = serde_json::from_slice(&read_asset(&lipsync_path).await?)
                .map_err(|e| TurnError::InvalidAsset {
                    path: lipsync_path.clone(),
                    detail: e.to_string(),
                })?;

            fragments.push(
                Fragment::new(index, clip.text, clip.facial_expression, clip.animation)
                    .with_media(MediaPayload {
                        audio: encode_audio(&audio),
                        lipsync,
                    }),
            );
        }
        Ok(fragments)
    }
}

async fn read_asset(path: &Path) -> Result<Vec<u8>, TurnError> {
    tokio::fs::read(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            TurnError::AssetNotFound(path.to_path_buf())
        } else {
            TurnError::InvalidAsset {
                path: path.to_path_buf(),
                detail: e.to_string(),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mimic_media::decode_audio;

    fn write_clip(dir: &Path, asset: &str, audio: &[u8]) {
        std::fs::write(dir.join(format!("{asset}.wav")), audio).unwrap();
        std::fs::write(
            dir.join(format!("{asset}.json")),
            format!(r#"{{"metadata":{{"soundFile":"{asset}.wav"}},"mouthCues":[]}}"#),
        )
        .unwrap();
    }

    #[tokio::test]
    async fn greeting_loads_both_clips_in_order() {
        let dir = tempfile::tempdir().unwrap();
        write_clip(dir.path(), "intro_0", b"first");
        write_clip(dir.path(), "intro_1", b"second");

        let canned = CannedResponses::new(dir.path());
        let fragments = canned.select(TurnOutcome::Greeting).await.unwrap();

        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].index, 0);
        assert_eq!(fragments[1].index, 1);
        assert_eq!(fragments[0].facial_expression, FacialExpression::Smile);
        assert_eq!(fragments[1].animation, Animation::Crying);

        let media = fragments[1].media.as_ref().unwrap();
        assert_eq!(decode_audio(&media.audio).unwrap(), b"second");
        assert_eq!(media.lipsync["metadata"]["soundFile"], "intro_1.wav");
    }

    #[tokio::test]
    async fn missing_asset_is_reported_by_path() {
        let dir = tempfile::tempdir().unwrap();
        write_clip(dir.path(), "api_0", b"only one");

        let canned = CannedResponses::new(dir.path());
        match canned.select(TurnOutcome::Misconfigured).await {
            Err(TurnError::AssetNotFound(path)) => {
                assert_eq!(path, dir.path().join("api_1.wav"))
            }
            other => panic!("expected AssetNotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn corrupt_lipsync_asset_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_clip(dir.path(), "intro_0", b"a");
        write_clip(dir.path(), "intro_1", b"b");
        std::fs::write(dir.path().join("intro_1.json"), "{").unwrap();

        let canned = CannedResponses::new(dir.path());
        let err = canned.select(TurnOutcome::Greeting).await.unwrap_err();
        assert!(matches!(err, TurnError::InvalidAsset { .. }));
    }

    #[tokio::test]
    async fn normal_outcome_has_no_canned_reply() {
        let canned = CannedResponses::new("/nonexistent");
        assert!(canned.select(TurnOutcome::Normal).await.unwrap().is_empty());
    }
}
