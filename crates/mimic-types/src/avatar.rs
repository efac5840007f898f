//! Avatar cue definitions.
//!
//! The client-side avatar understands a closed set of facial expressions and
//! animations. These enums mirror that set and serialize to the exact names
//! the client expects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A cue name that is not part of the avatar's vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownCueError {
    pub kind: &'static str,
    pub value: String,
}

/// Facial expression shown while a fragment is spoken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FacialExpression {
    Smile,
    Sad,
    Angry,
    Surprised,
    FunnyFace,
    /// Neutral face.
    #[default]
    Default,
}

impl FacialExpression {
    pub const ALL: [Self; 6] = [
        Self::Smile,
        Self::Sad,
        Self::Angry,
        Self::Surprised,
        Self::FunnyFace,
        Self::Default,
    ];

    /// Returns the wire name of this expression.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Smile => "smile",
            Self::Sad => "sad",
            Self::Angry => "angry",
            Self::Surprised => "surprised",
            Self::FunnyFace => "funnyFace",
            Self::Default => "default",
        }
    }
}

impl FromStr for FacialExpression {
    type Err = UnknownCueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| UnknownCueError {
                kind: "facial expression",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for FacialExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body animation played while a fragment is spoken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Animation {
    #[serde(rename = "Talking_0")]
    Talking0,
    #[serde(rename = "Talking_1")]
    Talking1,
    #[serde(rename = "Talking_2")]
    Talking2,
    Crying,
    Laughing,
    Rumba,
    #[default]
    Idle,
    Terrified,
    Angry,
}

impl Animation {
    pub const ALL: [Self; 9] = [
        Self::Talking0,
        Self::Talking1,
        Self::Talking2,
        Self::Crying,
        Self::Laughing,
        Self::Rumba,
        Self::Idle,
        Self::Terrified,
        Self::Angry,
    ];

    /// Returns the wire name of this animation (the clip name in the avatar rig).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Talking0 => "Talking_0",
            Self::Talking1 => "Talking_1",
            Self::Talking2 => "Talking_2",
            Self::Crying => "Crying",
            Self::Laughing => "Laughing",
            Self::Rumba => "Rumba",
            Self::Idle => "Idle",
            Self::Terrified => "Terrified",
            Self::Angry => "Angry",
        }
    }
}

impl FromStr for Animation {
    type Err = UnknownCueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| UnknownCueError {
                kind: "animation",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for Animation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
