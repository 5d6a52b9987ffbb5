//! Hand-off to the external video-call component.
//!
//! Audio and video transport live in the RTC SDK; this module only describes
//! what the board hands to it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Participant role in a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientRole {
    /// Publishes camera and microphone.
    Broadcaster,
    /// Receives only.
    Audience,
}

impl ClientRole {
    /// Text shown for this role in the role prompt.
    pub fn prompt_label(self) -> &'static str {
        match self {
            ClientRole::Broadcaster => "Open Camera Now",
            ClientRole::Audience => "Not Open Camera Now",
        }
    }

    pub fn publishes_video(self) -> bool {
        matches!(self, ClientRole::Broadcaster)
    }
}

/// Capture dimensions requested from the RTC component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoProfile {
    pub width: u32,
    pub height: u32,
}

impl VideoProfile {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Dimensions offered on the settings screen, smallest first.
    pub const PRESETS: [VideoProfile; 6] = [
        VideoProfile::new(320, 180),
        VideoProfile::new(320, 240),
        VideoProfile::new(640, 360),
        VideoProfile::new(640, 480),
        VideoProfile::new(960, 720),
        VideoProfile::new(1280, 720),
    ];
}

impl Default for VideoProfile {
    fn default() -> Self {
        Self::new(640, 360)
    }
}

impl fmt::Display for VideoProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Everything the RTC component needs to join a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRequest {
    pub room: String,
    pub role: ClientRole,
    pub profile: VideoProfile,
}
