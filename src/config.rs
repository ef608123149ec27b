//! Engine configuration
//!
//! Every field has a default, so a config file only lists what it changes:
//!
//! ```toml
//! volume = 60
//! computer_voice = true
//! voice_dir = "/opt/beep/voices"
//! ```

use crate::error::Result;
use crate::generator::SAMPLE_AMP_16BIT;
use crate::voice::{VoiceKind, VoiceSamples};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Directory under the home directory holding voices and sheets
pub const BEEP_DIR: &str = ".beep";

/// Configuration for a music engine
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Output volume in percent, 1 to 100
    pub volume: u8,
    /// Load natural voice recordings when they are installed
    pub natural_voices: bool,
    /// Play synthesized notes even when recordings are loaded
    pub computer_voice: bool,
    /// Voice sample root, `~/.beep/voices` when unset
    pub voice_dir: Option<PathBuf>,
    /// Sheet storage root, `~/.beep/sheets` when unset
    pub sheet_dir: Option<PathBuf>,
    /// Attach the source text to every rendered line
    pub print_sheet: bool,
    /// Attach resolved note names to every rendered line
    pub print_notes: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            volume: 100,
            natural_voices: true,
            computer_voice: false,
            voice_dir: None,
            sheet_dir: None,
            print_sheet: true,
            print_notes: false,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Volume scaled to 16-bit full scale
    pub fn volume_level(&self) -> i32 {
        let percent = self.volume.clamp(1, 100) as f64;
        (SAMPLE_AMP_16BIT * percent / 100.0) as i32
    }

    /// `~/.beep`, if a home directory is known
    pub fn beep_home() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(BEEP_DIR))
    }

    pub fn voice_root(&self) -> Option<PathBuf> {
        self.voice_dir
            .clone()
            .or_else(|| Self::beep_home().map(|home| home.join("voices")))
    }

    pub fn sheet_root(&self) -> Option<PathBuf> {
        self.sheet_dir
            .clone()
            .or_else(|| Self::beep_home().map(|home| home.join("sheets")))
    }

    /// Recordings of a voice, or `None` when natural voices are off
    pub fn sample_source(&self, kind: VoiceKind) -> Option<VoiceSamples> {
        if !self.natural_voices {
            return None;
        }
        self.voice_root()
            .map(|root| VoiceSamples::locate(&root, kind.name()))
    }
}
