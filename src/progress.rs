//! Level progress
//!
//! The game's level counter, passed around explicitly and saved by the host
//! between scenes. Level 1 uses three-word phrases, level 2 four-word
//! phrases, and so on.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::utils::error::{CaptureError, CaptureResult};

/// Words in the phrases of level 1
const FIRST_LEVEL_PHRASE_LENGTH: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelProgress {
    pub level: u32,
    pub max_level: u32,
}

/// Outcome of finishing a level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelAdvance {
    /// Play the given level next
    NextLevel(u32),
    /// Every level is done; progress starts over at level 1
    Finished,
}

impl LevelProgress {
    /// Progress for a phrase set whose longest phrase has
    /// `max_phrase_length` words.
    pub fn new(max_phrase_length: u32) -> CaptureResult<Self> {
        if max_phrase_length < FIRST_LEVEL_PHRASE_LENGTH {
            return Err(CaptureError::Config(format!(
                "max phrase length {} is below {}",
                max_phrase_length, FIRST_LEVEL_PHRASE_LENGTH
            )));
        }
        Ok(Self {
            level: 1,
            max_level: max_phrase_length - FIRST_LEVEL_PHRASE_LENGTH + 1,
        })
    }

    /// Words per phrase at the current level
    pub fn phrase_length(&self) -> u32 {
        self.level + FIRST_LEVEL_PHRASE_LENGTH - 1
    }

    pub fn is_final_level(&self) -> bool {
        self.level >= self.max_level
    }

    pub fn advance(&mut self) -> LevelAdvance {
        if self.is_final_level() {
            tracing::info!("All {} levels complete", self.max_level);
            self.level = 1;
            LevelAdvance::Finished
        } else {
            self.level += 1;
            tracing::info!("Advancing to level {}", self.level);
            LevelAdvance::NextLevel(self.level)
        }
    }

    /// Read saved progress; `None` when nothing was saved yet
    pub fn load(path: &Path) -> CaptureResult<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    pub fn save(&self, path: &Path) -> CaptureResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_levels_map_to_phrase_lengths() {
        let mut progress = LevelProgress::new(5).unwrap();
        assert_eq!(progress.max_level, 3);
        assert_eq!(progress.phrase_length(), 3);

        assert_eq!(progress.advance(), LevelAdvance::NextLevel(2));
        assert_eq!(progress.phrase_length(), 4);
        assert_eq!(progress.advance(), LevelAdvance::NextLevel(3));
        assert!(progress.is_final_level());

        assert_eq!(progress.advance(), LevelAdvance::Finished);
        assert_eq!(progress.level, 1);
    }

    #[test]
    fn test_rejects_short_phrase_sets() {
        assert!(LevelProgress::new(2).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state/progress.json");
        assert!(LevelProgress::load(&path).unwrap().is_none());

        let mut progress = LevelProgress::new(5).unwrap();
        progress.advance();
        progress.save(&path).unwrap();

        assert_eq!(LevelProgress::load(&path).unwrap(), Some(progress));
    }
}
