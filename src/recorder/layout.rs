//! On-disk layout of recorded sessions
//!
//! ```text
//! <root>/<phrase>/<session>/<phrase>_<session>.<ext>
//! <root>/<phrase>/<session>/bad_sample.txt
//! ```

use std::path::{Path, PathBuf};

use crate::utils::error::{CaptureError, CaptureResult};

/// Empty marker flagging a session as a bad sample
pub const BAD_SAMPLE_FILE_NAME: &str = "bad_sample.txt";

/// Default session file extension
pub const DEFAULT_EXTENSION: &str = "txt";

/// Directory holding everything for one session
pub fn session_dir(root: &Path, phrase: &str, session: u32) -> PathBuf {
    root.join(phrase).join(session.to_string())
}

/// The session's frame file
pub fn session_file(root: &Path, phrase: &str, session: u32, extension: &str) -> PathBuf {
    session_dir(root, phrase, session).join(format!("{}_{}.{}", phrase, session, extension))
}

/// The session's bad-sample marker
pub fn bad_sample_file(root: &Path, phrase: &str, session: u32) -> PathBuf {
    session_dir(root, phrase, session).join(BAD_SAMPLE_FILE_NAME)
}

/// Phrase names become a single path component.
pub fn validate_phrase(phrase: &str) -> CaptureResult<()> {
    let bad = phrase.is_empty()
        || phrase == "."
        || phrase == ".."
        || phrase.chars().any(|c| matches!(c, '/' | '\\' | '\0'));

    if bad {
        return Err(CaptureError::InvalidPhrase(phrase.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_paths() {
        let root = Path::new("/data/PhraseData");

        assert_eq!(
            session_file(root, "go_to_school", 3, "txt"),
            PathBuf::from("/data/PhraseData/go_to_school/3/go_to_school_3.txt")
        );
        assert_eq!(
            bad_sample_file(root, "go_to_school", 3),
            PathBuf::from("/data/PhraseData/go_to_school/3/bad_sample.txt")
        );
    }

    #[test]
    fn test_validate_phrase() {
        assert!(validate_phrase("alligator_behind_chair").is_ok());
        assert!(validate_phrase("").is_err());
        assert!(validate_phrase("..").is_err());
        assert!(validate_phrase("cat/../../etc").is_err());
        assert!(validate_phrase("cat\\box").is_err());
    }
}
