//! Session recorder
//!
//! Owns the single append-only file of the session being signed. Frames are
//! encoded as UTF-16LE and buffered; nothing is guaranteed on disk until
//! `commit`. A discarded session leaves no file behind and gives its number
//! back so the retry reuses it. Session files are always created fresh; an
//! existing file from an earlier run is never reopened.

use chrono::Utc;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::layout;
use super::state::{DiscardOutcome, RecorderState, SessionInfo, SessionSummary};
use crate::utils::error::{CaptureError, CaptureResult};

/// Default writer buffer size in bytes
pub const DEFAULT_BUFFER_BYTES: usize = 25_000;

/// Byte sink behind an open session
pub trait SessionSink: Write {
    /// Force everything written so far to stable storage
    fn sync(&mut self) -> io::Result<()>;
}

impl SessionSink for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

/// Creates the sink for a new session file.
///
/// Must fail with `AlreadyExists` rather than reuse a file that is there.
pub type SinkOpener = fn(&Path) -> io::Result<Box<dyn SessionSink>>;

/// Create a brand-new session file
pub fn open_session_file(path: &Path) -> io::Result<Box<dyn SessionSink>> {
    let file = OpenOptions::new().write(true).create_new(true).open(path)?;
    Ok(Box::new(file))
}

struct ActiveSession {
    info: SessionInfo,
    root: PathBuf,
    writer: BufWriter<Box<dyn SessionSink>>,
    /// Counter value before this session reserved its number
    counter_before: u32,
}

/// Writes one phrase's sessions to disk, one open file at a time.
pub struct SessionRecorder {
    state: RecorderState,
    phrase: Option<String>,
    next_session: u32,
    active: Option<ActiveSession>,
    extension: String,
    buffer_bytes: usize,
    opener: SinkOpener,
}

impl SessionRecorder {
    pub fn new(extension: impl Into<String>, buffer_bytes: usize) -> Self {
        Self {
            state: RecorderState::Idle,
            phrase: None,
            next_session: 1,
            active: None,
            extension: extension.into(),
            buffer_bytes,
            opener: open_session_file,
        }
    }

    /// Replace how session files are created
    pub fn set_opener(&mut self, opener: SinkOpener) {
        self.opener = opener;
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn phrase(&self) -> Option<&str> {
        self.phrase.as_deref()
    }

    /// Number the next `start_session` is expected to use
    pub fn next_session_number(&self) -> u32 {
        self.next_session
    }

    pub fn active_session(&self) -> Option<&SessionInfo> {
        self.active.as_ref().map(|active| &active.info)
    }

    /// First number at or past the counter whose session file does not
    /// exist under `root` yet.
    pub fn next_free_session(&self, root: &Path) -> u32 {
        let Some(phrase) = self.phrase.as_deref() else {
            return self.next_session;
        };
        let mut number = self.next_session;
        while layout::session_file(root, phrase, number, &self.extension).exists() {
            number += 1;
        }
        number
    }

    /// Choose the phrase to record; numbering restarts at 1.
    pub fn set_phrase(&mut self, phrase: &str) -> CaptureResult<()> {
        if self.state == RecorderState::Writing {
            return Err(CaptureError::InvalidTransition {
                operation: "set phrase",
                state: self.state.as_str(),
            });
        }
        layout::validate_phrase(phrase)?;

        tracing::info!("Phrase set to '{}'", phrase);
        self.phrase = Some(phrase.to_string());
        self.next_session = 1;
        self.state = RecorderState::PhraseSet;
        Ok(())
    }

    /// Create the session file and return its path.
    ///
    /// `session` may skip ahead of the counter but never go back to a
    /// number already handed out. A file left at that path by an earlier
    /// run is refused with `SessionExists`.
    pub fn start_session(&mut self, session: u32, root: &Path) -> CaptureResult<PathBuf> {
        if !self.state.can_start_session() {
            return Err(CaptureError::InvalidTransition {
                operation: "start a session",
                state: self.state.as_str(),
            });
        }
        if session == 0 || session < self.next_session {
            return Err(CaptureError::InvalidSessionNumber {
                requested: session,
                next: self.next_session,
            });
        }
        let phrase = match &self.phrase {
            Some(phrase) => phrase.clone(),
            None => {
                return Err(CaptureError::InvalidTransition {
                    operation: "start a session",
                    state: RecorderState::Idle.as_str(),
                })
            }
        };

        fs::create_dir_all(layout::session_dir(root, &phrase, session))?;
        let path = layout::session_file(root, &phrase, session, &self.extension);
        let sink = match (self.opener)(&path) {
            Ok(sink) => sink,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(CaptureError::SessionExists {
                    number: session,
                    path,
                })
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!("Session {} of '{}' writing to {:?}", session, phrase, path);

        self.active = Some(ActiveSession {
            info: SessionInfo {
                phrase,
                number: session,
                path: path.clone(),
                frames_written: 0,
                bytes_written: 0,
                started_at: Utc::now(),
            },
            root: root.to_path_buf(),
            writer: BufWriter::with_capacity(self.buffer_bytes, sink),
            counter_before: self.next_session,
        });
        self.next_session = session + 1;
        self.state = RecorderState::Writing;

        Ok(path)
    }

    /// Append text to the open session. Outside `Writing` this does nothing.
    pub fn append(&mut self, text: &str) -> CaptureResult<()> {
        let Some(active) = self.active.as_mut() else {
            tracing::trace!("Dropping {} bytes, no session open", text.len());
            return Ok(());
        };

        let bytes: Vec<u8> = text.encode_utf16().flat_map(u16::to_le_bytes).collect();
        active.writer.write_all(&bytes)?;

        active.info.frames_written += text.matches('\n').count();
        active.info.bytes_written += bytes.len() as u64;
        Ok(())
    }

    /// Close the open session and keep it.
    ///
    /// Returns `None` when no session was open. The file handle is released
    /// even if flushing fails.
    pub fn commit(&mut self) -> CaptureResult<Option<SessionSummary>> {
        let Some(active) = self.active.take() else {
            return Ok(None);
        };
        self.state = RecorderState::Committed;

        let ActiveSession { info, writer, .. } = active;
        let mut sink = writer.into_inner().map_err(|e| e.into_error())?;
        sink.sync()?;

        let summary = SessionSummary {
            phrase: info.phrase,
            number: info.number,
            path: info.path,
            frames_written: info.frames_written,
            bytes_written: info.bytes_written,
            started_at: info.started_at,
            ended_at: Utc::now(),
        };

        tracing::info!(
            "Committed session {} of '{}': {} frames in {}ms",
            summary.number,
            summary.phrase,
            summary.frames_written,
            summary.duration_ms()
        );
        Ok(Some(summary))
    }

    /// Close the open session, delete its file and give its number back.
    ///
    /// Calling this with no session open is a logged no-op that leaves the
    /// counter alone, so a double discard cannot rewind numbering.
    pub fn discard(&mut self, session: u32, root: &Path) -> CaptureResult<DiscardOutcome> {
        let Some(active) = self.active.as_ref() else {
            tracing::warn!("Discard of session {} ignored, no session open", session);
            return Ok(DiscardOutcome::NothingOpen);
        };
        if active.info.number != session || active.root != root {
            return Err(CaptureError::SessionMismatch {
                active: active.info.number,
                requested: session,
            });
        }

        let Some(active) = self.active.take() else {
            return Ok(DiscardOutcome::NothingOpen);
        };
        // Buffered bytes are thrown away, not flushed into a file we delete
        let (sink, _unwritten) = active.writer.into_parts();
        drop(sink);

        self.next_session = active.counter_before;
        self.state = RecorderState::Discarded;

        match fs::remove_file(&active.info.path) {
            Ok(()) => {
                tracing::info!(
                    "Discarded session {} of '{}'",
                    active.info.number,
                    active.info.phrase
                );
                Ok(DiscardOutcome::Deleted)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!("Session file {:?} was already removed", active.info.path);
                Ok(DiscardOutcome::AlreadyGone)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Drop an empty `bad_sample.txt` marker into the session directory.
    ///
    /// Independent of the open session, which keeps writing.
    pub fn mark_bad(&mut self, session: u32, root: &Path) -> CaptureResult<PathBuf> {
        let Some(phrase) = self.phrase.as_deref() else {
            return Err(CaptureError::InvalidTransition {
                operation: "mark a bad sample",
                state: self.state.as_str(),
            });
        };

        fs::create_dir_all(layout::session_dir(root, phrase, session))?;
        let marker = layout::bad_sample_file(root, phrase, session);
        File::create(&marker)?;

        tracing::info!("Marked session {} of '{}' as a bad sample", session, phrase);
        Ok(marker)
    }
}

impl Default for SessionRecorder {
    fn default() -> Self {
        Self::new(layout::DEFAULT_EXTENSION, DEFAULT_BUFFER_BYTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn read_utf16(path: &Path) -> String {
        let bytes = fs::read(path).unwrap();
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16(&units).unwrap()
    }

    #[test]
    fn test_commit_scenario() {
        let dir = tempdir().unwrap();
        let mut recorder = SessionRecorder::default();

        recorder.set_phrase("go_to_school").unwrap();
        let path = recorder.start_session(1, dir.path()).unwrap();
        assert_eq!(path, dir.path().join("go_to_school/1/go_to_school_1.txt"));

        for i in 0..3 {
            recorder.append(&format!("frame {}\n", i)).unwrap();
        }
        let summary = recorder.commit().unwrap().unwrap();

        assert_eq!(summary.frames_written, 3);
        assert_eq!(recorder.state(), RecorderState::Committed);
        assert_eq!(recorder.next_session_number(), 2);
        assert!(recorder.active_session().is_none());

        let content = read_utf16(&path);
        assert_eq!(content, "frame 0\nframe 1\nframe 2\n");
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn test_discard_scenario() {
        let dir = tempdir().unwrap();
        let mut recorder = SessionRecorder::default();
        recorder.set_phrase("go_to_school").unwrap();
        recorder.start_session(1, dir.path()).unwrap();
        recorder.commit().unwrap();

        let before = recorder.next_session_number();
        let path = recorder.start_session(2, dir.path()).unwrap();
        recorder.append("frame\n").unwrap();
        let outcome = recorder.discard(2, dir.path()).unwrap();

        assert_eq!(outcome, DiscardOutcome::Deleted);
        assert!(!path.exists());
        assert_eq!(recorder.next_session_number(), before);
        assert_eq!(recorder.state(), RecorderState::Discarded);
        assert!(!layout::bad_sample_file(dir.path(), "go_to_school", 2).exists());
    }

    #[test]
    fn test_sequential_numbering_has_no_gaps() {
        let dir = tempdir().unwrap();
        let mut recorder = SessionRecorder::default();
        recorder.set_phrase("cat_in_box").unwrap();

        let mut numbers = Vec::new();
        for _ in 0..5 {
            let number = recorder.next_session_number();
            recorder.start_session(number, dir.path()).unwrap();
            recorder.append("x\n").unwrap();
            numbers.push(recorder.commit().unwrap().unwrap().number);
        }

        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_double_discard_does_not_rewind() {
        let dir = tempdir().unwrap();
        let mut recorder = SessionRecorder::default();
        recorder.set_phrase("cat_in_box").unwrap();
        recorder.start_session(1, dir.path()).unwrap();
        recorder.commit().unwrap();
        recorder.start_session(2, dir.path()).unwrap();

        recorder.discard(2, dir.path()).unwrap();
        assert_eq!(recorder.next_session_number(), 2);

        let outcome = recorder.discard(2, dir.path()).unwrap();
        assert_eq!(outcome, DiscardOutcome::NothingOpen);
        assert_eq!(recorder.next_session_number(), 2);
    }

    #[test]
    fn test_discard_tolerates_missing_file() {
        let dir = tempdir().unwrap();
        let mut recorder = SessionRecorder::default();
        recorder.set_phrase("cat_in_box").unwrap();
        let path = recorder.start_session(1, dir.path()).unwrap();

        fs::remove_file(&path).unwrap();
        let outcome = recorder.discard(1, dir.path()).unwrap();

        assert_eq!(outcome, DiscardOutcome::AlreadyGone);
        assert_eq!(recorder.next_session_number(), 1);
    }

    #[test]
    fn test_discard_wrong_session_rejected() {
        let dir = tempdir().unwrap();
        let mut recorder = SessionRecorder::default();
        recorder.set_phrase("cat_in_box").unwrap();
        let path = recorder.start_session(1, dir.path()).unwrap();

        assert!(matches!(
            recorder.discard(7, dir.path()),
            Err(CaptureError::SessionMismatch { active: 1, requested: 7 })
        ));
        assert_eq!(recorder.state(), RecorderState::Writing);
        assert!(path.exists());
    }

    #[test]
    fn test_set_phrase_while_writing_fails() {
        let dir = tempdir().unwrap();
        let mut recorder = SessionRecorder::default();
        recorder.set_phrase("cat_in_box").unwrap();
        recorder.start_session(1, dir.path()).unwrap();

        assert!(matches!(
            recorder.set_phrase("other"),
            Err(CaptureError::InvalidTransition { .. })
        ));
        assert_eq!(recorder.phrase(), Some("cat_in_box"));
    }

    #[test]
    fn test_start_requires_phrase_and_fresh_number() {
        let dir = tempdir().unwrap();
        let mut recorder = SessionRecorder::default();
        assert!(matches!(
            recorder.start_session(1, dir.path()),
            Err(CaptureError::InvalidTransition { .. })
        ));

        recorder.set_phrase("cat_in_box").unwrap();
        recorder.start_session(1, dir.path()).unwrap();
        recorder.commit().unwrap();

        assert!(matches!(
            recorder.start_session(1, dir.path()),
            Err(CaptureError::InvalidSessionNumber { requested: 1, next: 2 })
        ));
        assert!(recorder.start_session(0, dir.path()).is_err());
    }

    #[test]
    fn test_append_without_session_is_silent() {
        let mut recorder = SessionRecorder::default();
        assert!(recorder.append("dropped\n").is_ok());

        recorder.set_phrase("cat_in_box").unwrap();
        assert!(recorder.append("dropped\n").is_ok());
        assert!(recorder.commit().unwrap().is_none());
    }

    #[test]
    fn test_commit_is_idempotent() {
        let dir = tempdir().unwrap();
        let mut recorder = SessionRecorder::default();
        recorder.set_phrase("cat_in_box").unwrap();
        recorder.start_session(1, dir.path()).unwrap();

        assert!(recorder.commit().unwrap().is_some());
        assert!(recorder.commit().unwrap().is_none());
        assert_eq!(recorder.next_session_number(), 2);
    }

    #[test]
    fn test_mark_bad_leaves_session_open() {
        let dir = tempdir().unwrap();
        let mut recorder = SessionRecorder::default();
        recorder.set_phrase("cat_in_box").unwrap();
        let path = recorder.start_session(1, dir.path()).unwrap();

        let marker = recorder.mark_bad(1, dir.path()).unwrap();
        recorder.append("still writing\n").unwrap();
        recorder.commit().unwrap();

        assert_eq!(marker, dir.path().join("cat_in_box/1/bad_sample.txt"));
        assert_eq!(fs::metadata(&marker).unwrap().len(), 0);
        assert_eq!(read_utf16(&path), "still writing\n");
    }

    #[test]
    fn test_utf16_encoding_has_no_bom() {
        let dir = tempdir().unwrap();
        let mut recorder = SessionRecorder::default();
        recorder.set_phrase("cat_in_box").unwrap();
        let path = recorder.start_session(1, dir.path()).unwrap();
        recorder.append("A\n").unwrap();
        recorder.commit().unwrap();

        assert_eq!(fs::read(&path).unwrap(), vec![b'A', 0, b'\n', 0]);
    }

    #[test]
    fn test_restart_never_reopens_committed_session() {
        let dir = tempdir().unwrap();

        let mut first = SessionRecorder::default();
        first.set_phrase("go_to_school").unwrap();
        let kept = first.start_session(1, dir.path()).unwrap();
        first.append("kept\n").unwrap();
        first.commit().unwrap();

        // A fresh process starts counting from 1 again
        let mut second = SessionRecorder::default();
        second.set_phrase("go_to_school").unwrap();
        assert!(matches!(
            second.start_session(second.next_session_number(), dir.path()),
            Err(CaptureError::SessionExists { number: 1, .. })
        ));
        assert_eq!(second.state(), RecorderState::PhraseSet);

        let number = second.next_free_session(dir.path());
        assert_eq!(number, 2);
        let retry = second.start_session(number, dir.path()).unwrap();
        second.append("dropped\n").unwrap();
        second.discard(number, dir.path()).unwrap();

        assert!(!retry.exists());
        assert_eq!(read_utf16(&kept), "kept\n");
        assert_eq!(second.next_free_session(dir.path()), 2);
    }

    struct BrokenSink;

    impl Write for BrokenSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(ErrorKind::Other, "device full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SessionSink for BrokenSink {
        fn sync(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn open_broken(path: &Path) -> io::Result<Box<dyn SessionSink>> {
        open_session_file(path)?;
        Ok(Box::new(BrokenSink))
    }

    #[test]
    fn test_failed_flush_still_closes_session() {
        let dir = tempdir().unwrap();
        let mut recorder = SessionRecorder::default();
        recorder.set_opener(open_broken);
        recorder.set_phrase("cat_in_box").unwrap();
        recorder.start_session(1, dir.path()).unwrap();

        // Fits in the buffer, so the fault only shows on commit
        recorder.append("frame\n").unwrap();
        assert!(matches!(recorder.commit(), Err(CaptureError::Io(_))));
        assert!(recorder.active_session().is_none());
        assert_eq!(recorder.next_session_number(), 2);
    }

    #[test]
    fn test_unbuffered_append_surfaces_write_error() {
        let dir = tempdir().unwrap();
        let mut recorder = SessionRecorder::new("txt", 4);
        recorder.set_opener(open_broken);
        recorder.set_phrase("cat_in_box").unwrap();
        recorder.start_session(1, dir.path()).unwrap();

        assert!(matches!(
            recorder.append("longer than the buffer\n"),
            Err(CaptureError::Io(_))
        ));
    }
}
