//! Line emission through a hostile sink.
//!
//! The sink is line-oriented, has an undocumented maximum safe line length,
//! and is known to coalesce rapidly repeated identical-tag lines, silently
//! dropping part of a trace. [`LineEmitter`] defends against both: logical
//! lines are chunked to a configurable width, and every physical line goes out
//! under a tag carrying one of four rotation markers in fixed cyclic order so
//! no two consecutive lines look identical to the transport.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::info;

/// Markers appended to the tag, cycling once per physical line.
const ROTATION_MARKERS: [&str; 4] = ["|", "/", "-", "\\"];

/// Default maximum physical line length, in characters.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 110;

/// Destination for trace lines. One tag + one physical line per call; no
/// return value and no error contract (the transport is assumed to accept
/// everything, modulo the behaviors defended against above).
pub trait LogSink: Send + Sync + 'static {
    fn emit(&self, tag: &str, line: &str);
}

/// Default sink: forwards every line to `tracing` at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&self, tag: &str, line: &str) {
        info!(tag, "{line}");
    }
}

/// Splits multi-line blocks into transport-safe physical lines.
///
/// All emission happens on the single dispatch worker, so the rotation
/// counter is thread-confined in practice; the atomic just lets the emitter
/// be shared by the tasks of one layer without interior-mutability gymnastics.
pub struct LineEmitter {
    sink: Arc<dyn LogSink>,
    max_line_length: usize,
    rotation: AtomicUsize,
}

impl LineEmitter {
    pub fn new(sink: Arc<dyn LogSink>, max_line_length: usize) -> Self {
        Self {
            sink,
            max_line_length,
            rotation: AtomicUsize::new(0),
        }
    }

    /// Emit every physical line of `text` in order.
    ///
    /// With `wrap=true`, logical lines longer than the configured maximum are
    /// split into fixed-width slices of at most that many characters. With
    /// `wrap=false` each logical line is emitted whole; used for structured
    /// body text whose chunking is already bounded upstream.
    pub fn emit_block(&self, tag: &str, text: &str, wrap: bool) {
        for line in text.split('\n') {
            if wrap {
                for chunk in chunk_line(line, self.max_line_length) {
                    self.emit_line(tag, chunk);
                }
            } else {
                self.emit_line(tag, line);
            }
        }
    }

    fn emit_line(&self, tag: &str, line: &str) {
        let n = self.rotation.fetch_add(1, Ordering::Relaxed) % ROTATION_MARKERS.len();
        let tagged = format!("{tag}{}", ROTATION_MARKERS[n]);
        self.sink.emit(&tagged, line);
    }
}

/// Split a logical line into consecutive slices of at most `max` characters.
/// Slicing is by code point, never through the middle of one; concatenating
/// the result reproduces the input exactly.
fn chunk_line(line: &str, max: usize) -> Vec<&str> {
    debug_assert!(max > 0);
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (idx, _) in line.char_indices() {
        if count == max {
            chunks.push(&line[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    chunks.push(&line[start..]);
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Mutex;

    /// Sink that records every (tag, line) pair for assertions.
    #[derive(Default)]
    struct VecSink {
        lines: Mutex<Vec<(String, String)>>,
    }

    impl VecSink {
        fn take(&self) -> Vec<(String, String)> {
            std::mem::take(&mut *self.lines.lock().unwrap())
        }
    }

    impl LogSink for VecSink {
        fn emit(&self, tag: &str, line: &str) {
            self.lines
                .lock()
                .unwrap()
                .push((tag.to_string(), line.to_string()));
        }
    }

    fn emitter(max: usize) -> (Arc<VecSink>, LineEmitter) {
        let sink = Arc::new(VecSink::default());
        let emitter = LineEmitter::new(sink.clone(), max);
        (sink, emitter)
    }

    #[test]
    fn short_lines_pass_through_unsplit() {
        let (sink, emitter) = emitter(10);
        emitter.emit_block("T", "abc\ndef", true);
        let lines: Vec<String> = sink.take().into_iter().map(|(_, l)| l).collect();
        assert_eq!(lines, vec!["abc", "def"]);
    }

    #[test]
    fn long_lines_are_chunked_to_max_width() {
        let (sink, emitter) = emitter(4);
        emitter.emit_block("T", "abcdefghij", true);
        let lines: Vec<String> = sink.take().into_iter().map(|(_, l)| l).collect();
        assert_eq!(lines, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn wrap_false_emits_the_whole_line() {
        let (sink, emitter) = emitter(4);
        emitter.emit_block("T", "abcdefghij", false);
        let lines = sink.take();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].1, "abcdefghij");
    }

    #[test]
    fn multibyte_chars_are_never_split() {
        let (sink, emitter) = emitter(3);
        emitter.emit_block("T", "ééééé", true);
        let lines: Vec<String> = sink.take().into_iter().map(|(_, l)| l).collect();
        assert_eq!(lines, vec!["ééé", "éé"]);
        assert_eq!(lines.concat(), "ééééé");
    }

    #[test]
    fn tag_rotation_has_period_four() {
        let (sink, emitter) = emitter(100);
        emitter.emit_block("T", "a\nb\nc\nd\ne\nf", true);
        let tags: Vec<String> = sink.take().into_iter().map(|(t, _)| t).collect();
        assert_eq!(tags, vec!["T|", "T/", "T-", "T\\", "T|", "T/"]);
    }

    #[test]
    fn rotation_persists_across_blocks() {
        let (sink, emitter) = emitter(100);
        emitter.emit_block("T", "a\nb\nc", true);
        emitter.emit_block("T", "d", true);
        let tags: Vec<String> = sink.take().into_iter().map(|(t, _)| t).collect();
        assert_eq!(tags, vec!["T|", "T/", "T-", "T\\"]);
    }

    #[test]
    fn consecutive_lines_never_share_a_tag() {
        let (sink, emitter) = emitter(100);
        emitter.emit_block("T", &"same\n".repeat(20), true);
        let tags: Vec<String> = sink.take().into_iter().map(|(t, _)| t).collect();
        for pair in tags.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }

    #[test]
    fn empty_line_is_still_emitted() {
        let (sink, emitter) = emitter(10);
        emitter.emit_block("T", "a\n\nb", true);
        let lines: Vec<String> = sink.take().into_iter().map(|(_, l)| l).collect();
        assert_eq!(lines, vec!["a", "", "b"]);
    }

    proptest! {
        #[test]
        fn chunks_reconstruct_input_and_respect_max(s in ".*", max in 1usize..200) {
            let chunks = chunk_line(&s, max);
            prop_assert_eq!(chunks.concat(), s.clone());
            for chunk in &chunks {
                prop_assert!(chunk.chars().count() <= max);
            }
        }
    }
}
