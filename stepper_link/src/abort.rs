/*!
Operator abort.

[`AbortFlag`] is a write-once, read-many flag shared between whoever may
request a stop (the console watcher, a Ctrl+C handler) and the dispatch
loop. Once set it stays set for the rest of the run.
*/

use crate::error::Result;
use std::io::{BufRead, BufReader, Stderr, Stdin, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Tokens that request a stop, compared case-insensitively
pub const STOP_TOKENS: [&str; 1] = ["s"];

/// Prompt shown by the console stop source
pub const STOP_PROMPT: &str = "Press 's' or 'S' to stop: ";

/// Shared stop request flag. Cloning shares the same flag.
#[derive(Debug, Clone, Default)]
pub struct AbortFlag {
    requested: Arc<AtomicBool>,
}

impl AbortFlag {
    /// Create a flag that is not yet set
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. Returns `true` only for the call that actually set it.
    pub fn trigger(&self) -> bool {
        !self.requested.swap(true, Ordering::SeqCst)
    }

    /// Whether a stop has been requested
    pub fn is_set(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Sleep for `duration`, checking the flag every `granularity`.
    ///
    /// Returns `false` if the flag was set before the full duration elapsed.
    pub fn sleep(&self, duration: Duration, granularity: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let granularity = granularity.max(Duration::from_millis(1));
        loop {
            if self.is_set() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep(granularity.min(deadline - now));
        }
    }
}

/// Something that blocks until an operator asks to stop
pub trait StopSource {
    /// Block until a stop is requested (`Ok(true)`) or the source is
    /// exhausted without one (`Ok(false)`).
    fn wait_for_stop(&mut self) -> Result<bool>;
}

/// Whether an operator input line is a stop request
pub fn is_stop_token(input: &str) -> bool {
    let input = input.trim();
    STOP_TOKENS.iter().any(|token| input.eq_ignore_ascii_case(token))
}

/// Line-oriented console prompt. Unrecognized input is ignored and the
/// prompt is shown again.
pub struct ConsoleStopSource<R, W> {
    input: R,
    prompt: W,
}

impl<R: BufRead, W: Write> ConsoleStopSource<R, W> {
    pub fn new(input: R, prompt: W) -> Self {
        Self { input, prompt }
    }
}

impl ConsoleStopSource<BufReader<Stdin>, Stderr> {
    /// Prompt on stderr, read from stdin. Stdout stays free for reports.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(std::io::stdin()), std::io::stderr())
    }
}

impl<R: BufRead, W: Write> StopSource for ConsoleStopSource<R, W> {
    fn wait_for_stop(&mut self) -> Result<bool> {
        let mut line = String::new();
        loop {
            write!(self.prompt, "{}", STOP_PROMPT)?;
            self.prompt.flush()?;

            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(false);
            }
            if is_stop_token(&line) {
                return Ok(true);
            }
            debug!("Ignoring operator input {:?}", line.trim());
        }
    }
}

/// Run `source` on its own thread and set `flag` when it reports a stop.
///
/// The thread ends after the first stop request, when the source is
/// exhausted, or when the source fails.
pub fn spawn_stop_watcher<S>(mut source: S, flag: AbortFlag) -> std::io::Result<JoinHandle<()>>
where
    S: StopSource + Send + 'static,
{
    thread::Builder::new()
        .name("stop-watcher".to_string())
        .spawn(move || match source.wait_for_stop() {
            Ok(true) => {
                if flag.trigger() {
                    warn!("🛑 Stop requested by operator");
                }
            }
            Ok(false) => debug!("Operator input closed, stop watcher exiting"),
            Err(e) => warn!("Stop watcher failed: {}", e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_flag_is_write_once() {
        let flag = AbortFlag::new();
        let reader = flag.clone();
        assert!(!reader.is_set());
        assert!(flag.trigger());
        assert!(!flag.trigger());
        assert!(reader.is_set());
    }

    #[test]
    fn test_stop_tokens() {
        assert!(is_stop_token("s"));
        assert!(is_stop_token("S\n"));
        assert!(is_stop_token("  s  "));
        assert!(!is_stop_token("stop"));
        assert!(!is_stop_token(""));
    }

    #[test]
    fn test_console_ignores_other_input() {
        let mut prompt = Vec::new();
        let mut source = ConsoleStopSource::new(Cursor::new("go\n\nx\nS\nleftover\n"), &mut prompt);
        assert!(source.wait_for_stop().unwrap());
        drop(source);
        let shown = String::from_utf8(prompt).unwrap();
        assert_eq!(shown.matches(STOP_PROMPT).count(), 4);
    }

    #[test]
    fn test_stdio_prompt_goes_to_stderr() {
        let _source: ConsoleStopSource<BufReader<Stdin>, Stderr> = ConsoleStopSource::stdio();
    }

    #[test]
    fn test_console_eof_is_not_a_stop() {
        let mut source = ConsoleStopSource::new(Cursor::new("nope\n"), Vec::new());
        assert!(!source.wait_for_stop().unwrap());
    }

    #[test]
    fn test_watcher_sets_flag() {
        let flag = AbortFlag::new();
        let source = ConsoleStopSource::new(Cursor::new("s\n"), std::io::sink());
        spawn_stop_watcher(source, flag.clone()).unwrap().join().unwrap();
        assert!(flag.is_set());
    }

    #[test]
    fn test_watcher_leaves_flag_clear_on_eof() {
        let flag = AbortFlag::new();
        let source = ConsoleStopSource::new(Cursor::new("x\ny\n"), std::io::sink());
        spawn_stop_watcher(source, flag.clone()).unwrap().join().unwrap();
        assert!(!flag.is_set());
    }

    #[test]
    fn test_sleep_returns_early_when_set() {
        let flag = AbortFlag::new();
        flag.trigger();
        let start = Instant::now();
        assert!(!flag.sleep(Duration::from_secs(5), Duration::from_millis(10)));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_sleep_completes_when_clear() {
        let flag = AbortFlag::new();
        let start = Instant::now();
        assert!(flag.sleep(Duration::from_millis(50), Duration::from_millis(10)));
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
