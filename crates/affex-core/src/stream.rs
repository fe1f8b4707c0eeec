//! Obtaining the decompressed document stream.
//!
//! The compressed document lives inside the `.af` container at an offset we
//! do not parse ourselves. An external carving utility (binwalk by default)
//! finds and inflates it into a scratch directory, and we pick the produced
//! stream out by file name.
//!
//! [`StreamSource`] is the seam: [`ExternalExtractor`] runs the utility,
//! [`RawStream`] reads a stream that was carved earlier, and
//! [`CachedSource`] remembers streams by input digest.

use crate::error::{Error, Result};
use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::str::FromStr;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};
use walkdir::WalkDir;

/// Default command used to carve the compressed stream out of a document
pub const DEFAULT_COMMAND: &str = "binwalk --extract --directory {out} {input}";

/// Default time budget for the external utility
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

const INPUT_PLACEHOLDER: &str = "{input}";
const OUTPUT_PLACEHOLDER: &str = "{out}";
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Anything that can turn a document path into its decompressed stream
pub trait StreamSource: Send + Sync {
    /// Produces the decompressed stream for `input`
    fn obtain(&self, input: &Path) -> Result<Vec<u8>>;
}

impl<S: StreamSource + ?Sized> StreamSource for Box<S> {
    fn obtain(&self, input: &Path) -> Result<Vec<u8>> {
        (**self).obtain(input)
    }
}

impl<S: StreamSource + ?Sized> StreamSource for &S {
    fn obtain(&self, input: &Path) -> Result<Vec<u8>> {
        (**self).obtain(input)
    }
}

/// A whitespace-separated command line with `{input}` and `{out}` placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    program: String,
    args: Vec<String>,
}

impl Default for CommandTemplate {
    fn default() -> Self {
        Self {
            program: "binwalk".to_string(),
            args: ["--extract", "--directory", OUTPUT_PLACEHOLDER, INPUT_PLACEHOLDER]
                .map(String::from)
                .to_vec(),
        }
    }
}

impl CommandTemplate {
    /// Parses a template such as `binwalk -e -C {out} {input}`.
    ///
    /// Words are split the way a POSIX shell would, so quoted arguments such
    /// as `sh -c 'binwalk -e -C {out} {input}'` stay in one piece.
    pub fn parse(template: &str) -> Result<Self> {
        let words = shell_words::split(template)
            .map_err(|e| Error::invalid_template(template, e.to_string()))?;
        let mut tokens = words.into_iter();
        let program = tokens
            .next()
            .ok_or_else(|| Error::invalid_template(template, "empty command"))?;
        let args: Vec<String> = tokens.collect();

        for placeholder in [INPUT_PLACEHOLDER, OUTPUT_PLACEHOLDER] {
            if !args.iter().any(|arg| arg.contains(placeholder)) {
                return Err(Error::invalid_template(
                    template,
                    format!("missing {} placeholder", placeholder),
                ));
            }
        }

        Ok(Self { program, args })
    }

    /// The program to execute
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Builds the command for one input file and scratch directory
    pub fn command(&self, input: &Path, out: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command.args(
            self.args
                .iter()
                .map(|arg| expand(arg, input.as_os_str(), out.as_os_str())),
        );
        command
    }
}

impl FromStr for CommandTemplate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for CommandTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote_word(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote_word(arg))?;
        }
        Ok(())
    }
}

/// Quotes a word only when the shell would otherwise split or unescape it
fn quote_word(word: &str) -> Cow<'_, str> {
    let needs_quoting = word.is_empty()
        || word.starts_with('#')
        || word
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '\'' | '"' | '\\'));
    if needs_quoting {
        shell_words::quote(word)
    } else {
        Cow::Borrowed(word)
    }
}

/// Substitutes placeholders, passing bare placeholders through without a lossy conversion
fn expand(arg: &str, input: &OsStr, out: &OsStr) -> OsString {
    match arg {
        INPUT_PLACEHOLDER => input.to_os_string(),
        OUTPUT_PLACEHOLDER => out.to_os_string(),
        _ => arg
            .replace(INPUT_PLACEHOLDER, &input.to_string_lossy())
            .replace(OUTPUT_PLACEHOLDER, &out.to_string_lossy())
            .into(),
    }
}

/// Runs an external carving utility and collects the stream it produces
#[derive(Debug, Clone)]
pub struct ExternalExtractor {
    template: CommandTemplate,
    timeout: Duration,
}

impl Default for ExternalExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ExternalExtractor {
    /// Creates an extractor running [`DEFAULT_COMMAND`]
    pub fn new() -> Self {
        Self::with_template(CommandTemplate::default())
    }

    /// Creates an extractor running a custom command template
    pub fn with_template(template: CommandTemplate) -> Self {
        Self {
            template,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets how long the utility may run before it is killed
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Runs the utility to completion, killing it if the timeout expires
    fn run(&self, input: &Path, out: &Path) -> Result<()> {
        let program = self.template.program();
        let mut child = self
            .template
            .command(input, out)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::spawn(program, e))?;

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(Error::Timeout {
                        program: program.to_string(),
                        timeout: self.timeout,
                    });
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => return Err(Error::spawn(program, e)),
            }
        };

        // Carvers often exit non-zero after extracting what they could
        if !status.success() {
            warn!("{} exited with {}", program, status);
        }
        Ok(())
    }
}

impl StreamSource for ExternalExtractor {
    fn obtain(&self, input: &Path) -> Result<Vec<u8>> {
        let scratch = tempfile::tempdir()
            .map_err(|e| Error::directory_create(std::env::temp_dir(), e))?;

        info!("Extracting from {}...", input.display());
        debug!("Running `{}` into {}", self.template, scratch.path().display());
        self.run(input, scratch.path())?;

        let stream_path =
            find_stream_file(scratch.path()).ok_or_else(|| Error::stream_not_found(input))?;
        let data = fs::read(&stream_path).map_err(|e| Error::file_read(&stream_path, e))?;
        if data.is_empty() {
            return Err(Error::stream_not_found(input));
        }

        debug!(
            "Read {} decompressed bytes from {}",
            data.len(),
            stream_path.display()
        );
        Ok(data)
    }
}

/// Returns true for file names the carver gives to the document stream
pub fn is_stream_name(name: &OsStr) -> bool {
    let name = name.to_string_lossy();
    name.to_lowercase().contains("zstd") || name.starts_with("4C")
}

/// Finds the first carved stream under `dir`, walking in file-name order
pub fn find_stream_file(dir: &Path) -> Option<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .find(|e| {
            trace!("Considering {}", e.path().display());
            is_stream_name(e.file_name())
        })
        .map(walkdir::DirEntry::into_path)
}

/// Treats the input itself as the decompressed stream
#[derive(Debug, Clone, Copy, Default)]
pub struct RawStream;

impl StreamSource for RawStream {
    fn obtain(&self, input: &Path) -> Result<Vec<u8>> {
        fs::read(input).map_err(|e| Error::file_read(input, e))
    }
}

/// Caches streams from another source, keyed by a BLAKE3 digest of the input
#[derive(Debug, Clone)]
pub struct CachedSource<S> {
    inner: S,
    dir: PathBuf,
}

impl<S: StreamSource> CachedSource<S> {
    /// Wraps `inner`, storing streams under `dir`
    pub fn new(inner: S, dir: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            dir: dir.into(),
        }
    }

    /// Cache file used for a document with the given raw contents
    pub fn cache_path(&self, raw: &[u8]) -> PathBuf {
        let digest = blake3::hash(raw);
        self.dir.join(format!("{}.bin", &digest.to_hex()[..16]))
    }
}

impl<S: StreamSource> StreamSource for CachedSource<S> {
    fn obtain(&self, input: &Path) -> Result<Vec<u8>> {
        let raw = fs::read(input).map_err(|e| Error::file_read(input, e))?;
        let cached = self.cache_path(&raw);

        if cached.is_file() {
            debug!("Cache hit: {}", cached.display());
            return fs::read(&cached).map_err(|e| Error::file_read(&cached, e));
        }

        let data = self.inner.obtain(input)?;

        // A cache that cannot be written only costs us the next run
        if let Err(e) = store(&self.dir, &cached, &data) {
            warn!("Not caching stream: {}", e);
        } else {
            debug!("Cached stream at {}", cached.display());
        }
        Ok(data)
    }
}

fn store(dir: &Path, path: &Path, data: &[u8]) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| Error::directory_create(dir, e))?;
    fs::write(path, data).map_err(|e| Error::file_write(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[test]
    fn test_default_template() {
        let template = CommandTemplate::default();
        assert_eq!(template.to_string(), DEFAULT_COMMAND);
        assert_eq!(CommandTemplate::parse(DEFAULT_COMMAND).unwrap(), template);
    }

    #[test]
    fn test_template_validation() {
        assert!(CommandTemplate::parse("   ").is_err());
        assert!(CommandTemplate::parse("binwalk -e {input}").is_err());
        assert!(CommandTemplate::parse("binwalk -C {out}").is_err());
        assert!("carve --into={out} {input}".parse::<CommandTemplate>().is_ok());
    }

    #[test]
    fn test_quoted_template() {
        let template = CommandTemplate::parse(
            "nix-shell -p binwalk --run 'binwalk --extract --directory {out} {input}'",
        )
        .unwrap();
        assert_eq!(template.program(), "nix-shell");

        let command = template.command(Path::new("/d/doc.af"), Path::new("/tmp/o"));
        let args: Vec<&OsStr> = command.get_args().collect();
        assert_eq!(
            args,
            vec![
                OsStr::new("-p"),
                OsStr::new("binwalk"),
                OsStr::new("--run"),
                OsStr::new("binwalk --extract --directory /tmp/o /d/doc.af"),
            ]
        );

        // Display output parses back to the same template
        assert_eq!(
            CommandTemplate::parse(&template.to_string()).unwrap(),
            template
        );
    }

    #[test]
    fn test_unbalanced_quote_rejected() {
        let err = CommandTemplate::parse("sh -c 'binwalk {out} {input}").unwrap_err();
        assert!(matches!(err, Error::InvalidTemplate { .. }));
    }

    #[test]
    fn test_expand() {
        let input = OsStr::new("/docs/a b.af");
        let out = OsStr::new("/tmp/x");
        assert_eq!(expand("{input}", input, out), OsString::from("/docs/a b.af"));
        assert_eq!(expand("--into={out}", input, out), OsString::from("--into=/tmp/x"));
        assert_eq!(expand("-e", input, out), OsString::from("-e"));
    }

    #[test]
    fn test_is_stream_name() {
        assert!(is_stream_name(OsStr::new("4C")));
        assert!(is_stream_name(OsStr::new("4C.zst")));
        assert!(is_stream_name(OsStr::new("data.ZSTD")));
        assert!(!is_stream_name(OsStr::new("4c")));
        assert!(!is_stream_name(OsStr::new("1A2B.png")));
    }

    #[test]
    fn test_find_stream_file() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("_doc.af.extracted");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("12.png"), b"png").unwrap();
        fs::write(nested.join("4C"), b"stream").unwrap();
        fs::write(nested.join("4C.zst"), b"compressed").unwrap();

        let found = find_stream_file(dir.path()).unwrap();
        assert_eq!(found, nested.join("4C"));
    }

    #[test]
    fn test_find_stream_file_none() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("other.bin"), b"x").unwrap();
        assert_eq!(find_stream_file(dir.path()), None);
    }

    #[test]
    fn test_raw_stream() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stream.bin");
        fs::write(&path, b"\x00\x01").unwrap();
        assert_eq!(RawStream.obtain(&path).unwrap(), vec![0, 1]);
        assert!(matches!(
            RawStream.obtain(&dir.path().join("missing.bin")),
            Err(Error::FileRead { .. })
        ));
    }

    #[test]
    fn test_missing_program() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("doc.af");
        fs::write(&input, b"doc").unwrap();

        let template = CommandTemplate::parse("affex-no-such-carver {out} {input}").unwrap();
        let err = ExternalExtractor::with_template(template)
            .obtain(&input)
            .unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
    }

    struct Counting {
        calls: AtomicUsize,
    }

    impl StreamSource for Counting {
        fn obtain(&self, _input: &Path) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(b"decompressed".to_vec())
        }
    }

    #[test]
    fn test_cached_source_reuses_stream() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("doc.af");
        fs::write(&input, b"raw document").unwrap();

        let source = CachedSource::new(
            Counting {
                calls: AtomicUsize::new(0),
            },
            dir.path().join("cache"),
        );
        assert_eq!(source.obtain(&input).unwrap(), b"decompressed");
        assert_eq!(source.obtain(&input).unwrap(), b"decompressed");
        assert_eq!(source.inner.calls.load(Ordering::SeqCst), 1);
        assert!(source.cache_path(b"raw document").is_file());
    }

    #[test]
    fn test_cache_key_depends_on_content() {
        let source = CachedSource::new(RawStream, "/tmp/cache");
        assert_eq!(source.cache_path(b"a"), source.cache_path(b"a"));
        assert_ne!(source.cache_path(b"a"), source.cache_path(b"b"));
    }
}
