//! affex - Extract design assets from Affinity Designer files
//!
//! This tool pulls layer names, text content, fonts and element sizes out of
//! the compressed document stream inside an `.af` file and prints them as
//! JSON.

use affex_core::{
    CachedSource, CommandTemplate, ExternalExtractor, ExtractionReport, Extractor, StreamSource,
};
use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, Level};
use tracing_subscriber::EnvFilter;

/// Extract layer names, text, fonts and element sizes from Affinity Designer files
#[derive(Parser, Debug)]
#[command(name = "affex")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Affinity document to extract from (or a decompressed stream with --from-bin)
    input: PathBuf,

    /// Write the JSON report here instead of standard output
    output: Option<PathBuf>,

    /// Treat INPUT as an already-decompressed document stream
    #[arg(long)]
    from_bin: bool,

    /// Command used to carve the compressed stream; {input} and {out} are substituted
    /// (defaults to `binwalk --extract --directory {out} {input}`)
    #[arg(long, env = "AFFEX_EXTRACTOR_CMD")]
    extractor_cmd: Option<String>,

    /// Seconds the extraction command may run before it is killed
    #[arg(long, env = "AFFEX_TIMEOUT", default_value = "120")]
    timeout: u64,

    /// Cache decompressed streams in this directory, keyed by document digest
    #[arg(long, env = "AFFEX_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let report = if cli.from_bin {
        process_stream(&cli.input)?
    } else {
        process_document(&cli)?
    };

    write_report(&report, cli.output.as_deref())
}

/// Parses the extraction command, falling back to the default template.
///
/// Only document mode runs the command, so `--from-bin` never looks at it.
fn command_template(cli: &Cli) -> Result<CommandTemplate> {
    let template = cli
        .extractor_cmd
        .as_deref()
        .map(CommandTemplate::parse)
        .transpose()
        .context("Invalid --extractor-cmd")?;
    Ok(template.unwrap_or_default())
}

/// Builds the stream source selected on the command line
fn stream_source(cli: &Cli, template: CommandTemplate) -> Box<dyn StreamSource> {
    let external =
        ExternalExtractor::with_template(template).timeout(Duration::from_secs(cli.timeout));

    match &cli.cache_dir {
        Some(dir) => {
            debug!("Caching streams in {}", dir.display());
            Box::new(CachedSource::new(external, dir))
        }
        None => Box::new(external),
    }
}

/// Extract a document through the external carving utility
fn process_document(cli: &Cli) -> Result<ExtractionReport> {
    let path = &cli.input;
    if !path.exists() {
        bail!("{} not found", path.display());
    }
    if !path.is_file() {
        bail!("Input path is not a file: {}", path.display());
    }

    let template = command_template(cli)?;
    let program = template.program().to_string();
    let source = stream_source(cli, template);
    Extractor::new()
        .extract_file(path, &source)
        .with_context(|| {
            format!(
                "Could not extract the document stream from {} (is `{}` installed?)",
                path.display(),
                program
            )
        })
}

/// Extract an already-decompressed stream
fn process_stream(path: &Path) -> Result<ExtractionReport> {
    Extractor::new()
        .extract_stream_file(path)
        .with_context(|| format!("Failed to read stream: {}", path.display()))
}

/// Print the report, or write it to `output`
fn write_report(report: &ExtractionReport, output: Option<&Path>) -> Result<()> {
    let json = report.to_json().context("Failed to serialize report")?;

    match output {
        Some(path) => {
            fs::write(path, &json)
                .with_context(|| format!("Failed to write file: {}", path.display()))?;
            info!("Written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_document_mode() {
        let cli = Cli::try_parse_from(["affex", "poster.af", "out.json"]).unwrap();
        assert_eq!(cli.input, PathBuf::from("poster.af"));
        assert_eq!(cli.output, Some(PathBuf::from("out.json")));
        assert!(!cli.from_bin);
        assert_eq!(cli.timeout, 120);
        assert_eq!(cli.extractor_cmd, None);
        assert_eq!(
            command_template(&cli).unwrap().to_string(),
            affex_core::stream::DEFAULT_COMMAND
        );
    }

    #[test]
    fn test_parse_from_bin_mode() {
        let cli = Cli::try_parse_from(["affex", "--from-bin", "stream.bin"]).unwrap();
        assert!(cli.from_bin);
        assert_eq!(cli.input, PathBuf::from("stream.bin"));
        assert_eq!(cli.output, None);
    }

    #[test]
    fn test_missing_input_is_usage_error() {
        assert!(Cli::try_parse_from(["affex"]).is_err());
        assert!(Cli::try_parse_from(["affex", "--from-bin"]).is_err());
    }

    #[test]
    fn test_bad_template_rejected() {
        let dir = TempDir::new().unwrap();
        let doc = dir.path().join("doc.af");
        fs::write(&doc, b"not a real document").unwrap();

        let cli = Cli::try_parse_from([
            "affex",
            "--extractor-cmd",
            "binwalk -e",
            doc.to_str().unwrap(),
        ])
        .unwrap();
        let err = process_document(&cli).unwrap_err();
        assert!(err.to_string().contains("Invalid --extractor-cmd"));
    }

    #[test]
    fn test_bad_template_ignored_for_streams() {
        let dir = TempDir::new().unwrap();
        let stream = dir.path().join("stream.bin");
        fs::write(&stream, b"\x00Logo1CgaT\x00").unwrap();

        let cli = Cli::try_parse_from([
            "affex",
            "--from-bin",
            "--extractor-cmd",
            "sh -c 'unbalanced",
            stream.to_str().unwrap(),
        ])
        .unwrap();
        assert!(cli.from_bin);

        let report = process_stream(&cli.input).unwrap();
        assert_eq!(report.layers, vec!["Logo".to_string()]);
    }

    #[test]
    fn test_missing_document() {
        let cli = Cli::try_parse_from(["affex", "/nonexistent/affex/poster.af"]).unwrap();
        let err = process_document(&cli).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_stream_mode_writes_report() {
        let dir = TempDir::new().unwrap();
        let stream = dir.path().join("stream.bin");
        fs::write(&stream, b"\x00Artboard1CgaT\x00").unwrap();
        let output = dir.path().join("report.json");

        let report = process_stream(&stream).unwrap();
        write_report(&report, Some(&output)).unwrap();

        let written = fs::read_to_string(&output).unwrap();
        assert!(!written.ends_with('\n'));
        assert_eq!(written, report.to_json().unwrap());
        assert_eq!(report.layers, vec!["Artboard".to_string()]);
        assert_eq!(report.metadata, None);
    }
}
