//! Normalizer: turns a trainer's line-oriented metrics log into a
//! [`CleanedReport`].
//!
//! Each non-empty line of the log is one training step written as
//! `{"key": number, "key": number, ...}`. Lines are split into tokens first
//! and then read pair by pair; anything that does not fit the grammar is a
//! [`ParseError`] pointing at the offending line and column. Nothing is
//! skipped or coerced.
//!
//! ```text
//! record := "{" [ pair ( "," pair )* ] "}"
//! pair   := '"' name '"' ":" number
//! ```

use serde::Serialize;
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, ParseError, ParseErrorKind, Result};
use crate::types::{CleanedReport, MetricsRecord};

/// Version of the metrics log grammar this normalizer reads.
pub const LOG_FORMAT_VERSION: u32 = 1;

/// File name the trainer writes its raw metrics log to, inside the run's
/// output directory.
pub const METRICS_LOG_FILE: &str = "metrics.json";

/// Suffix appended to the model name to form the report file name.
pub const REPORT_SUFFIX: &str = "_train_results.json";

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Contract the metrics log is checked against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogSchema {
    required_keys: Vec<String>,
}

impl LogSchema {
    /// Schema for log format `version`, requiring every record to carry
    /// `required_keys`. Only [`LOG_FORMAT_VERSION`] is understood.
    pub fn new(version: u32, required_keys: Vec<String>) -> Result<Self> {
        if version != LOG_FORMAT_VERSION {
            return Err(Error::Configuration(format!(
                "metrics log format version {version} is not supported (expected {LOG_FORMAT_VERSION})"
            )));
        }
        Ok(Self { required_keys })
    }

    fn check(&self, record: &MetricsRecord) -> std::result::Result<(), ParseErrorKind> {
        match self.required_keys.iter().find(|k| !record.contains_key(k)) {
            Some(missing) => Err(ParseErrorKind::MissingRequiredKey(missing.clone())),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
enum TokenKind<'a> {
    Open,
    Close,
    Colon,
    Comma,
    Quoted(&'a str),
    Bare(&'a str),
}

impl fmt::Display for TokenKind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Open => write!(f, "`{{`"),
            TokenKind::Close => write!(f, "`}}`"),
            TokenKind::Colon => write!(f, "`:`"),
            TokenKind::Comma => write!(f, "`,`"),
            TokenKind::Quoted(s) => write!(f, "`\"{s}\"`"),
            TokenKind::Bare(s) => write!(f, "`{s}`"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Token<'a> {
    kind: TokenKind<'a>,
    column: usize,
}

fn is_structural(c: char) -> bool {
    matches!(c, '{' | '}' | ':' | ',' | '"')
}

/// Split one line into tokens. Whitespace only separates tokens.
fn tokenize(line: &str) -> std::result::Result<Vec<Token<'_>>, (usize, ParseErrorKind)> {
    let mut tokens = Vec::new();
    let mut chars = line.char_indices().peekable();
    let mut column = 0;

    while let Some((start, c)) = chars.next() {
        column += 1;
        let token_column = column;
        let kind = match c {
            c if c.is_whitespace() => continue,
            '{' => TokenKind::Open,
            '}' => TokenKind::Close,
            ':' => TokenKind::Colon,
            ',' => TokenKind::Comma,
            '"' => loop {
                match chars.next() {
                    Some((end, '"')) => {
                        column += 1;
                        break TokenKind::Quoted(&line[start + 1..end]);
                    }
                    Some(_) => column += 1,
                    None => return Err((token_column, ParseErrorKind::UnterminatedKey)),
                }
            },
            _ => {
                while let Some(&(_, next)) = chars.peek() {
                    if next.is_whitespace() || is_structural(next) {
                        break;
                    }
                    chars.next();
                    column += 1;
                }
                let end = chars.peek().map_or(line.len(), |&(i, _)| i);
                TokenKind::Bare(&line[start..end])
            }
        };
        tokens.push(Token {
            kind,
            column: token_column,
        });
    }
    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Pair extraction
// ---------------------------------------------------------------------------

/// Parse one metrics log line. `line_no` is 1-based and only used for errors.
pub fn parse_line(line_no: usize, line: &str) -> std::result::Result<MetricsRecord, ParseError> {
    let err = |column: usize, kind: ParseErrorKind| ParseError {
        line: line_no,
        column,
        kind,
    };
    let end_column = line.chars().count() + 1;

    let tokens = tokenize(line).map_err(|(column, kind)| err(column, kind))?;
    let mut tokens = tokens.into_iter();
    let mut record = MetricsRecord::new();

    match tokens.next() {
        Some(Token {
            kind: TokenKind::Open,
            ..
        }) => {}
        Some(t) => return Err(err(t.column, ParseErrorKind::MissingOpenBrace)),
        None => return Err(err(1, ParseErrorKind::MissingOpenBrace)),
    }

    let mut tokens = tokens.peekable();
    if let Some(Token {
        kind: TokenKind::Close,
        ..
    }) = tokens.peek()
    {
        tokens.next();
    } else {
        loop {
            let key = match tokens.next() {
                Some(Token {
                    kind: TokenKind::Quoted(key),
                    column,
                }) => {
                    if key.trim().is_empty() {
                        return Err(err(column, ParseErrorKind::EmptyKey));
                    }
                    key
                }
                Some(t) => return Err(err(t.column, ParseErrorKind::ExpectedKey(t.kind.to_string()))),
                None => {
                    return Err(err(
                        end_column,
                        ParseErrorKind::ExpectedKey("end of line".to_string()),
                    ))
                }
            };

            match tokens.next() {
                Some(Token {
                    kind: TokenKind::Colon,
                    ..
                }) => {}
                Some(t) => return Err(err(t.column, ParseErrorKind::MissingSeparator(key.to_string()))),
                None => return Err(err(end_column, ParseErrorKind::MissingSeparator(key.to_string()))),
            }

            let value = match tokens.next() {
                Some(Token {
                    kind: TokenKind::Bare(raw),
                    column,
                }) => parse_value(key, raw).map_err(|kind| err(column, kind))?,
                Some(Token {
                    kind: TokenKind::Quoted(raw),
                    column,
                }) => {
                    return Err(err(
                        column,
                        ParseErrorKind::NonNumeric {
                            key: key.to_string(),
                            value: format!("\"{raw}\""),
                        },
                    ))
                }
                Some(t) => return Err(err(t.column, ParseErrorKind::MissingValue(key.to_string()))),
                None => return Err(err(end_column, ParseErrorKind::MissingValue(key.to_string()))),
            };
            record.insert(key, value);

            match tokens.next() {
                Some(Token {
                    kind: TokenKind::Comma,
                    ..
                }) => continue,
                Some(Token {
                    kind: TokenKind::Close,
                    ..
                }) => break,
                Some(t) => return Err(err(t.column, ParseErrorKind::ExpectedDelimiter(t.kind.to_string()))),
                None => return Err(err(end_column, ParseErrorKind::MissingCloseBrace)),
            }
        }
    }

    if let Some(t) = tokens.next() {
        return Err(err(t.column, ParseErrorKind::TrailingInput(t.kind.to_string())));
    }
    Ok(record)
}

fn parse_value(key: &str, raw: &str) -> std::result::Result<f64, ParseErrorKind> {
    let value: f64 = raw.parse().map_err(|_| ParseErrorKind::NonNumeric {
        key: key.to_string(),
        value: raw.to_string(),
    })?;
    // serde_json would write these as `null`.
    if !value.is_finite() {
        return Err(ParseErrorKind::NonFinite {
            key: key.to_string(),
            value: raw.to_string(),
        });
    }
    Ok(value)
}

/// Parse a whole metrics log. Blank lines are skipped; every other line must
/// be a record that satisfies `schema`.
pub fn parse_log(text: &str, schema: &LogSchema) -> std::result::Result<Vec<MetricsRecord>, ParseError> {
    let mut records = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record = parse_line(line_no, line)?;
        schema.check(&record).map_err(|kind| ParseError {
            line: line_no,
            column: 1,
            kind,
        })?;
        records.push(record);
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// Report output
// ---------------------------------------------------------------------------

/// JSON formatter that puts a space after `,` and `:`, giving
/// `{"metrics": [{"loss": 0.5, "accuracy": 0.9}]}` on one line.
struct SpacedFormatter;

impl serde_json::ser::Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }
}

/// Render `report` the way it is written to disk.
pub fn render_report(report: &CleanedReport) -> String {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
    report
        .serialize(&mut ser)
        .expect("metrics report must serialize into memory");
    String::from_utf8_lossy(&buf).into_owned()
}

/// `<metrics_dir>/<model_name>_train_results.json`
#[must_use]
pub fn report_path(metrics_dir: &Path, model_name: &str) -> PathBuf {
    metrics_dir.join(format!("{model_name}{REPORT_SUFFIX}"))
}

/// Write `contents` next to `path` and rename it into place, so readers
/// never see a half-written report.
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, contents).map_err(|e| Error::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        Error::io(path, e)
    })
}

/// Outcome of a successful normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub report_path: PathBuf,
    pub records: usize,
}

/// Parse `log_path` and write the cleaned report for `model_name` into
/// `metrics_dir`, creating the directory if needed.
///
/// The log is fully parsed before anything is written, so a malformed log
/// leaves no report behind.
pub fn normalize(log_path: &Path, metrics_dir: &Path, model_name: &str, schema: &LogSchema) -> Result<Normalized> {
    let text = std::fs::read_to_string(log_path).map_err(|e| Error::io(log_path, e))?;
    let metrics = parse_log(&text, schema).map_err(|source| Error::Parse {
        path: log_path.to_path_buf(),
        source,
    })?;
    if metrics.is_empty() {
        tracing::warn!(log = %log_path.display(), "metrics log has no records");
    }

    std::fs::create_dir_all(metrics_dir).map_err(|e| Error::io(metrics_dir, e))?;
    let report = CleanedReport::new(metrics);
    let path = report_path(metrics_dir, model_name);
    write_atomic(&path, &render_report(&report))?;

    tracing::info!(
        model = model_name,
        records = report.len(),
        report = %path.display(),
        "wrote cleaned metrics report"
    );
    Ok(Normalized {
        report_path: path,
        records: report.len(),
    })
}

/// Reject a metrics directory that would be removed together with the run
/// output directory.
pub fn check_metrics_dir(output_dir: &Path, metrics_dir: &Path) -> Result<()> {
    if metrics_dir.starts_with(output_dir) {
        return Err(Error::Configuration(format!(
            "metrics directory {} lies inside the run output directory {}, which is deleted after every run",
            metrics_dir.display(),
            output_dir.display()
        )));
    }
    Ok(())
}

/// Normalize `<output_dir>/metrics.json`, then delete `output_dir` so the
/// next run starts from an empty directory.
pub fn clean_run(output_dir: &Path, metrics_dir: &Path, model_name: &str, schema: &LogSchema) -> Result<Normalized> {
    check_metrics_dir(output_dir, metrics_dir)?;
    let normalized = normalize(&output_dir.join(METRICS_LOG_FILE), metrics_dir, model_name, schema)?;
    std::fs::remove_dir_all(output_dir).map_err(|e| Error::io(output_dir, e))?;
    tracing::debug!(output_dir = %output_dir.display(), "removed run output directory");
    Ok(normalized)
}
