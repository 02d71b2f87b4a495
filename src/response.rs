use std::io::IsTerminal;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use syntect::parsing::SyntaxReference;
use syntect::{
    easy::HighlightLines,
    highlighting::ThemeSet,
    parsing::SyntaxSet,
    util::{as_24_bit_terminal_escaped, LinesWithEndings},
};

/// Where command results go.
pub trait Printer {
    fn json(&mut self, value: &Value) -> Result<()>;

    /// Short status line for the user, not part of the result.
    fn notice(&mut self, msg: &str);

    fn saved(&mut self, path: &Path, size: usize);
}

/// Prints results to stdout and notices to stderr.
#[derive(Debug, Default)]
pub struct Terminal;

impl Printer for Terminal {
    fn json(&mut self, value: &Value) -> Result<()> {
        let text = pretty_json(value)?;
        if std::io::stdout().is_terminal() {
            print_syntect(&text, "json");
            println!();
        } else {
            println!("{}", text);
        }
        Ok(())
    }

    fn notice(&mut self, msg: &str) {
        eprintln!("{}", msg.yellow());
    }

    fn saved(&mut self, path: &Path, size: usize) {
        eprintln!(
            "{} {} ({} bytes)",
            "Saved".green(),
            path.display(),
            size
        );
    }
}

/// JSON with four-space indentation.
pub fn pretty_json(value: &Value) -> Result<String> {
    let mut formatter = jsonxf::Formatter::pretty_printer();
    formatter.indent = "    ".to_string();
    formatter
        .format(&value.to_string())
        .map(|s| s.trim_end().to_string())
        .map_err(|e| anyhow!("Failed to format JSON: {}", e))
}

pub fn print_syntect(s: &str, ext: &str) {
    let ps = SyntaxSet::load_defaults_newlines();
    let ts = ThemeSet::load_defaults();

    let syntax: &SyntaxReference = ps
        .find_syntax_by_extension(ext)
        .unwrap_or_else(|| ps.find_syntax_plain_text()); // fallback if not found

    let mut h = HighlightLines::new(syntax, &ts.themes["base16-ocean.dark"]);

    for line in LinesWithEndings::from(s) {
        match h.highlight_line(line, &ps) {
            Ok(ranges) => print!("{}", as_24_bit_terminal_escaped(&ranges[..], false)),
            Err(_) => print!("{}", line),
        }
    }
    // reset colors after the last line
    print!("\x1b[0m");
}

/// Spinner on stderr for calls that may page through a long list.
/// Hidden when stderr is not a terminal.
pub fn spinner(msg: &str) -> ProgressBar {
    if !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed}]") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pretty_json_uses_four_spaces() {
        let text = pretty_json(&json!({"id": 1, "tags": ["a", "b"]})).unwrap();
        assert_eq!(
            text,
            "{\n    \"id\": 1,\n    \"tags\": [\n        \"a\",\n        \"b\"\n    ]\n}"
        );
    }

    #[test]
    fn pretty_json_scalar() {
        assert_eq!(pretty_json(&json!("text")).unwrap(), "\"text\"");
    }

    #[test]
    fn test_print_syntect_json() {
        let json = r#"{"name": "test", "value": 123}"#;
        // Just ensure it doesn't panic
        print_syntect(json, "json");
    }

    #[test]
    fn test_print_syntect_unknown() {
        // Should fallback to plain text
        print_syntect("plain text", "unknown_extension");
    }

    #[test]
    fn spinner_hidden_off_terminal() {
        // test output is captured, so stderr is not a terminal
        if !std::io::stderr().is_terminal() {
            assert!(spinner("Fetching").is_hidden());
        }
    }
}
