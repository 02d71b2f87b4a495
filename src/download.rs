use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::AsyncWriteExt;

const CHUNK: usize = 64 * 1024;

pub fn filename_from_disposition(content_disposition: &str) -> Option<String> {
    for part in content_disposition.split(';') {
        let part = part.trim();

        if let Some(name) = part.strip_prefix("filename=") {
            let name = name.trim_matches(|c| c == '"' || c == '\'');
            if !name.is_empty() {
                return Some(name.to_string());
            }
        }
        if let Some(name) = part.strip_prefix("filename*=")
            && let Some(idx) = name.rfind("''")
        {
            let name = &name[idx + 2..];
            if !name.is_empty() {
                return Some(name.to_string());
            }
        }
    }
    None
}

/// `statement-2017-02.pdf`, with the extension guessed from the content type.
pub fn statement_filename(year: &str, month: &str, content_type: &str) -> String {
    let essence = content_type.split(';').next().unwrap_or("").trim();
    // mime_guess lists "aaf" first for octet-stream
    let ext = if essence.eq_ignore_ascii_case(mime::APPLICATION_OCTET_STREAM.essence_str()) {
        "bin"
    } else {
        mime_guess::get_mime_extensions_str(essence)
            .and_then(|exts| exts.first())
            .copied()
            .unwrap_or("bin")
    };
    format!("statement-{}-{}.{}", year, month, ext)
}

/// Explicit output path, else the server's file name, else a generated one.
pub fn determine_filename(
    output: Option<&Path>,
    disposition: Option<&str>,
    year: &str,
    month: &str,
    content_type: &str,
) -> PathBuf {
    if let Some(output) = output {
        return output.to_path_buf();
    }
    // never let the server pick a directory
    if let Some(name) = disposition.and_then(filename_from_disposition)
        && let Some(file) = Path::new(&name).file_name()
    {
        return PathBuf::from(file);
    }
    PathBuf::from(statement_filename(year, month, content_type))
}

pub async fn save_file(bytes: &[u8], path: &Path) -> Result<()> {
    let mut file = tokio::fs::File::create(path)
        .await
        .with_context(|| format!("Failed to create '{}'", path.display()))?;

    let pb = ProgressBar::new(bytes.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{msg}\n{spinner:.green} [{elapsed_precise}]\
        [{wide_bar:.cyan/blue}] {bytes}/{total_bytes}",
            )?
            .progress_chars("#>-"),
    );
    pb.set_message(format!("Writing {}", path.display().to_string().cyan()));

    for chunk in bytes.chunks(CHUNK) {
        file.write_all(chunk).await?;
        pb.inc(chunk.len() as u64);
    }
    file.flush().await?;

    pb.finish_and_clear();
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
