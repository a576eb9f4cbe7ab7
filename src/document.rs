use anyhow::{Context, Result};
use log::{debug, info, warn};
use mime_guess::from_path;
use pdf_extract::extract_text;
use std::fs;
use std::path::{Path, PathBuf};

/// Subdirectory whose files are cited as `project:<name>`
pub const PROJECTS_DIR: &str = "projects";

/// A source file loaded for ingestion
#[derive(Debug, Clone)]
pub struct Document {
    pub content: String,
    /// Citation name used for every chunk of this document
    pub source: String,
    pub mime_type: String,
}

impl Document {
    /// Load a document from a file path under the given citation name
    pub fn from_file<P: AsRef<Path>>(file_path: P, source: &str) -> Result<Self> {
        let path = file_path.as_ref();
        let mime_type = from_path(path).first_or_octet_stream().to_string();
        debug!("{} is {}", path.display(), mime_type);

        let content = read_document_content(path, &mime_type)?;

        Ok(Document {
            content,
            source: source.to_string(),
            mime_type,
        })
    }
}

/// Whether a file looks like something we can read
pub fn is_supported(path: &Path) -> bool {
    let mime = from_path(path).first_or_octet_stream();
    mime.type_() == mime_guess::mime::TEXT || mime.essence_str() == "application/pdf"
}

/// Files to ingest under a data directory, with their citation names, sorted by path.
///
/// Top-level files are cited by file stem; files in `projects/` as
/// `project:<stem>`. Unsupported files are skipped.
pub fn discover_documents<P: AsRef<Path>>(data_dir: P) -> Result<Vec<(PathBuf, String)>> {
    let data_dir = data_dir.as_ref();
    let mut found = Vec::new();

    for path in sorted_files(data_dir)? {
        if let Some(stem) = supported_stem(&path) {
            found.push((path, stem));
        }
    }

    let projects = data_dir.join(PROJECTS_DIR);
    if projects.is_dir() {
        for path in sorted_files(&projects)? {
            if let Some(stem) = supported_stem(&path) {
                found.push((path, format!("project:{}", stem)));
            }
        }
    }

    Ok(found)
}

fn sorted_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in
        fs::read_dir(dir).with_context(|| format!("Failed to read directory: {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn supported_stem(path: &Path) -> Option<String> {
    if !is_supported(path) {
        warn!("Skipping unsupported file: {}", path.display());
        return None;
    }
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
}

/// Text of a file, chosen by MIME type: PDFs are extracted and tidied,
/// text files are read with line endings unified
pub fn read_document_content<P: AsRef<Path>>(file_path: P, mime_type: &str) -> Result<String> {
    let path = file_path.as_ref();

    if mime_type.starts_with("application/pdf") {
        info!("Extracting text from {}", path.display());
        let raw = extract_text(path)
            .with_context(|| format!("Could not extract PDF text: {}", path.display()))?;
        let text = normalize_whitespace(&raw);
        if text.is_empty() {
            warn!("{} has no extractable text", path.display());
        }
        return Ok(text);
    }

    if mime_type.starts_with("text/") {
        debug!("Reading {}", path.display());
        let text = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        return Ok(text.replace("\r\n", "\n"));
    }

    Err(anyhow::anyhow!(
        "Unsupported document format: {} (expected text, markdown or PDF)",
        mime_type
    ))
}

/// Single spaces within lines, at most one blank line between paragraphs
fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;

    for line in text.replace('\r', "").lines() {
        let line = line.split(' ').filter(|w| !w.is_empty()).collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            blank_run += 1;
            continue;
        }
        if !out.is_empty() {
            out.push_str(if blank_run > 0 { "\n\n" } else { "\n" });
        }
        out.push_str(&line);
        blank_run = 0;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_text_is_tidied() {
        let text = "  Alp   Demir \r\n\n\n\nReact  and Node\nPostgres\n\n";
        assert_eq!(
            normalize_whitespace(text),
            "Alp Demir\n\nReact and Node\nPostgres"
        );
    }

    #[test]
    fn test_discover_documents_names_sources() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("resume.md"), "# Resume").unwrap();
        fs::write(dir.path().join("notes.txt"), "notes").unwrap();
        fs::write(dir.path().join("photo.png"), [0u8, 1, 2]).unwrap();
        fs::create_dir(dir.path().join(PROJECTS_DIR)).unwrap();
        fs::write(dir.path().join("projects/chatbot.md"), "bot").unwrap();
        fs::write(dir.path().join("projects/alpha.md"), "alpha").unwrap();

        let sources: Vec<String> = discover_documents(dir.path())
            .unwrap()
            .into_iter()
            .map(|(_, source)| source)
            .collect();

        assert_eq!(
            sources,
            vec!["notes", "resume", "project:alpha", "project:chatbot"]
        );
    }

    #[test]
    fn test_from_file_reads_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.md");
        fs::write(&path, "Line one\r\nLine two").unwrap();

        let document = Document::from_file(&path, "resume").unwrap();
        assert_eq!(document.source, "resume");
        assert_eq!(document.content, "Line one\nLine two");
        assert!(document.mime_type.starts_with("text/"));
    }

    #[test]
    fn test_unsupported_format_is_an_error() {
        let err = read_document_content("image.png", "image/png").unwrap_err();
        assert!(err.to_string().contains("Unsupported document format"));
    }
}
