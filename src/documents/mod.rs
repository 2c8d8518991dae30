// Document loading module
// Finds PDF files and extracts their text one page at a time


use std::fs;
use std::path::{Path, PathBuf};

use lopdf::Document;
use tracing::{debug, info};

use crate::{RagError, Result};

/// Text extracted from a single PDF page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// File name of the source PDF
    pub source: String,
    /// 1-based page number
    pub page: u32,
    pub text: String,
}

/// List the PDF files directly inside `dir`, sorted by path
#[inline]
pub fn discover_pdf_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| {
        RagError::Document(format!(
            "Failed to read documents directory {}: {}",
            dir.display(),
            e
        ))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && is_pdf(&path) {
            files.push(path);
        }
    }
    files.sort();

    debug!("Found {} PDF files in {}", files.len(), dir.display());
    Ok(files)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Extract the text of every page of a PDF, in page order
#[inline]
pub fn load_pdf(path: &Path) -> Result<Vec<PageText>> {
    let source = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let document = Document::load(path).map_err(|e| {
        RagError::Document(format!("Failed to load PDF {}: {}", path.display(), e))
    })?;

    let mut pages = Vec::new();
    for page_number in document.get_pages().into_keys() {
        let text = document.extract_text(&[page_number]).map_err(|e| {
            RagError::Document(format!(
                "Failed to extract text from page {} of {}: {}",
                page_number,
                path.display(),
                e
            ))
        })?;

        pages.push(PageText {
            source: source.clone(),
            page: page_number,
            text,
        });
    }

    debug!("Loaded {} pages from {}", pages.len(), source);
    Ok(pages)
}

/// Load every page of every PDF in `dir`
#[inline]
pub fn load_documents(dir: &Path) -> Result<Vec<PageText>> {
    let files = discover_pdf_files(dir)?;

    let mut pages = Vec::new();
    for file in &files {
        pages.extend(load_pdf(file)?);
    }

    info!("Loaded {} pages from {} PDF files", pages.len(), files.len());
    Ok(pages)
}
