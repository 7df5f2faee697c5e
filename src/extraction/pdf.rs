//! PDF text extraction, one segment per page

use crate::error::{Error, Result};

/// Extract text page by page. Pages that yield no text stay in the sequence
/// as empty segments so segment indices line up with page numbers; the
/// chunker drops them later.
pub(crate) fn extract_pages(data: &[u8]) -> Result<Vec<String>> {
    let doc = match lopdf::Document::load_mem(data) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::debug!("lopdf failed to load document: {}, trying pdf-extract", e);
            return extract_whole(data).map(|text| vec![text]);
        }
    };

    let pages = doc.get_pages();
    let mut segments = Vec::with_capacity(pages.len());
    for &page_number in pages.keys() {
        match doc.extract_text(&[page_number]) {
            Ok(text) => segments.push(cleanup_text(&text)),
            Err(e) => {
                tracing::debug!("no text on page {}: {}", page_number, e);
                segments.push(String::new());
            }
        }
    }

    if segments.iter().all(|s| s.is_empty()) {
        // Per-page extraction produced nothing; the whole-document path
        // handles some font encodings lopdf cannot.
        tracing::warn!("per-page PDF extraction produced no text, trying pdf-extract");
        return extract_whole(data).map(|text| vec![text]);
    }

    Ok(segments)
}

/// Whole-document fallback via pdf-extract
fn extract_whole(data: &[u8]) -> Result<String> {
    let text = pdf_extract::extract_text_from_mem(data)
        .map_err(|e| Error::decode("pdf", e.to_string()))?;
    let text = cleanup_text(&text);
    if text.is_empty() {
        return Err(Error::decode(
            "pdf",
            "no text content could be extracted; the PDF may be image-based or encrypted",
        ));
    }
    Ok(text)
}

/// Normalize extracted text: drop null bytes, replace common typographic
/// glyphs with ASCII, trim lines and drop empty ones.
fn cleanup_text(text: &str) -> String {
    text.replace('\0', "")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2010}', '\u{2011}', '\u{2013}'], "-")
        .replace('\u{2022}', "* ")
        .replace('\u{2026}', "...")
        .replace('\u{00A0}', " ")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleanup_normalizes_glyphs_and_whitespace() {
        let raw = "  \u{2018}quoted\u{2019} \u{2013} text\u{2026}  \n\n  second\u{00A0}line  \n";
        assert_eq!(cleanup_text(raw), "'quoted' - text...\nsecond line");
    }

    #[test]
    fn cleanup_drops_null_bytes() {
        assert_eq!(cleanup_text("a\0b"), "ab");
    }

    #[test]
    fn garbage_bytes_fail_with_decode_error() {
        let err = extract_pages(b"not a pdf at all").unwrap_err();
        assert!(matches!(err, Error::Decode { format: "pdf", .. }));
    }
}
