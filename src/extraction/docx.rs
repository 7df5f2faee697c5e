//! DOCX raw-text extraction

use crate::error::{Error, Result};

/// Extract the paragraph text of a .docx document as one trimmed block.
/// Tables and embedded objects are skipped.
pub(crate) fn extract_text(data: &[u8]) -> Result<String> {
    let doc = docx_rs::read_docx(data).map_err(|e| Error::decode("docx", e.to_string()))?;

    let mut content = String::new();
    for child in doc.document.children {
        if let docx_rs::DocumentChild::Paragraph(paragraph) = child {
            for child in paragraph.children {
                if let docx_rs::ParagraphChild::Run(run) = child {
                    for child in run.children {
                        if let docx_rs::RunChild::Text(text) = child {
                            content.push_str(&text.text);
                        }
                    }
                }
            }
            content.push('\n');
        }
    }

    Ok(content.trim().to_string())
}
