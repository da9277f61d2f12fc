use lopdf::Document;

use super::ExtractionError;

/// Concatenates the text layer of every page, in page order.
pub fn extract_text(data: &[u8]) -> Result<String, ExtractionError> {
    let doc = Document::load_mem(data).map_err(|e| ExtractionError::InvalidPdf(e.to_string()))?;

    let mut text = String::new();
    let pages = doc.get_pages();

    for page_num in pages.keys() {
        match doc.extract_text(&[*page_num]) {
            Ok(page_text) => {
                text.push_str(&page_text);
                text.push('\n');
            }
            Err(e) => tracing::debug!("Skipping page {}: {}", page_num, e),
        }
    }

    if text.trim().is_empty() {
        return Err(ExtractionError::NoText);
    }

    Ok(text)
}
