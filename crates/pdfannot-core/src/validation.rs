//! Cheap checks run before handing bytes to the parsers

/// MIME types browsers report for PDF files
const PDF_MIME_TYPES: &[&str] = &["application/pdf", "application/x-pdf"];

/// Reject input that cannot possibly be a PDF, without parsing it.
pub fn quick_validate(bytes: &[u8]) -> Result<(), String> {
    if bytes.is_empty() {
        return Err("File is empty".to_string());
    }

    if bytes.len() < 8 {
        return Err("File too small to be a valid PDF".to_string());
    }

    if !bytes.starts_with(b"%PDF-") {
        return Err("Not a valid PDF file (missing %PDF- header)".to_string());
    }

    Ok(())
}

/// True when `mime` is absent or names a PDF.
///
/// Some platforms report an empty type for files picked from disk.
pub fn is_pdf_mime(mime: &str) -> bool {
    let mime = mime.trim();
    mime.is_empty() || PDF_MIME_TYPES.iter().any(|m| m.eq_ignore_ascii_case(mime))
}

/// PDF version from the header, e.g. "1.7"
pub fn header_version(bytes: &[u8]) -> Option<&str> {
    let rest = bytes.strip_prefix(b"%PDF-")?;
    let end = rest
        .iter()
        .position(|b| !(b.is_ascii_digit() || *b == b'.'))
        .unwrap_or(rest.len());
    std::str::from_utf8(&rest[..end])
        .ok()
        .filter(|v| !v.is_empty())
}
