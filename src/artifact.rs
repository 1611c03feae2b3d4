//! Rendered artifact handling: signature validation, download naming, and
//! HTTP response framing.

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use bytes::Bytes;

/// Leading magic bytes of every well-formed PDF.
pub const PDF_SIGNATURE: &[u8; 5] = b"%PDF-";

/// Download name used when the requested filename sanitizes to nothing.
pub const DEFAULT_FILENAME: &str = "document.pdf";

/// A rendered PDF artifact.
#[derive(Debug, Clone)]
pub struct Pdf {
    bytes: Bytes,
}

impl Pdf {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Bytes::from(bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether the artifact starts with the `%PDF-` magic.
    ///
    /// The check is observational: an unsigned artifact is logged by the
    /// caller and still returned to the client unmodified.
    pub fn has_signature(&self) -> bool {
        self.bytes.len() >= PDF_SIGNATURE.len() && &self.bytes[..PDF_SIGNATURE.len()] == PDF_SIGNATURE
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

/// Frames a PDF download response around an already-complete artifact body.
pub fn frame_response(filename: &str, content_length: usize, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/pdf"));

    if let Ok(value) = HeaderValue::from_str(&content_length.to_string()) {
        headers.insert(header::CONTENT_LENGTH, value);
    }

    let safe_name = filename.replace('"', "'");
    if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{safe_name}\"")) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    response
}

/// Produces a download name safe to embed in a `Content-Disposition` header.
///
/// Path-separator runs collapse to a single underscore, characters outside
/// the allow-list are stripped, leading dots are trimmed, and the result is
/// guaranteed to end in `.pdf` exactly once (case preserved). An empty or
/// fully-stripped request falls back to [`DEFAULT_FILENAME`].
pub fn safe_filename(requested: Option<&str>) -> String {
    let raw = match requested {
        Some(raw) if !raw.trim().is_empty() => raw.trim(),
        _ => return DEFAULT_FILENAME.to_string(),
    };

    let mut collapsed = String::with_capacity(raw.len());
    let mut in_separator = false;
    for c in raw.chars() {
        if c == '/' || c == '\\' {
            if !in_separator {
                collapsed.push('_');
                in_separator = true;
            }
        } else {
            collapsed.push(c);
            in_separator = false;
        }
    }

    let cleaned: String = collapsed
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    let stem = cleaned.trim_start_matches('.');

    if stem.is_empty() || stem.chars().all(|c| matches!(c, '.' | '_' | '-')) {
        return DEFAULT_FILENAME.to_string();
    }

    if stem.to_ascii_lowercase().ends_with(".pdf") {
        stem.to_string()
    } else {
        format!("{stem}.pdf")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_check_accepts_well_formed_artifacts() {
        let pdf = Pdf::new(b"%PDF-1.7 rest of document".to_vec());
        assert!(pdf.has_signature());
        assert_eq!(pdf.len(), 24);
    }

    #[test]
    fn signature_check_rejects_unsigned_bytes() {
        assert!(!Pdf::new(b"<html>not a pdf</html>".to_vec()).has_signature());
        assert!(!Pdf::new(b"%PD".to_vec()).has_signature());
        assert!(!Pdf::new(Vec::new()).has_signature());
    }

    #[test]
    fn traversal_attempts_lose_their_separators() {
        let name = safe_filename(Some("../../etc/passwd"));
        assert!(!name.contains('/'));
        assert!(!name.contains('\\'));
        assert!(name.ends_with(".pdf"));
    }

    #[test]
    fn blank_requests_fall_back_to_the_default_name() {
        assert_eq!(safe_filename(Some("")), DEFAULT_FILENAME);
        assert_eq!(safe_filename(Some("   ")), DEFAULT_FILENAME);
        assert_eq!(safe_filename(Some("///")), DEFAULT_FILENAME);
        assert_eq!(safe_filename(None), DEFAULT_FILENAME);
    }

    #[test]
    fn existing_pdf_suffix_keeps_casing_without_doubling() {
        assert_eq!(safe_filename(Some("Report.PDF")), "Report.PDF");
        assert_eq!(safe_filename(Some("invoice.pdf")), "invoice.pdf");
    }

    #[test]
    fn missing_suffix_is_appended() {
        assert_eq!(safe_filename(Some("quarterly report!")), "quarterlyreport.pdf");
        assert_eq!(safe_filename(Some("a b c")), "abc.pdf");
    }

    #[test]
    fn response_frame_carries_download_headers() {
        let response = frame_response("report.pdf", 1234, Body::empty());
        assert_eq!(response.status(), StatusCode::OK);

        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(headers[header::CONTENT_LENGTH], "1234");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"report.pdf\""
        );
    }
}
