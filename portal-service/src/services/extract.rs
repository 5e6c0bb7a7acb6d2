//! Per-format plain-text extraction.
//!
//! Word-processor documents are unpacked from their archive and the
//! paragraph texts joined with newlines; everything else is decoded as
//! UTF-8 with lossy replacement so undecodable bytes never fail a file.

use crate::services::drive::DOCX_MIME;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::io::{Cursor, Read};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("not a word-processor archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("malformed document XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("archive entry unreadable: {0}")]
    Io(#[from] std::io::Error),
}

/// Convert fetched bytes to plain text according to the content type.
pub fn to_plain_text(mime_type: &str, bytes: &[u8]) -> Result<String, ExtractError> {
    if mime_type == DOCX_MIME {
        docx_text(bytes)
    } else {
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

/// Pull the paragraph texts out of `word/document.xml`.
fn docx_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut entry = archive.by_name("word/document.xml")?;
    let mut xml = String::new();
    entry.read_to_string(&mut xml)?;

    let mut reader = Reader::from_reader(xml.as_bytes());
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => in_text = true,
            Event::End(e) if e.local_name().as_ref() == b"t" => in_text = false,
            Event::End(e) if e.local_name().as_ref() == b"p" => {
                paragraphs.push(std::mem::take(&mut current));
            }
            Event::Empty(e) if e.local_name().as_ref() == b"p" => {
                paragraphs.push(String::new());
            }
            Event::Text(t) if in_text => current.push_str(&t.unescape()?),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }

    Ok(paragraphs.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn docx_with_body(body_xml: &str) -> Vec<u8> {
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:body>{}</w:body>
</w:document>"#,
            body_xml
        );

        let mut cursor = Cursor::new(Vec::new());
        let mut writer = zip::ZipWriter::new(&mut cursor);
        let options: zip::write::SimpleFileOptions =
            zip::write::SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Deflated);
        writer.start_file("word/document.xml", options).unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
        writer.finish().unwrap();
        cursor.into_inner()
    }

    #[test]
    fn docx_paragraphs_join_with_newlines() {
        let bytes = docx_with_body(
            "<w:p><w:r><w:t>First paragraph</w:t></w:r></w:p>\
             <w:p><w:r><w:t>Second </w:t></w:r><w:r><w:t>paragraph</w:t></w:r></w:p>",
        );
        let text = to_plain_text(DOCX_MIME, &bytes).unwrap();
        assert_eq!(text, "First paragraph\nSecond paragraph");
    }

    #[test]
    fn docx_empty_paragraphs_become_blank_lines() {
        let bytes = docx_with_body(
            "<w:p><w:r><w:t>One</w:t></w:r></w:p><w:p/><w:p><w:r><w:t>Two</w:t></w:r></w:p>",
        );
        let text = to_plain_text(DOCX_MIME, &bytes).unwrap();
        assert_eq!(text, "One\n\nTwo");
    }

    #[test]
    fn garbage_docx_is_an_error() {
        assert!(to_plain_text(DOCX_MIME, b"definitely not a zip").is_err());
    }

    #[test]
    fn plain_text_decodes_lossily() {
        let bytes = b"hello \xF0\x28\x8C\x28 world";
        let text = to_plain_text("text/plain", bytes).unwrap();
        assert!(text.starts_with("hello "));
        assert!(text.ends_with(" world"));
        assert!(text.contains('\u{FFFD}'));
    }

    #[test]
    fn csv_passes_through_unchanged() {
        let text = to_plain_text("text/csv", b"id,quote\n1,\"it works\"").unwrap();
        assert_eq!(text, "id,quote\n1,\"it works\"");
    }
}
