// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Word-processor documents (DOCX, ODT)
//!
//! Both formats are zip containers around an XML body. Paragraph text is
//! emitted in document order, one paragraph per line.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::Read;
use std::path::Path;

use super::plain::decode_lossy;
use super::{path_extension, RawText};
use crate::{OrderlyError, Result};

/// Element names that matter for one container format
struct Markup {
    body: &'static str,
    paragraphs: &'static [&'static [u8]],
    /// Text only counts inside this element; `None` means anywhere in a paragraph
    run: Option<&'static [u8]>,
    tab: &'static [u8],
    space: &'static [u8],
}

const DOCX: Markup = Markup {
    body: "word/document.xml",
    paragraphs: &[b"w:p"],
    run: Some(b"w:t"),
    tab: b"w:tab",
    space: b"w:br",
};

const ODT: Markup = Markup {
    body: "content.xml",
    paragraphs: &[b"text:p", b"text:h"],
    run: None,
    tab: b"text:tab",
    space: b"text:s",
};

pub(crate) fn extract(path: &Path, max_bytes: u64) -> Result<RawText> {
    let markup = match path_extension(path).as_str() {
        "odt" => &ODT,
        _ => &DOCX,
    };

    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| OrderlyError::Extraction(format!("Failed to open document: {}", e)))?;

    let mut body = match archive.by_name(markup.body) {
        Ok(entry) => entry,
        Err(_) => {
            return Err(OrderlyError::Extraction(format!("No {} found", markup.body)));
        }
    };

    // XML markup dwarfs the text it carries; read a generous multiple of the ceiling.
    let limit = max_bytes.saturating_mul(8);
    let mut xml_bytes = Vec::new();
    (&mut body)
        .take(limit.saturating_add(1))
        .read_to_end(&mut xml_bytes)?;
    let truncated = xml_bytes.len() as u64 > limit;
    if truncated {
        xml_bytes.truncate(limit as usize);
    }
    let xml = decode_lossy(&xml_bytes, truncated);

    let paragraphs = paragraphs(&xml, markup, truncated)?;
    Ok(RawText {
        text: paragraphs.join("\n"),
        truncated,
    })
}

/// Paragraph texts in document order, empty paragraphs dropped.
///
/// A `cut` body ends mid-markup; whatever was read before the cut is kept.
fn paragraphs(xml: &str, markup: &Markup, cut: bool) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut paragraph_depth = 0usize;
    let mut in_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                if markup.paragraphs.contains(&name.as_ref()) {
                    paragraph_depth += 1;
                } else if Some(name.as_ref()) == markup.run {
                    in_run = true;
                }
            }
            Ok(Event::Empty(e)) => {
                let name = e.name();
                if paragraph_depth > 0 && name.as_ref() == markup.tab {
                    current.push('\t');
                } else if paragraph_depth > 0 && name.as_ref() == markup.space {
                    current.push(' ');
                }
            }
            Ok(Event::Text(t)) => {
                let collecting = match markup.run {
                    Some(_) => in_run,
                    None => paragraph_depth > 0,
                };
                if collecting {
                    let text = t
                        .unescape()
                        .map_err(|e| OrderlyError::Extraction(format!("Bad XML text: {}", e)))?;
                    current.push_str(&text);
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                if markup.paragraphs.contains(&name.as_ref()) {
                    paragraph_depth = paragraph_depth.saturating_sub(1);
                    push_paragraph(&mut paragraphs, &mut current);
                } else if Some(name.as_ref()) == markup.run {
                    in_run = false;
                }
            }
            Ok(Event::Eof) => {
                push_paragraph(&mut paragraphs, &mut current);
                break;
            }
            Err(e) => {
                if cut {
                    push_paragraph(&mut paragraphs, &mut current);
                    break;
                }
                if paragraphs.is_empty() {
                    return Err(OrderlyError::Extraction(format!("Malformed document XML: {}", e)));
                }
                break;
            }
            _ => {}
        }
    }

    Ok(paragraphs)
}

fn push_paragraph(paragraphs: &mut Vec<String>, current: &mut String) {
    let text = current.trim();
    if !text.is_empty() {
        paragraphs.push(text.to_string());
    }
    current.clear();
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    /// Write a zip container holding one XML body
    pub(crate) fn write_container(path: &Path, entry: &str, xml: &str) {
        write_zip(path, &[(entry, xml)]);
    }

    /// Write a zip archive with the given named entries
    pub(crate) fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        for (name, body) in entries {
            zip.start_file(*name, zip::write::SimpleFileOptions::default()).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    /// Minimal DOCX with one `w:p` per paragraph
    pub(crate) fn write_docx(path: &Path, paragraphs: &[&str]) {
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<w:p><w:pPr/><w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>", p))
            .collect();
        let xml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
             <w:body>{}</w:body></w:document>",
            body
        );
        write_container(path, "word/document.xml", &xml);
    }

    #[test]
    fn test_docx_paragraphs_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memo.docx");
        write_docx(&path, &["First paragraph.", "Second &amp; last."]);

        let raw = extract(&path, 1024 * 1024).unwrap();
        assert_eq!(raw.text, "First paragraph.\nSecond & last.");
    }

    #[test]
    fn test_docx_runs_join_within_paragraph() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs.docx");
        let xml = "<w:document><w:body>\
                   <w:p><w:r><w:t>Hello</w:t></w:r><w:r><w:tab/><w:t>world</w:t></w:r></w:p>\
                   <w:p/>\
                   <w:p><w:r><w:instrText>PAGE</w:instrText></w:r></w:p>\
                   </w:body></w:document>";
        write_container(&path, "word/document.xml", xml);

        let raw = extract(&path, 1024 * 1024).unwrap();
        assert_eq!(raw.text, "Hello\tworld");
    }

    #[test]
    fn test_odt_paragraphs_and_headings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.odt");
        let xml = "<office:document-content><office:body><office:text>\
                   <text:h>Title</text:h>\
                   <text:p>Body <text:span>text</text:span><text:s/>here.</text:p>\
                   </office:text></office:body></office:document-content>";
        write_container(&path, "content.xml", xml);

        let raw = extract(&path, 1024 * 1024).unwrap();
        assert_eq!(raw.text, "Title\nBody text here.");
    }

    #[test]
    fn test_zip_without_body_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.docx");
        write_container(&path, "other.xml", "<x/>");

        assert!(extract(&path, 1024).is_err());
    }

    #[test]
    fn test_not_a_zip_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.docx");
        std::fs::write(&path, "just text").unwrap();

        assert!(extract(&path, 1024).is_err());
    }

    #[test]
    fn test_long_body_is_cut_and_flagged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("long.docx");
        let paragraphs: Vec<String> = (0..200).map(|i| format!("P{}", i)).collect();
        let refs: Vec<&str> = paragraphs.iter().map(String::as_str).collect();
        write_docx(&path, &refs);

        let raw = extract(&path, 64).unwrap();
        assert!(raw.truncated);
        assert!(raw.text.starts_with("P0\nP1"));
        assert!(!raw.text.contains("P199"));
    }

    #[test]
    fn test_cut_inside_multibyte_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accents.docx");
        let paragraph = "é".repeat(40);
        let paragraphs = vec![paragraph.as_str(); 200];
        write_docx(&path, &paragraphs);

        for max_bytes in 64..=66 {
            let raw = extract(&path, max_bytes).unwrap();
            assert!(raw.truncated);
            assert!(raw.text.starts_with('é'));
            assert!(!raw.text.contains('\u{FFFD}'));
        }
    }
}
