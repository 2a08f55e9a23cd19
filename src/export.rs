use crate::engine::RecognitionOutcome;
use regex::Regex;
use std::io::{Cursor, Write};
use std::sync::LazyLock;
use thiserror::Error;
use zip::{ZipWriter, write::SimpleFileOptions};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml" TargetMode="Internal"/></Relationships>"#;

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?><w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"></w:styles>"#;

/// Escape text for embedding in markup. Recognized text is arbitrary: markup
/// metacharacters are entity-escaped and C0 controls (other than whitespace)
/// are dropped, since either would corrupt the archive.
pub fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if u32::from(c) < 0x20 && !matches!(c, '\t' | '\n' | '\r') => {}
            c => out.push(c),
        }
    }
    out
}

/// The `word/document.xml` body: one "Page N" header paragraph and one text
/// paragraph per result, in result-set order.
pub fn document_xml(results: &[RecognitionOutcome]) -> String {
    let mut body = String::new();
    for (i, outcome) in results.iter().enumerate() {
        body.push_str("<w:p><w:r><w:t>Page ");
        body.push_str(&(i + 1).to_string());
        body.push_str("</w:t></w:r></w:p>");
        body.push_str("<w:p><w:r><w:t xml:space=\"preserve\">");
        body.push_str(&escape_markup(&outcome.text));
        body.push_str("</w:t></w:r></w:p>");
    }
    format!(
        "<w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{body}</w:body></w:document>"
    )
}

/// One-shot, write-only DOCX package: manifest, relationships, empty style
/// sheet, and the document body.
pub fn export_docx(results: &[RecognitionOutcome]) -> Result<Vec<u8>, ExportError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(CONTENT_TYPES_XML.as_bytes())?;

    zip.start_file("_rels/.rels", options)?;
    zip.write_all(RELS_XML.as_bytes())?;

    zip.start_file("word/styles.xml", options)?;
    zip.write_all(STYLES_XML.as_bytes())?;

    zip.start_file("word/document.xml", options)?;
    zip.write_all(document_xml(results).as_bytes())?;

    Ok(zip.finish()?.into_inner())
}

static TABLE_ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\|.*\|\s*$").expect("table row pattern"));

/// HTML preview: paragraphs split on blank lines, with markdown table rows
/// converted to `<table>` markup.
pub fn export_html(results: &[RecognitionOutcome]) -> String {
    let mut body = String::new();
    for (i, outcome) in results.iter().enumerate() {
        body.push_str(&format!("<h2>Page {}</h2>\n", i + 1));
        for paragraph in outcome.text.split("\n\n") {
            if paragraph.trim().is_empty() {
                continue;
            }
            if paragraph.lines().any(|l| TABLE_ROW.is_match(l)) {
                body.push_str(&markdown_table_to_html(paragraph));
            } else {
                body.push_str("<p>");
                body.push_str(&escape_markup(paragraph));
                body.push_str("</p>\n");
            }
        }
    }
    format!("<!DOCTYPE html>\n<html><body>\n{body}</body></html>\n")
}

fn markdown_table_to_html(paragraph: &str) -> String {
    let mut rows = String::new();
    for line in paragraph.lines() {
        if !TABLE_ROW.is_match(line) {
            continue;
        }
        let cells: String = line
            .split('|')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(|c| format!("<td>{}</td>", escape_markup(c)))
            .collect();
        rows.push_str(&format!("<tr>{cells}</tr>"));
    }
    format!("<table border=\"1\">{rows}</table>\n")
}
