//! Text extraction from uploaded documents

use std::io::Read;

use crate::error::{Error, Result};

/// Supported upload file types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileType {
    Pdf,
    Docx,
    Pptx,
    Txt,
    Markdown,
    Unknown,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "docx" | "doc" => Self::Docx,
            "pptx" => Self::Pptx,
            "txt" | "text" => Self::Txt,
            "md" | "markdown" => Self::Markdown,
            _ => Self::Unknown,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Short name used in API responses
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Pptx => "pptx",
            Self::Txt => "text",
            Self::Markdown => "markdown",
            Self::Unknown => "unknown",
        }
    }
}

/// Parse an uploaded document and return its text content with the detected type.
pub fn parse_document(filename: &str, data: &[u8]) -> Result<(String, FileType)> {
    let extension = filename.rsplit('.').next().unwrap_or("").to_lowercase();
    let file_type = FileType::from_extension(&extension);

    let content = match file_type {
        FileType::Pdf => parse_pdf(filename, data)?,
        FileType::Docx => parse_docx(filename, data)?,
        FileType::Pptx => parse_pptx(filename, data)?,
        FileType::Txt | FileType::Markdown => parse_text(filename, data)?,
        FileType::Unknown => return Err(Error::UnsupportedFileType(extension)),
    };

    if content.trim().is_empty() {
        return Err(Error::file_parse(
            filename,
            "no text content could be extracted",
        ));
    }

    Ok((content, file_type))
}

fn parse_text(filename: &str, data: &[u8]) -> Result<String> {
    String::from_utf8(data.to_vec())
        .map_err(|_| Error::file_parse(filename, "file is not valid UTF-8"))
}

fn parse_pdf(filename: &str, data: &[u8]) -> Result<String> {
    let content = pdf_extract::extract_text_from_mem(data)
        .map_err(|e| Error::file_parse(filename, e.to_string()))?;

    // Strip null bytes and collapse the whitespace-heavy layout pdf-extract emits
    let content = content
        .replace('\0', "")
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    Ok(content)
}

fn parse_docx(filename: &str, data: &[u8]) -> Result<String> {
    let doc = docx_rs::read_docx(data).map_err(|e| Error::file_parse(filename, e.to_string()))?;

    let mut parts: Vec<String> = Vec::new();

    for child in doc.document.children {
        match child {
            docx_rs::DocumentChild::Paragraph(p) => {
                let text = paragraph_text(&p);
                if !text.trim().is_empty() {
                    parts.push(text);
                }
            }
            docx_rs::DocumentChild::Table(table) => {
                for row in &table.rows {
                    let docx_rs::TableChild::TableRow(row) = row;
                    let cells: Vec<String> = row
                        .cells
                        .iter()
                        .map(|cell| {
                            let docx_rs::TableRowChild::TableCell(cell) = cell;
                            cell.children
                                .iter()
                                .filter_map(|c| match c {
                                    docx_rs::TableCellContent::Paragraph(p) => {
                                        Some(paragraph_text(p))
                                    }
                                    _ => None,
                                })
                                .collect::<Vec<_>>()
                                .join(" ")
                                .trim()
                                .to_string()
                        })
                        .filter(|c| !c.is_empty())
                        .collect();
                    if !cells.is_empty() {
                        parts.push(cells.join(" | "));
                    }
                }
            }
            _ => {}
        }
    }

    Ok(parts.join("\n\n"))
}

fn paragraph_text(paragraph: &docx_rs::Paragraph) -> String {
    let mut text = String::new();
    for child in &paragraph.children {
        if let docx_rs::ParagraphChild::Run(run) = child {
            for child in &run.children {
                if let docx_rs::RunChild::Text(t) = child {
                    text.push_str(&t.text);
                }
            }
        }
    }
    text
}

fn parse_pptx(filename: &str, data: &[u8]) -> Result<String> {
    let cursor = std::io::Cursor::new(data);
    let mut archive =
        zip::ZipArchive::new(cursor).map_err(|e| Error::file_parse(filename, e.to_string()))?;

    let mut slide_names: Vec<String> = archive
        .file_names()
        .filter(|name| name.starts_with("ppt/slides/slide") && name.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();

    slide_names.sort_by_key(|name| {
        name.trim_start_matches("ppt/slides/slide")
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(0)
    });

    let mut content = String::new();
    for (i, slide_name) in slide_names.iter().enumerate() {
        if let Ok(mut file) = archive.by_name(slide_name) {
            let mut xml = String::new();
            if file.read_to_string(&mut xml).is_ok() {
                let slide_text = extract_drawingml_text(&xml);
                if !slide_text.is_empty() {
                    content.push_str(&format!("Slide {}:\n{}\n\n", i + 1, slide_text));
                }
            }
        }
    }

    Ok(content)
}

/// Pull the `<a:t>` text runs out of a DrawingML slide part
fn extract_drawingml_text(xml: &str) -> String {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut lines: Vec<String> = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::Text(e)) => {
                if in_text {
                    if let Ok(text) = e.unescape() {
                        let text = text.trim().to_string();
                        if !text.is_empty() {
                            lines.push(text);
                        }
                    }
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"t" => in_text = false,
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_detection() {
        assert_eq!(FileType::from_extension("PDF"), FileType::Pdf);
        assert_eq!(FileType::from_extension("docx"), FileType::Docx);
        assert_eq!(FileType::from_extension("md"), FileType::Markdown);
        assert_eq!(FileType::from_extension("exe"), FileType::Unknown);
    }

    #[test]
    fn test_parse_plain_text() {
        let (content, file_type) = parse_document("notes.txt", b"Project kickoff notes").unwrap();
        assert_eq!(content, "Project kickoff notes");
        assert_eq!(file_type, FileType::Txt);
    }

    #[test]
    fn test_unsupported_extension_rejected() {
        let err = parse_document("image.png", b"\x89PNG").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFileType(_)));
    }

    #[test]
    fn test_empty_document_rejected() {
        assert!(parse_document("empty.txt", b"   \n ").is_err());
    }

    #[test]
    fn test_drawingml_text_extraction() {
        let xml = r#"<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main">
            <a:t>Quarterly Review</a:t><a:t>Revenue up 12%</a:t></p:sld>"#;
        let text = extract_drawingml_text(xml);
        assert_eq!(text, "Quarterly Review\nRevenue up 12%");
    }
}
