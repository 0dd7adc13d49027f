//! Minimal PDF writer for summary documents.
//!
//! Text is laid out with the built-in Courier faces, which have a fixed advance width of 0.6 em
//! and therefore wrap predictably without font metrics.

use std::path::{Path, PathBuf};

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

use super::PdfError;

const PAGE_WIDTH: i64 = 612;
const PAGE_HEIGHT: i64 = 792;
const MARGIN: i64 = 72;
const PARAGRAPH_SPACING: i64 = 12;
const TITLE_SPACING: i64 = 24;
const HEADING_MAX_CHARS: usize = 100;

/// Presentation options for a generated document.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Optional title rendered centered at the top of the first page.
    pub title: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    Title,
    Heading,
    Body,
}

impl Style {
    const fn font(self) -> &'static [u8] {
        match self {
            Self::Title | Self::Heading => b"F2",
            Self::Body => b"F1",
        }
    }

    const fn size(self) -> i64 {
        match self {
            Self::Title => 18,
            Self::Heading => 13,
            Self::Body => 10,
        }
    }

    const fn line_height(self) -> i64 {
        self.size() * 5 / 4
    }

    fn chars_per_line(self) -> usize {
        let usable = (PAGE_WIDTH - 2 * MARGIN) as f64;
        (usable / (self.size() as f64 * 0.6)).floor() as usize
    }
}

#[derive(Debug, PartialEq, Eq)]
struct Block {
    style: Style,
    text: String,
}

/// Split text into styled blocks: blank-line separated paragraphs, where a short paragraph that
/// does not end with a period is treated as a heading.
fn layout_blocks(text: &str, options: &RenderOptions) -> Vec<Block> {
    let mut blocks = Vec::new();
    if let Some(title) = options.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        blocks.push(Block {
            style: Style::Title,
            text: title.to_string(),
        });
    }

    for paragraph in text.split("\n\n") {
        let trimmed = paragraph.trim();
        if trimmed.is_empty() {
            continue;
        }
        let style = if trimmed.chars().count() < HEADING_MAX_CHARS && !trimmed.ends_with('.') {
            Style::Heading
        } else {
            Style::Body
        };
        blocks.push(Block {
            style,
            text: trimmed.to_string(),
        });
    }
    blocks
}

/// Greedy word wrap; words longer than a line are split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(width);
            lines.push(word.into_iter().collect());
            word = rest;
        }

        let needed = if current_len == 0 {
            word.len()
        } else {
            current_len + 1 + word.len()
        };
        if needed > width {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.extend(word.iter());
        current_len += word.len();
    }

    if current_len > 0 {
        lines.push(current);
    }
    lines
}

/// Map text onto WinAnsi bytes, substituting `?` for anything outside Latin-1.
fn encode_latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match u32::from(c) {
            0x20..=0x7E | 0xA0..=0xFF => u32::from(c) as u8,
            _ => b'?',
        })
        .collect()
}

struct PageWriter {
    pages: Vec<Vec<Operation>>,
    cursor: i64,
}

impl PageWriter {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            cursor: PAGE_HEIGHT - MARGIN,
        }
    }

    fn ensure_room(&mut self, height: i64) {
        if self.cursor - height < MARGIN {
            self.pages.push(Vec::new());
            self.cursor = PAGE_HEIGHT - MARGIN;
        }
    }

    fn line(&mut self, style: Style, text: &str) {
        let height = style.line_height();
        self.ensure_room(height);
        self.cursor -= height;

        let x = if style == Style::Title {
            let width = text.chars().count() as f64 * style.size() as f64 * 0.6;
            ((PAGE_WIDTH as f64 - width) / 2.0).max(MARGIN as f64) as i64
        } else {
            MARGIN
        };

        let Some(operations) = self.pages.last_mut() else {
            return;
        };
        operations.extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![
                    Object::Name(style.font().to_vec()),
                    Object::Integer(style.size()),
                ],
            ),
            Operation::new("Td", vec![Object::Integer(x), Object::Integer(self.cursor)]),
            Operation::new("Tj", vec![Object::string_literal(encode_latin1(text))]),
            Operation::new("ET", vec![]),
        ]);
    }

    fn space(&mut self, height: i64) {
        self.cursor -= height;
    }
}

/// Render `text` into an in-memory PDF document.
pub fn render_pdf(text: &str, options: &RenderOptions) -> Result<Vec<u8>, PdfError> {
    let mut writer = PageWriter::new();
    for block in layout_blocks(text, options) {
        for line in wrap(&block.text, block.style.chars_per_line()) {
            writer.line(block.style, &line);
        }
        let spacing = if block.style == Style::Title {
            PARAGRAPH_SPACING + TITLE_SPACING
        } else {
            PARAGRAPH_SPACING
        };
        writer.space(spacing);
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
        },
    });

    let mut kids = Vec::with_capacity(writer.pages.len());
    for operations in writer.pages {
        let content = Content { operations }
            .encode()
            .map_err(|error| PdfError::Render(error.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let page_count = kids.len() as i64;
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count,
        "Resources" => resources_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(PAGE_WIDTH),
            Object::Integer(PAGE_HEIGHT),
        ],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|error| PdfError::Render(error.to_string()))?;
    Ok(buffer)
}

/// Render `text` and write it to `path`, creating parent directories as needed.
pub async fn write_pdf(
    text: String,
    path: &Path,
    options: RenderOptions,
) -> Result<PathBuf, PdfError> {
    let bytes = tokio::task::spawn_blocking(move || render_pdf(&text, &options))
        .await
        .map_err(|error| PdfError::Render(format!("render task failed: {error}")))??;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|error| PdfError::Render(error.to_string()))?;
    }
    tokio::fs::write(path, &bytes)
        .await
        .map_err(|error| PdfError::Render(error.to_string()))?;

    tracing::info!(path = %path.display(), bytes = bytes.len(), "Generated PDF");
    Ok(path.to_path_buf())
}
