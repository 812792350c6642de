// Content stream walker - rebuilds text lines with their font sizes
use lopdf::content::{Content, Operation};
use lopdf::Object;
use serde::{Deserialize, Serialize};

use super::lopdf_helper::{as_number, decode_single_byte, decode_text_string};
use crate::types::Result;

// Glyph advance estimate as a fraction of the font size (no font metrics)
const AVG_GLYPH_WIDTH: f32 = 0.5;
// TJ adjustments more negative than this (thousandths of an em) read as a word gap
const TJ_SPACE_THRESHOLD: f32 = -200.0;
// Gap between baselines, in font sizes, that separates paragraphs
pub const PARAGRAPH_GAP: f32 = 1.6;

/// One visual line of a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    pub text: String,
    pub font_size: f32,
    pub y: f32,
    /// Byte offset of the line inside its page text
    #[serde(default)]
    pub offset: usize,
}

#[derive(Debug, Clone, Copy)]
struct Matrix([f32; 6]);

impl Matrix {
    const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    fn translate(&self, tx: f32, ty: f32) -> Matrix {
        let [a, b, c, d, e, f] = self.0;
        Matrix([a, b, c, d, e + tx * a + ty * c, f + tx * b + ty * d])
    }

    fn x(&self) -> f32 {
        self.0[4]
    }

    fn y(&self) -> f32 {
        self.0[5]
    }

    fn vertical_scale(&self) -> f32 {
        let scale = (self.0[1] * self.0[1] + self.0[3] * self.0[3]).sqrt();
        if scale > 0.0 { scale } else { 1.0 }
    }
}

/// Text-object state while walking operators
struct TextState {
    font_size: f32,
    leading: f32,
    text_matrix: Matrix,
    line_matrix: Matrix,
    lines: Vec<TextLine>,
    // x where the last shown run is estimated to end
    run_end_x: Option<f32>,
}

impl TextState {
    fn new() -> Self {
        Self {
            font_size: 12.0,
            leading: 0.0,
            text_matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            lines: Vec::new(),
            run_end_x: None,
        }
    }

    fn effective_size(&self) -> f32 {
        (self.font_size * self.text_matrix.vertical_scale()).abs()
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = self.line_matrix.translate(tx, ty);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = self.leading;
        self.move_line(0.0, -leading);
    }

    fn show(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let size = self.effective_size();
        let x = self.text_matrix.x();
        let y = self.text_matrix.y();
        let tolerance = (size * 0.3).max(1.0);

        let same_line = self
            .lines
            .last()
            .map(|line| (line.y - y).abs() <= tolerance)
            .unwrap_or(false);

        if same_line {
            let needs_space = self
                .run_end_x
                .map(|end| x > end + size * 0.15)
                .unwrap_or(false);
            if let Some(line) = self.lines.last_mut() {
                if needs_space && !line.text.ends_with(' ') && !text.starts_with(' ') {
                    line.text.push(' ');
                }
                line.text.push_str(text);
                // A line's size is its largest run
                if size > line.font_size {
                    line.font_size = size;
                }
            }
        } else {
            self.lines.push(TextLine {
                text: text.to_string(),
                font_size: size,
                y,
                offset: 0,
            });
        }

        let advance = text.chars().count() as f32 * self.font_size * AVG_GLYPH_WIDTH;
        self.text_matrix = self.text_matrix.translate(advance, 0.0);
        self.run_end_x = Some(self.text_matrix.x());
    }

    fn apply(&mut self, op: &Operation) {
        let operands = &op.operands;
        match op.operator.as_str() {
            "BT" => {
                self.text_matrix = Matrix::IDENTITY;
                self.line_matrix = Matrix::IDENTITY;
            }
            "Tf" => {
                if let Some(size) = operands.get(1).and_then(as_number) {
                    self.font_size = size;
                }
            }
            "TL" => {
                if let Some(leading) = operands.first().and_then(as_number) {
                    self.leading = leading;
                }
            }
            "Td" => {
                if let (Some(tx), Some(ty)) = (
                    operands.first().and_then(as_number),
                    operands.get(1).and_then(as_number),
                ) {
                    self.move_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (
                    operands.first().and_then(as_number),
                    operands.get(1).and_then(as_number),
                ) {
                    self.leading = -ty;
                    self.move_line(tx, ty);
                }
            }
            "Tm" => {
                let values: Vec<f32> = operands.iter().filter_map(as_number).collect();
                if values.len() == 6 {
                    let matrix = Matrix([values[0], values[1], values[2], values[3], values[4], values[5]]);
                    self.text_matrix = matrix;
                    self.line_matrix = matrix;
                }
            }
            "T*" => self.next_line(),
            "Tj" => {
                if let Some(text) = operands.first().and_then(string_operand) {
                    self.show(&text);
                }
            }
            "'" => {
                self.next_line();
                if let Some(text) = operands.first().and_then(string_operand) {
                    self.show(&text);
                }
            }
            "\"" => {
                self.next_line();
                if let Some(text) = operands.get(2).and_then(string_operand) {
                    self.show(&text);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    let mut run = String::new();
                    for item in items {
                        match item {
                            Object::String(..) => {
                                if let Some(text) = string_operand(item) {
                                    run.push_str(&text);
                                }
                            }
                            other => {
                                if let Some(adjust) = as_number(other) {
                                    if adjust < TJ_SPACE_THRESHOLD && !run.ends_with(' ') {
                                        run.push(' ');
                                    }
                                }
                            }
                        }
                    }
                    self.show(&run);
                }
            }
            _ => {}
        }
    }
}

fn string_operand(object: &Object) -> Option<String> {
    match object {
        Object::String(bytes, _) => {
            // Simple fonts show single bytes; a UTF-16 BOM marks a text string
            let text = if bytes.starts_with(&[0xFE, 0xFF]) {
                decode_text_string(bytes)
            } else {
                decode_single_byte(bytes)
            };
            Some(text.replace(['\r', '\n'], " "))
        }
        _ => None,
    }
}

/// Decode a page content stream into visual lines
pub fn extract_lines(content: &[u8]) -> Result<Vec<TextLine>> {
    let content = Content::decode(content)?;
    let mut state = TextState::new();
    for op in &content.operations {
        state.apply(op);
    }

    let lines = state
        .lines
        .into_iter()
        .map(|mut line| {
            line.text = line.text.split_whitespace().collect::<Vec<_>>().join(" ");
            line
        })
        .filter(|line| !line.text.is_empty())
        .collect();
    Ok(lines)
}

/// Join lines into page text, inserting a blank line at paragraph gaps.
/// Fills in each line's offset.
pub fn assemble_page_text(lines: &mut [TextLine]) -> String {
    let mut text = String::new();
    let mut previous: Option<(f32, f32)> = None;

    for line in lines.iter_mut() {
        if let Some((prev_y, prev_size)) = previous {
            let gap = (prev_y - line.y).abs();
            text.push('\n');
            if gap > PARAGRAPH_GAP * prev_size.max(line.font_size) {
                text.push('\n');
            }
        }
        line.offset = text.len();
        text.push_str(&line.text);
        previous = Some((line.y, line.font_size));
    }

    text
}
