//! OCR fallback for scanned statements, backed by `pure-onnx-ocr`.

mod engine;

pub use engine::OcrEngine;

use serde::{Deserialize, Serialize};

/// A recognized text region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBox {
    /// Quadrilateral corners (x1, y1, x2, y2, x3, y3, x4, y4).
    pub bbox: [f32; 8],

    /// Recognized text content.
    pub text: String,

    /// Recognition confidence (0.0 - 1.0).
    pub confidence: f32,
}

impl TextBox {
    /// Get the axis-aligned bounding rectangle.
    pub fn rect(&self) -> (f32, f32, f32, f32) {
        let xs = [self.bbox[0], self.bbox[2], self.bbox[4], self.bbox[6]];
        let ys = [self.bbox[1], self.bbox[3], self.bbox[5], self.bbox[7]];

        let min_x = xs.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_x = xs.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let min_y = ys.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_y = ys.iter().cloned().fold(f32::NEG_INFINITY, f32::max);

        (min_x, min_y, max_x, max_y)
    }
}

/// Result of OCR on one page image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrResult {
    /// Recognized boxes in reading order.
    pub boxes: Vec<TextBox>,

    /// Page text, one line per row of boxes.
    pub text: String,

    /// Processing time in milliseconds.
    pub processing_time_ms: u64,

    /// Image dimensions (width, height).
    pub image_size: (u32, u32),
}

impl OcrResult {
    /// Build a result from unordered boxes.
    ///
    /// Boxes whose tops fall in the same 20px band form one row; rows are
    /// joined with newlines and boxes within a row with a space, so a label
    /// and the amount printed to its right end up on the same line.
    pub fn from_boxes(mut boxes: Vec<TextBox>, image_size: (u32, u32), processing_time_ms: u64) -> Self {
        boxes.sort_by(|a, b| {
            let (ax, ay, _, _) = a.rect();
            let (bx, by, _, _) = b.rect();
            row_of(ay)
                .cmp(&row_of(by))
                .then(ax.partial_cmp(&bx).unwrap_or(std::cmp::Ordering::Equal))
        });

        let mut lines: Vec<String> = Vec::new();
        let mut current_row = None;
        for text_box in &boxes {
            let row = row_of(text_box.rect().1);
            match lines.last_mut() {
                Some(line) if current_row == Some(row) => {
                    line.push(' ');
                    line.push_str(&text_box.text);
                }
                _ => lines.push(text_box.text.clone()),
            }
            current_row = Some(row);
        }

        Self {
            boxes,
            text: lines.join("\n"),
            processing_time_ms,
            image_size,
        }
    }
}

fn row_of(y: f32) -> i32 {
    (y / 20.0) as i32
}
