use crate::types::{Layout, Placement, StockSheet};

const MAX_WIDTH: f64 = 80.0;
const MAX_HEIGHT: f64 = 40.0;

/// Character-cell box on the canvas: column, row, width, height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CellBox {
    col: usize,
    row: usize,
    width: usize,
    height: usize,
}

impl CellBox {
    fn centre(&self) -> (usize, usize) {
        (self.col + self.width / 2, self.row + self.height / 2)
    }
}

/// Character grid with sheet length on the horizontal axis.
struct Canvas {
    scale: f64,
    rows: Vec<Vec<char>>,
}

impl Canvas {
    fn new(sheet: &StockSheet) -> Option<Self> {
        let scale = f64::min(MAX_WIDTH / sheet.length(), MAX_HEIGHT / sheet.width());
        let width = (sheet.length() * scale).round() as usize;
        let height = (sheet.width() * scale).round() as usize;
        if width == 0 || height == 0 {
            return None;
        }
        let mut canvas = Self {
            scale,
            rows: vec![vec![' '; width + 1]; height + 1],
        };
        canvas.frame(CellBox {
            col: 0,
            row: 0,
            width,
            height,
        });
        Some(canvas)
    }

    /// Box covering the placement cell whose top-left corner is at (`x`, `y`) mm.
    fn cell_box(&self, p: &Placement, x: f64, y: f64) -> CellBox {
        CellBox {
            col: (y * self.scale).round() as usize,
            row: (x * self.scale).round() as usize,
            width: (p.cell_height * self.scale).round() as usize,
            height: (p.cell_width * self.scale).round() as usize,
        }
    }

    fn put(&mut self, col: usize, row: usize, ch: char) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = ch;
        }
    }

    /// Draws a line character, turning crossings into `+`.
    fn stroke(&mut self, col: usize, row: usize, line: char) {
        let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(col)) else {
            return;
        };
        *cell = match (*cell, line) {
            ('+', _) | ('-', '|') | ('|', '-') => '+',
            _ => line,
        };
    }

    fn frame(&mut self, b: CellBox) {
        let (right, bottom) = (b.col + b.width, b.row + b.height);
        for col in b.col..=right {
            self.stroke(col, b.row, '-');
            self.stroke(col, bottom, '-');
        }
        for row in b.row..=bottom {
            self.stroke(b.col, row, '|');
            self.stroke(right, row, '|');
        }
        for (col, row) in [(b.col, b.row), (right, b.row), (b.col, bottom), (right, bottom)] {
            self.put(col, row, '+');
        }
    }

    /// Centres `text` inside the box, skipped when it does not fit.
    fn label(&mut self, b: CellBox, text: &str) {
        let len = text.chars().count();
        if b.width <= len || b.height <= 1 {
            return;
        }
        let (mid_col, row) = b.centre();
        let start = mid_col.saturating_sub(len / 2);
        for (i, ch) in text.chars().enumerate() {
            let col = start + i;
            if col > b.col && col < b.col + b.width {
                self.put(col, row, ch);
            }
        }
    }

    fn into_string(self) -> String {
        let mut out = String::new();
        for row in self.rows {
            let line: String = row.into_iter().collect();
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out
    }
}

/// ASCII drawing of a layout. The sheet length runs left to right, the
/// width top to bottom; circles are drawn as `o` at their centres.
pub fn render_layout(sheet: &StockSheet, layout: &Layout) -> String {
    let Some(mut canvas) = Canvas::new(sheet) else {
        return String::new();
    };

    let circular = layout.method.is_circular();
    for p in &layout.placements {
        let text = format!("{}x{}", p.cell_width, p.cell_height);
        for (x, y) in p.cells() {
            let b = canvas.cell_box(p, x, y);
            if circular {
                let (col, row) = b.centre();
                canvas.put(col, row, 'o');
            } else if b.width > 0 && b.height > 0 {
                canvas.frame(b);
                canvas.label(b, &text);
            }
        }
    }
    canvas.into_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circular::CircularPacker;
    use crate::rectangular::RectangularPacker;
    use crate::types::Size;

    #[test]
    fn test_render_single_piece() {
        let sheet = StockSheet::new(50.0, 100.0, 1.0).unwrap();
        let layout = RectangularPacker::new(sheet, Size::new(50.0, 100.0))
            .horizontal()
            .unwrap();
        let output = render_layout(&sheet, &layout);
        assert!(output.contains('+'));
        assert!(output.contains('-'));
        assert!(output.contains('|'));
        assert!(output.contains("50x100"));
    }

    #[test]
    fn test_render_rotated_leftover() {
        let sheet = StockSheet::new(1000.0, 1000.0, 1.0).unwrap();
        let layout = RectangularPacker::new(sheet, Size::new(200.0, 600.0))
            .smart_mixed()
            .unwrap();
        let output = render_layout(&sheet, &layout);
        assert!(output.contains("600x200"));
    }

    #[test]
    fn test_render_circles() {
        let sheet = StockSheet::new(1000.0, 1000.0, 1.0).unwrap();
        let layout = CircularPacker::new(sheet, 100.0).hexagonal().unwrap();
        let output = render_layout(&sheet, &layout);
        let circles = output.chars().filter(|&c| c == 'o').count();
        assert!(circles > 0 && circles as u64 <= layout.total_pieces);
    }

    #[test]
    fn test_render_circle_at_cell_centre() {
        let sheet = StockSheet::new(100.0, 100.0, 1.0).unwrap();
        let layout = CircularPacker::new(sheet, 100.0).square_grid().unwrap();
        let output = render_layout(&sheet, &layout);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 41);
        assert_eq!(lines[20].chars().nth(20), Some('o'));
        assert_eq!(output.chars().filter(|&c| c == 'o').count(), 1);
    }

    #[test]
    fn test_frames_share_edges() {
        let sheet = StockSheet::new(100.0, 200.0, 1.0).unwrap();
        let layout = RectangularPacker::new(sheet, Size::new(100.0, 100.0))
            .horizontal()
            .unwrap();
        let output = render_layout(&sheet, &layout);
        let lines: Vec<&str> = output.lines().collect();
        // two cells side by side meet on one shared column
        assert_eq!(lines[0], format!("+{}+{}+", "-".repeat(39), "-".repeat(39)));
        assert_eq!(lines[20].chars().nth(40), Some('|'));
    }

    #[test]
    fn test_render_empty() {
        let sheet = StockSheet::new(1220.0, 2440.0, 1.0).unwrap();
        let layout = RectangularPacker::new(sheet, Size::new(2000.0, 2000.0))
            .horizontal()
            .unwrap();
        let output = render_layout(&sheet, &layout);
        // Should still draw the sheet border
        assert!(output.contains('+'));
    }
}
