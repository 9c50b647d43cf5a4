use tracing::debug;

use crate::error::{EngineError, Result};
use crate::types::{Layout, LayoutMethod, Placement, Size, StockSheet, fit_count};

/// Alternating rows shifted by `offset`, stacked at `pitch`.
///
/// Computed in a local frame where rows run across `across` and advance along
/// `along`; `rows_along_length` maps that frame back onto the sheet.
#[derive(Debug, Clone, Copy)]
struct Stagger {
    rows_along_length: bool,
    offset: f64,
    pitch: f64,
    rows: u32,
    even_cols: u32,
    odd_cols: u32,
}

impl Stagger {
    fn new(
        across: f64,
        along: f64,
        diameter: f64,
        offset: f64,
        rows_along_length: bool,
    ) -> Result<Self> {
        let pitch = (diameter * diameter - offset * offset).sqrt();
        let rows = if fit_count(along, diameter)? == 0 {
            0
        } else {
            fit_count(along - diameter, pitch)?
                .checked_add(1)
                .ok_or(EngineError::NonFiniteResult {
                    quantity: "rows per sheet",
                })?
        };
        Ok(Self {
            rows_along_length,
            offset,
            pitch,
            rows,
            even_cols: fit_count(across, diameter)?,
            odd_cols: fit_count(across - offset, diameter)?,
        })
    }

    fn even_rows(&self) -> u32 {
        self.rows.div_ceil(2)
    }

    fn odd_rows(&self) -> u32 {
        self.rows / 2
    }

    /// At most `u32::MAX²`, so the sum cannot overflow.
    fn count(&self) -> u64 {
        if self.even_cols == 0 {
            return 0;
        }
        self.even_cols as u64 * self.even_rows() as u64
            + self.odd_cols as u64 * self.odd_rows() as u64
    }

    /// Extent used in the local frame, as (across, along).
    fn used(&self, diameter: f64) -> (f64, f64) {
        if self.count() == 0 {
            return (0.0, 0.0);
        }
        let mut across = self.even_cols as f64 * diameter;
        if self.odd_rows() > 0 && self.odd_cols > 0 {
            across = across.max(self.offset + self.odd_cols as f64 * diameter);
        }
        let along = (self.rows - 1) as f64 * self.pitch + diameter;
        (across, along)
    }

    fn placements(&self, diameter: f64) -> Vec<Placement> {
        if self.count() == 0 {
            return Vec::new();
        }
        let cell = Size::new(diameter, diameter);
        let rows = [
            (0.0, 0.0, self.even_cols, self.even_rows()),
            (self.offset, self.pitch, self.odd_cols, self.odd_rows()),
        ];
        rows.iter()
            .map(|&(shift, start, cols, rows)| {
                let mut p = Placement::grid(0.0, 0.0, cols, rows, cell, false);
                if self.rows_along_length {
                    p.origin_x = shift;
                    p.origin_y = start;
                    p.row_pitch = 2.0 * self.pitch;
                } else {
                    // transposed: local rows become sheet columns
                    p.origin_x = start;
                    p.origin_y = shift;
                    p.cols = rows;
                    p.rows = cols;
                    p.col_pitch = 2.0 * self.pitch;
                }
                p
            })
            .filter(|p| !p.is_empty())
            .collect()
    }
}

/// Grid layouts of one circular blank on one sheet.
pub struct CircularPacker {
    sheet: StockSheet,
    diameter: f64,
}

impl CircularPacker {
    pub fn new(sheet: StockSheet, diameter: f64) -> Self {
        Self { sheet, diameter }
    }

    /// SquareGrid, Hexagonal and SmartCircular, in that order.
    pub fn layouts(&self) -> Result<Vec<Layout>> {
        let square = self.square_grid()?;
        let hex = self.hexagonal()?;
        let smart = Self::pick(&square, &hex);
        Ok(vec![square, hex, smart])
    }

    fn piece_area(&self) -> f64 {
        let r = self.diameter / 2.0;
        std::f64::consts::PI * r * r
    }

    /// One circle per `d × d` cell.
    pub fn square_grid(&self) -> Result<Layout> {
        let d = self.diameter;
        let cell = Size::new(d, d);
        let (cols, rows) = cell.grid_in(&self.sheet.size())?;
        let count = cols as u64 * rows as u64;
        let (used, placements) = if count > 0 {
            (
                Size::new(cols as f64 * d, rows as f64 * d),
                vec![Placement::grid(0.0, 0.0, cols, rows, cell, false)],
            )
        } else {
            (Size::new(0.0, 0.0), Vec::new())
        };

        let layout = Layout::build(
            LayoutMethod::SquareGrid,
            &self.sheet,
            self.piece_area(),
            count,
            0,
            Size::new(
                self.sheet.width() - used.width,
                self.sheet.length() - used.length,
            ),
            Vec::new(),
            placements,
        )?;
        debug!(sheet = %self.sheet, diameter = d, cols, rows, "square grid layout");
        Ok(layout)
    }

    /// Staggered rows at `d·sin 60°` pitch. Where a half-diameter shift would
    /// drop a circle from every odd row, a shift limited to the row slack is
    /// also tried, and rows are tried in both sheet directions.
    pub fn hexagonal(&self) -> Result<Layout> {
        let d = self.diameter;
        let (w, l) = (self.sheet.width(), self.sheet.length());

        let mut stagger = Stagger::new(w, l, d, d / 2.0, true)?;
        for (across, along, rows_along_length) in [(w, l, true), (l, w, false)] {
            let slack = (across - fit_count(across, d)? as f64 * d).clamp(0.0, d / 2.0);
            for offset in [d / 2.0, slack] {
                let s = Stagger::new(across, along, d, offset, rows_along_length)?;
                if s.count() > stagger.count() {
                    stagger = s;
                }
            }
        }

        let (used_across, used_along) = stagger.used(d);
        let used = if stagger.rows_along_length {
            Size::new(used_across, used_along)
        } else {
            Size::new(used_along, used_across)
        };

        let layout = Layout::build(
            LayoutMethod::Hexagonal,
            &self.sheet,
            self.piece_area(),
            stagger.count(),
            0,
            Size::new(w - used.width, l - used.length),
            Vec::new(),
            stagger.placements(d),
        )?;
        debug!(
            sheet = %self.sheet,
            diameter = d,
            rows = stagger.rows,
            offset = stagger.offset,
            pieces = layout.total_pieces,
            "hexagonal layout"
        );
        Ok(layout)
    }

    /// Whichever of SquareGrid and Hexagonal cuts more circles.
    pub fn smart(&self) -> Result<Layout> {
        Ok(Self::pick(&self.square_grid()?, &self.hexagonal()?))
    }

    fn pick(square: &Layout, hex: &Layout) -> Layout {
        let hex_wins = hex.total_pieces > square.total_pieces
            || (hex.total_pieces == square.total_pieces && hex.leftover_area < square.leftover_area);
        let winner = if hex_wins { hex } else { square };
        Layout {
            method: LayoutMethod::SmartCircular,
            selected_method: Some(winner.method),
            ..winner.clone()
        }
    }
}
