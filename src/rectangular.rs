use std::cmp::Ordering;

use tracing::debug;

use crate::error::Result;
use crate::types::{
    Layout, LayoutMethod, LeftoverDetail, LeftoverKind, Orientation, Placement, Size, StockSheet,
    add_pieces,
};

/// A full grid of one orientation anchored at the sheet origin.
#[derive(Debug, Clone, Copy)]
struct Grid {
    cols: u32,
    rows: u32,
    cell: Size,
    orientation: Orientation,
}

impl Grid {
    fn count(&self) -> u64 {
        self.cols as u64 * self.rows as u64
    }

    /// Extent covered by the grid; nothing when no piece fits.
    fn used(&self) -> Size {
        if self.count() == 0 {
            return Size::new(0.0, 0.0);
        }
        Size::new(
            self.cols as f64 * self.cell.width,
            self.rows as f64 * self.cell.length,
        )
    }

    fn placement(&self, origin_x: f64, origin_y: f64) -> Placement {
        Placement::grid(
            origin_x,
            origin_y,
            self.cols,
            self.rows,
            self.cell,
            self.orientation == Orientation::Vertical,
        )
    }
}

/// A leftover strip and the rotated pieces it takes.
#[derive(Debug, Clone, Copy)]
struct Strip {
    kind: LeftoverKind,
    x: f64,
    y: f64,
    area: Size,
    fill: Grid,
}

impl Strip {
    fn new(
        kind: LeftoverKind,
        x: f64,
        y: f64,
        area: Size,
        cell: Size,
        orientation: Orientation,
    ) -> Result<Self> {
        let (cols, rows) = cell.grid_in(&area)?;
        Ok(Self {
            kind,
            x,
            y,
            area,
            fill: Grid {
                cols,
                rows,
                cell,
                orientation,
            },
        })
    }

    fn detail(&self) -> LeftoverDetail {
        LeftoverDetail {
            kind: self.kind,
            width: self.area.width,
            length: self.area.length,
            orientation: self.fill.orientation,
            extra_pieces: self.fill.count(),
        }
    }
}

/// Primary grid plus the rotated fill of its leftover strips.
#[derive(Debug, Clone)]
struct Mix {
    primary: Grid,
    strips: [Strip; 2],
}

impl Mix {
    fn extra(&self) -> Result<u64> {
        strip_pieces(&self.strips)
    }

    fn total(&self) -> Result<u64> {
        add_pieces(self.primary.count(), self.extra()?)
    }
}

fn strip_pieces(strips: &[Strip; 2]) -> Result<u64> {
    add_pieces(strips[0].fill.count(), strips[1].fill.count())
}

/// Grid layouts of one rectangular blank on one sheet.
pub struct RectangularPacker {
    sheet: StockSheet,
    blank: Size,
}

impl RectangularPacker {
    pub fn new(sheet: StockSheet, blank: Size) -> Self {
        Self { sheet, blank }
    }

    /// Horizontal, Vertical and SmartMixed, in that order.
    pub fn layouts(&self) -> Result<Vec<Layout>> {
        Ok(vec![self.horizontal()?, self.vertical()?, self.smart_mixed()?])
    }

    /// Blank as given: its width runs across the sheet width.
    pub fn horizontal(&self) -> Result<Layout> {
        self.single(LayoutMethod::Horizontal, self.grid(Orientation::Horizontal)?)
    }

    /// Every blank turned 90°.
    pub fn vertical(&self) -> Result<Layout> {
        self.single(LayoutMethod::Vertical, self.grid(Orientation::Vertical)?)
    }

    /// Best single-orientation grid, then the leftover strips refilled with
    /// pieces rotated against it. Never worse than either plain grid.
    pub fn smart_mixed(&self) -> Result<Layout> {
        let h = self.grid(Orientation::Horizontal)?;
        let v = self.grid(Orientation::Vertical)?;
        let mix = match h.count().cmp(&v.count()) {
            Ordering::Greater => self.mix(h)?,
            Ordering::Less => self.mix(v)?,
            // Equal grids: keep whichever leaves the more useful offcut
            Ordering::Equal => {
                let (a, b) = (self.mix(h)?, self.mix(v)?);
                if b.total()? > a.total()? { b } else { a }
            }
        };

        let used = mix.primary.used();
        let placements = std::iter::once(mix.primary.placement(0.0, 0.0))
            .chain(mix.strips.iter().map(|s| s.fill.placement(s.x, s.y)))
            .filter(|p| !p.is_empty())
            .collect();
        let details = mix
            .strips
            .iter()
            .filter(|s| s.area.area() > 0.0)
            .map(Strip::detail)
            .collect();

        let mut layout = Layout::build(
            LayoutMethod::SmartMixed,
            &self.sheet,
            self.blank.area(),
            mix.primary.count(),
            mix.extra()?,
            Size::new(
                self.sheet.width() - used.width,
                self.sheet.length() - used.length,
            ),
            details,
            placements,
        )?;
        layout.selected_method = Some(match mix.primary.orientation {
            Orientation::Horizontal => LayoutMethod::Horizontal,
            Orientation::Vertical => LayoutMethod::Vertical,
        });
        debug!(
            sheet = %self.sheet,
            blank = %self.blank,
            primary = layout.primary_pieces,
            extra = layout.extra_pieces_from_leftover,
            "smart mixed layout"
        );
        Ok(layout)
    }

    fn grid(&self, orientation: Orientation) -> Result<Grid> {
        let cell = match orientation {
            Orientation::Horizontal => self.blank,
            Orientation::Vertical => self.blank.rotated(),
        };
        let (cols, rows) = cell.grid_in(&self.sheet.size())?;
        Ok(Grid {
            cols,
            rows,
            cell,
            orientation,
        })
    }

    fn single(&self, method: LayoutMethod, grid: Grid) -> Result<Layout> {
        let used = grid.used();
        let strips = self.split_width_first(used, grid.cell, grid.orientation)?;
        let details = strips
            .iter()
            .filter(|s| s.area.area() > 0.0)
            .map(|s| LeftoverDetail {
                extra_pieces: 0,
                ..s.detail()
            })
            .collect();
        let placements = if grid.count() > 0 {
            vec![grid.placement(0.0, 0.0)]
        } else {
            Vec::new()
        };
        let layout = Layout::build(
            method,
            &self.sheet,
            self.blank.area(),
            grid.count(),
            0,
            Size::new(
                self.sheet.width() - used.width,
                self.sheet.length() - used.length,
            ),
            details,
            placements,
        )?;
        debug!(
            sheet = %self.sheet,
            blank = %self.blank,
            %method,
            pieces = layout.total_pieces,
            "grid layout"
        );
        Ok(layout)
    }

    /// Refills the leftover of `primary` with rotated pieces, trying both
    /// guillotine cut orders so the corner block lands in exactly one strip.
    fn mix(&self, primary: Grid) -> Result<Mix> {
        let used = primary.used();
        let alt = primary.cell.rotated();
        let alt_orientation = primary.orientation.flipped();

        let width_first = self.split_width_first(used, alt, alt_orientation)?;
        let length_first = self.split_length_first(used, alt, alt_orientation)?;

        let strips = if strip_pieces(&length_first)? > strip_pieces(&width_first)? {
            length_first
        } else {
            width_first
        };
        Ok(Mix { primary, strips })
    }

    /// Width strip at full sheet length, length strip under the grid only.
    fn split_width_first(
        &self,
        used: Size,
        cell: Size,
        orientation: Orientation,
    ) -> Result<[Strip; 2]> {
        let sheet = self.sheet.size();
        Ok([
            Strip::new(
                LeftoverKind::WidthStrip,
                used.width,
                0.0,
                Size::new(sheet.width - used.width, sheet.length),
                cell,
                orientation,
            )?,
            Strip::new(
                LeftoverKind::LengthStrip,
                0.0,
                used.length,
                Size::new(used.width, sheet.length - used.length),
                cell,
                orientation,
            )?,
        ])
    }

    /// Length strip at full sheet width, width strip beside the grid only.
    fn split_length_first(
        &self,
        used: Size,
        cell: Size,
        orientation: Orientation,
    ) -> Result<[Strip; 2]> {
        let sheet = self.sheet.size();
        Ok([
            Strip::new(
                LeftoverKind::WidthStrip,
                used.width,
                0.0,
                Size::new(sheet.width - used.width, used.length),
                cell,
                orientation,
            )?,
            Strip::new(
                LeftoverKind::LengthStrip,
                0.0,
                used.length,
                Size::new(sheet.width, sheet.length - used.length),
                cell,
                orientation,
            )?,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EngineError;
    use crate::types::FitStatus;

    fn packer(sw: f64, sl: f64, bw: f64, bl: f64) -> RectangularPacker {
        let sheet = StockSheet::new(sw, sl, 3.0).unwrap();
        RectangularPacker::new(sheet, Size::new(bw, bl))
    }

    /// Every cell lies on the sheet and no two cells overlap.
    fn assert_layout_valid(layout: &Layout, sheet: Size) {
        let mut cells = Vec::new();
        for p in &layout.placements {
            for (x, y) in p.cells() {
                cells.push((x, y, p.cell_width, p.cell_height));
            }
        }
        assert_eq!(cells.len() as u64, layout.total_pieces);

        for (i, &(x, y, w, h)) in cells.iter().enumerate() {
            assert!(x + w <= sheet.width + 1e-6, "cell {i} exceeds sheet width");
            assert!(y + h <= sheet.length + 1e-6, "cell {i} exceeds sheet length");
        }
        for i in 0..cells.len() {
            for j in (i + 1)..cells.len() {
                let (ax, ay, aw, ah) = cells[i];
                let (bx, by, bw, bh) = cells[j];
                let overlaps = ax < bx + bw - 1e-6
                    && bx < ax + aw - 1e-6
                    && ay < by + bh - 1e-6
                    && by < ay + ah - 1e-6;
                assert!(!overlaps, "cell {i} overlaps cell {j}");
            }
        }
    }

    #[test]
    fn test_standard_sheet_horizontal_wins() {
        let p = packer(1220.0, 2440.0, 170.0, 760.0);
        let h = p.horizontal().unwrap();
        let v = p.vertical().unwrap();
        assert_eq!(h.total_pieces, 21);
        assert_eq!(v.total_pieces, 14);
        let smart = p.smart_mixed().unwrap();
        assert!(smart.total_pieces >= 21);
        assert_eq!(smart.selected_method, Some(LayoutMethod::Horizontal));
        let expected = 21.0 * 170.0 * 760.0 / (1220.0 * 2440.0) * 100.0;
        assert!((h.efficiency_pct - expected).abs() < 1e-9);
        assert_eq!(h.leftover_width, 30.0);
        assert_eq!(h.leftover_length, 160.0);
    }

    #[test]
    fn test_smart_mixed_fills_leftover_with_rotated_pieces() {
        // 5 upright pieces use 1000x600; the 1000x400 strip below takes 2 rotated ones
        let p = packer(1000.0, 1000.0, 200.0, 600.0);
        assert_eq!(p.horizontal().unwrap().total_pieces, 5);
        assert_eq!(p.vertical().unwrap().total_pieces, 5);

        let smart = p.smart_mixed().unwrap();
        assert_eq!(smart.primary_pieces, 5);
        assert_eq!(smart.extra_pieces_from_leftover, 2);
        assert_eq!(smart.total_pieces, 7);
        assert!((smart.efficiency_pct - 84.0).abs() < 1e-9);

        let extra: u64 = smart.leftover_details.iter().map(|d| d.extra_pieces).sum();
        assert_eq!(extra, 2);
        let strip = smart
            .leftover_details
            .iter()
            .find(|d| d.extra_pieces > 0)
            .unwrap();
        assert_eq!(strip.kind, LeftoverKind::LengthStrip);
        assert_eq!(strip.orientation, Orientation::Vertical);
        assert_layout_valid(&smart, Size::new(1000.0, 1000.0));
    }

    #[test]
    fn test_blank_larger_than_sheet() {
        let p = packer(1220.0, 2440.0, 2000.0, 2000.0);
        for layout in p.layouts().unwrap() {
            assert_eq!(layout.total_pieces, 0);
            assert_eq!(layout.efficiency_pct, 0.0);
            assert_eq!(layout.fit_status(), FitStatus::BlankExceedsSheet);
            assert!(layout.placements.is_empty());
            assert_eq!(layout.leftover_area, 1220.0 * 2440.0);
        }
    }

    #[test]
    fn test_only_rotated_fits() {
        let p = packer(1000.0, 300.0, 200.0, 900.0);
        assert_eq!(p.horizontal().unwrap().total_pieces, 0);
        let v = p.vertical().unwrap();
        assert_eq!(v.total_pieces, 1);
        assert!(v.placements[0].rotated);
        let smart = p.smart_mixed().unwrap();
        assert_eq!(smart.selected_method, Some(LayoutMethod::Vertical));
        assert!(smart.total_pieces >= 1);
    }

    #[test]
    fn test_exact_fill() {
        let p = packer(1000.0, 1000.0, 250.0, 500.0);
        let smart = p.smart_mixed().unwrap();
        assert_eq!(smart.total_pieces, 8);
        assert_eq!(smart.efficiency_pct, 100.0);
        assert_eq!(smart.leftover_area, 0.0);
        assert!(smart.leftover_details.is_empty());
    }

    #[test]
    fn test_layout_properties_hold_across_sizes() {
        let sheets = [(1000.0, 1000.0), (1220.0, 2440.0), (1500.0, 3000.0), (610.0, 1830.0)];
        let dims = [90.0, 170.0, 255.0, 333.0, 410.0, 760.0, 1300.0];
        for &(sw, sl) in &sheets {
            for &bw in &dims {
                for &bl in &dims {
                    let p = packer(sw, sl, bw, bl);
                    let layouts = p.layouts().unwrap();
                    let (h, v, smart) = (&layouts[0], &layouts[1], &layouts[2]);
                    assert!(
                        smart.total_pieces >= h.total_pieces.max(v.total_pieces),
                        "{sw}x{sl} / {bw}x{bl}"
                    );
                    for l in &layouts {
                        assert!((0.0..=100.0).contains(&l.efficiency_pct));
                        assert!(l.total_pieces as f64 * bw * bl <= sw * sl + 1e-6);
                        let placed: u64 = l.placements.iter().map(|p| p.count()).sum();
                        assert_eq!(placed, l.total_pieces);
                    }
                }
            }
        }
    }

    #[test]
    fn test_smart_layout_has_no_overlaps() {
        for &(bw, bl) in &[(200.0, 600.0), (170.0, 760.0), (300.0, 410.0), (455.0, 180.0)] {
            let p = packer(1220.0, 2440.0, bw, bl);
            assert_layout_valid(&p.smart_mixed().unwrap(), Size::new(1220.0, 2440.0));
        }
    }

    #[test]
    fn test_piece_counts_past_u32_rows_are_rejected() {
        let p = packer(1e10, 1e10, 1.0, 1.0);
        for result in [p.horizontal(), p.vertical(), p.smart_mixed()] {
            assert!(matches!(
                result,
                Err(EngineError::NonFiniteResult { .. })
            ));
        }
    }

    #[test]
    fn test_largest_representable_grid() {
        let p = packer(4e9, 4e9, 1.0, 1.0);
        let layouts = p.layouts().unwrap();
        for l in &layouts {
            assert_eq!(l.total_pieces, 16_000_000_000_000_000_000);
            assert_eq!(l.extra_pieces_from_leftover, 0);
        }
    }

    #[test]
    fn test_sheet_area_overflow_is_rejected() {
        // sheet area overflows f64 while one piece still fits
        let p = packer(1.5e154, 1.5e154, 1e154, 1e154);
        assert!(matches!(
            p.horizontal(),
            Err(EngineError::NonFiniteResult { quantity: "leftover area" })
        ));

        // piece area overflows too, so efficiency is inf / inf
        let p = packer(1e200, 1e200, 1e200, 1e200);
        assert!(matches!(
            p.smart_mixed(),
            Err(EngineError::NonFiniteResult { quantity: "efficiency" })
        ));
    }

    #[test]
    fn test_repeat_calls_are_identical() {
        let p = packer(1220.0, 2440.0, 333.0, 410.0);
        assert_eq!(p.layouts().unwrap(), p.layouts().unwrap());
    }
}
