use tracing::debug;

use crate::catalog::SheetCatalog;
use crate::circular::CircularPacker;
use crate::error::Result;
use crate::rectangular::RectangularPacker;
use crate::types::{BlankShape, BlankSpec, ComparisonRow, Layout, Size, StockSheet};

/// Every strategy's layout for the blank's shape.
pub fn pack(sheet: &StockSheet, blank: &BlankSpec) -> Result<Vec<Layout>> {
    match blank.shape() {
        BlankShape::Rectangular { width, length } => {
            RectangularPacker::new(*sheet, Size::new(width, length)).layouts()
        }
        BlankShape::Circular { diameter } => CircularPacker::new(*sheet, diameter).layouts(),
    }
}

/// Layout with the most pieces. Equal counts keep the earlier candidate.
pub fn select_best(layouts: &[Layout]) -> Option<&Layout> {
    let mut best: Option<&Layout> = None;
    for layout in layouts {
        if best.is_none_or(|b| layout.total_pieces > b.total_pieces) {
            best = Some(layout);
        }
    }
    best
}

/// Best layout on every catalog size, most pieces first.
///
/// `reference` supplies the thickness and density; only its outline is swapped.
pub fn compare_sizes(
    catalog: &SheetCatalog,
    blank: &BlankSpec,
    reference: &StockSheet,
) -> Result<Vec<ComparisonRow>> {
    let mut rows = Vec::with_capacity(catalog.sizes.len());
    for size in &catalog.sizes {
        let sheet = StockSheet::new(size.width, size.length, reference.thickness())?
            .with_density(reference.density())?;
        let layouts = pack(&sheet, blank)?;
        let Some(best) = select_best(&layouts) else {
            continue;
        };
        rows.push(ComparisonRow {
            sheet_width: size.width,
            sheet_length: size.length,
            direction: best.method,
            primary_pieces: best.primary_pieces,
            extra_pieces: best.extra_pieces_from_leftover,
            total_pieces: best.total_pieces,
            efficiency_pct: best.efficiency_pct,
            is_best: false,
        });
    }

    rows.sort_by(|a, b| {
        b.total_pieces
            .cmp(&a.total_pieces)
            .then(b.efficiency_pct.total_cmp(&a.efficiency_pct))
    });
    if let Some(top) = rows.first_mut() {
        top.is_best = true;
    }
    debug!(blank = %blank.shape(), sizes = rows.len(), "compared catalog sheet sizes");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LayoutMethod;

    fn sheet() -> StockSheet {
        StockSheet::new(1220.0, 2440.0, 3.0).unwrap()
    }

    #[test]
    fn test_best_of_standard_rectangle_is_horizontal() {
        let blank = BlankSpec::rectangular(170.0, 760.0, 3.0).unwrap();
        let layouts = pack(&sheet(), &blank).unwrap();
        assert_eq!(layouts.len(), 3);
        let best = select_best(&layouts).unwrap();
        assert_eq!(best.total_pieces, 21);
        assert_eq!(best.method, LayoutMethod::Horizontal);
    }

    #[test]
    fn test_extra_pieces_make_smart_mixed_best() {
        let sheet = StockSheet::new(1000.0, 1000.0, 3.0).unwrap();
        let blank = BlankSpec::rectangular(200.0, 600.0, 3.0).unwrap();
        let layouts = pack(&sheet, &blank).unwrap();
        let best = select_best(&layouts).unwrap();
        assert_eq!(best.method, LayoutMethod::SmartMixed);
        assert_eq!(best.total_pieces, 7);
    }

    #[test]
    fn test_circular_dispatch() {
        let blank = BlankSpec::circular(200.0, 3.0).unwrap();
        let layouts = pack(&sheet(), &blank).unwrap();
        let methods: Vec<_> = layouts.iter().map(|l| l.method).collect();
        assert_eq!(
            methods,
            vec![
                LayoutMethod::SquareGrid,
                LayoutMethod::Hexagonal,
                LayoutMethod::SmartCircular
            ]
        );
        assert_eq!(select_best(&layouts).unwrap().method, LayoutMethod::SquareGrid);
    }

    #[test]
    fn test_select_best_empty() {
        assert!(select_best(&[]).is_none());
    }

    #[test]
    fn test_compare_sizes_sorted_with_single_best() {
        let blank = BlankSpec::rectangular(170.0, 760.0, 3.0).unwrap();
        let rows = compare_sizes(&SheetCatalog::default(), &blank, &sheet()).unwrap();
        assert_eq!(rows.len(), SheetCatalog::default().sizes.len());
        assert!(rows[0].is_best);
        assert_eq!(rows.iter().filter(|r| r.is_best).count(), 1);
        for pair in rows.windows(2) {
            assert!(pair[0].total_pieces >= pair[1].total_pieces);
        }
        let standard = rows
            .iter()
            .find(|r| r.sheet_width == 1220.0 && r.sheet_length == 2440.0)
            .unwrap();
        assert_eq!(standard.total_pieces, 21);
        // 2000x4000 is the largest sheet in the catalog
        assert_eq!(rows[0].sheet_width, 2000.0);
    }

    #[test]
    fn test_compare_sizes_keeps_oversized_rows() {
        let catalog = SheetCatalog::new(vec![Size::new(500.0, 500.0), Size::new(1220.0, 2440.0)]).unwrap();
        let blank = BlankSpec::rectangular(600.0, 600.0, 3.0).unwrap();
        let rows = compare_sizes(&catalog, &blank, &sheet()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].sheet_width, 1220.0);
        assert_eq!(rows[1].total_pieces, 0);
        assert_eq!(rows[1].efficiency_pct, 0.0);
    }
}
