use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result, finite, positive};

/// Mild steel, kg/mm³.
pub const STEEL_DENSITY_KG_MM3: f64 = 7.85e-6;

/// Blank and sheet thickness closer than this are the same gauge.
pub const THICKNESS_TOLERANCE_MM: f64 = 1e-6;

/// Absorbs float noise so that e.g. 3 × 406.666… still counts as 3 fits in 1220.
const FIT_EPSILON_MM: f64 = 1e-9;

/// How many whole `size` cells fit along `span`. Counts past `u32::MAX` are
/// rejected rather than saturated.
pub(crate) fn fit_count(span: f64, size: f64) -> Result<u32> {
    if span <= 0.0 || size <= 0.0 {
        return Ok(0);
    }
    let n = finite("pieces per row", ((span + FIT_EPSILON_MM) / size).floor())?;
    if n > u32::MAX as f64 {
        return Err(EngineError::NonFiniteResult {
            quantity: "pieces per row",
        });
    }
    Ok(n as u32)
}

/// `a + b`, or `NonFiniteResult` when the piece count leaves `u64`.
pub(crate) fn add_pieces(a: u64, b: u64) -> Result<u64> {
    a.checked_add(b).ok_or(EngineError::NonFiniteResult {
        quantity: "piece count",
    })
}

/// Width (across the sheet) by length (along the sheet), in mm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub length: f64,
}

impl Size {
    pub fn new(width: f64, length: f64) -> Self {
        Self { width, length }
    }

    pub fn area(&self) -> f64 {
        self.width * self.length
    }

    pub fn rotated(&self) -> Self {
        Self {
            width: self.length,
            length: self.width,
        }
    }

    pub fn fits_in(&self, other: &Size) -> bool {
        self.width <= other.width + FIT_EPSILON_MM && self.length <= other.length + FIT_EPSILON_MM
    }

    /// Columns and rows of a plain grid of `self` cells inside `area`.
    pub fn grid_in(&self, area: &Size) -> Result<(u32, u32)> {
        Ok((
            fit_count(area.width, self.width)?,
            fit_count(area.length, self.length)?,
        ))
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.length)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StockSheet {
    width: f64,
    length: f64,
    thickness: f64,
    density: f64,
}

impl StockSheet {
    /// A steel sheet. Every dimension must be positive.
    pub fn new(width: f64, length: f64, thickness: f64) -> Result<Self> {
        Ok(Self {
            width: positive("sheet width", width)?,
            length: positive("sheet length", length)?,
            thickness: positive("sheet thickness", thickness)?,
            density: STEEL_DENSITY_KG_MM3,
        })
    }

    pub fn with_density(mut self, density: f64) -> Result<Self> {
        self.density = positive("material density", density)?;
        Ok(self)
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn thickness(&self) -> f64 {
        self.thickness
    }

    pub fn density(&self) -> f64 {
        self.density
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.length)
    }

    pub fn area(&self) -> f64 {
        self.width * self.length
    }
}

impl std::fmt::Display for StockSheet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.length, self.thickness)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum BlankShape {
    Rectangular { width: f64, length: f64 },
    Circular { diameter: f64 },
}

impl BlankShape {
    pub fn area(&self) -> f64 {
        match *self {
            BlankShape::Rectangular { width, length } => width * length,
            BlankShape::Circular { diameter } => {
                let r = diameter / 2.0;
                std::f64::consts::PI * r * r
            }
        }
    }

    /// The square or rectangle the blank occupies on a grid.
    pub fn footprint(&self) -> Size {
        match *self {
            BlankShape::Rectangular { width, length } => Size::new(width, length),
            BlankShape::Circular { diameter } => Size::new(diameter, diameter),
        }
    }
}

impl std::fmt::Display for BlankShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlankShape::Rectangular { width, length } => write!(f, "{}x{}", width, length),
            BlankShape::Circular { diameter } => write!(f, "Ø{}", diameter),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BlankSpec {
    shape: BlankShape,
    thickness: f64,
    quantity_per_unit: u32,
}

impl BlankSpec {
    pub fn rectangular(width: f64, length: f64, thickness: f64) -> Result<Self> {
        Ok(Self {
            shape: BlankShape::Rectangular {
                width: positive("blank width", width)?,
                length: positive("blank length", length)?,
            },
            thickness: positive("blank thickness", thickness)?,
            quantity_per_unit: 1,
        })
    }

    pub fn circular(diameter: f64, thickness: f64) -> Result<Self> {
        Ok(Self {
            shape: BlankShape::Circular {
                diameter: positive("blank diameter", diameter)?,
            },
            thickness: positive("blank thickness", thickness)?,
            quantity_per_unit: 1,
        })
    }

    /// Blanks consumed by one finished unit; must be at least 1.
    pub fn with_quantity_per_unit(mut self, quantity_per_unit: u32) -> Result<Self> {
        if quantity_per_unit == 0 {
            return Err(EngineError::InvalidDimension {
                field: "quantity per unit",
                value: 0.0,
            });
        }
        self.quantity_per_unit = quantity_per_unit;
        Ok(self)
    }

    pub fn shape(&self) -> BlankShape {
        self.shape
    }

    pub fn thickness(&self) -> f64 {
        self.thickness
    }

    pub fn quantity_per_unit(&self) -> u32 {
        self.quantity_per_unit
    }

    pub fn area(&self) -> f64 {
        self.shape.area()
    }

    pub fn weight_kg(&self, density: f64) -> Result<f64> {
        finite("blank weight", self.area() * self.thickness * density)
    }

    /// Fails unless the blank is cut from the sheet's gauge.
    pub fn check_thickness(&self, sheet: &StockSheet) -> Result<()> {
        if (self.thickness - sheet.thickness()).abs() > THICKNESS_TOLERANCE_MM {
            return Err(EngineError::ThicknessMismatch {
                blank: self.thickness,
                sheet: sheet.thickness(),
            });
        }
        Ok(())
    }
}

/// Grid of identical cells placed on the sheet. Only the renderer reads these.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub origin_x: f64,
    pub origin_y: f64,
    pub cols: u32,
    pub rows: u32,
    pub cell_width: f64,
    pub cell_height: f64,
    pub col_pitch: f64,
    pub row_pitch: f64,
    pub rotated: bool,
}

impl Placement {
    /// Back-to-back cells with no gaps.
    pub fn grid(origin_x: f64, origin_y: f64, cols: u32, rows: u32, cell: Size, rotated: bool) -> Self {
        Self {
            origin_x,
            origin_y,
            cols,
            rows,
            cell_width: cell.width,
            cell_height: cell.length,
            col_pitch: cell.width,
            row_pitch: cell.length,
            rotated,
        }
    }

    pub fn count(&self) -> u64 {
        self.cols as u64 * self.rows as u64
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Top-left corner of every cell.
    pub fn cells(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        (0..self.rows).flat_map(move |r| {
            (0..self.cols).map(move |c| {
                (
                    self.origin_x + c as f64 * self.col_pitch,
                    self.origin_y + r as f64 * self.row_pitch,
                )
            })
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMethod {
    Horizontal,
    Vertical,
    SmartMixed,
    SquareGrid,
    Hexagonal,
    SmartCircular,
}

impl LayoutMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutMethod::Horizontal => "horizontal",
            LayoutMethod::Vertical => "vertical",
            LayoutMethod::SmartMixed => "smart_mixed",
            LayoutMethod::SquareGrid => "square_grid",
            LayoutMethod::Hexagonal => "hexagonal",
            LayoutMethod::SmartCircular => "smart_circular",
        }
    }

    pub fn is_circular(&self) -> bool {
        matches!(
            self,
            LayoutMethod::SquareGrid | LayoutMethod::Hexagonal | LayoutMethod::SmartCircular
        )
    }
}

impl std::fmt::Display for LayoutMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    pub fn flipped(self) -> Self {
        match self {
            Orientation::Horizontal => Orientation::Vertical,
            Orientation::Vertical => Orientation::Horizontal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeftoverKind {
    /// Beside the primary grid, running along the sheet length.
    WidthStrip,
    /// Below the primary grid, running across the sheet width.
    LengthStrip,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LeftoverDetail {
    #[serde(rename = "type")]
    pub kind: LeftoverKind,
    pub width: f64,
    pub length: f64,
    pub orientation: Orientation,
    pub extra_pieces: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FitStatus {
    Fits,
    BlankExceedsSheet,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub method: LayoutMethod,
    pub total_pieces: u64,
    pub primary_pieces: u64,
    pub extra_pieces_from_leftover: u64,
    pub efficiency_pct: f64,
    pub leftover_area: f64,
    pub leftover_width: f64,
    pub leftover_length: f64,
    pub leftover_details: Vec<LeftoverDetail>,
    /// Concrete strategy behind a smart layout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_method: Option<LayoutMethod>,
    #[serde(skip)]
    pub placements: Vec<Placement>,
}

impl Layout {
    /// Derives efficiency and leftover area from the piece counts.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn build(
        method: LayoutMethod,
        sheet: &StockSheet,
        piece_area: f64,
        primary_pieces: u64,
        extra_pieces: u64,
        leftover: Size,
        leftover_details: Vec<LeftoverDetail>,
        placements: Vec<Placement>,
    ) -> Result<Self> {
        let total_pieces = add_pieces(primary_pieces, extra_pieces)?;
        let sheet_area = sheet.area();
        let used = total_pieces as f64 * piece_area;
        let efficiency_pct = finite("efficiency", used / sheet_area * 100.0)?.clamp(0.0, 100.0);
        Ok(Self {
            method,
            total_pieces,
            primary_pieces,
            extra_pieces_from_leftover: extra_pieces,
            efficiency_pct,
            leftover_area: finite("leftover area", (sheet_area - used).max(0.0))?,
            leftover_width: leftover.width.max(0.0),
            leftover_length: leftover.length.max(0.0),
            leftover_details,
            selected_method: None,
            placements,
        })
    }

    pub fn fit_status(&self) -> FitStatus {
        if self.total_pieces == 0 {
            FitStatus::BlankExceedsSheet
        } else {
            FitStatus::Fits
        }
    }

    pub fn scrap_pct(&self) -> f64 {
        100.0 - self.efficiency_pct
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConsumptionResult {
    pub blank_weight_kg: f64,
    pub sheet_weight_kg: f64,
    pub pieces_per_sheet: u64,
    pub total_blanks_needed: u64,
    pub sheets_required: u64,
    pub total_blanks_weight_kg: f64,
    pub total_production_weight_kg: f64,
    pub scrap_pct: f64,
    pub scrap_weight_kg: f64,
    /// Share of the purchased sheet weight that ends up in blanks.
    pub consumption_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub sheet_width: f64,
    pub sheet_length: f64,
    pub direction: LayoutMethod,
    pub primary_pieces: u64,
    pub extra_pieces: u64,
    pub total_pieces: u64,
    pub efficiency_pct: f64,
    pub is_best: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_count() {
        assert_eq!(fit_count(1220.0, 170.0), Ok(7));
        assert_eq!(fit_count(2440.0, 760.0), Ok(3));
        assert_eq!(fit_count(100.0, 200.0), Ok(0));
        assert_eq!(fit_count(1220.0, 1220.0 / 3.0), Ok(3));
        assert_eq!(fit_count(-5.0, 10.0), Ok(0));
    }

    #[test]
    fn test_fit_count_rejects_counts_past_u32() {
        assert_eq!(fit_count(4e9, 1.0), Ok(4_000_000_000));
        assert!(matches!(
            fit_count(1e10, 1.0),
            Err(EngineError::NonFiniteResult { .. })
        ));
        assert!(matches!(
            add_pieces(u64::MAX, 1),
            Err(EngineError::NonFiniteResult { .. })
        ));
        assert_eq!(add_pieces(20, 1), Ok(21));
    }

    #[test]
    fn test_blank_weight() {
        let blank = BlankSpec::rectangular(170.0, 760.0, 3.0).unwrap();
        let w = blank.weight_kg(STEEL_DENSITY_KG_MM3).unwrap();
        assert!((w - 170.0 * 760.0 * 3.0 * 7.85e-6).abs() < 1e-12);
        let huge = BlankSpec::rectangular(1e200, 1e200, 1.0).unwrap();
        assert!(matches!(
            huge.weight_kg(STEEL_DENSITY_KG_MM3),
            Err(EngineError::NonFiniteResult { .. })
        ));
    }

    #[test]
    fn test_size_rotation() {
        let s = Size::new(170.0, 760.0);
        assert_eq!(s.rotated(), Size::new(760.0, 170.0));
        assert!(s.fits_in(&Size::new(1220.0, 2440.0)));
        assert!(!Size::new(2000.0, 2000.0).fits_in(&Size::new(1220.0, 2440.0)));
        assert_eq!(s.to_string(), "170x760");
    }

    #[test]
    fn test_sheet_validation() {
        assert!(StockSheet::new(1220.0, 2440.0, 3.0).is_ok());
        assert!(matches!(
            StockSheet::new(0.0, 2440.0, 3.0),
            Err(EngineError::InvalidDimension {
                field: "sheet width",
                ..
            })
        ));
        assert!(StockSheet::new(1220.0, f64::NAN, 3.0).is_err());
        assert!(StockSheet::new(1220.0, 2440.0, -1.0).is_err());
        let sheet = StockSheet::new(1220.0, 2440.0, 3.0).unwrap();
        assert_eq!(sheet.density(), STEEL_DENSITY_KG_MM3);
        assert!(sheet.with_density(0.0).is_err());
    }

    #[test]
    fn test_blank_validation() {
        assert!(BlankSpec::rectangular(170.0, 760.0, 3.0).is_ok());
        assert!(BlankSpec::rectangular(170.0, 0.0, 3.0).is_err());
        assert!(BlankSpec::circular(-200.0, 3.0).is_err());
        let blank = BlankSpec::circular(200.0, 3.0).unwrap();
        assert!(blank.with_quantity_per_unit(0).is_err());
        assert_eq!(blank.with_quantity_per_unit(4).unwrap().quantity_per_unit(), 4);
    }

    #[test]
    fn test_thickness_check() {
        let sheet = StockSheet::new(1220.0, 2440.0, 3.0).unwrap();
        let blank = BlankSpec::rectangular(100.0, 100.0, 3.0).unwrap();
        assert!(blank.check_thickness(&sheet).is_ok());
        let thick = BlankSpec::rectangular(100.0, 100.0, 5.0).unwrap();
        assert_eq!(
            thick.check_thickness(&sheet),
            Err(EngineError::ThicknessMismatch {
                blank: 5.0,
                sheet: 3.0
            })
        );
    }

    #[test]
    fn test_circle_area() {
        let blank = BlankSpec::circular(200.0, 2.0).unwrap();
        assert!((blank.area() - std::f64::consts::PI * 10_000.0).abs() < 1e-6);
        assert_eq!(blank.shape().footprint(), Size::new(200.0, 200.0));
    }

    #[test]
    fn test_placement_cells() {
        let p = Placement::grid(10.0, 0.0, 2, 3, Size::new(5.0, 7.0), false);
        let cells: Vec<_> = p.cells().collect();
        assert_eq!(cells.len(), 6);
        assert_eq!(cells[1], (15.0, 0.0));
        assert_eq!(cells[5], (15.0, 14.0));
        assert_eq!(p.count(), 6);
    }

    #[test]
    fn test_method_names() {
        assert_eq!(LayoutMethod::SmartMixed.to_string(), "smart_mixed");
        assert!(LayoutMethod::Hexagonal.is_circular());
        assert!(!LayoutMethod::Vertical.is_circular());
        assert_eq!(
            serde_json::to_string(&LayoutMethod::SquareGrid).unwrap(),
            "\"square_grid\""
        );
    }
}
