use tracing::debug;

use crate::error::{EngineError, Result, finite};
use crate::types::{BlankSpec, ConsumptionResult, Layout, StockSheet};

/// Production-level material figures for cutting `units_required` finished
/// units from sheets laid out as `layout`.
///
/// Fails with [`EngineError::DivisionByZero`] when the layout holds no pieces.
pub fn calculate(
    layout: &Layout,
    blank: &BlankSpec,
    sheet: &StockSheet,
    units_required: u64,
) -> Result<ConsumptionResult> {
    if layout.total_pieces == 0 {
        return Err(EngineError::DivisionByZero);
    }

    let density = sheet.density();
    let blank_weight_kg = blank.weight_kg(density)?;
    let sheet_weight_kg = finite("sheet weight", sheet.area() * sheet.thickness() * density)?;

    let total_blanks_needed = units_required.saturating_mul(blank.quantity_per_unit() as u64);
    let sheets_required = total_blanks_needed.div_ceil(layout.total_pieces);

    let total_blanks_weight_kg =
        finite("total blank weight", total_blanks_needed as f64 * blank_weight_kg)?;
    let total_production_weight_kg =
        finite("total production weight", sheets_required as f64 * sheet_weight_kg)?;
    let consumption_pct = if total_production_weight_kg > 0.0 {
        finite(
            "consumption",
            total_blanks_weight_kg / total_production_weight_kg * 100.0,
        )?
    } else {
        0.0
    };

    let result = ConsumptionResult {
        blank_weight_kg,
        sheet_weight_kg,
        pieces_per_sheet: layout.total_pieces,
        total_blanks_needed,
        sheets_required,
        total_blanks_weight_kg,
        total_production_weight_kg,
        scrap_pct: layout.scrap_pct(),
        scrap_weight_kg: (total_production_weight_kg - total_blanks_weight_kg).max(0.0),
        consumption_pct,
    };
    debug!(
        units_required,
        blanks = total_blanks_needed,
        sheets = sheets_required,
        "consumption"
    );
    Ok(result)
}
