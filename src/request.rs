//! Request and response shapes shared by the CLI and the HTTP server.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::{DEFAULT_SHEET, SheetCatalog};
use crate::circular::CircularPacker;
use crate::consumption;
use crate::error::Result;
use crate::rectangular::RectangularPacker;
use crate::selector::{compare_sizes, select_best};
use crate::types::{
    BlankSpec, ComparisonRow, ConsumptionResult, FitStatus, Layout, LayoutMethod, LeftoverDetail,
    Size, StockSheet,
};

fn default_sheet_width() -> f64 {
    DEFAULT_SHEET.width
}

fn default_sheet_length() -> f64 {
    DEFAULT_SHEET.length
}

fn default_one() -> u32 {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RectangularMethod {
    Horizontal,
    Vertical,
    #[default]
    Smart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircularMethod {
    SquareGrid,
    Hexagonal,
    #[default]
    Smart,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectangularRequest {
    #[serde(default = "default_sheet_width")]
    pub sheet_width_mm: f64,
    #[serde(default = "default_sheet_length")]
    pub sheet_length_mm: f64,
    /// Defaults to the blank thickness.
    #[serde(default)]
    pub sheet_thickness_mm: Option<f64>,
    pub width_mm: f64,
    pub length_mm: f64,
    pub thickness_mm: f64,
    /// Finished units to produce; consumption figures are skipped without it.
    #[serde(default)]
    pub quantity: Option<u64>,
    #[serde(default = "default_one")]
    pub quantity_per_unit: u32,
    #[serde(default)]
    pub density_kg_mm3: Option<f64>,
    #[serde(default)]
    pub method: RectangularMethod,
    #[serde(default)]
    pub compare_all_sizes: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircularRequest {
    #[serde(default = "default_sheet_width")]
    pub sheet_width_mm: f64,
    #[serde(default = "default_sheet_length")]
    pub sheet_length_mm: f64,
    #[serde(default)]
    pub sheet_thickness_mm: Option<f64>,
    pub diameter_mm: f64,
    pub thickness_mm: f64,
    #[serde(default)]
    pub quantity: Option<u64>,
    #[serde(default = "default_one")]
    pub quantity_per_unit: u32,
    #[serde(default)]
    pub density_kg_mm3: Option<f64>,
    #[serde(default)]
    pub method: CircularMethod,
    #[serde(default)]
    pub compare_all_sizes: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RectangularResponse {
    pub pcs_per_sheet: u64,
    pub sheet_util_pct: f64,
    pub consumption_pct: f64,
    pub scrap_pct: f64,
    pub method: LayoutMethod,
    pub best_direction: LayoutMethod,
    pub total_blanks_per_sheet: u64,
    pub primary_blanks_per_sheet: u64,
    pub extra_blanks_from_leftover: u64,
    pub leftover_area: f64,
    pub leftover_width: f64,
    pub leftover_length: f64,
    pub leftover_details: Vec<LeftoverDetail>,
    pub fit: FitStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheets_needed: Option<u64>,
    pub weight_of_blank: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_blank_weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_sheet_comparisons: Option<Vec<ComparisonRow>>,
    #[serde(skip)]
    pub layout: Layout,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircularResponse {
    pub total_circles_per_sheet: u64,
    pub efficiency_percentage: f64,
    pub scrap_pct: f64,
    pub method: LayoutMethod,
    pub circle_weight_kg: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_circle_weight_kg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheets_needed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_weight: Option<f64>,
    pub consumption_pct: f64,
    pub leftover_area: f64,
    pub fit: FitStatus,
    /// Only answered for `smart` requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_method: Option<LayoutMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_sheet_comparisons: Option<Vec<ComparisonRow>>,
    #[serde(skip)]
    pub layout: Layout,
}

fn build_sheet(
    width: f64,
    length: f64,
    thickness: Option<f64>,
    blank_thickness: f64,
    density: Option<f64>,
) -> Result<StockSheet> {
    let sheet = StockSheet::new(width, length, thickness.unwrap_or(blank_thickness))?;
    match density {
        Some(d) => sheet.with_density(d),
        None => Ok(sheet),
    }
}

fn consumption_for(
    layout: &Layout,
    blank: &BlankSpec,
    sheet: &StockSheet,
    quantity: Option<u64>,
) -> Result<Option<ConsumptionResult>> {
    quantity
        .map(|units| consumption::calculate(layout, blank, sheet, units))
        .transpose()
}

/// Material consumption for the run, or the sheet utilisation when no
/// quantity was given.
fn consumption_pct(layout: &Layout, consumption: Option<&ConsumptionResult>) -> f64 {
    consumption.map_or(layout.efficiency_pct, |c| c.consumption_pct)
}

pub fn optimize_rectangular(
    req: &RectangularRequest,
    catalog: &SheetCatalog,
) -> Result<RectangularResponse> {
    let sheet = build_sheet(
        req.sheet_width_mm,
        req.sheet_length_mm,
        req.sheet_thickness_mm,
        req.thickness_mm,
        req.density_kg_mm3,
    )?;
    let blank = BlankSpec::rectangular(req.width_mm, req.length_mm, req.thickness_mm)?
        .with_quantity_per_unit(req.quantity_per_unit)?;
    blank.check_thickness(&sheet)?;

    // horizontal, vertical, smart mixed
    let mut layouts =
        RectangularPacker::new(sheet, Size::new(req.width_mm, req.length_mm)).layouts()?;
    let best_direction = select_best(&layouts).map_or(LayoutMethod::Horizontal, |l| l.method);
    let layout = layouts.swap_remove(match req.method {
        RectangularMethod::Horizontal => 0,
        RectangularMethod::Vertical => 1,
        RectangularMethod::Smart => 2,
    });

    let consumption = consumption_for(&layout, &blank, &sheet, req.quantity)?;
    let all_sheet_comparisons = if req.compare_all_sizes {
        Some(compare_sizes(catalog, &blank, &sheet)?)
    } else {
        None
    };

    info!(
        sheet = %sheet,
        blank = %blank.shape(),
        method = %layout.method,
        pieces = layout.total_pieces,
        efficiency = layout.efficiency_pct,
        "rectangular optimization"
    );

    Ok(RectangularResponse {
        pcs_per_sheet: layout.total_pieces,
        sheet_util_pct: layout.efficiency_pct,
        consumption_pct: consumption_pct(&layout, consumption.as_ref()),
        scrap_pct: layout.scrap_pct(),
        method: layout.method,
        best_direction,
        total_blanks_per_sheet: layout.total_pieces,
        primary_blanks_per_sheet: layout.primary_pieces,
        extra_blanks_from_leftover: layout.extra_pieces_from_leftover,
        leftover_area: layout.leftover_area,
        leftover_width: layout.leftover_width,
        leftover_length: layout.leftover_length,
        leftover_details: layout.leftover_details.clone(),
        fit: layout.fit_status(),
        sheets_needed: consumption.map(|c| c.sheets_required),
        weight_of_blank: blank.weight_kg(sheet.density())?,
        total_blank_weight: consumption.map(|c| c.total_blanks_weight_kg),
        total_weight: consumption.map(|c| c.total_production_weight_kg),
        all_sheet_comparisons,
        layout,
    })
}

pub fn optimize_circular(req: &CircularRequest, catalog: &SheetCatalog) -> Result<CircularResponse> {
    let sheet = build_sheet(
        req.sheet_width_mm,
        req.sheet_length_mm,
        req.sheet_thickness_mm,
        req.thickness_mm,
        req.density_kg_mm3,
    )?;
    let blank = BlankSpec::circular(req.diameter_mm, req.thickness_mm)?
        .with_quantity_per_unit(req.quantity_per_unit)?;
    blank.check_thickness(&sheet)?;

    let packer = CircularPacker::new(sheet, req.diameter_mm);
    let layout = match req.method {
        CircularMethod::SquareGrid => packer.square_grid()?,
        CircularMethod::Hexagonal => packer.hexagonal()?,
        CircularMethod::Smart => packer.smart()?,
    };

    let consumption = consumption_for(&layout, &blank, &sheet, req.quantity)?;
    let all_sheet_comparisons = if req.compare_all_sizes {
        Some(compare_sizes(catalog, &blank, &sheet)?)
    } else {
        None
    };

    info!(
        sheet = %sheet,
        blank = %blank.shape(),
        method = %layout.method,
        pieces = layout.total_pieces,
        efficiency = layout.efficiency_pct,
        "circular optimization"
    );

    Ok(CircularResponse {
        total_circles_per_sheet: layout.total_pieces,
        efficiency_percentage: layout.efficiency_pct,
        scrap_pct: layout.scrap_pct(),
        method: layout.method,
        circle_weight_kg: blank.weight_kg(sheet.density())?,
        total_circle_weight_kg: consumption.map(|c| c.total_blanks_weight_kg),
        sheets_needed: consumption.map(|c| c.sheets_required),
        total_weight: consumption.map(|c| c.total_production_weight_kg),
        consumption_pct: consumption_pct(&layout, consumption.as_ref()),
        leftover_area: layout.leftover_area,
        fit: layout.fit_status(),
        selected_method: layout.selected_method,
        all_sheet_comparisons,
        layout,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum BlankRequest {
    Rectangular(RectangularRequest),
    Circular(CircularRequest),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    pub id: String,
    #[serde(flatten)]
    pub blank: BlankRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub items: Vec<BatchItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum BlankResponse {
    Rectangular(RectangularResponse),
    Circular(CircularResponse),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchItemResult {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<BlankResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResponse {
    pub results: Vec<BatchItemResult>,
}

pub fn optimize_blank(req: &BlankRequest, catalog: &SheetCatalog) -> Result<BlankResponse> {
    match req {
        BlankRequest::Rectangular(r) => optimize_rectangular(r, catalog).map(BlankResponse::Rectangular),
        BlankRequest::Circular(c) => optimize_circular(c, catalog).map(BlankResponse::Circular),
    }
}

/// Optimizes every item independently on the rayon pool. A failing item is
/// reported in place and does not affect the others.
pub fn optimize_batch(req: &BatchRequest, catalog: &SheetCatalog) -> BatchResponse {
    let results = req
        .items
        .par_iter()
        .map(|item| match optimize_blank(&item.blank, catalog) {
            Ok(result) => BatchItemResult {
                id: item.id.clone(),
                result: Some(result),
                error: None,
            },
            Err(e) => BatchItemResult {
                id: item.id.clone(),
                result: None,
                error: Some(e.to_string()),
            },
        })
        .collect();
    BatchResponse { results }
}
