use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use sheet_optimizer::catalog::SheetCatalog;
use sheet_optimizer::render;
use sheet_optimizer::request::{
    BatchRequest, CircularMethod, CircularRequest, RectangularMethod, RectangularRequest,
    optimize_batch, optimize_circular, optimize_rectangular,
};
use sheet_optimizer::types::{ComparisonRow, StockSheet};

#[derive(Parser)]
#[command(
    name = "sheet_optimizer",
    about = "Blank-per-sheet yield and material consumption calculator"
)]
struct Cli {
    /// JSON file with the standard sheet sizes used by --compare
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rectangular blank
    Rect {
        /// Blank dimensions (WxL, e.g. 170x760)
        #[arg(long)]
        blank: String,

        /// horizontal, vertical or smart
        #[arg(long, default_value = "smart", value_parser = parse_rect_method)]
        method: RectangularMethod,

        #[command(flatten)]
        common: CommonArgs,
    },
    /// Circular blank
    Circle {
        /// Blank diameter in mm
        #[arg(long)]
        diameter: f64,

        /// square-grid, hexagonal or smart
        #[arg(long, default_value = "smart", value_parser = parse_circle_method)]
        method: CircularMethod,

        #[command(flatten)]
        common: CommonArgs,
    },
    /// Optimize every blank in a JSON batch file and print the results as JSON
    Batch {
        file: PathBuf,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Stock sheet dimensions (WxL)
    #[arg(long, default_value = "1220x2440")]
    sheet: String,

    /// Material thickness in mm
    #[arg(long)]
    thickness: f64,

    /// Material density in kg/mm³ (default: steel)
    #[arg(long)]
    density: Option<f64>,

    /// Finished units to produce
    #[arg(long)]
    quantity: Option<u64>,

    /// Blanks needed per finished unit
    #[arg(long, default_value_t = 1)]
    per_unit: u32,

    /// Compare every catalog sheet size
    #[arg(long)]
    compare: bool,

    /// Show ASCII layout of the sheet
    #[arg(long)]
    layout: bool,
}

fn parse_rect_method(s: &str) -> Result<RectangularMethod, String> {
    match s {
        "horizontal" => Ok(RectangularMethod::Horizontal),
        "vertical" => Ok(RectangularMethod::Vertical),
        "smart" => Ok(RectangularMethod::Smart),
        _ => Err(format!(
            "invalid method '{}', expected: horizontal, vertical, or smart",
            s
        )),
    }
}

fn parse_circle_method(s: &str) -> Result<CircularMethod, String> {
    match s {
        "square-grid" | "square_grid" => Ok(CircularMethod::SquareGrid),
        "hexagonal" => Ok(CircularMethod::Hexagonal),
        "smart" => Ok(CircularMethod::Smart),
        _ => Err(format!(
            "invalid method '{}', expected: square-grid, hexagonal, or smart",
            s
        )),
    }
}

fn parse_dimensions(s: &str) -> Result<(f64, f64), String> {
    let parts: Vec<&str> = s.split('x').collect();
    if parts.len() != 2 {
        return Err(format!("invalid dimensions '{}', expected WxL", s));
    }
    let width = parts[0]
        .parse::<f64>()
        .map_err(|_| format!("invalid width in '{}'", s))?;
    let length = parts[1]
        .parse::<f64>()
        .map_err(|_| format!("invalid length in '{}'", s))?;
    Ok((width, length))
}

fn fail(e: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", e);
    std::process::exit(1);
}

fn print_comparisons(rows: &[ComparisonRow]) {
    println!("Sheet size comparison:");
    for r in rows {
        println!(
            "  {}x{}: {} pcs ({} + {} leftover) {} {:.1}%{}",
            r.sheet_width,
            r.sheet_length,
            r.total_pieces,
            r.primary_pieces,
            r.extra_pieces,
            r.direction,
            r.efficiency_pct,
            if r.is_best { " [best]" } else { "" },
        );
    }
}

fn main() {
    let cli = Cli::parse();

    let catalog = match &cli.catalog {
        Some(path) => SheetCatalog::load(path).unwrap_or_else(|e| fail(e)),
        None => SheetCatalog::default(),
    };

    match cli.command {
        Command::Rect {
            blank,
            method,
            common,
        } => {
            let (sheet_width_mm, sheet_length_mm) =
                parse_dimensions(&common.sheet).unwrap_or_else(|e| fail(e));
            let (width_mm, length_mm) = parse_dimensions(&blank).unwrap_or_else(|e| fail(e));
            let req = RectangularRequest {
                sheet_width_mm,
                sheet_length_mm,
                sheet_thickness_mm: None,
                width_mm,
                length_mm,
                thickness_mm: common.thickness,
                quantity: common.quantity,
                quantity_per_unit: common.per_unit,
                density_kg_mm3: common.density,
                method,
                compare_all_sizes: common.compare,
            };
            let resp = optimize_rectangular(&req, &catalog).unwrap_or_else(|e| fail(e));

            println!(
                "{}: {} pcs/sheet ({} primary + {} from leftover), {:.1}% used, best: {}",
                resp.method,
                resp.pcs_per_sheet,
                resp.primary_blanks_per_sheet,
                resp.extra_blanks_from_leftover,
                resp.sheet_util_pct,
                resp.best_direction,
            );
            for d in &resp.leftover_details {
                println!(
                    "  leftover {:?} {}x{}: {} extra ({:?})",
                    d.kind, d.width, d.length, d.extra_pieces, d.orientation
                );
            }
            println!("Blank weight: {:.3} kg", resp.weight_of_blank);
            if let (Some(sheets), Some(total)) = (resp.sheets_needed, resp.total_weight) {
                println!(
                    "Summary: {} sheet{} needed, {:.1} kg total, {:.1}% scrap",
                    sheets,
                    if sheets == 1 { "" } else { "s" },
                    total,
                    resp.scrap_pct,
                );
            }
            if let Some(rows) = &resp.all_sheet_comparisons {
                print_comparisons(rows);
            }
            if common.layout {
                let sheet = StockSheet::new(sheet_width_mm, sheet_length_mm, common.thickness)
                    .unwrap_or_else(|e| fail(e));
                print!("{}", render::render_layout(&sheet, &resp.layout));
            }
        }
        Command::Circle {
            diameter,
            method,
            common,
        } => {
            let (sheet_width_mm, sheet_length_mm) =
                parse_dimensions(&common.sheet).unwrap_or_else(|e| fail(e));
            let req = CircularRequest {
                sheet_width_mm,
                sheet_length_mm,
                sheet_thickness_mm: None,
                diameter_mm: diameter,
                thickness_mm: common.thickness,
                quantity: common.quantity,
                quantity_per_unit: common.per_unit,
                density_kg_mm3: common.density,
                method,
                compare_all_sizes: common.compare,
            };
            let resp = optimize_circular(&req, &catalog).unwrap_or_else(|e| fail(e));

            let selected = resp
                .selected_method
                .map(|m| format!(" (selected: {})", m))
                .unwrap_or_default();
            println!(
                "{}{}: {} circles/sheet, {:.1}% used",
                resp.method, selected, resp.total_circles_per_sheet, resp.efficiency_percentage,
            );
            println!("Circle weight: {:.3} kg", resp.circle_weight_kg);
            if let (Some(sheets), Some(total)) = (resp.sheets_needed, resp.total_weight) {
                println!(
                    "Summary: {} sheet{} needed, {:.1} kg total, {:.1}% scrap",
                    sheets,
                    if sheets == 1 { "" } else { "s" },
                    total,
                    resp.scrap_pct,
                );
            }
            if let Some(rows) = &resp.all_sheet_comparisons {
                print_comparisons(rows);
            }
            if common.layout {
                let sheet = StockSheet::new(sheet_width_mm, sheet_length_mm, common.thickness)
                    .unwrap_or_else(|e| fail(e));
                print!("{}", render::render_layout(&sheet, &resp.layout));
            }
        }
        Command::Batch { file } => {
            let json = std::fs::read_to_string(&file)
                .unwrap_or_else(|e| fail(format!("{}: {}", file.display(), e)));
            let req: BatchRequest = serde_json::from_str(&json).unwrap_or_else(|e| fail(e));
            let resp = optimize_batch(&req, &catalog);
            println!(
                "{}",
                serde_json::to_string_pretty(&resp).unwrap_or_else(|e| fail(e))
            );
        }
    }
}
