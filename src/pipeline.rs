use tracing::{info, instrument};

use crate::aggregate;
use crate::charts;
use crate::config::{AppConfig, ensure_dir};
use crate::error::Result;
use crate::interactive;
use crate::join;
use crate::loader;
use crate::report;

/// File name of the aggregate report workbook.
pub const REPORT_FILE: &str = "students_report_aggregated.xlsx";

/// Runs the file-based pipeline: load the four tables, join them, compute
/// the aggregate views, export the styled report, and render the chart
/// artifacts. Output directories are created up front, idempotently.
#[instrument(level = "info", skip_all, fields(input = %config.input_dir.display()))]
pub fn run_analysis(config: &AppConfig) -> Result<()> {
    ensure_dir(&config.chart_dir)?;
    ensure_dir(&config.export_dir)?;

    let dataset = loader::load_dataset(&config.input_dir)?;
    info!(
        students = dataset.students.len(),
        grades = dataset.grades.len(),
        enrollment = dataset.enrollment.len(),
        attendance = dataset.attendance.len(),
        "input tables loaded"
    );

    let records = join::enrich(&dataset);
    info!(rows = records.len(), "joined dataset built");

    let views = aggregate::build_views(&records);
    report::write_report(&config.export_dir.join(REPORT_FILE), &views)?;
    info!(sheets = views.len(), "aggregate report exported");

    charts::render_charts(&config.chart_dir, &records)?;
    interactive::render_interactive(
        &config.chart_dir.join(interactive::INTERACTIVE_CHART_FILE),
        &records,
    )?;

    Ok(())
}
