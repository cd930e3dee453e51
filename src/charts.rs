use std::path::Path;

use plotters::element::Pie;
use plotters::prelude::*;
use plotters::style::FontTransform;
use tracing::{debug, warn};

use crate::aggregate;
use crate::error::{Result, ToolError};
use crate::model::{AggregateTable, CellValue, EnrichedRecord};

/// File name of the degree distribution pie chart.
pub const PIE_CHART_FILE: &str = "pie_degree_distribution.png";
/// File name of the mean total score bar chart.
pub const BAR_CHART_FILE: &str = "bar_avg_total_by_course.png";
/// File name of the funding distribution horizontal bar chart.
pub const HBAR_CHART_FILE: &str = "hbar_students_by_funding.png";
/// File name of the mean midterm line chart.
pub const LINE_CHART_FILE: &str = "line_avg_midterm_by_course.png";
/// File name of the total score histogram.
pub const HIST_CHART_FILE: &str = "hist_total_scores.png";
/// File name of the attendance/total scatter plot.
pub const SCATTER_CHART_FILE: &str = "scatter_attendance_vs_total.png";

const HISTOGRAM_BINS: usize = 15;

const SKY_BLUE: RGBColor = RGBColor(135, 206, 235);
const LIGHT_GREEN: RGBColor = RGBColor(144, 238, 144);
const ORANGE: RGBColor = RGBColor(255, 165, 0);
const PURPLE: RGBColor = RGBColor(128, 0, 128);
const SOFT_RED: RGBColor = RGBColor(220, 60, 60);

/// Pastel cycle for pie slices.
const PIE_PALETTE: [RGBColor; 6] = [
    RGBColor(251, 180, 174),
    RGBColor(179, 205, 227),
    RGBColor(204, 235, 197),
    RGBColor(222, 203, 228),
    RGBColor(254, 217, 166),
    RGBColor(255, 255, 204),
];

/// Renders the six static charts into the chart directory. Every chart is an
/// independent PNG artifact; none requires a display. The aggregate-backed
/// charts recompute their view from the records, so chart rendering does not
/// depend on the spreadsheet export having run.
pub fn render_charts(chart_dir: &Path, records: &[EnrichedRecord]) -> Result<()> {
    render_degree_pie(&chart_dir.join(PIE_CHART_FILE), &aggregate::students_by_degree(records))?;
    render_total_bars(&chart_dir.join(BAR_CHART_FILE), &aggregate::avg_total_by_course(records))?;
    render_funding_bars(
        &chart_dir.join(HBAR_CHART_FILE),
        &aggregate::students_by_funding(records),
    )?;
    render_midterm_line(
        &chart_dir.join(LINE_CHART_FILE),
        &aggregate::avg_midterm_by_course(records),
    )?;
    render_total_histogram(&chart_dir.join(HIST_CHART_FILE), records)?;
    render_attendance_scatter(&chart_dir.join(SCATTER_CHART_FILE), records)?;
    debug!(dir = %chart_dir.display(), "static charts rendered");
    Ok(())
}

fn chart_err(err: impl std::fmt::Display) -> ToolError {
    ToolError::Chart(err.to_string())
}

/// Extracts (label, value) pairs from a two-column aggregate view, skipping
/// rows whose metric is missing.
fn label_value_pairs(view: &AggregateTable) -> (Vec<String>, Vec<f64>) {
    let mut labels = Vec::with_capacity(view.rows.len());
    let mut values = Vec::with_capacity(view.rows.len());
    for row in &view.rows {
        let (Some(CellValue::Text(label)), Some(CellValue::Number(value))) =
            (row.first(), row.get(1))
        else {
            continue;
        };
        labels.push(label.clone());
        values.push(*value);
    }
    (labels, values)
}

fn render_degree_pie(path: &Path, view: &AggregateTable) -> Result<()> {
    let (labels, sizes) = label_value_pairs(view);

    let root = BitMapBackend::new(path, (640, 640)).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;
    let root = root
        .titled("Degree distribution", ("sans-serif", 28))
        .map_err(chart_err)?;

    if labels.is_empty() {
        warn!(chart = PIE_CHART_FILE, "no data to plot");
        return root.present().map_err(chart_err);
    }

    let colors: Vec<RGBColor> = (0..labels.len())
        .map(|index| PIE_PALETTE[index % PIE_PALETTE.len()])
        .collect();
    let center = (320, 320);
    let radius = 220.0;
    let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
    pie.start_angle(90.0);
    pie.label_style(("sans-serif", 18).into_font());
    pie.percentages(("sans-serif", 16).into_font().color(&BLACK));
    root.draw(&pie).map_err(chart_err)?;

    root.present().map_err(chart_err)
}

fn render_total_bars(path: &Path, view: &AggregateTable) -> Result<()> {
    let (labels, values) = label_value_pairs(view);

    let root = BitMapBackend::new(path, (1000, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    if labels.is_empty() {
        warn!(chart = BAR_CHART_FILE, "no data to plot");
        return root.present().map_err(chart_err);
    }

    let y_max = values.iter().cloned().fold(f64::MIN, f64::max).max(1.0) * 1.1;
    let mut chart = ChartBuilder::on(&root)
        .caption("Average total score, top 10 courses", ("sans-serif", 28))
        .margin(10)
        .x_label_area_size(120)
        .y_label_area_size(60)
        .build_cartesian_2d((0..labels.len()).into_segmented(), 0f64..y_max)
        .map_err(chart_err)?;

    let label_text = labels.clone();
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(labels.len())
        .x_label_formatter(&|segment| segment_label(segment, &label_text))
        .x_label_style(("sans-serif", 14).into_font().transform(FontTransform::Rotate90))
        .y_desc("Average total")
        .draw()
        .map_err(chart_err)?;

    chart
        .draw_series(values.iter().enumerate().map(|(index, value)| {
            Rectangle::new(
                [
                    (SegmentValue::Exact(index), 0.0),
                    (SegmentValue::Exact(index + 1), *value),
                ],
                SKY_BLUE.filled(),
            )
        }))
        .map_err(chart_err)?;

    root.present().map_err(chart_err)
}

fn render_funding_bars(path: &Path, view: &AggregateTable) -> Result<()> {
    let (labels, values) = label_value_pairs(view);

    let root = BitMapBackend::new(path, (800, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    if labels.is_empty() {
        warn!(chart = HBAR_CHART_FILE, "no data to plot");
        return root.present().map_err(chart_err);
    }

    let x_max = values.iter().cloned().fold(f64::MIN, f64::max).max(1.0) * 1.1;
    let mut chart = ChartBuilder::on(&root)
        .caption("Students by funding source", ("sans-serif", 28))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(140)
        .build_cartesian_2d(0f64..x_max, (0..labels.len()).into_segmented())
        .map_err(chart_err)?;

    let label_text = labels.clone();
    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(labels.len())
        .y_label_formatter(&|segment| segment_label(segment, &label_text))
        .x_desc("Students")
        .draw()
        .map_err(chart_err)?;

    chart
        .draw_series(values.iter().enumerate().map(|(index, value)| {
            Rectangle::new(
                [
                    (0.0, SegmentValue::Exact(index)),
                    (*value, SegmentValue::Exact(index + 1)),
                ],
                LIGHT_GREEN.filled(),
            )
        }))
        .map_err(chart_err)?;

    root.present().map_err(chart_err)
}

fn render_midterm_line(path: &Path, view: &AggregateTable) -> Result<()> {
    let (labels, values) = label_value_pairs(view);

    let root = BitMapBackend::new(path, (1000, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    if labels.is_empty() {
        warn!(chart = LINE_CHART_FILE, "no data to plot");
        return root.present().map_err(chart_err);
    }

    let y_max = values.iter().cloned().fold(f64::MIN, f64::max).max(1.0) * 1.1;
    let mut chart = ChartBuilder::on(&root)
        .caption("Average midterm, top 5 courses", ("sans-serif", 28))
        .margin(10)
        .x_label_area_size(120)
        .y_label_area_size(60)
        .build_cartesian_2d((0..labels.len()).into_segmented(), 0f64..y_max)
        .map_err(chart_err)?;

    let label_text = labels.clone();
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(labels.len())
        .x_label_formatter(&|segment| segment_label(segment, &label_text))
        .x_label_style(("sans-serif", 14).into_font().transform(FontTransform::Rotate90))
        .y_desc("Average midterm")
        .draw()
        .map_err(chart_err)?;

    chart
        .draw_series(LineSeries::new(
            values
                .iter()
                .enumerate()
                .map(|(index, value)| (SegmentValue::CenterOf(index), *value)),
            ORANGE.stroke_width(2),
        ))
        .map_err(chart_err)?;
    chart
        .draw_series(values.iter().enumerate().map(|(index, value)| {
            Circle::new((SegmentValue::CenterOf(index), *value), 4, ORANGE.filled())
        }))
        .map_err(chart_err)?;

    root.present().map_err(chart_err)
}

fn render_total_histogram(path: &Path, records: &[EnrichedRecord]) -> Result<()> {
    let totals: Vec<f64> = records.iter().filter_map(|record| record.total).collect();

    let root = BitMapBackend::new(path, (800, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    if totals.is_empty() {
        warn!(chart = HIST_CHART_FILE, "no data to plot");
        return root.present().map_err(chart_err);
    }

    let min = totals.iter().cloned().fold(f64::MAX, f64::min);
    let max = totals.iter().cloned().fold(f64::MIN, f64::max);
    // Degenerate distributions still get one full-width bin.
    let span = if max > min { max - min } else { 1.0 };
    let bin_width = span / HISTOGRAM_BINS as f64;

    let mut counts = [0u32; HISTOGRAM_BINS];
    for total in &totals {
        let index = (((total - min) / bin_width) as usize).min(HISTOGRAM_BINS - 1);
        counts[index] += 1;
    }
    let count_max = counts.iter().copied().max().unwrap_or(0) + 1;

    let mut chart = ChartBuilder::on(&root)
        .caption("Total score distribution", ("sans-serif", 28))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(min..min + span, 0u32..count_max)
        .map_err(chart_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Total score")
        .y_desc("Students")
        .draw()
        .map_err(chart_err)?;

    chart
        .draw_series(counts.iter().enumerate().map(|(index, count)| {
            let x0 = min + index as f64 * bin_width;
            let x1 = x0 + bin_width;
            Rectangle::new([(x0, 0), (x1, *count)], PURPLE.mix(0.8).filled())
        }))
        .map_err(chart_err)?;

    root.present().map_err(chart_err)
}

fn render_attendance_scatter(path: &Path, records: &[EnrichedRecord]) -> Result<()> {
    let points: Vec<(f64, f64)> = records
        .iter()
        .filter_map(|record| match (record.attendance, record.total) {
            (Some(attendance), Some(total)) => Some((attendance, total)),
            _ => None,
        })
        .collect();

    let root = BitMapBackend::new(path, (800, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    if points.is_empty() {
        warn!(chart = SCATTER_CHART_FILE, "no data to plot");
        return root.present().map_err(chart_err);
    }

    let x_max = points.iter().map(|point| point.0).fold(100.0, f64::max) * 1.05;
    let y_max = points.iter().map(|point| point.1).fold(f64::MIN, f64::max).max(1.0) * 1.1;
    let mut chart = ChartBuilder::on(&root)
        .caption("Attendance vs total score", ("sans-serif", 28))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..x_max, 0f64..y_max)
        .map_err(chart_err)?;

    chart
        .configure_mesh()
        .x_desc("Attendance (%)")
        .y_desc("Total score")
        .draw()
        .map_err(chart_err)?;

    chart
        .draw_series(
            points
                .iter()
                .map(|(x, y)| Circle::new((*x, *y), 4, SOFT_RED.mix(0.6).filled())),
        )
        .map_err(chart_err)?;

    root.present().map_err(chart_err)
}

fn segment_label(segment: &SegmentValue<usize>, labels: &[String]) -> String {
    let index = match segment {
        SegmentValue::Exact(index) | SegmentValue::CenterOf(index) => *index,
        SegmentValue::Last => return String::new(),
    };
    labels.get(index).cloned().unwrap_or_default()
}
