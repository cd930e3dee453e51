use std::collections::HashSet;
use std::path::Path;

use rust_xlsxwriter::{Color, ConditionalFormat3ColorScale, Workbook, Worksheet};
use tracing::debug;

use crate::error::Result;
use crate::model::{AggregateTable, CellValue};

/// Gradient anchor colors: low, mid, high.
const SCALE_LOW: Color = Color::RGB(0xAA0000);
const SCALE_MID: Color = Color::RGB(0xFFFF00);
const SCALE_HIGH: Color = Color::RGB(0x00AA00);

/// Writes the aggregate views as one styled workbook: per sheet, the header
/// row is frozen, an autofilter spans the used range, and a three-color scale
/// (anchored at min, 50th percentile, and max) is applied to every data
/// column from the second column onward. Sheets with zero or one data row
/// export without error; the degenerate gradient still applies.
pub fn write_report(path: &Path, tables: &[AggregateTable]) -> Result<()> {
    let mut workbook = Workbook::new();
    let mut names = SheetNameRegistry::default();

    for table in tables {
        let sheet_name = names.assign(&table.sheet_name);
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet_name)?;
        write_table(worksheet, table)?;

        let last_row = table.rows.len() as u32;
        let last_col = (table.columns.len() as u16).saturating_sub(1);
        worksheet.set_freeze_panes(1, 1)?;
        worksheet.autofilter(0, 0, last_row, last_col)?;

        if !table.rows.is_empty() {
            let scale = ConditionalFormat3ColorScale::new()
                .set_minimum_color(SCALE_LOW)
                .set_midpoint_color(SCALE_MID)
                .set_maximum_color(SCALE_HIGH);
            for column in 1..table.columns.len() as u16 {
                worksheet.add_conditional_format(1, column, last_row, column, &scale)?;
            }
        }
    }

    workbook.save(path)?;
    debug!(path = %path.display(), sheets = tables.len(), "report workbook written");
    Ok(())
}

/// Writes the provided tables as plain worksheets of a single workbook, one
/// sheet per table, without styling. Used for the combined query export.
pub fn write_workbook(path: &Path, tables: &[AggregateTable]) -> Result<()> {
    let mut workbook = Workbook::new();
    let mut names = SheetNameRegistry::default();

    for table in tables {
        let sheet_name = names.assign(&table.sheet_name);
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet_name)?;
        write_table(worksheet, table)?;
    }

    workbook.save(path)?;
    debug!(path = %path.display(), sheets = tables.len(), "workbook written");
    Ok(())
}

fn write_table(worksheet: &mut Worksheet, table: &AggregateTable) -> Result<()> {
    for (col_idx, header) in table.columns.iter().enumerate() {
        worksheet.write_string(0, col_idx as u16, header)?;
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        for (col_idx, cell) in row.iter().enumerate() {
            let row_number = (row_idx + 1) as u32;
            let col_number = col_idx as u16;
            match cell {
                CellValue::Text(value) => {
                    worksheet.write_string(row_number, col_number, value)?;
                }
                CellValue::Number(value) => {
                    worksheet.write_number(row_number, col_number, *value)?;
                }
                CellValue::Missing => {}
            }
        }
    }

    Ok(())
}

/// Tracks worksheet names already claimed in a workbook, disambiguating
/// collisions produced by the 31-character truncation.
#[derive(Debug, Default)]
pub struct SheetNameRegistry {
    used: HashSet<String>,
}

impl SheetNameRegistry {
    /// Assigns a sanitized, unique worksheet name derived from `raw`.
    pub fn assign(&mut self, raw: &str) -> String {
        let base = sanitize_sheet_name(raw);
        if !self.used.contains(&base) {
            self.used.insert(base.clone());
            return base;
        }

        let mut counter = 1;
        loop {
            let suffix = format!("_{counter}");
            let max_len = 31 - suffix.len();
            let mut prefix = base.clone();
            if prefix.len() > max_len {
                prefix.truncate(max_len);
            }
            let candidate = format!("{prefix}{suffix}");
            if !self.used.contains(&candidate) {
                self.used.insert(candidate.clone());
                return candidate;
            }
            counter += 1;
        }
    }
}

/// Replaces characters Excel rejects in sheet names and enforces the
/// 31-character limit.
pub fn sanitize_sheet_name(raw: &str) -> String {
    let invalid = [':', '\\', '/', '?', '*', '[', ']', '\'', '"'];
    let mut sanitized: String = raw
        .chars()
        .map(|ch| {
            if invalid.contains(&ch) || ch.is_control() {
                '_'
            } else {
                ch
            }
        })
        .collect();

    sanitized = sanitized.trim().to_string();
    if sanitized.is_empty() {
        sanitized = "Sheet".to_string();
    }

    if sanitized.len() > 31 {
        sanitized.truncate(31);
    }

    sanitized
}
