use chrono::NaiveDate;
use log::info;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::Config;
use crate::date_utils;
use crate::error::ReportError;
use crate::sheets::SheetsApi;

/// Everything one recalculation produced for a phone and period.
#[derive(Debug, Clone)]
pub struct ReportData {
    pub phone: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    /// The output block exactly as read, header rows included
    pub raw_rows: Vec<Vec<String>>,
    /// Label/values pairs parsed from below the header block
    pub computed_fields: Vec<(String, Vec<String>)>,
}

impl ReportData {
    pub fn has_records(&self) -> bool {
        !self.computed_fields.is_empty()
    }
}

/// Drives the workbook's report tab: inputs go into fixed cells, formulas
/// recalculate remotely, and the output block is read back.
pub struct SheetReportEngine {
    sheets: Arc<dyn SheetsApi>,
    sheet: String,
    phone_cell: String,
    date_cells: String,
    output_cells: String,
    header_rows: usize,
    settle: Duration,
}

impl SheetReportEngine {
    pub fn new(config: &Config, sheets: Arc<dyn SheetsApi>) -> Self {
        Self {
            sheets,
            sheet: config.report_sheet.clone(),
            phone_cell: config.report_phone_cell.clone(),
            date_cells: config.report_date_cells.clone(),
            output_cells: config.report_output_cells.clone(),
            header_rows: config.report_header_rows,
            settle: Duration::from_secs(config.settle_secs),
        }
    }

    pub async fn compute(
        &self,
        phone: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<ReportData, ReportError> {
        self.sheets
            .set_values(&self.sheet, &self.phone_cell, vec![vec![phone.to_string()]])
            .await?;
        self.sheets
            .set_values(
                &self.sheet,
                &self.date_cells,
                vec![vec![
                    date_utils::format_sheet(from),
                    date_utils::format_sheet(to),
                ]],
            )
            .await?;

        // There is no completion signal from the workbook; the formulas are
        // given a fixed window to recalculate before the output is trusted.
        info!(
            "Waiting {}s for workbook formulas to settle",
            self.settle.as_secs()
        );
        sleep(self.settle).await;

        let raw_rows = self
            .sheets
            .get_values(&self.sheet, &self.output_cells)
            .await?;
        let computed_fields = parse_fields(&raw_rows, self.header_rows);

        info!(
            "Computed report for {}: {} data rows",
            phone,
            computed_fields.len()
        );

        Ok(ReportData {
            phone: phone.to_string(),
            from,
            to,
            raw_rows,
            computed_fields,
        })
    }

    /// Blanks the input cells so stale parameters never leak into the next
    /// run or into the workbook's other viewers.
    pub async fn cleanup(&self) -> Result<(), ReportError> {
        self.sheets
            .set_values(&self.sheet, &self.phone_cell, vec![vec![String::new()]])
            .await?;
        self.sheets
            .set_values(
                &self.sheet,
                &self.date_cells,
                vec![vec![String::new(), String::new()]],
            )
            .await?;
        info!("Cleared report input cells");
        Ok(())
    }
}

/// Rows above `header_rows` belong to the sheet's own title block. Below
/// it, the first column is a label and the rest are values; rows with no
/// values are decoration and are dropped.
fn parse_fields(rows: &[Vec<String>], header_rows: usize) -> Vec<(String, Vec<String>)> {
    let mut fields = Vec::new();
    for (idx, row) in rows.iter().enumerate().skip(header_rows) {
        let values: Vec<String> = row
            .iter()
            .skip(1)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(|v| v.to_string())
            .collect();
        if values.is_empty() {
            continue;
        }

        let label = row
            .first()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("Row {}", idx + 1));
        fields.push((label, values));
    }
    fields
}
