use log::{info, warn};
use std::sync::Arc;

use crate::config::Config;
use crate::error::ReportError;
use crate::phone::PhoneNormalizer;
use crate::sheets::SheetsApi;

/// One directory row that carried a usable phone number.
#[derive(Debug, Clone)]
pub struct PhoneCandidate {
    pub display_name: String,
    pub raw_value: String,
    pub normalized: String,
    /// 1-based row number on the directory sheet, for log messages
    pub source_row: u32,
}

/// Reads the client directory sheet and resolves phone numbers against it.
pub struct DirectoryRegistry {
    sheets: Arc<dyn SheetsApi>,
    normalizer: PhoneNormalizer,
    sheet: String,
    cells: String,
    start_row: u32,
    suffix_len: usize,
}

impl DirectoryRegistry {
    pub fn new(config: &Config, sheets: Arc<dyn SheetsApi>, normalizer: PhoneNormalizer) -> Self {
        Self {
            sheets,
            normalizer,
            sheet: config.directory_sheet.clone(),
            cells: config.directory_cells.clone(),
            start_row: config.directory_start_row,
            suffix_len: config.subscriber_len,
        }
    }

    /// Fetches the whole directory range and keeps every row whose phone
    /// column normalizes. Blank stretches in the middle of the sheet are
    /// common and must not cut the scan short.
    pub async fn load_all(&self) -> Result<Vec<PhoneCandidate>, ReportError> {
        let rows = self
            .sheets
            .get_values(&self.sheet, &self.cells)
            .await
            .map_err(ReportError::DirectoryUnreachable)?;

        let mut candidates = Vec::new();
        for (idx, row) in rows.iter().enumerate() {
            let name = row.first().map(|s| s.trim()).unwrap_or("");
            let raw_phone = row.get(1).map(|s| s.trim()).unwrap_or("");
            if raw_phone.is_empty() {
                continue;
            }

            let source_row = self.start_row + idx as u32;
            match self.normalizer.normalize(raw_phone) {
                Some(normalized) => candidates.push(PhoneCandidate {
                    display_name: name.to_string(),
                    raw_value: raw_phone.to_string(),
                    normalized,
                    source_row,
                }),
                None => warn!(
                    "Skipping directory row {}: unusable phone value {:?}",
                    source_row, raw_phone
                ),
            }
        }

        info!(
            "Loaded {} phone entries from directory sheet",
            candidates.len()
        );
        Ok(candidates)
    }

    /// Resolves a phone against loaded directory rows. Canonical equality
    /// wins; raw-string and trailing-digit matches cover rows entered in
    /// shapes the normalizer rejects. First hit in sheet order is returned.
    pub fn find_match<'a>(
        &self,
        raw: &str,
        canonical: &str,
        candidates: &'a [PhoneCandidate],
    ) -> Option<&'a PhoneCandidate> {
        if let Some(hit) = candidates.iter().find(|c| c.normalized == canonical) {
            return Some(hit);
        }

        if let Some(hit) = candidates.iter().find(|c| c.raw_value == raw.trim()) {
            warn!(
                "Phone matched directory row {} only by raw value",
                hit.source_row
            );
            return Some(hit);
        }

        let suffix = digit_suffix(canonical, self.suffix_len);
        if suffix.len() == self.suffix_len {
            if let Some(hit) = candidates
                .iter()
                .find(|c| digit_suffix(&c.raw_value, self.suffix_len) == suffix)
            {
                warn!(
                    "Phone matched directory row {} only by trailing digits",
                    hit.source_row
                );
                return Some(hit);
            }
        }

        None
    }
}

fn digit_suffix(value: &str, len: usize) -> String {
    let digits: Vec<char> = value.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < len {
        return digits.into_iter().collect();
    }
    digits[digits.len() - len..].iter().collect()
}
