use async_trait::async_trait;
use log::{error, info, warn};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

use crate::config::Config;
use crate::google_auth::SheetsAuth;

#[derive(Error, Debug)]
pub enum SheetsError {
    #[error("credential error: {0}")]
    Credential(#[from] gcp_auth::Error),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Sheets API returned {status}: {body}")]
    Api { status: u16, body: String },
}

/// Read/write access to ranges of one spreadsheet, addressed by sheet name
/// plus A1-style cells.
#[async_trait]
pub trait SheetsApi: Send + Sync {
    async fn get_values(&self, sheet: &str, cells: &str) -> Result<Vec<Vec<String>>, SheetsError>;
    async fn set_values(
        &self,
        sheet: &str,
        cells: &str,
        values: Vec<Vec<String>>,
    ) -> Result<(), SheetsError>;
}

#[derive(Clone)]
pub struct GoogleSheetsClient {
    client: Client,
    auth: SheetsAuth,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    // Absent entirely when the range holds no values
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl GoogleSheetsClient {
    pub fn new(config: &Config, auth: SheetsAuth) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            auth,
            base_url: format!(
                "https://sheets.googleapis.com/v4/spreadsheets/{}",
                config.spreadsheet_id
            ),
        })
    }

    fn values_url(&self, sheet: &str, cells: &str) -> String {
        format!("{}/values/{}", self.base_url, encode_range(sheet, cells))
    }

    async fn fetch_values(&self, sheet: &str, cells: &str) -> Result<Vec<Vec<String>>, SheetsError> {
        let token = self.auth.bearer().await?;
        let url = self.values_url(sheet, cells);

        let response = self.client.get(&url).bearer_auth(&token).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error".to_string());
            error!("Failed to read {}!{}: {} - {}", sheet, cells, status, body);
            return Err(SheetsError::Api { status, body });
        }

        let data: ValueRange = response.json().await?;
        Ok(data
            .values
            .into_iter()
            .map(|row| row.iter().map(value_to_string).collect())
            .collect())
    }
}

#[async_trait]
impl SheetsApi for GoogleSheetsClient {
    async fn get_values(&self, sheet: &str, cells: &str) -> Result<Vec<Vec<String>>, SheetsError> {
        match self.fetch_values(sheet, cells).await {
            Ok(values) => Ok(values),
            Err(e) => {
                warn!("Read of {}!{} failed, retrying once: {}", sheet, cells, e);
                sleep(Duration::from_millis(500)).await;
                self.fetch_values(sheet, cells).await
            }
        }
    }

    // Writes are never retried: a duplicated write against the shared input
    // cells could re-trigger recalculation mid-read.
    async fn set_values(
        &self,
        sheet: &str,
        cells: &str,
        values: Vec<Vec<String>>,
    ) -> Result<(), SheetsError> {
        let token = self.auth.bearer().await?;
        let url = format!(
            "{}?valueInputOption=USER_ENTERED",
            self.values_url(sheet, cells)
        );
        let body = serde_json::json!({ "values": values });

        let response = self
            .client
            .put(&url)
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error".to_string());
            error!("Failed to update {}!{}: {} - {}", sheet, cells, status, body);
            return Err(SheetsError::Api { status, body });
        }

        info!("Updated {}!{}", sheet, cells);
        Ok(())
    }
}

/// Quote the sheet name and percent-encode the whole range for a URL path
/// segment. Sheet names here contain spaces, Cyrillic and emoji.
fn encode_range(sheet: &str, cells: &str) -> String {
    let range = format!("'{}'!{}", sheet.replace('\'', "''"), cells);
    urlencoding::encode(&range).into_owned()
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ranges_are_quoted_and_percent_encoded() {
        let encoded = encode_range("ТГ бот (не трогать)", "B1");
        assert!(!encoded.contains(' '));

        let decoded = urlencoding::decode(&encoded).unwrap();
        assert_eq!(decoded, "'ТГ бот (не трогать)'!B1");
    }

    #[test]
    fn sheet_name_quotes_are_escaped() {
        let encoded = encode_range("it's", "A1");
        let decoded = urlencoding::decode(&encoded).unwrap();
        assert_eq!(decoded, "'it''s'!A1");
    }

    #[test]
    fn numeric_cells_become_plain_strings() {
        assert_eq!(value_to_string(&json!("998901234567")), "998901234567");
        assert_eq!(value_to_string(&json!(42)), "42");
        assert_eq!(value_to_string(&json!(12.5)), "12.5");
        assert_eq!(value_to_string(&json!(true)), "true");
        assert_eq!(value_to_string(&json!(null)), "");
    }
}
