use anyhow::Result;
use chrono_tz::Tz;
use std::env;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub spreadsheet_id: String,
    /// Inline service account JSON, preferred in hosted deployments
    pub service_account_json: Option<String>,
    /// Path to a service account key file, used in local development
    pub service_account_file: Option<String>,

    // Directory sheet layout: a name column next to a phone column
    pub directory_sheet: String,
    pub directory_cells: String,
    pub directory_start_row: u32,

    // Report sheet layout. These cell addresses are a contract with the
    // workbook's formulas and shift only together with the sheet itself.
    pub report_sheet: String,
    pub report_phone_cell: String,
    pub report_date_cells: String,
    pub report_output_cells: String,
    pub report_header_rows: usize,
    /// Blind wait after writing inputs, letting remote formulas recalculate
    pub settle_secs: u64,

    pub http_timeout_secs: u64,

    // Phone canonicalization
    pub country_code: String,
    pub trunk_prefix: String,
    pub subscriber_len: usize,

    pub database_path: String,
    pub artifacts_dir: String,

    // Daily broadcast
    pub schedule_time: String, // Format: "HH:MM"
    pub report_timezone: Tz,
    pub batch_budget_secs: u64,
    pub batch_min_delay_secs: u64,
    pub batch_max_delay_secs: u64,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let service_account_json = env::var("GOOGLE_SERVICE_ACCOUNT").ok();
        let service_account_file = env::var("GOOGLE_APPLICATION_CREDENTIALS").ok();
        if service_account_json.is_none() && service_account_file.is_none() {
            return Err(ConfigError::MissingEnvVar(
                "GOOGLE_SERVICE_ACCOUNT or GOOGLE_APPLICATION_CREDENTIALS".to_string(),
            )
            .into());
        }

        let timezone_str = env_or("REPORT_TIMEZONE", "Asia/Tashkent");
        let report_timezone = timezone_str
            .parse::<Tz>()
            .map_err(|_| ConfigError::InvalidValue("REPORT_TIMEZONE".to_string(), timezone_str))?;

        Ok(Config {
            bot_token: env::var("BOT_TOKEN")
                .map_err(|_| ConfigError::MissingEnvVar("BOT_TOKEN".to_string()))?,
            spreadsheet_id: env::var("SPREADSHEET_ID")
                .map_err(|_| ConfigError::MissingEnvVar("SPREADSHEET_ID".to_string()))?,
            service_account_json,
            service_account_file,
            directory_sheet: env_or("DIRECTORY_SHEET", "📚 Справочники"),
            directory_cells: env_or("DIRECTORY_CELLS", "Q2:R"),
            directory_start_row: env_parse("DIRECTORY_START_ROW", 2),
            report_sheet: env_or("REPORT_SHEET", "ТГ бот (не трогать)"),
            report_phone_cell: env_or("REPORT_PHONE_CELL", "B1"),
            report_date_cells: env_or("REPORT_DATE_CELLS", "C2:D2"),
            report_output_cells: env_or("REPORT_OUTPUT_CELLS", "A1:Z20"),
            report_header_rows: env_parse("REPORT_HEADER_ROWS", 4),
            settle_secs: env_parse("REPORT_SETTLE_SECS", 3),
            http_timeout_secs: env_parse("HTTP_TIMEOUT_SECS", 30),
            country_code: env_or("PHONE_COUNTRY_CODE", "998"),
            trunk_prefix: env_or("PHONE_TRUNK_PREFIX", "8"),
            subscriber_len: env_parse("PHONE_SUBSCRIBER_LEN", 9),
            database_path: env_or("DATABASE_PATH", "bps_bot.db"),
            artifacts_dir: env_or("ARTIFACTS_DIR", "reports"),
            schedule_time: env_or("DAILY_REPORT_TIME", "23:50"),
            report_timezone,
            batch_budget_secs: env_parse("BATCH_BUDGET_SECS", 1800),
            batch_min_delay_secs: env_parse("BATCH_MIN_DELAY_SECS", 2),
            batch_max_delay_secs: env_parse("BATCH_MAX_DELAY_SECS", 30),
        })
    }
}

#[cfg(test)]
impl Config {
    pub(crate) fn for_tests() -> Self {
        Config {
            bot_token: "token".to_string(),
            spreadsheet_id: "sheet-id".to_string(),
            service_account_json: None,
            service_account_file: None,
            directory_sheet: "📚 Справочники".to_string(),
            directory_cells: "Q2:R".to_string(),
            directory_start_row: 2,
            report_sheet: "ТГ бот (не трогать)".to_string(),
            report_phone_cell: "B1".to_string(),
            report_date_cells: "C2:D2".to_string(),
            report_output_cells: "A1:Z20".to_string(),
            report_header_rows: 4,
            settle_secs: 0,
            http_timeout_secs: 30,
            country_code: "998".to_string(),
            trunk_prefix: "8".to_string(),
            subscriber_len: 9,
            database_path: ":memory:".to_string(),
            artifacts_dir: "reports".to_string(),
            schedule_time: "23:50".to_string(),
            report_timezone: chrono_tz::Asia::Tashkent,
            batch_budget_secs: 1800,
            batch_min_delay_secs: 2,
            batch_max_delay_secs: 30,
        }
    }
}
