use async_trait::async_trait;
use chrono::Utc;
use chrono_tz::Tz;
use csv::WriterBuilder;
use log::{error, info, warn};
use reqwest::Client;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::date_utils;
use crate::error::ReportError;
use crate::google_auth::SheetsAuth;
use crate::messages::{self, Lang};
use crate::report_engine::ReportData;

const RULE: &str = "═══════════════════════════════════";
const ORG_EMAIL: &str = "euroasiaprint@gmail.com";
const ORG_PHONE: &str = "+998 90 123 45 67";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Xlsx,
    Csv,
    Text,
}

/// A report file on disk, ready to be sent to the user.
#[derive(Debug)]
pub struct Artifact {
    pub path: PathBuf,
    pub kind: ArtifactKind,
}

impl Artifact {
    /// Removes the file once it has been delivered.
    pub fn cleanup(self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(
                "Could not remove report file {}: {}",
                self.path.display(),
                e
            );
        }
    }
}

/// Downloads the whole workbook as an xlsx snapshot.
#[async_trait]
pub trait WorkbookExporter: Send + Sync {
    async fn download_xlsx(&self, dest: &Path) -> anyhow::Result<()>;
}

pub struct LiveWorkbookExporter {
    client: Client,
    auth: SheetsAuth,
    export_url: String,
}

impl LiveWorkbookExporter {
    pub fn new(config: &Config, auth: SheetsAuth) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            auth,
            export_url: format!(
                "https://docs.google.com/spreadsheets/d/{}/export?format=xlsx",
                config.spreadsheet_id
            ),
        })
    }
}

#[async_trait]
impl WorkbookExporter for LiveWorkbookExporter {
    async fn download_xlsx(&self, dest: &Path) -> anyhow::Result<()> {
        let token = self.auth.bearer().await?;
        let response = self
            .client
            .get(&self.export_url)
            .bearer_auth(&token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error".to_string());
            anyhow::bail!("export endpoint returned {}: {}", status, body);
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            anyhow::bail!("export endpoint returned an empty body");
        }
        // A sign-in or error page instead of a workbook
        if bytes.starts_with(b"<") {
            anyhow::bail!("export endpoint returned HTML instead of a workbook");
        }

        fs::write(dest, &bytes)?;
        info!("Downloaded workbook snapshot to {}", dest.display());
        Ok(())
    }
}

/// Turns computed report data into a deliverable file. Strategies run in
/// order of fidelity: live workbook snapshot, then a CSV rendering of the
/// output block, then a plain-text summary.
pub struct ReportExportChain {
    exporter: Arc<dyn WorkbookExporter>,
    output_dir: PathBuf,
    tz: Tz,
}

impl ReportExportChain {
    pub fn new(config: &Config, exporter: Arc<dyn WorkbookExporter>) -> Self {
        Self {
            exporter,
            output_dir: PathBuf::from(&config.artifacts_dir),
            tz: config.report_timezone,
        }
    }

    pub async fn produce(
        &self,
        data: &ReportData,
        display_name: Option<&str>,
        lang: Lang,
    ) -> Result<Artifact, ReportError> {
        fs::create_dir_all(&self.output_dir)?;

        let digits: String = data.phone.chars().filter(|c| c.is_ascii_digit()).collect();
        let stem = format!("hisobot_{}_{}", digits, Utc::now().timestamp_millis());
        let mut failures: Vec<String> = Vec::new();

        let xlsx_path = self.output_dir.join(format!("{}.xlsx", stem));
        match self.exporter.download_xlsx(&xlsx_path).await {
            Ok(()) => {
                return Ok(Artifact {
                    path: xlsx_path,
                    kind: ArtifactKind::Xlsx,
                })
            }
            Err(e) => {
                warn!("Workbook snapshot failed, falling back to CSV: {}", e);
                failures.push(format!("xlsx: {}", e));
            }
        }

        let csv_path = self.output_dir.join(format!("{}.csv", stem));
        match write_csv(&csv_path, data, display_name, lang, self.tz) {
            Ok(()) => {
                info!("Rendered CSV report to {}", csv_path.display());
                return Ok(Artifact {
                    path: csv_path,
                    kind: ArtifactKind::Csv,
                });
            }
            Err(e) => {
                warn!("CSV rendering failed, falling back to text: {}", e);
                failures.push(format!("csv: {}", e));
            }
        }

        let text_path = self.output_dir.join(format!("{}.txt", stem));
        match fs::write(&text_path, render_text(data, lang, self.tz)) {
            Ok(()) => {
                info!("Rendered text report to {}", text_path.display());
                return Ok(Artifact {
                    path: text_path,
                    kind: ArtifactKind::Text,
                });
            }
            Err(e) => failures.push(format!("text: {}", e)),
        }

        let summary = failures.join("; ");
        error!("Every export strategy failed for {}: {}", data.phone, summary);
        Err(ReportError::ExportExhausted(summary))
    }
}

fn write_csv(
    path: &Path,
    data: &ReportData,
    display_name: Option<&str>,
    lang: Lang,
    tz: Tz,
) -> anyhow::Result<()> {
    let labels = messages::report_labels(lang);

    let mut file = File::create(path)?;
    // UTF-8 BOM for correct encoding detection in Excel
    file.write_all(&[0xEF, 0xBB, 0xBF])?;

    // Semicolon delimiter for Windows Excel compatibility
    let mut writer = WriterBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_writer(file);

    writer.write_record([format!("BPS Hisobot - {}", data.phone)])?;
    if let Some(name) = display_name {
        writer.write_record([name])?;
    }
    writer.write_record([format!(
        "{} - {}",
        date_utils::format_display(data.from),
        date_utils::format_display(data.to)
    )])?;
    writer.write_record([format!(
        "{}: {}",
        labels.generated_at,
        date_utils::format_display(date_utils::today_in_tz(tz))
    )])?;
    writer.write_record([""])?;

    // The grid goes out exactly as read back, row shape included; trimming
    // trailing empty cells used to drop sparse rows entirely.
    if data.raw_rows.is_empty() {
        writer.write_record([labels.no_data_available])?;
    } else {
        for row in &data.raw_rows {
            writer.write_record(row)?;
        }
    }

    writer.flush()?;
    Ok(())
}

/// Plain-text rendition of the report, the last resort when neither the
/// workbook snapshot nor the CSV could be produced.
pub fn render_text(data: &ReportData, lang: Lang, tz: Tz) -> String {
    let labels = messages::report_labels(lang);
    let today = date_utils::today_in_tz(tz);

    let mut report = String::new();
    report.push_str(RULE);
    report.push('\n');
    report.push_str(&format!("📊 {}\n", labels.title));
    report.push_str("🏢 BPS (EUROASIA PRINT)\n");
    report.push_str(RULE);
    report.push_str("\n\n");

    report.push_str(&format!("📱 {}: {}\n", labels.phone_number, data.phone));
    report.push_str(&format!(
        "📅 {}: {}\n",
        labels.from_date,
        date_utils::format_display(data.from)
    ));
    report.push_str(&format!(
        "📅 {}: {}\n",
        labels.to_date,
        date_utils::format_display(data.to)
    ));
    report.push_str(&format!(
        "🕐 {}: {}\n\n",
        labels.generated_at,
        date_utils::format_display(today)
    ));

    report.push_str(RULE);
    report.push('\n');
    report.push_str(&format!("📋 {}\n", labels.report_data));
    report.push_str(RULE);
    report.push_str("\n\n");

    if data.computed_fields.is_empty() {
        report.push_str(&format!("❌ {}\n\n", labels.no_data_available));
    } else {
        for (label, values) in &data.computed_fields {
            report.push_str(&format!("▪️ {}:\n", label));
            report.push_str(&format!("   {}\n\n", values.join(", ")));
        }
    }

    report.push_str(RULE);
    report.push('\n');
    report.push_str(&format!("📧 {}\n", ORG_EMAIL));
    report.push_str(&format!("📞 {}\n", ORG_PHONE));
    report.push_str(RULE);

    report
}


#[cfg(test)]
mod tests {
    use super::testing::StubExporter;
    use super::*;
    use chrono::NaiveDate;
    use std::sync::atomic::Ordering;

    fn sample_data() -> ReportData {
        ReportData {
            phone: "998901234567".to_string(),
            from: NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
            to: NaiveDate::from_ymd_opt(2026, 8, 15).unwrap(),
            raw_rows: vec![
                vec!["BPS".to_string(), String::new()],
                vec![String::new(), String::new()],
                vec!["Jami savdo".to_string(), "1 250 000".to_string(), String::new()],
            ],
            computed_fields: vec![(
                "Jami savdo".to_string(),
                vec!["1 250 000".to_string()],
            )],
        }
    }

    fn chain_in(dir: &Path, exporter: Arc<StubExporter>) -> ReportExportChain {
        let mut config = Config::for_tests();
        config.artifacts_dir = dir.to_string_lossy().into_owned();
        ReportExportChain::new(&config, exporter)
    }

    #[tokio::test]
    async fn workbook_snapshot_is_the_first_choice() {
        let dir = tempfile::tempdir().unwrap();
        let chain = chain_in(dir.path(), Arc::new(StubExporter::default()));

        let artifact = chain.produce(&sample_data(), None, Lang::Uz).await.unwrap();

        assert_eq!(artifact.kind, ArtifactKind::Xlsx);
        let name = artifact.path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("hisobot_998901234567_"));
        assert!(name.ends_with(".xlsx"));
        assert!(artifact.path.exists());

        let path = artifact.path.clone();
        artifact.cleanup();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn failed_snapshot_falls_back_to_semicolon_csv_with_bom() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Arc::new(StubExporter::default());
        exporter.fail.store(true, Ordering::SeqCst);
        let chain = chain_in(dir.path(), exporter);

        let artifact = chain
            .produce(&sample_data(), Some("Client A"), Lang::Uz)
            .await
            .unwrap();
        assert_eq!(artifact.kind, ArtifactKind::Csv);

        let written = fs::read(&artifact.path).unwrap();
        assert!(written.starts_with(&[0xEF, 0xBB, 0xBF]));

        let body = String::from_utf8(written).unwrap();
        assert!(body.contains("BPS Hisobot - 998901234567"));
        assert!(body.contains("Client A\n"));
        assert!(body.contains("01.08.2026 - 15.08.2026"));
        assert!(body.contains("Yaratilgan sana: "));
        // Row shapes survive untouched, trailing empty cells included
        assert!(body.contains("BPS;\n"));
        assert!(body.contains("\n;\n"));
        assert!(body.contains("Jami savdo;1 250 000;\n"));
    }

    #[test]
    fn empty_grid_csv_carries_the_no_data_label() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        let mut data = sample_data();
        data.raw_rows.clear();
        data.computed_fields.clear();

        write_csv(&path, &data, None, Lang::Uz, chrono_tz::Asia::Tashkent).unwrap();

        let body = fs::read_to_string(&path).unwrap();
        assert!(body.contains("Ma'lumot topilmadi"));
    }

    #[test]
    fn text_rendition_has_header_fields_and_footer() {
        let text = render_text(&sample_data(), Lang::Ru, chrono_tz::Asia::Tashkent);

        assert!(text.starts_with(RULE));
        assert!(text.contains("📊 Отчет"));
        assert!(text.contains("📱 Номер телефона: 998901234567"));
        assert!(text.contains("📅 Дата начала: 01.08.2026"));
        assert!(text.contains("▪️ Jami savdo:\n   1 250 000"));
        assert!(text.contains(ORG_EMAIL));
        assert!(text.ends_with(RULE));
    }

    #[test]
    fn text_rendition_without_fields_says_so() {
        let mut data = sample_data();
        data.computed_fields.clear();

        let text = render_text(&data, Lang::Uz, chrono_tz::Asia::Tashkent);
        assert!(text.contains("❌ Ma'lumot topilmadi"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unwritable_directory_exhausts_the_whole_chain() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();
        fs::set_permissions(&out, fs::Permissions::from_mode(0o555)).unwrap();

        let exporter = Arc::new(StubExporter::default());
        exporter.fail.store(true, Ordering::SeqCst);
        let chain = chain_in(&out, exporter);

        let err = chain.produce(&sample_data(), None, Lang::Uz).await.unwrap_err();
        match err {
            ReportError::ExportExhausted(summary) => {
                assert!(summary.contains("xlsx:"));
                assert!(summary.contains("csv:"));
                assert!(summary.contains("text:"));
            }
            other => panic!("expected ExportExhausted, got {:?}", other),
        }

        fs::set_permissions(&out, fs::Permissions::from_mode(0o755)).unwrap();
    }
}
