use chrono::NaiveDate;
use chrono_tz::Tz;
use log::{info, warn};
use std::sync::Arc;

use crate::config::Config;
use crate::date_utils;
use crate::error::ReportError;
use crate::export::{Artifact, ReportExportChain, WorkbookExporter};
use crate::guard::ReportGate;
use crate::messages::Lang;
use crate::phone::PhoneNormalizer;
use crate::registry::DirectoryRegistry;
use crate::report_engine::SheetReportEngine;
use crate::sheets::SheetsApi;
use crate::user_store::{RegisteredUser, UserStore};

/// What a finished pipeline run hands back to the caller.
#[derive(Debug)]
pub enum ReportOutput {
    Artifact(Artifact),
    NoData,
}

/// The resolution and generation pipeline behind every bot surface:
/// contact registration, on-demand reports and the daily broadcast.
pub struct ReportService {
    normalizer: PhoneNormalizer,
    registry: DirectoryRegistry,
    engine: SheetReportEngine,
    gate: ReportGate,
    exports: ReportExportChain,
    store: Arc<UserStore>,
    tz: Tz,
}

impl ReportService {
    pub fn new(
        config: &Config,
        sheets: Arc<dyn SheetsApi>,
        exporter: Arc<dyn WorkbookExporter>,
        store: Arc<UserStore>,
    ) -> Self {
        let normalizer = PhoneNormalizer::new(
            &config.country_code,
            &config.trunk_prefix,
            config.subscriber_len,
        );

        Self {
            registry: DirectoryRegistry::new(config, sheets.clone(), normalizer.clone()),
            engine: SheetReportEngine::new(config, sheets),
            gate: ReportGate::new(),
            exports: ReportExportChain::new(config, exporter),
            store,
            tz: config.report_timezone,
            normalizer,
        }
    }

    /// Resolves a shared contact against the client directory and stores
    /// the registration on success.
    pub async fn register_contact(
        &self,
        telegram_id: i64,
        raw_phone: &str,
        telegram_name: &str,
        language_code: Option<&str>,
    ) -> Result<RegisteredUser, ReportError> {
        let canonical = self
            .normalizer
            .normalize(raw_phone)
            .ok_or(ReportError::InvalidPhone)?;

        let candidates = self.registry.load_all().await?;
        let candidate = self
            .registry
            .find_match(raw_phone, &canonical, &candidates)
            .ok_or(ReportError::NotRegistered)?;

        let display_name = if candidate.display_name.is_empty() {
            telegram_name.to_string()
        } else {
            candidate.display_name.clone()
        };

        if let Some(existing) = self.store.find_by_phone(&canonical)? {
            if existing.telegram_id != telegram_id {
                warn!(
                    "Phone {} is already registered to telegram id {}, now also {}",
                    canonical, existing.telegram_id, telegram_id
                );
            }
        }

        let user = RegisteredUser {
            telegram_id,
            phone_number: canonical.clone(),
            display_name,
            language_code: language_code.unwrap_or("uz").to_string(),
            registered_at: date_utils::now_in_tz(self.tz).to_rfc3339(),
        };
        self.store.upsert(&user)?;

        info!(
            "Registered telegram id {} against directory row {} as {}",
            telegram_id, candidate.source_row, canonical
        );
        Ok(user)
    }

    /// Runs one full generation while holding the global permit. The input
    /// cells are cleared exactly once on every exit path, after the export
    /// chain has finished with the workbook.
    pub async fn generate(
        &self,
        phone: &str,
        display_name: Option<&str>,
        from: NaiveDate,
        to: NaiveDate,
        lang: Lang,
    ) -> Result<ReportOutput, ReportError> {
        let ticket = match self.gate.acquire(phone).await {
            Some(ticket) => ticket,
            None => return Err(ReportError::AlreadyProcessing),
        };

        let outcome = self
            .compute_and_export(phone, display_name, from, to, lang)
            .await;

        if let Err(e) = self.engine.cleanup().await {
            warn!("Could not clear report input cells: {}", e);
        }
        drop(ticket);

        outcome
    }

    async fn compute_and_export(
        &self,
        phone: &str,
        display_name: Option<&str>,
        from: NaiveDate,
        to: NaiveDate,
        lang: Lang,
    ) -> Result<ReportOutput, ReportError> {
        let data = self.engine.compute(phone, from, to).await?;
        if !data.has_records() {
            info!("No records for {} between {} and {}", phone, from, to);
            return Ok(ReportOutput::NoData);
        }

        let artifact = self.exports.produce(&data, display_name, lang).await?;
        Ok(ReportOutput::Artifact(artifact))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::testing::StubExporter;
    use crate::sheets::testing::{grid, FakeSheets};
    use std::path::Path;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn seed_directory(sheets: &FakeSheets) {
        sheets.put(
            "📚 Справочники",
            "Q2:R",
            grid(&[&["Alpha LLC", "+998 90 123 45 67"]]),
        );
    }

    fn seed_report_output(sheets: &FakeSheets, with_data: bool) {
        let rows = if with_data {
            grid(&[
                &["BPS", ""],
                &["", ""],
                &["", ""],
                &["", ""],
                &["Jami savdo", "1 250 000"],
            ])
        } else {
            grid(&[&["BPS", ""]])
        };
        sheets.put("ТГ бот (не трогать)", "A1:Z20", rows);
    }

    fn service_in(
        dir: &Path,
        sheets: Arc<FakeSheets>,
        exporter: Arc<StubExporter>,
        store: Arc<UserStore>,
    ) -> ReportService {
        let mut config = Config::for_tests();
        config.artifacts_dir = dir.to_string_lossy().into_owned();
        ReportService::new(&config, sheets, exporter, store)
    }

    #[tokio::test]
    async fn contact_registration_stores_the_directory_identity() {
        let dir = tempfile::tempdir().unwrap();
        let sheets = Arc::new(FakeSheets::new());
        seed_directory(&sheets);
        let store = Arc::new(UserStore::new_in_memory());
        let service = service_in(
            dir.path(),
            sheets,
            Arc::new(StubExporter::default()),
            store.clone(),
        );

        let user = service
            .register_contact(42, "+998901234567", "Tg Name", Some("ru"))
            .await
            .unwrap();

        assert_eq!(user.phone_number, "998901234567");
        assert_eq!(user.display_name, "Alpha LLC");
        assert_eq!(user.language_code, "ru");

        let stored = store.find(42).unwrap().unwrap();
        assert_eq!(stored.phone_number, "998901234567");
    }

    #[tokio::test]
    async fn unknown_phone_is_rejected_without_storing_anything() {
        let dir = tempfile::tempdir().unwrap();
        let sheets = Arc::new(FakeSheets::new());
        seed_directory(&sheets);
        let store = Arc::new(UserStore::new_in_memory());
        let service = service_in(
            dir.path(),
            sheets,
            Arc::new(StubExporter::default()),
            store.clone(),
        );

        let err = service
            .register_contact(42, "998909999999", "Tg Name", None)
            .await
            .unwrap_err();

        assert!(matches!(err, ReportError::NotRegistered));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn garbage_phone_fails_before_the_directory_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let sheets = Arc::new(FakeSheets::new());
        sheets.fail_reads.store(true, Ordering::SeqCst);
        let service = service_in(
            dir.path(),
            sheets,
            Arc::new(StubExporter::default()),
            Arc::new(UserStore::new_in_memory()),
        );

        let err = service
            .register_contact(42, "hello", "Tg Name", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::InvalidPhone));
    }

    #[tokio::test]
    async fn generation_clears_the_input_cells_after_exporting() {
        let dir = tempfile::tempdir().unwrap();
        let sheets = Arc::new(FakeSheets::new());
        seed_report_output(&sheets, true);
        let service = service_in(
            dir.path(),
            sheets.clone(),
            Arc::new(StubExporter::default()),
            Arc::new(UserStore::new_in_memory()),
        );

        let output = service
            .generate(
                "998901234567",
                Some("Alpha LLC"),
                date(2026, 8, 1),
                date(2026, 8, 15),
                Lang::Uz,
            )
            .await
            .unwrap();

        let artifact = match output {
            ReportOutput::Artifact(artifact) => artifact,
            ReportOutput::NoData => panic!("expected an artifact"),
        };
        assert!(artifact.path.exists());
        artifact.cleanup();

        let writes = sheets.write_log();
        assert_eq!(writes.len(), 4);
        assert_eq!(writes[0].1, vec![vec!["998901234567".to_string()]]);
        assert_eq!(writes[2].1, vec![vec![String::new()]]);
        assert_eq!(writes[3].1, vec![vec![String::new(), String::new()]]);
    }

    #[tokio::test]
    async fn empty_output_reports_no_data_and_still_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let sheets = Arc::new(FakeSheets::new());
        seed_report_output(&sheets, false);
        let service = service_in(
            dir.path(),
            sheets.clone(),
            Arc::new(StubExporter::default()),
            Arc::new(UserStore::new_in_memory()),
        );

        let output = service
            .generate("998901234567", None, date(2026, 8, 1), date(2026, 8, 1), Lang::Uz)
            .await
            .unwrap();

        assert!(matches!(output, ReportOutput::NoData));
        assert_eq!(sheets.write_log().len(), 4);
    }

    #[tokio::test]
    async fn failed_output_read_still_clears_the_input_cells() {
        let dir = tempfile::tempdir().unwrap();
        let sheets = Arc::new(FakeSheets::new());
        sheets.fail_reads.store(true, Ordering::SeqCst);
        let service = service_in(
            dir.path(),
            sheets.clone(),
            Arc::new(StubExporter::default()),
            Arc::new(UserStore::new_in_memory()),
        );

        let err = service
            .generate("998901234567", None, date(2026, 8, 1), date(2026, 8, 1), Lang::Uz)
            .await
            .unwrap_err();

        assert!(matches!(err, ReportError::Sheet(_)));
        // Two input writes plus two cleanup writes, reads failed in between.
        assert_eq!(sheets.write_log().len(), 4);
    }

    #[tokio::test]
    async fn concurrent_request_for_the_same_phone_is_turned_away() {
        let dir = tempfile::tempdir().unwrap();
        let sheets = Arc::new(FakeSheets::new());
        seed_report_output(&sheets, true);

        let mut config = Config::for_tests();
        config.artifacts_dir = dir.path().to_string_lossy().into_owned();
        config.settle_secs = 1;
        let service = Arc::new(ReportService::new(
            &config,
            sheets,
            Arc::new(StubExporter::default()),
            Arc::new(UserStore::new_in_memory()),
        ));

        let background = {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .generate("998901234567", None, date(2026, 8, 1), date(2026, 8, 1), Lang::Uz)
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;

        let second = service
            .generate("998901234567", None, date(2026, 8, 1), date(2026, 8, 1), Lang::Uz)
            .await;
        assert!(matches!(second, Err(ReportError::AlreadyProcessing)));

        let first = background.await.unwrap().unwrap();
        match first {
            ReportOutput::Artifact(artifact) => artifact.cleanup(),
            ReportOutput::NoData => panic!("expected an artifact"),
        }
    }
}
