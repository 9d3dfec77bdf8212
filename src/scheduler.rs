use chrono::NaiveDate;
use log::{error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::InputFile;
use tokio::time::{sleep, Duration};

use crate::config::Config;
use crate::date_utils::{self, is_schedule_time};
use crate::error::ReportError;
use crate::messages::{self, Lang};
use crate::report_service::{ReportOutput, ReportService};
use crate::user_store::{RegisteredUser, UserStore};

/// Keeps two broadcast rounds from overlapping when one runs long.
#[derive(Default)]
pub struct BroadcastLock {
    active: AtomicBool,
}

pub struct BroadcastGuard<'a> {
    lock: &'a BroadcastLock,
}

impl BroadcastLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_begin(&self) -> Option<BroadcastGuard<'_>> {
        if self.active.swap(true, Ordering::SeqCst) {
            return None;
        }
        Some(BroadcastGuard { lock: self })
    }
}

impl Drop for BroadcastGuard<'_> {
    fn drop(&mut self) {
        self.lock.active.store(false, Ordering::SeqCst);
    }
}

pub struct DailyBroadcastScheduler {
    bot: Bot,
    config: Arc<Config>,
    service: Arc<ReportService>,
    store: Arc<UserStore>,
    lock: BroadcastLock,
}

impl DailyBroadcastScheduler {
    pub fn new(
        bot: Bot,
        config: Arc<Config>,
        service: Arc<ReportService>,
        store: Arc<UserStore>,
    ) -> Self {
        Self {
            bot,
            config,
            service,
            store,
            lock: BroadcastLock::new(),
        }
    }

    /// Minute loop that fires the broadcast once per day at the configured
    /// local time.
    pub async fn start(&self) {
        info!(
            "Daily broadcast scheduler started for {} ({})",
            self.config.schedule_time, self.config.report_timezone
        );

        let mut last_sent_date = String::new();

        loop {
            if is_schedule_time(&self.config.schedule_time, self.config.report_timezone) {
                let today = date_utils::today_in_tz(self.config.report_timezone).to_string();

                if last_sent_date != today {
                    info!("Scheduled time reached. Sending daily reports...");
                    match self.run_broadcast().await {
                        Ok(()) => {
                            last_sent_date = today;
                            info!("Daily broadcast finished");
                        }
                        Err(e) => error!("Daily broadcast failed: {}", e),
                    }
                }
            }

            sleep(Duration::from_secs(60)).await;
        }
    }

    async fn run_broadcast(&self) -> anyhow::Result<()> {
        let _guard = match self.lock.try_begin() {
            Some(guard) => guard,
            None => {
                warn!("Previous daily broadcast still running, skipping this round");
                return Ok(());
            }
        };

        let users = self.store.all()?;
        if users.is_empty() {
            info!("No registered users, nothing to broadcast");
            return Ok(());
        }

        let today = date_utils::today_in_tz(self.config.report_timezone);
        let delay = per_user_delay(
            users.len(),
            self.config.batch_budget_secs,
            self.config.batch_min_delay_secs,
            self.config.batch_max_delay_secs,
        );
        info!(
            "Broadcasting daily reports to {} users with {}s spacing",
            users.len(),
            delay.as_secs()
        );

        let mut sent = 0usize;
        let mut without_data = 0usize;
        let mut failed = 0usize;

        for user in &users {
            match self.send_daily_report(user, today).await {
                Ok(true) => sent += 1,
                Ok(false) => without_data += 1,
                Err(e) => {
                    failed += 1;
                    if e.downcast_ref::<ReportError>()
                        .map_or(false, ReportError::is_credential)
                    {
                        error!(
                            "Credential failure while broadcasting, check the service account: {}",
                            e
                        );
                    } else {
                        error!("Daily report for {} failed: {}", user.phone_number, e);
                    }
                }
            }
            sleep(delay).await;
        }

        info!(
            "Daily broadcast done: {} sent, {} without data, {} failed",
            sent, without_data, failed
        );
        Ok(())
    }

    /// Returns true when a report document went out, false when the user
    /// only got the no-data notice.
    async fn send_daily_report(
        &self,
        user: &RegisteredUser,
        date: NaiveDate,
    ) -> anyhow::Result<bool> {
        let lang = Lang::from_code(Some(&user.language_code));
        let chat_id = ChatId(user.telegram_id);

        info!(
            "Sending daily report to {} ({})",
            user.phone_number, user.telegram_id
        );

        match self
            .service
            .generate(
                &user.phone_number,
                Some(&user.display_name),
                date,
                date,
                lang,
            )
            .await
        {
            Ok(ReportOutput::Artifact(artifact)) => {
                let delivery = self
                    .bot
                    .send_document(chat_id, InputFile::file(artifact.path.clone()))
                    .caption(messages::daily_caption(lang))
                    .await;
                artifact.cleanup();
                delivery?;
                Ok(true)
            }
            Ok(ReportOutput::NoData) => {
                self.bot
                    .send_message(chat_id, messages::daily_no_data(lang))
                    .await?;
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Spreads a round across the batch budget: budget divided by user count,
/// clamped so small batches stay polite and big ones still finish.
fn per_user_delay(users: usize, budget_secs: u64, min_secs: u64, max_secs: u64) -> Duration {
    if users == 0 {
        return Duration::from_secs(min_secs);
    }
    let spread = budget_secs / users as u64;
    Duration::from_secs(spread.clamp(min_secs, max_secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_round_is_skipped_while_the_first_holds_the_lock() {
        let lock = BroadcastLock::new();

        let guard = lock.try_begin();
        assert!(guard.is_some());
        assert!(lock.try_begin().is_none());

        drop(guard);
        assert!(lock.try_begin().is_some());
    }

    #[test]
    fn delay_spreads_the_budget_between_the_clamps() {
        assert_eq!(per_user_delay(10, 1800, 2, 30), Duration::from_secs(30));
        assert_eq!(per_user_delay(60, 1800, 2, 30), Duration::from_secs(30));
        assert_eq!(per_user_delay(300, 1800, 2, 30), Duration::from_secs(6));
        assert_eq!(per_user_delay(1800, 1800, 2, 30), Duration::from_secs(2));
        assert_eq!(per_user_delay(0, 1800, 2, 30), Duration::from_secs(2));
    }
}
