use crate::config::{Config, Profile};
use crate::reconcile::Reconciler;
use crate::sink::google::GoogleCalendarSink;
use crate::source::{CsvFile, CsvUrl, SourceAdapter};
use crate::watch::{self, LogNotifier};
use anyhow::{anyhow, Context, Result};
use chrono::Local;
use chrono_tz::Tz;
use log::{debug, error, info, warn};
use std::time::Duration;

pub struct Application;

impl Application {
    pub fn new() -> Self {
        Self
    }

    /// Reconcile every configured profile (or just the named ones).
    /// Profiles own disjoint calendars, so they run fully concurrently.
    pub async fn run(&self, only: &[String]) -> Result<()> {
        let config = Config::load()?;
        let timezone: Tz = config
            .sync
            .timezone
            .parse()
            .map_err(|_| anyhow!("Unknown time zone '{}'", config.sync.timezone))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;

        // Hard failure before any calendar is touched.
        check_connection(&client, config.sync.connect_timeout_secs).await?;

        let profiles: Vec<Profile> = config
            .profiles
            .iter()
            .filter(|p| only.is_empty() || only.contains(&p.name))
            .cloned()
            .collect();
        if profiles.is_empty() {
            return Err(anyhow!("No matching profiles configured"));
        }

        let now = Local::now().naive_local();
        let retry_delay = Duration::from_secs(config.sync.retry_delay_secs);

        let mut handles = Vec::new();
        for profile in profiles {
            let client = client.clone();
            handles.push(tokio::spawn(async move {
                let name = profile.name.clone();
                (name, run_profile(profile, client, timezone, retry_delay, now).await)
            }));
        }

        let mut failures = 0;
        for handle in handles {
            let (name, result) = handle.await.context("Profile task panicked")?;
            match result {
                Ok(()) => {}
                Err(err) => {
                    failures += 1;
                    error!("Profile '{}' failed: {:#}", name, err);
                }
            }
        }

        if failures > 0 {
            warn!("{} profile(s) did not complete cleanly", failures);
        }
        Ok(())
    }

    /// Check whether the sheet's reference row moved since the last run
    /// and notify if so.
    pub async fn watch(&self, profile_name: Option<&str>) -> Result<()> {
        let config = Config::load()?;
        let profile = match profile_name {
            Some(name) => config
                .profiles
                .iter()
                .find(|p| p.name == name)
                .ok_or_else(|| anyhow!("No profile named '{}'", name))?,
            None => config.profiles.first().ok_or_else(|| anyhow!("No profiles configured"))?,
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;
        check_connection(&client, config.sync.connect_timeout_secs).await?;

        let source = build_source(profile, client);
        let rows = source.rows().await?;

        let now = Local::now().naive_local();
        let Some(current) = watch::current_reference_date(&rows, &profile.date_format, now.date())
        else {
            info!("Sheet holds no upcoming reference row; nothing to watch");
            return Ok(());
        };

        let state_path =
            crate::config::state_dir()?.join(format!("{}-reference.json", profile.name));
        watch::check_reference(&state_path, current, now, &LogNotifier)?;
        Ok(())
    }
}

impl Default for Application {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_profile(
    profile: Profile,
    client: reqwest::Client,
    timezone: Tz,
    retry_delay: Duration,
    now: chrono::NaiveDateTime,
) -> Result<()> {
    let token = std::env::var(&profile.token_env).with_context(|| {
        format!("Calendar token for '{}' missing from ${}", profile.name, profile.token_env)
    })?;

    let source = build_source(&profile, client.clone());
    let sink = GoogleCalendarSink::new(client, profile.calendar_id.clone(), token, timezone);

    let report = Reconciler::new(&sink, retry_delay).run(source.as_ref(), &profile, now).await?;
    if !report.clean() {
        warn!(
            "Profile '{}' finished with {} unresolved entr(ies)",
            profile.name,
            report.unresolved.len()
        );
        for entry in &report.unresolved {
            debug!("Unresolved: {:?} ({})", entry.title, entry.error);
        }
    }
    Ok(())
}

fn build_source(profile: &Profile, client: reqwest::Client) -> Box<dyn SourceAdapter> {
    if profile.sheet.starts_with("http://") || profile.sheet.starts_with("https://") {
        Box::new(CsvUrl::new(client, profile.sheet.clone(), profile.assignment_column.clone()))
    } else {
        Box::new(CsvFile::new(profile.sheet.clone(), profile.assignment_column.clone()))
    }
}

/// Pre-flight probe. On failure the whole invocation aborts with no
/// mutation attempted.
async fn check_connection(client: &reqwest::Client, timeout_secs: u64) -> Result<()> {
    info!("Checking connection...");
    client
        .get("https://www.google.com/")
        .timeout(Duration::from_secs(timeout_secs))
        .send()
        .await
        .context("No network connectivity; aborting before touching any calendar")?;
    Ok(())
}
