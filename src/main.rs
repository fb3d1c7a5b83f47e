mod api;
mod cache;
mod cli;
mod collector;
mod core;
mod error;
mod prelude;
mod quantity;
mod storage;
mod tables;

use std::{fs, path::Path};

use chrono::Local;
use clap::{Parser, crate_version};

use crate::{
    api::{WeatherProvider, octopus, open_meteo},
    cache::{Cache, SystemClock},
    cli::{AnalyseArgs, Args, CacheArgs, CacheCommand, Command},
    collector::Collector,
    core::analysis::{AnalysisResult, Analyser, CollectedData},
    prelude::*,
    storage::Storage,
    tables::{
        build_anomalies_table,
        build_insights_table,
        build_summary_table,
        build_tariff_changes_table,
    },
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().without_time().compact().init();
    info!(version = crate_version!(), "starting…");

    let args = Args::parse();

    match args.command {
        Command::Analyse(args) => {
            analyse(&args).await?;
        }
        Command::Cache(args) => {
            manage_cache(&args)?;
        }
    }

    info!("done!");
    Ok(())
}

#[instrument(skip_all, fields(input = %args.input.display()))]
async fn analyse(args: &AnalyseArgs) -> Result {
    let contents = fs::read(&args.input).context("failed to read the input document")?;
    let mut data: CollectedData =
        serde_json::from_slice(&contents).context("failed to parse the input document")?;

    // The flag overrides the document's account number:
    if let Some(number) = &args.account
        && let Some(account) = &mut data.account
    {
        account.number.clone_from(number);
    }
    let account_number = args
        .account
        .as_deref()
        .or_else(|| data.account.as_ref().map(|account| account.number.as_str()))
        .context("no account number in the document, use `--account`")?
        .to_string();

    let cache = Cache::open(&args.storage.cache_dir(), &account_number, SystemClock);
    let tariffs = octopus::Api::try_new(args.region)?;
    let weather = args.weather.location().map(open_meteo::Api::try_new).transpose()?;
    Collector::new(
        &cache,
        &tariffs,
        weather.as_ref().map(|weather| weather as &dyn WeatherProvider),
        args.overlap_precedence,
    )
    .enrich(&mut data)
    .await;

    let result = Analyser::new(args.analysis.settings()).analyse(&data, Local::now())?;

    archive(&args.storage.dir, &result);
    if let Some(output) = &args.output
        && let Err(error) = write_output(output, &result)
    {
        warn!(output = %output.display(), "{error:#}");
    }

    println!("{}", build_summary_table(&result));
    if !result.anomalies.is_empty() {
        println!("{}", build_anomalies_table(&result.anomalies));
    }
    if !result.tariff_changes.is_empty() {
        println!("{}", build_tariff_changes_table(&result.tariff_changes));
    }
    if !result.insights.is_empty() {
        println!("{}", build_insights_table(&result.insights));
    }

    if let Err(error) = cache.close() {
        warn!("failed to close the cache: {:#}", Error::from(error));
    }
    Ok(())
}

/// Compare the result with the previous one, and save it.
///
/// Storage failures are logged and never fail the run.
fn archive(dir: &Path, result: &AnalysisResult) {
    let storage = match Storage::open(dir) {
        Ok(storage) => storage,
        Err(error) => {
            warn!("analysis is not saved: {:#}", Error::from(error));
            return;
        }
    };
    match storage.load_latest_analysis(&result.account_number) {
        Ok(Some(previous)) => log_comparison(&previous, result),
        Ok(None) => {}
        Err(error) => warn!("failed to load the previous analysis: {:#}", Error::from(error)),
    }
    if let Err(error) = storage.save_analysis(result) {
        warn!("failed to save the analysis: {:#}", Error::from(error));
    }
}

fn write_output(output: &Path, result: &AnalysisResult) -> Result {
    fs::write(output, serde_json::to_vec_pretty(result)?)
        .context("failed to write the output document")?;
    info!(output = %output.display(), "written");
    Ok(())
}

fn log_comparison(previous: &AnalysisResult, current: &AnalysisResult) {
    info!(
        previous_generated_at = %previous.generated_at,
        daily_cost_change = current.avg_daily_cost_total - previous.avg_daily_cost_total,
        recommended_direct_debit_change =
            current.recommended_direct_debit - previous.recommended_direct_debit,
        "compared with the previous analysis",
    );
}

#[instrument(skip_all, fields(account = args.account))]
fn manage_cache(args: &CacheArgs) -> Result {
    let cache = Cache::open(&args.storage.cache_dir(), &args.account, SystemClock);
    match args.command {
        CacheCommand::Stats => {
            let stats = cache.stats();
            info!(path = %cache.path().display(), total = stats.total, expired = stats.expired, "stats");
        }
        CacheCommand::Clear => {
            cache.clear()?;
            info!(path = %cache.path().display(), "cleared");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_archive_into_unusable_directory() -> Result {
        let dir = tempdir()?;
        let not_a_dir = dir.path().join("data");
        fs::write(&not_a_dir, "")?;
        archive(&not_a_dir, &AnalysisResult::empty(Local::now()));
        Ok(())
    }

    #[test]
    fn test_archive_and_compare() -> Result {
        let dir = tempdir()?;
        let result = AnalysisResult {
            account_number: "A-1111".to_string(),
            ..AnalysisResult::empty(Local::now())
        };
        archive(dir.path(), &result);
        archive(dir.path(), &result);
        assert!(Storage::open(dir.path())?.load_latest_analysis("A-1111")?.is_some());
        Ok(())
    }
}
