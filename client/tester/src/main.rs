use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use catalog::{
    CancelToken,
    remote::{ApiConfig, NutritionApi},
};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// Smoke test against a running backend: health, a few searches and one detail lookup.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[arg(long, env = "NUTRIVAULT_API_URL", default_value = "http://localhost:5003")]
    api_url: String,

    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,

    /// Queries to search, one request each
    #[arg(default_values_t = ["apple".to_string(), "chicken breast".to_string()])]
    queries: Vec<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args = Args::parse();
    let api = NutritionApi::new(&ApiConfig {
        base_url: args.api_url,
        timeout: Duration::from_secs(args.timeout_secs),
    })?;

    let passed = run(&api, &args.queries).await?;
    info!("{passed} checks passed");

    Ok(())
}

/// Runs every check in order, returning how many passed. Stops at the first failure.
async fn run(api: &NutritionApi, queries: &[String]) -> anyhow::Result<usize> {
    let mut passed = 0;

    let health = api.health().await.context("health check")?;
    info!("Backend healthy: {}", health.message);
    passed += 1;

    let mut first = None;
    for query in queries {
        let start = Instant::now();
        let results = api
            .search_foods(query, None, &CancelToken::new())
            .await
            .with_context(|| format!("search for {query:?}"))?;

        info!(
            "{query:?}: {} foods of {} hits in {:?}",
            results.foods.len(),
            results.total_hits,
            start.elapsed()
        );
        passed += 1;

        if first.is_none() {
            first = results.foods.first().map(|food| food.fdc_id);
        }
    }

    let cancel = CancelToken::new();
    cancel.cancel();
    match api.search_foods("banana", None, &cancel).await {
        Err(e) if e.is_cancelled() => info!("Cancelled search dropped as expected"),
        other => bail!("Cancelled search returned {other:?}"),
    }
    passed += 1;

    let Some(fdc_id) = first else {
        warn!("No search returned foods, skipping detail lookup");
        return Ok(passed);
    };

    let details = api.food_details(fdc_id, None).await?;
    if details.fdc_id != fdc_id {
        bail!("Asked for {fdc_id}, got {}", details.fdc_id);
    }

    info!(
        "{}: {:.0} kcal per 100g, {} micronutrients",
        details.description,
        details.macronutrients.calories(),
        details.micronutrients.len()
    );
    passed += 1;

    Ok(passed)
}
