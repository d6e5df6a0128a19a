use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, Utc};
use galley_core::DateRange;
use galley_ledger::{Backoffice, LedgerError};
use galley_platform::{
    ErrorResponse, ExplodeResponse, FileStore, PostKind, ReconcileQuery, ServiceConfig,
    StockResponse,
};
use rust_decimal::Decimal;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

const USAGE: &str = "\
usage: galley-ops <command> [args]

commands:
  post <purchase|production|waste|transfer|stocktake|cost-adjustment|sale> <file.json>
  revise-purchase <file.json>
  item <file.json>                       create or edit a stock item
  recipe <file.json>                     create or replace a recipe
  explode <product-id> <qty>
  draft-production <product-id> <qty> [location] [date]
  rescale <production-id> <qty>
  add-ingredient <production-id> <item-id> <qty>
  stock <item-id> [location]
  sheet [location]
  reconcile <start> <end> [location|all] [item-id]
  usage <start> <end> [location]
  alerts
  valuation
  journals
  audit
  master                                 categories, locations, departments, suppliers

environment:
  GALLEY_DATA_DIR          data directory (required)
  GALLEY_VARIANCE_EPSILON  reconciliation tolerance (default 0.001)
  GALLEY_DEFAULT_LOCATION  location used when a command omits one";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "galley_ops=info,galley_ledger=info".to_string()),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if matches!(
        args.first().map(String::as_str),
        None | Some("help" | "--help" | "-h")
    ) {
        println!("{USAGE}");
        return ExitCode::SUCCESS;
    }

    match run(&args).await {
        Ok(output) => match serde_json::to_string_pretty(&output) {
            Ok(text) => {
                println!("{text}");
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("error: failed to render output: {err}");
                ExitCode::FAILURE
            }
        },
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &[String]) -> Result<Value> {
    let config = ServiceConfig::from_env()?;
    let store = FileStore::open(&config.data_dir).await?;
    let backoffice =
        Backoffice::new(Arc::new(store)).with_variance_epsilon(config.variance_epsilon);

    let command = args[0].as_str();
    let rest = &args[1..];
    info!(command, data_dir = %config.data_dir.display(), "running command");

    match command {
        "post" => {
            let [kind, file] = rest else {
                bail!("usage: post <kind> <file.json>");
            };
            post(&backoffice, kind.parse()?, Path::new(file)).await
        }
        "revise-purchase" => {
            let [file] = rest else {
                bail!("usage: revise-purchase <file.json>");
            };
            let revised = read_json(Path::new(file)).await?;
            to_json(&backoffice.revise_purchase(revised).await?)
        }
        "item" => {
            let [file] = rest else {
                bail!("usage: item <file.json>");
            };
            let item = read_json(Path::new(file)).await?;
            to_json(&backoffice.upsert_item(item).await?)
        }
        "recipe" => {
            let [file] = rest else {
                bail!("usage: recipe <file.json>");
            };
            let recipe = read_json(Path::new(file)).await?;
            to_json(&backoffice.upsert_recipe(recipe).await?)
        }
        "explode" => {
            let [product_id, qty] = rest else {
                bail!("usage: explode <product-id> <qty>");
            };
            let produced_qty = parse_decimal("qty", qty)?;
            let explosion = backoffice.explode_recipe(product_id, produced_qty).await?;
            to_json(&ExplodeResponse::new(product_id.as_str(), produced_qty, explosion))
        }
        "draft-production" => {
            let (Some(product_id), Some(qty)) = (rest.first(), rest.get(1)) else {
                bail!("usage: draft-production <product-id> <qty> [location] [date]");
            };
            let location = config
                .location_or_default(rest.get(2).cloned())
                .context("no location given and GALLEY_DEFAULT_LOCATION is unset")?;
            let date = match rest.get(3) {
                Some(raw) => parse_date(raw)?,
                None => Utc::now().date_naive(),
            };
            let draft = backoffice
                .draft_production(product_id, parse_decimal("qty", qty)?, location, date)
                .await?;
            to_json(&draft)
        }
        "rescale" => {
            let [id, qty] = rest else {
                bail!("usage: rescale <production-id> <qty>");
            };
            let draft = backoffice
                .rescale_production(parse_id(id)?, parse_decimal("qty", qty)?)
                .await?;
            to_json(&draft)
        }
        "add-ingredient" => {
            let [id, item_id, qty] = rest else {
                bail!("usage: add-ingredient <production-id> <item-id> <qty>");
            };
            let record = backoffice
                .add_manual_ingredient(parse_id(id)?, item_id, parse_decimal("qty", qty)?)
                .await?;
            to_json(&record)
        }
        "stock" => {
            let Some(item_id) = rest.first() else {
                bail!("usage: stock <item-id> [location]");
            };
            let item = backoffice.get_item(item_id).await?;
            let location = match config.location_or_default(rest.get(1).cloned()) {
                Some(location_id) => Some(
                    backoffice
                        .get_location_stock(item_id, &location_id, None)
                        .await?,
                ),
                None => None,
            };
            to_json(&StockResponse::new(item, location))
        }
        "sheet" => {
            let location = config
                .location_or_default(rest.first().cloned())
                .context("usage: sheet <location>")?;
            to_json(&backoffice.location_stock_sheet(&location, None).await?)
        }
        "reconcile" => {
            let (Some(start), Some(end)) = (rest.first(), rest.get(1)) else {
                bail!("usage: reconcile <start> <end> [location|all] [item-id]");
            };
            let query = ReconcileQuery {
                start: parse_date(start)?,
                end: parse_date(end)?,
                location: location_filter(&config, rest.get(2)),
                item_id: rest.get(3).cloned(),
            };
            let range = date_range(query.start, query.end)?;

            let mut request = backoffice.reconcile_request(range);
            request.items = query.item_filter();
            request.location = query.location;
            to_json(&backoffice.reconcile(&request).await?)
        }
        "usage" => {
            let (Some(start), Some(end)) = (rest.first(), rest.get(1)) else {
                bail!("usage: usage <start> <end> [location]");
            };
            let range = date_range(parse_date(start)?, parse_date(end)?)?;
            let location = location_filter(&config, rest.get(2));
            to_json(&backoffice.theoretical_usage(range, location.as_deref()).await?)
        }
        "alerts" => to_json(&backoffice.stock_alerts().await?),
        "valuation" => to_json(&backoffice.valuation().await?),
        "journals" => to_json(&backoffice.journals().await?),
        "audit" => to_json(&backoffice.audit_log().await?),
        "master" => to_json(&backoffice.master_data().await?),
        other => bail!("unknown command `{other}`\n\n{USAGE}"),
    }
}

async fn post(backoffice: &Backoffice, kind: PostKind, file: &Path) -> Result<Value> {
    match kind {
        PostKind::Purchase => to_json(&backoffice.post_purchase(read_json(file).await?).await?),
        PostKind::Production => {
            to_json(&backoffice.post_production(read_json(file).await?).await?)
        }
        PostKind::Waste => to_json(&backoffice.post_waste(read_json(file).await?).await?),
        PostKind::Transfer => to_json(&backoffice.post_transfer(read_json(file).await?).await?),
        PostKind::Stocktake => {
            to_json(&backoffice.post_stocktake(read_json(file).await?).await?)
        }
        PostKind::CostAdjustment => {
            to_json(&backoffice.post_cost_adjustment(read_json(file).await?).await?)
        }
        PostKind::Sale => to_json(&backoffice.complete_sale(read_json(file).await?).await?),
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not a valid document", path.display()))
}

fn to_json<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).context("serializing output")
}

/// `all` reconciles across locations; no argument falls back to the
/// configured default.
fn location_filter(config: &ServiceConfig, raw: Option<&String>) -> Option<String> {
    match raw.map(String::as_str) {
        Some("all") => None,
        Some(location) => Some(location.to_string()),
        None => config.default_location.clone(),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("`{raw}` is not a YYYY-MM-DD date"))
}

fn date_range(start: NaiveDate, end: NaiveDate) -> Result<DateRange> {
    if end < start {
        bail!("range end {end} is before start {start}");
    }
    Ok(DateRange::new(start, end))
}

fn parse_decimal(field: &str, raw: &str) -> Result<Decimal> {
    raw.parse()
        .with_context(|| format!("{field} `{raw}` is not a decimal number"))
}

fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).with_context(|| format!("`{raw}` is not a record id"))
}

fn report(err: &anyhow::Error) {
    let rejected = err
        .downcast_ref::<LedgerError>()
        .is_some_and(LedgerError::is_rejection);
    let response = ErrorResponse {
        error: format!("{err:#}"),
        rejected,
        at: Utc::now(),
    };
    match serde_json::to_string_pretty(&response) {
        Ok(text) => eprintln!("{text}"),
        Err(_) => eprintln!("error: {err:#}"),
    }
}
