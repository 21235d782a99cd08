//! etfscope CLI: dashboard views, quotes and cache management.
//!
//! Commands:
//! - `overview`: headline KPIs plus dividend-yield and trailing P/E distributions
//! - `top`: top performers by 3Y return, 5Y return and dividend yield
//! - `categories`: category aggregates, best categories and sorted lists
//! - `quote`: latest price and recent closes for one symbol
//! - `cache status`: list cached entries and their age
//! - `cache clear`: remove every cached entry

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use etfscope_core::config::DashboardConfig;
use etfscope_core::data::{
    Cache, CleanedDataset, DataError, DataOrigin, DatasetLoader, DatasetSource, FileCache,
    HttpProvider, Loaded, MemoryCache, SourceProvider, SummaryKpis,
};
use etfscope_core::domain::Metric;
use etfscope_core::metrics::{CategoryAggregate, Histogram, RankedEntry};
use etfscope_core::quote::{QuoteService, QuoteSnapshot, TwelveDataProvider};
use etfscope_core::views::{to_percent, CategoryView, OverviewView, Panel, TopPerformersView};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Config file read when `--config` is not given (optional).
const DEFAULT_CONFIG: &str = "etfscope.toml";

#[derive(Parser)]
#[command(name = "etfscope", about = "ETF dataset metrics and quotes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that reads configuration and the cache.
#[derive(Args, Clone)]
struct CommonArgs {
    /// Path to a TOML config file. Defaults to ./etfscope.toml if present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Cache directory (overrides the config file).
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Neither read nor write the cache.
    #[arg(long, default_value_t = false)]
    no_cache: bool,

    /// Print JSON instead of text tables.
    #[arg(long, default_value_t = false)]
    json: bool,
}

/// Dataset selection for the view commands.
#[derive(Args, Clone)]
struct DatasetArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Per-ETF dataset: URL or file path (overrides the config file).
    #[arg(long)]
    source: Option<String>,

    /// KPI summary dataset: URL or file path (overrides the config file).
    #[arg(long)]
    summary: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Headline KPIs and distribution histograms.
    Overview {
        #[command(flatten)]
        args: DatasetArgs,
    },
    /// Top performers by 3Y return, 5Y return and dividend yield.
    Top {
        #[command(flatten)]
        args: DatasetArgs,

        /// Entries per ranking (overrides the config file).
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Category aggregates and rankings.
    Categories {
        #[command(flatten)]
        args: DatasetArgs,

        /// Minimum records for a category to be filterable (overrides the config file).
        #[arg(long)]
        min_samples: Option<usize>,

        /// Categories in the combined top chart (overrides the config file).
        #[arg(long)]
        top: Option<usize>,
    },
    /// Latest quote and daily closes for a symbol.
    Quote {
        /// Symbol to look up (e.g., QQQ).
        symbol: String,

        #[command(flatten)]
        common: CommonArgs,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// List cached entries, their age and size.
    Status {
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
    /// Remove every cached entry.
    Clear {
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Actually delete (without this flag, only previews what would be removed).
        #[arg(long, default_value_t = false)]
        confirm: bool,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let now = Utc::now();

    match cli.command {
        Commands::Overview { args } => run_overview(&args, now),
        Commands::Top { args, limit } => run_top(&args, limit, now),
        Commands::Categories {
            args,
            min_samples,
            top,
        } => run_categories(&args, min_samples, top, now),
        Commands::Quote { symbol, common } => run_quote(&symbol, &common, now),
        Commands::Cache { action } => match action {
            CacheAction::Status { config, cache_dir } => {
                let config = load_config(config.as_deref())?;
                run_cache_status(&cache_dir.unwrap_or(config.cache.dir), now)
            }
            CacheAction::Clear {
                config,
                cache_dir,
                confirm,
            } => {
                let config = load_config(config.as_deref())?;
                run_cache_clear(&cache_dir.unwrap_or(config.cache.dir), confirm)
            }
        },
    }
}

// ── Setup ───────────────────────────────────────────────────────────

fn load_config(path: Option<&Path>) -> Result<DashboardConfig> {
    let config = match path {
        Some(p) => DashboardConfig::from_file(p)?,
        None => DashboardConfig::load_or_default(Path::new(DEFAULT_CONFIG))?,
    };
    log::debug!(
        "cli.config etfs={} cache_dir={}",
        config.sources.etfs,
        config.cache.dir.display()
    );
    Ok(config)
}

fn open_cache(common: &CommonArgs, config: &DashboardConfig) -> Box<dyn Cache> {
    if common.no_cache {
        return Box::new(MemoryCache::new());
    }
    let dir = common
        .cache_dir
        .clone()
        .unwrap_or_else(|| config.cache.dir.clone());
    Box::new(FileCache::new(dir))
}

/// Load the per-ETF dataset, plus the summary dataset when `with_summary` is set
/// and one is configured. Both loads run concurrently.
fn load_datasets(
    args: &DatasetArgs,
    config: &DashboardConfig,
    with_summary: bool,
    now: DateTime<Utc>,
) -> Result<(Loaded<CleanedDataset>, Option<Loaded<SummaryKpis>>)> {
    let provider = SourceProvider::new(HttpProvider::new()?);
    let cache = open_cache(&args.common, config);
    let loader = DatasetLoader::new(
        &provider,
        cache.as_ref(),
        config.load_options(!args.common.no_cache),
    );

    let etfs = args
        .source
        .as_deref()
        .map(DatasetSource::parse)
        .unwrap_or_else(|| config.etfs_source());
    let summary = if with_summary {
        args.summary
            .as_deref()
            .map(DatasetSource::parse)
            .or_else(|| config.summary_source())
    } else {
        None
    };

    let (etfs, summary) = match summary {
        Some(summary) => {
            let (e, s) = loader.load_pair(&etfs, &summary, now);
            (e, Some(s))
        }
        None => (loader.load(&etfs, now), None),
    };

    report_provenance(&etfs);
    if let Some(s) = &summary {
        report_provenance(s);
    }
    Ok((etfs, summary))
}

fn report_provenance<T>(loaded: &Loaded<T>) {
    for warn in &loaded.warnings {
        eprintln!("WARNING: {warn}");
    }
    if loaded.is_fallback() {
        eprintln!("WARNING: showing built-in sample data");
    }
}

/// JSON envelope: the view plus where its data came from.
#[derive(Serialize)]
struct Output<'a, T: Serialize> {
    source: &'a str,
    origin: DataOrigin,
    warnings: &'a [String],
    view: &'a T,
}

fn print_json<T: Serialize, U>(loaded: &Loaded<U>, view: &T) -> Result<()> {
    let out = Output {
        source: &loaded.source,
        origin: loaded.origin,
        warnings: &loaded.warnings,
        view,
    };
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

// ── Views ───────────────────────────────────────────────────────────

fn run_overview(args: &DatasetArgs, now: DateTime<Utc>) -> Result<()> {
    let config = load_config(args.common.config.as_deref())?;
    let (etfs, summary) = load_datasets(args, &config, true, now)?;
    let view = OverviewView::build(&etfs.value.records, summary.as_ref().map(|s| &s.value));

    if args.common.json {
        return print_json(&etfs, &view);
    }
    print_overview(&etfs, &view);
    Ok(())
}

fn run_top(args: &DatasetArgs, limit: Option<usize>, now: DateTime<Utc>) -> Result<()> {
    let config = load_config(args.common.config.as_deref())?;
    let top_n = limit.unwrap_or(config.ranking.top_n);
    if top_n == 0 {
        bail!("--limit must be at least 1");
    }
    let (etfs, _) = load_datasets(args, &config, false, now)?;
    let view = TopPerformersView::build(&etfs.value.records, top_n);

    if args.common.json {
        return print_json(&etfs, &view);
    }
    print_header("Top Performers", &etfs);
    for (metric, panel) in view.panels() {
        println!("--- {} (top {}) ---", metric.label(), view.top_n);
        print_ranking(metric, panel);
        println!();
    }
    Ok(())
}

fn run_categories(
    args: &DatasetArgs,
    min_samples: Option<usize>,
    top: Option<usize>,
    now: DateTime<Utc>,
) -> Result<()> {
    let config = load_config(args.common.config.as_deref())?;
    let mut policy = config.category_policy().clone();
    if let Some(n) = min_samples {
        policy.min_samples = n;
    }
    let top = top.unwrap_or(config.ranking.top_categories);

    let (etfs, _) = load_datasets(args, &config, false, now)?;
    let view = CategoryView::build(&etfs.value, &policy, top)
        .with_context(|| format!("category view for {}", etfs.source))?;

    if args.common.json {
        return print_json(&etfs, &view);
    }
    print_categories(&etfs, &view);
    Ok(())
}

// ── Quote ───────────────────────────────────────────────────────────

fn run_quote(symbol: &str, common: &CommonArgs, now: DateTime<Utc>) -> Result<()> {
    let config = load_config(common.config.as_deref())?;
    let provider = TwelveDataProvider::from_env(
        HttpProvider::new()?,
        config.quote.base_url.clone(),
        &config.quote.api_key_env,
    )
    .with_history_days(config.quote.history_days);
    let cache = open_cache(common, &config);
    let service = QuoteService::new(&provider, cache.as_ref(), config.quote_ttl());

    let loaded = match service.snapshot(symbol, now) {
        Ok(loaded) => loaded,
        Err(DataError::RateLimited { retry_after_secs }) => {
            bail!("quote rate limit reached; try again in {retry_after_secs}s")
        }
        Err(e) => return Err(e.into()),
    };

    if common.json {
        return print_json(&loaded, &loaded.value);
    }
    print_quote(&loaded.value, loaded.origin);
    Ok(())
}

// ── Cache ───────────────────────────────────────────────────────────

fn run_cache_status(cache_dir: &Path, now: DateTime<Utc>) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }

    let rows = FileCache::new(cache_dir).status();
    if rows.is_empty() {
        println!("Cache is empty: {}", cache_dir.display());
        return Ok(());
    }

    let total_size: u64 = rows.iter().map(|r| r.size_bytes).sum();
    println!("Cache: {}", cache_dir.display());
    println!("Entries: {}", rows.len());
    println!("Total size: {}", format_size(total_size));
    println!();
    println!("{:<40} {:<22} {:>10} {:>10}", "Key", "Stored At", "Age", "Size");
    println!("{}", "-".repeat(85));
    for row in &rows {
        println!(
            "{:<40} {:<22} {:>10} {:>10}",
            truncate(&row.key, 40),
            row.stored_at.format("%Y-%m-%d %H:%M:%S"),
            format_age(now - row.stored_at),
            format_size(row.size_bytes)
        );
    }
    Ok(())
}

fn run_cache_clear(cache_dir: &Path, confirm: bool) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }

    let cache = FileCache::new(cache_dir);
    let rows = cache.status();
    if rows.is_empty() {
        println!("Cache is empty: {}", cache_dir.display());
        return Ok(());
    }

    println!("Found {} cached entr(ies):", rows.len());
    for row in &rows {
        println!("  {} ({})", row.key, format_size(row.size_bytes));
    }

    if !confirm {
        println!();
        println!("Dry run. Pass --confirm to actually delete.");
        return Ok(());
    }

    cache.clear()?;
    println!("Done. Removed {} entr(ies).", rows.len());
    Ok(())
}

// ── Text output ─────────────────────────────────────────────────────

fn print_header<T>(title: &str, loaded: &Loaded<T>) {
    println!();
    println!("=== {title} ===");
    println!("Source:         {} ({})", loaded.source, origin_label(loaded.origin));
    println!();
}

fn print_overview(etfs: &Loaded<CleanedDataset>, view: &OverviewView) {
    print_header("Overview", etfs);
    println!("ETFs:           {}", view.record_count);
    println!("Total Assets:   {}", panel_text(&view.total_assets, |v| format_assets(*v)));
    println!(
        "Median 3Y:      {}",
        panel_text(&view.median_three_year_return, |v| format_pct(*v))
    );
    println!(
        "Median 5Y:      {}",
        panel_text(&view.median_five_year_return, |v| format_pct(*v))
    );

    if let Some(reported) = &view.reported {
        println!();
        println!("--- Reported ---");
        println!("Total Assets:   {}", opt_text(reported.total_assets, format_assets));
        println!("Average 3Y:     {}", opt_text(reported.avg_three_year_return, format_pct));
        println!("Average 5Y:     {}", opt_text(reported.avg_five_year_return, format_pct));
    }

    println!();
    println!("--- Dividend Yield Distribution ---");
    print_histogram(&view.dividend_yield);
    println!();
    println!("--- Trailing P/E Distribution ({:?}) ---", view.pe_source);
    print_histogram(&view.trailing_pe);
    println!();
}

fn print_histogram(panel: &Panel<Histogram>) {
    let Some(h) = panel.ready() else {
        println!("  no data");
        return;
    };
    let max = h.bins.iter().map(|b| b.count).max().unwrap_or(0).max(1);
    for bin in &h.bins {
        let bar = "#".repeat(bin.count * 40 / max);
        println!("  {:<8} {:>6}  {bar}", bin.range_label, bin.count);
    }
    if h.out_of_range > 0 {
        println!("  ({} value(s) outside every bin)", h.out_of_range);
    }
}

fn print_ranking(metric: Metric, panel: &Panel<Vec<RankedEntry>>) {
    let Some(entries) = panel.ready() else {
        println!("  no data");
        return;
    };
    for (i, entry) in entries.iter().enumerate() {
        println!(
            "  {:>2}. {:<8} {:>10}",
            i + 1,
            entry.symbol,
            format_metric(metric, entry.metric_value)
        );
    }
}

fn print_categories(etfs: &Loaded<CleanedDataset>, view: &CategoryView) {
    print_header("Category Performance", etfs);
    println!("Categories:     {}", view.total_categories);
    println!(
        "Filterable:     {}",
        if view.filterable.is_empty() {
            "(none)".to_string()
        } else {
            view.filterable.join(", ")
        }
    );
    if view.blocked_records > 0 {
        println!("Blocked rows:   {}", view.blocked_records);
    }
    println!(
        "Best 3Y:        {}",
        panel_text(&view.best_three_year, |c| best_text(c, Metric::ThreeYearReturn))
    );
    println!(
        "Best 5Y:        {}",
        panel_text(&view.best_five_year, |c| best_text(c, Metric::FiveYearReturn))
    );
    println!(
        "All:            {} ETFs, 3Y {}, 5Y {}, assets {}",
        view.all.record_count,
        opt_text(view.all.avg_three_year_return, format_pct),
        opt_text(view.all.avg_five_year_return, format_pct),
        opt_text(view.all.total_assets, format_assets)
    );

    println!();
    println!("--- Top Categories by 3Y Return ---");
    match view.combined_top.ready() {
        None => println!("  no data"),
        Some(cats) => {
            println!("  {:<32} {:>10} {:>10} {:>12}", "Category", "3Y", "5Y", "Assets");
            for c in cats {
                println!(
                    "  {:<32} {:>10} {:>10} {:>12}",
                    truncate(&c.category, 32),
                    opt_text(c.avg_three_year_return, format_pct),
                    opt_text(c.avg_five_year_return, format_pct),
                    opt_text(c.total_assets, format_assets)
                );
            }
        }
    }

    println!();
    println!("--- Categories by Total Assets ---");
    match view.by_total_assets.ready() {
        None => println!("  no data"),
        Some(cats) => {
            for c in cats {
                println!(
                    "  {:<32} {:>12}",
                    truncate(&c.category, 32),
                    opt_text(c.total_assets, format_assets)
                );
            }
        }
    }
    println!();
}

fn print_quote(q: &QuoteSnapshot, origin: DataOrigin) {
    println!();
    println!("=== {} ===", q.symbol);
    println!("Source:         {}", origin_label(origin));
    println!("Price:          ${:.2}", q.current_price);
    let up = q.is_up();
    println!("Daily Change:   {}", signed_text(q.daily_change, up, |v| format!("${v:.2}")));
    println!(
        "Daily Change %: {}",
        signed_text(q.daily_change_ratio, up, |r| format!("{:.2}%", to_percent(r)))
    );
    println!();
    if q.prices.is_empty() {
        println!("--- Price Trend ---");
        println!("  no data");
    } else {
        println!("--- {}-Day Price Trend ---", q.prices.len());
        for p in &q.prices {
            println!("  {}  {:>10.2}", p.date, p.price);
        }
    }
    println!();
}

// ── Formatting ──────────────────────────────────────────────────────

fn origin_label(origin: DataOrigin) -> &'static str {
    match origin {
        DataOrigin::Remote => "remote",
        DataOrigin::Local => "local file",
        DataOrigin::Inline => "inline",
        DataOrigin::Cache => "cache",
        DataOrigin::Fallback => "built-in sample",
    }
}

fn panel_text<T>(panel: &Panel<T>, f: impl FnOnce(&T) -> String) -> String {
    panel.ready().map(f).unwrap_or_else(|| "no data".into())
}

fn opt_text(value: Option<f64>, f: fn(f64) -> String) -> String {
    value.map(f).unwrap_or_else(|| "no data".into())
}

fn signed_text(value: Option<f64>, up: bool, f: impl Fn(f64) -> String) -> String {
    match value {
        Some(v) if up => format!("+{}", f(v)),
        Some(v) => f(v),
        None => "no data".into(),
    }
}

fn best_text(c: &CategoryAggregate, metric: Metric) -> String {
    format!(
        "{} ({})",
        c.category,
        opt_text(c.value(metric), format_pct)
    )
}

fn format_metric(metric: Metric, value: f64) -> String {
    if metric.is_fraction() {
        format_pct(value)
    } else if metric == Metric::DividendYield {
        format!("{value:.2}%")
    } else {
        format!("{value:.2}")
    }
}

fn format_pct(fraction: f64) -> String {
    format!("{:.2}%", to_percent(fraction))
}

fn format_assets(value: f64) -> String {
    if value >= 1e12 {
        format!("${:.2}T", value / 1e12)
    } else if value >= 1e9 {
        format!("${:.1}B", value / 1e9)
    } else if value >= 1e6 {
        format!("${:.1}M", value / 1e6)
    } else {
        format!("${value:.0}")
    }
}

fn format_age(age: chrono::Duration) -> String {
    let mins = age.num_minutes();
    if mins < 0 {
        "future".into()
    } else if mins < 60 {
        format!("{mins}m")
    } else if mins < 60 * 24 {
        format!("{}h", mins / 60)
    } else {
        format!("{}d", mins / (60 * 24))
    }
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn unknown_daily_change_reads_no_data() {
        let pct = |r: f64| format!("{:.2}%", to_percent(r));
        assert_eq!(signed_text(None, false, pct), "no data");
        assert_eq!(signed_text(Some(0.0102), true, pct), "+1.02%");
        assert_eq!(signed_text(Some(-2.5), false, |v| format!("${v:.2}")), "$-2.50");
    }

    #[test]
    fn assets_scale() {
        assert_eq!(format_assets(2.8475e12), "$2.85T");
        assert_eq!(format_assets(3.0e9), "$3.0B");
        assert_eq!(format_assets(3000.0), "$3000");
    }

    #[test]
    fn percent_formatting_scales_once() {
        assert_eq!(format_pct(0.15), "15.00%");
        assert_eq!(format_metric(Metric::DividendYield, 3.1), "3.10%");
        assert_eq!(format_metric(Metric::ThreeYearReturn, 0.2), "20.00%");
    }

    #[test]
    fn truncation() {
        assert_eq!(truncate("Technology", 32), "Technology");
        assert_eq!(truncate("abcdef", 4), "abc…");
    }
}
