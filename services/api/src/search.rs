use crate::infra::build_discovery;
use charity_finder::config::AppConfig;
use charity_finder::discovery::{deficiency_count, Category, Charity};
use charity_finder::error::AppError;
use charity_finder::telemetry;
use clap::Args;
use std::io::Write;

#[derive(Args, Debug)]
pub(crate) struct SearchArgs {
    /// Latitude of the search center
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) lat: f64,
    /// Longitude of the search center
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) lon: f64,
    /// Keep only charities in this category (food, health, education, other)
    #[arg(long)]
    pub(crate) category: Option<Category>,
    /// Print the ranked list as JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) async fn run_search(args: SearchArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let discovery = build_discovery(&config)?;
    let mut charities = discovery.finder.find_charities(args.lat, args.lon).await?;
    if let Some(category) = args.category {
        charities.retain(|charity| charity.category == Some(category));
    }

    let mut out = std::io::stdout().lock();
    if args.json {
        let payload = serde_json::json!({ "charities": charities });
        serde_json::to_writer_pretty(&mut out, &payload).map_err(std::io::Error::from)?;
        writeln!(out)?;
    } else {
        out.write_all(render_table(&charities).as_bytes())?;
    }
    Ok(())
}

fn render_table(charities: &[Charity]) -> String {
    let mut table = format!(
        "{:>4}  {:<40}  {:>9}  {:<9}  {:>7}\n",
        "rank", "name", "distance", "category", "missing"
    );
    for (index, charity) in charities.iter().enumerate() {
        let category = charity.category.map(|c| c.label()).unwrap_or("-");
        table.push_str(&format!(
            "{:>4}  {:<40}  {:>6.2} km  {:<9}  {:>7}\n",
            index + 1,
            truncate(&charity.name, 40),
            charity.distance_km,
            category,
            deficiency_count(&charity.flags),
        ));
    }
    table
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let mut shortened: String = value.chars().take(width.saturating_sub(3)).collect();
    shortened.push_str("...");
    shortened
}
