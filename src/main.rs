use clap::{Parser, Subcommand};
use csv::Writer;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vigia_core::{
    create_pending_table, create_property_table, create_search_table, create_stats_table,
    render_property_report, BatchSummary, Currency, Database, ExecutionSummary, Monitor,
    OperationType, PendingFilter, PendingStatus, Portal, PriceUpdateSummary, PropertyKind,
    PropertyStatus, SavedSearch, SavedSearchPatch, SavedSearchSpec, ScrapeOutcome,
};
use vigia_portals::default_registry;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage and run saved searches
    #[command(subcommand)]
    Search(SearchCommand),

    /// Inspect and scrape the discovery queue
    #[command(subcommand)]
    Pending(PendingCommand),

    /// Inspect tracked properties and their prices
    #[command(subcommand)]
    Properties(PropertiesCommand),
}

#[derive(Subcommand)]
enum SearchCommand {
    /// Create a saved search
    #[command(about = "Create a saved search")]
    Add(AddSearchArgs),

    /// List saved searches
    #[command(about = "List saved searches with their pending counts")]
    List(ListSearchArgs),

    /// Show one saved search in full
    #[command(about = "Show one saved search in full")]
    Show(ShowSearchArgs),

    /// Change fields of a saved search
    #[command(about = "Change fields of a saved search")]
    Edit(EditSearchArgs),

    /// Flip a search between active and paused
    #[command(about = "Flip a search between active and paused")]
    Toggle(SearchIdArgs),

    /// Delete a saved search and its queued discoveries
    #[command(about = "Delete a saved search and its queued discoveries")]
    Rm(SearchIdArgs),

    /// Run a search now; without an id, run every active search
    #[command(about = "Run a search now; without an id, run every active search")]
    Run(RunSearchArgs),
}

#[derive(Subcommand)]
enum PendingCommand {
    /// List queued discoveries
    #[command(about = "List queued discoveries")]
    List(ListPendingArgs),

    /// Scrape one queued discovery into a full property
    #[command(about = "Scrape one queued discovery into a full property")]
    Scrape(ScrapePendingArgs),

    /// Scrape a batch of queued discoveries
    #[command(about = "Scrape a batch of queued discoveries")]
    ScrapeAll(ScrapeAllArgs),

    /// Mark a queued discovery as skipped
    #[command(about = "Mark a queued discovery as skipped")]
    Skip(PendingIdArgs),

    /// Delete a queued discovery
    #[command(about = "Delete a queued discovery")]
    Rm(PendingIdArgs),

    /// Delete errored rows so the next run rediscovers them
    #[command(about = "Delete errored rows so the next run rediscovers them")]
    ClearErrors(ClearErrorsArgs),

    /// Queue totals by status, search and portal
    #[command(about = "Queue totals by status, search and portal")]
    Stats(StatsArgs),
}

#[derive(Subcommand)]
enum PropertiesCommand {
    /// List tracked properties
    #[command(about = "List tracked properties")]
    List(ListPropertiesArgs),

    /// Show a property with its images and price history
    #[command(about = "Show a property with its images and price history")]
    Show(ShowPropertyArgs),

    /// Mark a property sold, rented, reserved, removed or active again
    #[command(about = "Mark a property sold, rented, reserved, removed or active again")]
    SetStatus(SetStatusArgs),

    /// Delete a property and its history
    #[command(about = "Delete a property and its history")]
    Rm(PropertyIdArgs),

    /// Re-check current prices for every tracked property
    #[command(about = "Re-check current prices for every tracked property")]
    UpdatePrices(UpdatePricesArgs),

    /// Re-scrape full details; without an id, every refreshable property
    #[command(about = "Re-scrape full details; without an id, every refreshable property")]
    Rescrape(RescrapeArgs),

    /// Export properties to CSV
    #[command(about = "Export properties to CSV for external analysis")]
    Export(ExportArgs),
}

#[derive(Parser)]
struct AddSearchArgs {
    /// Name of the search (-n, --name)
    #[arg(short = 'n', long)]
    name: String,

    /// Portal to monitor (-x, --portal). Can be specified multiple times.
    #[arg(short = 'x', long = "portal", num_args = 1.., value_delimiter = ',')]
    portals: Vec<Portal>,

    /// Operation type (-t, --operation)
    #[arg(short = 't', long, default_value = "venta")]
    operation: OperationType,

    /// Property kind (-k, --kind)
    #[arg(short = 'k', long)]
    kind: Option<PropertyKind>,

    /// City to search in (-c, --city)
    #[arg(short = 'c', long)]
    city: Option<String>,

    /// Neighborhood to search in (-b, --neighborhood). Can be specified multiple times.
    #[arg(short = 'b', long = "neighborhood", value_delimiter = ',')]
    neighborhoods: Vec<String>,

    /// Province (--province)
    #[arg(long)]
    province: Option<String>,

    /// Minimum price (-p, --min-price)
    #[arg(short = 'p', long)]
    min_price: Option<f64>,

    /// Maximum price (-P, --max-price)
    #[arg(short = 'P', long)]
    max_price: Option<f64>,

    /// Currency the price range is in (--currency)
    #[arg(long, default_value = "usd")]
    currency: Currency,

    /// Minimum covered area in square meters (-m, --min-area)
    #[arg(short = 'm', long)]
    min_area: Option<f64>,

    /// Maximum covered area in square meters (-M, --max-area)
    #[arg(short = 'M', long)]
    max_area: Option<f64>,

    /// Minimum bedrooms (--min-bedrooms)
    #[arg(long)]
    min_bedrooms: Option<i64>,

    /// Maximum bedrooms (--max-bedrooms)
    #[arg(long)]
    max_bedrooms: Option<i64>,

    /// Minimum bathrooms (--min-bathrooms)
    #[arg(long)]
    min_bathrooms: Option<i64>,

    /// Free-form description (--description)
    #[arg(long)]
    description: Option<String>,

    /// Scrape new discoveries right after each run (-a, --auto-scrape)
    #[arg(short = 'a', long, default_value_t = false)]
    auto_scrape: bool,

    /// Database file path (-d, --database)
    #[arg(short = 'd', long, default_value = "vigia.db")]
    database: PathBuf,
}

#[derive(Parser)]
struct ListSearchArgs {
    /// Only show active searches (-a, --active-only)
    #[arg(short = 'a', long, default_value_t = false)]
    active_only: bool,

    /// Print JSON instead of a table (-j, --json)
    #[arg(short = 'j', long, default_value_t = false)]
    json: bool,

    /// Database file path (-d, --database)
    #[arg(short = 'd', long, default_value = "vigia.db")]
    database: PathBuf,
}

#[derive(Parser)]
struct ShowSearchArgs {
    /// Saved search id
    id: i64,

    /// Print JSON instead of text (-j, --json)
    #[arg(short = 'j', long, default_value_t = false)]
    json: bool,

    /// Database file path (-d, --database)
    #[arg(short = 'd', long, default_value = "vigia.db")]
    database: PathBuf,
}

#[derive(Parser)]
struct EditSearchArgs {
    /// Saved search id
    id: i64,

    /// New name (-n, --name)
    #[arg(short = 'n', long)]
    name: Option<String>,

    /// Replace the portal set (-x, --portal). Can be specified multiple times.
    #[arg(short = 'x', long = "portal", value_delimiter = ',')]
    portals: Vec<Portal>,

    /// Operation type (-t, --operation)
    #[arg(short = 't', long)]
    operation: Option<OperationType>,

    /// Property kind (-k, --kind)
    #[arg(short = 'k', long)]
    kind: Option<PropertyKind>,

    /// City to search in (-c, --city)
    #[arg(short = 'c', long)]
    city: Option<String>,

    /// Replace the neighborhood list (-b, --neighborhood). Can be specified multiple times.
    #[arg(short = 'b', long = "neighborhood", value_delimiter = ',')]
    neighborhoods: Vec<String>,

    /// Province (--province)
    #[arg(long)]
    province: Option<String>,

    /// Minimum price (-p, --min-price)
    #[arg(short = 'p', long)]
    min_price: Option<f64>,

    /// Maximum price (-P, --max-price)
    #[arg(short = 'P', long)]
    max_price: Option<f64>,

    /// Currency the price range is in (--currency)
    #[arg(long)]
    currency: Option<Currency>,

    /// Minimum covered area in square meters (-m, --min-area)
    #[arg(short = 'm', long)]
    min_area: Option<f64>,

    /// Maximum covered area in square meters (-M, --max-area)
    #[arg(short = 'M', long)]
    max_area: Option<f64>,

    /// Minimum bedrooms (--min-bedrooms)
    #[arg(long)]
    min_bedrooms: Option<i64>,

    /// Maximum bedrooms (--max-bedrooms)
    #[arg(long)]
    max_bedrooms: Option<i64>,

    /// Minimum bathrooms (--min-bathrooms)
    #[arg(long)]
    min_bathrooms: Option<i64>,

    /// Free-form description (--description)
    #[arg(long)]
    description: Option<String>,

    /// Turn auto-scrape on or off (--auto-scrape true|false)
    #[arg(long)]
    auto_scrape: Option<bool>,

    /// Reset a field to empty (--clear). Can be specified multiple times, e.g. --clear max-price
    #[arg(long = "clear", value_delimiter = ',')]
    clear: Vec<String>,

    /// Database file path (-d, --database)
    #[arg(short = 'd', long, default_value = "vigia.db")]
    database: PathBuf,
}

#[derive(Parser)]
struct SearchIdArgs {
    /// Saved search id
    id: i64,

    /// Database file path (-d, --database)
    #[arg(short = 'd', long, default_value = "vigia.db")]
    database: PathBuf,
}

#[derive(Parser)]
struct RunSearchArgs {
    /// Saved search id; omit to run every active search
    id: Option<i64>,

    /// Examine at most this many candidates per run (--max-properties)
    #[arg(long)]
    max_properties: Option<i64>,

    /// Print JSON instead of text (-j, --json)
    #[arg(short = 'j', long, default_value_t = false)]
    json: bool,

    /// Database file path (-d, --database)
    #[arg(short = 'd', long, default_value = "vigia.db")]
    database: PathBuf,
}

#[derive(Parser)]
struct ListPendingArgs {
    /// Only rows from this saved search (-s, --search)
    #[arg(short = 's', long)]
    search: Option<i64>,

    /// Only rows in this status (-t, --status)
    #[arg(short = 't', long)]
    status: Option<PendingStatus>,

    /// Only rows from this portal (-x, --portal)
    #[arg(short = 'x', long)]
    portal: Option<Portal>,

    /// Maximum number of rows to display (-l, --limit)
    #[arg(short = 'l', long, default_value_t = 20)]
    limit: i64,

    /// Number of rows to skip (-o, --offset)
    #[arg(short = 'o', long, default_value_t = 0)]
    offset: i64,

    /// Print JSON instead of a table (-j, --json)
    #[arg(short = 'j', long, default_value_t = false)]
    json: bool,

    /// Database file path (-d, --database)
    #[arg(short = 'd', long, default_value = "vigia.db")]
    database: PathBuf,
}

#[derive(Parser)]
struct ScrapePendingArgs {
    /// Pending row id
    id: i64,

    /// Print JSON instead of text (-j, --json)
    #[arg(short = 'j', long, default_value_t = false)]
    json: bool,

    /// Database file path (-d, --database)
    #[arg(short = 'd', long, default_value = "vigia.db")]
    database: PathBuf,
}

#[derive(Parser)]
struct ScrapeAllArgs {
    /// Only rows from this saved search (-s, --search)
    #[arg(short = 's', long)]
    search: Option<i64>,

    /// Maximum number of rows to scrape (-l, --limit)
    #[arg(short = 'l', long, default_value_t = 50)]
    limit: i64,

    /// Requeue previously errored rows too (-e, --include-errors)
    #[arg(short = 'e', long, default_value_t = false)]
    include_errors: bool,

    /// Print JSON instead of text (-j, --json)
    #[arg(short = 'j', long, default_value_t = false)]
    json: bool,

    /// Database file path (-d, --database)
    #[arg(short = 'd', long, default_value = "vigia.db")]
    database: PathBuf,
}

#[derive(Parser)]
struct PendingIdArgs {
    /// Pending row id
    id: i64,

    /// Database file path (-d, --database)
    #[arg(short = 'd', long, default_value = "vigia.db")]
    database: PathBuf,
}

#[derive(Parser)]
struct ClearErrorsArgs {
    /// Only errored rows from this saved search (-s, --search)
    #[arg(short = 's', long)]
    search: Option<i64>,

    /// Database file path (-d, --database)
    #[arg(short = 'd', long, default_value = "vigia.db")]
    database: PathBuf,
}

#[derive(Parser)]
struct StatsArgs {
    /// Print JSON instead of a table (-j, --json)
    #[arg(short = 'j', long, default_value_t = false)]
    json: bool,

    /// Database file path (-d, --database)
    #[arg(short = 'd', long, default_value = "vigia.db")]
    database: PathBuf,
}

#[derive(Parser)]
struct ListPropertiesArgs {
    /// Maximum number of properties to display (-l, --limit)
    #[arg(short = 'l', long, default_value_t = 20)]
    limit: i64,

    /// Number of properties to skip (-o, --offset)
    #[arg(short = 'o', long, default_value_t = 0)]
    offset: i64,

    /// Print JSON instead of a table (-j, --json)
    #[arg(short = 'j', long, default_value_t = false)]
    json: bool,

    /// Database file path (-d, --database)
    #[arg(short = 'd', long, default_value = "vigia.db")]
    database: PathBuf,
}

#[derive(Parser)]
struct ShowPropertyArgs {
    /// Property id
    id: i64,

    /// Print JSON instead of the report (-j, --json)
    #[arg(short = 'j', long, default_value_t = false)]
    json: bool,

    /// Database file path (-d, --database)
    #[arg(short = 'd', long, default_value = "vigia.db")]
    database: PathBuf,
}

#[derive(Parser)]
struct SetStatusArgs {
    /// Property id
    id: i64,

    /// New status: active, sold, rented, reserved or removed
    status: PropertyStatus,

    /// Database file path (-d, --database)
    #[arg(short = 'd', long, default_value = "vigia.db")]
    database: PathBuf,
}

#[derive(Parser)]
struct PropertyIdArgs {
    /// Property id
    id: i64,

    /// Database file path (-d, --database)
    #[arg(short = 'd', long, default_value = "vigia.db")]
    database: PathBuf,
}

#[derive(Parser)]
struct UpdatePricesArgs {
    /// Only properties from this portal (-x, --portal)
    #[arg(short = 'x', long)]
    portal: Option<Portal>,

    /// Print JSON instead of text (-j, --json)
    #[arg(short = 'j', long, default_value_t = false)]
    json: bool,

    /// Database file path (-d, --database)
    #[arg(short = 'd', long, default_value = "vigia.db")]
    database: PathBuf,
}

#[derive(Parser)]
struct RescrapeArgs {
    /// Property id; omit to re-scrape every refreshable property
    id: Option<i64>,

    /// Only properties from this portal (-x, --portal)
    #[arg(short = 'x', long)]
    portal: Option<Portal>,

    /// Print JSON instead of text (-j, --json)
    #[arg(short = 'j', long, default_value_t = false)]
    json: bool,

    /// Database file path (-d, --database)
    #[arg(short = 'd', long, default_value = "vigia.db")]
    database: PathBuf,
}

#[derive(Parser)]
struct ExportArgs {
    /// Output file path (-o, --output)
    #[arg(short = 'o', long, default_value = "properties.csv")]
    output: PathBuf,

    /// Database file path (-d, --database)
    #[arg(short = 'd', long, default_value = "vigia.db")]
    database: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Search(command) => run_search_command(command).await,
        Commands::Pending(command) => run_pending_command(command).await,
        Commands::Properties(command) => run_properties_command(command).await,
    }
}

async fn open_monitor(database: &Path) -> anyhow::Result<Monitor> {
    let db = Database::new(database).await?;
    let registry = default_registry(REQUEST_TIMEOUT)?;
    Ok(Monitor::new(db, registry))
}

async fn run_search_command(command: SearchCommand) -> anyhow::Result<()> {
    match command {
        SearchCommand::Add(cmd) => {
            let monitor = open_monitor(&cmd.database).await?;
            let spec = SavedSearchSpec {
                name: cmd.name,
                description: cmd.description,
                portals: cmd.portals,
                property_kind: cmd.kind,
                operation_type: cmd.operation,
                city: cmd.city,
                neighborhoods: (!cmd.neighborhoods.is_empty()).then_some(cmd.neighborhoods),
                province: cmd.province,
                min_price: cmd.min_price,
                max_price: cmd.max_price,
                currency: cmd.currency,
                min_area: cmd.min_area,
                max_area: cmd.max_area,
                min_bedrooms: cmd.min_bedrooms,
                max_bedrooms: cmd.max_bedrooms,
                min_bathrooms: cmd.min_bathrooms,
                auto_scrape: cmd.auto_scrape,
            };
            let search = monitor.create_saved_search(spec).await?;
            println!(
                "created search {} ({})",
                search.id.unwrap_or_default(),
                search.name
            );
        }
        SearchCommand::List(cmd) => {
            let monitor = open_monitor(&cmd.database).await?;
            let overviews = monitor.list_saved_searches(cmd.active_only).await?;
            if cmd.json {
                print_json(&overviews)?;
            } else if overviews.is_empty() {
                println!("no saved searches");
            } else {
                println!("{}", create_search_table(&overviews));
            }
        }
        SearchCommand::Show(cmd) => {
            let monitor = open_monitor(&cmd.database).await?;
            let search = monitor.get_saved_search(cmd.id).await?;
            if cmd.json {
                print_json(&search)?;
            } else {
                print_search_detail(&search);
            }
        }
        SearchCommand::Edit(cmd) => {
            let monitor = open_monitor(&cmd.database).await?;
            let patch = build_patch(&cmd)?;
            let search = monitor.update_saved_search(cmd.id, patch).await?;
            println!("updated search {} ({})", cmd.id, search.name);
        }
        SearchCommand::Toggle(cmd) => {
            let monitor = open_monitor(&cmd.database).await?;
            let search = monitor.get_saved_search(cmd.id).await?;
            let updated = monitor.set_search_active(cmd.id, !search.is_active).await?;
            println!(
                "search {} is now {}",
                cmd.id,
                if updated.is_active { "active" } else { "paused" }
            );
        }
        SearchCommand::Rm(cmd) => {
            let monitor = open_monitor(&cmd.database).await?;
            monitor.delete_saved_search(cmd.id).await?;
            println!("deleted search {}", cmd.id);
        }
        SearchCommand::Run(cmd) => {
            let monitor = open_monitor(&cmd.database).await?;
            match cmd.id {
                Some(id) => {
                    let summary = monitor.execute_search(id, cmd.max_properties).await?;
                    if cmd.json {
                        print_json(&summary)?;
                    } else {
                        print_execution(&summary);
                    }
                }
                None => {
                    info!("running every active search");
                    let summaries = monitor.execute_all(cmd.max_properties).await?;
                    if cmd.json {
                        print_json(&summaries)?;
                    } else if summaries.is_empty() {
                        println!("no active searches");
                    } else {
                        for summary in &summaries {
                            print_execution(summary);
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

async fn run_pending_command(command: PendingCommand) -> anyhow::Result<()> {
    match command {
        PendingCommand::List(cmd) => {
            let monitor = open_monitor(&cmd.database).await?;
            let filter = PendingFilter {
                search_id: cmd.search,
                status: cmd.status,
                portal: cmd.portal,
                limit: Some(cmd.limit),
                offset: Some(cmd.offset),
            };
            let page = monitor.list_pending(&filter).await?;
            if cmd.json {
                print_json(&page)?;
            } else if page.items.is_empty() {
                println!("no pending rows");
            } else {
                println!("{}", create_pending_table(&page.items));
                println!("showing {} of {} rows", page.items.len(), page.total);
            }
        }
        PendingCommand::Scrape(cmd) => {
            let monitor = open_monitor(&cmd.database).await?;
            let outcome = monitor.scrape_single(cmd.id).await?;
            if cmd.json {
                print_json(&outcome)?;
            } else {
                match outcome {
                    ScrapeOutcome::Scraped { property_id } => {
                        println!("scraped into property {property_id}")
                    }
                    ScrapeOutcome::AlreadyResolved { status } => println!("already {status}"),
                    ScrapeOutcome::Failed { message } => println!("failed: {message}"),
                }
            }
        }
        PendingCommand::ScrapeAll(cmd) => {
            let monitor = open_monitor(&cmd.database).await?;
            let summary = monitor
                .scrape_batch(cmd.search, cmd.limit, cmd.include_errors)
                .await?;
            if cmd.json {
                print_json(&summary)?;
            } else {
                print_batch(&summary);
            }
        }
        PendingCommand::Skip(cmd) => {
            let monitor = open_monitor(&cmd.database).await?;
            monitor.skip_pending(cmd.id).await?;
            println!("skipped pending {}", cmd.id);
        }
        PendingCommand::Rm(cmd) => {
            let monitor = open_monitor(&cmd.database).await?;
            monitor.delete_pending(cmd.id).await?;
            println!("deleted pending {}", cmd.id);
        }
        PendingCommand::ClearErrors(cmd) => {
            let monitor = open_monitor(&cmd.database).await?;
            let cleared = monitor.clear_errors(cmd.search).await?;
            println!("deleted {cleared} errored rows");
        }
        PendingCommand::Stats(cmd) => {
            let monitor = open_monitor(&cmd.database).await?;
            let stats = monitor.pending_stats().await?;
            if cmd.json {
                print_json(&stats)?;
            } else {
                println!(
                    "{} rows: {} pending, {} scraped, {} skipped, {} error, {} duplicate",
                    stats.total,
                    stats.pending,
                    stats.scraped,
                    stats.skipped,
                    stats.error,
                    stats.duplicate
                );
                if !stats.by_search.is_empty() {
                    println!("{}", create_stats_table(&stats));
                }
                for (portal, count) in &stats.by_portal {
                    println!("  {portal}: {count}");
                }
            }
        }
    }

    Ok(())
}

async fn run_properties_command(command: PropertiesCommand) -> anyhow::Result<()> {
    match command {
        PropertiesCommand::List(cmd) => {
            let monitor = open_monitor(&cmd.database).await?;
            let page = monitor
                .list_properties(Some(cmd.limit), Some(cmd.offset))
                .await?;
            if cmd.json {
                print_json(&page)?;
            } else if page.items.is_empty() {
                println!("no properties");
            } else {
                println!("{}", create_property_table(&page.items));
                println!("showing {} of {} properties", page.items.len(), page.total);
            }
        }
        PropertiesCommand::Show(cmd) => {
            let monitor = open_monitor(&cmd.database).await?;
            let property = monitor.get_property(cmd.id).await?;
            let images = monitor.get_property_images(cmd.id).await?;
            let history = monitor.get_price_history(cmd.id).await?;
            if cmd.json {
                print_json(&serde_json::json!({
                    "property": property,
                    "images": images,
                    "price_history": history,
                }))?;
            } else {
                println!("{}", render_property_report(&property, &images, &history));
            }
        }
        PropertiesCommand::SetStatus(cmd) => {
            let monitor = open_monitor(&cmd.database).await?;
            monitor.set_property_status(cmd.id, cmd.status).await?;
            println!("property {} is now {}", cmd.id, cmd.status.as_str());
        }
        PropertiesCommand::Rm(cmd) => {
            let monitor = open_monitor(&cmd.database).await?;
            monitor.delete_property(cmd.id).await?;
            println!("deleted property {}", cmd.id);
        }
        PropertiesCommand::UpdatePrices(cmd) => {
            let monitor = open_monitor(&cmd.database).await?;
            let summary = monitor.update_all_prices(cmd.portal).await?;
            if cmd.json {
                print_json(&summary)?;
            } else {
                print_price_update(&summary);
            }
        }
        PropertiesCommand::Rescrape(cmd) => {
            let monitor = open_monitor(&cmd.database).await?;
            match cmd.id {
                Some(id) => {
                    let property = monitor.rescrape_property(id).await?;
                    if cmd.json {
                        print_json(&property)?;
                    } else {
                        println!(
                            "refreshed property {id}: {} {}",
                            property.currency, property.price
                        );
                    }
                }
                None => {
                    let summary = monitor.rescrape_all(cmd.portal).await?;
                    if cmd.json {
                        print_json(&summary)?;
                    } else {
                        println!(
                            "{} attempted: {} refreshed, {} failed",
                            summary.attempted, summary.refreshed, summary.failed
                        );
                    }
                }
            }
        }
        PropertiesCommand::Export(cmd) => {
            let monitor = open_monitor(&cmd.database).await?;
            let page = monitor.list_properties(None, None).await?;

            let mut writer = Writer::from_path(&cmd.output)?;
            writer.write_record([
                "ID",
                "Source",
                "Title",
                "Kind",
                "Operation",
                "Price",
                "Currency",
                "Price/m2",
                "Address",
                "Neighborhood",
                "City",
                "Bedrooms",
                "Bathrooms",
                "Covered m2",
                "Total m2",
                "Status",
                "URL",
            ])?;
            let exported = page.items.len();
            for property in page.items {
                writer.write_record([
                    property.id.map(|id| id.to_string()).unwrap_or_default(),
                    property.source.as_str().to_string(),
                    property.title,
                    property.kind.as_str().to_string(),
                    property.operation_type.as_str().to_string(),
                    property.price.to_string(),
                    property.currency.as_str().to_string(),
                    property
                        .price_per_sqm
                        .map(|v| format!("{v:.0}"))
                        .unwrap_or_default(),
                    property.address.unwrap_or_default(),
                    property.neighborhood.unwrap_or_default(),
                    property.city,
                    property.bedrooms.map(|v| v.to_string()).unwrap_or_default(),
                    property.bathrooms.map(|v| v.to_string()).unwrap_or_default(),
                    property
                        .covered_area
                        .map(|v| v.to_string())
                        .unwrap_or_default(),
                    property
                        .total_area
                        .map(|v| v.to_string())
                        .unwrap_or_default(),
                    property.status.as_str().to_string(),
                    property.source_url.unwrap_or_default(),
                ])?;
            }
            writer.flush()?;
            info!(
                "exported {} properties to {}",
                exported,
                cmd.output.display()
            );
        }
    }

    Ok(())
}

fn build_patch(cmd: &EditSearchArgs) -> anyhow::Result<SavedSearchPatch> {
    let mut patch = SavedSearchPatch {
        name: cmd.name.clone(),
        operation_type: cmd.operation,
        currency: cmd.currency,
        auto_scrape: cmd.auto_scrape,
        ..SavedSearchPatch::default()
    };

    if !cmd.portals.is_empty() {
        patch.portals = Some(cmd.portals.clone());
    }
    if let Some(kind) = cmd.kind {
        patch.property_kind = Some(Some(kind));
    }
    if let Some(city) = &cmd.city {
        patch.city = Some(Some(city.clone()));
    }
    if !cmd.neighborhoods.is_empty() {
        patch.neighborhoods = Some(Some(cmd.neighborhoods.clone()));
    }
    if let Some(province) = &cmd.province {
        patch.province = Some(Some(province.clone()));
    }
    if let Some(description) = &cmd.description {
        patch.description = Some(Some(description.clone()));
    }
    if let Some(min_price) = cmd.min_price {
        patch.min_price = Some(Some(min_price));
    }
    if let Some(max_price) = cmd.max_price {
        patch.max_price = Some(Some(max_price));
    }
    if let Some(min_area) = cmd.min_area {
        patch.min_area = Some(Some(min_area));
    }
    if let Some(max_area) = cmd.max_area {
        patch.max_area = Some(Some(max_area));
    }
    if let Some(min_bedrooms) = cmd.min_bedrooms {
        patch.min_bedrooms = Some(Some(min_bedrooms));
    }
    if let Some(max_bedrooms) = cmd.max_bedrooms {
        patch.max_bedrooms = Some(Some(max_bedrooms));
    }
    if let Some(min_bathrooms) = cmd.min_bathrooms {
        patch.min_bathrooms = Some(Some(min_bathrooms));
    }

    // A --clear wins over a value given for the same field in one invocation.
    for field in &cmd.clear {
        match field.as_str() {
            "description" => patch.description = Some(None),
            "kind" => patch.property_kind = Some(None),
            "city" => patch.city = Some(None),
            "neighborhoods" => patch.neighborhoods = Some(None),
            "province" => patch.province = Some(None),
            "min-price" => patch.min_price = Some(None),
            "max-price" => patch.max_price = Some(None),
            "min-area" => patch.min_area = Some(None),
            "max-area" => patch.max_area = Some(None),
            "min-bedrooms" => patch.min_bedrooms = Some(None),
            "max-bedrooms" => patch.max_bedrooms = Some(None),
            "min-bathrooms" => patch.min_bathrooms = Some(None),
            other => anyhow::bail!(
                "unknown field for --clear: {other}. Valid fields: description, kind, city, \
                 neighborhoods, province, min-price, max-price, min-area, max-area, \
                 min-bedrooms, max-bedrooms, min-bathrooms"
            ),
        }
    }

    Ok(patch)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_execution(summary: &ExecutionSummary) {
    println!(
        "search {}: {} found, {} new, {} duplicates, {} scraped, {} still pending",
        summary.search_id,
        summary.total_found,
        summary.new_properties,
        summary.duplicates,
        summary.scraped,
        summary.pending
    );
    for error in &summary.errors {
        println!("  {}: {}", error.portal, error.message);
    }
}

fn print_batch(summary: &BatchSummary) {
    println!(
        "{} attempted: {} scraped, {} failed, {} skipped, {} deferred",
        summary.attempted, summary.scraped, summary.failed, summary.skipped, summary.deferred
    );
    for error in &summary.errors {
        println!("  {}: {}", error.portal, error.message);
    }
}

fn print_price_update(summary: &PriceUpdateSummary) {
    println!(
        "{} checked: {} updated, {} unchanged, {} failed",
        summary.checked, summary.updated, summary.unchanged, summary.failed
    );
    for change in &summary.changes {
        let percentage = change
            .change_percentage
            .map(|p| format!(" ({p:+.1}%)"))
            .unwrap_or_default();
        println!(
            "  property {}: {} {} -> {}{}",
            change.property_id, change.currency, change.old_price, change.new_price, percentage
        );
    }
}

fn print_search_detail(search: &SavedSearch) {
    let portals = search
        .portals
        .iter()
        .map(|portal| portal.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    println!("{} (id {})", search.name, search.id.unwrap_or_default());
    if let Some(description) = &search.description {
        println!("  {description}");
    }
    println!("  portals: {portals}");
    println!("  operation: {}", search.operation_type);
    if let Some(kind) = search.property_kind {
        println!("  kind: {kind}");
    }
    if let Some(city) = &search.city {
        println!("  city: {city}");
    }
    if let Some(neighborhoods) = &search.neighborhoods {
        println!("  neighborhoods: {}", neighborhoods.join(", "));
    }
    if search.min_price.is_some() || search.max_price.is_some() {
        println!(
            "  price: {} {} - {}",
            search.currency,
            search.min_price.unwrap_or(0.0),
            search
                .max_price
                .map(|v| v.to_string())
                .unwrap_or_else(|| "any".to_string())
        );
    }
    println!(
        "  {}, auto-scrape {}, {} executions, {} properties found, last run {}",
        if search.is_active { "active" } else { "paused" },
        if search.auto_scrape { "on" } else { "off" },
        search.total_executions,
        search.total_properties_found,
        search
            .last_executed_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".to_string())
    );
}
