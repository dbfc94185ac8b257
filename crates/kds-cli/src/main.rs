use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use kds_core::prelude::*;
use kds_core::{prep_duration, DateRange, KdsConfig, PerformanceReport, PrepDuration};
use kds_http::HttpKdsApi;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "kds")]
#[command(about = "Kitchen display system operator console")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true, env = "KDS_CONFIG")]
    config: Option<PathBuf>,

    /// Override the API base URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Override the business id
    #[arg(long, global = true)]
    business: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List orders, optionally filtered
    List {
        /// Station name or "all"
        #[arg(long)]
        station: Option<String>,

        /// Status name or "all"
        #[arg(long)]
        status: Option<String>,
    },
    /// Count orders per status
    Counts,
    /// Create an order
    Create {
        #[arg(short, long)]
        station: Station,

        /// Item as MENU_ID:NAME:QTY, repeatable
        #[arg(short, long = "item", required = true)]
        items: Vec<String>,

        /// 1 (low) to 4 (urgent)
        #[arg(short, long, default_value_t = 1)]
        priority: u8,

        /// Minutes from now until the order is due
        #[arg(long)]
        due_in: Option<i64>,

        #[arg(long)]
        assign: Option<String>,
    },
    /// Move an order to a new status
    Advance { id: String, status: OrderStatus },
    /// Assign an order to a staff member
    Assign { id: String, assignee: String },
    /// Performance report for a date range
    Performance {
        /// Trailing window in hours (ignored when --start/--end are given)
        #[arg(long)]
        hours: Option<u32>,

        #[arg(long, requires = "end")]
        start: Option<DateTime<Utc>>,

        #[arg(long, requires = "start")]
        end: Option<DateTime<Utc>>,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<KdsConfig> {
    let mut config = match &cli.config {
        Some(path) => KdsConfig::read(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => KdsConfig::default(),
    }
    .apply_env_overrides();

    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }
    if let Some(business) = &cli.business {
        config.business_id = business.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Parse `MENU_ID:NAME:QTY`
fn parse_item(spec: &str) -> anyhow::Result<OrderItem> {
    let mut parts = spec.splitn(3, ':');
    let (Some(menu_id), Some(name), Some(quantity)) = (parts.next(), parts.next(), parts.next())
    else {
        bail!("item '{spec}' must look like MENU_ID:NAME:QTY");
    };
    let quantity: u32 = quantity
        .trim()
        .parse()
        .with_context(|| format!("quantity in item '{spec}'"))?;
    Ok(OrderItem::new(menu_id.trim(), name.trim(), quantity)?)
}

fn format_prep(order: &KdsOrder) -> String {
    match prep_duration(order) {
        PrepDuration::NotStarted => "-".to_string(),
        PrepDuration::Running { minutes } => format!("{}m+", minutes.floor()),
        PrepDuration::Finished { minutes } => format!("{}m", minutes.floor()),
    }
}

fn print_order(order: &KdsOrder) {
    let items: Vec<String> = order
        .items
        .iter()
        .map(|item| format!("{}x {}", item.quantity(), item.name()))
        .collect();
    let overdue = if order.is_overdue(Utc::now()) { " OVERDUE" } else { "" };
    println!(
        "{:<12} {:<10} {:<10} {:<7} {:>6}  {}{}",
        order.id,
        order.station,
        order.status,
        order.priority.label(),
        format_prep(order),
        items.join(", "),
        overdue,
    );
}

fn print_report(report: &PerformanceReport) {
    let snapshot = &report.snapshot;
    println!("{} .. {}", report.range.start, report.range.end);
    println!(
        "orders: {} total, {} completed ({}%)",
        snapshot.total_orders, snapshot.completed_orders, report.completion_percent
    );
    println!("avg prep: {}m", report.average_prep_display_minutes);
    println!("orders/hour: {:.1}", snapshot.orders_per_hour);
    for (station, count, minutes) in report.station_rows() {
        println!("  {station:<10} {count:>5} orders  {minutes:>4}m avg");
    }
}

struct Console {
    config: KdsConfig,
    store: OrderStore,
}

impl Console {
    fn connect(config: KdsConfig) -> anyhow::Result<Self> {
        let api = HttpKdsApi::from_config(&config.api).context("building HTTP client")?;
        Self::with_api(config, Arc::new(api))
    }

    fn with_api(config: KdsConfig, api: Arc<dyn KdsApi>) -> anyhow::Result<Self> {
        let store = OrderStore::new(config.business_id()?, api);
        Ok(Self { config, store })
    }

    /// Orders only; the performance endpoint is left alone
    async fn refresh(&self) -> anyhow::Result<()> {
        self.config
            .retry
            .run(|| self.store.refresh_orders())
            .await
            .context("refreshing orders")
    }

    async fn run(&self, command: Commands) -> anyhow::Result<()> {
        match command {
            Commands::List { station, status } => {
                let filter = OrderFilter::from_selection(station.as_deref(), status.as_deref())?;
                self.refresh().await?;
                for order in self.store.filtered(&filter) {
                    print_order(&order);
                }
            }
            Commands::Counts => {
                self.refresh().await?;
                for (status, count) in self.store.counts_by_status().iter() {
                    println!("{status:<10} {count}");
                }
                let stations: Vec<String> = self
                    .store
                    .stations_in_use()
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                println!("stations: {}", stations.join(", "));
            }
            Commands::Create {
                station,
                items,
                priority,
                due_in,
                assign,
            } => {
                let items = items
                    .iter()
                    .map(|spec| parse_item(spec))
                    .collect::<anyhow::Result<Vec<_>>>()?;
                let mut draft = OrderDraft::new(station, items).with_priority(Priority::new(priority)?);
                if let Some(minutes) = due_in {
                    draft = draft.with_target_time(Utc::now() + chrono::Duration::minutes(minutes));
                }
                if let Some(assignee) = assign {
                    draft = draft.with_assignee(assignee);
                }
                // Single attempt: a repeated POST may duplicate the order.
                let order = self.store.create_order(draft).await?;
                print_order(&order);
            }
            Commands::Advance { id, status } => {
                self.refresh().await?;
                let id = OrderRecordId::new(id);
                let order = self
                    .config
                    .retry
                    .run(|| self.store.transition(&id, status))
                    .await?;
                print_order(&order);
                let next: Vec<&str> = self
                    .store
                    .next_statuses(&id)?
                    .iter()
                    .map(|s| s.as_str())
                    .collect();
                if !next.is_empty() {
                    println!("next: {}", next.join(" | "));
                }
            }
            Commands::Assign { id, assignee } => {
                self.refresh().await?;
                let id = OrderRecordId::new(id);
                let order = self
                    .config
                    .retry
                    .run(|| self.store.assign(&id, assignee.clone()))
                    .await?;
                print_order(&order);
            }
            Commands::Performance { hours, start, end } => {
                let range = match (start, end) {
                    (Some(start), Some(end)) => DateRange::new(start, end)?,
                    _ => DateRange::trailing_hours(
                        Utc::now(),
                        hours.unwrap_or(self.config.performance_window_hours),
                    ),
                };
                let reporter = self.store.reporter();
                let business_id = self.store.business_id();
                let report = self
                    .config
                    .retry
                    .run(|| reporter.fetch_range(business_id, range))
                    .await?;
                print_report(&report);
            }
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = load_config(&cli)?;
    tracing::debug!(base_url = %config.api.base_url, business_id = %config.business_id, "config loaded");

    let console = Console::connect(config)?;
    console.run(cli.command).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use kds_test_utils::{business, order_with_status, t0, InMemoryKdsApi};

    #[test]
    fn parses_item_specs() {
        let item = parse_item("m1:Burger:2").unwrap();
        assert_eq!(item.menu_item_id(), "m1");
        assert_eq!(item.name(), "Burger");
        assert_eq!(item.quantity(), 2);

        let with_colon = parse_item("m2:Soup: du jour:1");
        assert!(with_colon.is_err());
        assert!(parse_item("m1:Burger").is_err());
        assert!(parse_item("m1:Burger:0").is_err());
    }

    #[test]
    fn cli_parses_create_command() {
        let cli = Cli::try_parse_from([
            "kds", "--business", "bistro-42", "create", "--station", "grill", "--item",
            "m1:Burger:2", "--priority", "2",
        ])
        .unwrap();
        assert_eq!(cli.business.as_deref(), Some("bistro-42"));
        match cli.command {
            Commands::Create {
                station, items, priority, ..
            } => {
                assert_eq!(station, Station::Grill);
                assert_eq!(items, vec!["m1:Burger:2".to_string()]);
                assert_eq!(priority, 2);
            }
            _ => panic!("expected create"),
        }
    }

    #[test]
    fn cli_parses_status_names() {
        let cli = Cli::try_parse_from(["kds", "advance", "ord-1", "ready"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Advance { status: OrderStatus::Ready, .. }
        ));
        assert!(Cli::try_parse_from(["kds", "advance", "ord-1", "eaten"]).is_err());
    }

    fn console_over(api: Arc<InMemoryKdsApi>) -> Console {
        let config = KdsConfig::new()
            .with_business_id(business().as_str())
            .with_retry(kds_core::RetryPolicy::default().with_max_attempts(1));
        Console::with_api(config, api).unwrap()
    }

    #[tokio::test]
    async fn advance_and_assign_work_during_performance_outage() {
        let api = Arc::new(InMemoryKdsApi::new().with_clock(t0()));
        api.seed(order_with_status("ord-7", Station::Grill, OrderStatus::Pending, t0()));
        api.set_performance_outage(true);
        let console = console_over(api.clone());

        console
            .run(Commands::Advance {
                id: "ord-7".to_string(),
                status: OrderStatus::Preparing,
            })
            .await
            .unwrap();
        console
            .run(Commands::Assign {
                id: "ord-7".to_string(),
                assignee: "chef-ana".to_string(),
            })
            .await
            .unwrap();

        let orders = api.orders();
        let order = &orders[0];
        assert_eq!(order.status, OrderStatus::Preparing);
        assert_eq!(order.assigned_to.as_deref(), Some("chef-ana"));
        assert_eq!(api.calls().performance, 0);
    }

    #[tokio::test]
    async fn performance_command_reports_outage() {
        let api = Arc::new(InMemoryKdsApi::new());
        api.set_performance_outage(true);
        let console = console_over(api);

        let result = console
            .run(Commands::Performance {
                hours: Some(2),
                start: None,
                end: None,
            })
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from([
            "kds", "--api-url", "http://kds.test", "--business", "diner", "counts",
        ])
        .unwrap();
        let config = load_config(&cli).unwrap();
        assert_eq!(config.api.base_url, "http://kds.test");
        assert_eq!(config.business_id, "diner");
    }
}
