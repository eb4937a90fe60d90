use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand};
use prime_market_data::{
    AssetPair, AssetPairKnownProviders, MarketDataService, Network, RequestedPairs,
    RetryClass,
};
use serde_json::{json, Value};

pub const DEFAULT_ORDER_BOOK_DEPTH: usize = 20;

#[derive(Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Configuration document (overrides PRIME_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Find the exchange that can price a pair
    Discover(PairArgs),

    /// Latest price of one or more pairs, converting through an intermediary if needed
    Price(PricesArgs),

    /// Quotes for one pair from every exchange listing it
    Quotes(PairArgs),

    /// 24h traded volume of one pair across exchanges
    Volumes(PairArgs),

    /// Order book of a pair on one exchange
    OrderBook(OrderBookArgs),

    /// Pairs listed by one exchange
    Pairs(NetworkArgs),
}

#[derive(Args)]
pub struct PairArgs {
    /// Pair such as BTC_USD, BTC/USD or BTC-USD
    pub pair: String,

    /// Restrict to one exchange
    #[arg(long)]
    pub network: Option<String>,
}

#[derive(Args)]
pub struct PricesArgs {
    #[arg(required = true)]
    pub pairs: Vec<String>,

    /// Preferred exchange
    #[arg(long)]
    pub network: Option<String>,
}

#[derive(Args)]
pub struct OrderBookArgs {
    pub pair: String,

    #[arg(long)]
    pub network: String,

    #[arg(long, default_value_t = DEFAULT_ORDER_BOOK_DEPTH)]
    pub depth: usize,
}

#[derive(Args)]
pub struct NetworkArgs {
    #[arg(long)]
    pub network: String,

    /// Also fetch prices for every listed pair
    #[arg(long)]
    pub with_prices: bool,
}

fn parse_pair(raw: &str) -> anyhow::Result<AssetPair> {
    raw.parse::<AssetPair>()
        .with_context(|| format!("'{}' is not a pair", raw))
}

fn describe(known: &AssetPairKnownProviders) -> Value {
    json!({
        "provider": known.provider.id(),
        "network": known.network(),
        "pair": known.pair_for_provider(),
        "is_reversed": known.is_reversed,
        "via": known.intermediary(),
        "second_leg": known.via.as_deref().map(describe),
    })
}

pub async fn run(service: &MarketDataService, cmd: Command) -> anyhow::Result<Value> {
    match cmd {
        Command::Discover(args) => {
            let pair = parse_pair(&args.pair)?;
            let network = args.network.map(Network::new);
            let (known, diagnostics) = service
                .discovery
                .discover_with_diagnostics(&pair, network.as_ref())
                .await;
            tracing::debug!("Discovery of {}: {}", pair, diagnostics.summary());

            let skipped: Vec<Value> = diagnostics
                .skip_reasons()
                .into_iter()
                .map(|(id, reason)| json!({ "provider": id, "reason": reason.to_string() }))
                .collect();
            Ok(json!({
                "pair": pair,
                "match": known.as_ref().map(describe),
                "skipped": skipped,
            }))
        }
        Command::Price(args) => {
            let pairs = args
                .pairs
                .iter()
                .map(|p| parse_pair(p))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let network = args.network.map(Network::new);
            let results = service
                .coordinator
                .get_latest_prices(&pairs, network.as_ref())
                .await;

            let rows: Vec<Value> = pairs
                .iter()
                .zip(results)
                .map(|(pair, result)| match result {
                    Ok(price) => json!(price),
                    Err(e) => json!({
                        "pair": pair,
                        "error": e.to_string(),
                        "retryable": e.retry_class() != RetryClass::Never,
                    }),
                })
                .collect();
            Ok(Value::Array(rows))
        }
        Command::Quotes(args) => {
            let pair = parse_pair(&args.pair)?;
            let mut prices = service.aggregator.prices_for_pair(&pair).await?;
            if let Some(network) = args.network.map(Network::new) {
                prices.retain(|p| p.network == network);
            }
            Ok(json!(prices))
        }
        Command::Volumes(args) => {
            let pair = parse_pair(&args.pair)?;
            let volumes = service.aggregator.volumes_for_pair(&pair).await?;
            Ok(json!(volumes))
        }
        Command::OrderBook(args) => {
            let pair = parse_pair(&args.pair)?;
            let book = service
                .aggregator
                .order_book(&Network::new(&args.network), &pair, args.depth)
                .await?;
            Ok(json!(book))
        }
        Command::Pairs(args) => {
            let network = Network::new(&args.network);
            if !service.registry.networks().contains(&network) {
                return Err(anyhow!("no exchange is configured for network '{}'", network));
            }
            if args.with_prices {
                let prices = service
                    .aggregator
                    .prices_on_network(&network, RequestedPairs::All)
                    .await?;
                return Ok(json!(prices));
            }

            let pairs = service.pair_cache.get_pairs_for_network(&network).await;
            let listed: Vec<String> = pairs.iter().map(|p| p.to_string()).collect();
            Ok(json!({ "network": network, "pairs": listed }))
        }
    }
}
