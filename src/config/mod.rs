use rust_decimal::Decimal;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_API_URL: &str = "https://api.hyperliquid.xyz";
const DEFAULT_THRESHOLD_SWEEP: &str = "0.25,0.5,1,1.5,2,3,4,5,6,7,8,9,10";

/// Largest hypothetical price move accepted, in percent.
pub const MAX_THRESHOLD_PCT: u32 = 100;

/// Which entry point the run mirrors. The collector keeps only large
/// positions; the dashboard keeps smaller ones too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Collector,
    Dashboard,
}

impl Profile {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "collector" => Profile::Collector,
            _ => Profile::Dashboard,
        }
    }

    pub fn default_min_position_value(&self) -> Decimal {
        match self {
            Profile::Collector => Decimal::from(25_000),
            Profile::Dashboard => Decimal::from(5_000),
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Profile::Collector => write!(f, "collector"),
            Profile::Dashboard => write!(f, "dashboard"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,

    // Upstream
    pub api_url: String,
    pub addresses_file: PathBuf,
    pub poll_interval_secs: u64,

    // Fetching
    pub max_workers: usize,
    pub inter_request_delay: Duration,
    pub max_retries: u32,
    pub backoff_base: Duration,

    // Normalization
    pub profile: Profile,
    pub min_position_value: Decimal,
    pub coin_filter: Option<String>,

    // Analysis
    pub top_n: usize,
    pub threshold_sweep: Vec<Decimal>,
    pub tracked_coins: Vec<String>,
    pub impact_threshold_pct: Decimal,
    pub impact_significance_floor: Decimal,
    pub highlight_min_value: Decimal,
    pub highlight_per_side: usize,
    pub risk_band_width_pct: Decimal,
}

impl Default for AppConfig {
    fn default() -> Self {
        let profile = Profile::Dashboard;
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            api_url: DEFAULT_API_URL.into(),
            addresses_file: PathBuf::from("data/whale_addresses.txt"),
            poll_interval_secs: 60,
            max_workers: 10,
            inter_request_delay: Duration::from_millis(100),
            max_retries: 3,
            backoff_base: Duration::from_millis(500),
            profile,
            min_position_value: profile.default_min_position_value(),
            coin_filter: None,
            top_n: 30,
            threshold_sweep: parse_thresholds(DEFAULT_THRESHOLD_SWEEP).unwrap_or_default(),
            tracked_coins: vec!["BTC".into()],
            impact_threshold_pct: Decimal::from(3),
            impact_significance_floor: Decimal::from(10_000),
            highlight_min_value: Decimal::from(2_000_000),
            highlight_per_side: 2,
            risk_band_width_pct: Decimal::from(2),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let profile = Profile::from_str(&env::var("PROFILE").unwrap_or_else(|_| "dashboard".into()));

        let min_position_value = match env::var("MIN_POSITION_VALUE") {
            Ok(raw) => parse_decimal("MIN_POSITION_VALUE", &raw)?,
            Err(_) => profile.default_min_position_value(),
        };

        let threshold_sweep = match env::var("THRESHOLD_SWEEP") {
            Ok(raw) => parse_thresholds(&raw)?,
            Err(_) => defaults.threshold_sweep,
        };
        if threshold_sweep.is_empty() {
            anyhow::bail!("THRESHOLD_SWEEP must contain at least one percentage");
        }

        let tracked_coins = env::var("TRACKED_COINS")
            .map(|raw| parse_coins(&raw))
            .unwrap_or(defaults.tracked_coins);

        let impact_threshold_pct = env_decimal("IMPACT_THRESHOLD_PCT", defaults.impact_threshold_pct)?;
        if !threshold_in_range(impact_threshold_pct) {
            anyhow::bail!("IMPACT_THRESHOLD_PCT must be in (0, {MAX_THRESHOLD_PCT}], got {impact_threshold_pct}");
        }

        let risk_band_width_pct = env_decimal("RISK_BAND_WIDTH_PCT", defaults.risk_band_width_pct)?;
        if risk_band_width_pct <= Decimal::ZERO {
            anyhow::bail!("RISK_BAND_WIDTH_PCT must be positive, got {risk_band_width_pct}");
        }

        let max_workers: usize = env_or("MAX_WORKERS", defaults.max_workers)?;
        if max_workers == 0 {
            anyhow::bail!("MAX_WORKERS must be at least 1");
        }

        Ok(Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: env_or("PORT", defaults.port)?,

            api_url: env::var("HYPERLIQUID_API_URL").unwrap_or(defaults.api_url),
            addresses_file: env::var("ADDRESSES_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.addresses_file),
            poll_interval_secs: env_or("POLL_INTERVAL_SECS", defaults.poll_interval_secs)?,

            max_workers,
            inter_request_delay: env_secs("INTER_REQUEST_DELAY_SECS", defaults.inter_request_delay)?,
            max_retries: env_or("MAX_RETRIES", defaults.max_retries)?,
            backoff_base: env_secs("BACKOFF_BASE_SECS", defaults.backoff_base)?,

            profile,
            min_position_value,
            coin_filter: env::var("COIN_FILTER")
                .ok()
                .map(|c| c.trim().to_uppercase())
                .filter(|c| !c.is_empty()),

            top_n: env_or("TOP_N", defaults.top_n)?,
            threshold_sweep,
            tracked_coins,
            impact_threshold_pct,
            impact_significance_floor: env_decimal(
                "IMPACT_SIGNIFICANCE_FLOOR",
                defaults.impact_significance_floor,
            )?,
            highlight_min_value: env_decimal("HIGHLIGHT_MIN_VALUE", defaults.highlight_min_value)?,
            highlight_per_side: env_or("HIGHLIGHT_PER_SIDE", defaults.highlight_per_side)?,
            risk_band_width_pct,
        })
    }

    /// Returns true if `coin` takes part in risk and cascade analysis.
    pub fn is_tracked(&self, coin: &str) -> bool {
        self.tracked_coins.iter().any(|c| c == coin)
    }
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{key} is invalid: {e}")),
        Err(_) => Ok(default),
    }
}

fn env_decimal(key: &str, default: Decimal) -> anyhow::Result<Decimal> {
    match env::var(key) {
        Ok(raw) => parse_decimal(key, &raw),
        Err(_) => Ok(default),
    }
}

fn env_secs(key: &str, default: Duration) -> anyhow::Result<Duration> {
    match env::var(key) {
        Ok(raw) => {
            let secs: f64 = raw
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("{key} is invalid: {e}"))?;
            Duration::try_from_secs_f64(secs).map_err(|e| anyhow::anyhow!("{key} is invalid: {e}"))
        }
        Err(_) => Ok(default),
    }
}

fn parse_decimal(key: &str, raw: &str) -> anyhow::Result<Decimal> {
    Decimal::from_str(raw.trim()).map_err(|e| anyhow::anyhow!("{key} is invalid: {e}"))
}

/// Parse a comma-separated list of percentages, sorted ascending and
/// de-duplicated. Entries must lie in `(0, MAX_THRESHOLD_PCT]`.
pub fn parse_thresholds(raw: &str) -> anyhow::Result<Vec<Decimal>> {
    let mut thresholds = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse_decimal("THRESHOLD_SWEEP", s))
        .collect::<anyhow::Result<Vec<_>>>()?;

    if let Some(bad) = thresholds.iter().find(|t| !threshold_in_range(**t)) {
        anyhow::bail!("THRESHOLD_SWEEP entries must be in (0, {MAX_THRESHOLD_PCT}], got {bad}");
    }

    thresholds.sort();
    thresholds.dedup();
    Ok(thresholds)
}

fn threshold_in_range(pct: Decimal) -> bool {
    pct > Decimal::ZERO && pct <= Decimal::from(MAX_THRESHOLD_PCT)
}

pub fn parse_coins(raw: &str) -> Vec<String> {
    let mut coins: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect();
    coins.dedup();
    coins
}
