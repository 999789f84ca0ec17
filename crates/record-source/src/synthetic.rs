use crate::{RecordSource, SourceError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Map, Value};

/// Timestamps of generated events are drawn from the million milliseconds
/// before this instant (2025-01-01T00:00:00Z), so output does not depend on
/// the wall clock.
const REFERENCE_EPOCH_MS: i64 = 1_735_689_600_000;

const COUNTRIES: &[&str] = &["US", "DE", "FR", "IN", "CN", "BR", "NG", "JP"];
const CURRENCIES: &[&str] = &["USD", "EUR", "JPY", "INR", "BRL", "GBP"];
const STATUSES: &[&str] = &["pending", "completed", "failed", "refunded"];
const EVENT_TYPES: &[&str] = &["click", "view", "purchase", "login", "logout"];

/// Generates sparse, deterministic documents.
///
/// Record `i` is derived from an RNG seeded with `seed + i` alone, so any
/// record can be regenerated on its own. Each record is one of four kinds
/// (user, transaction, product, event) and carries each optional attribute
/// with a per-record probability between 0.2 and 1.0.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    seed: u64,
    count: usize,
}

impl SyntheticSource {
    pub const DEFAULT_COUNT: usize = 10;

    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            count: Self::DEFAULT_COUNT,
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// The document at `index` for `query`.
    pub fn generate(&self, query: &str, index: usize) -> Value {
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(index as u64));
        let density = 0.2 + rng.random::<f64>() * 0.8;

        let mut properties = Map::new();
        let (kind, label) = match rng.random_range(0..4) {
            0 => user(&mut rng, density, &mut properties),
            1 => transaction(&mut rng, density, &mut properties),
            2 => product(&mut rng, density, &mut properties),
            _ => event(&mut rng, density, &mut properties),
        };
        properties.insert("label".to_string(), Value::String(label));
        properties.insert(
            "context".to_string(),
            Value::String(format!("{}, {kind}", query.trim())),
        );

        json!({
            "type": kind,
            "id": index,
            "properties": properties,
        })
    }
}

fn pick<'a>(rng: &mut StdRng, choices: &[&'a str]) -> &'a str {
    choices[rng.random_range(0..choices.len())]
}

fn maybe(rng: &mut StdRng, density: f64) -> bool {
    rng.random::<f64>() < density
}

fn user(
    rng: &mut StdRng,
    density: f64,
    properties: &mut Map<String, Value>,
) -> (&'static str, String) {
    let username = format!("user_{}", rng.random_range(0..100_000));
    if maybe(rng, density) {
        properties.insert("username".to_string(), json!(username));
    }
    if maybe(rng, density) {
        let email = format!("user{}@example.com", rng.random_range(0..1000));
        properties.insert("email".to_string(), json!(email));
    }
    if maybe(rng, density) {
        properties.insert("country".to_string(), json!(pick(rng, COUNTRIES)));
    }
    ("user", username)
}

fn transaction(
    rng: &mut StdRng,
    density: f64,
    properties: &mut Map<String, Value>,
) -> (&'static str, String) {
    let amount = rng.random::<f64>() * 10_000.0;
    if maybe(rng, density) {
        properties.insert("amount".to_string(), json!(amount));
    }
    let currency = pick(rng, CURRENCIES);
    if maybe(rng, density) {
        properties.insert("currency".to_string(), json!(currency));
    }
    if maybe(rng, density) {
        properties.insert("status".to_string(), json!(pick(rng, STATUSES)));
    }
    ("transaction", format!("{amount:.2} {currency}"))
}

fn product(
    rng: &mut StdRng,
    density: f64,
    properties: &mut Map<String, Value>,
) -> (&'static str, String) {
    let name = format!("Product-{}", rng.random_range(0..9999));
    if maybe(rng, density) {
        properties.insert("name".to_string(), json!(name));
    }
    if maybe(rng, density) {
        properties.insert("price".to_string(), json!(rng.random::<f64>() * 500.0));
    }
    if maybe(rng, density) {
        properties.insert("inStock".to_string(), json!(rng.random::<bool>()));
    }
    ("product", name)
}

fn event(
    rng: &mut StdRng,
    density: f64,
    properties: &mut Map<String, Value>,
) -> (&'static str, String) {
    let event_type = pick(rng, EVENT_TYPES);
    if maybe(rng, density) {
        properties.insert("eventType".to_string(), json!(event_type));
    }
    if maybe(rng, density) {
        let timestamp = REFERENCE_EPOCH_MS - rng.random_range(0..1_000_000i64);
        properties.insert("timestamp".to_string(), json!(timestamp));
    }
    if maybe(rng, density) {
        properties.insert("userId".to_string(), json!(rng.random_range(0..10_000)));
    }
    ("event", event_type.to_string())
}

#[async_trait::async_trait]
impl RecordSource for SyntheticSource {
    fn describe(&self) -> String {
        format!("synthetic (seed {}, {} records)", self.seed, self.count)
    }

    async fn fetch(&self, query: &str) -> Result<Vec<String>, SourceError> {
        Ok((0..self.count)
            .map(|index| self.generate(query, index).to_string())
            .collect())
    }
}
