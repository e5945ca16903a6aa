//! Synthetic record generation.
//!
//! Produces transaction records grouped into fixed-size chunks, each chunk
//! stamped with its own day so a date-range query can select a subset of
//! chunks. Every `sample_stride`-th key is set aside for deletion checks.

use std::collections::HashSet;
use std::ops::RangeInclusive;

use chrono::{Days, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::batch::{Batch, Operation};
use crate::error::{HarnessError, HarnessResult};
use crate::query::RangeQuery;
use crate::record::{KeyPath, Record};

pub const DEFAULT_RECORD_COUNT: usize = 150_000;
pub const DEFAULT_CHUNK_SIZE: usize = 1_000;
pub const DEFAULT_SAMPLE_STRIDE: usize = 50;

/// How chunk dates advance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkDateMode {
    /// Chunk `k` is stamped `base_date + k` days
    #[default]
    PerChunk,
    /// Every chunk is stamped `base_date`
    Shared,
}

/// Transaction kinds carried in the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionType {
    InterestCharge,
    InterestCredit,
    Deposit,
    Advance,
}

impl TransactionType {
    pub fn label(self) -> &'static str {
        match self {
            TransactionType::InterestCharge => "Interest Charge",
            TransactionType::InterestCredit => "Interest Credit",
            TransactionType::Deposit => "Deposit",
            TransactionType::Advance => "Advance",
        }
    }
}

/// Generator parameters.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Collection the records are written under
    pub collection: KeyPath,
    /// Total records to produce
    pub record_count: usize,
    /// Maximum operations per chunk
    pub chunk_size: usize,
    /// Every n-th record is sampled for deletion
    pub sample_stride: usize,
    /// Day stamped on the first chunk
    pub base_date: NaiveDate,
    /// Whether chunk dates advance
    pub date_mode: ChunkDateMode,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            collection: KeyPath::parse("transactions").unwrap_or_default(),
            record_count: DEFAULT_RECORD_COUNT,
            chunk_size: DEFAULT_CHUNK_SIZE,
            sample_stride: DEFAULT_SAMPLE_STRIDE,
            base_date: default_base_date(),
            date_mode: ChunkDateMode::PerChunk,
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> HarnessResult<()> {
        if self.chunk_size == 0 {
            return Err(HarnessError::InvalidConfig(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        if self.sample_stride == 0 {
            return Err(HarnessError::InvalidConfig(
                "sample_stride must be greater than 0".to_string(),
            ));
        }
        if self.collection.is_root() {
            return Err(HarnessError::InvalidConfig(
                "collection must not be the root".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of chunks `record_count` records occupy.
    pub fn chunk_count(&self) -> usize {
        self.record_count.div_ceil(self.chunk_size.max(1))
    }
}

/// 2017-01-01, the first day of the reference data set.
pub fn default_base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2017, 1, 1).unwrap_or_default()
}

fn offset_date(base: NaiveDate, offset_days: u64) -> HarnessResult<NaiveDate> {
    base.checked_add_days(Days::new(offset_days))
        .ok_or_else(|| HarnessError::InvalidConfig(format!("date overflow: {} + {}d", base, offset_days)))
}

/// Milliseconds at 00:00:00.000 UTC of `base + offset_days`.
pub fn day_start_millis(base: NaiveDate, offset_days: u64) -> HarnessResult<i64> {
    let date = offset_date(base, offset_days)?;
    let start = date
        .and_hms_milli_opt(0, 0, 0, 0)
        .ok_or_else(|| HarnessError::InvalidConfig(format!("invalid start of day for {}", date)))?;
    Ok(Utc.from_utc_datetime(&start).timestamp_millis())
}

/// Milliseconds at 23:59:59.999 UTC of `base + offset_days`.
pub fn day_end_millis(base: NaiveDate, offset_days: u64) -> HarnessResult<i64> {
    let date = offset_date(base, offset_days)?;
    let end = date
        .and_hms_milli_opt(23, 59, 59, 999)
        .ok_or_else(|| HarnessError::InvalidConfig(format!("invalid end of day for {}", date)))?;
    Ok(Utc.from_utc_datetime(&end).timestamp_millis())
}

/// A daily interest transaction stamped at `published_ms`.
pub fn transaction_record(id: &str, published_ms: i64) -> Record {
    Record::new()
        .with("account_id", "1932-324sdf-324sdf-124124")
        .with("account_interest_bal", 100.0)
        .with("account_name", "Test account")
        .with("account_principal_bal", 1000.0)
        .with("amount", 3.24)
        .with("description", "Daily interest computation")
        .with("id", id)
        .with("object", "transaction")
        .with("org_available_funds", 10000.0)
        .with("org_id", "org-1348293402-23xvasdf-werd")
        .with("owner", "System")
        .with("status", "approved")
        .with("type", TransactionType::InterestCharge.label())
        .with("rate", 0.0475)
        .with("published", published_ms)
        .with("updated", published_ms)
        .with("user", "System")
}

/// `{id: i, name: "test"}` upserts for `collection/i`.
pub fn numbered_records(collection: &KeyPath, ids: RangeInclusive<i64>) -> HarnessResult<Batch> {
    let mut batch = Batch::new();
    for id in ids {
        let key = collection.child(&id.to_string())?;
        batch.upsert(key, Record::new().with("id", id).with("name", "test"));
    }
    Ok(batch)
}

/// Generated chunks plus the keys sampled for deletion.
#[derive(Debug, Clone, Default)]
pub struct ChunkSet {
    /// Batches in write order
    pub chunks: Vec<Batch>,
    /// Child keys (not full paths) sampled for deletion
    pub sampled_keys: Vec<String>,
}

impl ChunkSet {
    pub fn record_count(&self) -> usize {
        self.chunks.iter().map(Batch::upsert_count).sum()
    }

    /// Child keys of generated records the query is expected to return.
    pub fn keys_matching(&self, query: &RangeQuery) -> HashSet<String> {
        self.chunks
            .iter()
            .flat_map(|chunk| chunk.iter())
            .filter(|(key, _)| key.parent().as_ref() == Some(&query.path))
            .filter_map(|(key, op)| match op {
                Operation::Upsert(record) if query.matches(record) => {
                    key.last().map(str::to_string)
                }
                _ => None,
            })
            .collect()
    }

    /// One batch deleting every sampled key under `collection`.
    pub fn sampled_delete_batch(&self, collection: &KeyPath) -> HarnessResult<Batch> {
        let mut batch = Batch::new();
        for key in &self.sampled_keys {
            batch.delete(collection.child(key)?);
        }
        Ok(batch)
    }
}

/// Generates records with random v4 UUID keys.
pub fn generate(config: &GeneratorConfig) -> HarnessResult<ChunkSet> {
    generate_with_keys(config, |_| uuid::Uuid::new_v4().to_string())
}

/// Generates records with keys from `next_key`, called once per record index.
pub fn generate_with_keys(
    config: &GeneratorConfig,
    mut next_key: impl FnMut(usize) -> String,
) -> HarnessResult<ChunkSet> {
    config.validate()?;

    let mut chunk_stamps = Vec::with_capacity(config.chunk_count());
    for chunk_index in 0..config.chunk_count() {
        let offset = match config.date_mode {
            ChunkDateMode::PerChunk => chunk_index as u64,
            ChunkDateMode::Shared => 0,
        };
        chunk_stamps.push(day_end_millis(config.base_date, offset)?);
    }

    let mut set = ChunkSet::default();
    let mut seen = HashSet::with_capacity(config.record_count);
    let mut current = Batch::new();

    for i in 0..config.record_count {
        if current.len() == config.chunk_size {
            set.chunks.push(std::mem::take(&mut current));
        }

        let key = next_key(i);
        if !seen.insert(key.clone()) {
            return Err(HarnessError::InvalidConfig(format!(
                "key source produced duplicate key '{}'",
                key
            )));
        }
        let path = config.collection.child(&key)?;
        let published = chunk_stamps[i / config.chunk_size];
        current.upsert(path, transaction_record(&key, published));

        if i % config.sample_stride == 0 {
            set.sampled_keys.push(key);
        }
    }
    if !current.is_empty() {
        set.chunks.push(current);
    }

    tracing::info!(
        records = config.record_count,
        chunks = set.chunks.len(),
        sampled = set.sampled_keys.len(),
        "Generated test records"
    );
    Ok(set)
}
