//! System-wide defaults. Individual providers and the unified store may
//! override these via configuration, but these values document the
//! defaults a fresh deployment starts with.

/// Default embedding dimensionality (D in the data model).
pub const DEFAULT_EMBEDDING_DIM: usize = 1536;

/// Characters beyond which input text is truncated before embedding,
/// rather than rejected.
pub const MAX_EMBEDDING_INPUT_CHARS: usize = 32_000;

/// Default maximum number of texts per embedding batch call.
pub const DEFAULT_EMBEDDING_BATCH_SIZE: usize = 100;

/// Query cache entry lifetime.
pub const CACHE_TTL_SECS: u64 = 300;

/// Maximum number of entries retained in the query cache before
/// oldest-first eviction kicks in.
pub const DEFAULT_CACHE_CAPACITY: u64 = 10_000;

/// Default deadline for any single outbound operation (provider call,
/// embedding call).
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 30;

/// Default deadline for best-effort background replication to a
/// secondary provider. Longer than the foreground deadline because
/// nothing is waiting on it.
pub const DEFAULT_REPLICATION_TIMEOUT_SECS: u64 = 120;

/// Default minimum/maximum size of the pgvector connection pool.
pub const DEFAULT_PG_POOL_MIN: usize = 2;
pub const DEFAULT_PG_POOL_MAX: usize = 10;

/// Default number of concurrently-processed items in a bulk store,
/// sized to the default primary pool so a batch can't starve
/// foreground traffic.
pub const DEFAULT_BULK_CONCURRENCY: usize = DEFAULT_PG_POOL_MAX;

/// Default outbound retry count before a provider call is considered
/// exhausted.
pub const DEFAULT_RETRY_COUNT: u32 = 3;

/// Default dedup semantic-match similarity threshold.
pub const DEFAULT_DEDUP_THRESHOLD: f64 = 0.95;

/// Age, in days, beyond which a dedup candidate is routed to
/// `REVIEW_NEEDED` instead of `DUPLICATE`.
pub const DEDUP_REVIEW_AGE_DAYS: i64 = 30;

/// Half-life, in days, used by the ADM temporal-freshness sub-signal.
pub const ADM_FRESHNESS_HALF_LIFE_DAYS: f64 = 30.0;

/// Query request bounds.
pub const MIN_QUERY_LIMIT: usize = 1;
pub const MAX_QUERY_LIMIT: usize = 100;

/// Ranking weights for combining similarity and importance in query results.
pub const RANK_SIMILARITY_WEIGHT: f64 = 0.7;
pub const RANK_IMPORTANCE_WEIGHT: f64 = 0.3;
