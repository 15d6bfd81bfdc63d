//! Shared constants for tablecall.

/// Logical broadcast channel every gateway and view agrees on.
pub const DEFAULT_CHANNEL_NAME: &str = "service-calls";

/// Default reconciliation period for client views.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Upper bound accepted for the reconciliation period (one hour).
pub const MAX_POLL_INTERVAL_SECS: u64 = 3600;

/// Buffered events per subscriber on in-process broadcast senders.
/// Slower subscribers lag and rely on reconciliation.
pub const BROADCAST_CAPACITY: usize = 256;

/// Buffered change-feed events per subscriber.
pub const CHANGE_FEED_CAPACITY: usize = 256;

/// PostgreSQL NOTIFY channel carrying the change feed.
pub const CHANGE_FEED_PG_CHANNEL: &str = "tablecall_changes";

/// Maximum number of IDs in a batch resolution (DoS protection).
pub const MAX_BATCH_IDS: usize = 500;

/// Longest accepted caller-supplied call id.
pub const MAX_CALL_ID_LEN: usize = 128;

/// Longest accepted table number.
pub const MAX_TABLE_NUMBER_LEN: usize = 32;

/// PostgreSQL connection pool: maximum connections.
pub const PG_POOL_MAX_CONNECTIONS: u32 = 20;

/// PostgreSQL connection pool: acquire timeout in seconds.
pub const PG_POOL_ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// PostgreSQL connection pool: idle timeout in seconds.
pub const PG_POOL_IDLE_TIMEOUT_SECS: u64 = 300;

/// Request timeout for relay publishes.
pub const RELAY_TIMEOUT_SECS: u64 = 5;

/// Message returned to diners when no transport accepted their request.
pub const TOTAL_FAILURE_MESSAGE: &str = "could not send request, please try again";

/// Longest a resolution waits for in-flight durable inserts of its targets.
pub const IN_FLIGHT_WRITE_WAIT_SECS: u64 = 10;

/// Connect timeout for the remote event stream.
pub const EVENT_STREAM_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Pause before reconnecting a dropped remote event stream.
pub const EVENT_STREAM_RETRY_SECS: u64 = 1;
