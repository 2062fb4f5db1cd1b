//! Redis client with retry logic
//!
//! Wraps a multiplexed connection with exponential-backoff retries and the small
//! set of commands the revocation store needs: conditional writes with an
//! absolute expiry, existence checks and per-subject hashes.

use std::collections::HashMap;
use std::time::Duration;

use redis::{aio::MultiplexedConnection, AsyncCommands, Client, RedisError, RedisResult};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use sg_shared::config::CacheConfig;

use crate::InfrastructureError;

/// Redis client with connection reuse and retry logic
///
/// Cloning is cheap; all clones share one multiplexed connection.
#[derive(Clone)]
pub struct RedisClient {
    /// Redis multiplexed connection for async operations
    connection: MultiplexedConnection,
    /// Configuration used to create this client
    config: CacheConfig,
    /// Maximum number of attempts per operation
    max_retries: u32,
    /// Base delay between retries (exponential backoff)
    retry_delay_ms: u64,
}

impl RedisClient {
    /// Create a new Redis client using the retry settings from `config`
    ///
    /// # Arguments
    /// * `config` - Cache configuration settings
    ///
    /// # Returns
    /// * `Result<Self, InfrastructureError>` - Redis client or error
    pub async fn new(config: CacheConfig) -> Result<Self, InfrastructureError> {
        let max_retries = config.max_retries.max(1);
        let retry_delay_ms = config.retry_delay_ms;
        Self::new_with_retry_config(config, max_retries, retry_delay_ms).await
    }

    /// Create a new Redis client with custom retry configuration
    pub async fn new_with_retry_config(
        config: CacheConfig,
        max_retries: u32,
        retry_delay_ms: u64,
    ) -> Result<Self, InfrastructureError> {
        info!(url = %mask_url(&config.url), "Creating Redis client");

        let client = Client::open(config.url.as_str()).map_err(|e| {
            error!("Failed to parse Redis URL: {}", e);
            InfrastructureError::Config(format!("Invalid Redis URL: {}", e))
        })?;

        let connection =
            Self::create_connection_with_retry(client, max_retries, retry_delay_ms).await?;

        info!("Redis client created successfully");

        Ok(Self {
            connection,
            config,
            max_retries,
            retry_delay_ms,
        })
    }

    async fn create_connection_with_retry(
        client: Client,
        max_retries: u32,
        retry_delay_ms: u64,
    ) -> Result<MultiplexedConnection, InfrastructureError> {
        let mut attempts = 0;
        let mut delay = retry_delay_ms;

        loop {
            attempts += 1;
            debug!("Attempting to connect to Redis (attempt {})", attempts);

            match client.get_multiplexed_async_connection().await {
                Ok(connection) => {
                    info!("Successfully connected to Redis");
                    return Ok(connection);
                }
                Err(e) if attempts < max_retries => {
                    warn!(
                        "Failed to connect to Redis (attempt {}/{}): {}. Retrying in {}ms...",
                        attempts, max_retries, e, delay
                    );
                    sleep(Duration::from_millis(delay)).await;
                    delay = (delay * 2).min(5000);
                }
                Err(e) => {
                    error!(
                        "Failed to connect to Redis after {} attempts: {}",
                        attempts, e
                    );
                    return Err(InfrastructureError::Cache(e));
                }
            }
        }
    }

    /// Prefix a key with the configured namespace
    pub fn key(&self, key: &str) -> String {
        self.config.make_key(key)
    }

    /// `SET key value NX EXAT expires_at`
    ///
    /// # Returns
    /// * `Ok(true)` - The key was absent and has been written
    /// * `Ok(false)` - The key already existed; nothing was written
    pub async fn set_if_absent_until(
        &self,
        key: &str,
        value: &str,
        expires_at: i64,
    ) -> Result<bool, InfrastructureError> {
        debug!(key = %key, expires_at, "Conditional set");

        let result = self
            .execute_with_retry(|mut conn| {
                let key = key.to_string();
                let value = value.to_string();

                Box::pin(async move {
                    redis::cmd("SET")
                        .arg(key)
                        .arg(value)
                        .arg("NX")
                        .arg("EXAT")
                        .arg(expires_at)
                        .query_async::<_, Option<String>>(&mut conn)
                        .await
                })
            })
            .await;

        match result {
            Ok(reply) => Ok(reply.is_some()),
            Err(e) => {
                error!("Failed to set key '{}': {}", key, e);
                Err(InfrastructureError::Cache(e))
            }
        }
    }

    /// Get a value
    pub async fn get(&self, key: &str) -> Result<Option<String>, InfrastructureError> {
        let result = self
            .execute_with_retry(|mut conn| {
                let key = key.to_string();

                Box::pin(async move { conn.get::<_, Option<String>>(key).await })
            })
            .await;

        result.map_err(|e| {
            error!("Failed to get key '{}': {}", key, e);
            InfrastructureError::Cache(e)
        })
    }

    /// Check if a key exists
    pub async fn exists(&self, key: &str) -> Result<bool, InfrastructureError> {
        let result = self
            .execute_with_retry(|mut conn| {
                let key = key.to_string();

                Box::pin(async move { conn.exists::<_, bool>(key).await })
            })
            .await;

        result.map_err(|e| {
            error!("Failed to check key '{}' existence: {}", key, e);
            InfrastructureError::Cache(e)
        })
    }

    /// Set a hash field and keep the hash alive until at least `expires_at`
    ///
    /// The key expiry is only ever extended, never shortened.
    pub async fn hash_set_until(
        &self,
        key: &str,
        field: &str,
        value: &str,
        expires_at: i64,
    ) -> Result<(), InfrastructureError> {
        let now = chrono::Utc::now().timestamp();

        let result = self
            .execute_with_retry(|mut conn| {
                let key = key.to_string();
                let field = field.to_string();
                let value = value.to_string();

                Box::pin(async move {
                    conn.hset::<_, _, _, ()>(&key, field, value).await?;

                    let ttl: i64 = conn.ttl(&key).await?;
                    // -1: no expiry yet; otherwise extend only when the new cap is later
                    if ttl == -1 || now + ttl < expires_at {
                        redis::cmd("EXPIREAT")
                            .arg(&key)
                            .arg(expires_at)
                            .query_async::<_, ()>(&mut conn)
                            .await?;
                    }
                    Ok(())
                })
            })
            .await;

        result.map_err(|e| {
            error!("Failed to set hash field on '{}': {}", key, e);
            InfrastructureError::Cache(e)
        })
    }

    /// All values of a hash, keyed by field
    pub async fn hash_values(
        &self,
        key: &str,
    ) -> Result<HashMap<String, String>, InfrastructureError> {
        let result = self
            .execute_with_retry(|mut conn| {
                let key = key.to_string();

                Box::pin(async move { conn.hgetall::<_, HashMap<String, String>>(key).await })
            })
            .await;

        result.map_err(|e| {
            error!("Failed to read hash '{}': {}", key, e);
            InfrastructureError::Cache(e)
        })
    }

    /// Remove fields from a hash
    pub async fn hash_delete(&self, key: &str, fields: &[String]) -> Result<(), InfrastructureError> {
        if fields.is_empty() {
            return Ok(());
        }

        let result = self
            .execute_with_retry(|mut conn| {
                let key = key.to_string();
                let fields = fields.to_vec();

                Box::pin(async move { conn.hdel::<_, _, ()>(key, fields).await })
            })
            .await;

        result.map_err(|e| {
            error!("Failed to delete hash fields on '{}': {}", key, e);
            InfrastructureError::Cache(e)
        })
    }

    /// Check if the Redis connection is healthy
    ///
    /// Performs a PING command to verify connectivity.
    pub async fn health_check(&self) -> Result<bool, InfrastructureError> {
        debug!("Performing Redis health check");

        let result = self
            .execute_with_retry(|mut conn| {
                Box::pin(async move {
                    redis::cmd("PING").query_async::<_, String>(&mut conn).await
                })
            })
            .await;

        match result {
            Ok(response) if response == "PONG" => Ok(true),
            Ok(response) => {
                warn!("Redis health check returned unexpected response: {}", response);
                Ok(false)
            }
            Err(e) => {
                error!("Redis health check failed: {}", e);
                Err(InfrastructureError::Cache(e))
            }
        }
    }

    /// Execute a Redis operation with exponential-backoff retry
    async fn execute_with_retry<F, T>(&self, operation: F) -> RedisResult<T>
    where
        F: Fn(
            MultiplexedConnection,
        ) -> std::pin::Pin<Box<dyn std::future::Future<Output = RedisResult<T>> + Send>>,
    {
        let mut attempts = 0;
        let mut delay = self.retry_delay_ms;

        loop {
            attempts += 1;
            let conn = self.connection.clone();

            match operation(conn).await {
                Ok(result) => return Ok(result),
                Err(e) if attempts < self.max_retries && is_retriable_error(&e) => {
                    warn!(
                        "Redis operation failed (attempt {}/{}): {}. Retrying in {}ms...",
                        attempts, self.max_retries, e, delay
                    );
                    sleep(Duration::from_millis(delay)).await;
                    delay = (delay * 2).min(5000);
                }
                Err(e) => {
                    error!("Redis operation failed after {} attempts: {}", attempts, e);
                    return Err(e);
                }
            }
        }
    }
}

/// Whether a Redis error is transient and the operation may be retried
pub(crate) fn is_retriable_error(error: &RedisError) -> bool {
    matches!(
        error.kind(),
        redis::ErrorKind::IoError
            | redis::ErrorKind::ClientError
            | redis::ErrorKind::BusyLoadingError
            | redis::ErrorKind::TryAgain
    )
}

/// Mask credentials in a Redis URL for logging
pub(crate) fn mask_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(proto_end) = url.find("://") {
            let proto = &url[..proto_end + 3];
            let host_part = &url[at_pos..];
            return format!("{}****{}", proto, host_part);
        }
    }
    url.to_string()
}
