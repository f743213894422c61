use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use super::resp::{encode_command, read_reply, Reply};
use super::StoreBackend;
use crate::config::StoreConfig;
use crate::error::StoreError;

/// A RESP-speaking backing-store client over one persistent TCP connection.
/// Commands are serialized per handle via an internal mutex rather than a
/// connection pool, so command framing on one handle is never interleaved.
pub struct RespStoreClient {
    config: StoreConfig,
    conn: Mutex<Option<BufReader<TcpStream>>>,
}

impl RespStoreClient {
    /// Dials the store, performs the `AUTH`/`SELECT` handshake, and
    /// returns a ready client. Any failure here is fatal
    /// (`StoreUnavailable`) — construction does not retry.
    pub async fn connect(config: StoreConfig) -> Result<Self, StoreError> {
        let stream = Self::dial(&config).await?;
        Ok(Self {
            config,
            conn: Mutex::new(Some(stream)),
        })
    }

    async fn dial(config: &StoreConfig) -> Result<BufReader<TcpStream>, StoreError> {
        let stream = tokio::time::timeout(
            config.connect_timeout,
            TcpStream::connect(&config.address),
        )
        .await
        .map_err(|_| StoreError::Unavailable(format!("connect timed out: {}", config.address)))?
        .map_err(|e| StoreError::Unavailable(format!("{}: {e}", config.address)))?;

        let mut stream = BufReader::new(stream);

        if let Some(password) = config.password.as_deref() {
            if !password.is_empty() {
                Self::run_handshake_command(&mut stream, &["AUTH", password]).await?;
            }
        }

        if config.db != 0 {
            let db = config.db.to_string();
            Self::run_handshake_command(&mut stream, &["SELECT", &db]).await?;
        }

        Ok(stream)
    }

    async fn run_handshake_command(
        stream: &mut BufReader<TcpStream>,
        args: &[&str],
    ) -> Result<(), StoreError> {
        stream.get_mut().write_all(&encode_command(args)).await?;
        stream.get_mut().flush().await?;
        match read_reply(stream).await? {
            Reply::Simple(s) if s == "OK" => Ok(()),
            other => Err(StoreError::Unavailable(format!(
                "unexpected handshake reply: {other:?}"
            ))),
        }
    }

    /// Runs one command against the store, re-dialing first if the
    /// connection was previously dropped. The command itself is not
    /// retried on that dropped connection.
    async fn run(&self, args: &[&str]) -> Result<Reply, StoreError> {
        let mut guard = self.conn.lock().await;
        if guard.is_none() {
            *guard = Some(Self::dial(&self.config).await?);
        }
        let stream = guard.as_mut().expect("just ensured Some");

        let result = async {
            stream.get_mut().write_all(&encode_command(args)).await?;
            stream.get_mut().flush().await?;
            read_reply(stream).await
        }
        .await;

        if let Err(StoreError::Io(_)) = &result {
            // Drop the dead connection so the next call re-dials.
            *guard = None;
        }

        result
    }

    pub async fn close(&self) {
        let mut guard = self.conn.lock().await;
        *guard = None;
    }
}

#[async_trait]
impl StoreBackend for RespStoreClient {
    async fn ping(&self) -> Result<(), StoreError> {
        match self.run(&["PING"]).await? {
            Reply::Simple(_) => Ok(()),
            other => Err(StoreError::Protocol(format!("unexpected PING reply: {other:?}"))),
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.run(&["GET", key]).await? {
            Reply::Bulk(v) => Ok(v),
            other => Err(StoreError::Protocol(format!("unexpected GET reply: {other:?}"))),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let reply = match ttl {
            Some(d) if d.as_secs() > 0 => {
                let secs = d.as_secs().to_string();
                self.run(&["SETEX", key, &secs, value]).await?
            }
            _ => self.run(&["SET", key, value]).await?,
        };
        match reply {
            Reply::Simple(s) if s == "OK" => Ok(()),
            other => Err(StoreError::Protocol(format!("unexpected SET reply: {other:?}"))),
        }
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        match self.run(&["INCR", key]).await? {
            Reply::Integer(n) => Ok(n),
            other => Err(StoreError::Protocol(format!("unexpected INCR reply: {other:?}"))),
        }
    }

    async fn incrby(&self, key: &str, delta: i64) -> Result<i64, StoreError> {
        let delta = delta.to_string();
        match self.run(&["INCRBY", key, &delta]).await? {
            Reply::Integer(n) => Ok(n),
            other => Err(StoreError::Protocol(format!("unexpected INCRBY reply: {other:?}"))),
        }
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let secs = ttl.as_secs().to_string();
        match self.run(&["EXPIRE", key, &secs]).await? {
            Reply::Integer(n) => Ok(n == 1),
            other => Err(StoreError::Protocol(format!("unexpected EXPIRE reply: {other:?}"))),
        }
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        match self.run(&["TTL", key]).await? {
            Reply::Integer(-2) => Err(StoreError::KeyDoesNotExist),
            Reply::Integer(-1) => Ok(None),
            Reply::Integer(n) if n >= 0 => Ok(Some(Duration::from_secs(n as u64))),
            other => Err(StoreError::Protocol(format!("unexpected TTL reply: {other:?}"))),
        }
    }

    async fn exists(&self, keys: &[&str]) -> Result<i64, StoreError> {
        let mut args = vec!["EXISTS"];
        args.extend_from_slice(keys);
        match self.run(&args).await? {
            Reply::Integer(n) => Ok(n),
            other => Err(StoreError::Protocol(format!("unexpected EXISTS reply: {other:?}"))),
        }
    }
}
