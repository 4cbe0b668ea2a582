//! Printer transport
//!
//! Raw-socket printing: one TCP connection per job, the whole TSPL buffer is
//! written, flushed and the connection closed. Label printers on port 9100
//! send nothing back, so a completed write is the only success signal; it does
//! not prove a label came out.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{info, instrument, warn};

use crate::error::{PrintError, PrintResult};

/// Standard raw printing port
pub const DEFAULT_PORT: u16 = 9100;

/// Status probes only; printing waits for the OS connect timeout
const ONLINE_CHECK_TIMEOUT: Duration = Duration::from_millis(500);

/// Trait for printer adapters
#[allow(async_fn_in_trait)]
pub trait Printer {
    /// Send a complete job to the printer
    async fn print(&self, data: &[u8]) -> PrintResult<()>;

    /// Check if the printer accepts connections
    async fn is_online(&self) -> bool;
}

/// Printer network address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterAddress {
    pub host: String,
    pub port: u16,
}

impl PrinterAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for PrinterAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for PrinterAddress {
    type Err = PrintError;

    /// Accepts `host`, `host:port`, `[v6]` and `[v6]:port`; port defaults to 9100
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PrintError::InvalidConfig(format!("Invalid address: {}", s));
        let s = s.trim();

        let (host, port) = if let Some(rest) = s.strip_prefix('[') {
            let (host, tail) = rest.split_once(']').ok_or_else(invalid)?;
            match tail {
                "" => (host, None),
                _ => (host, Some(tail.strip_prefix(':').ok_or_else(invalid)?)),
            }
        } else if s.matches(':').count() > 1 {
            // Bare IPv6 literal
            (s, None)
        } else {
            match s.split_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (s, None),
            }
        };

        if host.is_empty() || host.chars().any(char::is_whitespace) {
            return Err(invalid());
        }
        let port = match port {
            Some(p) => p.parse::<u16>().ok().filter(|p| *p != 0).ok_or_else(invalid)?,
            None => DEFAULT_PORT,
        };
        Ok(Self::new(host, port))
    }
}

/// Network label printer (raw TCP)
#[derive(Debug, Clone)]
pub struct NetworkPrinter {
    addr: PrinterAddress,
}

impl NetworkPrinter {
    pub fn new(addr: PrinterAddress) -> Self {
        Self { addr }
    }

    /// Create from an address string (e.g., "192.168.1.100:9100")
    pub fn from_addr(addr: &str) -> PrintResult<Self> {
        Ok(Self::new(addr.parse()?))
    }

    /// Get the printer address
    pub fn addr(&self) -> &PrinterAddress {
        &self.addr
    }

    /// Exactly one connection attempt, with the OS connect timeout
    async fn connect(&self) -> PrintResult<TcpStream> {
        let resolved = tokio::net::lookup_host((self.addr.host.as_str(), self.addr.port))
            .await
            .map_err(|e| PrintError::Connection(format!("{}: {}", self.addr, e)))?
            .next()
            .ok_or_else(|| PrintError::Connection(format!("No address for {}", self.addr)))?;

        TcpStream::connect(resolved)
            .await
            .map_err(|e| PrintError::Connection(format!("{}: {}", self.addr, e)))
    }
}

impl Printer for NetworkPrinter {
    #[instrument(skip(self, data), fields(addr = %self.addr, data_len = data.len()))]
    async fn print(&self, data: &[u8]) -> PrintResult<()> {
        info!("Connecting to printer");
        let mut stream = self.connect().await?;

        info!("Connected, sending {} bytes", data.len());
        stream.write_all(data).await.map_err(|e| {
            PrintError::Io(std::io::Error::new(
                e.kind(),
                format!("Write failed: {}", e),
            ))
        })?;
        stream.flush().await?;
        stream.shutdown().await?;

        info!("Print job sent");
        Ok(())
    }

    #[instrument(skip(self), fields(addr = %self.addr))]
    async fn is_online(&self) -> bool {
        match tokio::time::timeout(ONLINE_CHECK_TIMEOUT, self.connect()).await {
            Ok(Ok(_)) => {
                info!("Printer online");
                true
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Printer offline");
                false
            }
            Err(_) => {
                warn!("Printer check timeout");
                false
            }
        }
    }
}

/// Send one complete buffer to `addr`
pub async fn send(data: &[u8], addr: &PrinterAddress) -> PrintResult<()> {
    NetworkPrinter::new(addr.clone()).print(data).await
}
