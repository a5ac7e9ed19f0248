// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Network workloads.
//!
//! DNS, TCP connect and download need a reachable network; their failures are
//! recorded as runtime errors like any other unit failure.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Duration;

use sysmark_core::{
    Category, ItemUnit, ScalingMode, SysmarkResult, UnitContext, Workload, WorkloadError,
    WorkloadSpec,
};

use super::{shared, spec, MIB};

const DNS_DOMAINS: [&str; 5] = [
    "google.com",
    "github.com",
    "stackoverflow.com",
    "reddit.com",
    "wikipedia.org",
];
const CONNECT_HOST: &str = "google.com";
const CONNECT_PORT: u16 = 80;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DOWNLOAD_URL: &str = "http://speedtest.ftp.otenet.gr/files/test1Mb.db";
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);
const STREAM_CHUNK: usize = MIB as usize;

pub fn workloads() -> SysmarkResult<Vec<Arc<dyn Workload>>> {
    Ok(vec![
        shared(DnsResolution::new(
            spec(
                "network.dns_resolution",
                Category::Network,
                ScalingMode::FixedSingle,
                1,
                ItemUnit::Requests,
                "Resolve one public domain per sample, cycling through a fixed list",
            )?
            .latency(),
            DNS_DOMAINS.iter().map(|d| d.to_string()).collect(),
        )),
        shared(TcpConnect::new(
            spec(
                "network.tcp_connect",
                Category::Network,
                ScalingMode::FixedSingle,
                1,
                ItemUnit::Requests,
                "One TCP handshake with a public host per sample",
            )?
            .latency(),
            CONNECT_HOST,
            CONNECT_PORT,
        )),
        shared(LoopbackBandwidth::new(spec(
            "network.loopback_bandwidth",
            Category::Network,
            ScalingMode::FixedSingle,
            10 * MIB,
            ItemUnit::Bytes,
            "Stream 1 MiB chunks through a local TCP socket",
        )?)),
        shared(Download::new(
            spec(
                "network.download",
                Category::Network,
                ScalingMode::FixedSingle,
                1,
                ItemUnit::Bytes,
                "HTTP GET of a public test file",
            )?,
            DOWNLOAD_URL,
        )),
    ])
}

fn cancelled() -> WorkloadError {
    WorkloadError::runtime("cancelled")
}

/// Latency workload resolving one name per measured run.
///
/// Successive samples cycle through the domain list. Warm-up resolves nothing,
/// so the measured lookup is not served from a cache it primed.
pub struct DnsResolution {
    spec: WorkloadSpec,
    domains: Vec<String>,
    next: AtomicUsize,
}

impl DnsResolution {
    pub fn new(spec: WorkloadSpec, domains: Vec<String>) -> Self {
        Self {
            spec,
            domains,
            next: AtomicUsize::new(0),
        }
    }
}

impl Workload for DnsResolution {
    fn spec(&self) -> &WorkloadSpec {
        &self.spec
    }

    fn run(&self, _size: u64, ctx: &UnitContext) -> Result<u64, WorkloadError> {
        if self.domains.is_empty() {
            return Err(WorkloadError::setup("no domains to resolve"));
        }
        if ctx.is_warmup() {
            return Ok(1);
        }
        if ctx.is_cancelled() {
            return Err(cancelled());
        }

        let sample = self.next.fetch_add(1, Ordering::Relaxed);
        let domain = &self.domains[sample % self.domains.len()];
        let mut addrs = (domain.as_str(), 0)
            .to_socket_addrs()
            .map_err(|e| WorkloadError::runtime(format!("{}: {}", domain, e)))?;
        if addrs.next().is_none() {
            return Err(WorkloadError::runtime(format!("{}: no addresses", domain)));
        }
        Ok(1)
    }
}

/// Latency workload timing one TCP handshake, closed immediately.
///
/// The address is resolved during warm-up so the sample covers only the connect.
pub struct TcpConnect {
    spec: WorkloadSpec,
    host: String,
    port: u16,
    timeout: Duration,
    addr: OnceLock<SocketAddr>,
}

impl TcpConnect {
    pub fn new(spec: WorkloadSpec, host: impl Into<String>, port: u16) -> Self {
        Self {
            spec,
            host: host.into(),
            port,
            timeout: CONNECT_TIMEOUT,
            addr: OnceLock::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn resolve(&self) -> Result<SocketAddr, WorkloadError> {
        if let Some(addr) = self.addr.get() {
            return Ok(*addr);
        }
        let addr = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| WorkloadError::runtime(format!("{}: {}", self.host, e)))?
            .next()
            .ok_or_else(|| WorkloadError::runtime(format!("{}: no addresses", self.host)))?;
        Ok(*self.addr.get_or_init(|| addr))
    }
}

impl Workload for TcpConnect {
    fn spec(&self) -> &WorkloadSpec {
        &self.spec
    }

    fn run(&self, _size: u64, ctx: &UnitContext) -> Result<u64, WorkloadError> {
        let addr = self.resolve()?;
        if ctx.is_warmup() {
            return Ok(1);
        }
        if ctx.is_cancelled() {
            return Err(cancelled());
        }

        let stream = TcpStream::connect_timeout(&addr, self.timeout).map_err(|e| match e.kind() {
            io::ErrorKind::TimedOut => WorkloadError::Timeout {
                after_ms: self.timeout.as_millis() as u64,
            },
            _ => WorkloadError::runtime(format!("connect {}: {}", addr, e)),
        })?;
        drop(stream);
        Ok(1)
    }
}

/// Stream `size` bytes from a local listener thread to this unit.
pub struct LoopbackBandwidth {
    spec: WorkloadSpec,
}

impl LoopbackBandwidth {
    pub fn new(spec: WorkloadSpec) -> Self {
        Self { spec }
    }

    fn serve(listener: TcpListener, size: u64) -> io::Result<()> {
        let (mut stream, _) = listener.accept()?;
        let chunk = vec![b'x'; STREAM_CHUNK];
        let mut remaining = size;
        while remaining > 0 {
            let n = remaining.min(STREAM_CHUNK as u64) as usize;
            stream.write_all(&chunk[..n])?;
            remaining -= n as u64;
        }
        stream.flush()
    }
}

impl Workload for LoopbackBandwidth {
    fn spec(&self) -> &WorkloadSpec {
        &self.spec
    }

    fn run(&self, size: u64, ctx: &UnitContext) -> Result<u64, WorkloadError> {
        let listener = TcpListener::bind(("127.0.0.1", 0))?;
        let addr = listener.local_addr()?;
        let server = thread::Builder::new()
            .name(format!("sysmark-loopback-{}", ctx.unit_index()))
            .spawn(move || Self::serve(listener, size))?;

        let mut stream = TcpStream::connect(addr)?;
        let mut buf = vec![0u8; STREAM_CHUNK];
        let mut received = 0u64;
        loop {
            if ctx.is_cancelled() {
                return Err(cancelled());
            }
            let n = stream.read(&mut buf)?;
            if n == 0 {
                break;
            }
            received += n as u64;
        }

        server
            .join()
            .map_err(|_| WorkloadError::runtime("loopback server panicked"))??;

        if received != size {
            return Err(WorkloadError::runtime(format!(
                "received {} of {} bytes",
                received, size
            )));
        }
        Ok(received)
    }
}

/// `size` HTTP GETs of one URL; items are body bytes received.
pub struct Download {
    spec: WorkloadSpec,
    url: String,
    timeout: Duration,
    use_proxy: bool,
}

impl Download {
    pub fn new(spec: WorkloadSpec, url: impl Into<String>) -> Self {
        Self {
            spec,
            url: url.into(),
            timeout: DOWNLOAD_TIMEOUT,
            use_proxy: true,
        }
    }

    /// Ignore proxy settings from the environment.
    pub fn direct(mut self) -> Self {
        self.use_proxy = false;
        self
    }

    fn client(&self) -> Result<reqwest::blocking::Client, WorkloadError> {
        let mut builder = reqwest::blocking::Client::builder().timeout(self.timeout);
        if !self.use_proxy {
            builder = builder.no_proxy();
        }
        builder
            .build()
            .map_err(|e| WorkloadError::setup(format!("http client: {}", e)))
    }

    fn request_error(&self, e: reqwest::Error) -> WorkloadError {
        if e.is_timeout() {
            WorkloadError::Timeout {
                after_ms: self.timeout.as_millis() as u64,
            }
        } else {
            WorkloadError::runtime(format!("GET {}: {}", self.url, e))
        }
    }
}

impl Workload for Download {
    fn spec(&self) -> &WorkloadSpec {
        &self.spec
    }

    fn run(&self, size: u64, ctx: &UnitContext) -> Result<u64, WorkloadError> {
        let client = self.client()?;
        let mut total = 0u64;

        for _ in 0..size {
            if ctx.is_cancelled() {
                return Err(cancelled());
            }
            let mut response = client
                .get(&self.url)
                .send()
                .and_then(|r| r.error_for_status())
                .map_err(|e| self.request_error(e))?;
            total += io::copy(&mut response, &mut io::sink())?;
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader};
    use sysmark_core::{ErrorKind, UnitPhase};

    fn ctx() -> UnitContext {
        UnitContext::detached(UnitPhase::Measured)
    }

    fn spec_for(id: &str) -> WorkloadSpec {
        spec(
            id,
            Category::Network,
            ScalingMode::FixedSingle,
            1,
            ItemUnit::Bytes,
            "test",
        )
        .unwrap()
    }

    /// Serve one HTTP response per connection, `connections` times.
    fn http_server(status: &'static str, body: Vec<u8>, connections: usize) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            for _ in 0..connections {
                let (stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut line = String::new();
                while reader.read_line(&mut line).unwrap() > 0 {
                    if line == "\r\n" {
                        break;
                    }
                    line.clear();
                }
                let mut stream = stream;
                write!(
                    stream,
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    status,
                    body.len()
                )
                .unwrap();
                stream.write_all(&body).unwrap();
            }
        });
        addr
    }

    #[test]
    fn test_dns_resolves_localhost() {
        let w = DnsResolution::new(
            spec_for("network.dns_resolution").latency(),
            vec!["localhost".to_string()],
        );
        assert_eq!(w.run(1, &ctx()).unwrap(), 1);
        assert_eq!(w.run(1, &ctx()).unwrap(), 1);
    }

    #[test]
    fn test_dns_cycles_one_domain_per_sample() {
        let w = DnsResolution::new(
            spec_for("network.dns_resolution").latency(),
            vec!["localhost".to_string(), "127.0.0.1".to_string()],
        );
        assert_eq!(w.run(1, &UnitContext::detached(UnitPhase::WarmUp)).unwrap(), 1);
        assert_eq!(w.next.load(Ordering::Relaxed), 0);
        for sample in 1..=3 {
            assert_eq!(w.run(1, &ctx()).unwrap(), 1);
            assert_eq!(w.next.load(Ordering::Relaxed), sample);
        }
    }

    #[test]
    fn test_dns_without_domains_is_setup_error() {
        let w = DnsResolution::new(spec_for("network.dns_resolution"), Vec::new());
        assert_eq!(
            w.run(1, &ctx()).unwrap_err().kind(),
            ErrorKind::WorkloadSetupError
        );
    }

    #[test]
    fn test_tcp_connect_to_local_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let w = TcpConnect::new(spec_for("network.tcp_connect"), "127.0.0.1", port)
            .with_timeout(Duration::from_secs(2));
        w.run(1, &UnitContext::detached(UnitPhase::WarmUp)).unwrap();
        assert_eq!(w.addr.get().map(SocketAddr::port), Some(port));
        assert_eq!(w.run(5, &ctx()).unwrap(), 1);
    }

    #[test]
    fn test_tcp_connect_refused_is_runtime_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let w = TcpConnect::new(spec_for("network.tcp_connect"), "127.0.0.1", port)
            .with_timeout(Duration::from_secs(2));
        assert_eq!(
            w.run(1, &ctx()).unwrap_err().kind(),
            ErrorKind::WorkloadRuntimeError
        );
    }

    #[test]
    fn test_loopback_streams_exact_size() {
        let w = LoopbackBandwidth::new(spec_for("network.loopback_bandwidth"));
        let size = 2 * MIB + 17;
        assert_eq!(w.run(size, &ctx()).unwrap(), size);
    }

    #[test]
    fn test_download_counts_body_bytes() {
        let addr = http_server("200 OK", vec![7u8; 4096], 2);
        let w = Download::new(spec_for("network.download"), format!("http://{}/file", addr))
            .direct();
        assert_eq!(w.run(2, &ctx()).unwrap(), 8192);
    }

    #[test]
    fn test_download_http_error_status() {
        let addr = http_server("404 Not Found", Vec::new(), 1);
        let w = Download::new(spec_for("network.download"), format!("http://{}/gone", addr))
            .direct();
        assert_eq!(
            w.run(1, &ctx()).unwrap_err().kind(),
            ErrorKind::WorkloadRuntimeError
        );
    }
}
