use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use http::Method;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use url::Url;

use imdb_scraper_rs::{
    ControlChannel, ControlError, HttpTransport, IdentityRotator, OutboundRequest,
    ReqwestTransport, ScraperConfig, TorRotator,
};

type RequestLog = Arc<Mutex<Vec<String>>>;

/// Minimal SOCKS5 endpoint; every accepted connection is a new "circuit"
/// whose exit IP is `10.0.0.<connection number>`. Each response sets a
/// session cookie and every request head is recorded.
struct SocksExit {
    addr: SocketAddr,
    opened: Arc<AtomicUsize>,
    requests: RequestLog,
}

async fn spawn_socks_exit() -> SocksExit {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let opened = Arc::new(AtomicUsize::new(0));
    let requests = RequestLog::default();
    let counter = opened.clone();
    let log = requests.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let exit = counter.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::spawn(serve_circuit(stream, exit, log.clone()));
        }
    });
    SocksExit {
        addr,
        opened,
        requests,
    }
}

async fn serve_circuit(mut stream: TcpStream, exit: usize, requests: RequestLog) -> std::io::Result<()> {
    let mut greeting = [0u8; 2];
    stream.read_exact(&mut greeting).await?;
    let mut methods = vec![0u8; greeting[1] as usize];
    stream.read_exact(&mut methods).await?;
    stream.write_all(&[5, 0]).await?;

    let mut request = [0u8; 4];
    stream.read_exact(&mut request).await?;
    let addr_len = match request[3] {
        1 => 4,
        4 => 16,
        3 => {
            let mut len = [0u8; 1];
            stream.read_exact(&mut len).await?;
            len[0] as usize
        }
        _ => return Ok(()),
    };
    let mut target = vec![0u8; addr_len + 2];
    stream.read_exact(&mut target).await?;
    stream.write_all(&[5, 0, 0, 1, 0, 0, 0, 0, 0, 0]).await?;

    // answer every request on this connection with the same exit IP
    let mut pending = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let read = stream.read(&mut chunk).await?;
        if read == 0 {
            return Ok(());
        }
        pending.extend_from_slice(&chunk[..read]);
        while let Some(end) = pending.windows(4).position(|w| w == b"\r\n\r\n") {
            let head: Vec<u8> = pending.drain(..end + 4).collect();
            requests
                .lock()
                .unwrap()
                .push(String::from_utf8_lossy(&head).to_ascii_lowercase());
            let body = format!(r#"{{"ip":"10.0.0.{exit}"}}"#);
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nSet-Cookie: session-id=abc; Path=/\r\nContent-Length: {}\r\n\r\n{}",
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await?;
        }
    }
}

#[derive(Default)]
struct CountingControl {
    signals: AtomicUsize,
}

#[async_trait]
impl ControlChannel for CountingControl {
    async fn signal_newnym(&self) -> Result<(), ControlError> {
        self.signals.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn config(socks: SocketAddr) -> ScraperConfig {
    let mut config = ScraperConfig::default();
    config.tor.host = socks.ip().to_string();
    config.tor.socks_port = socks.port();
    config.tor.settle_secs = 0.0;
    config.tor.rotation_max_retries = 3;
    config.network.ip_info_url = "http://ip.echo.test/json".into();
    config
}

#[tokio::test]
async fn tor_requests_open_a_fresh_connection_each_time() {
    let exit = spawn_socks_exit().await;
    let config = config(exit.addr);
    let transport = ReqwestTransport::new();
    let route = config.tor.proxy_route();
    let request = OutboundRequest::new(Method::GET, Url::parse("http://ip.echo.test/json").unwrap());

    let mut seen = Vec::new();
    for _ in 0..3 {
        let response = transport
            .execute(&request, Some(&route), Duration::from_secs(5))
            .await
            .unwrap();
        seen.push(response.text());
    }

    assert_eq!(exit.opened.load(Ordering::SeqCst), 3);
    assert_eq!(
        seen,
        vec![
            r#"{"ip":"10.0.0.1"}"#,
            r#"{"ip":"10.0.0.2"}"#,
            r#"{"ip":"10.0.0.3"}"#
        ]
    );
}

#[tokio::test]
async fn rotation_observes_the_new_exit() {
    let exit = spawn_socks_exit().await;
    let config = config(exit.addr);
    let control = Arc::new(CountingControl::default());
    let rotator = TorRotator::new(&config, Arc::new(ReqwestTransport::new()), control.clone());

    let new_ip = rotator.rotate_ip().await;

    assert_eq!(new_ip, "10.0.0.2");
    assert_eq!(control.signals.load(Ordering::SeqCst), 1);
    assert_eq!(exit.opened.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn session_cookies_are_not_carried_across_requests() {
    let exit = spawn_socks_exit().await;
    let config = config(exit.addr);
    let transport = ReqwestTransport::new();
    let route = config.tor.proxy_route();
    let request = OutboundRequest::new(Method::GET, Url::parse("http://ip.echo.test/json").unwrap());

    for _ in 0..2 {
        let response = transport
            .execute(&request, Some(&route), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(response.cookie_header().as_deref(), Some("session-id=abc"));
    }

    let requests = exit.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|head| !head.contains("\r\ncookie:")));
}
