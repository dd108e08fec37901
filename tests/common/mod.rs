//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use circle_guard::config::GuardConfig;
use circle_guard::http::HttpServer;
use circle_guard::lifecycle::Shutdown;
use tokio::net::TcpListener;

pub const ADMIN_KEY: &str = "test-admin-key";
pub const SIGNING_SECRET: &str = "test-signing-secret";

/// A guard bound to an ephemeral port. Dropping it stops the server.
pub struct TestGuard {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    shutdown: Shutdown,
}

impl TestGuard {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestGuard {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Config with the admin API enabled under `ADMIN_KEY`.
pub fn test_config() -> GuardConfig {
    let mut config = GuardConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.admin.enabled = true;
    config.admin.api_key = ADMIN_KEY.to_string();
    config
}

pub async fn start_guard(config: GuardConfig) -> TestGuard {
    let server = HttpServer::new(config).expect("built-in rule sets compile");
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    let client = reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();

    wait_until_ready(&client, addr).await;
    TestGuard { addr, client, shutdown }
}

async fn wait_until_ready(client: &reqwest::Client, addr: SocketAddr) {
    for _ in 0..50 {
        if client.get(format!("http://{}/health", addr)).send().await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("guard at {} never became ready", addr);
}
