/// 서비스 설정
/// 명령행 인자 또는 환경 변수로 지정한다.
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// 경매 시간 상한 (100년)
const MAX_AUCTION_WINDOW_SECS: u64 = 100 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Parser)]
#[command(name = "crop-auction", about = "Crop auction marketplace service")]
pub struct Config {
    /// Postgres 연결 문자열. 없으면 메모리 저장소로 실행
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:3000")]
    pub bind_addr: SocketAddr,

    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 5)]
    pub max_connections: u32,

    /// 경매 시간 (초)
    #[arg(long, env = "AUCTION_WINDOW_SECS", default_value_t = 3600)]
    pub auction_window_secs: u64,

    /// 만료 경매 정리 주기 (초). 0 이면 조회 시점에만 종료한다
    #[arg(long, env = "EXPIRY_SWEEP_SECS", default_value_t = 0)]
    pub expiry_sweep_secs: u64,

    #[arg(long, env = "BODY_LIMIT_BYTES", default_value_t = 20 * 1024 * 1024)]
    pub body_limit_bytes: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("auction window must be positive")]
    EmptyAuctionWindow,
    #[error("auction window is too large: {0}s")]
    AuctionWindowTooLarge(u64),
    #[error("max connections must be positive")]
    NoConnections,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            max_connections: 5,
            auction_window_secs: 3600,
            expiry_sweep_secs: 0,
            body_limit_bytes: 20 * 1024 * 1024,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auction_window_secs == 0 {
            return Err(ConfigError::EmptyAuctionWindow);
        }
        if self.auction_window_secs > MAX_AUCTION_WINDOW_SECS {
            return Err(ConfigError::AuctionWindowTooLarge(self.auction_window_secs));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::NoConnections);
        }
        Ok(())
    }

    pub fn auction_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.auction_window_secs as i64)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.expiry_sweep_secs > 0).then(|| Duration::from_secs(self.expiry_sweep_secs))
    }
}
