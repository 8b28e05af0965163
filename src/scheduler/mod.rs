/// 만료 경매 정리 스케줄러
/// 경매 종료는 기본적으로 조회 시점에 처리되지만(지연 종료),
/// 주기를 설정하면 아무도 조회하지 않는 경매도 시간이 지나면 종료한다.
// region:    --- Imports
use crate::auction::AuctionEngine;
use chrono::Utc;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info};

// endregion: --- Imports

// region:    --- Auction Scheduler
pub struct AuctionScheduler {
    engine: Arc<AuctionEngine>,
    period: Duration,
}

impl AuctionScheduler {
    pub fn new(engine: Arc<AuctionEngine>, period: Duration) -> Self {
        Self { engine, period }
    }

    /// 스케줄러 시작
    pub fn start(self) -> JoinHandle<()> {
        info!(
            "{:<12} --> 만료 경매 정리 시작 (주기 {:?})",
            "Scheduler", self.period
        );
        tokio::spawn(async move {
            let mut interval = interval(self.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                self.sweep().await;
            }
        })
    }

    /// 한 번 정리
    pub async fn sweep(&self) -> usize {
        match self.engine.close_expired(Utc::now()).await {
            Ok(closed) => {
                if closed > 0 {
                    info!("{:<12} --> 만료 경매 {}건 종료", "Scheduler", closed);
                } else {
                    debug!("{:<12} --> 만료 경매 없음", "Scheduler");
                }
                closed
            }
            Err(e) => {
                error!(
                    "{:<12} --> 경매 상태 업데이트 중 오류 발생: {:?}",
                    "Scheduler", e
                );
                0
            }
        }
    }
}
// endregion: --- Auction Scheduler
