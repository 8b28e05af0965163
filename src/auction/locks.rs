/// 작물 단위 잠금
/// 같은 작물에 대한 입찰/종료/수정은 순서대로 처리하고, 다른 작물끼리는 서로 막지 않는다.
use crate::bidding::CropId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Default)]
pub struct CropLocks {
    slots: Arc<Mutex<HashMap<CropId, Arc<AsyncMutex<()>>>>>,
}

/// 잠금 보유 중임을 나타내는 가드. drop 시 대기자가 없으면 슬롯을 회수한다.
pub struct CropGuard {
    crop_id: CropId,
    guard: Option<OwnedMutexGuard<()>>,
    slots: Arc<Mutex<HashMap<CropId, Arc<AsyncMutex<()>>>>>,
}

impl CropLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, crop_id: CropId) -> CropGuard {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(slots.entry(crop_id).or_default())
        };
        let guard = slot.lock_owned().await;
        CropGuard {
            crop_id,
            guard: Some(guard),
            slots: Arc::clone(&self.slots),
        }
    }

    /// 현재 유지 중인 슬롯 수
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .map(|slots| slots.len())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for CropGuard {
    fn drop(&mut self) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        // 맵과 이 가드만 참조하고 있으면 아무도 기다리지 않는 것
        if let Some(slot) = slots.get(&self.crop_id) {
            if Arc::strong_count(slot) <= 2 {
                slots.remove(&self.crop_id);
            }
        }
        self.guard.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn slot_is_reclaimed_after_release() {
        let locks = CropLocks::new();
        let crop_id = CropId::new();
        {
            let _guard = locks.acquire(crop_id).await;
            assert_eq!(locks.len(), 1);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn same_crop_is_serialized() {
        let locks = Arc::new(CropLocks::new());
        let crop_id = CropId::new();
        let first = locks.acquire(crop_id).await;

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire(crop_id).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(first);
        waiter.await.unwrap();
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn different_crops_do_not_block() {
        let locks = CropLocks::new();
        let _a = locks.acquire(CropId::new()).await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire(CropId::new())).await;
        assert!(b.is_ok());
        assert_eq!(locks.len(), 2);
    }
}
