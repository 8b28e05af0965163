use chrono::{DateTime, Duration, Utc};
use crop_auction::auction::{AuctionEngine, AuctionError, Closure};
use crop_auction::bidding::commands::PlaceBidCommand;
use crop_auction::bidding::{Crop, CropId, CropStatus, NewBid, Price, UserId};
use crop_auction::catalog::model::{CascadeStep, NewCropRequest, StepOutcome};
use crop_auction::catalog::{CatalogError, CropCatalog};
use crop_auction::chat::{ChatDenied, ChatError, ChatService};
use crop_auction::session::{Role, SessionUser};
use crop_auction::store::{
    BidLedger, CropStore, FailPoint, MemoryStore, Store, UserDirectory, WinnerRegistry,
    WishlistStore,
};
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

/// 트레이싱 초기화 (여러 테스트에서 호출해도 한 번만 설정된다)
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .without_time()
        .with_target(false)
        .with_test_writer()
        .try_init();
}

fn price(text: &str) -> Price {
    text.parse().unwrap()
}

fn user(id: &str, role: Role) -> SessionUser {
    SessionUser {
        id: UserId::from(id),
        role,
        username: format!("{id}-name"),
        email: None,
    }
}

/// 테스트용 작물 등록 (한 시간 경매)
async fn create_test_crop(store: &MemoryStore, farmer: &str, start: &str, now: DateTime<Utc>) -> Crop {
    let crop = Crop {
        id: CropId::new(),
        farmer_id: UserId::from(farmer),
        farmer_name: Some(format!("{farmer}-name")),
        farmer_email: None,
        name: "테스트 작물".to_string(),
        crop_type: "grain".to_string(),
        quality: "A".to_string(),
        location: "Not specified".to_string(),
        notes: String::new(),
        quantity: 100.0,
        current_price: price(start),
        status: CropStatus::Available,
        leading_bidder_id: None,
        images: vec![],
        created_at: now,
        closes_at: now + Duration::hours(1),
    };
    store.insert_crop(&crop).await.unwrap();
    crop
}

fn bid(crop_id: CropId, bidder: &str, amount: &str) -> PlaceBidCommand {
    PlaceBidCommand {
        crop_id,
        bidder_id: UserId::from(bidder),
        bid_price: price(amount),
    }
}

fn setup() -> (Arc<MemoryStore>, AuctionEngine) {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let engine = AuctionEngine::new(store.clone());
    (store, engine)
}

/// 입찰 후 종료: 최고가 입찰자가 낙찰
#[tokio::test]
async fn test_highest_bidder_wins() {
    let (store, engine) = setup();
    let now = Utc::now();
    let crop = create_test_crop(&store, "F", "10.00", now).await;

    engine.place_bid(bid(crop.id, "A", "12"), now).await.unwrap();
    let low = engine.place_bid(bid(crop.id, "C", "11"), now).await;
    assert!(matches!(low, Err(AuctionError::BidTooLow { current }) if current == price("12")));
    engine.place_bid(bid(crop.id, "B", "15"), now).await.unwrap();

    let closure = engine.close_auction(crop.id, now).await.unwrap();
    let record = closure.winner().unwrap();
    assert_eq!(record.user_id, UserId::from("B"));

    let crop = engine.crop(crop.id, now).await.unwrap();
    assert_eq!(crop.status, CropStatus::Sold);
    assert_eq!(crop.current_price, price("15.00"));
    assert_eq!(crop.leading_bidder_id, Some(UserId::from("B")));

    let history = engine.bid_history(crop.id).await.unwrap();
    let prices: Vec<Price> = history.iter().map(|b| b.bid_price).collect();
    assert_eq!(prices, vec![price("15"), price("12")]);
}

/// 원장에 기록된 입찰은 그대로 다시 읽힌다
#[tokio::test]
async fn test_ledger_keeps_bids_exactly() {
    let (store, engine) = setup();
    let now = Utc::now();
    let crop = create_test_crop(&store, "F", "10", now).await;

    let placed = engine
        .place_bid(bid(crop.id, "A", "10.01"), now)
        .await
        .unwrap();
    let history = engine.bid_history(crop.id).await.unwrap();
    assert_eq!(history, vec![placed.clone()]);
    assert_eq!(store.highest_for(crop.id).await.unwrap(), Some(placed.clone()));
    assert_eq!(placed.bid_price.cents(), 1001);
    assert_eq!(placed.timestamp, now);
}

/// 같은 가격이면 먼저 들어온 입찰이 최고 입찰이다
#[tokio::test]
async fn test_equal_price_ledger_prefers_earliest_bid() {
    let (store, _engine) = setup();
    let now = Utc::now();
    let crop = create_test_crop(&store, "F", "10", now).await;

    // 원장 순서(id)와 시각 순서가 반대인 같은 가격의 입찰 두 건
    let later = store
        .commit_bid(
            price("10"),
            NewBid {
                crop_id: crop.id,
                bidder_id: UserId::from("A"),
                bid_price: price("12"),
                timestamp: now + Duration::seconds(5),
            },
        )
        .await
        .unwrap()
        .unwrap();
    let earlier = store
        .commit_bid(
            price("12"),
            NewBid {
                crop_id: crop.id,
                bidder_id: UserId::from("B"),
                bid_price: price("12"),
                timestamp: now,
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert!(later.id < earlier.id);

    assert_eq!(store.highest_for(crop.id).await.unwrap(), Some(earlier.clone()));
    assert_eq!(store.all_for(crop.id).await.unwrap(), vec![earlier, later]);
}

/// 입찰 없이 종료
#[tokio::test]
async fn test_close_without_bids() {
    let (store, engine) = setup();
    let now = Utc::now();
    let crop = create_test_crop(&store, "F", "10", now).await;

    let closure = engine.close_auction(crop.id, now).await.unwrap();
    assert_eq!(closure, Closure::NoBids);
    assert_eq!(engine.crop(crop.id, now).await.unwrap().status, CropStatus::Closed);
    assert_eq!(engine.winner(crop.id, now).await.unwrap(), None);

    // 다시 종료해도 같은 결과
    assert_eq!(engine.close_auction(crop.id, now).await.unwrap(), Closure::NoBids);
}

/// 종료는 멱등
#[tokio::test]
async fn test_close_is_idempotent() {
    let (store, engine) = setup();
    let now = Utc::now();
    let crop = create_test_crop(&store, "F", "10", now).await;
    engine.place_bid(bid(crop.id, "A", "20"), now).await.unwrap();

    let first = engine.close_auction(crop.id, now).await.unwrap();
    let later = now + Duration::minutes(5);
    let second = engine.close_auction(crop.id, later).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(
        store.winner_for(crop.id).await.unwrap().unwrap().assigned_at,
        now
    );
}

/// 거절된 입찰은 아무것도 바꾸지 않는다
#[tokio::test]
async fn test_rejected_bids_do_not_mutate() {
    let (store, engine) = setup();
    let now = Utc::now();
    let crop = create_test_crop(&store, "F", "10", now).await;

    let equal = engine.place_bid(bid(crop.id, "A", "10.00"), now).await;
    assert!(matches!(equal, Err(AuctionError::BidTooLow { .. })));

    let missing = engine.place_bid(bid(CropId::new(), "A", "50"), now).await;
    assert!(matches!(missing, Err(AuctionError::CropNotFound(_))));

    engine.close_auction(crop.id, now).await.unwrap();
    let closed = engine.place_bid(bid(crop.id, "A", "50"), now).await;
    assert!(matches!(closed, Err(AuctionError::AuctionClosed(_))));

    let stored = store.get_crop(crop.id).await.unwrap().unwrap();
    assert_eq!(stored.current_price, price("10"));
    assert_eq!(stored.leading_bidder_id, None);
    assert!(store.all_for(crop.id).await.unwrap().is_empty());
}

/// 저장 실패 시 부분 반영 없음
#[tokio::test]
async fn test_failed_commit_leaves_no_partial_write() {
    let (store, engine) = setup();
    let now = Utc::now();
    let crop = create_test_crop(&store, "F", "10", now).await;

    store.fail_on(FailPoint::CommitBid);
    let result = engine.place_bid(bid(crop.id, "A", "12"), now).await;
    assert!(matches!(result, Err(AuctionError::Storage(_))));

    let stored = store.get_crop(crop.id).await.unwrap().unwrap();
    assert_eq!(stored.current_price, price("10"));
    assert_eq!(stored.leading_bidder_id, None);
    assert!(store.highest_for(crop.id).await.unwrap().is_none());

    store.recover(FailPoint::CommitBid);
    engine.place_bid(bid(crop.id, "A", "12"), now).await.unwrap();
    assert_eq!(store.all_for(crop.id).await.unwrap().len(), 1);
}

/// 시간이 지난 경매는 다음 접근 시 종료된다
#[tokio::test]
async fn test_expired_auction_closes_lazily() {
    let (store, engine) = setup();
    let now = Utc::now();
    let crop = create_test_crop(&store, "F", "10", now).await;
    engine.place_bid(bid(crop.id, "A", "11"), now).await.unwrap();

    let after = crop.closes_at + Duration::seconds(1);
    let late = engine.place_bid(bid(crop.id, "B", "30"), after).await;
    assert!(matches!(late, Err(AuctionError::AuctionClosed(_))));

    let stored = store.get_crop(crop.id).await.unwrap().unwrap();
    assert_eq!(stored.status, CropStatus::Sold);
    assert_eq!(stored.current_price, price("11"));
    let winner = engine.winner(crop.id, after).await.unwrap().unwrap();
    assert_eq!(winner.user_id, UserId::from("A"));

    // 종료된 경매는 목록에서 빠진다
    assert!(engine.list_visible_crops(after).await.unwrap().is_empty());
}

/// 조회 시점 만료 (입찰 없음)
#[tokio::test]
async fn test_crop_lookup_closes_expired_auction() {
    let (store, engine) = setup();
    let now = Utc::now();
    let crop = create_test_crop(&store, "F", "10", now).await;

    assert!(engine.crop(crop.id, now).await.unwrap().status.is_open());
    let expired = engine.crop(crop.id, crop.closes_at).await.unwrap();
    assert_eq!(expired.status, CropStatus::Closed);
}

/// 만료 경매 일괄 종료
#[tokio::test]
async fn test_close_expired_sweeps_only_expired() {
    let (store, engine) = setup();
    let now = Utc::now();
    let old = create_test_crop(&store, "F", "10", now - Duration::hours(3)).await;
    let sold = create_test_crop(&store, "F", "10", now - Duration::hours(2)).await;
    let open = create_test_crop(&store, "F", "10", now).await;
    engine
        .place_bid(bid(sold.id, "A", "12"), sold.created_at)
        .await
        .unwrap();

    assert_eq!(engine.close_expired(now).await.unwrap(), 2);
    assert_eq!(engine.close_expired(now).await.unwrap(), 0);

    let status = |crop: Crop| crop.status;
    assert_eq!(status(store.get_crop(old.id).await.unwrap().unwrap()), CropStatus::Closed);
    assert_eq!(status(store.get_crop(sold.id).await.unwrap().unwrap()), CropStatus::Sold);
    assert_eq!(status(store.get_crop(open.id).await.unwrap().unwrap()), CropStatus::Available);
}

/// 동시성 입찰 테스트
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_bidding() {
    let (store, engine) = setup();
    let engine = Arc::new(engine);
    let now = Utc::now();
    let crop = create_test_crop(&store, "F", "10", now).await;

    let mut handles = vec![];
    for i in 1..=50 {
        let engine = Arc::clone(&engine);
        let cmd = bid(crop.id, &format!("bidder-{i}"), &format!("{}", 10 + i));
        handles.push(tokio::spawn(async move { engine.place_bid(cmd, now).await }));
    }

    let mut successful_bids = 0;
    let mut failed_bids = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successful_bids += 1,
            Err(AuctionError::BidTooLow { .. }) => failed_bids += 1,
            Err(e) => panic!("예상하지 못한 오류: {e:?}"),
        }
    }
    info!("성공한 입찰 수: {}, 실패한 입찰 수: {}", successful_bids, failed_bids);
    assert_eq!(successful_bids + failed_bids, 50);

    let stored = store.get_crop(crop.id).await.unwrap().unwrap();
    assert_eq!(stored.current_price, price("60"));
    assert_eq!(stored.leading_bidder_id, Some(UserId::from("bidder-50")));

    // 원장에 기록된 순서대로 가격이 엄격히 증가해야 한다
    let mut ledger = store.all_for(crop.id).await.unwrap();
    assert_eq!(ledger.len(), successful_bids);
    ledger.sort_by_key(|b| b.id);
    assert!(ledger.windows(2).all(|w| w[0].bid_price < w[1].bid_price));
}

/// 작물 삭제는 단계별로 독립 실행된다
#[tokio::test]
async fn test_cascade_delete_reports_failed_steps() {
    let (store, engine) = setup();
    let catalog = CropCatalog::new(store.clone(), Arc::clone(engine.locks()), Duration::hours(1));
    let farmer = user("F", Role::Farmer);
    let now = Utc::now();

    let request = NewCropRequest {
        name: Some("Wheat".to_string()),
        price: Some(json!("10")),
        ..NewCropRequest::default()
    };
    let crop = catalog.create(&farmer, request, now).await.unwrap();
    engine.place_bid(bid(crop.id, "A", "12"), now).await.unwrap();
    catalog
        .add_to_wishlist(UserId::from("A"), crop.id, now)
        .await
        .unwrap();

    store.fail_on(FailPoint::DeleteBids);
    let report = catalog.delete(&farmer, crop.id).await.unwrap();
    assert!(report.crop_deleted);
    assert_eq!(report.failed_steps(), vec![CascadeStep::Bids]);
    assert_eq!(
        report.outcome(CascadeStep::Wishlist),
        Some(&StepOutcome::Removed { count: 1 })
    );
    assert_eq!(
        report.outcome(CascadeStep::Winner),
        Some(&StepOutcome::Removed { count: 0 })
    );

    // 실패한 단계의 데이터는 남아 있다
    assert_eq!(store.all_for(crop.id).await.unwrap().len(), 1);
    assert!(store.wishlist_for(&UserId::from("A")).await.unwrap().is_empty());
    assert!(store.get_crop(crop.id).await.unwrap().is_none());
}

/// 작물 삭제 자체가 실패해도 단계 결과는 보고된다
#[tokio::test]
async fn test_cascade_delete_keeps_report_when_crop_delete_fails() {
    let (store, engine) = setup();
    let catalog = CropCatalog::new(store.clone(), Arc::clone(engine.locks()), Duration::hours(1));
    let farmer = user("F", Role::Farmer);
    let crop = catalog
        .create(&farmer, NewCropRequest::default(), Utc::now())
        .await
        .unwrap();

    store.fail_on(FailPoint::DeleteCrop);
    match catalog.delete(&farmer, crop.id).await {
        Err(CatalogError::DeleteFailed { report, .. }) => {
            assert!(!report.crop_deleted);
            assert!(report.failed_steps().is_empty());
            assert_eq!(report.steps.len(), 4);
        }
        other => panic!("삭제 실패가 보고되어야 함: {other:?}"),
    }
    assert!(store.get_crop(crop.id).await.unwrap().is_some());

    let stranger = user("G", Role::Farmer);
    store.recover(FailPoint::DeleteCrop);
    assert!(matches!(
        catalog.delete(&stranger, crop.id).await,
        Err(CatalogError::NotOwner)
    ));
}

/// 입찰이 시작되면 가격을 바꿀 수 없다
#[tokio::test]
async fn test_price_is_locked_once_bidding_starts() {
    let (store, engine) = setup();
    let catalog = CropCatalog::new(store.clone(), Arc::clone(engine.locks()), Duration::hours(1));
    let farmer = user("F", Role::Farmer);
    let now = Utc::now();
    let crop = catalog
        .create(
            &farmer,
            NewCropRequest {
                price: Some(json!(10)),
                ..NewCropRequest::default()
            },
            now,
        )
        .await
        .unwrap();

    let changes = serde_json::from_value(json!({"price": "20", "notes": "fresh"})).unwrap();
    let updated = catalog.update(&farmer, crop.id, changes).await.unwrap();
    assert_eq!(updated.current_price, price("20"));
    assert_eq!(updated.notes, "fresh");

    engine.place_bid(bid(crop.id, "A", "25"), now).await.unwrap();
    let changes = serde_json::from_value(json!({"price": "30"})).unwrap();
    assert!(matches!(
        catalog.update(&farmer, crop.id, changes).await,
        Err(CatalogError::BiddingStarted)
    ));
    assert_eq!(
        store.get_crop(crop.id).await.unwrap().unwrap().current_price,
        price("25")
    );

    let bidder = user("A", Role::Bidder);
    assert!(matches!(
        catalog.create(&bidder, NewCropRequest::default(), now).await,
        Err(CatalogError::NotFarmer)
    ));
}

/// 채팅은 농부와 낙찰자만
#[tokio::test]
async fn test_chat_between_farmer_and_winner() {
    let (store, engine) = setup();
    let engine = Arc::new(engine);
    let chat = ChatService::new(Arc::clone(&engine));
    let now = Utc::now();
    let crop = create_test_crop(&store, "F", "10", now).await;
    let farmer = user("F", Role::Farmer);
    let winner = user("W", Role::Bidder);
    let loser = user("L", Role::Bidder);

    engine.place_bid(bid(crop.id, "L", "11"), now).await.unwrap();
    engine.place_bid(bid(crop.id, "W", "12"), now).await.unwrap();

    assert!(matches!(
        chat.open(crop.id, &farmer, now).await,
        Err(ChatError::Denied(ChatDenied::NoWinnerYet))
    ));

    engine.close_auction(crop.id, now).await.unwrap();

    let session = chat.open(crop.id, &winner, now).await.unwrap();
    assert_eq!(session.partner_id, UserId::from("F"));
    assert_eq!(session.partner_name, "F-name");

    // 낙찰자가 한 번 접속한 뒤에는 농부 쪽에서 이름이 보인다
    let session = chat.open(crop.id, &farmer, now).await.unwrap();
    assert_eq!(session.partner_id, UserId::from("W"));
    assert_eq!(session.partner_name, "W-name");

    assert!(matches!(
        chat.open(crop.id, &loser, now).await,
        Err(ChatError::Denied(ChatDenied::NotAuthorized))
    ));
    // 거절된 사용자는 기록되지 않는다
    assert_eq!(store.username(&loser.id).await.unwrap(), None);
    assert!(matches!(
        chat.open(crop.id, &user("G", Role::Farmer), now).await,
        Err(ChatError::Denied(ChatDenied::NotOwner))
    ));

    let sent = chat.send(crop.id, &winner, None, "  hello  ", now).await.unwrap();
    assert_eq!(sent.message.message, "hello");
    assert_eq!(sent.message.receiver_id, UserId::from("F"));

    assert!(matches!(
        chat.send(crop.id, &winner, Some(UserId::from("L")), "hi", now).await,
        Err(ChatError::WrongReceiver)
    ));
    assert!(matches!(
        chat.send(crop.id, &winner, None, "   ", now).await,
        Err(ChatError::EmptyMessage)
    ));

    let history = chat.history(crop.id, &farmer, now).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].sender_name, "W-name");
    assert_eq!(history[0].receiver_name, "F-name");
}

/// 여러 작물 경매는 서로 영향을 주지 않는다
#[tokio::test]
async fn test_auctions_are_independent() {
    let (store, engine) = setup();
    let now = Utc::now();
    let first = create_test_crop(&store, "F", "10", now).await;
    let second = create_test_crop(&store, "F", "10", now).await;

    engine.place_bid(bid(first.id, "A", "20"), now).await.unwrap();
    engine.close_auction(first.id, now).await.unwrap();
    engine.place_bid(bid(second.id, "B", "15"), now).await.unwrap();

    let second = store.get_crop(second.id).await.unwrap().unwrap();
    assert!(second.status.is_open());
    assert_eq!(second.current_price, price("15"));
    assert!(store.winner_for(second.id).await.unwrap().is_none());
    assert_eq!(engine.locks().len(), 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// 받아들여진 입찰은 엄격히 증가하고, 최종 가격은 최고 입찰가다
    #[test]
    fn accepted_bids_strictly_increase(cents in prop::collection::vec(1i64..5_000, 1..30)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let (accepted, final_price, winner_price) = runtime.block_on(async {
            let store = Arc::new(MemoryStore::new());
            let engine = AuctionEngine::new(store.clone());
            let now = Utc::now();
            let crop = create_test_crop(&store, "F", "10.00", now).await;

            let mut accepted = vec![];
            for (i, amount) in cents.iter().enumerate() {
                let cmd = PlaceBidCommand {
                    crop_id: crop.id,
                    bidder_id: UserId(format!("b{i}")),
                    bid_price: Price::from_cents(*amount).unwrap(),
                };
                if let Ok(bid) = engine.place_bid(cmd, now).await {
                    accepted.push(bid.bid_price);
                }
            }
            let final_price = store.get_crop(crop.id).await.unwrap().unwrap().current_price;
            let closure = engine.close_auction(crop.id, now).await.unwrap();
            let winner_price = match closure {
                Closure::WinnerAssigned(_) => store.highest_for(crop.id).await.unwrap().map(|b| b.bid_price),
                Closure::NoBids => None,
            };
            (accepted, final_price, winner_price)
        });

        prop_assert!(accepted.windows(2).all(|w| w[0] < w[1]));
        let expected = cents.iter().copied().max().unwrap_or(0).max(1_000);
        prop_assert_eq!(final_price.cents(), expected);
        prop_assert_eq!(winner_price, accepted.last().copied());
    }
}
