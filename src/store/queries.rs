/// 작물 컬럼
const CROP_COLUMNS: &str = "id, farmer_id, farmer_name, farmer_email, name, crop_type, quality, location, notes, quantity, current_price_cents, status, leading_bidder_id, images, created_at, closes_at";

/// 작물 등록
pub const INSERT_CROP: &str = r#"
    INSERT INTO crops (id, farmer_id, farmer_name, farmer_email, name, crop_type, quality, location, notes, quantity, current_price_cents, status, leading_bidder_id, images, created_at, closes_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
"#;

/// 작물 조회
pub fn get_crop() -> String {
    format!("SELECT {CROP_COLUMNS} FROM crops WHERE id = $1")
}

/// 모든 작물 조회
pub fn get_all_crops() -> String {
    format!("SELECT {CROP_COLUMNS} FROM crops ORDER BY created_at DESC")
}

/// 작물 설명 수정
pub const UPDATE_CROP_DETAILS: &str = r#"
    UPDATE crops
    SET name = $2, crop_type = $3, quality = $4, location = $5, notes = $6, quantity = $7, images = $8
    WHERE id = $1
"#;

/// 시작가 변경 (입찰 전)
pub const REPRICE_CROP: &str = r#"
    UPDATE crops SET current_price_cents = $3
    WHERE id = $1 AND current_price_cents = $2 AND status = 'Available' AND leading_bidder_id IS NULL
"#;

/// 작물 삭제
pub const DELETE_CROP: &str = "DELETE FROM crops WHERE id = $1";

/// 입찰 반영 (낙관적 갱신)
pub const APPLY_BID: &str = r#"
    UPDATE crops SET current_price_cents = $3, leading_bidder_id = $4
    WHERE id = $1 AND current_price_cents = $2 AND status = 'Available'
    RETURNING id
"#;

/// 입찰 원장 추가
pub const APPEND_BID: &str = r#"
    INSERT INTO bids (crop_id, bidder_id, bid_price_cents, placed_at)
    VALUES ($1, $2, $3, $4)
    RETURNING id
"#;

/// 최고 입찰 조회
pub const GET_HIGHEST_BID: &str = r#"
    SELECT id, crop_id, bidder_id, bid_price_cents, placed_at
    FROM bids
    WHERE crop_id = $1
    ORDER BY bid_price_cents DESC, placed_at ASC, id ASC
    LIMIT 1
"#;

/// 입찰 이력 조회
pub const GET_BID_HISTORY: &str = r#"
    SELECT id, crop_id, bidder_id, bid_price_cents, placed_at
    FROM bids
    WHERE crop_id = $1
    ORDER BY bid_price_cents DESC, placed_at ASC, id ASC
"#;

pub const DELETE_BIDS: &str = "DELETE FROM bids WHERE crop_id = $1";

/// 경매 상태 변경 (종료)
pub const CLOSE_CROP: &str = r#"
    UPDATE crops SET status = $3
    WHERE id = $1 AND current_price_cents = $2
    RETURNING id
"#;

/// 낙찰자 upsert
pub const ASSIGN_WINNER: &str = r#"
    INSERT INTO auction_winners (crop_id, user_id, assigned_at)
    VALUES ($1, $2, $3)
    ON CONFLICT (crop_id) DO UPDATE SET user_id = EXCLUDED.user_id, assigned_at = EXCLUDED.assigned_at
"#;

/// 낙찰자 조회
pub const GET_WINNER: &str =
    "SELECT crop_id, user_id, assigned_at FROM auction_winners WHERE crop_id = $1";

pub const DELETE_WINNER: &str = "DELETE FROM auction_winners WHERE crop_id = $1";

/// 메시지 추가
pub const INSERT_MESSAGE: &str = r#"
    INSERT INTO messages (crop_id, sender_id, receiver_id, message, sent_at)
    VALUES ($1, $2, $3, $4, $5)
    RETURNING id
"#;

/// 메시지 조회
pub const GET_MESSAGES: &str = r#"
    SELECT id, crop_id, sender_id, receiver_id, message, sent_at
    FROM messages
    WHERE crop_id = $1
    ORDER BY sent_at ASC, id ASC
"#;

pub const DELETE_MESSAGES: &str = "DELETE FROM messages WHERE crop_id = $1";

/// 찜 추가 (중복이면 무시)
pub const INSERT_WISHLIST: &str = r#"
    INSERT INTO wishlist (user_id, crop_id, added_at)
    VALUES ($1, $2, $3)
    ON CONFLICT (user_id, crop_id) DO NOTHING
"#;

/// 찜 목록 조회
pub const GET_WISHLIST: &str = r#"
    SELECT user_id, crop_id, added_at
    FROM wishlist
    WHERE user_id = $1
    ORDER BY added_at ASC
"#;

pub const DELETE_WISHLIST_FOR_CROP: &str = "DELETE FROM wishlist WHERE crop_id = $1";

/// 사용자 upsert
pub const UPSERT_USER: &str = r#"
    INSERT INTO users (id, username, email)
    VALUES ($1, $2, $3)
    ON CONFLICT (id) DO UPDATE SET username = EXCLUDED.username, email = EXCLUDED.email
"#;

pub const GET_USERNAME: &str = "SELECT username FROM users WHERE id = $1";
