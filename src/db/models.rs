//! Database Models
//!
//! Engagement events (upvotes, comments) and product metadata are written by
//! the submission/voting side of the platform and are read-only here.
//! Reward records are the only rows this service creates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// 업보트 이벤트
///
/// 한 큐레이터가 한 제품에 한 시점에 수행한 행동.
/// 이 서비스는 절대 수정/삭제하지 않음 (읽기 전용)
#[derive(Debug, Clone, FromRow)]
pub struct UpvoteEvent {
    pub product_id: String,

    /// 큐레이터 식별자 (handle)
    pub actor_handle: String,

    /// 이벤트 발생 시간 (UTC)
    pub created_at: DateTime<Utc>,
}

/// 댓글 이벤트
#[derive(Debug, Clone, FromRow)]
pub struct CommentEvent {
    pub product_id: String,

    pub actor_handle: String,

    /// 댓글 본문 - 점수 계산에서는 길이 체크(20자 이상)에만 사용
    pub content: String,

    pub created_at: DateTime<Utc>,
}

/// 제품 메타데이터
#[derive(Debug, Clone, FromRow)]
pub struct Product {
    pub id: String,

    /// 표시용 이름 (리포트에만 사용)
    pub name: String,

    /// 제출자 handle
    pub handle: String,

    /// 등록 시간 - 얼리 디스커버리 보너스 판정 기준.
    /// 레거시 행에는 없을 수 있어 Option
    pub created_at: Option<DateTime<Utc>>,
}

/// 리워드 종류
///
/// - `product_of_week`: 주간 1위 제품에 고정 금액
/// - `curator`: 상위 큐레이터에게 풀 비례 배분
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RewardType {
    ProductOfWeek,
    Curator,
}

/// 리워드 레코드 (영속 출력)
///
/// 에폭당 product_of_week 최대 1건, curator 최대 20건.
/// `claimed`/`wallet_address` 는 이후 클레임 프로세스가 변경하며
/// 이 서비스는 생성만 하고 다시 건드리지 않음.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RewardRecord {
    pub id: Uuid,

    /// 에폭 시작 (항상 월요일 00:00:00 UTC)
    pub epoch_start: DateTime<Utc>,

    /// 에폭 끝 (항상 일요일 23:59:59.999 UTC)
    pub epoch_end: DateTime<Utc>,

    pub reward_type: RewardType,

    /// curator 리워드에서는 None
    pub product_id: Option<String>,

    /// product_of_week 리워드에서는 None
    pub actor_handle: Option<String>,

    /// 토큰 수량 ($SNR, 정수 단위)
    pub amount: i64,

    pub claimed: bool,

    pub wallet_address: Option<String>,

    /// 레코드 생성(분배 계산) 시각
    pub created_at: DateTime<Utc>,
}

impl RewardRecord {
    /// 주간 1위 제품 리워드 레코드 생성
    pub fn product_of_week(
        epoch_start: DateTime<Utc>,
        epoch_end: DateTime<Utc>,
        product_id: &str,
        amount: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            epoch_start,
            epoch_end,
            reward_type: RewardType::ProductOfWeek,
            product_id: Some(product_id.to_string()),
            actor_handle: None,
            amount,
            claimed: false,
            wallet_address: None,
            created_at: Utc::now(),
        }
    }

    /// 큐레이터 리워드 레코드 생성
    pub fn curator(
        epoch_start: DateTime<Utc>,
        epoch_end: DateTime<Utc>,
        actor_handle: &str,
        amount: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            epoch_start,
            epoch_end,
            reward_type: RewardType::Curator,
            product_id: None,
            actor_handle: Some(actor_handle.to_string()),
            amount,
            claimed: false,
            wallet_address: None,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reward_type_serde() {
        let json = serde_json::to_string(&RewardType::ProductOfWeek).unwrap();
        assert_eq!(json, "\"product_of_week\"");

        let parsed: RewardType = serde_json::from_str("\"curator\"").unwrap();
        assert_eq!(parsed, RewardType::Curator);
    }

    #[test]
    fn test_record_constructors() {
        let start = Utc::now();
        let end = start + chrono::Duration::days(7);

        let product = RewardRecord::product_of_week(start, end, "prod-1", 300_000_000);
        assert_eq!(product.reward_type, RewardType::ProductOfWeek);
        assert_eq!(product.product_id.as_deref(), Some("prod-1"));
        assert!(product.actor_handle.is_none());
        assert!(!product.claimed);
        assert!(product.created_at >= start);

        let curator = RewardRecord::curator(start, end, "alice", 1_000);
        assert_eq!(curator.reward_type, RewardType::Curator);
        assert!(curator.product_id.is_none());
        assert_eq!(curator.actor_handle.as_deref(), Some("alice"));
    }
}
