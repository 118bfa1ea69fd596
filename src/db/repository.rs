//! Store Abstraction
//!
//! 에폭 계산기가 필요로 하는 데이터 접근을 trait 로 분리.
//!
//! 장점:
//! - 스코어링 로직과 데이터 접근 분리
//! - 테스트 시 Mock 구현으로 Postgres 없이 전체 파이프라인 검증
//! - DB 교체 시 영향 최소화
//!
//! PostgreSQL 구현은 `db/mod.rs` 의 `Database` 구조체에 있음.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::models::{CommentEvent, Product, RewardRecord, UpvoteEvent};
use crate::error::StoreError;

/// 에폭 계산기가 소비하는 읽기/쓰기 인터페이스
///
/// 시간 범위 조회는 양끝 포함 (`start <= created_at <= end`).
#[async_trait]
pub trait EpochStore: Send + Sync {
    /// 기간 내 모든 업보트 이벤트
    async fn fetch_upvotes(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<UpvoteEvent>, StoreError>;

    /// 기간 내 모든 댓글 이벤트
    async fn fetch_comments(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CommentEvent>, StoreError>;

    /// id 집합에 해당하는 제품 메타데이터
    async fn fetch_products(&self, ids: &[String]) -> Result<Vec<Product>, StoreError>;

    /// 해당 epoch_start 에 리워드 레코드가 이미 존재하는지 (중복 분배 방지 probe)
    async fn rewards_exist(&self, epoch_start: DateTime<Utc>) -> Result<bool, StoreError>;

    /// 리워드 레코드 일괄 삽입 - 전부 쓰이거나 전부 안 쓰이거나
    async fn insert_rewards(&self, records: &[RewardRecord]) -> Result<(), StoreError>;

    /// 해당 에폭에 발급된 리워드 레코드 목록
    async fn list_rewards(&self, epoch_start: DateTime<Utc>)
        -> Result<Vec<RewardRecord>, StoreError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::RwLock;

    /// 인메모리 Mock 스토어
    ///
    /// `fail_upvotes`/`fail_comments` 플래그로 조회 실패를 주입해
    /// 성능 저하 경로(댓글)와 치명 경로(업보트)를 각각 검증할 수 있음
    #[derive(Default)]
    pub struct MockEpochStore {
        pub upvotes: Vec<UpvoteEvent>,
        pub comments: Vec<CommentEvent>,
        pub products: Vec<Product>,
        pub rewards: RwLock<Vec<RewardRecord>>,
        pub fail_upvotes: bool,
        pub fail_comments: bool,
        pub fail_insert: bool,
    }

    impl MockEpochStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn saved_rewards(&self) -> Vec<RewardRecord> {
            self.rewards.read().unwrap().clone()
        }
    }

    #[async_trait]
    impl EpochStore for MockEpochStore {
        async fn fetch_upvotes(
            &self,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> Result<Vec<UpvoteEvent>, StoreError> {
            if self.fail_upvotes {
                return Err(StoreError::Database("upvotes unavailable".to_string()));
            }
            Ok(self
                .upvotes
                .iter()
                .filter(|u| u.created_at >= start && u.created_at <= end)
                .cloned()
                .collect())
        }

        async fn fetch_comments(
            &self,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> Result<Vec<CommentEvent>, StoreError> {
            if self.fail_comments {
                return Err(StoreError::Database("comments unavailable".to_string()));
            }
            Ok(self
                .comments
                .iter()
                .filter(|c| c.created_at >= start && c.created_at <= end)
                .cloned()
                .collect())
        }

        async fn fetch_products(&self, ids: &[String]) -> Result<Vec<Product>, StoreError> {
            Ok(self
                .products
                .iter()
                .filter(|p| ids.contains(&p.id))
                .cloned()
                .collect())
        }

        async fn rewards_exist(&self, epoch_start: DateTime<Utc>) -> Result<bool, StoreError> {
            let rewards = self.rewards.read().unwrap();
            Ok(rewards.iter().any(|r| r.epoch_start == epoch_start))
        }

        async fn insert_rewards(&self, records: &[RewardRecord]) -> Result<(), StoreError> {
            if self.fail_insert {
                return Err(StoreError::Database("rewards insert unavailable".to_string()));
            }
            let mut rewards = self.rewards.write().unwrap();
            // DB 의 partial unique index 를 흉내냄
            for record in records {
                let duplicate = rewards.iter().any(|r| {
                    r.epoch_start == record.epoch_start && r.reward_type == record.reward_type
                        && r.actor_handle == record.actor_handle
                });
                if duplicate {
                    return Err(StoreError::UniqueViolation);
                }
            }
            rewards.extend_from_slice(records);
            Ok(())
        }

        async fn list_rewards(
            &self,
            epoch_start: DateTime<Utc>,
        ) -> Result<Vec<RewardRecord>, StoreError> {
            let rewards = self.rewards.read().unwrap();
            Ok(rewards
                .iter()
                .filter(|r| r.epoch_start == epoch_start)
                .cloned()
                .collect())
        }
    }
}
