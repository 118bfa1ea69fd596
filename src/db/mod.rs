//! Database Module
//!
//! # Interview Q&A
//!
//! Q: 왜 PostgreSQL 인가?
//! A: 리워드 분배 백엔드에 적합한 이유
//!
//!    1. ACID 트랜잭션: 리워드 레코드 일괄 삽입의 all-or-nothing 보장
//!    2. partial unique index: 에폭당 중복 분배를 DB 레벨에서 차단
//!    3. 인덱싱: 시간 범위(주간 윈도우) 조회 최적화
//!    4. 생태계: SQLx 의 컴파일 타임 쿼리 검증, async 지원
//!
//! Q: check-then-insert 레이스는 어떻게 막는가?
//! A: 애플리케이션의 사전 probe(rewards_exist)는 advisory 일 뿐이고,
//!    실제 보장은 `uniq_rewards_epoch_product_of_week` partial unique
//!    index 가 한다. 두 호출이 동시에 probe 를 통과해도 늦은 쪽의
//!    삽입이 unique violation 으로 실패하고, 트랜잭션 롤백으로
//!    부분 기록도 남지 않는다.

mod models;
mod repository;

pub use models::*;
pub use repository::EpochStore;

#[cfg(test)]
pub use repository::mock;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::error::StoreError;

/// 데이터베이스 연결 및 쿼리 담당
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 데이터베이스 연결
    ///
    /// # Connection Pool Settings
    ///
    /// - max_connections: 10 (트래픽에 따라 조정)
    /// - min_connections: 1 (idle 시 최소 유지)
    /// - acquire_timeout: 3초 (커넥션 획득 대기)
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .min_connections(1)
            .acquire_timeout(std::time::Duration::from_secs(3))
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// 마이그레이션 실행
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await?;
        Ok(())
    }

    /// Health check
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// 마지막으로 분배가 기록된 에폭 시작 시각 (없으면 None)
    pub async fn last_epoch_start(&self) -> Result<Option<DateTime<Utc>>> {
        let row: (Option<DateTime<Utc>>,) =
            sqlx::query_as("SELECT MAX(epoch_start) FROM rewards")
                .fetch_one(&self.pool)
                .await?;
        Ok(row.0)
    }
}

#[async_trait]
impl EpochStore for Database {
    async fn fetch_upvotes(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<UpvoteEvent>, StoreError> {
        let upvotes = sqlx::query_as::<_, UpvoteEvent>(
            r#"
            SELECT product_id, actor_handle, created_at
            FROM upvotes
            WHERE created_at >= $1 AND created_at <= $2
            ORDER BY created_at ASC
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(upvotes)
    }

    async fn fetch_comments(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CommentEvent>, StoreError> {
        let comments = sqlx::query_as::<_, CommentEvent>(
            r#"
            SELECT product_id, actor_handle, content, created_at
            FROM comments
            WHERE created_at >= $1 AND created_at <= $2
            ORDER BY created_at ASC
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    async fn fetch_products(&self, ids: &[String]) -> Result<Vec<Product>, StoreError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, handle, created_at
            FROM products
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    async fn rewards_exist(&self, epoch_start: DateTime<Utc>) -> Result<bool, StoreError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM rewards WHERE epoch_start = $1",
        )
        .bind(epoch_start)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0 > 0)
    }

    async fn insert_rewards(&self, records: &[RewardRecord]) -> Result<(), StoreError> {
        // 단일 트랜잭션: 전부 쓰이거나 전부 안 쓰이거나.
        // unique violation 은 StoreError::UniqueViolation 으로 구분되어
        // 호출 측에서 409 로 보고됨
        let mut tx = self.pool.begin().await?;

        for record in records {
            sqlx::query(
                r#"
                INSERT INTO rewards (
                    id, epoch_start, epoch_end, reward_type,
                    product_id, actor_handle, amount, claimed, wallet_address,
                    created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(record.id)
            .bind(record.epoch_start)
            .bind(record.epoch_end)
            .bind(record.reward_type)
            .bind(&record.product_id)
            .bind(&record.actor_handle)
            .bind(record.amount)
            .bind(record.claimed)
            .bind(&record.wallet_address)
            .bind(record.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_rewards(
        &self,
        epoch_start: DateTime<Utc>,
    ) -> Result<Vec<RewardRecord>, StoreError> {
        let records = sqlx::query_as::<_, RewardRecord>(
            r#"
            SELECT
                id, epoch_start, epoch_end, reward_type,
                product_id, actor_handle, amount, claimed, wallet_address,
                created_at
            FROM rewards
            WHERE epoch_start = $1
            ORDER BY reward_type ASC, amount DESC
            "#,
        )
        .bind(epoch_start)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
