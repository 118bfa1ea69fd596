//! Sonarbot Reward Backend Library
//!
//! # Overview
//!
//! 이 라이브러리는 Sonarbot 플랫폼의 주간 $SNR 리워드 분배 백엔드를 제공합니다.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                         API                              │
//! │                                                          │
//! │  ┌─────────┐  ┌──────────────────┐  ┌─────────┐         │
//! │  │ Routes  │  │     Services     │  │   DB    │         │
//! │  │ /admin  │──│ EpochReward      │──│ Postgres│         │
//! │  │ /rewards│  │ Calculator       │  │ (sqlx)  │         │
//! │  └─────────┘  └──────────────────┘  └─────────┘         │
//! └─────────────────────────────────────────────────────────┘
//!                           │
//!                           ▼
//!              upvotes / comments / products
//!              (제출·투표 시스템이 쓰는 읽기 전용 데이터)
//! ```
//!
//! ## Modules
//!
//! - `config`: 환경 설정 및 분배 스케줄 관리
//! - `error`: 에러 타입 및 HTTP 매핑
//! - `routes`: HTTP 엔드포인트 핸들러
//! - `services`: 에폭 스코어링/분배 로직
//! - `db`: 데이터베이스 연동 및 스토어 추상화

use std::sync::Arc;

pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod services;

// Re-exports for convenience
pub use config::{Config, RewardSchedule};
pub use db::Database;
pub use error::ApiError;
pub use services::EpochRewardCalculator;

/// 애플리케이션 전역 상태
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub epoch_calculator: Arc<EpochRewardCalculator>,
    pub config: Arc<Config>,
}
