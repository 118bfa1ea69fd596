//! Services Module
//!
//! 비즈니스 로직을 담당하는 서비스 레이어
//!
//! # Services
//! - `EpochRewardCalculator`: 주간 에폭 스코어링 및 리워드 분배

mod epoch;

pub use epoch::{
    allocate_curator_pool, points_for_comment, points_for_upvote, rank_products, score_curators,
    CuratorPayout, EpochError, EpochReport, EpochRewardCalculator, EpochWindow, RankedProduct,
    WinnerSummary,
};
