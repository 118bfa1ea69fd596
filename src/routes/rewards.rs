//! Reward Lookup Endpoints
//!
//! 발급된 리워드 레코드의 공개 조회. 클레임 처리 자체(claimed 전환,
//! 지갑 연결)는 별도 시스템의 책임이고 여기서는 읽기만 한다.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

use crate::{
    db::{EpochStore, RewardRecord},
    error::ApiError,
    AppState,
};

/// 에폭 리워드 목록 응답
#[derive(Debug, Serialize)]
pub struct EpochRewardsResponse {
    pub epoch_start: String,
    pub count: usize,
    pub rewards: Vec<RewardEntry>,
}

#[derive(Debug, Serialize)]
pub struct RewardEntry {
    pub reward_type: crate::db::RewardType,
    pub product_id: Option<String>,
    pub actor_handle: Option<String>,
    pub amount: i64,
    pub claimed: bool,
}

impl RewardEntry {
    fn from_record(record: &RewardRecord) -> Self {
        Self {
            reward_type: record.reward_type,
            product_id: record.product_id.clone(),
            actor_handle: record.actor_handle.clone(),
            amount: record.amount,
            claimed: record.claimed,
        }
    }
}

/// GET /rewards/:date
///
/// `date` (YYYY-MM-DD, 에폭 시작 월요일) 에 해당하는 리워드 레코드 조회.
/// 해당 에폭에 발급된 레코드가 없으면 404.
pub async fn get_epoch_rewards(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<EpochRewardsResponse>, ApiError> {
    let date = date
        .parse::<NaiveDate>()
        .map_err(|_| ApiError::ValidationError("date must be YYYY-MM-DD".to_string()))?;

    let epoch_start = date.and_time(NaiveTime::MIN).and_utc();

    let records = state.db.list_rewards(epoch_start).await?;
    if records.is_empty() {
        return Err(ApiError::NotFound(format!("rewards for epoch {}", date)));
    }

    Ok(Json(EpochRewardsResponse {
        epoch_start: epoch_start.to_rfc3339(),
        count: records.len(),
        rewards: records.iter().map(RewardEntry::from_record).collect(),
    }))
}
