//! Epoch Trigger Endpoints
//!
//! 주간 리워드 분배를 실행하는 관리자 전용 엔드포인트.
//! 외부 cron 또는 운영자가 주 1회 호출하는 것을 전제로 하며,
//! 서비스 내부에 스케줄러는 없다.

use axum::{extract::State, http::HeaderMap, Json};
use chrono::Utc;
use serde::Serialize;

use crate::{error::ApiError, services::{EpochError, EpochReport}, AppState};

/// 관리자 키 헤더 이름
const ADMIN_KEY_HEADER: &str = "x-admin-key";

// ============ Response Types ============

/// 에폭 실행 응답
#[derive(Debug, Serialize)]
pub struct EpochRunResponse {
    pub success: bool,
    pub epoch: EpochTimes,
    /// 업보트가 하나도 없던 주에는 null
    pub product_of_week: Option<ProductOfWeekEntry>,
    /// 실제 지급된(0 초과) 큐레이터 리워드, 지급 순위 순
    pub top_curators: Vec<CuratorEntry>,
    pub scoring_summary: ScoringSummary,
    pub summary: DistributionSummary,
    /// 적용된 분배 스케줄 버전 (taper 추적용)
    pub schedule_version: u32,
    /// preview 에서는 false - 레코드 미기록
    pub persisted: bool,
}

#[derive(Debug, Serialize)]
pub struct EpochTimes {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Serialize)]
pub struct ProductOfWeekEntry {
    pub name: String,
    pub handle: String,
    pub upvotes: u64,
    pub reward: i64,
}

#[derive(Debug, Serialize)]
pub struct CuratorEntry {
    pub rank: u32,
    pub handle: String,
    pub score: i64,
    pub reward: i64,
}

#[derive(Debug, Serialize)]
pub struct ScoringSummary {
    pub total_products_ranked: usize,
    pub total_curators_scored: usize,
    pub total_upvotes_processed: usize,
    pub total_comments_processed: usize,
}

#[derive(Debug, Serialize)]
pub struct DistributionSummary {
    pub total_rewards_distributed: i64,
    pub product_rewards: i64,
    pub curator_rewards: i64,
    /// 회계 라벨 - 대응하는 레코드나 잔고 변화 없음
    pub burned: i64,
}

impl EpochRunResponse {
    fn from_report(report: EpochReport) -> Self {
        Self {
            success: true,
            epoch: EpochTimes {
                start: report.window.start.to_rfc3339(),
                end: report.window.end.to_rfc3339(),
            },
            product_of_week: report.winner.as_ref().map(|w| ProductOfWeekEntry {
                name: w.name.clone(),
                handle: w.handle.clone(),
                upvotes: w.upvotes,
                reward: w.reward,
            }),
            top_curators: report
                .curators
                .iter()
                .map(|c| CuratorEntry {
                    rank: c.rank,
                    handle: c.handle.clone(),
                    score: c.score,
                    reward: c.reward,
                })
                .collect(),
            scoring_summary: ScoringSummary {
                total_products_ranked: report.products_ranked,
                total_curators_scored: report.curators_scored,
                total_upvotes_processed: report.upvotes_processed,
                total_comments_processed: report.comments_processed,
            },
            summary: DistributionSummary {
                total_rewards_distributed: report.total_distributed(),
                product_rewards: report.winner.as_ref().map(|w| w.reward).unwrap_or(0),
                curator_rewards: report.curator_total(),
                burned: report.schedule.burn_amount,
            },
            schedule_version: report.schedule.version,
            persisted: report.persisted,
        }
    }
}

// ============ Handlers ============

/// POST /admin/epoch/run
///
/// 직전 완결 주의 리워드를 계산하고 영속화.
///
/// # Errors
///
/// - 401: 관리자 키 누락/불일치 (어떤 계산도 수행 전에 거부)
/// - 409: 해당 에폭의 리워드가 이미 분배됨
/// - 500: 업보트 조회 또는 영속화 실패
pub async fn run_epoch(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<EpochRunResponse>, ApiError> {
    authorize_admin(&state, &headers)?;

    let report = state
        .epoch_calculator
        .run_epoch(Utc::now())
        .await
        .map_err(map_epoch_error)?;

    Ok(Json(EpochRunResponse::from_report(report)))
}

/// GET /admin/epoch/preview
///
/// 영속화 없는 dry run - 분배 전 순위 확인용
pub async fn preview_epoch(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<EpochRunResponse>, ApiError> {
    authorize_admin(&state, &headers)?;

    let report = state
        .epoch_calculator
        .preview_epoch(Utc::now())
        .await
        .map_err(map_epoch_error)?;

    Ok(Json(EpochRunResponse::from_report(report)))
}

// ============ Helpers ============

/// 정적 관리자 키 정확 일치 검사
///
/// 실패 시 윈도우 상태에 대한 어떤 정보도 노출하지 않음
fn authorize_admin(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let provided = headers
        .get(ADMIN_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    if provided != state.config.admin_api_key {
        return Err(ApiError::Unauthorized);
    }
    Ok(())
}

fn map_epoch_error(err: EpochError) -> ApiError {
    match err {
        EpochError::Conflict => ApiError::Conflict(err.to_string()),
        EpochError::Data(msg) => ApiError::DatabaseError(msg),
    }
}
