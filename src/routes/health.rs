//! Health Check Endpoint
//!
//! 단순 프로세스 생존 확인이 아니라 서비스 가능 상태를 보고한다:
//! DB ping 이 실패하면 에폭 실행도 리워드 조회도 불가능하므로
//! status 를 degraded 로 내려 로드밸런서/모니터링이 걸러낼 수 있게 한다.
//! 마지막으로 분배된 에폭 시작 시각도 함께 노출해 주간 cron 이
//! 빠졌는지 한눈에 확인 가능.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::AppState;

/// Health check 응답
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// healthy | degraded
    pub status: String,
    pub version: String,
    pub database: DatabaseStatus,
    /// 마지막으로 리워드가 기록된 에폭의 시작 시각.
    /// 분배 이력이 없거나 DB 가 죽어있으면 null
    pub last_epoch_start: Option<String>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct DatabaseStatus {
    pub connected: bool,
    pub latency_ms: Option<u64>,
}

impl HealthResponse {
    fn report(database: DatabaseStatus, last_epoch_start: Option<DateTime<Utc>>) -> Self {
        Self {
            status: if database.connected { "healthy" } else { "degraded" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database,
            last_epoch_start: last_epoch_start.map(|t| t.to_rfc3339()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// GET /health
///
/// DB ping + 분배 이력 요약
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let ping_start = std::time::Instant::now();

    let (database, last_epoch_start) = match state.db.health_check().await {
        Ok(_) => {
            let latency_ms = ping_start.elapsed().as_millis() as u64;
            // 이력 조회 실패는 health 자체를 degraded 로 만들지 않음
            let last = state.db.last_epoch_start().await.ok().flatten();
            (
                DatabaseStatus {
                    connected: true,
                    latency_ms: Some(latency_ms),
                },
                last,
            )
        }
        Err(_) => (
            DatabaseStatus {
                connected: false,
                latency_ms: None,
            },
            None,
        ),
    };

    Json(HealthResponse::report(database, last_epoch_start))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_report_degraded_when_db_down() {
        let response = HealthResponse::report(
            DatabaseStatus {
                connected: false,
                latency_ms: None,
            },
            None,
        );
        assert_eq!(response.status, "degraded");
        assert!(response.last_epoch_start.is_none());
    }

    #[test]
    fn test_report_healthy_with_last_epoch() {
        let epoch = Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 0).unwrap();
        let response = HealthResponse::report(
            DatabaseStatus {
                connected: true,
                latency_ms: Some(2),
            },
            Some(epoch),
        );
        assert_eq!(response.status, "healthy");
        assert_eq!(
            response.last_epoch_start.as_deref(),
            Some("2025-01-06T00:00:00+00:00")
        );
    }
}
