//! Epoch Reward Calculator
//!
//! 주간 에폭(월~일 UTC) 동안의 업보트/댓글 참여를 집계해
//! $SNR 분배 매니페스트를 계산하는 서비스.
//!
//! # Scoring Pipeline
//!
//! ```text
//! 1. 윈도우 도출     - 직전에 *완결된* 주 (월 00:00:00.000 ~ 일 23:59:59.999 UTC)
//! 2. 이벤트 조회     - 윈도우 내 업보트/댓글 + 참조된 제품 메타데이터
//! 3. 제품 랭킹       - 업보트 수 내림차순, 1-indexed
//! 4. 큐레이터 점수   - 랭크 가중 포인트 + 24h 얼리 디스커버리 2배 보너스
//! 5. 분배           - 1위 제품 고정 리워드, 상위 20 큐레이터 풀 비례 배분
//! 6. 영속화         - 단일 트랜잭션 일괄 삽입 (중복 에폭이면 거부)
//! ```
//!
//! 3~5 단계는 순수 인메모리 계산이고 suspension point 는 조회/삽입뿐.
//! 점수 맵과 댓글 dedup 집합은 한 번의 실행 동안만 살아있다.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use thiserror::Error;

use crate::config::RewardSchedule;
use crate::db::{CommentEvent, EpochStore, Product, RewardRecord, UpvoteEvent};
use crate::error::StoreError;

/// 리워드를 받는 큐레이터 수 상한
const TOP_CURATOR_COUNT: usize = 20;

/// 점수에 반영되는 댓글의 최소 길이 (문자 수)
const MIN_COMMENT_CHARS: usize = 20;

/// 얼리 디스커버리 보너스 윈도우 (제품 등록 후 24시간, 경계 포함)
const EARLY_DISCOVERY_HOURS: i64 = 24;

/// 에폭 윈도우 - 항상 완결된 주 단위
///
/// 불변식: `start` 는 월요일 00:00:00.000 UTC, `end` 는 그 주
/// 일요일 23:59:59.999 UTC. 양끝 포함 범위로 사용됨.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl EpochWindow {
    /// `now` 기준 가장 최근에 완결된 주의 윈도우
    ///
    /// 이번 주 월요일에서 7일을 빼므로 진행 중인 주는 절대 포함되지 않는다.
    /// `now` 가 월요일 00:00 정각이어도 직전 주가 선택됨.
    pub fn for_completed_week(now: DateTime<Utc>) -> Self {
        let days_from_monday = now.date_naive().weekday().num_days_from_monday() as i64;
        let monday_this_week = now.date_naive() - Duration::days(days_from_monday);
        let start_date = monday_this_week - Duration::days(7);

        let start = start_date.and_time(NaiveTime::MIN).and_utc();
        let end = start + Duration::days(7) - Duration::milliseconds(1);

        Self { start, end }
    }
}

/// 윈도우 내에서 업보트를 받은 제품의 랭킹 엔트리
#[derive(Debug, Clone)]
pub struct RankedProduct {
    pub product_id: String,
    pub upvotes: u64,
    /// 윈도우 내 첫 업보트 시각 - 동점 타이브레이크 기준
    pub first_upvote_at: DateTime<Utc>,
    /// 1-indexed
    pub rank: u32,
}

/// 큐레이터 1인의 지급 내역
#[derive(Debug, Clone)]
pub struct CuratorPayout {
    /// 지급 목록 내 1-indexed 순위
    pub rank: u32,
    pub handle: String,
    pub score: i64,
    pub reward: i64,
}

/// 주간 1위 제품 요약
#[derive(Debug, Clone)]
pub struct WinnerSummary {
    pub product_id: String,
    pub name: String,
    pub handle: String,
    pub upvotes: u64,
    pub reward: i64,
}

/// 에폭 실행 결과 (라우트 레이어가 JSON 으로 변환)
#[derive(Debug, Clone)]
pub struct EpochReport {
    pub window: EpochWindow,
    pub schedule: RewardSchedule,
    pub winner: Option<WinnerSummary>,
    pub curators: Vec<CuratorPayout>,
    pub products_ranked: usize,
    pub curators_scored: usize,
    pub upvotes_processed: usize,
    pub comments_processed: usize,
    /// preview 실행에서는 false (레코드 미기록)
    pub persisted: bool,
}

impl EpochReport {
    /// 큐레이터 지급 합계
    pub fn curator_total(&self) -> i64 {
        self.curators.iter().map(|c| c.reward).sum()
    }

    /// 표시용 총 분배량 = 제품 리워드 + 큐레이터 합계 + 소각량.
    /// 소각은 레코드가 없는 회계 라벨이며 여기에만 반영된다.
    pub fn total_distributed(&self) -> i64 {
        self.winner.as_ref().map(|w| w.reward).unwrap_or(0)
            + self.curator_total()
            + self.schedule.burn_amount
    }
}

/// 에폭 계산 에러
///
/// - `Conflict`: 해당 에폭의 레코드가 이미 존재 (중복 분배 차단)
/// - `Data`: 업보트 조회 또는 영속화 실패 - 둘 다 치명적.
///   댓글 조회 실패는 에러가 아니라 빈 댓글로 degrade 된다.
#[derive(Debug, Error)]
pub enum EpochError {
    #[error("rewards already calculated for this epoch")]
    Conflict,

    #[error("epoch data unavailable: {0}")]
    Data(String),
}

impl From<StoreError> for EpochError {
    fn from(err: StoreError) -> Self {
        match err {
            // 사전 probe 를 통과한 동시 호출이 삽입 시점에 잡힌 경우
            StoreError::UniqueViolation => EpochError::Conflict,
            other => EpochError::Data(other.to_string()),
        }
    }
}

/// 주간 에폭 리워드 계산기
pub struct EpochRewardCalculator {
    store: Arc<dyn EpochStore>,
    schedule: RewardSchedule,
}

impl EpochRewardCalculator {
    pub fn new(store: Arc<dyn EpochStore>, schedule: RewardSchedule) -> Self {
        Self { store, schedule }
    }

    /// 에폭 실행: 계산 + 리워드 레코드 영속화
    ///
    /// `now` 는 윈도우 도출에만 쓰인다. 같은 윈도우에 대한 두 번째
    /// 호출은 `Conflict` 로 거부되며 어떤 부수효과도 남기지 않는다.
    pub async fn run_epoch(&self, now: DateTime<Utc>) -> Result<EpochReport, EpochError> {
        let window = EpochWindow::for_completed_week(now);

        // 중복 분배 probe - advisory. 레이스의 최종 방어선은
        // rewards 테이블의 partial unique index (삽입 시 UniqueViolation)
        if self.store.rewards_exist(window.start).await? {
            return Err(EpochError::Conflict);
        }

        let mut report = self.compute(window).await?;
        let records = build_records(&report, window, &self.schedule);

        if !records.is_empty() {
            self.store.insert_rewards(&records).await?;
        }
        report.persisted = true;

        tracing::info!(
            epoch_start = %window.start,
            products_ranked = report.products_ranked,
            curators_paid = report.curators.len(),
            total_distributed = report.total_distributed(),
            "epoch rewards distributed"
        );

        Ok(report)
    }

    /// Dry run: 영속화 없이 현재 기준 직전 완결 주의 결과를 계산
    ///
    /// 운영자가 분배 전에 순위를 확인하는 용도. 중복 probe 도 하지 않으므로
    /// 이미 분배된 에폭도 다시 보여줄 수 있다.
    pub async fn preview_epoch(&self, now: DateTime<Utc>) -> Result<EpochReport, EpochError> {
        let window = EpochWindow::for_completed_week(now);
        self.compute(window).await
    }

    /// 조회 + 순수 계산 (영속화 제외)
    async fn compute(&self, window: EpochWindow) -> Result<EpochReport, EpochError> {
        // 업보트 조회 실패는 치명적
        let upvotes = self
            .store
            .fetch_upvotes(window.start, window.end)
            .await
            .map_err(|e| EpochError::Data(format!("upvote retrieval failed: {}", e)))?;

        // 댓글 조회 실패는 빈 댓글로 degrade
        let comments = match self.store.fetch_comments(window.start, window.end).await {
            Ok(comments) => comments,
            Err(e) => {
                tracing::warn!("comment retrieval failed, scoring without comments: {}", e);
                vec![]
            }
        };

        // 두 이벤트 집합이 참조하는 제품 메타데이터
        let mut product_ids: Vec<String> = upvotes
            .iter()
            .map(|u| u.product_id.clone())
            .chain(comments.iter().map(|c| c.product_id.clone()))
            .collect();
        product_ids.sort();
        product_ids.dedup();

        let products = self.store.fetch_products(&product_ids).await?;
        let products_by_id: HashMap<&str, &Product> =
            products.iter().map(|p| (p.id.as_str(), p)).collect();

        let ranked = rank_products(&upvotes);
        let ranks: HashMap<&str, u32> = ranked
            .iter()
            .map(|r| (r.product_id.as_str(), r.rank))
            .collect();

        let scores = score_curators(&upvotes, &comments, &ranks, &products_by_id);
        let curators_scored = scores.len();
        let curators = allocate_curator_pool(scores, self.schedule.curator_pool);

        let winner = ranked.first().map(|top| {
            let meta = products_by_id.get(top.product_id.as_str());
            WinnerSummary {
                product_id: top.product_id.clone(),
                name: meta.map(|p| p.name.clone()).unwrap_or_else(|| top.product_id.clone()),
                handle: meta.map(|p| p.handle.clone()).unwrap_or_default(),
                upvotes: top.upvotes,
                reward: self.schedule.product_reward,
            }
        });

        Ok(EpochReport {
            window,
            schedule: self.schedule,
            winner,
            curators,
            products_ranked: ranked.len(),
            curators_scored,
            upvotes_processed: upvotes.len(),
            comments_processed: comments.len(),
            persisted: false,
        })
    }
}

/// 윈도우 내 업보트 수 기준 제품 랭킹
///
/// 정렬: 업보트 수 내림차순 → 첫 업보트 시각 오름차순 → 제품 id.
/// 첫 업보트 타이브레이크는 조회 순서에 따라 순위가 흔들리는 것을 막는다
/// (같은 표라면 먼저 발견된 쪽이 위).
/// 업보트가 없는 제품은 랭킹에 없고 포인트를 만들 수 없다.
pub fn rank_products(upvotes: &[UpvoteEvent]) -> Vec<RankedProduct> {
    let mut tally: HashMap<&str, (u64, DateTime<Utc>)> = HashMap::new();
    for upvote in upvotes {
        let entry = tally
            .entry(upvote.product_id.as_str())
            .or_insert((0, upvote.created_at));
        entry.0 += 1;
        if upvote.created_at < entry.1 {
            entry.1 = upvote.created_at;
        }
    }

    let mut ranked: Vec<RankedProduct> = tally
        .into_iter()
        .map(|(product_id, (upvotes, first_upvote_at))| RankedProduct {
            product_id: product_id.to_string(),
            upvotes,
            first_upvote_at,
            rank: 0,
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.upvotes
            .cmp(&a.upvotes)
            .then(a.first_upvote_at.cmp(&b.first_upvote_at))
            .then(a.product_id.cmp(&b.product_id))
    });

    for (i, product) in ranked.iter_mut().enumerate() {
        product.rank = (i + 1) as u32;
    }

    ranked
}

/// 업보트 포인트 테이블
pub fn points_for_upvote(rank: u32) -> i64 {
    match rank {
        1 => 10,
        2 => 8,
        3 => 6,
        4..=10 => 3,
        _ => 0,
    }
}

/// 댓글 포인트 테이블
pub fn points_for_comment(rank: u32) -> i64 {
    match rank {
        1..=3 => 5,
        4..=10 => 2,
        _ => 0,
    }
}

/// 얼리 디스커버리 배수
///
/// 제품 등록 후 24시간 이내(경계 포함)의 참여는 2배.
/// 등록 시각보다 앞선 이벤트(음수 간격)는 보너스 없음.
fn early_discovery_multiplier(
    event_at: DateTime<Utc>,
    product_created_at: Option<DateTime<Utc>>,
) -> i64 {
    match product_created_at {
        Some(created_at) => {
            let elapsed = event_at - created_at;
            if elapsed >= Duration::zero() && elapsed <= Duration::hours(EARLY_DISCOVERY_HOURS) {
                2
            } else {
                1
            }
        }
        None => 1,
    }
}

/// 큐레이터 점수 누적
///
/// 업보트: 윈도우 내 모든 이벤트가 각각 집계된다 (반복 업보트 증폭 방지는
/// 업스트림 책임). 댓글: 20자 이상만, (큐레이터, 제품) 쌍당 첫 댓글 하나만.
/// 점수 맵에는 0 초과 점수를 얻은 handle 만 들어간다.
pub fn score_curators(
    upvotes: &[UpvoteEvent],
    comments: &[CommentEvent],
    ranks: &HashMap<&str, u32>,
    products_by_id: &HashMap<&str, &Product>,
) -> HashMap<String, i64> {
    let mut scores: HashMap<String, i64> = HashMap::new();
    let mut commented: HashMap<&str, HashSet<&str>> = HashMap::new();

    for upvote in upvotes {
        let Some(&rank) = ranks.get(upvote.product_id.as_str()) else {
            continue;
        };
        let created_at = products_by_id
            .get(upvote.product_id.as_str())
            .and_then(|p| p.created_at);
        let points =
            points_for_upvote(rank) * early_discovery_multiplier(upvote.created_at, created_at);
        if points > 0 {
            *scores.entry(upvote.actor_handle.clone()).or_insert(0) += points;
        }
    }

    for comment in comments {
        if comment.content.chars().count() < MIN_COMMENT_CHARS {
            continue;
        }
        // 같은 제품에 대한 두 번째 이후 qualifying 댓글은 무시
        let seen = commented
            .entry(comment.actor_handle.as_str())
            .or_default();
        if !seen.insert(comment.product_id.as_str()) {
            continue;
        }

        let Some(&rank) = ranks.get(comment.product_id.as_str()) else {
            continue;
        };
        let created_at = products_by_id
            .get(comment.product_id.as_str())
            .and_then(|p| p.created_at);
        let points =
            points_for_comment(rank) * early_discovery_multiplier(comment.created_at, created_at);
        if points > 0 {
            *scores.entry(comment.actor_handle.clone()).or_insert(0) += points;
        }
    }

    scores
}

/// 상위 20 큐레이터에게 풀을 비례 배분
///
/// 분모(totalScore)는 정확히 상위 20명의 점수 합 - 21위 이하는 지급은
/// 물론 분모에서도 제외된다. 개별 지급액은 `score * pool / total` 의
/// 내림(floor)이고, 내림으로 남는 잔여분은 분배되지 않는다.
/// 0 이 된 지급은 생략.
pub fn allocate_curator_pool(
    scores: HashMap<String, i64>,
    curator_pool: i64,
) -> Vec<CuratorPayout> {
    let mut top: Vec<(String, i64)> = scores.into_iter().collect();
    // 점수 내림차순, 동점은 handle 순 (결정적 지급 순서)
    top.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    top.truncate(TOP_CURATOR_COUNT);

    let total_score: i64 = top.iter().map(|(_, score)| score).sum();
    if total_score <= 0 {
        return vec![];
    }

    let mut payouts = vec![];
    for (handle, score) in top {
        // i128 중간값으로 오버플로우 없이 floor 나눗셈
        let reward = (score as i128 * curator_pool as i128 / total_score as i128) as i64;
        if reward > 0 {
            payouts.push(CuratorPayout {
                rank: (payouts.len() + 1) as u32,
                handle,
                score,
                reward,
            });
        }
    }

    payouts
}

/// 리포트를 영속화할 레코드 목록으로 변환
fn build_records(
    report: &EpochReport,
    window: EpochWindow,
    schedule: &RewardSchedule,
) -> Vec<RewardRecord> {
    let mut records = vec![];

    if let Some(winner) = &report.winner {
        records.push(RewardRecord::product_of_week(
            window.start,
            window.end,
            &winner.product_id,
            schedule.product_reward,
        ));
    }

    for payout in &report.curators {
        records.push(RewardRecord::curator(
            window.start,
            window.end,
            &payout.handle,
            payout.reward,
        ));
    }

    records
}
