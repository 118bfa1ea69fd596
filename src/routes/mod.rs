//! API Routes Module
//!
//! 모든 HTTP 엔드포인트 정의
//!
//! # Routes
//! - `/health` - 헬스 체크
//! - `/admin/epoch/*` - 에폭 실행/프리뷰 (관리자 키 필요)
//! - `/rewards/*` - 발급된 리워드 레코드 조회

pub mod epoch;
pub mod health;
pub mod rewards;
