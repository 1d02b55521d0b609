//! Database Schema
//!
//! SQLite 테이블 스키마 정의

/// 서명 테이블 이름 (스키마 준비 여부 확인용)
pub const SIGNATURE_TABLE: &str = "secretkey_signature";

/// 데이터베이스 스키마 생성 SQL
pub const CREATE_SCHEMA: &str = r#"
-- 서명 테이블 (사이트별 이력 누적, 현재 = 가장 최근 created_at)
CREATE TABLE IF NOT EXISTS secretkey_signature (
    id TEXT PRIMARY KEY,
    site_id INTEGER,  -- NULL이면 전역
    created_at INTEGER NOT NULL,
    signed_value TEXT NOT NULL
);

-- 서명 인덱스
CREATE INDEX IF NOT EXISTS idx_signature_site_created ON secretkey_signature(site_id, created_at);
"#;
