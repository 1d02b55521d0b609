//! Database Module
//!
//! SQLite 데이터베이스 관리 (서명 저장)

mod schema;

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, Transaction};

use crate::error::SecretKeyError;
use crate::models::{Signature, SiteId};

pub use schema::SIGNATURE_TABLE;

/// 데이터베이스 래퍼
pub struct Database {
    conn: Connection,
}

impl Database {
    /// 새 데이터베이스 연결 생성
    pub fn new(path: &Path) -> Result<Self, SecretKeyError> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// 메모리 DB (테스트/임시용)
    pub fn open_in_memory() -> Result<Self, SecretKeyError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// 데이터베이스 스키마 초기화
    pub fn initialize(&self) -> Result<(), SecretKeyError> {
        self.conn.execute_batch(schema::CREATE_SCHEMA)?;
        Ok(())
    }

    /// 테이블 존재 여부. 없으면 에러가 아니라 false.
    pub fn table_exists(&self, name: &str) -> Result<bool, SecretKeyError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// 쓰기 트랜잭션 시작
    pub fn transaction(&self) -> Result<Transaction<'_>, SecretKeyError> {
        Ok(self.conn.unchecked_transaction()?)
    }

    /// 파티션의 최신 서명
    pub fn latest_signature(&self, site: Option<SiteId>) -> Result<Option<Signature>, SecretKeyError> {
        latest_signature(&self.conn, site)
    }

    /// 서명이 하나 이상 있는 사이트 목록 (id 오름차순, 전역 제외)
    pub fn list_signature_sites(&self) -> Result<Vec<SiteId>, SecretKeyError> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT site_id FROM secretkey_signature
             WHERE site_id IS NOT NULL ORDER BY site_id",
        )?;
        let iter = stmt.query_map([], |row| row.get::<_, i64>(0))?;
        let mut sites = Vec::new();
        for id in iter {
            sites.push(SiteId(id?));
        }
        Ok(sites)
    }

    /// 파티션의 서명 이력 (최신순)
    pub fn list_signatures(&self, site: Option<SiteId>) -> Result<Vec<Signature>, SecretKeyError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, site_id, created_at, signed_value FROM secretkey_signature
             WHERE site_id IS ?1 ORDER BY created_at DESC, rowid DESC",
        )?;
        let iter = stmt.query_map([site.map(|s| s.0)], signature_from_row)?;
        let mut out = Vec::new();
        for signature in iter {
            out.push(signature?);
        }
        Ok(out)
    }
}

/// 최신 서명 조회. 같은 밀리초에 만들어진 행은 나중에 삽입된 쪽이 최신.
pub(crate) fn latest_signature(
    conn: &Connection,
    site: Option<SiteId>,
) -> Result<Option<Signature>, SecretKeyError> {
    let mut stmt = conn.prepare(
        "SELECT id, site_id, created_at, signed_value FROM secretkey_signature
         WHERE site_id IS ?1 ORDER BY created_at DESC, rowid DESC LIMIT 1",
    )?;
    let signature = stmt
        .query_row([site.map(|s| s.0)], signature_from_row)
        .optional()?;
    Ok(signature)
}

/// 서명 저장 (트랜잭션 안에서 호출)
pub(crate) fn insert_signature(
    conn: &Connection,
    signature: &Signature,
) -> Result<(), SecretKeyError> {
    conn.execute(
        "INSERT INTO secretkey_signature (id, site_id, created_at, signed_value)
         VALUES (?1, ?2, ?3, ?4)",
        (
            &signature.id,
            signature.site.map(|s| s.0),
            signature.created_at.timestamp_millis(),
            &signature.signed_value,
        ),
    )?;
    Ok(())
}

fn signature_from_row(row: &Row<'_>) -> rusqlite::Result<Signature> {
    let created_at_ms: i64 = row.get(2)?;
    let created_at = DateTime::<Utc>::from_timestamp_millis(created_at_ms)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(2, created_at_ms))?;
    Ok(Signature {
        id: row.get(0)?,
        site: row.get::<_, Option<i64>>(1)?.map(SiteId),
        created_at,
        signed_value: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signature(id: &str, site: Option<SiteId>, created_at_ms: i64) -> Signature {
        Signature {
            id: id.to_string(),
            site,
            created_at: DateTime::<Utc>::from_timestamp_millis(created_at_ms).unwrap(),
            signed_value: format!("nonce-{}:sig", id),
        }
    }

    #[test]
    fn test_table_exists_before_and_after_initialize() {
        let db = Database::open_in_memory().unwrap();
        assert!(!db.table_exists(SIGNATURE_TABLE).unwrap());

        db.initialize().unwrap();
        assert!(db.table_exists(SIGNATURE_TABLE).unwrap());

        // 재실행해도 안전
        db.initialize().unwrap();
    }

    #[test]
    fn test_latest_signature_per_site() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();

        insert_signature(&db.conn, &signature("g1", None, 1_000)).unwrap();
        insert_signature(&db.conn, &signature("g2", None, 2_000)).unwrap();
        insert_signature(&db.conn, &signature("s1", Some(SiteId(1)), 3_000)).unwrap();

        assert_eq!(db.latest_signature(None).unwrap().unwrap().id, "g2");
        assert_eq!(db.latest_signature(Some(SiteId(1))).unwrap().unwrap().id, "s1");
        assert!(db.latest_signature(Some(SiteId(2))).unwrap().is_none());
    }

    #[test]
    fn test_same_timestamp_latest_insert_wins() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();

        insert_signature(&db.conn, &signature("first", None, 5_000)).unwrap();
        insert_signature(&db.conn, &signature("second", None, 5_000)).unwrap();

        assert_eq!(db.latest_signature(None).unwrap().unwrap().id, "second");
        let history: Vec<String> = db
            .list_signatures(None)
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(history, vec!["second", "first"]);
    }

    #[test]
    fn test_list_signature_sites_sorted() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();

        insert_signature(&db.conn, &signature("a", Some(SiteId(7)), 1)).unwrap();
        insert_signature(&db.conn, &signature("b", Some(SiteId(2)), 2)).unwrap();
        insert_signature(&db.conn, &signature("c", Some(SiteId(7)), 3)).unwrap();
        insert_signature(&db.conn, &signature("d", None, 4)).unwrap();

        assert_eq!(
            db.list_signature_sites().unwrap(),
            vec![SiteId(2), SiteId(7)]
        );
    }
}
