//! Signature Store
//!
//! 사이트(파티션)별 "현재 서명" 조회/생성.
//!
//! - 현재 서명 = 해당 파티션의 가장 최근 행
//! - 파티션당 하나라는 규칙은 저장소가 아니라 흐름으로 보장
//!   (없을 때만 생성, `force`일 때만 덮어쓰기). 이전 행은 지우지 않음.
//! - `SECRET_KEY_STORE_SIGNATURE=false`이거나 테이블이 아직 없으면 `is_ready()`가 false

use std::vec;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use tracing::{info, warn};

use crate::config::Settings;
use crate::db::{self, Database, SIGNATURE_TABLE};
use crate::error::{Result, SecretKeyError};
use crate::models::{scope_name, Signature, SiteId};
use crate::secrets::keygen::with_secure_rng;
use crate::secrets::{KeyMaterial, Signer};

/// 서명할 nonce 길이
pub const NONCE_LENGTH: usize = 32;

const NONCE_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// 서명 저장소
pub struct SignatureStore<'a> {
    db: &'a Database,
    enabled: bool,
    default_site: Option<SiteId>,
}

impl<'a> SignatureStore<'a> {
    pub fn new(db: &'a Database, settings: &Settings) -> Self {
        SignatureStore {
            db,
            enabled: settings.store_signature,
            default_site: settings.site_id,
        }
    }

    /// 설정에서 지정한 현재 사이트
    pub fn default_site(&self) -> Option<SiteId> {
        self.default_site
    }

    /// 서명 테이블이 준비되었는지. 테이블이 없는 것은 정상 상태이므로 에러를 내지 않음.
    pub fn is_ready(&self) -> bool {
        if !self.enabled {
            return false;
        }
        match self.db.table_exists(SIGNATURE_TABLE) {
            Ok(exists) => exists,
            Err(e) => {
                warn!(error = %e, "Could not inspect signature schema");
                false
            }
        }
    }

    /// 파티션의 현재 서명 (`None` = 전역)
    pub fn get_current(&self, site: Option<SiteId>) -> Result<Option<Signature>> {
        self.ensure_ready()?;
        self.db.latest_signature(site)
    }

    /// 설정된 현재 사이트의 현재 서명
    pub fn get_current_default(&self) -> Result<Option<Signature>> {
        self.get_current(self.default_site)
    }

    /// 모든 파티션의 현재 서명 (전역 먼저, 이후 사이트 id 순). 호출할 때마다 새로 조회.
    pub fn get_all_current(&self) -> CurrentSignatures<'a> {
        CurrentSignatures {
            db: self.db,
            ready: self.is_ready(),
            pending: None,
        }
    }

    /// 파티션의 서명 이력 (최신순)
    pub fn history(&self, site: Option<SiteId>) -> Result<Vec<Signature>> {
        self.ensure_ready()?;
        self.db.list_signatures(site)
    }

    /// 새 서명 생성
    ///
    /// 현재 서명이 있고 `force`가 false면 `SignatureExists`. 랜덤 nonce를
    /// `active_key`로 서명해 트랜잭션 안에서 저장합니다.
    pub fn create_signature(
        &self,
        site: Option<SiteId>,
        active_key: &KeyMaterial,
        force: bool,
    ) -> Result<Signature> {
        self.ensure_ready()?;

        let tx = self.db.transaction()?;

        if db::latest_signature(&tx, site)?.is_some() && !force {
            return Err(SecretKeyError::SignatureExists(scope_name(site)));
        }

        let signed_value = Signer::new(active_key).sign(&random_nonce());
        let signature = Signature {
            id: uuid::Uuid::new_v4().to_string(),
            site,
            created_at: now_millis(),
            signed_value,
        };

        db::insert_signature(&tx, &signature)?;
        tx.commit()?;

        match site {
            Some(site) => info!(%site, id = %signature.id, "Created new signature for site"),
            None => info!(id = %signature.id, "Created new signature"),
        }
        Ok(signature)
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(SecretKeyError::SchemaNotReady)
        }
    }
}

/// 파티션별 현재 서명을 지연 조회하는 iterator
pub struct CurrentSignatures<'a> {
    db: &'a Database,
    ready: bool,
    pending: Option<vec::IntoIter<Option<SiteId>>>,
}

impl Iterator for CurrentSignatures<'_> {
    type Item = Result<Signature>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.ready {
            return None;
        }

        if self.pending.is_none() {
            let mut partitions = vec![None];
            match self.db.list_signature_sites() {
                Ok(sites) => partitions.extend(sites.into_iter().map(Some)),
                Err(e) => {
                    self.ready = false;
                    return Some(Err(e));
                }
            }
            self.pending = Some(partitions.into_iter());
        }

        loop {
            let site = self.pending.as_mut()?.next()?;
            match self.db.latest_signature(site) {
                Ok(Some(signature)) => return Some(Ok(signature)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// 대소문자 알파벳 32자 (중복 없음)
fn random_nonce() -> String {
    with_secure_rng(|rng| {
        NONCE_CHARS
            .choose_multiple(rng, NONCE_LENGTH)
            .map(|&c| c as char)
            .collect()
    })
}

/// DB 저장 정밀도(밀리초)에 맞춘 현재 시각
fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::<Utc>::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}
