//! SECRET_KEY 생성
//!
//! - 기본적으로 OS CSPRNG(`OsRng`)를 사용
//! - OS 난수 소스를 쓸 수 없으면 `ReseededRng`로 대체하되, 출력 전에
//!   (기존 내부 상태 + 현재 시각 + 프로세스 고유 식별자)를 SHA-512로 해시해 재시드
//! - 출력 문자: 공백/제어문자를 제외한 출력 가능한 ASCII (`!`..=`~`, 94자)

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::{OsRng, StdRng};
use rand::{Rng, RngCore, SeedableRng};
use sha2::{Digest, Sha512};
use tracing::warn;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Result, SecretKeyError};

/// 기본 키 길이 (문자 수)
pub const DEFAULT_KEY_LENGTH: usize = 64;

const KEY_ALPHABET_START: u8 = b'!';
const KEY_ALPHABET_LEN: u8 = b'~' - b'!' + 1;

/// 재시드 호출마다 증가하는 카운터 (같은 나노초 안의 연속 재시드 구분용)
static RESEED_COUNTER: AtomicU64 = AtomicU64::new(0);

/// 디스크에 저장되는 비밀 키 (불투명한 바이트열). drop 시 zeroize.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial(Vec<u8>);

impl KeyMaterial {
    pub fn new(value: impl Into<Vec<u8>>) -> Self {
        KeyMaterial(value.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// 문자 수 기준 길이. 잘못된 UTF-8 구간은 대체 문자 하나로 셈.
    pub fn len(&self) -> usize {
        String::from_utf8_lossy(&self.0).chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyMaterial(<{} chars redacted>)", self.len())
    }
}

/// CLI 등에서 받은 부호 있는 길이를 검증
pub fn validate_length(length: i64) -> Result<usize> {
    if length <= 0 {
        return Err(SecretKeyError::InvalidLength(length));
    }
    usize::try_from(length).map_err(|_| SecretKeyError::InvalidLength(length))
}

/// 주어진 길이의 랜덤 키 생성
///
/// 난수 품질은 OS 지원에 따라 달라집니다. `OsRng`가 실패하면 경고를 남기고
/// 재시드된 PRNG를 사용합니다.
pub fn generate_secret_key(length: usize) -> Result<KeyMaterial> {
    if length == 0 {
        return Err(SecretKeyError::InvalidLength(0));
    }

    Ok(with_secure_rng(|rng| generate_with(rng, length)))
}

/// `OsRng`를 쓸 수 있으면 그대로, 아니면 재시드된 `ReseededRng`로 `f` 실행
pub(crate) fn with_secure_rng<T>(f: impl FnOnce(&mut dyn RngCore) -> T) -> T {
    with_rng_or_fallback(&mut OsRng, f)
}

/// `source`가 바이트를 내주면 그대로 쓰고, 실패하면 `ReseededRng`로 대체
fn with_rng_or_fallback<S, T>(source: &mut S, f: impl FnOnce(&mut dyn RngCore) -> T) -> T
where
    S: RngCore,
{
    let mut probe = [0u8; 8];
    match source.try_fill_bytes(&mut probe) {
        Ok(()) => f(source),
        Err(e) => {
            warn!(error = %e, "OS random source unavailable, falling back to reseeded PRNG");
            let mut rng = ReseededRng::new();
            f(&mut rng)
        }
    }
}

/// 주어진 RNG로 키 문자열 생성
pub fn generate_with<R: RngCore + ?Sized>(rng: &mut R, length: usize) -> KeyMaterial {
    let key: Vec<u8> = (0..length)
        .map(|_| KEY_ALPHABET_START + rng.gen_range(0..KEY_ALPHABET_LEN))
        .collect();
    KeyMaterial(key)
}

/// OS 난수 소스가 없을 때 쓰는 PRNG
///
/// `StdRng` 자체는 결정적이므로, 생성 전에 반드시 `reseed()`로 외부 엔트로피를
/// 섞어야 합니다. `new()`는 내부에서 한 번 재시드합니다.
pub struct ReseededRng {
    state: [u8; 64],
    rng: StdRng,
}

impl ReseededRng {
    pub fn new() -> Self {
        let mut rng = ReseededRng {
            state: [0u8; 64],
            rng: StdRng::from_seed([0u8; 32]),
        };
        rng.reseed();
        rng
    }

    /// SHA-512(기존 상태 || PRNG 출력 || 현재 시각 || 프로세스 식별자)로 재시드
    pub fn reseed(&mut self) {
        let mut hasher = Sha512::new();
        hasher.update(self.state);

        let mut carried = [0u8; 32];
        self.rng.fill_bytes(&mut carried);
        hasher.update(carried);

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        hasher.update(now.to_le_bytes());
        hasher.update(process_identifier());

        let digest = hasher.finalize();
        self.state.copy_from_slice(&digest);

        let mut seed = [0u8; 32];
        seed.copy_from_slice(&digest[..32]);
        self.rng = StdRng::from_seed(seed);

        carried.zeroize();
        seed.zeroize();
    }
}

impl Default for ReseededRng {
    fn default() -> Self {
        Self::new()
    }
}

impl RngCore for ReseededRng {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}

/// 프로세스/호출마다 달라지는 식별자 (pid, 스택 주소(ASLR), 스레드, 카운터)
fn process_identifier() -> Vec<u8> {
    let marker = 0u8;
    let counter = RESEED_COUNTER.fetch_add(1, Ordering::Relaxed);

    let mut id = Vec::with_capacity(64);
    id.extend_from_slice(&std::process::id().to_le_bytes());
    id.extend_from_slice(&(&marker as *const u8 as usize).to_le_bytes());
    id.extend_from_slice(format!("{:?}", std::thread::current().id()).as_bytes());
    id.extend_from_slice(&counter.to_le_bytes());
    id
}
