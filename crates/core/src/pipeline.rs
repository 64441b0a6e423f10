//! 파이프라인 trait — 모듈 확장 포인트 정의
//!
//! [`Pipeline`]은 수집 파이프라인의 생명주기 인터페이스이고,
//! [`FileSource`]와 [`StateStore`]는 원격 파일 수집과 상태 영속화를
//! 주입하기 위한 경계입니다.

use std::future::Future;

use crate::error::DeadwatchError;
use crate::types::{FeedKind, FileIngestState, KillRecord, PvpStats, ServerEndpoint, ServerKey};

/// 파이프라인 건강 상태
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// 정상 동작 중
    Healthy,
    /// 동작 중이나 성능 저하 (사유 포함)
    Degraded(String),
    /// 동작 불가 (사유 포함)
    Unhealthy(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}

/// 수집 파이프라인의 생명주기 trait
///
/// 각 파이프라인은 시작/정지와 건강 상태 조회를 구현합니다.
pub trait Pipeline: Send + Sync {
    /// 파이프라인 이름
    fn name(&self) -> &str;

    /// 파이프라인을 시작합니다.
    fn start(&mut self) -> impl Future<Output = Result<(), DeadwatchError>> + Send;

    /// 파이프라인을 정지합니다. Graceful shutdown을 수행합니다.
    fn stop(&mut self) -> impl Future<Output = Result<(), DeadwatchError>> + Send;

    /// 파이프라인의 건강 상태를 확인합니다.
    fn health_check(&self) -> impl Future<Output = HealthStatus> + Send;
}

/// 원격 파일 소스 trait
///
/// 게임 로그와 킬피드 CSV의 현재 전체 내용을 가져옵니다.
/// 파일이 아직 없으면 `Ok(None)`을 반환합니다. 전송 계층(SFTP, 로컬
/// 디렉토리)은 구현체가 결정합니다.
pub trait FileSource: Send + Sync {
    /// 대상 파일의 현재 전체 내용을 읽습니다.
    fn fetch(
        &self,
        endpoint: &ServerEndpoint,
        kind: FeedKind,
    ) -> impl Future<Output = Result<Option<String>, DeadwatchError>> + Send;
}

/// 상태 영속화 trait
///
/// 파일 수집 상태와 PvP 통계를 외부 저장소에 보관합니다.
/// 저장 실패는 경고로 처리되고 메모리 상태가 항상 우선합니다.
pub trait StateStore: Send + Sync {
    /// 파일 수집 상태를 읽습니다. 없으면 `Ok(None)` (새 시작으로 간주).
    fn load_ingest_state(
        &self,
        key: &ServerKey,
        kind: FeedKind,
    ) -> impl Future<Output = Result<Option<FileIngestState>, DeadwatchError>> + Send;

    /// 파일 수집 상태를 저장합니다.
    fn save_ingest_state(
        &self,
        key: &ServerKey,
        kind: FeedKind,
        state: &FileIngestState,
    ) -> impl Future<Output = Result<(), DeadwatchError>> + Send;

    /// 서버의 플레이어별 PvP 통계를 읽습니다.
    fn load_stats(
        &self,
        key: &ServerKey,
    ) -> impl Future<Output = Result<Vec<(String, PvpStats)>, DeadwatchError>> + Send;

    /// 서버의 플레이어별 PvP 통계를 저장합니다.
    fn save_stats(
        &self,
        key: &ServerKey,
        stats: &[(String, PvpStats)],
    ) -> impl Future<Output = Result<(), DeadwatchError>> + Send;

    /// 킬 레코드를 추가합니다.
    fn append_kills(
        &self,
        key: &ServerKey,
        records: &[KillRecord],
    ) -> impl Future<Output = Result<(), DeadwatchError>> + Send;
}
