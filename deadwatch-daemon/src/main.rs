use anyhow::Result;
use clap::Parser;

use deadwatch_core::config::DeadwatchConfig;
use deadwatch_daemon::cli::DaemonCli;
use deadwatch_daemon::logging::init_tracing;
use deadwatch_daemon::metrics_server::install_metrics_recorder;
use deadwatch_daemon::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    // 설정 로드: TOML 파일 -> 환경변수 -> CLI 플래그 순으로 오버라이드
    let mut config = DeadwatchConfig::load(&cli.config).await?;
    if let Some(log_level) = &cli.log_level {
        config.general.log_level = log_level.clone();
    }
    if let Some(log_format) = &cli.log_format {
        config.general.log_format = log_format.clone();
    }
    if let Some(data_dir) = &cli.data_dir {
        config.general.data_dir = data_dir.clone();
    }
    config.validate()?;

    // --validate: 설정 검증만 수행하고 종료
    if cli.validate {
        println!("configuration OK: {}", cli.config.display());
        println!("  servers: {}", config.servers.len());
        println!("  log_pipeline enabled: {}", config.log_pipeline.enabled);
        println!("  killfeed enabled: {}", config.killfeed.enabled);
        return Ok(());
    }

    // 로깅 초기화
    init_tracing(&config.general)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "deadwatch-daemon starting"
    );

    // Prometheus 메트릭 엔드포인트
    install_metrics_recorder(&config.general)?;

    // 오케스트레이터 빌드 후 종료 시그널까지 실행
    let mut orchestrator = Orchestrator::build_from_config(config)?;
    orchestrator.run().await?;

    tracing::info!("deadwatch-daemon shut down");
    Ok(())
}
