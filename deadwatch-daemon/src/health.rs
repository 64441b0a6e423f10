//! Daemon-level health aggregation.
//!
//! Each running pipeline reports a [`HealthStatus`]; the daemon folds
//! them into a single status using worst-of semantics. One unhealthy
//! pipeline makes the daemon unhealthy, one degraded pipeline makes it
//! degraded.

use deadwatch_core::pipeline::HealthStatus;

/// Health snapshot for a single pipeline.
#[derive(Debug, Clone)]
pub struct ModuleHealth {
    /// Pipeline name as reported by [`Pipeline::name`](deadwatch_core::pipeline::Pipeline::name).
    pub name: String,
    /// Latest reported status.
    pub status: HealthStatus,
}

/// Aggregated health for the whole daemon.
#[derive(Debug, Clone)]
pub struct DaemonHealth {
    /// Worst status across all pipelines.
    pub status: HealthStatus,
    /// Per-pipeline breakdown.
    pub modules: Vec<ModuleHealth>,
    /// Seconds since the daemon started.
    pub uptime_secs: u64,
}

/// Fold per-pipeline statuses into a single daemon status.
pub fn aggregate_status(modules: &[ModuleHealth]) -> HealthStatus {
    let mut degraded: Option<String> = None;
    for module in modules {
        match &module.status {
            HealthStatus::Healthy => {}
            HealthStatus::Degraded(reason) => {
                if degraded.is_none() {
                    degraded = Some(format!("{}: {reason}", module.name));
                }
            }
            HealthStatus::Unhealthy(reason) => {
                return HealthStatus::Unhealthy(format!("{}: {reason}", module.name));
            }
        }
    }
    match degraded {
        Some(reason) => HealthStatus::Degraded(reason),
        None => HealthStatus::Healthy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(name: &str, status: HealthStatus) -> ModuleHealth {
        ModuleHealth {
            name: name.to_owned(),
            status,
        }
    }

    #[test]
    fn all_healthy_is_healthy() {
        let modules = vec![
            module("log-pipeline", HealthStatus::Healthy),
            module("killfeed", HealthStatus::Healthy),
        ];
        assert!(aggregate_status(&modules).is_healthy());
    }

    #[test]
    fn no_modules_is_healthy() {
        assert!(aggregate_status(&[]).is_healthy());
    }

    #[test]
    fn one_degraded_degrades_the_daemon() {
        let modules = vec![
            module("log-pipeline", HealthStatus::Healthy),
            module(
                "killfeed",
                HealthStatus::Degraded("1 worker failing".to_owned()),
            ),
        ];
        match aggregate_status(&modules) {
            HealthStatus::Degraded(reason) => {
                assert!(reason.contains("killfeed"));
                assert!(reason.contains("1 worker failing"));
            }
            other => panic!("expected degraded, got {other:?}"),
        }
    }

    #[test]
    fn unhealthy_wins_over_degraded() {
        let modules = vec![
            module(
                "log-pipeline",
                HealthStatus::Degraded("slow ingest".to_owned()),
            ),
            module("killfeed", HealthStatus::Unhealthy("stopped".to_owned())),
        ];
        match aggregate_status(&modules) {
            HealthStatus::Unhealthy(reason) => assert!(reason.contains("killfeed")),
            other => panic!("expected unhealthy, got {other:?}"),
        }
    }
}
