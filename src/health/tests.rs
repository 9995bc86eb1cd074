//! Health Module Tests
//!
//! Drives the monitor with a scripted probe and checks the registry's
//! Healthy / Suspect / Dead transitions, pruning and loop lifecycle.

#[cfg(test)]
mod tests {
    use crate::health::monitor::{HealthMonitor, HealthSettings};
    use crate::membership::registry::PeerRegistry;
    use crate::membership::types::PeerStatus;
    use crate::testing::{ScriptedProbe, peer_url};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::sync::Arc;
    use std::time::Duration;

    fn settings(failure_threshold: u32) -> HealthSettings {
        HealthSettings {
            interval: Duration::from_secs(30),
            probe_timeout: Duration::from_millis(200),
            failure_threshold,
            dead_grace: Duration::from_secs(300),
        }
    }

    fn setup(peers: usize, threshold: u32) -> (Arc<PeerRegistry>, Arc<ScriptedProbe>, Arc<HealthMonitor>) {
        let registry = PeerRegistry::new("http://self.test:8000").unwrap();
        for n in 1..=peers {
            registry.register(&peer_url(n)).unwrap();
        }
        let probe = Arc::new(ScriptedProbe::default());
        let monitor = HealthMonitor::new(registry.clone(), probe.clone(), settings(threshold));
        (registry, probe, monitor)
    }

    fn status_of(registry: &PeerRegistry, n: usize) -> PeerStatus {
        registry.get(&peer_url(n)).unwrap().status
    }

    // ============================================================
    // STATE MACHINE TESTS
    // ============================================================

    #[tokio::test]
    async fn test_dead_after_exactly_threshold_failures() {
        let (registry, probe, monitor) = setup(1, 3);
        probe.set_down(&peer_url(1), true);

        let report = monitor.run_cycle().await;
        assert_eq!(report.failed, 1);
        assert_eq!(status_of(&registry, 1), PeerStatus::Suspect);

        monitor.run_cycle().await;
        assert_eq!(status_of(&registry, 1), PeerStatus::Suspect);

        let report = monitor.run_cycle().await;
        assert_eq!(status_of(&registry, 1), PeerStatus::Dead);
        assert_eq!(report.newly_dead, vec![peer_url(1)]);

        // Staying dead is not reported again.
        let report = monitor.run_cycle().await;
        assert!(report.newly_dead.is_empty());
    }

    #[tokio::test]
    async fn test_single_success_makes_healthy() {
        let (registry, probe, monitor) = setup(1, 3);
        probe.set_down(&peer_url(1), true);
        for _ in 0..3 {
            monitor.run_cycle().await;
        }
        assert_eq!(status_of(&registry, 1), PeerStatus::Dead);

        probe.set_down(&peer_url(1), false);
        let report = monitor.run_cycle().await;

        assert_eq!(status_of(&registry, 1), PeerStatus::Healthy);
        assert_eq!(registry.get(&peer_url(1)).unwrap().consecutive_failures, 0);
        assert_eq!(report.recovered, vec![peer_url(1)]);
    }

    #[tokio::test]
    async fn test_success_resets_failure_streak() {
        let (registry, probe, monitor) = setup(1, 3);
        let url = peer_url(1);

        probe.set_down(&url, true);
        monitor.run_cycle().await;
        monitor.run_cycle().await;
        probe.set_down(&url, false);
        monitor.run_cycle().await;
        probe.set_down(&url, true);
        monitor.run_cycle().await;
        monitor.run_cycle().await;

        assert_eq!(status_of(&registry, 1), PeerStatus::Suspect);
        assert_eq!(registry.get(&url).unwrap().consecutive_failures, 2);
    }

    #[tokio::test]
    async fn test_random_outcomes_follow_model() {
        let threshold = 3;
        let (registry, probe, monitor) = setup(1, threshold);
        let url = peer_url(1);
        let mut rng = StdRng::seed_from_u64(7);

        assert_eq!(status_of(&registry, 1), PeerStatus::Suspect);
        let mut expected_failures = 0u32;

        for _ in 0..200 {
            let alive = rng.gen_bool(0.4);
            probe.set_down(&url, !alive);
            monitor.run_cycle().await;

            let expected_status = if alive {
                expected_failures = 0;
                PeerStatus::Healthy
            } else {
                expected_failures += 1;
                if expected_failures >= threshold {
                    PeerStatus::Dead
                } else {
                    PeerStatus::Suspect
                }
            };

            let record = registry.get(&url).unwrap();
            assert_eq!(record.status, expected_status);
            assert_eq!(record.consecutive_failures, expected_failures);
        }
    }

    // ============================================================
    // PRUNING TESTS
    // ============================================================

    #[tokio::test(start_paused = true)]
    async fn test_dead_peer_pruned_after_grace() {
        let (registry, probe, monitor) = setup(2, 1);
        probe.set_down(&peer_url(1), true);

        let report = monitor.run_cycle().await;
        assert_eq!(report.newly_dead, vec![peer_url(1)]);
        assert!(report.pruned.is_empty());

        tokio::time::advance(Duration::from_secs(301)).await;
        let report = monitor.run_cycle().await;

        assert_eq!(report.pruned, vec![peer_url(1)]);
        assert!(registry.get(&peer_url(1)).is_none());
        assert_eq!(status_of(&registry, 2), PeerStatus::Healthy);
    }

    // ============================================================
    // TIMEOUT TESTS
    // ============================================================

    #[tokio::test(start_paused = true)]
    async fn test_hanging_probe_does_not_block_cycle() {
        let (registry, probe, monitor) = setup(3, 3);
        probe.set_hanging(&peer_url(2));

        let started = tokio::time::Instant::now();
        let report = monitor.run_cycle().await;

        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(report.probed, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(status_of(&registry, 1), PeerStatus::Healthy);
        assert_eq!(status_of(&registry, 2), PeerStatus::Suspect);
        assert_eq!(status_of(&registry, 3), PeerStatus::Healthy);
    }

    // ============================================================
    // INLINE PROBE TESTS
    // ============================================================

    #[tokio::test]
    async fn test_probe_now_applies_success_only() {
        let (registry, probe, monitor) = setup(2, 3);
        probe.set_down(&peer_url(2), true);

        assert!(monitor.probe_now(&peer_url(1)).await);
        assert!(!monitor.probe_now(&peer_url(2)).await);

        assert_eq!(status_of(&registry, 1), PeerStatus::Healthy);
        let failed = registry.get(&peer_url(2)).unwrap();
        assert_eq!(failed.status, PeerStatus::Suspect);
        assert_eq!(failed.consecutive_failures, 0);
    }

    // ============================================================
    // LIFECYCLE TESTS
    // ============================================================

    #[tokio::test(start_paused = true)]
    async fn test_start_and_stop() {
        let (registry, probe, monitor) = setup(1, 3);

        assert!(monitor.start());
        assert!(!monitor.start(), "second start is a no-op");
        assert!(monitor.is_running());

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(probe.calls(&peer_url(1)) >= 2);
        assert_eq!(status_of(&registry, 1), PeerStatus::Healthy);

        monitor.stop().await;
        assert!(!monitor.is_running());

        let calls = probe.calls(&peer_url(1));
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(probe.calls(&peer_url(1)), calls, "no probes after stop");

        assert!(monitor.start(), "can be restarted");
        monitor.stop().await;
    }

    #[tokio::test]
    async fn test_settings_from_config() {
        let config = crate::config::HealthConfig::default();
        let settings = HealthSettings::from(&config);

        assert_eq!(settings.interval, Duration::from_secs(30));
        assert_eq!(settings.probe_timeout, Duration::from_millis(2000));
        assert_eq!(settings.failure_threshold, 3);
        assert_eq!(settings.dead_grace, Duration::from_secs(300));
    }
}
