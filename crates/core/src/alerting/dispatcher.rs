//! Alert dispatcher - cooldown, rule routing and channel fan-out

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bulwark_common::resilience::{Clock, SystemClock};
use bulwark_domain::{
    Alert, AlertChannelConfig, AlertStatistics, AlertingConfig, BulwarkError, ChannelStatus,
    ChannelType, CriticalAlertPattern, CriticalFailure, DispatchOutcome, HealthReport, Result,
};
use futures::future::join_all;
use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use super::analytics::{assess_health, critical_patterns};
use super::ports::AlertSink;
use super::rules::{default_rules, AlertRule};
use super::tracker::AlertTracker;

/// Channels resolved for one alert.
struct Routing {
    channels: Vec<String>,
    fired_rules: Vec<String>,
}

/// Routes alerts to channels and delivers them through registered sinks.
///
/// Channels, rules and default channels can be changed at runtime. Locks are
/// only held while copying configuration out, never across a delivery.
pub struct AlertDispatcher<C: Clock = SystemClock> {
    enabled: bool,
    cooldown_enabled: bool,
    global_cooldown: Duration,
    channels: RwLock<Vec<AlertChannelConfig>>,
    rules: RwLock<Vec<AlertRule>>,
    default_channels: RwLock<Vec<String>>,
    sinks: HashMap<ChannelType, Arc<dyn AlertSink>>,
    tracker: AlertTracker,
    clock: C,
}

impl AlertDispatcher<SystemClock> {
    /// Dispatcher with the built-in channels and rules for `config`.
    pub fn new(config: &AlertingConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> AlertDispatcher<C> {
    /// Dispatcher reading time from `clock`.
    pub fn with_clock(config: &AlertingConfig, clock: C) -> Self {
        Self {
            enabled: config.enabled,
            cooldown_enabled: config.cooldown_enabled,
            global_cooldown: Duration::from_secs(config.global_cooldown_secs),
            channels: RwLock::new(config.default_channel_configs()),
            rules: RwLock::new(default_rules()),
            default_channels: RwLock::new(config.default_channels.clone()),
            sinks: HashMap::new(),
            tracker: AlertTracker::new(),
            clock,
        }
    }

    /// Register the sink for its channel type, replacing any previous one.
    pub fn with_sink(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.sinks.insert(sink.channel_type(), sink);
        self
    }

    /// Replace the whole rule set.
    pub fn with_rules(self, rules: Vec<AlertRule>) -> Self {
        *self.rules.write() = rules;
        self
    }

    /// Replace the whole channel set.
    pub fn with_channels(self, channels: Vec<AlertChannelConfig>) -> Self {
        *self.channels.write() = channels;
        self
    }

    /// Process one alert.
    ///
    /// Delivery failures are logged and reported in the outcome, never
    /// returned as errors.
    pub async fn process_alert(&self, alert: Alert) -> DispatchOutcome {
        if !self.enabled {
            debug!(
                target: "bulwark::alerting",
                alert_id = %alert.id,
                "alerting disabled, dropping alert"
            );
            return DispatchOutcome::Disabled;
        }

        let key = alert.key();
        let now = self.clock.now();

        if self.cooldown_enabled && self.tracker.in_cooldown(&key, now, self.global_cooldown) {
            self.tracker.record_suppressed();
            debug!(target: "bulwark::alerting", alert_key = %key, "alert suppressed by cooldown");
            return DispatchOutcome::Suppressed;
        }

        let routing = self.resolve_channels(&alert, &key);
        let targets = self.select_channels(&alert, &routing.channels);
        let attempted: Vec<String> = targets.iter().map(|c| c.name.clone()).collect();

        let failed = self.send_to_channels(&alert, &targets).await;

        // Cooldown windows start once every channel has finished.
        let dispatched_at = self.clock.now();
        self.tracker.record_dispatch(
            &alert,
            &key,
            &routing.fired_rules,
            dispatched_at,
            self.clock.utc_now(),
        );

        info!(
            target: "bulwark::alerting",
            alert_id = %alert.id,
            level = %alert.level,
            alert_key = %key,
            attempted = attempted.len(),
            failed = failed.len(),
            "alert dispatched"
        );

        DispatchOutcome::Dispatched { attempted, failed }
    }

    /// Report a component failure as an alert.
    pub async fn process_critical_failure(&self, failure: CriticalFailure) -> DispatchOutcome {
        error!(
            target: "bulwark::alerting",
            failure_type = %failure.failure_type,
            component = %failure.component,
            severity = %failure.severity,
            "critical failure reported: {}",
            failure.description
        );
        self.process_alert(failure.to_alert()).await
    }

    /// Union of the channels of every matching rule, or the default channels
    /// when no rule matches.
    fn resolve_channels(&self, alert: &Alert, key: &str) -> Routing {
        let now = self.clock.now();
        let rules = self.rules.read();
        let mut channels: Vec<String> = Vec::new();
        let mut fired_rules = Vec::new();
        let mut matched = 0usize;

        for rule in rules.iter().filter(|rule| rule.matches(alert)) {
            matched += 1;
            if let Some(cooldown) = rule.cooldown {
                if self.tracker.rule_in_cooldown(&rule.id, key, now, cooldown) {
                    debug!(
                        target: "bulwark::alerting",
                        rule = %rule.id,
                        alert_key = %key,
                        "rule in cooldown"
                    );
                    continue;
                }
            }
            fired_rules.push(rule.id.clone());
            for channel in &rule.channels {
                if !channels.contains(channel) {
                    channels.push(channel.clone());
                }
            }
        }

        if matched == 0 {
            channels = self.default_channels.read().clone();
        }

        Routing { channels, fired_rules }
    }

    /// Enabled channels among `names` that accept the alert's level.
    fn select_channels(&self, alert: &Alert, names: &[String]) -> Vec<AlertChannelConfig> {
        let channels = self.channels.read();
        names
            .iter()
            .filter_map(|name| {
                let channel = channels.iter().find(|c| &c.name == name);
                if channel.is_none() {
                    warn!(
                        target: "bulwark::alerting",
                        channel = %name,
                        "alert routed to unknown channel"
                    );
                }
                channel
            })
            .filter(|channel| channel.accepts(alert.level))
            .cloned()
            .collect()
    }

    /// Deliver to every target concurrently. Returns the names that failed.
    async fn send_to_channels(
        &self,
        alert: &Alert,
        targets: &[AlertChannelConfig],
    ) -> Vec<String> {
        let deliveries = targets.iter().map(|channel| async move {
            let result = self.deliver(alert, channel).await;
            (channel, result)
        });

        join_all(deliveries)
            .await
            .into_iter()
            .filter_map(|(channel, result)| match result {
                Ok(()) => None,
                Err(err) => {
                    error!(
                        target: "bulwark::alerting",
                        channel = %channel.name,
                        channel_type = %channel.channel_type,
                        alert_id = %alert.id,
                        error = %err,
                        "alert delivery failed"
                    );
                    Some(channel.name.clone())
                }
            })
            .collect()
    }

    async fn deliver(&self, alert: &Alert, channel: &AlertChannelConfig) -> Result<()> {
        match self.sinks.get(&channel.channel_type) {
            Some(sink) => sink.deliver(alert, channel).await,
            None => Err(BulwarkError::NotFound(format!(
                "no sink registered for {} channels",
                channel.channel_type
            ))),
        }
    }

    // ------------------------------------------------------------------
    // Analytics
    // ------------------------------------------------------------------

    /// Alert keys recurring often enough to be flagged, most frequent first.
    pub fn get_critical_alerts(&self) -> Vec<CriticalAlertPattern> {
        let now = self.clock.now();
        critical_patterns(&self.tracker.snapshot(now).entries, now)
    }

    /// Health verdict for the current channel set and alert volume.
    pub fn get_alerting_health_status(&self) -> HealthReport {
        let now = self.clock.now();
        let snapshot = self.tracker.snapshot(now);
        let patterns = critical_patterns(&snapshot.entries, now);
        assess_health(&self.channels.read(), &patterns, snapshot.last_hour)
    }

    /// Counters, channel status, health and critical patterns in one view.
    pub fn get_statistics(&self) -> AlertStatistics {
        let now = self.clock.now();
        let snapshot = self.tracker.snapshot(now);
        let patterns = critical_patterns(&snapshot.entries, now);
        let channels = self.channels.read().clone();
        let health = assess_health(&channels, &patterns, snapshot.last_hour);

        AlertStatistics {
            total_processed: snapshot.total_processed,
            suppressed: snapshot.suppressed,
            by_level: snapshot.by_level,
            by_service: snapshot.by_service,
            last_hour: snapshot.last_hour,
            tracked_keys: snapshot.entries.len(),
            channels: channels
                .into_iter()
                .map(|c| ChannelStatus {
                    name: c.name,
                    channel_type: c.channel_type,
                    enabled: c.enabled,
                    levels: c.levels.into_iter().collect(),
                })
                .collect(),
            health,
            critical_patterns: patterns,
        }
    }

    /// Forget alert keys not seen for longer than `older_than`.
    pub fn prune_tracking(&self, older_than: Duration) -> usize {
        let removed = self.tracker.prune(older_than, self.clock.now());
        if removed > 0 {
            info!(target: "bulwark::alerting", removed, "pruned stale alert tracking entries");
        }
        removed
    }

    // ------------------------------------------------------------------
    // Runtime configuration
    // ------------------------------------------------------------------

    /// Add a channel, replacing an existing one with the same name.
    pub fn add_channel(&self, channel: AlertChannelConfig) {
        let mut channels = self.channels.write();
        info!(target: "bulwark::alerting", channel = %channel.name, "alert channel added");
        match channels.iter_mut().find(|c| c.name == channel.name) {
            Some(existing) => *existing = channel,
            None => channels.push(channel),
        }
    }

    /// Remove a channel by name. Returns `false` if it was not configured.
    pub fn remove_channel(&self, name: &str) -> bool {
        let mut channels = self.channels.write();
        let before = channels.len();
        channels.retain(|c| c.name != name);
        before != channels.len()
    }

    /// Enable or disable a configured channel.
    pub fn set_channel_enabled(&self, name: &str, enabled: bool) -> Result<()> {
        let mut channels = self.channels.write();
        let channel = channels
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| BulwarkError::NotFound(format!("alert channel '{name}'")))?;
        channel.enabled = enabled;
        Ok(())
    }

    /// Current channel configurations.
    pub fn channels(&self) -> Vec<AlertChannelConfig> {
        self.channels.read().clone()
    }

    /// Add a rule, replacing an existing one with the same id.
    pub fn add_rule(&self, rule: AlertRule) {
        let mut rules = self.rules.write();
        info!(target: "bulwark::alerting", rule = %rule.id, "alert rule added");
        match rules.iter_mut().find(|r| r.id == rule.id) {
            Some(existing) => *existing = rule,
            None => rules.push(rule),
        }
    }

    /// Remove a rule by id. Returns `false` if it was not registered.
    pub fn remove_rule(&self, id: &str) -> bool {
        let mut rules = self.rules.write();
        let before = rules.len();
        rules.retain(|r| r.id != id);
        before != rules.len()
    }

    /// Current rules.
    pub fn rules(&self) -> Vec<AlertRule> {
        self.rules.read().clone()
    }

    /// Replace the channels used when no rule matches.
    pub fn set_default_channels<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.default_channels.write() = names.into_iter().map(Into::into).collect();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use bulwark_common::resilience::MockClock;
    use bulwark_domain::{AlertLevel, FailureSeverity, HealthStatus};
    use parking_lot::Mutex;

    use super::*;
    use crate::alerting::rules::LevelAtLeast;

    /// Console sink whose deliveries all wait on one barrier.
    struct BarrierSink {
        barrier: tokio::sync::Barrier,
    }

    #[async_trait]
    impl AlertSink for BarrierSink {
        fn channel_type(&self) -> ChannelType {
            ChannelType::Console
        }

        async fn deliver(&self, _alert: &Alert, _channel: &AlertChannelConfig) -> Result<()> {
            self.barrier.wait().await;
            Ok(())
        }
    }

    /// Console sink that takes `delay` of clock time per delivery.
    struct SlowSink {
        clock: MockClock,
        delay: Duration,
    }

    #[async_trait]
    impl AlertSink for SlowSink {
        fn channel_type(&self) -> ChannelType {
            ChannelType::Console
        }

        async fn deliver(&self, _alert: &Alert, _channel: &AlertChannelConfig) -> Result<()> {
            self.clock.advance(self.delay);
            Ok(())
        }
    }

    /// Records every delivery; fails for channels listed in `failing`.
    #[derive(Default)]
    struct RecordingSink {
        delivered: Mutex<Vec<(String, String)>>,
        failing: Vec<String>,
    }

    #[async_trait]
    impl AlertSink for RecordingSink {
        fn channel_type(&self) -> ChannelType {
            ChannelType::Console
        }

        async fn deliver(&self, alert: &Alert, channel: &AlertChannelConfig) -> Result<()> {
            if self.failing.contains(&channel.name) {
                return Err(BulwarkError::Delivery(format!("{} is down", channel.name)));
            }
            self.delivered.lock().push((channel.name.clone(), alert.message.clone()));
            Ok(())
        }
    }

    impl RecordingSink {
        fn channels_for(&self, message: &str) -> Vec<String> {
            let mut names: Vec<String> = self
                .delivered
                .lock()
                .iter()
                .filter(|(_, m)| m == message)
                .map(|(c, _)| c.clone())
                .collect();
            names.sort();
            names
        }
    }

    fn console_channels(names: &[&str]) -> Vec<AlertChannelConfig> {
        names.iter().map(|n| AlertChannelConfig::console(*n)).collect()
    }

    fn dispatcher(sink: Arc<RecordingSink>, clock: MockClock) -> AlertDispatcher<MockClock> {
        let config = AlertingConfig {
            default_channels: vec!["A".into()],
            ..AlertingConfig::default()
        };
        AlertDispatcher::with_clock(&config, clock)
            .with_channels(console_channels(&["A", "B", "C"]))
            .with_rules(Vec::new())
            .with_sink(sink)
    }

    #[tokio::test]
    async fn test_cooldown_suppresses_duplicates_until_window_passes() {
        let sink = Arc::new(RecordingSink::default());
        let clock = MockClock::new();
        let dispatcher = dispatcher(Arc::clone(&sink), clock.clone());

        let alert = || Alert::error("db down").with_service("api");
        assert!(!dispatcher.process_alert(alert()).await.is_suppressed());
        clock.advance(Duration::from_secs(299));
        assert!(dispatcher.process_alert(alert()).await.is_suppressed());
        assert_eq!(sink.channels_for("db down").len(), 1);

        clock.advance(Duration::from_secs(1));
        assert!(!dispatcher.process_alert(alert()).await.is_suppressed());
        assert_eq!(sink.channels_for("db down").len(), 2);

        let stats = dispatcher.get_statistics();
        assert_eq!(stats.total_processed, 2);
        assert_eq!(stats.suppressed, 1);
    }

    #[tokio::test]
    async fn test_cooldown_disabled_delivers_every_alert() {
        let sink = Arc::new(RecordingSink::default());
        let config = AlertingConfig { cooldown_enabled: false, ..AlertingConfig::default() };
        let dispatcher = AlertDispatcher::with_clock(&config, MockClock::new())
            .with_channels(console_channels(&["console"]))
            .with_rules(Vec::new())
            .with_sink(sink.clone() as Arc<dyn AlertSink>);
        dispatcher.set_default_channels(["console"]);

        for _ in 0..3 {
            dispatcher.process_alert(Alert::info("tick")).await;
        }
        assert_eq!(sink.channels_for("tick").len(), 3);
    }

    #[tokio::test]
    async fn test_matching_rules_union_channels() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = dispatcher(Arc::clone(&sink), MockClock::new());
        let warning_up = LevelAtLeast(AlertLevel::Warning);
        dispatcher.add_rule(AlertRule::new("r1", "first", warning_up, ["A", "B"]));
        let has_service = |a: &Alert| a.service.is_some();
        dispatcher.add_rule(AlertRule::new("r2", "second", has_service, ["B", "C"]));

        let outcome = dispatcher.process_alert(Alert::error("boom").with_service("svc")).await;

        assert_eq!(outcome.attempted(), ["A", "B", "C"]);
        assert_eq!(sink.channels_for("boom"), ["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_no_matching_rule_uses_default_channels() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = dispatcher(Arc::clone(&sink), MockClock::new());
        let critical = LevelAtLeast(AlertLevel::Critical);
        dispatcher.add_rule(AlertRule::new("crit", "critical", critical, ["B"]));

        let outcome = dispatcher.process_alert(Alert::info("hello")).await;
        assert_eq!(outcome.attempted(), ["A"]);
    }

    #[tokio::test]
    async fn test_disabled_and_level_filtered_channels_are_skipped() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = dispatcher(Arc::clone(&sink), MockClock::new());
        let channels = ["A", "B", "C", "missing"];
        dispatcher.add_rule(AlertRule::new("all", "all", |_: &Alert| true, channels));
        dispatcher.set_channel_enabled("B", false).unwrap();
        let critical_only = AlertChannelConfig::console("C").with_levels([AlertLevel::Critical]);
        dispatcher.add_channel(critical_only);

        let outcome = dispatcher.process_alert(Alert::warning("w")).await;
        assert_eq!(outcome.attempted(), ["A"]);
        assert!(dispatcher.set_channel_enabled("nope", true).is_err());
    }

    #[tokio::test]
    async fn test_failing_channel_does_not_block_siblings() {
        let sink = Arc::new(RecordingSink { failing: vec!["B".into()], ..Default::default() });
        let dispatcher = dispatcher(Arc::clone(&sink), MockClock::new());
        dispatcher.add_rule(AlertRule::new("all", "all", |_: &Alert| true, ["A", "B", "C"]));

        let outcome = dispatcher.process_alert(Alert::critical("fire")).await;

        assert_eq!(outcome.attempted().len(), 3);
        assert_eq!(outcome.failed(), ["B"]);
        assert_eq!(sink.channels_for("fire"), ["A", "C"]);
    }

    #[tokio::test]
    async fn test_missing_sink_counts_as_failed_delivery() {
        let dispatcher = AlertDispatcher::with_clock(&AlertingConfig::default(), MockClock::new())
            .with_channels(vec![AlertChannelConfig::file("file", "/dev/null")])
            .with_rules(Vec::new());
        dispatcher.set_default_channels(["file"]);

        let outcome = dispatcher.process_alert(Alert::info("x")).await;
        assert_eq!(outcome.failed(), ["file"]);
    }

    #[tokio::test]
    async fn test_rule_cooldown_mutes_rule_but_keeps_it_matched() {
        let sink = Arc::new(RecordingSink::default());
        let config = AlertingConfig {
            cooldown_enabled: false,
            default_channels: vec!["A".into()],
            ..AlertingConfig::default()
        };
        let clock = MockClock::new();
        let dispatcher = AlertDispatcher::with_clock(&config, clock.clone())
            .with_channels(console_channels(&["A", "B", "C"]))
            .with_rules(vec![
                AlertRule::new("slow", "slow", |_: &Alert| true, ["B"])
                    .with_cooldown(Duration::from_secs(60)),
                AlertRule::new("fast", "fast", |_: &Alert| true, ["C"]),
            ])
            .with_sink(sink.clone());

        assert_eq!(dispatcher.process_alert(Alert::error("e")).await.attempted(), ["B", "C"]);
        assert_eq!(dispatcher.process_alert(Alert::error("e")).await.attempted(), ["C"]);

        dispatcher.remove_rule("fast");
        let outcome = dispatcher.process_alert(Alert::error("e")).await;
        assert!(outcome.attempted().is_empty(), "muted rule must not fall back to defaults");

        clock.advance(Duration::from_secs(60));
        assert_eq!(dispatcher.process_alert(Alert::error("e")).await.attempted(), ["B"]);
    }

    #[tokio::test]
    async fn test_disabled_alerting_drops_everything() {
        let config = AlertingConfig { enabled: false, ..AlertingConfig::default() };
        let dispatcher = AlertDispatcher::with_clock(&config, MockClock::new());
        assert_eq!(dispatcher.process_alert(Alert::critical("x")).await, DispatchOutcome::Disabled);
        assert_eq!(dispatcher.get_statistics().total_processed, 0);
    }

    #[tokio::test]
    async fn test_critical_failure_is_routed_by_level() {
        let sink = Arc::new(RecordingSink::default());
        let dispatcher = dispatcher(Arc::clone(&sink), MockClock::new());
        let critical = LevelAtLeast(AlertLevel::Critical);
        dispatcher.add_rule(AlertRule::new("crit", "critical", critical, ["C"]));

        let failure =
            CriticalFailure::new("db", "storage", "primary lost", FailureSeverity::Critical);
        let outcome = dispatcher.process_critical_failure(failure).await;

        assert_eq!(outcome.attempted(), ["C"]);
        let stats = dispatcher.get_statistics();
        assert_eq!(stats.by_service["storage"], 1);
        assert_eq!(stats.by_level[&AlertLevel::Critical], 1);
    }

    #[tokio::test]
    async fn test_repeated_alerts_surface_as_critical_pattern() {
        let sink = Arc::new(RecordingSink::default());
        let config = AlertingConfig { cooldown_enabled: false, ..AlertingConfig::default() };
        let dispatcher = AlertDispatcher::with_clock(&config, MockClock::new())
            .with_channels(console_channels(&["console"]))
            .with_sink(sink);

        for _ in 0..11 {
            dispatcher.process_alert(Alert::error("flapping").with_service("api")).await;
        }

        let patterns = dispatcher.get_critical_alerts();
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].alert_key, "api:flapping");
        assert_eq!(patterns[0].occurrences, 11);
        assert_eq!(dispatcher.get_alerting_health_status().status, HealthStatus::Degraded);
    }

    #[tokio::test]
    async fn test_prune_tracking_resets_cooldown_for_stale_keys() {
        let sink = Arc::new(RecordingSink::default());
        let clock = MockClock::new();
        let dispatcher = dispatcher(Arc::clone(&sink), clock.clone());

        dispatcher.process_alert(Alert::info("old")).await;
        clock.advance(Duration::from_secs(120));
        assert_eq!(dispatcher.prune_tracking(Duration::from_secs(60)), 1);
        assert_eq!(dispatcher.get_statistics().tracked_keys, 0);
        assert!(!dispatcher.process_alert(Alert::info("old")).await.is_suppressed());
    }

    #[tokio::test]
    async fn test_channel_administration() {
        let dispatcher = AlertDispatcher::with_clock(&AlertingConfig::default(), MockClock::new());
        assert_eq!(dispatcher.channels().len(), 5);

        dispatcher.add_channel(AlertChannelConfig::webhook("pager", "https://pager.example.com"));
        assert_eq!(dispatcher.channels().len(), 6);
        assert!(dispatcher.remove_channel("pager"));
        assert!(!dispatcher.remove_channel("pager"));
        assert_eq!(dispatcher.rules().len(), 2);

        let counter = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&counter);
        dispatcher.add_rule(AlertRule::new(
            "critical-alerts",
            "override",
            move |_: &Alert| {
                seen.fetch_add(1, Ordering::SeqCst);
                false
            },
            ["console"],
        ));
        assert_eq!(dispatcher.rules().len(), 2);
        dispatcher.process_alert(Alert::critical("x")).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_channels_are_delivered_concurrently() {
        let sink = Arc::new(BarrierSink { barrier: tokio::sync::Barrier::new(2) });
        let dispatcher = AlertDispatcher::with_clock(&AlertingConfig::default(), MockClock::new())
            .with_channels(console_channels(&["A", "B"]))
            .with_rules(Vec::new())
            .with_sink(sink);
        dispatcher.set_default_channels(["A", "B"]);

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            dispatcher.process_alert(Alert::error("both at once")),
        )
        .await
        .expect("deliveries must be in flight together");

        match outcome {
            DispatchOutcome::Dispatched { attempted, failed } => {
                assert_eq!(attempted, vec!["A".to_string(), "B".to_string()]);
                assert!(failed.is_empty());
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cooldown_starts_after_delivery_completes() {
        let clock = MockClock::new();
        let sink = Arc::new(SlowSink { clock: clock.clone(), delay: Duration::from_secs(20) });
        let dispatcher = AlertDispatcher::with_clock(&AlertingConfig::default(), clock.clone())
            .with_channels(console_channels(&["A"]))
            .with_rules(Vec::new())
            .with_sink(sink);
        dispatcher.set_default_channels(["A"]);

        let alert = || Alert::error("slow webhook").with_service("api");
        assert!(!dispatcher.process_alert(alert()).await.is_suppressed());

        // 310 s after the first alert arrived, 290 s after its delivery finished.
        clock.advance(Duration::from_secs(290));
        assert!(dispatcher.process_alert(alert()).await.is_suppressed());

        clock.advance(Duration::from_secs(10));
        assert!(!dispatcher.process_alert(alert()).await.is_suppressed());
    }
}
