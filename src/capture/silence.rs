use std::time::Duration;
use tokio::time::Instant;

use crate::notify::Severity;

/// Thresholds for the advisory silence monitor.
#[derive(Debug, Clone)]
pub struct SilencePolicy {
    /// How often the monitor checks for inactivity
    pub poll_interval: Duration,
    /// Inactivity before an informational notice
    pub notify_after: Duration,
    /// Inactivity before a "consider pausing" warning
    pub suggest_pause_after: Duration,
}

impl Default for SilencePolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            notify_after: Duration::from_secs(120),
            suggest_pause_after: Duration::from_secs(300),
        }
    }
}

/// Rate-limit state for the two notice tiers.
///
/// Each tier keeps its own `last_notified_at`, so a warning is never
/// suppressed just because an info notice fired recently. The monitor is
/// advisory only: it emits notices and never touches capture state.
#[derive(Debug, Default)]
pub struct SilenceState {
    last_info_at: Option<Instant>,
    last_warn_at: Option<Instant>,
}

impl SilenceState {
    /// Evaluate one poll. `last_activity` is the instant of the most recent
    /// engine activity. Returns the notices due at this poll, if any.
    pub fn check(
        &mut self,
        policy: &SilencePolicy,
        now: Instant,
        last_activity: Instant,
    ) -> Vec<(Severity, String)> {
        let elapsed = now.saturating_duration_since(last_activity);
        let mut notices = Vec::new();

        if elapsed >= policy.notify_after && self.tier_due(self.last_info_at, policy.notify_after, now) {
            self.last_info_at = Some(now);
            notices.push((
                Severity::Info,
                format!(
                    "No speech detected for {}. Capture is still running.",
                    humanize(elapsed)
                ),
            ));
        }

        if elapsed >= policy.suggest_pause_after
            && self.tier_due(self.last_warn_at, policy.suggest_pause_after, now)
        {
            self.last_warn_at = Some(now);
            notices.push((
                Severity::Warning,
                format!(
                    "No speech detected for {}. Consider pausing capture if the session is on a break.",
                    humanize(elapsed)
                ),
            ));
        }

        notices
    }

    fn tier_due(&self, last_notified: Option<Instant>, threshold: Duration, now: Instant) -> bool {
        match last_notified {
            None => true,
            Some(at) => now.saturating_duration_since(at) >= threshold,
        }
    }
}

fn humanize(d: Duration) -> String {
    let secs = d.as_secs();
    if secs >= 60 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else {
        format!("{}s", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> SilencePolicy {
        SilencePolicy {
            poll_interval: Duration::from_secs(30),
            notify_after: Duration::from_secs(120),
            suggest_pause_after: Duration::from_secs(300),
        }
    }

    #[test]
    fn quiet_period_below_threshold_emits_nothing() {
        let mut state = SilenceState::default();
        let start = Instant::now();
        let notices = state.check(&policy(), start + Duration::from_secs(90), start);
        assert!(notices.is_empty());
    }

    #[test]
    fn info_tier_fires_once_per_window() {
        let mut state = SilenceState::default();
        let p = policy();
        let start = Instant::now();

        let first = state.check(&p, start + Duration::from_secs(120), start);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].0, Severity::Info);

        // 30s later: still silent, but inside the info rate-limit window.
        let second = state.check(&p, start + Duration::from_secs(150), start);
        assert!(second.is_empty());

        // A full window later it fires again.
        let third = state.check(&p, start + Duration::from_secs(240), start);
        assert_eq!(third.len(), 1);
    }

    #[test]
    fn warning_tier_is_rate_limited_independently() {
        let mut state = SilenceState::default();
        let p = policy();
        let start = Instant::now();

        // Info fires at 2m and again at 4m.
        assert_eq!(state.check(&p, start + Duration::from_secs(120), start).len(), 1);
        assert_eq!(state.check(&p, start + Duration::from_secs(240), start).len(), 1);

        // At 5m the warning tier fires even though info fired 60s ago.
        let at_five = state.check(&p, start + Duration::from_secs(300), start);
        assert!(at_five.iter().any(|(sev, _)| *sev == Severity::Warning));

        // At 7m the warning is still inside its own window; at 10m it fires.
        let at_seven = state.check(&p, start + Duration::from_secs(420), start);
        assert!(at_seven.iter().all(|(sev, _)| *sev != Severity::Warning));
        let at_ten = state.check(&p, start + Duration::from_secs(600), start);
        assert!(at_ten.iter().any(|(sev, _)| *sev == Severity::Warning));
    }

    #[test]
    fn activity_resets_the_clock() {
        let mut state = SilenceState::default();
        let p = policy();
        let start = Instant::now();

        assert_eq!(state.check(&p, start + Duration::from_secs(130), start).len(), 1);

        // Fresh activity: elapsed drops below the threshold again.
        let activity = start + Duration::from_secs(200);
        let notices = state.check(&p, start + Duration::from_secs(260), activity);
        assert!(notices.is_empty());
    }
}
