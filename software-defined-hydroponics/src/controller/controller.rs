use chrono::{DateTime, Utc};
use log::*;

use crate::state::actuators::PumpActuator;
use crate::state::logs::LogEntry;
use crate::state::policy::nutrient::NutrientPolicyConfigs;
use crate::state::pump::{AutoDecision, PumpAction, PumpCommand, PumpMode};
use crate::state::traits::EventLog;

/// Which threshold caused an automatic command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerRule {
    Low,
    High,
}

impl TriggerRule {
    /// Name stored with the log entry
    pub fn label(self) -> &'static str {
        match self {
            TriggerRule::Low => "LOW",
            TriggerRule::High => "HIGH",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub action: PumpAction,
    /// Latch value after this reading
    pub next: AutoDecision,
    pub rule: Option<TriggerRule>,
}

/// Two-threshold hysteresis on the nutrient concentration.
///
/// Below `low_ppm` the pump goes on, above `high_ppm` it goes off, and in between nothing
/// happens. The latch stops the same command from being repeated on every reading.
/// A missing or `NaN` value is not enough data to decide anything.
pub fn decide(ppm: Option<f64>, last: AutoDecision, policy: &NutrientPolicyConfigs) -> Decision {
    let hold = Decision {
        action: PumpAction::Hold,
        next: last,
        rule: None,
    };

    let ppm = match ppm {
        Some(ppm) if !ppm.is_nan() => ppm,
        _ => return hold,
    };

    if ppm < policy.low_ppm as f64 && last != AutoDecision::On {
        Decision {
            action: PumpAction::On,
            next: AutoDecision::On,
            rule: Some(TriggerRule::Low),
        }
    } else if ppm > policy.high_ppm as f64 && last != AutoDecision::Off {
        Decision {
            action: PumpAction::Off,
            next: AutoDecision::Off,
            rule: Some(TriggerRule::High),
        }
    } else {
        hold
    }
}

fn ppm_value(ppm: f64) -> serde_json::Value {
    if ppm.fract() == 0.0 && ppm.abs() < 1e15 {
        serde_json::Value::from(ppm as i64)
    } else {
        serde_json::Value::from(ppm)
    }
}

pub struct PumpHysteresisController<P: PumpActuator, L: EventLog> {
    policy: NutrientPolicyConfigs,
    pump: P,
    event_log: L,

    // Internal memory
    last_decision: AutoDecision,
}

impl<P: PumpActuator, L: EventLog> PumpHysteresisController<P, L> {
    pub fn new(policy: NutrientPolicyConfigs, pump: P, event_log: L) -> Self {
        Self {
            policy,
            pump,
            event_log,
            last_decision: AutoDecision::Unset,
        }
    }

    /// Feeds one nutrient value through the hysteresis rule.
    ///
    /// The latch moves before the command is written. If the write fails the latch stays
    /// where it is, and the pump only hears from us again once the opposite threshold is
    /// crossed.
    pub fn update(&mut self, ppm: Option<f64>, now: DateTime<Utc>) -> Decision {
        let decision = decide(ppm, self.last_decision, &self.policy);
        self.last_decision = decision.next;

        let (Some(on), Some(rule), Some(ppm)) = (decision.action.target(), decision.rule, ppm)
        else {
            return decision;
        };

        let (comparison, threshold) = match rule {
            TriggerRule::Low => ("<", self.policy.low_ppm),
            TriggerRule::High => (">", self.policy.high_ppm),
        };
        let state = if on { "ON" } else { "OFF" };

        info!("Auto pump {}: ppm {} {} {}", state, ppm, comparison, threshold);

        let command = PumpCommand::new(
            on,
            PumpMode::Auto,
            now,
            format!("AUTO: ppm {} {} {}", ppm, comparison, threshold),
        );
        if let Err(e) = self.pump.execute(command) {
            error!("Failed to write pump state: {}", e);
        }

        let entry = LogEntry::new(
            format!("Pump {} (AUTO). ppm={} {} {}", state, ppm, comparison, threshold),
            now,
        )
        .with("ppm", ppm_value(ppm))
        .with("rule", rule.label());
        if let Err(e) = self.event_log.record(entry) {
            error!("Failed to record log entry: {}", e);
        }

        decision
    }

    /// Flips the pump relative to `current` on behalf of a person.
    ///
    /// The automatic latch is left alone, so the next reading can undo a manual toggle
    /// when the two disagree.
    pub fn manual_toggle(&mut self, current: Option<&PumpCommand>, now: DateTime<Utc>) -> PumpCommand {
        let on = !current.map(|c| c.on).unwrap_or(false);
        let state = if on { "ON" } else { "OFF" };

        info!("Manual pump toggle -> {}", state);

        let command = PumpCommand::new(
            on,
            PumpMode::Manual,
            now,
            format!("MANUAL toggle -> {}", state),
        );
        if let Err(e) = self.pump.execute(command.clone()) {
            error!("Failed to write pump state: {}", e);
        }
        if let Err(e) = self
            .event_log
            .record(LogEntry::new(format!("Pump {} (MANUAL)", state), now))
        {
            error!("Failed to record log entry: {}", e);
        }

        command
    }

    pub fn last_decision(&self) -> AutoDecision {
        self.last_decision
    }

    pub fn policy(&self) -> &NutrientPolicyConfigs {
        &self.policy
    }

    pub fn event_log(&self) -> &L {
        &self.event_log
    }

    pub fn pump(&self) -> &P {
        &self.pump
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::feed::FeedError;
    use proptest::prelude::*;
    use serde_json::json;

    #[derive(Default)]
    struct RecordingPump {
        commands: Vec<PumpCommand>,
        fail: bool,
    }

    impl PumpActuator for RecordingPump {
        fn execute(&mut self, command: PumpCommand) -> Result<(), FeedError> {
            if self.fail {
                return Err(FeedError::Disconnected);
            }
            self.commands.push(command);
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingLog {
        entries: Vec<LogEntry>,
    }

    impl EventLog for RecordingLog {
        fn record(&mut self, entry: LogEntry) -> Result<(), FeedError> {
            self.entries.push(entry);
            Ok(())
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_700_000_000_000).unwrap()
    }

    fn controller() -> PumpHysteresisController<RecordingPump, RecordingLog> {
        PumpHysteresisController::new(
            NutrientPolicyConfigs::default(),
            RecordingPump::default(),
            RecordingLog::default(),
        )
    }

    fn latch() -> impl Strategy<Value = AutoDecision> {
        prop_oneof![
            Just(AutoDecision::Unset),
            Just(AutoDecision::On),
            Just(AutoDecision::Off),
        ]
    }

    proptest! {
        #[test]
        fn low_ppm_switches_on_once(ppm in 0u32..750, last in latch()) {
            prop_assume!(last != AutoDecision::On);
            let policy = NutrientPolicyConfigs::default();

            let first = decide(Some(ppm as f64), last, &policy);
            prop_assert_eq!(first.action, PumpAction::On);
            prop_assert_eq!(first.next, AutoDecision::On);

            let repeat = decide(Some(ppm as f64), first.next, &policy);
            prop_assert_eq!(repeat.action, PumpAction::Hold);
            prop_assert_eq!(repeat.next, AutoDecision::On);
        }

        #[test]
        fn high_ppm_switches_off_once(ppm in 1151u32..100_000, last in latch()) {
            prop_assume!(last != AutoDecision::Off);
            let policy = NutrientPolicyConfigs::default();

            let first = decide(Some(ppm as f64), last, &policy);
            prop_assert_eq!(first.action, PumpAction::Off);
            prop_assert_eq!(first.next, AutoDecision::Off);

            let repeat = decide(Some(ppm as f64), first.next, &policy);
            prop_assert_eq!(repeat.action, PumpAction::Hold);
        }

        #[test]
        fn dead_band_never_acts(ppm in 750u32..=1150, last in latch()) {
            let decision = decide(Some(ppm as f64), last, &NutrientPolicyConfigs::default());
            prop_assert_eq!(decision.action, PumpAction::Hold);
            prop_assert_eq!(decision.next, last);
        }
    }

    #[test]
    fn test_insufficient_data_keeps_latch() {
        let policy = NutrientPolicyConfigs::default();
        for last in [AutoDecision::Unset, AutoDecision::On, AutoDecision::Off] {
            assert_eq!(decide(None, last, &policy).action, PumpAction::Hold);
            assert_eq!(decide(None, last, &policy).next, last);
            assert_eq!(decide(Some(f64::NAN), last, &policy).action, PumpAction::Hold);
            assert_eq!(decide(Some(f64::NAN), last, &policy).next, last);
        }
    }

    #[test]
    fn test_reading_sequence() {
        let mut ctrl = controller();
        let actions: Vec<PumpAction> = [900.0, 600.0, 500.0, 1200.0, 1000.0]
            .into_iter()
            .map(|ppm| ctrl.update(Some(ppm), now()).action)
            .collect();

        assert_eq!(
            actions,
            vec![
                PumpAction::Hold,
                PumpAction::On,
                PumpAction::Hold,
                PumpAction::Off,
                PumpAction::Hold
            ]
        );
        assert_eq!(ctrl.last_decision(), AutoDecision::Off);
        assert_eq!(ctrl.pump().commands.len(), 2);
        assert_eq!(ctrl.event_log().entries.len(), 2);
        assert_eq!(ctrl.event_log().entries[1].to_value()["rule"], json!("HIGH"));
    }

    #[test]
    fn test_auto_command_and_log_contents() {
        let mut ctrl = controller();
        ctrl.update(Some(600.0), now());

        let command = &ctrl.pump().commands[0];
        assert!(command.on);
        assert_eq!(command.mode, PumpMode::Auto);
        assert_eq!(command.note.as_deref(), Some("AUTO: ppm 600 < 750"));

        let entry = ctrl.event_log().entries[0].to_value();
        assert_eq!(entry["message"], json!("Pump ON (AUTO). ppm=600 < 750"));
        assert_eq!(entry["ppm"], json!(600));
        assert_eq!(entry["rule"], json!("LOW"));
    }

    #[test]
    fn test_failed_write_still_moves_latch() {
        let mut ctrl = PumpHysteresisController::new(
            NutrientPolicyConfigs::default(),
            RecordingPump {
                fail: true,
                ..Default::default()
            },
            RecordingLog::default(),
        );

        let first = ctrl.update(Some(500.0), now());
        assert_eq!(first.action, PumpAction::On);
        assert_eq!(ctrl.last_decision(), AutoDecision::On);

        // nothing reached the pump, and nothing will until the high threshold is crossed
        let second = ctrl.update(Some(500.0), now());
        assert_eq!(second.action, PumpAction::Hold);
        assert!(ctrl.pump().commands.is_empty());
        // only the first reading was worth a log entry
        assert_eq!(ctrl.event_log().entries.len(), 1);
    }

    #[test]
    fn test_manual_toggle_leaves_latch_alone() {
        let mut ctrl = controller();
        ctrl.update(Some(600.0), now());
        assert_eq!(ctrl.last_decision(), AutoDecision::On);

        let current = ctrl.pump().commands.last().cloned();
        let written = ctrl.manual_toggle(current.as_ref(), now());
        assert!(!written.on);
        assert_eq!(written.mode, PumpMode::Manual);
        assert_eq!(written.note.as_deref(), Some("MANUAL toggle -> OFF"));
        assert_eq!(ctrl.last_decision(), AutoDecision::On);

        // the latch still says ON, so a low reading does not switch the pump back on
        let decision = ctrl.update(Some(500.0), now());
        assert_eq!(decision.action, PumpAction::Hold);
        assert!(!ctrl.pump().commands.last().unwrap().on);
        assert_eq!(
            ctrl.event_log().entries.last().unwrap().message,
            "Pump OFF (MANUAL)"
        );
    }

    #[test]
    fn test_manual_toggle_without_document_turns_on() {
        let mut ctrl = controller();
        let written = ctrl.manual_toggle(None, now());
        assert!(written.on);
        assert_eq!(ctrl.last_decision(), AutoDecision::Unset);
    }
}
