//! Probability → label, tiers, recommendation, and notification decision.
//!
//! Pure and total over [0, 1]. The notification threshold is the only knob.

use crate::types::{
  AlertType, ConfidenceLevel, Notification, PredictionLabel, RiskAssessment, RiskLevel,
};

pub const DEFAULT_NOTIFICATION_THRESHOLD: f64 = 0.7;

const FAIL_CUTOFF: f64 = 0.5;
const CRITICAL_CUTOFF: f64 = 0.8;
const HIGH_CUTOFF: f64 = 0.6;
const MEDIUM_CUTOFF: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskPolicy {
  pub notification_threshold: f64,
}

impl Default for RiskPolicy {
  fn default() -> Self {
    Self {
      notification_threshold: DEFAULT_NOTIFICATION_THRESHOLD,
    }
  }
}

impl RiskPolicy {
  pub fn new(notification_threshold: f64) -> Self {
    Self {
      notification_threshold,
    }
  }

  pub fn assess(&self, probability: f64) -> RiskAssessment {
    let risk_level = risk_level(probability);
    let alert_type = alert_type(probability, self.notification_threshold);
    RiskAssessment {
      prediction: prediction_label(probability),
      confidence_level: confidence_level(probability),
      risk_level,
      message: recommendation(risk_level).to_string(),
      notification: Notification {
        should_notify: probability >= self.notification_threshold,
        threshold: self.notification_threshold,
        alert_type,
        alert_message: alert_message(alert_type, probability),
      },
    }
  }
}

pub fn prediction_label(probability: f64) -> PredictionLabel {
  if probability >= FAIL_CUTOFF {
    PredictionLabel::Fail
  } else {
    PredictionLabel::Success
  }
}

pub fn risk_level(probability: f64) -> RiskLevel {
  if probability >= CRITICAL_CUTOFF {
    RiskLevel::Critical
  } else if probability >= HIGH_CUTOFF {
    RiskLevel::High
  } else if probability >= MEDIUM_CUTOFF {
    RiskLevel::Medium
  } else {
    RiskLevel::Low
  }
}

/// Distance from the decision boundary, not from either extreme.
pub fn confidence_level(probability: f64) -> ConfidenceLevel {
  let distance = (probability - FAIL_CUTOFF).abs();
  if distance >= 0.3 {
    ConfidenceLevel::High
  } else if distance >= 0.15 {
    ConfidenceLevel::Medium
  } else {
    ConfidenceLevel::Low
  }
}

/// Informative even when no notification is sent.
pub fn alert_type(probability: f64, threshold: f64) -> AlertType {
  if probability >= CRITICAL_CUTOFF {
    AlertType::Critical
  } else if probability >= threshold {
    AlertType::Warning
  } else {
    AlertType::Info
  }
}

pub fn recommendation(risk: RiskLevel) -> &'static str {
  match risk {
    RiskLevel::Critical => {
      "Very high risk of build failure. Block the merge and review dependencies and test stages before running this pipeline."
    }
    RiskLevel::High => {
      "High risk of build failure. Add or strengthen test stages and pin dependency versions."
    }
    RiskLevel::Medium => {
      "Moderate risk of build failure. Review the configuration before deploying."
    }
    RiskLevel::Low => "Low risk of build failure. The configuration looks healthy; proceed normally.",
  }
}

pub fn alert_message(alert: AlertType, probability: f64) -> String {
  let pct = probability * 100.0;
  match alert {
    AlertType::Critical => format!("Critical alert: {:.1}% chance of build failure", pct),
    AlertType::Warning => format!("Warning: {:.1}% chance of build failure", pct),
    AlertType::Info => format!("{:.1}% chance of build failure", pct),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use proptest::prelude::*;

  #[test]
  fn high_probability_is_critical_and_notifies() {
    let a = RiskPolicy::default().assess(0.85);
    assert_eq!(a.prediction, PredictionLabel::Fail);
    assert_eq!(a.risk_level, RiskLevel::Critical);
    assert_eq!(a.confidence_level, ConfidenceLevel::High);
    assert_eq!(a.notification.alert_type, AlertType::Critical);
    assert!(a.notification.should_notify);
    assert_eq!(a.notification.threshold, 0.7);
    assert!(a.notification.alert_message.contains("85.0%"));
  }

  #[test]
  fn near_boundary_is_medium_low_confidence_info() {
    let a = RiskPolicy::default().assess(0.45);
    assert_eq!(a.prediction, PredictionLabel::Success);
    assert_eq!(a.risk_level, RiskLevel::Medium);
    assert_eq!(a.confidence_level, ConfidenceLevel::Low);
    assert_eq!(a.notification.alert_type, AlertType::Info);
    assert!(!a.notification.should_notify);
  }

  #[test]
  fn band_edges_are_inclusive() {
    assert_eq!(risk_level(0.8), RiskLevel::Critical);
    assert_eq!(risk_level(0.6), RiskLevel::High);
    assert_eq!(risk_level(0.4), RiskLevel::Medium);
    assert_eq!(risk_level(0.399), RiskLevel::Low);
    assert_eq!(prediction_label(0.5), PredictionLabel::Fail);
    assert_eq!(confidence_level(0.0), ConfidenceLevel::High);
    assert_eq!(confidence_level(1.0), ConfidenceLevel::High);
    assert_eq!(confidence_level(0.5), ConfidenceLevel::Low);
  }

  #[test]
  fn confidence_edges_are_inclusive() {
    assert_eq!(confidence_level(0.2), ConfidenceLevel::High);
    assert_eq!(confidence_level(0.8), ConfidenceLevel::High);
    assert_eq!(confidence_level(0.35), ConfidenceLevel::Medium);
    assert_eq!(confidence_level(0.65), ConfidenceLevel::Medium);
    assert_eq!(confidence_level(0.7), ConfidenceLevel::Medium);
    assert_eq!(confidence_level(0.36), ConfidenceLevel::Low);
    assert_eq!(RiskPolicy::default().assess(0.7).confidence_level, ConfidenceLevel::Medium);
  }

  #[test]
  fn threshold_drives_warning_and_notify() {
    let strict = RiskPolicy::new(0.9);
    let a = strict.assess(0.75);
    assert_eq!(a.notification.alert_type, AlertType::Info);
    assert!(!a.notification.should_notify);

    let loose = RiskPolicy::new(0.3);
    let b = loose.assess(0.35);
    assert_eq!(b.notification.alert_type, AlertType::Warning);
    assert!(b.notification.should_notify);
    assert_eq!(b.risk_level, RiskLevel::Low);
  }

  #[test]
  fn each_band_has_its_own_message() {
    let messages = [
      recommendation(RiskLevel::Low),
      recommendation(RiskLevel::Medium),
      recommendation(RiskLevel::High),
      recommendation(RiskLevel::Critical),
    ];
    for (i, a) in messages.iter().enumerate() {
      for b in &messages[i + 1..] {
        assert_ne!(a, b);
      }
    }
  }

  proptest! {
    #[test]
    fn message_is_determined_by_band(p in 0.0f64..=1.0) {
      let a = RiskPolicy::default().assess(p);
      prop_assert_eq!(a.message.as_str(), recommendation(a.risk_level));
      prop_assert_eq!(a.risk_level, risk_level(p));
    }

    #[test]
    fn fail_iff_at_least_half(p in 0.0f64..=1.0) {
      let a = RiskPolicy::default().assess(p);
      prop_assert_eq!(a.prediction == PredictionLabel::Fail, p >= 0.5);
    }

    #[test]
    fn notify_is_monotone_in_probability(
      p in 0.0f64..=1.0,
      q in 0.0f64..=1.0,
      threshold in 0.0f64..=1.0,
    ) {
      let policy = RiskPolicy::new(threshold);
      let (lo, hi) = if p <= q { (p, q) } else { (q, p) };
      if policy.assess(lo).notification.should_notify {
        prop_assert!(policy.assess(hi).notification.should_notify);
      }
      prop_assert!(risk_level(lo) <= risk_level(hi));
    }

    #[test]
    fn confidence_is_monotone_in_distance(p in 0.0f64..=1.0, q in 0.0f64..=1.0) {
      let (dp, dq) = ((p - 0.5).abs(), (q - 0.5).abs());
      let (near, far) = if dp <= dq { (p, q) } else { (q, p) };
      prop_assert!(confidence_level(near) <= confidence_level(far));
    }

    #[test]
    fn assess_is_pure(p in 0.0f64..=1.0, threshold in 0.0f64..=1.0) {
      let policy = RiskPolicy::new(threshold);
      prop_assert_eq!(policy.assess(p), policy.assess(p));
    }
  }
}
