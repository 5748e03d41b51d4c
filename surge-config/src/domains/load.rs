//! Load profile configuration: how many iterations start per unit of time

use crate::error::ConfigResult;
use crate::validation::{validate_positive, validate_rate, Validatable};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Executor kinds the scheduler understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutorKind {
    ConstantRate,
    RampingRate,
}

impl fmt::Display for ExecutorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutorKind::ConstantRate => write!(f, "constant-rate"),
            ExecutorKind::RampingRate => write!(f, "ramping-rate"),
        }
    }
}

/// One leg of a ramping profile. The rate moves linearly from the previous
/// stage's target to `target` over `duration`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    pub target: f64,
}

impl Stage {
    pub fn new(duration: Duration, target: f64) -> Self {
        Self { duration, target }
    }
}

/// Time shape of the iteration start rate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "executor", rename_all = "kebab-case")]
pub enum RateShape {
    ConstantRate {
        /// Iterations started per `time_unit`
        rate: f64,
        #[serde(with = "humantime_serde")]
        duration: Duration,
    },
    RampingRate {
        /// Rate at t=0, before the first stage starts moving
        #[serde(default)]
        start_rate: f64,
        stages: Vec<Stage>,
    },
}

/// Complete load profile handed to the scheduler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadProfile {
    #[serde(flatten)]
    pub shape: RateShape,

    /// Unit the rates are expressed in
    #[serde(with = "humantime_serde", default = "default_time_unit")]
    pub time_unit: Duration,

    /// Workers allocated before the first iteration starts
    #[serde(default = "default_preallocated_workers")]
    pub preallocated_workers: usize,

    /// Upper bound on concurrently executing iterations. Starts beyond it are dropped.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// How long in-flight iterations may run past the end of the profile.
    /// `None` waits for every iteration to finish.
    #[serde(with = "humantime_serde", default, skip_serializing_if = "Option::is_none")]
    pub graceful_stop: Option<Duration>,
}

impl LoadProfile {
    pub fn constant(rate: f64, duration: Duration, preallocated: usize, max: usize) -> Self {
        Self {
            shape: RateShape::ConstantRate { rate, duration },
            time_unit: default_time_unit(),
            preallocated_workers: preallocated,
            max_workers: max,
            graceful_stop: None,
        }
    }

    pub fn ramping(start_rate: f64, stages: Vec<Stage>, preallocated: usize, max: usize) -> Self {
        Self {
            shape: RateShape::RampingRate { start_rate, stages },
            time_unit: default_time_unit(),
            preallocated_workers: preallocated,
            max_workers: max,
            graceful_stop: None,
        }
    }

    pub fn executor_kind(&self) -> ExecutorKind {
        match self.shape {
            RateShape::ConstantRate { .. } => ExecutorKind::ConstantRate,
            RateShape::RampingRate { .. } => ExecutorKind::RampingRate,
        }
    }

    /// Total scheduled duration (sum of stages for ramping profiles)
    pub fn total_duration(&self) -> Duration {
        match &self.shape {
            RateShape::ConstantRate { duration, .. } => *duration,
            RateShape::RampingRate { stages, .. } => stages.iter().map(|s| s.duration).sum(),
        }
    }

    /// Highest target rate, in iterations per `time_unit`
    pub fn peak_rate(&self) -> f64 {
        match &self.shape {
            RateShape::ConstantRate { rate, .. } => *rate,
            RateShape::RampingRate { start_rate, stages } => stages
                .iter()
                .map(|s| s.target)
                .fold(*start_rate, f64::max),
        }
    }

    /// Replace the peak rate. Ramping profiles are scaled so their shape is kept.
    pub fn override_rate(&mut self, new_rate: f64) {
        let peak = self.peak_rate();
        match &mut self.shape {
            RateShape::ConstantRate { rate, .. } => *rate = new_rate,
            RateShape::RampingRate { start_rate, stages } => {
                if peak <= 0.0 {
                    return;
                }
                let factor = new_rate / peak;
                *start_rate *= factor;
                for stage in stages.iter_mut() {
                    stage.target *= factor;
                }
            }
        }
    }

    /// Replace the total duration. Ramping stages are stretched proportionally.
    pub fn override_duration(&mut self, new_duration: Duration) {
        let total = self.total_duration();
        match &mut self.shape {
            RateShape::ConstantRate { duration, .. } => *duration = new_duration,
            RateShape::RampingRate { stages, .. } => {
                if total.is_zero() {
                    return;
                }
                let factor = new_duration.as_secs_f64() / total.as_secs_f64();
                for stage in stages.iter_mut() {
                    stage.duration = stage.duration.mul_f64(factor);
                }
            }
        }
    }
}

impl Validatable for LoadProfile {
    fn validate(&self) -> ConfigResult<()> {
        let domain = self.domain_name();

        match &self.shape {
            RateShape::ConstantRate { rate, duration } => {
                validate_rate(*rate, "rate", domain)?;
                validate_positive(duration.as_millis(), "duration", domain)?;
            }
            RateShape::RampingRate { start_rate, stages } => {
                validate_rate(*start_rate, "start_rate", domain)?;
                if stages.is_empty() {
                    return Err(self.validation_error("ramping-rate profile needs at least one stage"));
                }
                for (i, stage) in stages.iter().enumerate() {
                    validate_rate(stage.target, &format!("stages[{}].target", i), domain)?;
                    validate_positive(stage.duration.as_millis(), &format!("stages[{}].duration", i), domain)?;
                }
            }
        }

        validate_positive(self.time_unit.as_millis(), "time_unit", domain)?;
        validate_positive(self.max_workers, "max_workers", domain)?;

        if self.max_workers < self.preallocated_workers {
            return Err(self.validation_error(format!(
                "max_workers ({}) must be >= preallocated_workers ({})",
                self.max_workers, self.preallocated_workers
            )));
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "profile.load"
    }
}

fn default_time_unit() -> Duration {
    Duration::from_secs(1)
}

fn default_preallocated_workers() -> usize {
    10
}

fn default_max_workers() -> usize {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn test_max_below_preallocated_is_rejected() {
        let profile = LoadProfile::constant(10.0, secs(60), 50, 20);
        let err = profile.validate().unwrap_err();
        assert!(err.to_string().contains("max_workers (20)"));
    }

    #[test]
    fn test_ramping_requires_stages() {
        let profile = LoadProfile::ramping(0.0, vec![], 1, 1);
        assert!(profile.validate().is_err());

        let profile = LoadProfile::ramping(0.0, vec![Stage::new(secs(0), 10.0)], 1, 1);
        assert!(profile.validate().is_err());

        let profile = LoadProfile::ramping(0.0, vec![Stage::new(secs(5), f64::NAN)], 1, 1);
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_total_duration_and_peak() {
        let profile = LoadProfile::ramping(
            0.0,
            vec![
                Stage::new(secs(30), 1000.0),
                Stage::new(secs(60), 1000.0),
                Stage::new(secs(30), 2000.0),
            ],
            100,
            500,
        );
        assert!(profile.validate().is_ok());
        assert_eq!(profile.total_duration(), secs(120));
        assert_eq!(profile.peak_rate(), 2000.0);
        assert_eq!(profile.executor_kind(), ExecutorKind::RampingRate);
    }

    #[test]
    fn test_overrides_keep_shape() {
        let mut profile = LoadProfile::ramping(
            0.0,
            vec![Stage::new(secs(60), 100.0), Stage::new(secs(60), 200.0)],
            10,
            100,
        );
        profile.override_rate(400.0);
        profile.override_duration(secs(60));

        match &profile.shape {
            RateShape::RampingRate { stages, .. } => {
                assert_eq!(stages[0].target, 200.0);
                assert_eq!(stages[1].target, 400.0);
                assert_eq!(stages[0].duration, secs(30));
            }
            _ => panic!("expected ramping profile"),
        }

        let mut constant = LoadProfile::constant(5.0, secs(10), 1, 1);
        constant.override_rate(7.0);
        constant.override_duration(secs(20));
        assert_eq!(constant.peak_rate(), 7.0);
        assert_eq!(constant.total_duration(), secs(20));
    }

    #[test]
    fn test_yaml_shapes() {
        let yaml = r#"
executor: ramping-rate
start_rate: 10
stages:
  - { duration: 30s, target: 100 }
  - { duration: 1m, target: 100 }
preallocated_workers: 20
max_workers: 200
graceful_stop: 30s
"#;
        let profile: LoadProfile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(profile.executor_kind(), ExecutorKind::RampingRate);
        assert_eq!(profile.total_duration(), secs(90));
        assert_eq!(profile.graceful_stop, Some(secs(30)));
        assert_eq!(profile.time_unit, secs(1));

        let yaml = "executor: constant-rate\nrate: 50\nduration: 10m\n";
        let profile: LoadProfile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(profile.total_duration(), secs(600));
        assert_eq!(profile.max_workers, 100);
    }
}
