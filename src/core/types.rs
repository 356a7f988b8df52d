use serde::Serialize;
use thiserror::Error;

pub const DEFAULT_MAX_PERIODS: u32 = 1_000;
pub const DEFAULT_TOLERANCE: f64 = 0.01;
pub const DEFAULT_MAX_ITERATIONS: u32 = 100;
/// Upper bound on any period count: years, depletion caps and rate sequence
/// lengths. Schedules hold one entry per period.
pub const MAX_PERIOD_COUNT: u32 = 10_000;

/// Rejected input to one of the projection operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidArgument {
    #[error("{name} cannot be negative: {value}")]
    NegativeAmount { name: &'static str, value: f64 },

    #[error("{name} must be positive: {value}")]
    NonPositiveAmount { name: &'static str, value: f64 },

    /// `index` is set when the rate came from a sequence.
    #[error("{} cannot be less than -100%: {rate}", rate_label(.index))]
    RateBelowTotalLoss { index: Option<usize>, rate: f64 },

    #[error("{name} must be a finite number, found {value}")]
    NonFiniteValue { name: &'static str, value: f64 },

    #[error("rate sequence cannot be empty")]
    EmptyRateSequence,

    #[error("{name} cannot be negative: {value}")]
    NegativePeriodCount { name: &'static str, value: f64 },

    #[error("{name} must be a whole number: {value}")]
    FractionalPeriodCount { name: &'static str, value: f64 },

    #[error("{name} cannot exceed {max} periods: {value}")]
    PeriodCountTooLarge {
        name: &'static str,
        value: f64,
        max: u32,
    },

    #[error("target period count must be positive")]
    NonPositiveTarget,

    #[error("tolerance must be positive: {value}")]
    NonPositiveTolerance { value: f64 },

    #[error("max iterations must be positive")]
    NonPositiveMaxIterations,

    #[error("target of {target} periods exceeds the simulation cap of {cap} periods")]
    TargetBeyondPeriodCap { target: u32, cap: u32 },
}

fn rate_label(index: &Option<usize>) -> String {
    match index {
        Some(i) => format!("rate at index {i}"),
        None => "rate".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, InvalidArgument>;

/// When the periodic contribution lands relative to that period's growth.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ContributionTiming {
    /// `balance = (balance + contribution) * (1 + rate)`
    #[default]
    StartOfPeriod,
    /// `balance = balance * (1 + rate) + contribution`
    EndOfPeriod,
}

/// Safety valve for the depletion loop. A withdrawal small enough relative to
/// growth never depletes the balance, so the simulation stops at `max_periods`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DepletionLimits {
    pub max_periods: u32,
}

impl Default for DepletionLimits {
    fn default() -> Self {
        Self {
            max_periods: DEFAULT_MAX_PERIODS,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SolveConfig {
    pub tolerance: f64,
    pub max_iterations: u32,
    pub limits: DepletionLimits,
}

impl Default for SolveConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            limits: DepletionLimits::default(),
        }
    }
}

/// One simulated period. `balance` is the closing balance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodBalance {
    pub period: u32,
    pub rate: f64,
    pub contribution: f64,
    pub withdrawal: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepletionOutcome {
    pub periods: u32,
    pub remaining_balance: f64,
    pub capped: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate: f64,
    pub periods_survived: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalSolveResult {
    pub withdrawal: f64,
    pub achieved_periods: u32,
    pub target_periods: u32,
    pub iterations: u32,
    pub converged: bool,
    pub exact_match: bool,
    pub trace: Vec<SolveIteration>,
}

/// Converts a user-supplied number into a period count.
pub fn period_count(name: &'static str, value: f64) -> Result<u32> {
    if !value.is_finite() {
        return Err(InvalidArgument::NonFiniteValue { name, value });
    }
    if value < 0.0 {
        return Err(InvalidArgument::NegativePeriodCount { name, value });
    }
    if value.fract() != 0.0 {
        return Err(InvalidArgument::FractionalPeriodCount { name, value });
    }
    if value > MAX_PERIOD_COUNT as f64 {
        return Err(InvalidArgument::PeriodCountTooLarge {
            name,
            value,
            max: MAX_PERIOD_COUNT,
        });
    }
    Ok(value as u32)
}

pub(crate) fn check_period_count(name: &'static str, periods: usize) -> Result<()> {
    if periods > MAX_PERIOD_COUNT as usize {
        return Err(InvalidArgument::PeriodCountTooLarge {
            name,
            value: periods as f64,
            max: MAX_PERIOD_COUNT,
        });
    }
    Ok(())
}

pub(crate) fn check_finite(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(InvalidArgument::NonFiniteValue { name, value })
    }
}

pub(crate) fn check_non_negative(name: &'static str, value: f64) -> Result<()> {
    check_finite(name, value)?;
    if value < 0.0 {
        return Err(InvalidArgument::NegativeAmount { name, value });
    }
    Ok(())
}

pub(crate) fn check_positive(name: &'static str, value: f64) -> Result<()> {
    check_finite(name, value)?;
    if value <= 0.0 {
        return Err(InvalidArgument::NonPositiveAmount { name, value });
    }
    Ok(())
}

pub(crate) fn check_rate(index: Option<usize>, rate: f64) -> Result<()> {
    check_finite("rate", rate)?;
    if rate < -1.0 {
        return Err(InvalidArgument::RateBelowTotalLoss { index, rate });
    }
    Ok(())
}
