mod engine;
#[cfg(test)]
mod log_capture;
mod solver;
mod types;

pub use engine::{
    depletion_outcome, depletion_schedule, fixed_contribution_growth,
    fixed_contribution_growth_with_timing, fixed_contribution_schedule, periods_until_depleted,
    variable_rate_growth, variable_rate_schedule,
};
pub use solver::{maximum_withdrawal, solve_withdrawal};
pub use types::{
    ContributionTiming, DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_PERIODS, DEFAULT_TOLERANCE,
    DepletionLimits, DepletionOutcome, InvalidArgument, MAX_PERIOD_COUNT, PeriodBalance, Result,
    SolveConfig, SolveIteration, WithdrawalSolveResult, period_count,
};
