use tracing::{debug, trace};

use super::engine::simulate_depletion;
use super::types::{
    InvalidArgument, Result, SolveConfig, SolveIteration, WithdrawalSolveResult,
    check_period_count, check_positive, check_rate,
};

/// Largest withdrawal that `balance` sustains for roughly `target_periods`,
/// found by bisecting `[0, balance]` with the default [`SolveConfig`].
pub fn maximum_withdrawal(balance: f64, rate: f64, target_periods: u32) -> Result<f64> {
    Ok(solve_withdrawal(balance, rate, target_periods, SolveConfig::default())?.withdrawal)
}

/// Bisection over the withdrawal amount, using the depletion simulation as
/// the oracle. The oracle is assumed non-increasing in the withdrawal.
pub fn solve_withdrawal(
    balance: f64,
    rate: f64,
    target_periods: u32,
    config: SolveConfig,
) -> Result<WithdrawalSolveResult> {
    validate_request(balance, rate, target_periods, config)?;

    let mut trace = Vec::new();
    let mut lo = 0.0;
    let mut hi = balance;
    let mut it = 0;
    let mut exact = None;

    while (hi - lo) > config.tolerance && it < config.max_iterations {
        it += 1;
        let mid = (lo + hi) * 0.5;
        let survived = simulate_depletion(balance, mid, rate, config.limits)?.periods;
        trace.push(SolveIteration {
            iteration: it,
            lower_bound: lo,
            upper_bound: hi,
            candidate: mid,
            periods_survived: survived,
        });
        trace!(iteration = it, lo, hi, mid, survived, "withdrawal bisection step");

        if survived > target_periods {
            lo = mid;
        } else if survived < target_periods {
            hi = mid;
        } else {
            exact = Some(mid);
            break;
        }
    }

    let exact_match = exact.is_some();
    let withdrawal = exact.unwrap_or((lo + hi) * 0.5);
    let converged = exact_match || (hi - lo) <= config.tolerance;
    let achieved_periods = simulate_depletion(balance, withdrawal, rate, config.limits)?.periods;
    debug!(
        balance,
        rate,
        target_periods,
        withdrawal,
        achieved_periods,
        iterations = it,
        converged,
        "solved sustainable withdrawal"
    );

    Ok(WithdrawalSolveResult {
        withdrawal,
        achieved_periods,
        target_periods,
        iterations: it,
        converged,
        exact_match,
        trace,
    })
}

fn validate_request(
    balance: f64,
    rate: f64,
    target_periods: u32,
    config: SolveConfig,
) -> Result<()> {
    check_positive("balance", balance)?;
    check_rate(None, rate)?;
    if target_periods == 0 {
        return Err(InvalidArgument::NonPositiveTarget);
    }
    if !config.tolerance.is_finite() || config.tolerance <= 0.0 {
        return Err(InvalidArgument::NonPositiveTolerance {
            value: config.tolerance,
        });
    }
    if config.max_iterations == 0 {
        return Err(InvalidArgument::NonPositiveMaxIterations);
    }
    check_period_count("max periods", config.limits.max_periods as usize)?;
    if target_periods > config.limits.max_periods {
        return Err(InvalidArgument::TargetBeyondPeriodCap {
            target: target_periods,
            cap: config.limits.max_periods,
        });
    }
    Ok(())
}
