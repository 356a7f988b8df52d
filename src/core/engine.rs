use tracing::{debug, warn};

use super::types::{
    ContributionTiming, DepletionLimits, DepletionOutcome, InvalidArgument, PeriodBalance,
    Result, check_non_negative, check_period_count, check_rate,
};

/// Balance after `periods` constant contributions compounding at `rate`,
/// starting from zero. Contributions land at the start of each period.
pub fn fixed_contribution_growth(contribution: f64, rate: f64, periods: u32) -> Result<f64> {
    fixed_contribution_growth_with_timing(
        contribution,
        rate,
        periods,
        ContributionTiming::StartOfPeriod,
    )
}

pub fn fixed_contribution_growth_with_timing(
    contribution: f64,
    rate: f64,
    periods: u32,
    timing: ContributionTiming,
) -> Result<f64> {
    validate_fixed(contribution, rate, periods)?;
    if periods == 0 {
        return Ok(0.0);
    }

    let mut balance = 0.0;
    for _ in 0..periods {
        balance = apply_contribution_period(balance, contribution, rate, timing);
    }
    debug!(contribution, rate, periods, balance, "fixed contribution growth");
    Ok(balance)
}

pub fn fixed_contribution_schedule(
    contribution: f64,
    rate: f64,
    periods: u32,
    timing: ContributionTiming,
) -> Result<Vec<PeriodBalance>> {
    validate_fixed(contribution, rate, periods)?;

    let mut schedule = Vec::with_capacity(periods as usize);
    let mut balance = 0.0;
    for period in 1..=periods {
        balance = apply_contribution_period(balance, contribution, rate, timing);
        schedule.push(PeriodBalance {
            period,
            rate,
            contribution,
            withdrawal: 0.0,
            balance,
        });
    }
    Ok(schedule)
}

/// Compounds `initial` through `rates` in the order given.
pub fn variable_rate_growth(initial: f64, rates: &[f64]) -> Result<f64> {
    validate_variable(initial, rates)?;

    let balance = rates
        .iter()
        .fold(initial, |balance, rate| balance * (1.0 + rate));
    debug!(initial, periods = rates.len(), balance, "variable rate growth");
    Ok(balance)
}

pub fn variable_rate_schedule(initial: f64, rates: &[f64]) -> Result<Vec<PeriodBalance>> {
    validate_variable(initial, rates)?;

    let mut balance = initial;
    Ok(rates
        .iter()
        .zip(1u32..)
        .map(|(&rate, period)| {
            balance *= 1.0 + rate;
            PeriodBalance {
                period,
                rate,
                contribution: 0.0,
                withdrawal: 0.0,
                balance,
            }
        })
        .collect())
}

/// Number of full periods `balance` can fund a `withdrawal` taken at the start
/// of each period, with the remainder growing at `rate`.
///
/// Known limitation: when growth outpaces the withdrawal the balance never
/// depletes, and the count stops at [`DepletionLimits::max_periods`].
pub fn periods_until_depleted(balance: f64, withdrawal: f64, rate: f64) -> Result<u32> {
    Ok(depletion_outcome(balance, withdrawal, rate, DepletionLimits::default())?.periods)
}

/// Logs a warning when the simulation stops at `limits.max_periods`.
pub fn depletion_outcome(
    balance: f64,
    withdrawal: f64,
    rate: f64,
    limits: DepletionLimits,
) -> Result<DepletionOutcome> {
    let outcome = simulate_depletion(balance, withdrawal, rate, limits)?;
    if outcome.capped {
        warn!(
            balance,
            withdrawal,
            rate,
            max_periods = limits.max_periods,
            "depletion simulation reached its period cap"
        );
    }
    Ok(outcome)
}

/// [`depletion_outcome`] without the cap warning. The withdrawal solver
/// evaluates many candidates that are expected to hit the cap.
pub(crate) fn simulate_depletion(
    balance: f64,
    withdrawal: f64,
    rate: f64,
    limits: DepletionLimits,
) -> Result<DepletionOutcome> {
    validate_depletion(balance, withdrawal, rate, limits)?;

    let mut outcome = DepletionOutcome {
        periods: 0,
        remaining_balance: balance,
        capped: false,
    };
    run_depletion(balance, withdrawal, rate, limits, &mut outcome, |_| {});
    Ok(outcome)
}

pub fn depletion_schedule(
    balance: f64,
    withdrawal: f64,
    rate: f64,
    limits: DepletionLimits,
) -> Result<Vec<PeriodBalance>> {
    validate_depletion(balance, withdrawal, rate, limits)?;

    let mut outcome = DepletionOutcome {
        periods: 0,
        remaining_balance: balance,
        capped: false,
    };
    let mut schedule = Vec::new();
    run_depletion(balance, withdrawal, rate, limits, &mut outcome, |point| {
        schedule.push(point)
    });
    Ok(schedule)
}

fn run_depletion(
    balance: f64,
    withdrawal: f64,
    rate: f64,
    limits: DepletionLimits,
    outcome: &mut DepletionOutcome,
    mut on_period: impl FnMut(PeriodBalance),
) {
    if balance < withdrawal {
        return;
    }

    let growth = 1.0 + rate;
    let mut current = balance;
    let mut periods = 0u32;
    while current >= withdrawal {
        if periods >= limits.max_periods {
            outcome.capped = true;
            break;
        }
        current = (current - withdrawal) * growth;
        periods += 1;
        on_period(PeriodBalance {
            period: periods,
            rate,
            contribution: 0.0,
            withdrawal,
            balance: current,
        });
    }

    outcome.periods = periods;
    outcome.remaining_balance = current;
}

fn apply_contribution_period(
    balance: f64,
    contribution: f64,
    rate: f64,
    timing: ContributionTiming,
) -> f64 {
    match timing {
        ContributionTiming::StartOfPeriod => (balance + contribution) * (1.0 + rate),
        ContributionTiming::EndOfPeriod => balance * (1.0 + rate) + contribution,
    }
}

fn validate_fixed(contribution: f64, rate: f64, periods: u32) -> Result<()> {
    check_non_negative("contribution", contribution)?;
    check_rate(None, rate)?;
    check_period_count("periods", periods as usize)
}

fn validate_variable(initial: f64, rates: &[f64]) -> Result<()> {
    check_non_negative("initial amount", initial)?;
    if rates.is_empty() {
        return Err(InvalidArgument::EmptyRateSequence);
    }
    check_period_count("rate sequence", rates.len())?;
    for (index, &rate) in rates.iter().enumerate() {
        check_rate(Some(index), rate)?;
    }
    Ok(())
}

fn validate_depletion(
    balance: f64,
    withdrawal: f64,
    rate: f64,
    limits: DepletionLimits,
) -> Result<()> {
    check_non_negative("balance", balance)?;
    check_non_negative("withdrawal", withdrawal)?;
    check_rate(None, rate)?;
    check_period_count("max periods", limits.max_periods as usize)
}
