//! Derived figures shown alongside each projection.
//!
//! Requests carry rates as fractions; percent conversion happens in the
//! command line and HTTP layers.

use serde::Serialize;

use crate::core::{
    self, ContributionTiming, DepletionLimits, PeriodBalance, SolveConfig, SolveIteration,
};

#[derive(Debug, Clone, Copy)]
pub struct FixedGrowthRequest {
    pub contribution: f64,
    pub rate: f64,
    pub periods: u32,
    pub timing: ContributionTiming,
}

#[derive(Debug, Clone)]
pub struct VariableGrowthRequest {
    pub initial: f64,
    pub rates: Vec<f64>,
}

#[derive(Debug, Clone, Copy)]
pub struct DepletionRequest {
    pub balance: f64,
    pub withdrawal: f64,
    pub rate: f64,
    pub limits: DepletionLimits,
}

#[derive(Debug, Clone, Copy)]
pub struct WithdrawalRequest {
    pub balance: f64,
    pub rate: f64,
    pub target_periods: u32,
    pub config: SolveConfig,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Sustainability {
    Insufficient,
    Short,
    Adequate,
    Sustainable,
}

impl Sustainability {
    pub fn from_periods(periods: u32) -> Self {
        match periods {
            0 => Sustainability::Insufficient,
            1..=9 => Sustainability::Short,
            10..=19 => Sustainability::Adequate,
            _ => Sustainability::Sustainable,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WithdrawalRateBand {
    Conservative,
    Moderate,
    High,
}

impl WithdrawalRateBand {
    pub fn from_rate(rate: f64) -> Self {
        if rate > 0.10 {
            WithdrawalRateBand::High
        } else if rate > 0.05 {
            WithdrawalRateBand::Moderate
        } else {
            WithdrawalRateBand::Conservative
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedGrowthReport {
    pub contribution: f64,
    pub rate: f64,
    pub periods: u32,
    pub total_contributed: f64,
    pub interest_earned: f64,
    pub final_balance: f64,
    pub schedule: Vec<PeriodBalance>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableGrowthReport {
    pub initial: f64,
    pub periods: u32,
    pub average_rate: f64,
    pub total_growth: f64,
    /// `None` when there is no initial amount to grow.
    pub growth_fraction: Option<f64>,
    pub final_balance: f64,
    pub schedule: Vec<PeriodBalance>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepletionReport {
    pub balance: f64,
    pub withdrawal: f64,
    pub rate: f64,
    pub periods: u32,
    pub total_withdrawn: f64,
    pub remaining_balance: f64,
    pub capped: bool,
    pub sustainability: Sustainability,
    pub schedule: Vec<PeriodBalance>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalReport {
    pub balance: f64,
    pub rate: f64,
    pub target_periods: u32,
    pub withdrawal: f64,
    pub withdrawal_rate: f64,
    pub monthly_withdrawal: f64,
    pub total_over_target: f64,
    pub verified_periods: u32,
    pub rate_band: WithdrawalRateBand,
    pub iterations: u32,
    pub converged: bool,
    pub trace: Vec<SolveIteration>,
}

pub fn fixed_growth_report(request: FixedGrowthRequest) -> core::Result<FixedGrowthReport> {
    let final_balance = core::fixed_contribution_growth_with_timing(
        request.contribution,
        request.rate,
        request.periods,
        request.timing,
    )?;
    let schedule = core::fixed_contribution_schedule(
        request.contribution,
        request.rate,
        request.periods,
        request.timing,
    )?;
    let total_contributed = request.contribution * request.periods as f64;

    Ok(FixedGrowthReport {
        contribution: request.contribution,
        rate: request.rate,
        periods: request.periods,
        total_contributed,
        interest_earned: final_balance - total_contributed,
        final_balance,
        schedule,
    })
}

pub fn variable_growth_report(request: &VariableGrowthRequest) -> core::Result<VariableGrowthReport> {
    let final_balance = core::variable_rate_growth(request.initial, &request.rates)?;
    let schedule = core::variable_rate_schedule(request.initial, &request.rates)?;
    let average_rate = request.rates.iter().sum::<f64>() / request.rates.len() as f64;
    let total_growth = final_balance - request.initial;

    Ok(VariableGrowthReport {
        initial: request.initial,
        periods: request.rates.len() as u32,
        average_rate,
        total_growth,
        growth_fraction: (request.initial > 0.0).then(|| total_growth / request.initial),
        final_balance,
        schedule,
    })
}

pub fn depletion_report(request: DepletionRequest) -> core::Result<DepletionReport> {
    let outcome = core::depletion_outcome(
        request.balance,
        request.withdrawal,
        request.rate,
        request.limits,
    )?;
    let schedule = core::depletion_schedule(
        request.balance,
        request.withdrawal,
        request.rate,
        request.limits,
    )?;

    Ok(DepletionReport {
        balance: request.balance,
        withdrawal: request.withdrawal,
        rate: request.rate,
        periods: outcome.periods,
        total_withdrawn: request.withdrawal * outcome.periods as f64,
        remaining_balance: outcome.remaining_balance,
        capped: outcome.capped,
        sustainability: Sustainability::from_periods(outcome.periods),
        schedule,
    })
}

pub fn withdrawal_report(request: WithdrawalRequest) -> core::Result<WithdrawalReport> {
    let solved = core::solve_withdrawal(
        request.balance,
        request.rate,
        request.target_periods,
        request.config,
    )?;
    let withdrawal_rate = solved.withdrawal / request.balance;

    Ok(WithdrawalReport {
        balance: request.balance,
        rate: request.rate,
        target_periods: request.target_periods,
        withdrawal: solved.withdrawal,
        withdrawal_rate,
        monthly_withdrawal: solved.withdrawal / 12.0,
        total_over_target: solved.withdrawal * request.target_periods as f64,
        verified_periods: solved.achieved_periods,
        rate_band: WithdrawalRateBand::from_rate(withdrawal_rate),
        iterations: solved.iterations,
        converged: solved.converged,
        trace: solved.trace,
    })
}

pub fn format_currency(amount: f64) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    let cents = (amount.abs() * 100.0).round() as u128;
    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}${grouped}.{:02}", cents % 100)
}

pub fn format_percentage(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}
