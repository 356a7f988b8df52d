use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use thiserror::Error;

use crate::core::{
    ContributionTiming, DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_PERIODS, DEFAULT_TOLERANCE,
    DepletionLimits, InvalidArgument, PeriodBalance, SolveConfig,
};
use crate::report::{
    DepletionReport, DepletionRequest, FixedGrowthReport, FixedGrowthRequest,
    VariableGrowthReport, VariableGrowthRequest, WithdrawalReport, WithdrawalRequest,
    depletion_report, fixed_growth_report, format_currency, format_percentage,
    variable_growth_report, withdrawal_report,
};

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    InvalidArgument(#[from] InvalidArgument),
    #[error("failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliContributionTiming {
    Start,
    End,
}

impl From<CliContributionTiming> for ContributionTiming {
    fn from(value: CliContributionTiming) -> Self {
        match value {
            CliContributionTiming::Start => ContributionTiming::StartOfPeriod,
            CliContributionTiming::End => ContributionTiming::EndOfPeriod,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "nestegg",
    about = "Savings growth, drawdown and sustainable withdrawal projections"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Print the report as JSON")]
    pub json: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Growth of a constant yearly contribution at a fixed rate
    Fixed {
        #[arg(long, allow_negative_numbers = true, help = "Contribution per year")]
        contribution: f64,
        #[arg(long, allow_negative_numbers = true, help = "Annual rate in percent, e.g. 5")]
        rate: f64,
        #[arg(long)]
        years: u32,
        #[arg(
            long,
            value_enum,
            default_value_t = CliContributionTiming::Start,
            help = "Whether contributions land before or after each year's growth"
        )]
        timing: CliContributionTiming,
    },
    /// Growth of a lump sum through a sequence of yearly rates
    Variable {
        #[arg(long, allow_negative_numbers = true)]
        initial: f64,
        #[arg(
            long,
            value_delimiter = ',',
            allow_negative_numbers = true,
            required = true,
            help = "Annual rates in percent, in order, e.g. 5,3,-2"
        )]
        rates: Vec<f64>,
    },
    /// Years a balance lasts under a fixed yearly withdrawal
    Depletion {
        #[arg(long, allow_negative_numbers = true)]
        balance: f64,
        #[arg(long, allow_negative_numbers = true)]
        withdrawal: f64,
        #[arg(long, allow_negative_numbers = true, help = "Annual rate in percent")]
        rate: f64,
        #[arg(
            long,
            default_value_t = DEFAULT_MAX_PERIODS,
            help = "Stop simulating after this many years"
        )]
        max_periods: u32,
    },
    /// Largest yearly withdrawal that lasts the target number of years
    Optimize {
        #[arg(long, allow_negative_numbers = true)]
        balance: f64,
        #[arg(long, allow_negative_numbers = true, help = "Annual rate in percent")]
        rate: f64,
        #[arg(long, default_value_t = 20)]
        target_years: u32,
        #[arg(
            long,
            default_value_t = DEFAULT_TOLERANCE,
            help = "Stop once the search interval is narrower than this amount"
        )]
        tolerance: f64,
        #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
        max_iterations: u32,
        #[arg(long, default_value_t = DEFAULT_MAX_PERIODS)]
        max_periods: u32,
    },
    /// Serve the projections over HTTP
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

/// Runs a projection subcommand and renders its output. `Serve` is handled
/// by the caller and renders nothing here.
pub fn render(command: &Command, json: bool) -> Result<String, CliError> {
    match *command {
        Command::Fixed {
            contribution,
            rate,
            years,
            timing,
        } => {
            let report = fixed_growth_report(FixedGrowthRequest {
                contribution,
                rate: rate / 100.0,
                periods: years,
                timing: timing.into(),
            })?;
            output(&report, json, render_fixed)
        }
        Command::Variable {
            initial,
            ref rates,
        } => {
            let report = variable_growth_report(&VariableGrowthRequest {
                initial,
                rates: rates.iter().map(|r| r / 100.0).collect(),
            })?;
            output(&report, json, render_variable)
        }
        Command::Depletion {
            balance,
            withdrawal,
            rate,
            max_periods,
        } => {
            let report = depletion_report(DepletionRequest {
                balance,
                withdrawal,
                rate: rate / 100.0,
                limits: DepletionLimits { max_periods },
            })?;
            output(&report, json, render_depletion)
        }
        Command::Optimize {
            balance,
            rate,
            target_years,
            tolerance,
            max_iterations,
            max_periods,
        } => {
            let report = withdrawal_report(WithdrawalRequest {
                balance,
                rate: rate / 100.0,
                target_periods: target_years,
                config: SolveConfig {
                    tolerance,
                    max_iterations,
                    limits: DepletionLimits { max_periods },
                },
            })?;
            output(&report, json, render_withdrawal)
        }
        Command::Serve { .. } => Ok(String::new()),
    }
}

fn output<T: Serialize>(report: &T, json: bool, text: fn(&T) -> String) -> Result<String, CliError> {
    if json {
        Ok(serde_json::to_string_pretty(report)?)
    } else {
        Ok(text(report))
    }
}

fn render_fixed(report: &FixedGrowthReport) -> String {
    let mut lines = vec![
        format!("Annual contribution:   {}", format_currency(report.contribution)),
        format!("Interest rate:         {}", format_percentage(report.rate)),
        format!("Investment period:     {} years", report.periods),
        format!("Total contributed:     {}", format_currency(report.total_contributed)),
        format!("Interest earned:       {}", format_currency(report.interest_earned)),
        format!("Final balance:         {}", format_currency(report.final_balance)),
    ];
    push_schedule(&mut lines, &report.schedule);
    lines.join("\n")
}

fn render_variable(report: &VariableGrowthReport) -> String {
    let mut lines = vec![
        format!("Initial investment:    {}", format_currency(report.initial)),
        format!("Investment period:     {} years", report.periods),
        format!("Average rate:          {}", format_percentage(report.average_rate)),
        format!("Total growth:          {}", format_currency(report.total_growth)),
    ];
    if let Some(fraction) = report.growth_fraction {
        lines.push(format!("Growth percentage:     {}", format_percentage(fraction)));
    }
    lines.push(format!(
        "Final balance:         {}",
        format_currency(report.final_balance)
    ));
    push_schedule(&mut lines, &report.schedule);
    lines.join("\n")
}

fn render_depletion(report: &DepletionReport) -> String {
    let mut lines = vec![
        format!("Starting balance:      {}", format_currency(report.balance)),
        format!("Annual withdrawal:     {}", format_currency(report.withdrawal)),
        format!("Expected return:       {}", format_percentage(report.rate)),
        format!("Total withdrawn:       {}", format_currency(report.total_withdrawn)),
        format!("Duration:              {} years", report.periods),
    ];
    if report.capped {
        lines.push(format!(
            "Note: simulation stopped at the {}-year cap; the balance may never deplete.",
            report.periods
        ));
    }
    push_schedule(&mut lines, &report.schedule);
    lines.join("\n")
}

fn render_withdrawal(report: &WithdrawalReport) -> String {
    [
        format!("Starting balance:      {}", format_currency(report.balance)),
        format!("Expected return:       {}", format_percentage(report.rate)),
        format!("Target duration:       {} years", report.target_periods),
        format!("Optimal withdrawal:    {}", format_currency(report.withdrawal)),
        format!("Withdrawal rate:       {}", format_percentage(report.withdrawal_rate)),
        format!("Monthly withdrawal:    {}", format_currency(report.monthly_withdrawal)),
        format!(
            "Total over {} years:   {}",
            report.target_periods,
            format_currency(report.total_over_target)
        ),
        format!(
            "Verification:          lasts {} years (target {}, {} iterations)",
            report.verified_periods, report.target_periods, report.iterations
        ),
    ]
    .join("\n")
}

fn push_schedule(lines: &mut Vec<String>, schedule: &[PeriodBalance]) {
    if schedule.is_empty() {
        return;
    }
    lines.push(String::new());
    for point in schedule {
        lines.push(format!(
            "  Year {:>4}: {:>18}  (rate {})",
            point.period,
            format_currency(point.balance),
            format_percentage(point.rate)
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args.iter().copied()).expect("arguments should parse")
    }

    #[test]
    fn fixed_command_renders_final_balance() {
        let cli = parse(&[
            "nestegg",
            "fixed",
            "--contribution",
            "7500",
            "--rate",
            "5",
            "--years",
            "3",
        ]);
        let text = render(&cli.command, cli.json).expect("valid command");
        assert!(text.contains("Final balance:         $24,825.94"));
        assert!(text.contains("Year    3"));
    }

    #[test]
    fn end_timing_flag_switches_recurrence() {
        let cli = parse(&[
            "nestegg", "fixed", "--contribution", "7500", "--rate", "5", "--years", "3",
            "--timing", "end",
        ]);
        let text = render(&cli.command, cli.json).expect("valid command");
        assert!(text.contains("$23,643.75"));
    }

    #[test]
    fn variable_command_accepts_negative_rate_list() {
        let cli = parse(&[
            "nestegg",
            "variable",
            "--initial",
            "10000",
            "--rates",
            "5,3,-2",
            "--json",
        ]);
        let json = render(&cli.command, cli.json).expect("valid command");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        assert!((value["finalBalance"].as_f64().expect("number") - 10_598.70).abs() < 0.01);
        assert_eq!(value["periods"], 3);
    }

    #[test]
    fn depletion_command_reports_cap() {
        let cli = parse(&[
            "nestegg",
            "depletion",
            "--balance",
            "100000",
            "--withdrawal",
            "1000",
            "--rate",
            "5",
            "--max-periods",
            "50",
        ]);
        let text = render(&cli.command, cli.json).expect("valid command");
        assert!(text.contains("Duration:              50 years"));
        assert!(text.contains("50-year cap"));
    }

    #[test]
    fn optimize_command_uses_solver_defaults() {
        let cli = parse(&[
            "nestegg",
            "optimize",
            "--balance",
            "500000",
            "--rate",
            "4",
            "--target-years",
            "25",
        ]);
        match cli.command {
            Command::Optimize {
                tolerance,
                max_iterations,
                max_periods,
                ..
            } => {
                assert!((tolerance - 0.01).abs() < 1e-12);
                assert_eq!(max_iterations, 100);
                assert_eq!(max_periods, 1_000);
            }
            ref other => panic!("unexpected command {other:?}"),
        }
        let text = render(&cli.command, cli.json).expect("valid command");
        assert!(text.contains("Optimal withdrawal:"));
        assert!(text.contains("target 25"));
    }

    #[test]
    fn invalid_arguments_surface_as_errors() {
        let cli = parse(&[
            "nestegg",
            "fixed",
            "--contribution",
            "-1000",
            "--rate",
            "5",
            "--years",
            "10",
        ]);
        let err = render(&cli.command, cli.json).expect_err("must reject");
        assert!(matches!(
            err,
            CliError::InvalidArgument(InvalidArgument::NegativeAmount { .. })
        ));

        let cli = parse(&[
            "nestegg", "optimize", "--balance", "1000", "--rate", "-200",
        ]);
        let err = render(&cli.command, cli.json).expect_err("must reject");
        assert!(err.to_string().contains("-100%"));
    }

    #[test]
    fn oversized_period_counts_are_rejected() {
        let cli = parse(&[
            "nestegg", "fixed", "--contribution", "1", "--rate", "0", "--years", "4294967295",
        ]);
        let err = render(&cli.command, cli.json).expect_err("must reject");
        assert!(matches!(
            err,
            CliError::InvalidArgument(InvalidArgument::PeriodCountTooLarge { name: "periods", .. })
        ));

        let cli = parse(&[
            "nestegg",
            "depletion",
            "--balance",
            "100",
            "--withdrawal",
            "0",
            "--rate",
            "5",
            "--max-periods",
            "10001",
        ]);
        let err = render(&cli.command, cli.json).expect_err("must reject");
        assert_eq!(err.to_string(), "max periods cannot exceed 10000 periods: 10001");
    }

    #[test]
    fn negative_years_are_rejected_by_the_parser() {
        let result = Cli::try_parse_from([
            "nestegg", "fixed", "--contribution", "100", "--rate", "5", "--years", "-5",
        ]);
        assert!(result.is_err());
    }
}
