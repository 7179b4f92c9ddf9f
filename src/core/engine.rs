use std::f64::consts::PI;
use std::time::Instant;

use super::types::{AggregateResult, ConfidenceIntervals, Regime, RegimeKind, RunOutcome, Scenario};

const EQUITY_RETURN_SIGMA_PCT: f64 = 15.0;
const BOND_RETURN_SIGMA_PCT: f64 = 5.0;
const CASH_RETURN_SIGMA_PCT: f64 = 1.0;

// Probabilities sum to 1 and the expected multiplier across the table is 1.
const REGIMES: [Regime; 3] = [
    Regime {
        kind: RegimeKind::Normal,
        probability: 0.80,
        return_multiplier: 1.0,
    },
    Regime {
        kind: RegimeKind::Bull,
        probability: 0.10,
        return_multiplier: 1.5,
    },
    Regime {
        kind: RegimeKind::Bear,
        probability: 0.10,
        return_multiplier: 0.5,
    },
];

#[derive(Debug, Default)]
struct DepletionTally {
    count: u32,
    total_years: f64,
    total_shortfall: f64,
}

pub fn run_projection(scenario: &Scenario, simulation_count: u32, seed: u64) -> AggregateResult {
    let started = Instant::now();

    let mut finals = Vec::with_capacity(simulation_count as usize);
    let mut successful_runs = 0_u32;
    let mut tally = DepletionTally::default();

    for run_id in 0..simulation_count {
        let mut rng = Rng::new(derive_seed(seed, run_id));
        let outcome = simulate_run(scenario, &mut rng);

        if outcome.success {
            successful_runs += 1;
        }
        if let Some(year) = outcome.depletion_year {
            tally.count += 1;
            tally.total_years += year as f64;
            tally.total_shortfall += outcome.shortfall;
        }
        finals.push(outcome.final_wealth);
    }

    aggregate(finals, successful_runs, &tally, started)
}

fn simulate_run(scenario: &Scenario, rng: &mut Rng) -> RunOutcome {
    let mut wealth = scenario.initial_wealth;
    let mut min_wealth = wealth;
    let mut max_wealth = wealth;
    let mut depletion_year = None;
    let mut shortfall = 0.0;

    for year in 0..scenario.projection_years {
        let regime = sample_regime(rng);

        let mut equity_return_pct =
            scenario.real_equity_return_pct + EQUITY_RETURN_SIGMA_PCT * rng.standard_normal();
        let mut bond_return_pct =
            scenario.real_bond_return_pct + BOND_RETURN_SIGMA_PCT * rng.standard_normal();
        let cash_return_pct =
            scenario.real_cash_return_pct + CASH_RETURN_SIGMA_PCT * rng.standard_normal();

        // Cash is regime-invariant.
        equity_return_pct *= regime.return_multiplier;
        bond_return_pct *= regime.return_multiplier;

        let (equity_allocation, bond_allocation, cash_allocation) =
            allocation_for_year(scenario.risk_score, year);

        let portfolio_return = equity_allocation * equity_return_pct / 100.0
            + bond_allocation * bond_return_pct / 100.0
            + cash_allocation * cash_return_pct / 100.0;

        wealth *= 1.0 + portfolio_return;
        wealth -= withdrawal_for_year(scenario, year);

        min_wealth = min_wealth.min(wealth);
        max_wealth = max_wealth.max(wealth);

        if wealth <= 0.0 {
            depletion_year = Some(year + 1);
            shortfall = wealth.abs();
            break;
        }
    }

    RunOutcome {
        final_wealth: wealth.max(0.0),
        success: wealth > 0.0,
        depletion_year,
        shortfall,
        min_wealth,
        max_wealth,
    }
}

fn sample_regime(rng: &mut Rng) -> &'static Regime {
    regime_for_draw(rng.next_uniform())
}

fn regime_for_draw(u: f64) -> &'static Regime {
    let mut cumulative = 0.0;
    for regime in &REGIMES {
        cumulative += regime.probability;
        if u < cumulative {
            return regime;
        }
    }
    &REGIMES[REGIMES.len() - 1]
}

// Linear de-risking with elapsed years, floored at 10% of the baseline split.
fn allocation_for_year(risk_score: u8, year: u32) -> (f64, f64, f64) {
    let age_adjustment = (1.0 - year as f64 * 0.01).max(0.1);
    let base_equity = ((risk_score as f64 - 1.0) * 0.1).clamp(0.1, 0.9);
    let equity = base_equity * age_adjustment;
    let bond = (1.0 - equity - 0.1).min(0.8);
    let cash = 1.0 - equity - bond;
    (equity, bond, cash)
}

// Withdrawals are indexed on the original withdrawal base, not current wealth.
fn withdrawal_for_year(scenario: &Scenario, year: u32) -> f64 {
    scenario.initial_wealth
        * scenario.withdrawal_rate
        * (1.0 + scenario.inflation_rate_pct / 100.0).powi(year as i32)
}

fn aggregate(
    mut finals: Vec<f64>,
    successful_runs: u32,
    tally: &DepletionTally,
    started: Instant,
) -> AggregateResult {
    finals.sort_by(|a, b| a.total_cmp(b));
    let n = finals.len();

    let success_probability = round1(successful_runs as f64 / n as f64 * 100.0);
    let mean = finals.iter().sum::<f64>() / n as f64;
    let variance = finals.iter().map(|w| (w - mean).powi(2)).sum::<f64>() / n as f64;

    let confidence_intervals = ConfidenceIntervals {
        p10: quantile(&finals, 0.10),
        p25: quantile(&finals, 0.25),
        p50: quantile(&finals, 0.50),
        p75: quantile(&finals, 0.75),
        p90: quantile(&finals, 0.90),
    };

    AggregateResult {
        success_probability,
        average_final_wealth: mean.round(),
        median_final_wealth: finals[n / 2],
        confidence_intervals,
        shortfall_risk: 100.0 - success_probability,
        average_shortfall_amount: if tally.count > 0 {
            (tally.total_shortfall / tally.count as f64).round()
        } else {
            0.0
        },
        years_to_depletion_p50: if tally.count > 0 {
            (tally.total_years / tally.count as f64).round()
        } else {
            0.0
        },
        wealth_volatility: round1(variance.sqrt() / mean * 100.0),
        maximum_drawdown: round1(max_drawdown_across_outcomes(&finals)),
        simulation_duration_ms: started.elapsed().as_millis() as u64,
    }
}

// Lower order statistic at rank floor(n * q); no interpolation.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    sorted[(sorted.len() as f64 * q).floor() as usize]
}

// Peak-to-trough spread of the terminal-wealth distribution, walked from the
// highest outcome downward. Not a within-path drawdown.
fn max_drawdown_across_outcomes(sorted: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut worst = 0.0;
    for &wealth in sorted.iter().rev() {
        if wealth > peak {
            peak = wealth;
        }
        if peak > 0.0 {
            let drop = (peak - wealth) / peak * 100.0;
            if drop > worst {
                worst = drop;
            }
        }
    }
    worst
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn entropy_seed() -> u64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    splitmix64(nanos ^ (u64::from(std::process::id()) << 32))
}

fn derive_seed(base_seed: u64, run_id: u32) -> u64 {
    splitmix64(base_seed ^ u64::from(run_id))
}

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

struct Rng {
    state: u64,
}

impl Rng {
    fn new(seed: u64) -> Self {
        let state = if seed == 0 { 0xA5A5_A5A5_A5A5_A5A5 } else { seed };
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    fn next_uniform(&mut self) -> f64 {
        const DENOM: f64 = (1_u64 << 53) as f64;
        let v = self.next_u64() >> 11;
        ((v as f64) + 0.5) / DENOM
    }

    // Box-Muller; each sample consumes two uniform draws.
    fn standard_normal(&mut self) -> f64 {
        let u1 = self.next_uniform().max(1e-12);
        let u2 = self.next_uniform();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }
}
