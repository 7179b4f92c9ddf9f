use serde::Serialize;

#[derive(Debug, Clone, Copy)]
pub struct Scenario {
    pub projection_years: u32,
    pub inflation_rate_pct: f64,
    pub real_equity_return_pct: f64,
    pub real_bond_return_pct: f64,
    pub real_cash_return_pct: f64,
    pub risk_score: u8,
    pub initial_wealth: f64,
    pub withdrawal_rate: f64,
}

impl Scenario {
    /// Baseline planning assumptions applied when a request does not carry
    /// its own scenario economics.
    pub fn default_assumptions() -> Self {
        Self {
            projection_years: 30,
            inflation_rate_pct: 2.5,
            real_equity_return_pct: 5.0,
            real_bond_return_pct: 2.0,
            real_cash_return_pct: 0.5,
            risk_score: 5,
            initial_wealth: 500_000.0,
            withdrawal_rate: 0.04,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegimeKind {
    Normal,
    Bull,
    Bear,
}

#[derive(Debug, Clone, Copy)]
pub struct Regime {
    pub kind: RegimeKind,
    pub probability: f64,
    pub return_multiplier: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct RunOutcome {
    pub final_wealth: f64,
    pub success: bool,
    pub depletion_year: Option<u32>,
    pub shortfall: f64,
    pub min_wealth: f64,
    pub max_wealth: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ConfidenceIntervals {
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateResult {
    pub success_probability: f64,
    pub average_final_wealth: f64,
    pub median_final_wealth: f64,
    pub confidence_intervals: ConfidenceIntervals,
    pub shortfall_risk: f64,
    pub average_shortfall_amount: f64,
    pub years_to_depletion_p50: f64,
    pub wealth_volatility: f64,
    pub maximum_drawdown: f64,
    pub simulation_duration_ms: u64,
}
