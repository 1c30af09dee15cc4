use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::types::{Money, Rate};
use crate::EngineResult;

use super::assumptions::AssumptionDraw;
use super::engine::SimulationRequest;

/// Minimum spread required between a drawn WACC and terminal growth rate,
/// in fraction space. Anything tighter makes the Gordon growth denominator
/// numerically worthless.
pub(crate) const MIN_WACC_TERMINAL_SPREAD: f64 = 1e-6;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Fixed operating ratios baked into the projection recurrence.
///
/// These materially affect the valuation and are not universal truths, so
/// they travel with the request as named, overridable values instead of
/// literals in the formula.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConstants {
    /// Depreciation as a share of EBITDA.
    pub depreciation_of_ebitda: Rate,
    /// Marginal corporate tax rate on operating income.
    pub tax_rate: Rate,
    /// Haircut applied to the terminal-year EBITDA margin when deriving
    /// normalised terminal free cash flow.
    pub terminal_margin_haircut: Rate,
}

impl Default for ProjectionConstants {
    fn default() -> Self {
        ProjectionConstants {
            depreciation_of_ebitda: 0.15,
            tax_rate: 0.21,
            terminal_margin_haircut: 0.85,
        }
    }
}

/// Valuation outputs of a single Monte Carlo trial. Created once per trial
/// and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub enterprise_value: Money,
    /// Floored at zero: a negative valuation is reported as worthless.
    pub equity_value: Money,
    pub per_share_value: Money,
    /// Share of enterprise value contributed by the discounted terminal value.
    pub terminal_value_share: Rate,
}

impl ScenarioOutcome {
    fn is_finite(&self) -> bool {
        self.enterprise_value.is_finite()
            && self.equity_value.is_finite()
            && self.per_share_value.is_finite()
            && self.terminal_value_share.is_finite()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run one trial: draw a full assumption set and project its DCF path.
///
/// A draw where WACC fails to exceed terminal growth by at least
/// `MIN_WACC_TERMINAL_SPREAD`, or that produces any non-finite value, is a
/// failure of the whole request rather than a skippable path.
pub fn run_scenario<R: Rng + ?Sized>(
    request: &SimulationRequest,
    rng: &mut R,
) -> EngineResult<ScenarioOutcome> {
    let draw = request.assumptions.draw(rng);
    project(request, &draw)
}

/// Deterministic projection for one concrete assumption draw.
pub(crate) fn project(
    request: &SimulationRequest,
    draw: &AssumptionDraw,
) -> EngineResult<ScenarioOutcome> {
    if draw.wacc - draw.terminal_growth < MIN_WACC_TERMINAL_SPREAD {
        return Err(EngineError::FinancialImpossibility(format!(
            "Drawn WACC ({:.6}) must exceed drawn terminal growth ({:.6})",
            draw.wacc, draw.terminal_growth
        )));
    }

    let k = &request.constants;
    let mut revenue = request.base_year_revenue;
    let mut pv_fcf = 0.0_f64;
    let mut discount = 1.0_f64;

    for _ in 1..=request.forecast_years {
        let prev_revenue = revenue;
        revenue *= 1.0 + draw.revenue_growth;

        let ebitda = revenue * draw.ebitda_margin;
        let depreciation = ebitda * k.depreciation_of_ebitda;
        let ebit = ebitda - depreciation;
        let nopat = ebit * (1.0 - k.tax_rate);
        let capex = revenue * draw.capex_to_revenue;
        let nwc_change = (revenue - prev_revenue) * draw.nwc_to_revenue_delta;

        // FCF = NOPAT + D&A - CapEx - Delta NWC
        let fcf = nopat + depreciation - capex - nwc_change;
        discount /= 1.0 + draw.wacc;
        pv_fcf += fcf * discount;
    }

    // Gordon growth on normalised terminal-year cash flow
    let terminal_fcf = revenue
        * draw.ebitda_margin
        * k.terminal_margin_haircut
        * (1.0 - k.tax_rate)
        * (1.0 + draw.terminal_growth);
    let terminal_value = terminal_fcf / (draw.wacc - draw.terminal_growth);
    let pv_terminal = terminal_value * discount;

    let enterprise_value = pv_fcf + pv_terminal;
    let equity_value = (enterprise_value - request.net_debt).max(0.0);
    let per_share_value = (equity_value / request.shares_outstanding).max(0.0);
    let terminal_value_share = if enterprise_value == 0.0 {
        0.0
    } else {
        pv_terminal / enterprise_value
    };

    let outcome = ScenarioOutcome {
        enterprise_value,
        equity_value,
        per_share_value,
        terminal_value_share,
    };
    if !outcome.is_finite() {
        return Err(EngineError::FinancialImpossibility(
            "Scenario produced a non-finite valuation; check assumption spreads".into(),
        ));
    }
    Ok(outcome)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
