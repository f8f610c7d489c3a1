//! Calculation service result and the comparison metrics derived from it.
//!
//! Field names on the wire are the calculation service's (Spanish); the
//! Rust names describe the same values in English.

use serde::{Deserialize, Serialize};

use crate::format::{format_clp, format_percent, format_signed_percent};

/// Breakdown of the individual account balance at retirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBalance {
    #[serde(rename = "saldo_cuenta_individual")]
    pub individual_account: f64,
    #[serde(rename = "aporte_trabajador")]
    pub worker_contribution: f64,
    #[serde(rename = "aporte_empleador")]
    pub employer_contribution: f64,
    #[serde(rename = "rentabilidad_acumulada")]
    pub accumulated_return: f64,
}

/// Projection under the rules before the pension reform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreReform {
    #[serde(rename = "saldo_acumulado")]
    pub balance: AccountBalance,
    #[serde(rename = "aporte_sis")]
    pub sis_contribution: f64,
    #[serde(rename = "pension_mensual_base")]
    pub base_monthly_pension: f64,
    #[serde(rename = "pension_total")]
    pub total_pension: f64,
    /// Whether the universal guaranteed pension (PGU) was applied.
    #[serde(rename = "pgu_aplicada")]
    pub pgu_applied: bool,
}

/// Projection under the reformed rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostReform {
    #[serde(rename = "saldo_acumulado")]
    pub balance: AccountBalance,
    #[serde(rename = "aporte_sis")]
    pub sis_contribution: f64,
    #[serde(rename = "aporte_compensacion_expectativa_vida", default)]
    pub life_expectancy_compensation: f64,
    #[serde(rename = "balance_fapp", default)]
    pub fapp_balance: f64,
    #[serde(rename = "bono_seguridad_previsional", default)]
    pub social_security_bonus: f64,
    #[serde(rename = "pension_mensual_base")]
    pub base_monthly_pension: f64,
    #[serde(rename = "pension_adicional_compensacion", default)]
    pub additional_compensation_pension: f64,
    #[serde(rename = "pension_total")]
    pub total_pension: f64,
    #[serde(rename = "pgu_aplicada")]
    pub pgu_applied: bool,
}

/// The user's ideal pension projected to the retirement date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetPension {
    #[serde(rename = "valor_presente")]
    pub present_value: f64,
    #[serde(rename = "valor_futuro")]
    pub future_value: f64,
    #[serde(rename = "tasa_inflacion_anual")]
    pub annual_inflation_rate: f64,
    /// Monthly shortfall of the post-reform pension against the target.
    #[serde(rename = "brecha_mensual_post_reforma")]
    pub monthly_gap_post_reform: f64,
}

/// Echo of the inputs the calculation was run with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMetadata {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "edad")]
    pub age: f64,
    #[serde(rename = "genero")]
    pub gender: String,
    #[serde(rename = "edad_jubilacion")]
    pub retirement_age: f64,
    #[serde(rename = "balance_actual")]
    pub current_balance: f64,
    #[serde(rename = "salario_mensual")]
    pub monthly_salary: f64,
    #[serde(rename = "estudios")]
    pub education: String,
    #[serde(rename = "expectativa_vida")]
    pub life_expectancy: f64,
}

/// Pre-/post-reform comparison returned by the calculation service.
///
/// Immutable once received. A new calculation replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult {
    #[serde(rename = "pre_reforma")]
    pub pre_reform: PreReform,
    #[serde(rename = "post_reforma")]
    pub post_reform: PostReform,
    #[serde(rename = "pension_objetivo")]
    pub target: TargetPension,
    pub metadata: ResultMetadata,
}

// ---------------------------------------------------------------------------
// Derived comparison
// ---------------------------------------------------------------------------

/// Figures the results screen shows next to the two projections.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub pre_total: f64,
    pub post_total: f64,
    /// `post_total - pre_total`.
    pub difference: f64,
    /// `difference / pre_total`; `None` when there is no pre-reform pension.
    pub relative_change: Option<f64>,
    pub ideal_present: f64,
    pub ideal_future: f64,
    pub monthly_gap: f64,
    pub annual_inflation_rate: f64,
}

impl Comparison {
    pub fn from_result(result: &CalculationResult) -> Self {
        let pre_total = result.pre_reform.total_pension;
        let post_total = result.post_reform.total_pension;
        let difference = post_total - pre_total;
        let relative_change = (pre_total != 0.0).then(|| difference / pre_total);
        Self {
            pre_total,
            post_total,
            difference,
            relative_change,
            ideal_present: result.target.present_value,
            ideal_future: result.target.future_value,
            monthly_gap: result.target.monthly_gap_post_reform,
            annual_inflation_rate: result.target.annual_inflation_rate,
        }
    }

    /// Whether the reform improves the projected pension.
    pub fn improves(&self) -> bool {
        self.difference > 0.0
    }

    /// Plain-text rendering used by the terminal front-end.
    pub fn render_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Sin Reforma - Pensión Total: {}", format_clp(self.pre_total)),
            format!("Con Reforma - Pensión Total: {}", format_clp(self.post_total)),
            format!("Diferencia en Pensión: {}", format_clp(self.difference)),
        ];
        if let Some(change) = self.relative_change {
            lines.push(format!("Mejora Porcentual: {}", format_signed_percent(change)));
        }
        lines.push(format!("Pensión Ideal Actual: {}", format_clp(self.ideal_present)));
        lines.push(format!(
            "Pensión Ideal Futura: {} (inflación anual {})",
            format_clp(self.ideal_future),
            format_percent(self.annual_inflation_rate)
        ));
        lines.push(format!("Brecha Mensual: {}", format_clp(self.monthly_gap)));
        lines
    }
}
