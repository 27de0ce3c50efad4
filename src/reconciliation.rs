//! Closing reconciliation for a cash register session.
//!
//! expected    = opening + sales
//! discrepancy = closing - expected
//!
//! A close is balanced when the discrepancy is within [`BALANCE_EPSILON`].
//! Amounts arrive as binary floats and sums of them never land exactly on
//! whole cents, so exact equality is never used.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::fields::{as_number, FieldMap};

pub const BALANCE_EPSILON: f64 = 0.01;

pub(crate) const SUMMARY_FIELDS: FieldMap = FieldMap::new(&[
    ("sessionId", &["cajaId", "CajaId", "id", "Id", "sessionId"]),
    ("openedAt", &["fecha", "Fecha", "fechaApertura", "FechaApertura", "openedAt"]),
    ("operatorName", &["empleadoNombre", "EmpleadoNombre"]),
    ("opening", &["saldoInicial", "SaldoInicial", "openingBalance", "OpeningBalance"]),
    ("sales", &["totalVentas", "TotalVentas", "totalSales", "TotalSales"]),
    ("closing", &["saldoFinal", "SaldoFinal", "closingBalance", "ClosingBalance"]),
    ("saleCount", &["cantidadVentas", "CantidadVentas", "saleCount", "SaleCount"]),
    (
        "byMethod",
        &["ventasPorMetodoPago", "VentasPorMetodoPago", "salesByPaymentMethod"],
    ),
]);

// ---------------------------------------------------------------------------
// Calculator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reconciliation {
    pub opening: f64,
    pub sales: f64,
    pub closing: f64,
    pub expected: f64,
    pub discrepancy: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    Balanced,
    /// Signed: negative means the drawer is short.
    Discrepant(f64),
}

impl Reconciliation {
    pub fn from_amounts(opening: f64, sales: f64, closing: f64) -> Self {
        let expected = opening + sales;
        Self {
            opening,
            sales,
            closing,
            expected,
            discrepancy: closing - expected,
        }
    }

    pub fn is_balanced(&self) -> bool {
        self.discrepancy.abs() < BALANCE_EPSILON
    }

    pub fn verdict(&self) -> Verdict {
        if self.is_balanced() {
            Verdict::Balanced
        } else {
            Verdict::Discrepant(self.discrepancy)
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Balanced => f.write_str("Balance OK"),
            Verdict::Discrepant(diff) => write!(f, "Difference {}", format_currency(*diff)),
        }
    }
}

/// Reconcile any summary-shaped JSON, whichever casing the backend used.
/// Missing amounts count as zero.
pub fn compute_reconciliation(summary: &Value) -> Reconciliation {
    Reconciliation::from_amounts(
        SUMMARY_FIELDS.amount(summary, "opening"),
        SUMMARY_FIELDS.amount(summary, "sales"),
        SUMMARY_FIELDS.amount(summary, "closing"),
    )
}

// ---------------------------------------------------------------------------
// Closing summary
// ---------------------------------------------------------------------------

/// Backend report of a closed session. Derived and non-authoritative.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosingSummary {
    pub session_id: Option<String>,
    pub opened_at: Option<String>,
    pub operator_name: Option<String>,
    pub opening_balance: f64,
    pub total_sales: f64,
    pub closing_balance: f64,
    pub sale_count: u64,
    pub sales_by_payment_method: BTreeMap<String, f64>,
}

impl ClosingSummary {
    pub fn from_value(v: &Value) -> Self {
        let sales_by_payment_method = SUMMARY_FIELDS
            .object(v, "byMethod")
            .map(|methods| {
                methods
                    .iter()
                    .map(|(name, amount)| (name.clone(), as_number(amount).unwrap_or(0.0)))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            session_id: SUMMARY_FIELDS.text(v, "sessionId"),
            opened_at: SUMMARY_FIELDS.text(v, "openedAt"),
            operator_name: SUMMARY_FIELDS.text(v, "operatorName"),
            opening_balance: SUMMARY_FIELDS.amount(v, "opening"),
            total_sales: SUMMARY_FIELDS.amount(v, "sales"),
            closing_balance: SUMMARY_FIELDS.amount(v, "closing"),
            sale_count: SUMMARY_FIELDS
                .integer(v, "saleCount")
                .and_then(|n| u64::try_from(n).ok())
                .unwrap_or(0),
            sales_by_payment_method,
        }
    }

    pub fn reconciliation(&self) -> Reconciliation {
        Reconciliation::from_amounts(self.opening_balance, self.total_sales, self.closing_balance)
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

/// Format an amount in the single display currency (EUR, `es-ES` style):
/// `1234,50 €`, `12.345,00 €`, `-50,00 €`.
pub fn format_currency(amount: f64) -> String {
    let cents = (amount * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    let whole = (cents / 100).to_string();
    let fraction = cents % 100;

    // es-ES only groups thousands from five integer digits up.
    let grouped = if whole.len() >= 5 {
        let mut out = String::with_capacity(whole.len() + whole.len() / 3);
        for (i, ch) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                out.push('.');
            }
            out.push(ch);
        }
        out
    } else {
        whole
    };

    format!("{sign}{grouped},{fraction:02} €")
}
