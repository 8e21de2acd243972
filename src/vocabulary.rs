//! Bilingual (en/es) label vocabulary shared by the format detector and the
//! locale inference. Every pattern runs against [`normalize_label`] output, so
//! accents are already folded and text is lower-case.
//!
//! [`normalize_label`]: crate::utils::normalize_label

use crate::utils::normalize_label;
use once_cell::sync::Lazy;
use regex::Regex;

/// The four structural rows a cash-flow statement is recognized by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Income,
    Expense,
    Balance,
    LowestBalance,
}

impl MetricKind {
    pub const PRIMARY: [MetricKind; 3] = [MetricKind::Income, MetricKind::Expense, MetricKind::Balance];
}

/// How strongly a label names a metric. Totals beat plain mentions so that
/// "TOTAL INGRESOS" wins over "Ventas" in the same block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchStrength {
    Mention = 1,
    Total = 2,
}

struct MetricVocabulary {
    include: Regex,
    exclude: Regex,
    strong: Regex,
}

fn vocabulary(include: &str, exclude: &str, strong: &str) -> MetricVocabulary {
    MetricVocabulary {
        include: Regex::new(include).unwrap(),
        exclude: Regex::new(exclude).unwrap(),
        strong: Regex::new(strong).unwrap(),
    }
}

static INCOME: Lazy<MetricVocabulary> = Lazy::new(|| {
    vocabulary(
        r"\b(income|incomes|revenues?|sales|inflows?|receipts|collections|ingresos?|ventas|entradas|cobros|recaudos)\b",
        r"\bnet[oa]?s?\b|\b(other|otros|otras)\b|\b(cost|costs|costo|costos|gasto|gastos|expenses?)\b|\butilidad\b|\bmargin|\bmargen",
        r"^(total|totales|suma)\b|\btotal\s+(de\s+)?(income|revenues?|sales|inflows?|ingresos|ventas|entradas|cobros)\b",
    )
});

static EXPENSE: Lazy<MetricVocabulary> = Lazy::new(|| {
    vocabulary(
        r"\b(expenses?|expenditures?|costs?|outflows?|payments|disbursements|egresos?|gastos?|salidas|pagos|costos?)\b",
        r"\bnet[oa]?s?\b|\bflujo\b|\bmargin|\bmargen|\bprofit|\butilidad",
        r"^(total|totales|suma)\b|\btotal\s+(de\s+)?(expenses?|costs|outflows?|egresos|gastos|salidas|pagos)\b",
    )
});

static BALANCE: Lazy<MetricVocabulary> = Lazy::new(|| {
    vocabulary(
        r"\b(balance|saldo|cash position|ending cash|closing cash|caja final|efectivo final|disponible)\b",
        r"\b(beginning|opening|initial|starting|inicial|apertura|anterior|lowest|minimum|minimo|minima|sheet)\b",
        r"\b(final|ending|closing|cierre|end of)\b",
    )
});

static LOWEST_BALANCE: Lazy<MetricVocabulary> = Lazy::new(|| {
    vocabulary(
        r"\b(lowest|minimum|minimo|minima)\b.*\b(balance|saldo|cash|caja)\b|\b(balance|saldo|cash|caja)\b.*\b(lowest|minimum|minimo|minima)\b",
        r"^$",
        r"\b(lowest|minimo)\b",
    )
});

fn vocabulary_for(kind: MetricKind) -> &'static MetricVocabulary {
    match kind {
        MetricKind::Income => &INCOME,
        MetricKind::Expense => &EXPENSE,
        MetricKind::Balance => &BALANCE,
        MetricKind::LowestBalance => &LOWEST_BALANCE,
    }
}

/// Returns how strongly `label` names `kind`, or `None` when it does not
/// (including labels caught by the exclusion patterns).
pub fn match_metric(label: &str, kind: MetricKind) -> Option<MatchStrength> {
    let normalized = normalize_label(label);
    if normalized.is_empty() {
        return None;
    }
    let vocab = vocabulary_for(kind);
    if !vocab.include.is_match(&normalized) || vocab.exclude.is_match(&normalized) {
        return None;
    }
    if vocab.strong.is_match(&normalized) {
        Some(MatchStrength::Total)
    } else {
        Some(MatchStrength::Mention)
    }
}

pub const ENGLISH_TERMS: &[&str] = &[
    "income", "expense", "expenses", "balance", "revenue", "sales", "cost", "costs", "net",
    "cash", "profit", "margin", "operating", "beginning", "ending", "month", "payroll",
    "salaries", "rent", "taxes", "other", "flow", "gross",
];

pub const SPANISH_TERMS: &[&str] = &[
    "ingresos", "ingreso", "egresos", "egreso", "gastos", "gasto", "saldo", "ventas", "costo",
    "costos", "neto", "neta", "caja", "utilidad", "margen", "flujo", "inicial", "mes",
    "sueldos", "impuestos", "otros", "proveedores", "cobros", "pagos", "bruta",
];

pub const PROFIT_AND_LOSS_TERMS: &[&str] = &[
    "cost of goods",
    "cogs",
    "gross profit",
    "gross margin",
    "ebitda",
    "operating income",
    "net income",
    "utilidad",
    "margen",
    "costo de ventas",
    "estado de resultados",
    "income statement",
    "p&l",
];

pub const CASH_FLOW_TERMS: &[&str] = &[
    "cash flow",
    "cashflow",
    "beginning balance",
    "ending balance",
    "final balance",
    "flujo",
    "saldo",
    "cobros",
    "pagos",
    "egresos",
    "lowest balance",
];

pub const THOUSANDS_MARKERS: &[&str] = &["in thousands", "(000)", "'000", "en miles", "miles de"];
pub const MILLIONS_MARKERS: &[&str] = &["in millions", "en millones", "millones de", "(mm)"];
