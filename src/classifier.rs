//! Line-item classification.
//!
//! The primary path is an ordered keyword table: the first rule whose keyword
//! appears (as whole words) in the normalized label wins. Derived figures are
//! detected separately and always override the table, since margins and
//! profit lines must never be summed into detail totals. When nothing matches,
//! the category of the enclosing section header is used, and failing that the
//! `other / miscellaneous` fallback.

use crate::taxonomy::{CategoryTaxonomy, MainCategory, ScopeFilter};
use crate::utils::normalize_label;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const CANONICAL_CONFIDENCE: f64 = 0.95;
pub const CALCULATED_CONFIDENCE: f64 = 0.9;
pub const ADJUSTMENT_CONFIDENCE: f64 = 0.6;
pub const SECTION_CONTEXT_CONFIDENCE: f64 = 0.5;
pub const FALLBACK_CONFIDENCE: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    Rules,
    External,
    SectionContext,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub category: MainCategory,
    pub subcategory: Option<String>,
    pub is_inflow: bool,
    pub confidence: f64,
    pub source: ClassificationSource,
}

impl Classification {
    fn new(
        category: MainCategory,
        subcategory: Option<&str>,
        confidence: f64,
        source: ClassificationSource,
    ) -> Self {
        Self {
            category,
            subcategory: subcategory.map(str::to_string),
            is_inflow: category.is_inflow(),
            confidence,
            source,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == ClassificationSource::Fallback
    }
}

/// What the classifier knows about the surrounding rows.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClassificationContext {
    /// Category of the most recent section header, if it had one.
    pub section: Option<MainCategory>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TotalKind {
    Total,
    Subtotal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeywordRule {
    pub keywords: Vec<String>,
    pub category: MainCategory,
    pub subcategory: String,
    pub confidence: f64,
}

impl KeywordRule {
    pub fn new(keywords: &[&str], category: MainCategory, subcategory: &str, confidence: f64) -> Self {
        Self {
            keywords: keywords.iter().map(|k| tokenize(k)).collect(),
            category,
            subcategory: subcategory.to_string(),
            confidence,
        }
    }

    fn matches(&self, padded: &str) -> bool {
        self.keywords
            .iter()
            .any(|k| padded.contains(&format!(" {} ", k)))
    }
}

type RuleRow = (&'static [&'static str], MainCategory, &'static str, f64);

const BUILT_IN_RULES: &[RuleRow] = &[
    // Taxes
    (&["income tax", "impuesto a la renta", "impuesto sobre la renta", "isr"], MainCategory::Taxes, "income_tax", 0.9),
    (&["sales tax", "vat", "iva", "impuesto al valor agregado"], MainCategory::Taxes, "sales_tax", 0.9),
    (&["payroll tax", "payroll taxes", "cargas sociales", "seguridad social", "aportes patronales", "imss"], MainCategory::Taxes, "payroll_taxes", 0.85),
    (&["tax", "taxes", "impuesto", "impuestos"], MainCategory::Taxes, "income_tax", 0.75),
    // Cost of goods sold
    (&["cost of goods sold", "cost of sales", "cost of revenue", "cogs", "costo de ventas", "costo de lo vendido", "costos de ventas"], MainCategory::Cogs, "cost_of_sales", 0.9),
    (&["raw material", "raw materials", "materia prima", "materiales", "inventory purchases", "compras"], MainCategory::Cogs, "raw_materials", 0.85),
    (&["suppliers", "supplier payments", "vendors", "proveedores"], MainCategory::Cogs, "suppliers", 0.85),
    (&["direct labor", "direct labour", "mano de obra"], MainCategory::Cogs, "direct_labor", 0.85),
    // Operating expenses
    (&["salaries", "salary", "wages", "payroll", "sueldos", "salarios", "nomina", "remuneraciones"], MainCategory::OperatingExpenses, "salaries", 0.9),
    (&["rent", "lease", "alquiler", "alquileres", "arriendo", "arrendamiento", "renta"], MainCategory::OperatingExpenses, "rent", 0.85),
    (&["utilities", "electricity", "water", "telephone", "internet", "servicios publicos", "luz", "agua", "telefono", "energia"], MainCategory::OperatingExpenses, "utilities", 0.85),
    (&["marketing", "advertising", "publicidad", "mercadeo", "sales expense", "selling expenses", "gastos de venta", "comisiones de venta"], MainCategory::OperatingExpenses, "marketing", 0.85),
    (&["software", "subscriptions", "licenses", "licencias", "suscripciones"], MainCategory::OperatingExpenses, "software", 0.8),
    (&["travel", "viaticos", "viajes", "pasajes"], MainCategory::OperatingExpenses, "travel", 0.8),
    (&["professional fees", "professional services", "legal", "accounting", "consulting fees", "honorarios", "asesoria", "consultoria", "contabilidad"], MainCategory::OperatingExpenses, "professional_services", 0.8),
    (&["research and development", "r d", "r and d", "investigacion y desarrollo", "i d"], MainCategory::OperatingExpenses, "research_development", 0.8),
    (&["loan payment", "loan payments", "loan repayment", "pago de prestamo", "pago de prestamos", "amortizacion de prestamo", "amortizacion de deuda"], MainCategory::OtherExpenses, "loan_payments", 0.85),
    (&["depreciation", "amortization", "depreciacion", "amortizacion"], MainCategory::OperatingExpenses, "depreciation", 0.85),
    (&["general and administrative", "g a", "g and a", "administrative", "administracion", "administrativos", "office", "oficina", "gastos generales"], MainCategory::OperatingExpenses, "general_administrative", 0.75),
    // Other expenses
    (&["interest expense", "interest paid", "intereses pagados", "gastos financieros", "financial expenses"], MainCategory::OtherExpenses, "interest_expense", 0.85),
    (&["bank fees", "bank charges", "comisiones bancarias", "gastos bancarios"], MainCategory::OtherExpenses, "bank_fees", 0.85),
    (&["capex", "capital expenditure", "capital expenditures", "equipment purchase", "compra de activos", "inversiones en activos", "compra de equipo"], MainCategory::OtherExpenses, "capital_expenditure", 0.8),
    (&["other expenses", "otros gastos", "otros egresos", "non operating expenses"], MainCategory::OtherExpenses, "miscellaneous", 0.75),
    // Other income, ahead of the plain income family
    (&["interest income", "interest earned", "intereses ganados", "intereses cobrados", "rendimientos"], MainCategory::OtherIncome, "interest_income", 0.85),
    (&["investment income", "dividends", "dividendos"], MainCategory::OtherIncome, "investment_income", 0.8),
    (&["loan proceeds", "prestamo recibido", "prestamos recibidos", "capital contribution", "aporte de capital", "aportes de socios", "financing", "financiamiento"], MainCategory::OtherIncome, "financing_inflow", 0.8),
    (&["asset sale", "asset sales", "venta de activos"], MainCategory::OtherIncome, "asset_sales", 0.8),
    (&["other income", "otros ingresos", "non operating income"], MainCategory::OtherIncome, "other_income", 0.8),
    // Revenue
    (&["recurring revenue", "subscription revenue", "ingresos recurrentes", "mrr", "arr"], MainCategory::Revenue, "recurring_revenue", 0.85),
    (&["service revenue", "services revenue", "consulting revenue", "ingresos por servicios", "servicios prestados"], MainCategory::Revenue, "service_revenue", 0.85),
    (&["collections", "receipts", "cobros", "cobranza", "cobranzas", "recaudos"], MainCategory::Revenue, "collections", 0.8),
    (&["sales", "revenue", "revenues", "income", "ventas", "venta", "ingresos", "ingreso", "facturacion"], MainCategory::Revenue, "product_sales", 0.8),
    // Generic expense family
    (&["expense", "expenses", "cost", "costs", "payments", "gasto", "gastos", "egreso", "egresos", "costo", "costos", "pagos"], MainCategory::OperatingExpenses, "general_administrative", 0.6),
];

const ADJUSTMENT_KEYWORDS: &[&str] = &[
    "adjustment",
    "adjustments",
    "transfer",
    "transfers",
    "reclassification",
    "ajuste",
    "ajustes",
    "transferencia",
    "transferencias",
    "traspaso",
    "traspasos",
    "reclasificacion",
];

static CALCULATED_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(margin|margen|ebitda|ebit|gross profit|operating profit|net profit|net loss|net income|net cash flow|utilidad (bruta|operativa|operacional|neta|antes)|perdida neta|flujo neto|resultado (neto|operativo|bruto)|percent|porcentaje)\b|%",
    )
    .unwrap()
});

static MARGIN_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(margin|margen|percent|porcentaje)\b|%").unwrap());

/// Lower-cased, accent-folded words separated by single spaces. A spaced
/// ampersand reads as "and".
fn tokenize(label: &str) -> String {
    normalize_label(label)
        .replace(" & ", " and ")
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn padded(label: &str) -> String {
    format!(" {} ", tokenize(label))
}

/// True for margins, profit lines and other derived figures.
pub fn is_calculated_field(name: &str) -> bool {
    if CALCULATED_FIELD.is_match(&normalize_label(name)) {
        return true;
    }
    let words = padded(name);
    words.contains(" operating income ") && !words.contains(" non operating ")
}

/// Category a calculated field is forced into.
pub fn calculated_category(name: &str) -> MainCategory {
    if MARGIN_FIELD.is_match(&normalize_label(name)) {
        MainCategory::Margin
    } else {
        MainCategory::Calculation
    }
}

/// Keyword-based total detection: "subtotal"/"sub-total" prefixes mark a
/// subtotal, "total"/"totales"/"suma" prefixes a total.
pub fn detect_total(name: &str) -> Option<TotalKind> {
    let tokens = tokenize(name);
    let mut words = tokens.split(' ');
    match (words.next(), words.next()) {
        (Some("subtotal"), _) | (Some("subtotales"), _) | (Some("sub"), Some("total")) => {
            Some(TotalKind::Subtotal)
        }
        (Some("total"), _) | (Some("totales"), _) | (Some("suma"), _) => Some(TotalKind::Total),
        _ => None,
    }
}

fn default_subcategory(category: MainCategory) -> Option<&'static str> {
    match category {
        MainCategory::Revenue => Some("product_sales"),
        MainCategory::Cogs => Some("cost_of_sales"),
        MainCategory::OperatingExpenses => Some("general_administrative"),
        MainCategory::OtherIncome => Some("other_income"),
        MainCategory::OtherExpenses | MainCategory::Other => Some("miscellaneous"),
        MainCategory::Taxes => Some("income_tax"),
        MainCategory::Total | MainCategory::Margin | MainCategory::Calculation => None,
    }
}

fn is_structural(category: MainCategory) -> bool {
    matches!(
        category,
        MainCategory::Total | MainCategory::Margin | MainCategory::Calculation
    )
}

/// Rule-table classifier. Holds its rules by value; callers may prepend their
/// own with [`AccountClassifier::with_rule`].
#[derive(Debug, Clone)]
pub struct AccountClassifier {
    rules: Vec<KeywordRule>,
}

impl Default for AccountClassifier {
    fn default() -> Self {
        let rules = BUILT_IN_RULES
            .iter()
            .map(|(keywords, category, sub, confidence)| {
                KeywordRule::new(keywords, *category, sub, *confidence)
            })
            .collect();
        Self { rules }
    }
}

impl AccountClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule that is checked before the built-in table.
    pub fn with_rule(mut self, rule: KeywordRule) -> Self {
        self.rules.insert(0, rule);
        self
    }

    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }

    pub fn classify(
        &self,
        account_name: &str,
        sample_value: Option<f64>,
        context: &ClassificationContext,
    ) -> Classification {
        if is_calculated_field(account_name) {
            return Classification::new(
                calculated_category(account_name),
                None,
                CALCULATED_CONFIDENCE,
                ClassificationSource::Rules,
            );
        }

        let words = padded(account_name);

        if let Some(category) = MainCategory::ALL
            .into_iter()
            .filter(|c| !is_structural(*c))
            .find(|c| words.trim() == c.as_str().replace('_', " "))
        {
            return Classification::new(
                category,
                default_subcategory(category),
                CANONICAL_CONFIDENCE,
                ClassificationSource::Rules,
            );
        }

        if ADJUSTMENT_KEYWORDS
            .iter()
            .any(|k| words.contains(&format!(" {} ", k)))
        {
            let (category, sub) = match sample_value {
                Some(v) if v > 0.0 => (MainCategory::OtherIncome, "other_income"),
                _ => (MainCategory::OtherExpenses, "miscellaneous"),
            };
            return Classification::new(category, Some(sub), ADJUSTMENT_CONFIDENCE, ClassificationSource::Rules);
        }

        if let Some(rule) = self.rules.iter().find(|r| r.matches(&words)) {
            return Classification::new(
                rule.category,
                Some(rule.subcategory.as_str()),
                rule.confidence,
                ClassificationSource::Rules,
            );
        }

        if let Some(section) = context.section.filter(|c| !is_structural(*c)) {
            debug!("'{}' classified from section context {}", account_name, section);
            return Classification::new(
                section,
                Some("miscellaneous"),
                SECTION_CONTEXT_CONFIDENCE,
                ClassificationSource::SectionContext,
            );
        }

        Classification::new(
            MainCategory::Other,
            Some("miscellaneous"),
            FALLBACK_CONFIDENCE,
            ClassificationSource::Fallback,
        )
    }
}

/// A classification proposed by an external service for the row at `index`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExternalSuggestion {
    #[schemars(description = "Zero-based position of the account in the request list.")]
    pub index: usize,
    pub category: MainCategory,
    #[schemars(description = "Subcategory code from the allowed list for the category's direction.")]
    pub subcategory: Option<String>,
    #[schemars(description = "Confidence between 0 and 1.")]
    pub confidence: f64,
}

/// Folds external suggestions into the local results. A suggestion only
/// replaces a fallback or a less confident local result, and never a derived
/// figure. Unknown subcategories are replaced by the category default.
/// Returns how many entries were replaced.
pub fn merge_suggestions(
    local: &mut [Classification],
    suggestions: &[ExternalSuggestion],
    taxonomy: &CategoryTaxonomy,
    filter: &ScopeFilter,
) -> usize {
    let mut replaced = 0;

    for suggestion in suggestions {
        let Some(current) = local.get_mut(suggestion.index) else {
            debug!("Ignoring suggestion for unknown index {}", suggestion.index);
            continue;
        };
        if is_structural(current.category) || is_structural(suggestion.category) {
            continue;
        }

        let confidence = suggestion.confidence.clamp(0.0, 1.0);
        if !current.is_fallback() && confidence <= current.confidence {
            continue;
        }

        let direction = suggestion.category.direction();
        let subcategory = suggestion
            .subcategory
            .as_deref()
            .filter(|code| taxonomy.contains(direction, code, filter))
            .or_else(|| default_subcategory(suggestion.category));

        *current = Classification::new(
            suggestion.category,
            subcategory,
            confidence,
            ClassificationSource::External,
        );
        replaced += 1;
    }

    replaced
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(name: &str) -> Classification {
        AccountClassifier::new().classify(name, Some(100.0), &ClassificationContext::default())
    }

    #[test]
    fn test_bilingual_keyword_families() {
        let sales = classify("Ventas Productos");
        assert_eq!(sales.category, MainCategory::Revenue);
        assert_eq!(sales.subcategory.as_deref(), Some("product_sales"));
        assert!(sales.is_inflow);

        let salaries = classify("Sueldos y Salarios");
        assert_eq!(salaries.category, MainCategory::OperatingExpenses);
        assert_eq!(salaries.subcategory.as_deref(), Some("salaries"));
        assert!(!salaries.is_inflow);

        assert_eq!(classify("Costo de Ventas").category, MainCategory::Cogs);
        assert_eq!(classify("Marketing & Advertising").subcategory.as_deref(), Some("marketing"));
        assert_eq!(classify("Alquiler de Oficina").subcategory.as_deref(), Some("rent"));
        assert_eq!(classify("Honorarios Profesionales").subcategory.as_deref(), Some("professional_services"));
    }

    #[test]
    fn test_rule_order_resolves_overlaps() {
        let tax = classify("Impuesto a la Renta");
        assert_eq!(tax.category, MainCategory::Taxes);
        assert_eq!(tax.subcategory.as_deref(), Some("income_tax"));

        assert_eq!(classify("Intereses Ganados").category, MainCategory::OtherIncome);
        assert_eq!(classify("Otros Ingresos").category, MainCategory::OtherIncome);
        assert_eq!(classify("Interest Expense").category, MainCategory::OtherExpenses);
        assert_eq!(classify("Amortización de Préstamo").subcategory.as_deref(), Some("loan_payments"));
    }

    #[test]
    fn test_canonical_tokens() {
        let opex = classify("Operating Expenses");
        assert_eq!(opex.category, MainCategory::OperatingExpenses);
        assert_eq!(opex.confidence, CANONICAL_CONFIDENCE);
        assert_eq!(classify("COGS").category, MainCategory::Cogs);
    }

    #[test]
    fn test_adjustments_follow_the_sign() {
        let classifier = AccountClassifier::new();
        let ctx = ClassificationContext::default();
        assert_eq!(
            classifier.classify("Ajuste de inventario", Some(500.0), &ctx).category,
            MainCategory::OtherIncome
        );
        assert_eq!(
            classifier.classify("Ajuste de inventario", Some(-500.0), &ctx).category,
            MainCategory::OtherExpenses
        );
    }

    #[test]
    fn test_section_context_and_fallback() {
        let classifier = AccountClassifier::new();
        let fallback = classifier.classify("Xyzzy", None, &ClassificationContext::default());
        assert_eq!(fallback.category, MainCategory::Other);
        assert_eq!(fallback.subcategory.as_deref(), Some("miscellaneous"));
        assert_eq!(fallback.confidence, FALLBACK_CONFIDENCE);
        assert!(fallback.is_fallback());

        let ctx = ClassificationContext {
            section: Some(MainCategory::OperatingExpenses),
        };
        let scoped = classifier.classify("Xyzzy", None, &ctx);
        assert_eq!(scoped.category, MainCategory::OperatingExpenses);
        assert_eq!(scoped.source, ClassificationSource::SectionContext);
        assert_eq!(scoped.confidence, SECTION_CONTEXT_CONFIDENCE);
    }

    #[test]
    fn test_calculated_fields_override_rules() {
        let margin = classify("Gross Margin %");
        assert_eq!(margin.category, MainCategory::Margin);
        assert_eq!(margin.subcategory, None);

        assert_eq!(classify("EBITDA").category, MainCategory::Calculation);
        assert_eq!(classify("Utilidad Neta").category, MainCategory::Calculation);
        assert_eq!(classify("Net Income").category, MainCategory::Calculation);
        assert!(!is_calculated_field("Total Income"));
    }

    #[test]
    fn test_operating_result_is_calculated() {
        let operating = classify("Operating Income");
        assert_eq!(operating.category, MainCategory::Calculation);
        assert!(is_calculated_field("Utilidad Operacional"));

        let other = classify("Non-Operating Income");
        assert_eq!(other.category, MainCategory::OtherIncome);
        assert!(!is_calculated_field("Non Operating Income"));
    }

    #[test]
    fn test_ampersand_reads_as_and() {
        let rd = classify("Research & Development");
        assert_eq!(rd.category, MainCategory::OperatingExpenses);
        assert_eq!(rd.subcategory.as_deref(), Some("research_development"));
        assert!(!rd.is_fallback());

        assert_eq!(classify("R&D").subcategory.as_deref(), Some("research_development"));
        assert_eq!(classify("R & D").subcategory.as_deref(), Some("research_development"));
        assert_eq!(
            classify("General & Administrative").subcategory.as_deref(),
            Some("general_administrative")
        );
    }

    #[test]
    fn test_total_detection() {
        assert_eq!(detect_total("TOTAL INGRESOS"), Some(TotalKind::Total));
        assert_eq!(detect_total("Subtotal Gastos"), Some(TotalKind::Subtotal));
        assert_eq!(detect_total("Sub-Total Costos"), Some(TotalKind::Subtotal));
        assert_eq!(detect_total("Suma de egresos"), Some(TotalKind::Total));
        assert_eq!(detect_total("Totalizador"), None);
        assert_eq!(detect_total("Ventas"), None);
    }

    #[test]
    fn test_custom_rules_take_precedence() {
        let classifier = AccountClassifier::new().with_rule(KeywordRule::new(
            &["regalias"],
            MainCategory::Revenue,
            "recurring_revenue",
            0.9,
        ));
        let result = classifier.classify("Regalías", None, &ClassificationContext::default());
        assert_eq!(result.subcategory.as_deref(), Some("recurring_revenue"));
    }

    #[test]
    fn test_merge_only_replaces_weaker_results() {
        let classifier = AccountClassifier::new();
        let ctx = ClassificationContext::default();
        let mut local = vec![
            classifier.classify("Xyzzy", None, &ctx),
            classifier.classify("Sueldos", None, &ctx),
            classifier.classify("EBITDA", None, &ctx),
        ];
        let suggestions = vec![
            ExternalSuggestion {
                index: 0,
                category: MainCategory::OperatingExpenses,
                subcategory: Some("not_a_code".into()),
                confidence: 0.7,
            },
            ExternalSuggestion {
                index: 1,
                category: MainCategory::Revenue,
                subcategory: None,
                confidence: 0.5,
            },
            ExternalSuggestion {
                index: 2,
                category: MainCategory::Revenue,
                subcategory: None,
                confidence: 0.99,
            },
            ExternalSuggestion {
                index: 9,
                category: MainCategory::Revenue,
                subcategory: None,
                confidence: 0.99,
            },
        ];

        let replaced = merge_suggestions(
            &mut local,
            &suggestions,
            &CategoryTaxonomy::new(),
            &ScopeFilter::default(),
        );

        assert_eq!(replaced, 1);
        assert_eq!(local[0].source, ClassificationSource::External);
        assert_eq!(local[0].subcategory.as_deref(), Some("general_administrative"));
        assert_eq!(local[1].subcategory.as_deref(), Some("salaries"));
        assert_eq!(local[2].category, MainCategory::Calculation);
    }
}
