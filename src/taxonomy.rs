use crate::error::{Result, SheetIntakeError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inflow,
    Outflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MainCategory {
    #[schemars(description = "Sales of goods or services")]
    Revenue,
    #[schemars(description = "Direct costs of the goods or services sold")]
    Cogs,
    #[schemars(description = "Salaries, rent, marketing, administration and other running costs")]
    OperatingExpenses,
    #[schemars(description = "Interest earned, investment gains and other non-operating inflows")]
    OtherIncome,
    #[schemars(description = "Interest paid, bank fees and other non-operating outflows")]
    OtherExpenses,
    #[schemars(description = "Income, sales and payroll taxes")]
    Taxes,
    #[schemars(description = "A total or subtotal row")]
    Total,
    #[schemars(description = "A margin or percentage row")]
    Margin,
    #[schemars(description = "A derived figure such as EBITDA or net profit")]
    Calculation,
    #[schemars(description = "Anything that does not fit elsewhere")]
    Other,
}

impl MainCategory {
    pub const ALL: [MainCategory; 10] = [
        MainCategory::Revenue,
        MainCategory::Cogs,
        MainCategory::OperatingExpenses,
        MainCategory::OtherIncome,
        MainCategory::OtherExpenses,
        MainCategory::Taxes,
        MainCategory::Total,
        MainCategory::Margin,
        MainCategory::Calculation,
        MainCategory::Other,
    ];

    /// Fixed direction tag. Structural categories (total, margin,
    /// calculation) are tagged inflow; `other` is tagged outflow.
    pub fn direction(&self) -> Direction {
        match self {
            MainCategory::Revenue
            | MainCategory::OtherIncome
            | MainCategory::Total
            | MainCategory::Margin
            | MainCategory::Calculation => Direction::Inflow,
            MainCategory::Cogs
            | MainCategory::OperatingExpenses
            | MainCategory::OtherExpenses
            | MainCategory::Taxes
            | MainCategory::Other => Direction::Outflow,
        }
    }

    pub fn is_inflow(&self) -> bool {
        self.direction() == Direction::Inflow
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MainCategory::Revenue => "revenue",
            MainCategory::Cogs => "cogs",
            MainCategory::OperatingExpenses => "operating_expenses",
            MainCategory::OtherIncome => "other_income",
            MainCategory::OtherExpenses => "other_expenses",
            MainCategory::Taxes => "taxes",
            MainCategory::Total => "total",
            MainCategory::Margin => "margin",
            MainCategory::Calculation => "calculation",
            MainCategory::Other => "other",
        }
    }
}

impl fmt::Display for MainCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MainCategory {
    type Err = SheetIntakeError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        MainCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| SheetIntakeError::ClassificationFailed(format!("Unknown category '{}'", s)))
    }
}

/// Where a subcategory is visible.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum SubcategoryScope {
    BuiltIn,
    Organization(String),
    CompanyTemplate(String),
}

impl fmt::Display for SubcategoryScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubcategoryScope::BuiltIn => f.write_str("built-in"),
            SubcategoryScope::Organization(id) => write!(f, "organization {}", id),
            SubcategoryScope::CompanyTemplate(id) => write!(f, "template {}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Subcategory {
    pub code: String,
    pub label_en: String,
    pub label_es: String,
    pub direction: Direction,
    pub scope: SubcategoryScope,
}

/// The caller's position: which organization and which company template the
/// custom entries must belong to in order to be visible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeFilter {
    pub organization_id: Option<String>,
    pub template_id: Option<String>,
}

impl ScopeFilter {
    fn admits(&self, scope: &SubcategoryScope) -> bool {
        match scope {
            SubcategoryScope::BuiltIn => true,
            SubcategoryScope::Organization(id) => self.organization_id.as_deref() == Some(id),
            SubcategoryScope::CompanyTemplate(id) => self.template_id.as_deref() == Some(id),
        }
    }
}

const INFLOW_SUBCATEGORIES: &[(&str, &str, &str)] = &[
    ("product_sales", "Product sales", "Venta de productos"),
    ("service_revenue", "Service revenue", "Ingresos por servicios"),
    ("recurring_revenue", "Recurring revenue", "Ingresos recurrentes"),
    ("collections", "Customer collections", "Cobranza a clientes"),
    ("interest_income", "Interest income", "Intereses ganados"),
    ("investment_income", "Investment income", "Rendimientos de inversiones"),
    ("financing_inflow", "Loans and capital contributions", "Préstamos y aportes de capital"),
    ("asset_sales", "Asset sales", "Venta de activos"),
    ("other_income", "Other income", "Otros ingresos"),
    ("miscellaneous", "Miscellaneous", "Varios"),
];

const OUTFLOW_SUBCATEGORIES: &[(&str, &str, &str)] = &[
    ("cost_of_sales", "Cost of sales", "Costo de ventas"),
    ("suppliers", "Suppliers", "Proveedores"),
    ("raw_materials", "Raw materials", "Materia prima"),
    ("direct_labor", "Direct labor", "Mano de obra directa"),
    ("salaries", "Salaries and wages", "Sueldos y salarios"),
    ("payroll_taxes", "Payroll taxes and benefits", "Cargas sociales"),
    ("rent", "Rent", "Alquiler"),
    ("utilities", "Utilities", "Servicios públicos"),
    ("marketing", "Sales and marketing", "Marketing y publicidad"),
    ("general_administrative", "General and administrative", "Gastos de administración"),
    ("research_development", "Research and development", "Investigación y desarrollo"),
    ("professional_services", "Professional services", "Honorarios profesionales"),
    ("software", "Software and subscriptions", "Software y suscripciones"),
    ("travel", "Travel", "Viáticos"),
    ("depreciation", "Depreciation and amortization", "Depreciación y amortización"),
    ("interest_expense", "Interest expense", "Intereses pagados"),
    ("bank_fees", "Bank fees", "Comisiones bancarias"),
    ("income_tax", "Income tax", "Impuesto a la renta"),
    ("sales_tax", "Sales tax / VAT", "IVA"),
    ("loan_payments", "Loan payments", "Pago de préstamos"),
    ("capital_expenditure", "Capital expenditure", "Inversiones en activos"),
    ("miscellaneous", "Miscellaneous", "Varios"),
];

/// The fixed main categories plus built-in and custom subcategories.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryTaxonomy {
    custom: Vec<Subcategory>,
}

impl CategoryTaxonomy {
    pub fn new() -> Self {
        Self::default()
    }

    fn built_in(direction: Direction) -> impl Iterator<Item = Subcategory> {
        let table = match direction {
            Direction::Inflow => INFLOW_SUBCATEGORIES,
            Direction::Outflow => OUTFLOW_SUBCATEGORIES,
        };
        table.iter().map(move |(code, en, es)| Subcategory {
            code: code.to_string(),
            label_en: en.to_string(),
            label_es: es.to_string(),
            direction,
            scope: SubcategoryScope::BuiltIn,
        })
    }

    /// Subcategories for one direction that are visible to `filter`.
    pub fn subcategories(&self, direction: Direction, filter: &ScopeFilter) -> Vec<Subcategory> {
        let mut all: Vec<Subcategory> = Self::built_in(direction).collect();
        all.extend(
            self.custom
                .iter()
                .filter(|s| s.direction == direction && filter.admits(&s.scope))
                .cloned(),
        );
        all
    }

    pub fn subcategories_for(&self, category: MainCategory, filter: &ScopeFilter) -> Vec<Subcategory> {
        self.subcategories(category.direction(), filter)
    }

    pub fn contains(&self, direction: Direction, code: &str, filter: &ScopeFilter) -> bool {
        self.subcategories(direction, filter)
            .iter()
            .any(|s| s.code == code)
    }

    /// Adds a custom subcategory. Built-in entries cannot be redefined and a
    /// scope cannot hold the same code twice for one direction.
    pub fn add_custom(&mut self, subcategory: Subcategory) -> Result<()> {
        if subcategory.scope == SubcategoryScope::BuiltIn {
            return Err(SheetIntakeError::InvalidConfig(
                "Custom subcategories need an organization or template scope".to_string(),
            ));
        }

        let clashes_built_in =
            Self::built_in(subcategory.direction).any(|s| s.code == subcategory.code);
        let clashes_custom = self.custom.iter().any(|s| {
            s.code == subcategory.code
                && s.direction == subcategory.direction
                && s.scope == subcategory.scope
        });

        if clashes_built_in || clashes_custom {
            return Err(SheetIntakeError::DuplicateSubcategory {
                code: subcategory.code,
                scope: subcategory.scope.to_string(),
            });
        }

        self.custom.push(subcategory);
        Ok(())
    }

    pub fn custom_entries(&self) -> &[Subcategory] {
        &self.custom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom(code: &str, scope: SubcategoryScope) -> Subcategory {
        Subcategory {
            code: code.to_string(),
            label_en: code.to_string(),
            label_es: code.to_string(),
            direction: Direction::Outflow,
            scope,
        }
    }

    #[test]
    fn test_direction_tags() {
        assert!(MainCategory::Revenue.is_inflow());
        assert!(MainCategory::OtherIncome.is_inflow());
        assert!(!MainCategory::Cogs.is_inflow());
        assert!(!MainCategory::Taxes.is_inflow());
        assert_eq!("operating_expenses".parse::<MainCategory>().unwrap(), MainCategory::OperatingExpenses);
        assert!("uncategorized".parse::<MainCategory>().is_err());
    }

    #[test]
    fn test_subcategories_are_partitioned_by_direction() {
        let taxonomy = CategoryTaxonomy::new();
        let filter = ScopeFilter::default();
        assert!(taxonomy.contains(Direction::Outflow, "salaries", &filter));
        assert!(!taxonomy.contains(Direction::Inflow, "salaries", &filter));
        assert!(taxonomy.contains(Direction::Inflow, "product_sales", &filter));
    }

    #[test]
    fn test_custom_entries_are_scope_bound() {
        let mut taxonomy = CategoryTaxonomy::new();
        taxonomy
            .add_custom(custom("franchise_fees", SubcategoryScope::Organization("org-1".into())))
            .unwrap();

        let own = ScopeFilter {
            organization_id: Some("org-1".into()),
            template_id: None,
        };
        let other = ScopeFilter {
            organization_id: Some("org-2".into()),
            template_id: None,
        };
        assert!(taxonomy.contains(Direction::Outflow, "franchise_fees", &own));
        assert!(!taxonomy.contains(Direction::Outflow, "franchise_fees", &other));
    }

    #[test]
    fn test_duplicate_custom_entries_rejected() {
        let mut taxonomy = CategoryTaxonomy::new();
        let scope = SubcategoryScope::CompanyTemplate("tpl-9".into());
        taxonomy.add_custom(custom("royalties", scope.clone())).unwrap();
        assert!(matches!(
            taxonomy.add_custom(custom("royalties", scope)),
            Err(SheetIntakeError::DuplicateSubcategory { .. })
        ));
        assert!(taxonomy
            .add_custom(custom("rent", SubcategoryScope::Organization("org-1".into())))
            .is_err());
        assert!(taxonomy.add_custom(custom("x", SubcategoryScope::BuiltIn)).is_err());
    }
}
