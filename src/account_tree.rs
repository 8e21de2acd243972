//! The editable account list.
//!
//! Despite the name this is not a nested structure: spreadsheet row order is
//! what a user recognizes, so nodes stay flat and in original order, each
//! tagged with exactly one [`NodeType`]. A section header "owns" the rows that
//! follow it up to the next header.
//!
//! Every edit returns a new tree. Edits are also plain values
//! ([`AccountEdit`]) so a session's changes can be stored and replayed.

use crate::classifier::{
    calculated_category, detect_total, is_calculated_field, AccountClassifier, Classification,
    ClassificationContext, TotalKind,
};
use crate::error::{Result, SheetIntakeError};
use crate::schema::{DetectedPattern, PeriodColumn, RawSheet};
use crate::taxonomy::MainCategory;
use crate::template::StatementTemplate;
use log::{debug, info};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A data row as read from the sheet, before classification.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementRow {
    pub row_index: usize,
    pub name: String,
    /// Period label to amount. Empty for rows without any number.
    pub values: BTreeMap<String, f64>,
    /// A number in at least one period column.
    pub has_numeric: bool,
    /// A number anywhere in the row, period column or not.
    pub has_any_numeric: bool,
}

impl StatementRow {
    /// First nonzero amount in period order, used as the sign hint.
    pub fn sample_value(&self, periods: &[PeriodColumn]) -> Option<f64> {
        periods
            .iter()
            .filter_map(|p| self.values.get(&p.label).copied())
            .find(|v| *v != 0.0)
    }
}

/// Reads every row from `start_row` on. The name comes from `label_column`,
/// or the first text cell left of the first period column when that is blank.
pub fn collect_rows(
    sheet: &RawSheet,
    label_column: usize,
    periods: &[PeriodColumn],
    start_row: usize,
) -> Vec<StatementRow> {
    let label_span = periods
        .iter()
        .map(|p| p.column_index)
        .min()
        .unwrap_or(label_column + 1)
        .max(label_column + 1);

    (start_row..sheet.row_count())
        .map(|row| {
            let name = match sheet.cell(row, label_column).as_str() {
                Some(text) => text.trim().to_string(),
                None => sheet
                    .row_label(row, label_span)
                    .map(|(_, text)| text.trim().to_string())
                    .unwrap_or_default(),
            };

            let cells: Vec<(String, Option<f64>)> = periods
                .iter()
                .map(|p| (p.label.clone(), sheet.cell(row, p.column_index).number()))
                .collect();
            let has_numeric = cells.iter().any(|(_, v)| v.is_some());
            let has_any_numeric =
                has_numeric || sheet.row(row).iter().any(|cell| cell.number().is_some());
            let values = if has_numeric {
                cells
                    .into_iter()
                    .map(|(label, v)| (label, v.unwrap_or(0.0)))
                    .collect()
            } else {
                BTreeMap::new()
            };

            StatementRow {
                row_index: row,
                name,
                values,
                has_numeric,
                has_any_numeric,
            }
        })
        .collect()
}

/// Classifies rows in order, carrying the category of the latest section
/// header as context. Totals close the current section.
pub fn classify_rows(
    classifier: &AccountClassifier,
    rows: &[StatementRow],
    periods: &[PeriodColumn],
) -> Vec<Classification> {
    let mut context = ClassificationContext::default();

    rows.iter()
        .map(|row| {
            let classification =
                classifier.classify(&row.name, row.sample_value(periods), &context);

            if !row.has_numeric && !row.name.is_empty() {
                context.section = match classification.category {
                    MainCategory::Total | MainCategory::Margin | MainCategory::Calculation => None,
                    _ if classification.is_fallback() => None,
                    category => Some(category),
                };
            } else if detect_total(&row.name).is_some() {
                context.section = None;
            }

            classification
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Header,
    Calculated,
    Total,
    Detail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountNode {
    pub id: String,
    pub row_index: usize,
    pub account_name: String,
    pub category: Option<MainCategory>,
    pub subcategory: Option<String>,
    pub is_inflow: bool,
    pub is_total: bool,
    pub is_subtotal: bool,
    pub is_calculated: bool,
    pub is_section_header: bool,
    pub is_active: bool,
    pub confidence: f64,
    pub periods: BTreeMap<String, f64>,
}

impl AccountNode {
    pub fn node_type(&self) -> NodeType {
        if self.is_section_header {
            NodeType::Header
        } else if self.is_calculated {
            NodeType::Calculated
        } else if self.is_total {
            NodeType::Total
        } else {
            NodeType::Detail
        }
    }

    /// Detail rows need a category and a subcategory, everything else only
    /// a category.
    pub fn is_categorized(&self) -> bool {
        match self.node_type() {
            NodeType::Detail => {
                self.category.is_some() && non_blank(self.subcategory.as_deref()).is_some()
            }
            _ => self.category.is_some(),
        }
    }

    fn set_category(&mut self, category: MainCategory) {
        let direction_changed = self
            .category
            .map(|old| old.direction() != category.direction())
            .unwrap_or(true);
        if direction_changed {
            self.subcategory = None;
        }
        self.category = Some(category);
        self.is_inflow = category.is_inflow();
    }

    fn set_type(&mut self, node_type: NodeType) {
        let was_total = self.is_total;
        self.is_section_header = node_type == NodeType::Header;
        self.is_calculated = node_type == NodeType::Calculated;
        self.is_total = node_type == NodeType::Total;
        self.is_subtotal = self.is_total && was_total && self.is_subtotal;

        match node_type {
            NodeType::Detail => {
                if matches!(
                    self.category,
                    Some(MainCategory::Total | MainCategory::Margin | MainCategory::Calculation)
                ) {
                    self.category = None;
                }
            }
            NodeType::Total => {
                self.subcategory = None;
                self.category = Some(MainCategory::Total);
            }
            NodeType::Calculated => {
                self.subcategory = None;
                let category = calculated_category(&self.account_name);
                self.category = Some(category);
                self.is_inflow = category.is_inflow();
            }
            NodeType::Header => {
                self.subcategory = None;
            }
        }
    }
}

/// One user edit. Serialized with an `action` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AccountEdit {
    /// Include or exclude the row from validation and save.
    ToggleActive { id: String },
    SetCategory { id: String, category: MainCategory },
    /// Ignored unless the node is a detail row.
    SetSubcategory {
        id: String,
        subcategory: Option<String>,
    },
    SetType { id: String, node_type: NodeType },
    /// Assigns to the listed rows that sit under `header_id`, are active and
    /// are detail rows. Other targets are left untouched.
    BulkAssign {
        header_id: String,
        target_ids: Vec<String>,
        category: MainCategory,
        subcategory: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeStats {
    pub total: usize,
    pub categorized: usize,
    pub uncategorized: usize,
    pub completion_percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountTree {
    nodes: Vec<AccountNode>,
}

fn node_id(row_index: usize) -> String {
    format!("acc_{}", row_index)
}

impl AccountTree {
    pub fn from_nodes(nodes: Vec<AccountNode>) -> Self {
        Self { nodes }
    }

    /// Builds the tree from classified rows. `classifications` is aligned
    /// with `rows`; rows at or above the pattern's date row are skipped.
    pub fn build(
        rows: &[StatementRow],
        pattern: &DetectedPattern,
        classifications: &[Classification],
    ) -> Self {
        let first_data_row = pattern
            .date_location
            .as_ref()
            .map(|d| d.row + 1)
            .unwrap_or(0);

        let nodes: Vec<AccountNode> = rows
            .iter()
            .zip(classifications)
            .filter(|(row, _)| row.row_index >= first_data_row)
            .filter(|(row, _)| !(row.name.is_empty() && !row.has_any_numeric))
            .map(|(row, classification)| build_node(row, classification))
            .collect();

        info!("Built account tree with {} nodes", nodes.len());
        Self { nodes }
    }

    pub fn nodes(&self) -> &[AccountNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&AccountNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Applies one edit and returns the edited copy.
    pub fn apply(&self, edit: &AccountEdit) -> Self {
        let mut tree = self.clone();
        tree.apply_in_place(edit);
        tree
    }

    /// Applies edits in order and returns the edited copy.
    pub fn apply_all(&self, edits: &[AccountEdit]) -> Self {
        let mut tree = self.clone();
        for edit in edits {
            tree.apply_in_place(edit);
        }
        tree
    }

    pub fn toggle_active(&self, id: &str) -> Self {
        self.apply(&AccountEdit::ToggleActive { id: id.to_string() })
    }

    pub fn set_category(&self, id: &str, category: MainCategory) -> Self {
        self.apply(&AccountEdit::SetCategory {
            id: id.to_string(),
            category,
        })
    }

    pub fn set_subcategory(&self, id: &str, subcategory: Option<&str>) -> Self {
        self.apply(&AccountEdit::SetSubcategory {
            id: id.to_string(),
            subcategory: subcategory.map(str::to_string),
        })
    }

    pub fn set_type(&self, id: &str, node_type: NodeType) -> Self {
        self.apply(&AccountEdit::SetType {
            id: id.to_string(),
            node_type,
        })
    }

    pub fn bulk_assign(
        &self,
        header_id: &str,
        target_ids: &[&str],
        category: MainCategory,
        subcategory: Option<&str>,
    ) -> Self {
        self.apply(&AccountEdit::BulkAssign {
            header_id: header_id.to_string(),
            target_ids: target_ids.iter().map(|id| id.to_string()).collect(),
            category,
            subcategory: subcategory.map(str::to_string),
        })
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    fn scope_of(&self, header_id: &str) -> std::ops::Range<usize> {
        let Some(start) = self
            .position(header_id)
            .filter(|i| self.nodes[*i].node_type() == NodeType::Header)
        else {
            return 0..0;
        };
        let end = self.nodes[start + 1..]
            .iter()
            .position(|n| n.node_type() == NodeType::Header)
            .map(|offset| start + 1 + offset)
            .unwrap_or(self.nodes.len());
        start + 1..end
    }

    /// Rows after the header up to (excluding) the next header. Empty when
    /// `header_id` is not a header.
    pub fn children_of(&self, header_id: &str) -> &[AccountNode] {
        &self.nodes[self.scope_of(header_id)]
    }

    fn apply_in_place(&mut self, edit: &AccountEdit) {
        match edit {
            AccountEdit::ToggleActive { id } => {
                if let Some(node) = self.node_mut(id) {
                    node.is_active = !node.is_active;
                }
            }
            AccountEdit::SetCategory { id, category } => {
                if let Some(node) = self.node_mut(id) {
                    node.set_category(*category);
                }
            }
            AccountEdit::SetSubcategory { id, subcategory } => {
                if let Some(node) = self.node_mut(id) {
                    if node.node_type() == NodeType::Detail {
                        node.subcategory = non_blank(subcategory.as_deref());
                    } else {
                        debug!("Subcategory ignored on non-detail node {}", id);
                    }
                }
            }
            AccountEdit::SetType { id, node_type } => {
                if let Some(node) = self.node_mut(id) {
                    node.set_type(*node_type);
                }
            }
            AccountEdit::BulkAssign {
                header_id,
                target_ids,
                category,
                subcategory,
            } => {
                let scope = self.scope_of(header_id);
                let mut assigned = 0;
                for node in &mut self.nodes[scope] {
                    let eligible = node.is_active && node.node_type() == NodeType::Detail;
                    if eligible && target_ids.contains(&node.id) {
                        node.set_category(*category);
                        node.subcategory = non_blank(subcategory.as_deref());
                        assigned += 1;
                    }
                }
                debug!(
                    "Bulk assign under {}: {} of {} target(s) updated",
                    header_id,
                    assigned,
                    target_ids.len()
                );
            }
        }
    }

    fn node_mut(&mut self, id: &str) -> Option<&mut AccountNode> {
        let node = self.nodes.iter_mut().find(|n| n.id == id);
        if node.is_none() {
            debug!("No account with id {}", id);
        }
        node
    }

    /// Categorization progress over active nodes. An empty tree is complete.
    pub fn stats(&self) -> TreeStats {
        let active: Vec<&AccountNode> = self.nodes.iter().filter(|n| n.is_active).collect();
        let total = active.len();
        let categorized = active.iter().filter(|n| n.is_categorized()).count();
        let completion_percentage = if total == 0 {
            100.0
        } else {
            categorized as f64 / total as f64 * 100.0
        };

        TreeStats {
            total,
            categorized,
            uncategorized: total - categorized,
            completion_percentage,
        }
    }

    /// Active nodes only, in row order.
    pub fn active_nodes(&self) -> impl Iterator<Item = &AccountNode> {
        self.nodes.iter().filter(|n| n.is_active)
    }

    /// Saves the tree as a template. Refused while any active node is
    /// uncategorized.
    pub fn to_template(
        &self,
        pattern: &DetectedPattern,
        periods: &[PeriodColumn],
    ) -> Result<StatementTemplate> {
        let stats = self.stats();
        if stats.uncategorized > 0 {
            return Err(SheetIntakeError::ValidationIncomplete {
                uncategorized: stats.uncategorized,
            });
        }

        Ok(StatementTemplate {
            statement_type: pattern.statement_type,
            currency: pattern.currency,
            units: pattern.units,
            period_columns: periods.to_vec(),
            accounts: self.active_nodes().cloned().collect(),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Blank or whitespace-only subcategories count as missing.
fn non_blank(subcategory: Option<&str>) -> Option<String> {
    subcategory
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn build_node(row: &StatementRow, classification: &Classification) -> AccountNode {
    let account_name = if row.name.is_empty() {
        format!("Row {}", row.row_index + 1)
    } else {
        row.name.clone()
    };

    let mut node = AccountNode {
        id: node_id(row.row_index),
        row_index: row.row_index,
        account_name,
        category: Some(classification.category),
        subcategory: None,
        is_inflow: classification.is_inflow,
        is_total: false,
        is_subtotal: false,
        is_calculated: false,
        is_section_header: false,
        is_active: true,
        confidence: classification.confidence,
        periods: row.values.clone(),
    };

    if !row.has_numeric && !row.name.is_empty() {
        node.is_section_header = true;
        if classification.is_fallback() {
            node.category = Some(MainCategory::Other);
        }
    } else if is_calculated_field(&row.name) {
        node.is_calculated = true;
        node.category = Some(calculated_category(&row.name));
    } else if let Some(kind) = detect_total(&row.name) {
        node.is_total = true;
        node.is_subtotal = kind == TotalKind::Subtotal;
        node.category = Some(MainCategory::Total);
    } else {
        node.subcategory = classification.subcategory.clone();
    }

    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        CellValue, Currency, DateLocation, DetectionStrategy, Language, PeriodType, StatementType,
        Units,
    };

    fn pattern() -> DetectedPattern {
        DetectedPattern {
            date_location: Some(DateLocation {
                row: 0,
                columns: vec![1, 2],
            }),
            income_location: None,
            expense_location: None,
            balance_location: None,
            lowest_balance_location: None,
            currency: Currency::Mxn,
            language: Language::Es,
            statement_type: StatementType::CashFlow,
            units: Units::Units,
            strategy: DetectionStrategy::StandardHeuristic,
            confidence: 0.75,
        }
    }

    fn periods() -> Vec<PeriodColumn> {
        ["Ene-24", "Feb-24"]
            .iter()
            .enumerate()
            .map(|(i, label)| PeriodColumn {
                column_index: i + 1,
                label: label.to_string(),
                period_type: PeriodType::Month,
                period_end: None,
            })
            .collect()
    }

    fn sheet() -> RawSheet {
        let row = |name: &str, values: &[Option<f64>]| {
            let mut cells = vec![CellValue::from(name)];
            cells.extend(values.iter().map(|v| v.map(CellValue::Number).unwrap_or_default()));
            cells
        };
        RawSheet::new(vec![
            row("Concepto", &[None, None]),
            row("INGRESOS", &[None, None]),
            row("Ventas Contado", &[Some(1000.0), Some(1200.0)]),
            row("Xyzzy", &[Some(50.0), Some(0.0)]),
            row("TOTAL INGRESOS", &[Some(1050.0), Some(1200.0)]),
            row("", &[None, None]),
            row("GASTOS OPERATIVOS", &[None, None]),
            row("Sueldos", &[Some(-400.0), Some(-400.0)]),
            row("Partida Rara", &[Some(-10.0), Some(-20.0)]),
            row("Subtotal Gastos", &[Some(-410.0), Some(-420.0)]),
            row("Margen Operativo %", &[Some(0.6), Some(0.65)]),
        ])
    }

    fn tree() -> AccountTree {
        let periods = periods();
        let rows = collect_rows(&sheet(), 0, &periods, 0);
        let classifications = classify_rows(&AccountClassifier::new(), &rows, &periods);
        AccountTree::build(&rows, &pattern(), &classifications)
    }

    #[test]
    fn test_build_tags_and_order() {
        let tree = tree();
        let types: Vec<NodeType> = tree.nodes().iter().map(|n| n.node_type()).collect();
        assert_eq!(
            types,
            vec![
                NodeType::Header,
                NodeType::Detail,
                NodeType::Detail,
                NodeType::Total,
                NodeType::Header,
                NodeType::Detail,
                NodeType::Detail,
                NodeType::Total,
                NodeType::Calculated,
            ]
        );
        assert_eq!(tree.nodes()[0].id, "acc_1");
        assert!(tree.nodes().windows(2).all(|w| w[0].row_index < w[1].row_index));

        let subtotal = tree.get("acc_9").unwrap();
        assert!(subtotal.is_subtotal);
        assert_eq!(subtotal.category, Some(MainCategory::Total));
        assert_eq!(subtotal.subcategory, None);

        let margin = tree.get("acc_10").unwrap();
        assert_eq!(margin.category, Some(MainCategory::Margin));
        assert_eq!(margin.periods.get("Feb-24"), Some(&0.65));
    }

    #[test]
    fn test_section_context_reaches_unknown_rows() {
        let tree = tree();
        let unknown_income = tree.get("acc_3").unwrap();
        assert_eq!(unknown_income.category, Some(MainCategory::Revenue));
        assert_eq!(unknown_income.subcategory.as_deref(), Some("miscellaneous"));

        let unknown_expense = tree.get("acc_8").unwrap();
        assert_eq!(unknown_expense.category, Some(MainCategory::OperatingExpenses));
        assert!(!unknown_expense.is_inflow);
    }

    #[test]
    fn test_toggle_active_is_reversible() {
        let tree = tree();
        let toggled = tree.toggle_active("acc_2");
        assert!(!toggled.get("acc_2").unwrap().is_active);
        assert!(tree.get("acc_2").unwrap().is_active);
        assert_eq!(toggled.toggle_active("acc_2"), tree);
        assert_eq!(toggled.stats().total, tree.stats().total - 1);
    }

    #[test]
    fn test_direction_switch_clears_subcategory() {
        let tree = tree();
        let same_direction = tree.set_category("acc_7", MainCategory::Cogs);
        assert_eq!(same_direction.get("acc_7").unwrap().subcategory.as_deref(), Some("salaries"));

        let flipped = tree.set_category("acc_7", MainCategory::Revenue);
        let node = flipped.get("acc_7").unwrap();
        assert!(node.is_inflow);
        assert_eq!(node.subcategory, None);
        assert_eq!(flipped.stats().uncategorized, 1);
    }

    #[test]
    fn test_subcategory_only_on_detail_rows() {
        let tree = tree().set_subcategory("acc_4", Some("product_sales"));
        assert_eq!(tree.get("acc_4").unwrap().subcategory, None);
    }

    #[test]
    fn test_set_type_transitions() {
        let tree = tree();
        let as_total = tree.set_type("acc_7", NodeType::Total);
        let node = as_total.get("acc_7").unwrap();
        assert_eq!(node.node_type(), NodeType::Total);
        assert_eq!(node.subcategory, None);

        let as_header = as_total.set_type("acc_7", NodeType::Header);
        let node = as_header.get("acc_7").unwrap();
        assert!(node.is_section_header && !node.is_total && !node.is_calculated);

        let back = as_header.set_type("acc_7", NodeType::Detail);
        let node = back.get("acc_7").unwrap();
        assert_eq!(node.node_type(), NodeType::Detail);
        assert_eq!(node.category, None);
        assert!(!node.is_categorized());
    }

    #[test]
    fn test_bulk_assign_skips_ineligible_targets() {
        let tree = tree().toggle_active("acc_8");
        let children: Vec<&str> = tree.children_of("acc_6").iter().map(|n| n.id.as_str()).collect();
        assert_eq!(children, vec!["acc_7", "acc_8", "acc_9", "acc_10"]);

        let assigned = tree.bulk_assign(
            "acc_6",
            &["acc_7", "acc_8", "acc_9", "acc_2"],
            MainCategory::Cogs,
            Some("direct_labor"),
        );
        assert_eq!(assigned.get("acc_7").unwrap().subcategory.as_deref(), Some("direct_labor"));
        assert_eq!(assigned.get("acc_8"), tree.get("acc_8"));
        assert_eq!(assigned.get("acc_9"), tree.get("acc_9"));
        assert_eq!(assigned.get("acc_2"), tree.get("acc_2"));
        assert!(tree.children_of("acc_7").is_empty());
    }

    #[test]
    fn test_edits_replay_from_json() {
        let edits: Vec<AccountEdit> = serde_json::from_str(
            r#"[
                {"action": "toggle_active", "id": "acc_3"},
                {"action": "set_category", "id": "acc_2", "category": "other_income"}
            ]"#,
        )
        .unwrap();
        let edited = tree().apply_all(&edits);
        assert!(!edited.get("acc_3").unwrap().is_active);
        assert_eq!(edited.get("acc_2").unwrap().category, Some(MainCategory::OtherIncome));
    }

    #[test]
    fn test_save_gate() {
        let tree = tree().set_category("acc_7", MainCategory::Revenue);
        assert!(matches!(
            tree.to_template(&pattern(), &periods()),
            Err(SheetIntakeError::ValidationIncomplete { uncategorized: 1 })
        ));

        let excluded = tree.toggle_active("acc_7");
        let template = excluded.to_template(&pattern(), &periods()).unwrap();
        assert_eq!(template.accounts.len(), excluded.len() - 1);
        assert!(template.accounts.iter().all(|a| a.id != "acc_7"));

        assert_eq!(AccountTree::default().stats().completion_percentage, 100.0);
    }

    #[test]
    fn test_blank_subcategory_blocks_save() {
        let cleared = tree().set_subcategory("acc_7", Some(""));
        let node = cleared.get("acc_7").unwrap();
        assert_eq!(node.subcategory, None);
        assert!(!node.is_categorized());
        assert!(matches!(
            cleared.to_template(&pattern(), &periods()),
            Err(SheetIntakeError::ValidationIncomplete { uncategorized: 1 })
        ));

        let bulk = tree().bulk_assign("acc_6", &["acc_7"], MainCategory::Cogs, Some("   "));
        assert_eq!(bulk.get("acc_7").unwrap().subcategory, None);
        assert_eq!(bulk.stats().uncategorized, 1);

        let mut node = tree().get("acc_7").unwrap().clone();
        node.subcategory = Some("  ".to_string());
        assert!(!node.is_categorized());
        let loaded = AccountTree::from_nodes(vec![node]);
        assert_eq!(loaded.stats().uncategorized, 1);
    }

    #[test]
    fn test_unnamed_row_with_off_period_number_is_kept() {
        let periods = periods();
        let sheet = RawSheet::new(vec![
            vec!["Concepto".into(), "Ene-24".into(), "Feb-24".into(), "Notas".into()],
            vec!["Ventas Contado".into(), 100.0.into(), 120.0.into()],
            vec![CellValue::Empty, CellValue::Empty, CellValue::Empty, 7.0.into()],
            vec![CellValue::Empty, CellValue::Empty, CellValue::Empty, "nota".into()],
        ]);
        let rows = collect_rows(&sheet, 0, &periods, 1);
        assert!(!rows[1].has_numeric);
        assert!(rows[1].has_any_numeric);

        let classifications = classify_rows(&AccountClassifier::new(), &rows, &periods);
        let tree = AccountTree::build(&rows, &pattern(), &classifications);
        assert_eq!(tree.len(), 2);
        let unnamed = tree.get("acc_2").unwrap();
        assert_eq!(unnamed.account_name, "Row 3");
        assert!(!unnamed.is_section_header);
    }

    #[test]
    fn test_nodes_serialize_camel_case() {
        let json = tree().to_json().unwrap();
        assert!(json.contains("\"accountName\": \"Ventas Contado\""));
        assert!(json.contains("\"isSectionHeader\": true"));
    }
}
