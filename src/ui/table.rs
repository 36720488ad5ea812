use crate::presenter::AppLocationItem;
use crate::storage::DbStats;
use crate::access::LocationAccessType;
use crate::ui::{access_icon, theme};
use owo_colors::OwoColorize;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

pub fn stats_table(stats: &DbStats) -> String {
    let mut builder = TableBuilder::new();
    builder.add_row("apps", &stats.total.to_string());
    for access_type in LocationAccessType::all() {
        builder.add_row(access_type.as_str(), &stats.count_of(*access_type).to_string());
    }
    builder.build()
}

#[derive(Tabled)]
struct ItemRow {
    #[tabled(rename = "#")]
    order: usize,
    #[tabled(rename = "Icon")]
    icon: String,
    #[tabled(rename = "App")]
    title: String,
    #[tabled(rename = "Package")]
    package: String,
    #[tabled(rename = "Type")]
    access: String,
    #[tabled(rename = "Coarse")]
    coarse: String,
    #[tabled(rename = "Fine")]
    fine: String,
}

fn grant_cell(granted: Option<bool>) -> String {
    match granted {
        Some(true) => "granted".to_string(),
        Some(false) => "denied".to_string(),
        None => "-".to_string(),
    }
}

/// Render listing items as a table, in their assigned order
pub fn items_table(items: &[AppLocationItem]) -> String {
    if items.is_empty() {
        return String::new();
    }

    let rows: Vec<ItemRow> = items
        .iter()
        .map(|item| ItemRow {
            order: item.order,
            icon: item.icon.clone(),
            title: item.title.clone(),
            package: item.package_name.clone(),
            access: format!(
                "{} {}",
                access_icon(item.access_type),
                item.access_type.as_str().style(theme().access_style(item.access_type))
            ),
            coarse: grant_cell(item.grants.map(|g| g.coarse)),
            fine: grant_cell(item.grants.map(|g| g.fine)),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}
