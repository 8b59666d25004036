use tabled::{settings::Style, Table, Tabled};
use crate::graph::GraphStats;

#[derive(Tabled)]
struct StatsRow {
    #[tabled(rename = "Table")]
    table: &'static str,
    #[tabled(rename = "Rows")]
    rows: usize,
}

/// Render graph counts as a rounded table
pub fn stats_table(stats: &GraphStats) -> String {
    let rows = [
        StatsRow { table: "entities", rows: stats.entities },
        StatsRow { table: "observations", rows: stats.observations },
        StatsRow { table: "relations", rows: stats.relations },
    ];
    Table::new(rows).with(Style::rounded()).to_string()
}
