use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};

use crate::core::{
    analysis::AnalysisResult,
    anomaly::{Anomaly, AnomalyKind},
    insight::{Insight, Priority},
    payment::PaymentStatus,
    tariff::TariffChange,
};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .apply_modifier(modifiers::UTF8_ROUND_CORNERS)
        .enforce_styling();
    table
}

fn pounds(value: f64) -> Cell {
    Cell::new(format!("£{value:.2}")).set_alignment(CellAlignment::Right)
}

pub fn build_summary_table(result: &AnalysisResult) -> Table {
    let mut table = new_table();
    table.set_header(vec!["", "Daily", "Daily cost"]);
    table.add_row(vec![
        Cell::new("Electricity"),
        Cell::new(result.avg_daily_electricity).set_alignment(CellAlignment::Right),
        pounds(result.avg_daily_cost_electricity),
    ]);
    table.add_row(vec![
        Cell::new("Export"),
        Cell::new(result.avg_daily_export).set_alignment(CellAlignment::Right),
        pounds(result.avg_daily_earnings_export).fg(Color::Green),
    ]);
    table.add_row(vec![
        Cell::new("Gas"),
        Cell::new(result.avg_daily_gas).set_alignment(CellAlignment::Right),
        pounds(result.avg_daily_cost_gas),
    ]);
    table.add_row(vec![
        Cell::new("Total").add_attribute(Attribute::Bold),
        Cell::new(""),
        pounds(result.avg_daily_cost_total).add_attribute(Attribute::Bold),
    ]);
    table.add_row(vec![
        Cell::new("Projected monthly").add_attribute(Attribute::Dim),
        Cell::new(""),
        pounds(result.projected_monthly_cost).add_attribute(Attribute::Dim),
    ]);
    table.add_row(vec![
        Cell::new("Balance"),
        Cell::new(""),
        pounds(result.current_balance).fg(if result.current_balance < 0.0 {
            Color::Red
        } else {
            Color::Green
        }),
    ]);
    table.add_row(vec![
        Cell::new("Direct debit"),
        Cell::new(result.payment_status).fg(match result.payment_status {
            PaymentStatus::Balanced => Color::Green,
            PaymentStatus::Underpaying => Color::Red,
            PaymentStatus::Overpaying => Color::DarkYellow,
            PaymentStatus::Unknown => Color::Reset,
        }),
        pounds(result.recommended_direct_debit).add_attribute(Attribute::Bold),
    ]);
    table
}

pub fn build_anomalies_table(anomalies: &[Anomaly]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Date", "Fuel", "Type", "Actual", "Expected", "Deviation", "Weather"]);
    for anomaly in anomalies {
        table.add_row(vec![
            Cell::new(anomaly.date.format("%a %b %d")),
            Cell::new(anomaly.fuel_type).add_attribute(Attribute::Dim),
            Cell::new(anomaly.kind).fg(match anomaly.kind {
                AnomalyKind::ConsumptionSpike => Color::Red,
                AnomalyKind::LowUsage => Color::DarkYellow,
            }),
            Cell::new(anomaly.actual).set_alignment(CellAlignment::Right),
            Cell::new(anomaly.expected)
                .set_alignment(CellAlignment::Right)
                .add_attribute(Attribute::Dim),
            Cell::new(format!("{:+.0}%", anomaly.deviation_percent))
                .set_alignment(CellAlignment::Right),
            Cell::new(anomaly.weather.as_ref().map_or_else(String::new, |weather| {
                format!("{:.1}°C, {}", weather.temp_mean, weather.weather_desc)
            }))
            .add_attribute(Attribute::Dim),
        ]);
    }
    table
}

pub fn build_tariff_changes_table(changes: &[TariffChange]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Date", "Fuel", "From", "To", "Change"]);
    for change in changes {
        table.add_row(vec![
            Cell::new(change.change_date.format("%Y-%m-%d")),
            Cell::new(change.fuel_type).add_attribute(Attribute::Dim),
            Cell::new(&change.old_tariff_name).add_attribute(Attribute::Dim),
            Cell::new(&change.new_tariff_name),
            Cell::new(change.unit_rate_change).set_alignment(CellAlignment::Right).fg(
                if change.unit_rate_change.is_positive() {
                    Color::Red
                } else {
                    Color::Green
                },
            ),
        ]);
    }
    table
}

pub fn build_insights_table(insights: &[Insight]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Priority", "Category", "Insight", "Action"]);
    for insight in insights {
        table.add_row(vec![
            Cell::new(insight.priority).fg(match insight.priority {
                Priority::High => Color::Red,
                Priority::Medium => Color::DarkYellow,
                Priority::Low => Color::Green,
            }),
            Cell::new(insight.category).add_attribute(Attribute::Dim),
            Cell::new(format!("{}\n{}", insight.title, insight.description)),
            Cell::new(&insight.action),
        ]);
    }
    table
}
