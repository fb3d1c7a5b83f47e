use chrono::{DateTime, Datelike, Local, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::core::{analysis::AnalysisResult, payment::PaymentStatus};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Payment,
    Usage,
    Seasonal,
    Export,
}

#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// Human-readable recommendation.
#[must_use]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub category: Category,
    pub priority: Priority,
    pub title: String,
    pub description: String,
    pub action: String,
}

impl Insight {
    fn new(
        category: Category,
        priority: Priority,
        title: impl Into<String>,
        description: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            category,
            priority,
            title: title.into(),
            description: description.into(),
            action: action.into(),
        }
    }
}

/// Debit balance, in pounds, which deserves attention.
const DEBIT_ALERT: f64 = -50.0;

/// Credit balance, in pounds, worth mentioning.
const CREDIT_NOTICE: f64 = 100.0;

/// Credit balance, in pounds, which should rather be used up.
const CREDIT_ALERT: f64 = 500.0;

const CREDIT_ALERT_MONTHS: f64 = 6.0;

const RECENT_ANOMALY_DAYS: i64 = 7;

/// Turn the figures of the analysis into prioritised recommendations.
///
/// The insights are ordered by priority, the highest first.
pub fn generate_insights(result: &AnalysisResult, now: DateTime<Local>) -> Vec<Insight> {
    let mut insights = Vec::new();
    payment_insights(result, &mut insights);
    balance_insights(result, &mut insights);
    usage_insights(result, now, &mut insights);
    if is_winter(now.month()) {
        insights.push(Insight::new(
            Category::Seasonal,
            Priority::Low,
            "Winter Usage Period",
            "Currently in winter months when energy usage typically increases",
            "Monitor your usage closely as heating costs may be higher than summer averages",
        ));
    }
    if result.avg_daily_export.is_positive() {
        export_insights(result, now, &mut insights);
    }
    insights.sort_by_key(|insight| insight.priority);
    insights
}

const fn is_winter(month: u32) -> bool {
    matches!(month, 11 | 12 | 1 | 2)
}

fn payment_insights(result: &AnalysisResult, insights: &mut Vec<Insight>) {
    let Some(current) = result.current_direct_debit.filter(|current| *current > 0.0) else {
        return;
    };
    let recommended = result.recommended_direct_debit;
    match result.payment_status {
        PaymentStatus::Underpaying => insights.push(Insight::new(
            Category::Payment,
            Priority::High,
            "Direct Debit Increase Recommended",
            format!(
                "Your current Direct Debit (£{current:.2}) is lower than recommended (£{recommended:.2}). You may build up debt over time."
            ),
            format!("Consider increasing your Direct Debit by £{:.2} per month", recommended - current),
        )),
        PaymentStatus::Overpaying => insights.push(Insight::new(
            Category::Payment,
            Priority::Medium,
            "Direct Debit Decrease Possible",
            format!(
                "Your current Direct Debit (£{current:.2}) is higher than needed (£{recommended:.2}). You're building up credit."
            ),
            format!("Consider decreasing your Direct Debit by £{:.2} per month", current - recommended),
        )),
        PaymentStatus::Balanced | PaymentStatus::Unknown => insights.push(Insight::new(
            Category::Payment,
            Priority::Low,
            "Direct Debit Well Balanced",
            format!("Your current Direct Debit (£{current:.2}) is appropriate for your usage"),
            "No action needed - continue monitoring your usage",
        )),
    }
}

fn balance_insights(result: &AnalysisResult, insights: &mut Vec<Insight>) {
    let balance = result.current_balance;
    if balance < DEBIT_ALERT {
        insights.push(Insight::new(
            Category::Payment,
            Priority::High,
            "Account in Debit",
            format!("Your account has a debit balance of £{:.2}", balance.abs()),
            "Consider making a payment or increasing your Direct Debit to clear the debt",
        ));
        return;
    }
    if balance <= CREDIT_NOTICE {
        return;
    }

    // Net exporters never burn the credit down:
    let months_of_credit = if result.projected_monthly_cost > 0.0 {
        balance / result.projected_monthly_cost
    } else {
        f64::INFINITY
    };
    let coverage = if months_of_credit.is_finite() {
        format!("{months_of_credit:.1} months")
    } else {
        "indefinitely at current usage".to_string()
    };

    if balance > CREDIT_ALERT && months_of_credit > CREDIT_ALERT_MONTHS {
        let burn_down_payment = (result.projected_monthly_cost - balance / 12.0).max(0.0);
        insights.push(Insight::new(
            Category::Payment,
            Priority::High,
            "High Credit Balance - Payment Adjustment Recommended",
            format!(
                "Your account has £{balance:.2} credit ({coverage}). This credit should be utilized rather than held."
            ),
            format!(
                "Consider reducing Direct Debit to £{burn_down_payment:.0}/month to gradually use your credit over 12 months, or request a partial refund of £{:.0}",
                balance / 2.0,
            ),
        ));
    } else {
        insights.push(Insight::new(
            Category::Payment,
            Priority::Medium,
            "Credit Balance Available",
            format!("Your account has a credit balance of £{balance:.2} ({coverage} coverage)"),
            "Consider requesting a refund or slightly reducing your Direct Debit while maintaining seasonal coverage",
        ));
    }
}

fn usage_insights(result: &AnalysisResult, now: DateTime<Local>, insights: &mut Vec<Insight>) {
    let since = (now - TimeDelta::days(RECENT_ANOMALY_DAYS)).date_naive();
    let n_recent = result.anomalies.iter().filter(|anomaly| anomaly.date > since).count();
    if n_recent != 0 {
        insights.push(Insight::new(
            Category::Usage,
            Priority::Medium,
            "Recent Unusual Usage Detected",
            format!("Detected {n_recent} unusual consumption patterns in the last 7 days"),
            "Review your recent energy usage to identify any changes in consumption patterns",
        ));
    }
}

#[expect(clippy::too_many_lines)]
fn export_insights(result: &AnalysisResult, now: DateTime<Local>, insights: &mut Vec<Insight>) {
    let import = result.avg_daily_electricity.0;
    let export = result.avg_daily_export.0;
    let net_import = import - export;
    let export_ratio = if import > 0.0 { export / import * 100.0 } else { 0.0 };

    let import_cost = result.avg_daily_cost_electricity;
    let earnings = result.avg_daily_earnings_export;
    let net_cost = import_cost - earnings;
    let savings_rate = if import_cost > 0.0 { earnings / import_cost * 100.0 } else { 0.0 };

    if export_ratio >= 50.0 {
        insights.push(Insight::new(
            Category::Export,
            Priority::High,
            "Excellent Export Performance",
            format!(
                "You're exporting {export_ratio:.1}% of your imported electricity ({export:.1} kWh/day). Your solar/battery system is performing very well!"
            ),
            format!(
                "You're earning £{earnings:.2}/day from exports, offsetting {savings_rate:.1}% of your import costs. Consider if you can time more usage during generation periods to increase self-consumption."
            ),
        ));
    } else if export_ratio >= 30.0 {
        insights.push(Insight::new(
            Category::Export,
            Priority::Medium,
            "Good Export Performance",
            format!(
                "You're exporting {export_ratio:.1}% of your imported electricity ({export:.1} kWh/day). Your system is providing good returns."
            ),
            format!(
                "Earning £{earnings:.2}/day from exports ({savings_rate:.1}% of import costs). Look for opportunities to shift more usage to daylight hours to maximize self-consumption."
            ),
        ));
    } else {
        insights.push(Insight::new(
            Category::Export,
            Priority::Medium,
            "Export Performance Review",
            format!(
                "You're exporting {export:.1} kWh/day ({export_ratio:.1}% of imports). This may indicate high self-consumption or limited generation."
            ),
            format!(
                "Earning £{earnings:.2}/day from exports. Review if generation is meeting expectations or if system maintenance is needed."
            ),
        ));
    }

    if net_import < 5.0 {
        insights.push(Insight::new(
            Category::Export,
            Priority::High,
            "Near Energy Independence",
            format!(
                "Your net grid import is only {net_import:.1} kWh/day! Your exports ({export:.1} kWh) nearly match your imports ({import:.1} kWh)."
            ),
            "Excellent self-sufficiency! Consider battery storage optimization to further reduce grid dependency, especially during peak rate periods.",
        ));
    } else if net_import < 10.0 {
        insights.push(Insight::new(
            Category::Export,
            Priority::Medium,
            "Strong Energy Self-Sufficiency",
            format!(
                "Your net grid import is {net_import:.1} kWh/day. Exports offset a significant portion of your consumption."
            ),
            format!(
                "With {net_import:.1} kWh/day net import at £{net_cost:.2}/day net cost, you're achieving good grid independence. Review battery charging patterns to reduce peak-time imports."
            ),
        ));
    }

    if earnings > 0.50 {
        insights.push(Insight::new(
            Category::Export,
            Priority::Medium,
            "Strong Export Earnings",
            format!(
                "Your exports are generating £{earnings:.2}/day (£{:.2}/month, ~£{:.0}/year)",
                earnings * 30.0,
                earnings * 365.0,
            ),
            format!(
                "Export earnings offset {savings_rate:.1}% of your import costs. Review your export tariff rate to ensure you're getting the best rate available."
            ),
        ));
    }

    if matches!(now.month(), 4..=9) {
        insights.push(Insight::new(
            Category::Export,
            Priority::Low,
            "Peak Solar Season Performance",
            format!(
                "Currently in peak solar season. Your {export:.1} kWh/day export represents optimal generation conditions."
            ),
            "This is your baseline for optimal performance. Compare winter exports to this rate to gauge seasonal variations.",
        ));
    } else {
        insights.push(Insight::new(
            Category::Export,
            Priority::Low,
            "Winter Export Performance",
            format!(
                "Winter months typically see 50-70% lower solar generation. Your current {export:.1} kWh/day export is expected to increase in spring/summer."
            ),
            "Track your export performance over the coming months. Spring/summer exports should significantly increase if your system is working optimally.",
        ));
    }

    if import > 0.0 {
        let grid_dependency = net_import / import * 100.0;
        if grid_dependency < 50.0 {
            insights.push(Insight::new(
                Category::Export,
                Priority::High,
                "Exceptional Grid Independence",
                format!(
                    "You're only {grid_dependency:.1}% grid-dependent! Your generation and exports mean you're mostly energy independent."
                ),
                "Outstanding performance! Share your setup and optimizations with the community. Consider whether additional battery capacity could reduce grid dependency further.",
            ));
        }
    }
}
