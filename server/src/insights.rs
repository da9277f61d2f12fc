//! Per-user health insights: the latest report with metrics, per-metric
//! time series, report history and the union of recommendations.

use std::collections::{BTreeMap, HashSet};

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::AppState;
use crate::auth::AuthUser;
use crate::db::models::{Metric, Record};
use crate::error::AppError;

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LatestSummary {
    pub title: String,
    pub provider: String,
    pub date: DateTime<Utc>,
    pub metrics: Vec<Metric>,
    pub metrics_count: usize,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct TrendPoint {
    pub date: DateTime<Utc>,
    pub value: f64,
    pub unit: String,
    pub status: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ReportEntry {
    pub id: String,
    pub title: String,
    pub date: DateTime<Utc>,
    pub provider: String,
    pub summary: String,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Insights {
    pub summary: Option<LatestSummary>,
    pub trends: BTreeMap<String, Vec<TrendPoint>>,
    pub reports: Vec<ReportEntry>,
    pub recommendations: Vec<String>,
}

fn or_default(value: &str, default: &str) -> String {
    if value.trim().is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}

/// Expects `records` newest first, all with metrics; reports keep that order.
pub fn compute_insights(records: Vec<Record>) -> Insights {
    let summary = records.first().map(|latest| LatestSummary {
        title: or_default(&latest.title, "Latest Report"),
        provider: latest.provider.clone(),
        date: latest.date,
        metrics: latest.metrics.clone(),
        metrics_count: latest.metrics.len(),
    });

    let mut trends: BTreeMap<String, Vec<TrendPoint>> = BTreeMap::new();
    for record in &records {
        for metric in &record.metrics {
            trends.entry(metric.name.clone()).or_default().push(TrendPoint {
                date: record.date,
                value: metric.value,
                unit: metric.unit.clone(),
                status: metric.status.clone(),
            });
        }
    }
    for series in trends.values_mut() {
        series.sort_by_key(|point| point.date);
    }

    let mut seen = HashSet::new();
    let mut recommendations = Vec::new();
    for rec in records.iter().flat_map(|r| r.recommendations.iter()) {
        if seen.insert(rec.as_str()) {
            recommendations.push(rec.clone());
        }
    }

    let reports = records
        .iter()
        .map(|record| ReportEntry {
            id: record.id.clone(),
            title: or_default(&record.title, "Medical Record"),
            date: record.date,
            provider: record.provider.clone(),
            summary: or_default(&record.summary, "No summary available."),
            recommendations: record.recommendations.clone(),
        })
        .collect();

    Insights {
        summary,
        trends,
        reports,
        recommendations,
    }
}

pub async fn get_insights(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Insights>, AppError> {
    let records = state
        .records
        .list_with_metrics(&auth.user_id)
        .await
        .map_err(|e| AppError::internal("Server error fetching insights", e))?;

    tracing::debug!("Computing insights over {} records for {}", records.len(), auth.user_id);
    Ok(Json(compute_insights(records)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::fixtures;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, 9, 0, 0).unwrap()
    }

    fn record(title: &str, date: DateTime<Utc>, hb: f64, recs: &[&str]) -> Record {
        let mut record = fixtures::record("u1", title, date);
        record.metrics.push(fixtures::metric("Hemoglobin", hb));
        record.recommendations = recs.iter().map(|s| s.to_string()).collect();
        record
    }

    #[test]
    fn test_empty_history() {
        let insights = compute_insights(Vec::new());
        assert_eq!(insights.summary, None);

        let json = serde_json::to_value(&insights).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "summary": null, "trends": {}, "reports": [], "recommendations": [] })
        );
    }

    #[test]
    fn test_trends_sorted_ascending_by_date() {
        // Newest first, as the store returns them
        let records = vec![
            record("c", day(20), 12.8, &[]),
            record("b", day(10), 13.2, &[]),
            record("a", day(1), 11.0, &[]),
        ];
        let insights = compute_insights(records);

        let values: Vec<f64> = insights.trends["Hemoglobin"].iter().map(|p| p.value).collect();
        assert_eq!(values, vec![11.0, 13.2, 12.8]);
    }

    #[test]
    fn test_summary_reports_and_recommendations() {
        let mut latest = record("", day(20), 12.8, &["Eat iron-rich food", "Recheck in 3 months"]);
        latest.summary = String::new();
        let older = record("CBC", day(1), 11.0, &["Eat iron-rich food", "Hydrate"]);

        let insights = compute_insights(vec![latest, older]);

        let summary = insights.summary.unwrap();
        assert_eq!(summary.title, "Latest Report");
        assert_eq!(summary.metrics_count, 1);

        assert_eq!(insights.reports[0].title, "Medical Record");
        assert_eq!(insights.reports[0].summary, "No summary available.");
        assert_eq!(insights.reports[1].title, "CBC");

        assert_eq!(
            insights.recommendations,
            vec!["Eat iron-rich food", "Recheck in 3 months", "Hydrate"]
        );
    }
}
