//! Analytics Reporting API v4 queries for a connected view.
//!
//! Experimental: only the "most active visitors" report is wired up. Plain
//! traffic queries are not ported to v4 yet and fail fast.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::error::{check_status, decode_json, GatewayError, GatewayResult};
use crate::models::Profile;

#[derive(Debug, Error)]
pub enum ReporterError {
    #[error("no token is bound to location {0}")]
    MissingToken(i64),
    #[error("location {0} has no Google Analytics profile")]
    MissingProfile(i64),
    #[error("application {0} is no longer registered")]
    MissingApplication(i64),
    #[error(transparent)]
    Storage(anyhow::Error),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Thresholds for the "most active visitors" report.
#[derive(Debug, Clone, Deserialize)]
pub struct ActiveVisitorsQuery {
    pub start_date: String,
    pub end_date: String,
    /// Dimension name without the `ga:` prefix, e.g. `city`
    pub dimension: String,
    pub min_sessions: u64,
    pub min_avg_session_duration: f64,
    pub max_bounce_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetReportsRequest {
    pub report_requests: Vec<ReportRequest>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub view_id: String,
    pub date_ranges: Vec<DateRange>,
    pub dimensions: Vec<Dimension>,
    pub metrics: Vec<Metric>,
    pub metric_filter_clauses: Vec<MetricFilterClause>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dimension {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Metric {
    pub expression: String,
    pub alias: String,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterLogicalOperator {
    And,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComparisonOperator {
    GreaterThan,
    LessThan,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricFilterClause {
    pub operator: FilterLogicalOperator,
    pub filters: Vec<MetricFilter>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricFilter {
    pub metric_name: String,
    pub operator: ComparisonOperator,
    pub comparison_value: String,
}

#[derive(Debug, Clone, Deserialize)]
struct GetReportsResponse {
    #[serde(default)]
    reports: Vec<Report>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(default)]
    pub column_header: serde_json::Value,
    #[serde(default)]
    pub data: ReportData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    #[serde(default)]
    pub rows: Vec<ReportRow>,
    #[serde(default)]
    pub totals: Vec<DateRangeValues>,
    #[serde(default)]
    pub row_count: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportRow {
    #[serde(default)]
    pub dimensions: Vec<String>,
    #[serde(default)]
    pub metrics: Vec<DateRangeValues>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DateRangeValues {
    #[serde(default)]
    pub values: Vec<String>,
}

fn metric(name: &str) -> Metric {
    Metric {
        expression: format!("ga:{name}"),
        alias: name.to_string(),
    }
}

fn metric_filter(name: &str, operator: ComparisonOperator, value: String) -> MetricFilter {
    MetricFilter {
        metric_name: format!("ga:{name}"),
        operator,
        comparison_value: value,
    }
}

/// One request: sessions, average duration and bounce rate grouped by the
/// dimension, keeping only rows that pass all three thresholds.
pub fn active_visitors_request(view_id: &str, query: &ActiveVisitorsQuery) -> GetReportsRequest {
    let filters = vec![
        metric_filter(
            "sessions",
            ComparisonOperator::GreaterThan,
            query.min_sessions.to_string(),
        ),
        metric_filter(
            "avgSessionDuration",
            ComparisonOperator::GreaterThan,
            query.min_avg_session_duration.to_string(),
        ),
        metric_filter(
            "bounceRate",
            ComparisonOperator::LessThan,
            query.max_bounce_rate.to_string(),
        ),
    ];

    GetReportsRequest {
        report_requests: vec![ReportRequest {
            view_id: view_id.to_string(),
            date_ranges: vec![DateRange {
                start_date: query.start_date.clone(),
                end_date: query.end_date.clone(),
            }],
            dimensions: vec![Dimension {
                name: format!("ga:{}", query.dimension),
            }],
            metrics: vec![
                metric("sessions"),
                metric("avgSessionDuration"),
                metric("bounceRate"),
            ],
            metric_filter_clauses: vec![MetricFilterClause {
                operator: FilterLogicalOperator::And,
                filters,
            }],
        }],
    }
}

/// Authenticated report access for one connected profile.
pub struct ProfileReporter {
    client: Client,
    reporting_url: String,
    access_token: String,
    profile: Profile,
}

impl ProfileReporter {
    pub(crate) fn new(
        client: Client,
        reporting_url: String,
        access_token: String,
        profile: Profile,
    ) -> Self {
        Self {
            client,
            reporting_url,
            access_token,
            profile,
        }
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub async fn most_active_visitors(&self, query: &ActiveVisitorsQuery) -> GatewayResult<Report> {
        let body = active_visitors_request(&self.profile.profile_id, query);
        let url = format!(
            "{}/reports:batchGet",
            self.reporting_url.trim_end_matches('/')
        );

        debug!(view_id = %self.profile.profile_id, "requesting active visitors report");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;

        let reports: GetReportsResponse = decode_json(check_status(response).await?).await?;
        reports
            .reports
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::InvalidResponse("batchGet returned no reports".into()))
    }

    pub async fn traffic(
        &self,
        _start_date: &str,
        _end_date: &str,
        _metrics: &[&str],
        _segment: Option<&str>,
    ) -> GatewayResult<Report> {
        Err(GatewayError::Unsupported(
            "traffic reports are not available on the Reporting API v4 yet",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query() -> ActiveVisitorsQuery {
        ActiveVisitorsQuery {
            start_date: "2016-01-01".to_string(),
            end_date: "2016-01-31".to_string(),
            dimension: "city".to_string(),
            min_sessions: 3,
            min_avg_session_duration: 60.0,
            max_bounce_rate: 40.5,
        }
    }

    #[test]
    fn active_visitors_request_combines_three_filters_with_and() {
        let body = serde_json::to_value(active_visitors_request("222", &query())).unwrap();
        let request = &body["reportRequests"][0];

        assert_eq!(request["viewId"], "222");
        assert_eq!(
            request["dateRanges"],
            json!([{"startDate": "2016-01-01", "endDate": "2016-01-31"}])
        );
        assert_eq!(request["dimensions"], json!([{"name": "ga:city"}]));
        assert_eq!(
            request["metrics"],
            json!([
                {"expression": "ga:sessions", "alias": "sessions"},
                {"expression": "ga:avgSessionDuration", "alias": "avgSessionDuration"},
                {"expression": "ga:bounceRate", "alias": "bounceRate"}
            ])
        );

        let clauses = request["metricFilterClauses"].as_array().unwrap();
        assert_eq!(clauses.len(), 1);
        assert_eq!(clauses[0]["operator"], "AND");
        assert_eq!(
            clauses[0]["filters"],
            json!([
                {"metricName": "ga:sessions", "operator": "GREATER_THAN", "comparisonValue": "3"},
                {"metricName": "ga:avgSessionDuration", "operator": "GREATER_THAN", "comparisonValue": "60"},
                {"metricName": "ga:bounceRate", "operator": "LESS_THAN", "comparisonValue": "40.5"}
            ])
        );
    }

    #[tokio::test]
    async fn traffic_is_unsupported() {
        let reporter = ProfileReporter::new(
            Client::new(),
            "http://localhost:1/v4".to_string(),
            "token".to_string(),
            Profile {
                id: 1,
                identifier: "222".to_string(),
                account_id: "111".to_string(),
                property_id: "UA-111-1".to_string(),
                profile_id: "222".to_string(),
                display_name: "All Web Site Data".to_string(),
                location_id: 1,
                belonging_location_id: None,
                created_at: 0,
            },
        );

        let err = reporter
            .traffic("2016-01-01", "2016-01-31", &["ga:sessions"], None)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Unsupported(_)));
    }
}
