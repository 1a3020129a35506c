//! Persisted-query client pieces for the chart GraphQL endpoint.

use http::header::{ACCEPT, CONTENT_TYPE, COOKIE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::config::TargetSettings;

use super::parser::ParseError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartQuery<'a> {
    pub operation_name: &'a str,
    pub variables: ChartVariables<'a>,
    pub extensions: QueryExtensions<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartVariables<'a> {
    pub first: usize,
    pub is_in_pace: bool,
    pub locale: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryExtensions<'a> {
    pub persisted_query: PersistedQuery<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedQuery<'a> {
    pub sha256_hash: &'a str,
    pub version: u32,
}

impl<'a> ChartQuery<'a> {
    pub fn from_target(target: &'a TargetSettings) -> Self {
        Self {
            operation_name: &target.graphql_operation,
            variables: ChartVariables {
                first: target.num_movies,
                is_in_pace: false,
                locale: &target.graphql_locale,
            },
            extensions: QueryExtensions {
                persisted_query: PersistedQuery {
                    sha256_hash: &target.graphql_hash,
                    version: target.graphql_version,
                },
            },
        }
    }

    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Headers for the persisted query; `cookie` replays the chart page session.
pub fn chart_query_headers(cookie: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/graphql+json, application/json"),
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(cookie) = cookie
        && let Ok(value) = HeaderValue::from_str(cookie)
    {
        headers.insert(COOKIE, value);
    }
    headers
}

#[derive(Debug, Default, Deserialize)]
struct ChartResponse {
    #[serde(default)]
    data: Option<ChartData>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartData {
    #[serde(default, rename = "chartTitles")]
    chart_titles: Option<ChartEdges>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartEdges {
    #[serde(default)]
    edges: Vec<ChartEdge>,
}

#[derive(Debug, Deserialize)]
struct ChartEdge {
    #[serde(default)]
    node: Option<ChartNode>,
}

#[derive(Debug, Deserialize)]
struct ChartNode {
    #[serde(default)]
    id: Option<String>,
}

/// Title ids from `data.chartTitles.edges[].node.id`; missing levels yield none.
pub fn parse_chart_ids(body: &[u8]) -> Result<Vec<String>, ParseError> {
    let response: ChartResponse = serde_json::from_slice(body)?;
    Ok(response
        .data
        .and_then(|data| data.chart_titles)
        .map(|titles| titles.edges)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|edge| edge.node.and_then(|node| node.id))
        .filter(|id| !id.is_empty())
        .collect())
}
