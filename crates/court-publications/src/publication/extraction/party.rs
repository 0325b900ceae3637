use serde::Deserialize;
use serde_json::{Map, Value};

use super::path::PathQuery;

/// Output key holding the per-hearing party summaries.
pub const PARTIES_FIELD: &str = "parties";

/// Paths used to regroup cases and party names by hearing.
///
/// `hearings` is evaluated against the whole payload; every other query is evaluated
/// relative to the hearing, case or party node it describes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PartySearchConfig {
    pub hearings: PathQuery,
    pub cases: PathQuery,
    pub parties: PathQuery,
    pub case_number: PathQuery,
    pub case_name: PathQuery,
    pub case_urn: PathQuery,
    pub party_role: PathQuery,
    pub organisation_name: PathQuery,
    pub individual_forenames: PathQuery,
    #[serde(default)]
    pub individual_middle_name: Option<PathQuery>,
    pub individual_surname: PathQuery,
    #[serde(default)]
    pub excluded_roles: Vec<String>,
}

impl PartySearchConfig {
    fn is_excluded(&self, role: &str) -> bool {
        self.excluded_roles
            .iter()
            .any(|excluded| excluded.eq_ignore_ascii_case(role))
    }
}

/// One summary per hearing that yields at least one case or party name.
pub(crate) fn extract_parties(document: &Value, config: &PartySearchConfig) -> Vec<Value> {
    config
        .hearings
        .select(document)
        .into_iter()
        .filter_map(|hearing| hearing_summary(hearing, config))
        .collect()
}

fn hearing_summary(hearing: &Value, config: &PartySearchConfig) -> Option<Value> {
    let mut cases: Vec<Value> = Vec::new();
    for case in config.cases.select(hearing) {
        let mut fields = Map::new();
        let wanted = [
            ("caseNumber", &config.case_number),
            ("caseName", &config.case_name),
            ("caseUrn", &config.case_urn),
        ];
        for (field, query) in wanted {
            if let Some(text) = first_text(query, case) {
                fields.insert(field.to_string(), Value::String(text));
            }
        }
        let summary = Value::Object(fields);
        if summary.as_object().is_some_and(|fields| !fields.is_empty()) && !cases.contains(&summary)
        {
            cases.push(summary);
        }
    }

    let mut organisations: Vec<String> = Vec::new();
    let mut individuals: Vec<String> = Vec::new();
    for party in config.parties.select(hearing) {
        if first_text(&config.party_role, party).is_some_and(|role| config.is_excluded(&role)) {
            continue;
        }

        if let Some(name) = first_text(&config.organisation_name, party) {
            push_unique(&mut organisations, name);
        }

        let parts = [
            Some(&config.individual_forenames),
            config.individual_middle_name.as_ref(),
            Some(&config.individual_surname),
        ];
        let full_name = parts
            .into_iter()
            .flatten()
            .filter_map(|query| first_text(query, party))
            .collect::<Vec<_>>()
            .join(" ");
        if !full_name.is_empty() {
            push_unique(&mut individuals, full_name);
        }
    }

    individuals.retain(|individual| {
        !organisations
            .iter()
            .any(|organisation| organisation.eq_ignore_ascii_case(individual))
    });

    if cases.is_empty() && organisations.is_empty() && individuals.is_empty() {
        return None;
    }

    let mut summary = Map::new();
    summary.insert("cases".to_string(), Value::Array(cases));
    summary.insert(
        "organisations".to_string(),
        Value::Array(organisations.into_iter().map(Value::String).collect()),
    );
    summary.insert(
        "individuals".to_string(),
        Value::Array(individuals.into_iter().map(Value::String).collect()),
    );
    Some(Value::Object(summary))
}

/// First non-blank scalar matched by `query`, rendered as text.
fn first_text(query: &PathQuery, node: &Value) -> Option<String> {
    query.select(node).into_iter().find_map(|value| match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    })
}

fn push_unique(values: &mut Vec<String>, candidate: String) {
    if !values
        .iter()
        .any(|existing| existing.eq_ignore_ascii_case(&candidate))
    {
        values.push(candidate);
    }
}
