//! Reference-data seeding.

use std::collections::HashSet;

use nbops_client::{ApiClient, RemoteResult, Transport};
use nbops_schema::SeedSet;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::error::{DeployError, DeployResult};
use crate::report::Tally;

/// Comparison key for a unique value; `1` and `"1"` are the same record.
fn unique_key(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Values of `field` already present in `collection`, fetched in one paginated lookup.
async fn existing_values<T: Transport>(
    client: &ApiClient<T>,
    collection: &str,
    field: &str,
    wanted: Vec<Value>,
) -> RemoteResult<HashSet<String>> {
    if wanted.is_empty() {
        return Ok(HashSet::new());
    }
    let mut filter = serde_json::Map::new();
    filter.insert(field.to_string(), json!({ "$in": wanted }));
    let params = json!({ "filter": filter, "fields": [field] });
    let rows = client
        .list_all(&format!("{collection}:list"), Some(&params), None)
        .await?;
    Ok(rows
        .iter()
        .filter_map(|row| row.get(field))
        .map(unique_key)
        .collect())
}

/// Create each record of `set` that is not already present.
///
/// # Errors
///
/// Returns [`DeployError::Remote`] when the server becomes unreachable. A
/// rejected lookup counts every record of the set as failed.
pub async fn seed_records<T: Transport>(client: &ApiClient<T>, set: &SeedSet) -> DeployResult<Tally> {
    let mut tally = Tally::default();
    let existing = match &set.unique_field {
        Some(field) => {
            let wanted: Vec<Value> = set
                .records
                .iter()
                .filter_map(|record| record.get(field).cloned())
                .collect();
            match existing_values(client, &set.collection, field, wanted).await {
                Ok(existing) => existing,
                Err(err) if err.is_connectivity() => {
                    return Err(DeployError::remote("seed lookup", err));
                }
                Err(err) => {
                    warn!(collection = %set.collection, error = %err, "lookup failed, set not seeded");
                    tally.failed += set.records.len();
                    return Ok(tally);
                }
            }
        }
        None => HashSet::new(),
    };

    let path = format!("{}:create", set.collection);
    for (index, record) in set.records.iter().enumerate() {
        let key = set
            .unique_field
            .as_ref()
            .and_then(|field| record.get(field))
            .map(unique_key);
        let label = key.clone().unwrap_or_else(|| format!("#{index}"));
        if key.as_ref().is_some_and(|key| existing.contains(key)) {
            tally.skipped += 1;
            info!(collection = %set.collection, record = %label, "already present, skipped");
            continue;
        }
        let outcome = client.post(&path, Value::Object(record.clone())).await;
        tally.settle("seed", &label, outcome)?;
    }
    info!(collection = %set.collection, summary = %tally.summary(), "seeded");
    Ok(tally)
}

/// Seed every set, optionally limited to one collection.
///
/// # Errors
///
/// See [`seed_records`].
pub async fn seed_all<T: Transport>(
    client: &ApiClient<T>,
    sets: &[SeedSet],
    only: Option<&str>,
) -> DeployResult<Tally> {
    let mut total = Tally::default();
    for set in sets.iter().filter(|set| only.is_none_or(|name| set.collection == name)) {
        total += seed_records(client, set).await?;
    }
    Ok(total)
}
