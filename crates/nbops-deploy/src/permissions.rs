//! Roles, strategies and per-collection grants.

use nbops_client::{ApiClient, ApiRequest, Method, RemoteError, RemoteResult, Transport};
use nbops_schema::{ResourceGrant, RoleSpec};
use serde_json::{Value, json};
use tracing::info;

use crate::error::{DeployError, DeployResult};
use crate::report::Tally;

/// Result of evaluating whether a role may perform an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionCheck {
    /// Role evaluated.
    pub role: String,
    /// Collection evaluated.
    pub collection: String,
    /// Action evaluated.
    pub action: String,
    /// Allowed by the role's global strategy.
    pub by_strategy: bool,
    /// Allowed by a collection-specific grant; `None` when the role has no
    /// configuration for the collection.
    pub by_resource: Option<bool>,
}

impl PermissionCheck {
    /// Whether either path allows the action.
    #[must_use]
    pub fn allowed(&self) -> bool {
        self.by_strategy || self.by_resource == Some(true)
    }

    /// Which path granted the action.
    #[must_use]
    pub fn via(&self) -> Option<&'static str> {
        if self.by_resource == Some(true) {
            Some("resource")
        } else if self.by_strategy {
            Some("strategy")
        } else {
            None
        }
    }
}

/// One entry per action; `fields` only when the grant restricts them.
fn action_entries(grant: &ResourceGrant) -> Vec<Value> {
    let fields = grant.fields.as_ref().filter(|fields| !fields.is_empty());
    grant
        .actions
        .iter()
        .map(|action| match fields {
            Some(fields) => json!({ "name": action, "fields": fields }),
            None => json!({ "name": action }),
        })
        .collect()
}

/// Replace the global strategy actions of `role`.
///
/// # Errors
///
/// Returns the transport's error unchanged.
pub async fn set_strategy<T: Transport>(
    client: &ApiClient<T>,
    role: &str,
    actions: &[String],
) -> RemoteResult<Value> {
    client
        .request(
            ApiRequest::post("roles:update", json!({ "strategy": { "actions": actions } }))
                .with_param("filterByTk", role),
        )
        .await
}

/// Create or update one grant per entry in `grants`.
///
/// # Errors
///
/// Returns [`DeployError::Remote`] when the server becomes unreachable.
pub async fn grant_resources<T: Transport>(
    client: &ApiClient<T>,
    role: &str,
    grants: &[ResourceGrant],
) -> DeployResult<Tally> {
    let mut tally = Tally::default();
    for grant in grants {
        let lookup = client
            .get(
                &format!("roles/{role}/resources:list"),
                Some(&json!({ "filter": { "name": grant.collection } })),
            )
            .await;
        let existing = match lookup {
            Ok(payload) => payload
                .get("data")
                .and_then(Value::as_array)
                .and_then(|rows| rows.first())
                .and_then(|row| row.get("name"))
                .and_then(Value::as_str)
                .map(str::to_string),
            Err(err) if err.is_connectivity() => {
                return Err(DeployError::remote("resources:list", err));
            }
            Err(err) => {
                tally.settle::<()>("resources:list", &grant.collection, Err(err))?;
                continue;
            }
        };

        let actions = action_entries(grant);
        let outcome = match existing {
            Some(name) => {
                client
                    .request(
                        ApiRequest::post(
                            format!("roles/{role}/resources:update"),
                            json!({ "usingActionsConfig": true, "actions": actions }),
                        )
                        .with_param("filterByTk", name),
                    )
                    .await
            }
            None => {
                client
                    .post(
                        &format!("roles/{role}/resources:create"),
                        json!({
                            "name": grant.collection,
                            "usingActionsConfig": true,
                            "actions": actions,
                        }),
                    )
                    .await
            }
        };
        let item = format!("{role}/{}", grant.collection);
        tally.settle("grant", &item, outcome)?;
    }
    Ok(tally)
}

/// Remove the grant of `role` on `collection`.
///
/// # Errors
///
/// Returns [`DeployError::Remote`] when the call fails.
pub async fn revoke_resource<T: Transport>(
    client: &ApiClient<T>,
    role: &str,
    collection: &str,
) -> DeployResult<()> {
    client
        .request(
            ApiRequest::new(Method::Post, format!("roles/{role}/resources:destroy"))
                .with_param("filter", json!({ "name": collection })),
        )
        .await
        .map_err(|source| DeployError::remote("resources:destroy", source))?;
    info!(role, collection, "grant revoked");
    Ok(())
}

async fn fetch_role<T: Transport>(client: &ApiClient<T>, name: &str, appends: bool) -> RemoteResult<Option<Value>> {
    let mut params = json!({ "filterByTk": name });
    if appends {
        params["appends"] = json!(["resources", "resources.actions"]);
    }
    match client.get("roles:get", Some(&params)).await {
        Ok(payload) => Ok(payload.get("data").filter(|data| !data.is_null()).cloned()),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

/// Make sure `spec` exists with its strategy and grants.
///
/// # Errors
///
/// Returns [`DeployError::Remote`] when the server becomes unreachable. A
/// rejected lookup counts the role as failed and leaves it untouched.
pub async fn ensure_role<T: Transport>(client: &ApiClient<T>, spec: &RoleSpec) -> DeployResult<Tally> {
    let mut tally = Tally::default();
    let existing = match fetch_role(client, &spec.name, false).await {
        Ok(existing) => existing,
        Err(err) => {
            tally.settle::<()>("roles:get", &spec.name, Err(err))?;
            return Ok(tally);
        }
    };

    if existing.is_none() {
        info!(role = %spec.name, "creating role");
        let title = spec.title.clone().unwrap_or_else(|| spec.name.clone());
        let outcome = client
            .post("roles:create", json!({ "name": spec.name, "title": title }))
            .await;
        tally.settle("roles:create", &spec.name, outcome)?;
    }

    if let Some(actions) = &spec.strategy_actions {
        let outcome = set_strategy(client, &spec.name, actions).await;
        tally.settle("roles:update", &spec.name, outcome)?;
    }

    tally += grant_resources(client, &spec.name, &spec.resources).await?;
    info!(role = %spec.name, %tally, "role converged");
    Ok(tally)
}

/// [`ensure_role`] for every role.
///
/// # Errors
///
/// See [`ensure_role`].
pub async fn ensure_roles<T: Transport>(client: &ApiClient<T>, roles: &[RoleSpec]) -> DeployResult<Tally> {
    let mut total = Tally::default();
    for role in roles {
        total += ensure_role(client, role).await?;
    }
    Ok(total)
}

/// Evaluate whether `role` may perform `action` on `collection`.
///
/// # Errors
///
/// Returns [`DeployError::Remote`] when the role cannot be fetched or does not exist.
pub async fn check_permission<T: Transport>(
    client: &ApiClient<T>,
    role: &str,
    collection: &str,
    action: &str,
) -> DeployResult<PermissionCheck> {
    let fetched = fetch_role(client, role, true)
        .await
        .map_err(|source| DeployError::remote("roles:get", source))?
        .ok_or_else(|| {
            DeployError::remote(
                "roles:get",
                RemoteError::NotFound {
                    message: format!("role '{role}' does not exist"),
                },
            )
        })?;

    let by_strategy = fetched
        .pointer("/strategy/actions")
        .and_then(Value::as_array)
        .is_some_and(|actions| actions.iter().any(|entry| entry.as_str() == Some(action)));

    let by_resource = fetched
        .get("resources")
        .and_then(Value::as_array)
        .and_then(|resources| {
            resources
                .iter()
                .find(|resource| resource.get("name").and_then(Value::as_str) == Some(collection))
        })
        .map(|resource| {
            let configured = resource
                .get("usingActionsConfig")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            configured
                && resource
                    .get("actions")
                    .and_then(Value::as_array)
                    .is_some_and(|actions| {
                        actions
                            .iter()
                            .any(|entry| entry.get("name").and_then(Value::as_str) == Some(action))
                    })
        });

    Ok(PermissionCheck {
        role: role.to_string(),
        collection: collection.to_string(),
        action: action.to_string(),
        by_strategy,
        by_resource,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nbops_telemetry::MemoryActionLog;
    use nbops_test_support::RecordingTransport;
    use nbops_test_support::fixtures::nurse_role;
    use std::sync::Arc;

    fn client_for(transport: RecordingTransport) -> ApiClient<RecordingTransport> {
        ApiClient::new(transport, Arc::new(MemoryActionLog::new()), "roles")
    }

    #[tokio::test]
    async fn missing_role_is_created_then_granted() -> anyhow::Result<()> {
        let transport = RecordingTransport::new().on(
            Method::Get,
            "roles:get",
            Err(RemoteError::NotFound {
                message: "role not found".into(),
            }),
        );
        let client = client_for(transport);
        let tally = ensure_role(&client, &nurse_role(3)).await?;

        let recorder = client.transport();
        assert_eq!(recorder.calls_to(Method::Post, "roles:create").len(), 1);
        assert_eq!(
            recorder
                .calls_to(Method::Post, "roles/nurse/resources:create")
                .len(),
            3
        );
        assert_eq!(tally, Tally { ok: 5, skipped: 0, failed: 0 });

        let first_grant = &recorder.calls_to(Method::Post, "roles/nurse/resources:create")[0];
        assert_eq!(
            first_grant.body,
            Some(json!({
                "name": "resource_0",
                "usingActionsConfig": true,
                "actions": [
                    { "name": "view", "fields": ["name"] },
                    { "name": "update", "fields": ["name"] }
                ]
            }))
        );
        let strategy = &recorder.calls_to(Method::Post, "roles:update")[0];
        assert_eq!(strategy.query.get("filterByTk"), Some(&json!("nurse")));
        Ok(())
    }

    #[tokio::test]
    async fn existing_role_and_grant_are_updated() -> anyhow::Result<()> {
        let transport = RecordingTransport::new()
            .ok(Method::Get, "roles:get", json!({ "data": { "name": "nurse" } }))
            .ok(
                Method::Get,
                "roles/nurse/resources:list",
                json!({ "data": [{ "name": "resource_0" }] }),
            );
        let client = client_for(transport);
        let mut role = nurse_role(1);
        role.strategy_actions = None;
        let tally = ensure_role(&client, &role).await?;

        let recorder = client.transport();
        assert!(recorder.calls_to(Method::Post, "roles:create").is_empty());
        let updates = recorder.calls_to(Method::Post, "roles/nurse/resources:update");
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].query.get("filterByTk"), Some(&json!("resource_0")));
        assert_eq!(tally.ok, 1);
        Ok(())
    }

    #[tokio::test]
    async fn revoke_targets_the_collection() -> anyhow::Result<()> {
        let client = client_for(RecordingTransport::new());
        revoke_resource(&client, "nurse", "beds").await?;
        let calls = client
            .transport()
            .calls_to(Method::Post, "roles/nurse/resources:destroy");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].query.get("filter"), Some(&json!({ "name": "beds" })));
        Ok(())
    }

    #[tokio::test]
    async fn check_reports_the_granting_path() -> anyhow::Result<()> {
        let transport = RecordingTransport::new().ok(
            Method::Get,
            "roles:get",
            json!({ "data": {
                "name": "nurse",
                "strategy": { "actions": ["view"] },
                "resources": [
                    { "name": "beds", "usingActionsConfig": true, "actions": [{ "name": "update" }] },
                    { "name": "areas", "usingActionsConfig": false, "actions": [{ "name": "destroy" }] }
                ]
            }}),
        );
        let client = client_for(transport);

        let by_strategy = check_permission(&client, "nurse", "patients", "view").await?;
        assert!(by_strategy.allowed());
        assert_eq!(by_strategy.via(), Some("strategy"));
        assert_eq!(by_strategy.by_resource, None);

        let by_resource = check_permission(&client, "nurse", "beds", "update").await?;
        assert_eq!(by_resource.via(), Some("resource"));

        let denied = check_permission(&client, "nurse", "areas", "destroy").await?;
        assert!(!denied.allowed());
        assert_eq!(denied.by_resource, Some(false));
        assert_eq!(denied.via(), None);
        Ok(())
    }

    #[tokio::test]
    async fn check_on_missing_role_is_an_error() {
        let client = client_for(
            RecordingTransport::new().ok(Method::Get, "roles:get", json!({ "data": null })),
        );
        let result = check_permission(&client, "ghost", "beds", "view").await;
        assert!(matches!(result, Err(DeployError::Remote { .. })));
    }

    #[tokio::test]
    async fn forbidden_lookup_fails_one_role_and_moves_on() -> anyhow::Result<()> {
        let transport = RecordingTransport::new()
            .on(
                Method::Get,
                "roles:get",
                Err(RemoteError::Unauthorized {
                    status: 403,
                    message: "no permission".into(),
                }),
            )
            .ok(Method::Get, "roles:get", json!({ "data": { "name": "doctor" } }));
        let client = client_for(transport);
        let mut doctor = nurse_role(1);
        doctor.name = "doctor".into();
        let tally = ensure_roles(&client, &[nurse_role(1), doctor]).await?;

        let recorder = client.transport();
        assert_eq!(recorder.calls_to(Method::Get, "roles:get").len(), 2);
        assert!(recorder.calls_to(Method::Get, "roles/nurse/resources:list").is_empty());
        assert_eq!(
            recorder
                .calls_to(Method::Post, "roles/doctor/resources:create")
                .len(),
            1
        );
        assert_eq!(tally, Tally { ok: 2, skipped: 0, failed: 1 });
        Ok(())
    }

    #[tokio::test]
    async fn unrestricted_grant_omits_fields() -> anyhow::Result<()> {
        let client = client_for(RecordingTransport::new());
        let grant = ResourceGrant {
            collection: "beds".into(),
            actions: vec!["view".into()],
            fields: None,
        };
        grant_resources(&client, "nurse", &[grant]).await?;

        let created = &client
            .transport()
            .calls_to(Method::Post, "roles/nurse/resources:create")[0];
        assert_eq!(
            created.body.clone().unwrap_or_default()["actions"],
            json!([{ "name": "view" }])
        );
        Ok(())
    }

    #[tokio::test]
    async fn lost_connection_during_lookup_aborts() {
        let transport = RecordingTransport::new();
        transport.go_offline(Method::Get, "roles:get");
        let client = client_for(transport);
        let result = ensure_roles(&client, &[nurse_role(1)]).await;
        assert!(matches!(result, Err(DeployError::Remote { operation: "roles:get", .. })));
    }
}
