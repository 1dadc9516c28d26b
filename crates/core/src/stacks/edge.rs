//! REST front door: routes, authorization, and CORS preflight responders.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;
use serde_json::{json, Map, Value};

use super::compute::{ComputeOutputs, Operation};
use super::identity::IdentityOutputs;
use crate::error::{GraphError, Result};
use crate::graph::policy::actions;
use crate::graph::tokens::{get_att, join, pseudo, reference, Pseudo};
use crate::graph::{LogicalId, ResourceArn, ResourceDescriptor, ResourceGraph, ResourceKind, RoleGrant};
use crate::naming;
use crate::params::Environment;

pub const API_ID: &str = "GoalsApi";
pub const AUTHORIZER_ID: &str = "GoalsApiAuthorizer";
pub const DEPLOYMENT_ID: &str = "GoalsApiDeployment";
pub const STAGE_ID: &str = "GoalsApiStage";
pub const INVOKE_POLICY_ID: &str = "AuthenticatedInvokePolicy";

pub const COLLECTION_PATH: &str = "/goals";
pub const ITEM_PATH: &str = "/goals/{id}";

pub const ALLOW_HEADERS: &str = "Access-Control-Allow-Headers";
pub const ALLOW_ORIGIN: &str = "Access-Control-Allow-Origin";
pub const ALLOW_CREDENTIALS: &str = "Access-Control-Allow-Credentials";
pub const ALLOW_METHODS: &str = "Access-Control-Allow-Methods";

const ALLOWED_REQUEST_HEADERS: &str =
    "Content-Type,X-Amz-Date,Authorization,X-Api-Key,X-Amz-Security-Token,X-Amz-User-Agent";
const APIGATEWAY_SERVICE: &str = "apigateway.amazonaws.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Delete,
    Options,
}

impl HttpVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
            HttpVerb::Delete => "DELETE",
            HttpVerb::Options => "OPTIONS",
        }
    }

    fn pascal(&self) -> &'static str {
        match self {
            HttpVerb::Get => "Get",
            HttpVerb::Post => "Post",
            HttpVerb::Put => "Put",
            HttpVerb::Delete => "Delete",
            HttpVerb::Options => "Options",
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who may call a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Authorization {
    /// Caller identity validated against the user directory.
    UserPool { authorizer: LogicalId },
    None,
}

/// Static answer to a cross-origin capability check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreflightResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
}

impl PreflightResponse {
    /// The fixed CORS contract for a resource supporting `verbs`.
    pub fn for_verbs(verbs: &[HttpVerb]) -> Self {
        let methods = std::iter::once(HttpVerb::Options)
            .chain(verbs.iter().copied().filter(|v| *v != HttpVerb::Options))
            .map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join(",");

        let headers = [
            (ALLOW_HEADERS, ALLOWED_REQUEST_HEADERS.to_string()),
            (ALLOW_ORIGIN, "*".to_string()),
            (ALLOW_CREDENTIALS, "false".to_string()),
            (ALLOW_METHODS, methods),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            status: 200,
            headers,
        }
    }

    /// Verbs named by `Access-Control-Allow-Methods`.
    pub fn allowed_methods(&self) -> BTreeSet<&str> {
        self.headers
            .get(ALLOW_METHODS)
            .map(|m| m.split(',').map(str::trim).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RouteTarget {
    Handler(Operation),
    Preflight(PreflightResponse),
}

/// One verb on one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteBinding {
    pub path: String,
    pub verb: HttpVerb,
    pub target: RouteTarget,
    pub authorization: Authorization,
}

/// Names the edge builder takes from the parameter set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeSettings {
    pub api_name: String,
    pub authorizer_name: String,
    pub environment: Environment,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeOutputs {
    pub api: LogicalId,
    pub authorizer: LogicalId,
    pub deployment: LogicalId,
    pub stage: LogicalId,
    pub stage_name: String,
    pub routes: Vec<RouteBinding>,
    /// `https://<api>.execute-api.<region>.<suffix>/<stage>`, no trailing slash.
    pub url: Value,
}

/// The fixed routing table.
pub fn route_table() -> Vec<(&'static str, HttpVerb, Operation)> {
    vec![
        (COLLECTION_PATH, HttpVerb::Get, Operation::ListAll),
        (COLLECTION_PATH, HttpVerb::Post, Operation::Create),
        (ITEM_PATH, HttpVerb::Get, Operation::Get),
        (ITEM_PATH, HttpVerb::Put, Operation::Update),
        (ITEM_PATH, HttpVerb::Delete, Operation::Delete),
    ]
}

/// Binds every route to its handler behind the user-directory authorizer and
/// gives every routed resource an unauthenticated OPTIONS responder.
pub fn build_edge(
    graph: &mut ResourceGraph,
    compute: &ComputeOutputs,
    identity: &IdentityOutputs,
    project_name: &str,
    settings: &EdgeSettings,
) -> Result<EdgeOutputs> {
    let api = graph.add(
        ResourceDescriptor::new(API_ID, ResourceKind::RestApi)
            .property("Name", naming::scoped_name(project_name, &settings.api_name)),
    )?;

    let authorizer = graph.add(
        ResourceDescriptor::new(AUTHORIZER_ID, ResourceKind::ApiAuthorizer)
            .property("Name", settings.authorizer_name.as_str())
            .property("RestApiId", reference(&api))
            .property("Type", "COGNITO_USER_POOLS")
            .property("IdentitySource", "method.request.header.Authorization")
            .property("ProviderARNs", vec![get_att(&identity.user_pool, "Arn")]),
    )?;

    let collection = graph.add(
        ResourceDescriptor::new("GoalsResource", ResourceKind::ApiResource)
            .property("RestApiId", reference(&api))
            .property("ParentId", get_att(&api, "RootResourceId"))
            .property("PathPart", "goals"),
    )?;
    let item = graph.add(
        ResourceDescriptor::new("GoalResource", ResourceKind::ApiResource)
            .property("RestApiId", reference(&api))
            .property("ParentId", reference(&collection))
            .property("PathPart", "{id}"),
    )?;
    let resources: BTreeMap<&str, (&str, LogicalId)> = [
        (COLLECTION_PATH, ("Goals", collection)),
        (ITEM_PATH, ("Goal", item)),
    ]
    .into_iter()
    .collect();

    let table = route_table();
    let mut routes = Vec::with_capacity(table.len() + resources.len());
    let mut methods = Vec::new();

    for &(path, verb, operation) in &table {
        let (prefix, resource) = &resources[path];
        let Some(handler) = compute.handler(operation) else {
            return Err(GraphError::UnknownDependency {
                descriptor: format!("{}{}Method", prefix, verb.pascal()),
                dependency: operation.function_id(),
            }
            .into());
        };

        let uri = join([
            json!("arn:"),
            pseudo(Pseudo::Partition),
            json!(":apigateway:"),
            pseudo(Pseudo::Region),
            json!(":lambda:path/2015-03-31/functions/"),
            get_att(&handler.function, "Arn"),
            json!("/invocations"),
        ]);
        methods.push(graph.add(
            ResourceDescriptor::new(format!("{}{}Method", prefix, verb.pascal()), ResourceKind::ApiMethod)
                .property("RestApiId", reference(&api))
                .property("ResourceId", reference(resource))
                .property("HttpMethod", verb.as_str())
                .property("AuthorizationType", "COGNITO_USER_POOLS")
                .property("AuthorizerId", reference(&authorizer))
                .property(
                    "Integration",
                    json!({
                        "Type": "AWS_PROXY",
                        "IntegrationHttpMethod": "POST",
                        "Uri": uri,
                    }),
                ),
        )?);

        graph.add(
            ResourceDescriptor::new(
                format!("{}{}InvokePermission", prefix, verb.pascal()),
                ResourceKind::FunctionPermission,
            )
            .property("Action", "lambda:InvokeFunction")
            .property("FunctionName", get_att(&handler.function, "Arn"))
            .property("Principal", APIGATEWAY_SERVICE)
            .property("SourceArn", ResourceArn::ExecuteApi(api.clone()).to_value()),
        )?;

        routes.push(RouteBinding {
            path: path.to_string(),
            verb,
            target: RouteTarget::Handler(operation),
            authorization: Authorization::UserPool {
                authorizer: authorizer.clone(),
            },
        });
    }

    for (path, (prefix, resource)) in &resources {
        let verbs: Vec<HttpVerb> = table
            .iter()
            .filter(|(p, _, _)| p == path)
            .map(|(_, v, _)| *v)
            .collect();
        let preflight = PreflightResponse::for_verbs(&verbs);

        methods.push(graph.add(
            ResourceDescriptor::new(format!("{}OptionsMethod", prefix), ResourceKind::ApiMethod)
                .property("RestApiId", reference(&api))
                .property("ResourceId", reference(resource))
                .property("HttpMethod", HttpVerb::Options.as_str())
                .property("AuthorizationType", "NONE")
                .property("Integration", mock_integration(&preflight))
                .property("MethodResponses", method_responses(&preflight)),
        )?);

        routes.push(RouteBinding {
            path: path.to_string(),
            verb: HttpVerb::Options,
            target: RouteTarget::Preflight(preflight),
            authorization: Authorization::None,
        });
    }

    let mut deployment = ResourceDescriptor::new(DEPLOYMENT_ID, ResourceKind::ApiDeployment)
        .property("RestApiId", reference(&api));
    for method in &methods {
        deployment = deployment.depends_on(method);
    }
    let deployment = graph.add(deployment)?;

    let stage_name = settings.environment.slug();
    let stage = graph.add(
        ResourceDescriptor::new(STAGE_ID, ResourceKind::ApiStage)
            .property("RestApiId", reference(&api))
            .property("DeploymentId", reference(&deployment))
            .property("StageName", stage_name.as_str()),
    )?;

    graph.grant(
        INVOKE_POLICY_ID,
        RoleGrant::new(&identity.authenticated_role)
            .actions(actions::API_INVOKE)
            .resource(ResourceArn::ExecuteApi(api.clone())),
    )?;

    let url = join([
        json!("https://"),
        reference(&api),
        json!(".execute-api."),
        pseudo(Pseudo::Region),
        json!("."),
        pseudo(Pseudo::UrlSuffix),
        json!(format!("/{}", stage_name)),
    ]);

    tracing::debug!(routes = routes.len(), %stage_name, "edge descriptors added");

    Ok(EdgeOutputs {
        api,
        authorizer,
        deployment,
        stage,
        stage_name,
        routes,
        url,
    })
}

fn mock_integration(preflight: &PreflightResponse) -> Value {
    let parameters: Map<String, Value> = preflight
        .headers
        .iter()
        .map(|(k, v)| (format!("method.response.header.{}", k), json!(format!("'{}'", v))))
        .collect();

    json!({
        "Type": "MOCK",
        "RequestTemplates": { "application/json": "{\"statusCode\": 200}" },
        "IntegrationResponses": [{
            "StatusCode": preflight.status.to_string(),
            "ResponseParameters": parameters,
        }],
    })
}

fn method_responses(preflight: &PreflightResponse) -> Value {
    let parameters: Map<String, Value> = preflight
        .headers
        .keys()
        .map(|k| (format!("method.response.header.{}", k), json!(true)))
        .collect();

    json!([{
        "StatusCode": preflight.status.to_string(),
        "ResponseParameters": parameters,
    }])
}

/// Checks the routing surface.
///
/// Every non-preflight verb must require caller authorization, and every
/// path carrying one must also expose an unauthenticated OPTIONS responder
/// that answers 200 with exactly the four CORS headers, listing the path's
/// verbs.
pub fn validate_routes(routes: &[RouteBinding]) -> std::result::Result<(), GraphError> {
    let mut by_path: BTreeMap<&str, Vec<&RouteBinding>> = BTreeMap::new();
    for route in routes {
        by_path.entry(route.path.as_str()).or_default().push(route);
    }

    for (path, bindings) in by_path {
        let verbs: BTreeSet<&str> = bindings
            .iter()
            .filter(|b| b.verb != HttpVerb::Options)
            .map(|b| b.verb.as_str())
            .collect();

        for binding in bindings.iter().filter(|b| b.verb != HttpVerb::Options) {
            if binding.authorization == Authorization::None {
                return Err(GraphError::UnauthorizedRoute {
                    path: path.to_string(),
                    verb: binding.verb.to_string(),
                });
            }
        }

        if verbs.is_empty() {
            continue;
        }

        let invalid = |reason: String| GraphError::InvalidPreflight {
            path: path.to_string(),
            reason,
        };

        let Some(options) = bindings.iter().find(|b| b.verb == HttpVerb::Options) else {
            return Err(GraphError::MissingPreflight {
                path: path.to_string(),
            });
        };
        let RouteTarget::Preflight(preflight) = &options.target else {
            return Err(invalid("responder invokes a handler".to_string()));
        };
        if options.authorization != Authorization::None {
            return Err(invalid("responder requires authorization".to_string()));
        }
        if preflight.status != 200 {
            return Err(invalid(format!("status is {}", preflight.status)));
        }

        let expected: BTreeSet<&str> = [ALLOW_HEADERS, ALLOW_ORIGIN, ALLOW_CREDENTIALS, ALLOW_METHODS]
            .into_iter()
            .collect();
        let present: BTreeSet<&str> = preflight.headers.keys().map(String::as_str).collect();
        if present != expected {
            return Err(invalid(format!(
                "headers are [{}]",
                present.into_iter().collect::<Vec<_>>().join(", ")
            )));
        }
        if preflight.headers[ALLOW_ORIGIN] != "*" {
            return Err(invalid(format!("{} must be '*'", ALLOW_ORIGIN)));
        }
        if preflight.headers[ALLOW_CREDENTIALS] != "false" {
            return Err(invalid(format!("{} must be 'false'", ALLOW_CREDENTIALS)));
        }

        let allowed = preflight.allowed_methods();
        if let Some(missing) = verbs.iter().find(|v| !allowed.contains(*v)) {
            return Err(invalid(format!("{} does not list {}", ALLOW_METHODS, missing)));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::fixtures::config;
    use crate::stacks::compute::build_handlers;
    use crate::stacks::identity::{build_identity, IdentitySettings};
    use crate::stacks::storage::{build_storage, TableSettings};

    fn build() -> (ResourceGraph, IdentityOutputs, EdgeOutputs) {
        let cfg = config("MyCDKGoals", "Test");
        let mut graph = ResourceGraph::new();
        let storage = build_storage(
            &mut graph,
            "MyCDKGoals",
            &TableSettings {
                table_name: "CDKGoals".to_string(),
                partition_key: "userId".to_string(),
                sort_key: "goalId".to_string(),
            },
        )
        .unwrap();
        let compute = build_handlers(&mut graph, &storage, "MyCDKGoals", &cfg.handlers).unwrap();
        let identity = build_identity(
            &mut graph,
            "MyCDKGoals",
            &IdentitySettings {
                user_pool_name: "UserPool".to_string(),
                user_pool_client_name: "UserPoolClient".to_string(),
                identity_pool_name: "Identity".to_string(),
                allow_unauthenticated: false,
                password_policy: cfg.password_policy,
                verification: cfg.verification,
            },
        )
        .unwrap();
        let edge = build_edge(
            &mut graph,
            &compute,
            &identity,
            "MyCDKGoals",
            &EdgeSettings {
                api_name: "apiGw".to_string(),
                authorizer_name: "apiAuthorizer".to_string(),
                environment: Environment::DevLocal,
            },
        )
        .unwrap();
        (graph, identity, edge)
    }

    #[test]
    fn test_routing_surface() {
        let (_, _, edge) = build();
        let bound: Vec<(String, HttpVerb)> = edge
            .routes
            .iter()
            .map(|r| (r.path.clone(), r.verb))
            .collect();

        for (path, verb) in [
            (COLLECTION_PATH, HttpVerb::Get),
            (COLLECTION_PATH, HttpVerb::Post),
            (COLLECTION_PATH, HttpVerb::Options),
            (ITEM_PATH, HttpVerb::Get),
            (ITEM_PATH, HttpVerb::Put),
            (ITEM_PATH, HttpVerb::Delete),
            (ITEM_PATH, HttpVerb::Options),
        ] {
            assert!(bound.contains(&(path.to_string(), verb)), "{verb} {path}");
        }
        assert_eq!(bound.len(), 7);
    }

    #[test]
    fn test_built_routes_validate() {
        let (_, _, edge) = build();
        assert_eq!(validate_routes(&edge.routes), Ok(()));
    }

    #[test]
    fn test_preflight_contract() {
        let (graph, _, edge) = build();
        let options = edge
            .routes
            .iter()
            .find(|r| r.path == ITEM_PATH && r.verb == HttpVerb::Options)
            .unwrap();
        let RouteTarget::Preflight(preflight) = &options.target else {
            panic!("expected preflight");
        };

        assert_eq!(preflight.status, 200);
        assert_eq!(preflight.headers.len(), 4);
        assert_eq!(preflight.headers[ALLOW_METHODS], "OPTIONS,GET,PUT,DELETE");

        let method = graph.get(&LogicalId::new("GoalOptionsMethod")).unwrap();
        assert_eq!(method.properties["AuthorizationType"], "NONE");
        assert_eq!(method.properties["Integration"]["Type"], "MOCK");
    }

    #[test]
    fn test_handler_routes_require_authorizer() {
        let (graph, _, edge) = build();
        let method = graph.get(&LogicalId::new("GoalsPostMethod")).unwrap();

        assert_eq!(method.properties["AuthorizationType"], "COGNITO_USER_POOLS");
        assert_eq!(method.properties["AuthorizerId"], reference(&edge.authorizer));
    }

    #[test]
    fn test_stage_named_by_environment() {
        let (graph, _, edge) = build();
        assert_eq!(edge.stage_name, "dev-local");
        assert_eq!(graph.get(&edge.stage).unwrap().properties["StageName"], "dev-local");
    }

    #[test]
    fn test_url_has_no_trailing_slash() {
        let (_, _, edge) = build();
        let parts = edge.url["Fn::Join"][1].as_array().unwrap();
        assert_eq!(parts.last().unwrap(), "/dev-local");
    }

    #[test]
    fn test_authenticated_role_may_invoke_api() {
        let (graph, identity, edge) = build();
        let grants = graph.grants_for(&identity.authenticated_role);
        assert!(grants.iter().any(|(resource, action)| {
            *resource == ResourceArn::ExecuteApi(edge.api.clone())
                && action.as_str() == "execute-api:Invoke"
        }));
        assert!(graph
            .grants_for(&identity.unauthenticated_role)
            .iter()
            .all(|(_, action)| action.as_str() != "execute-api:Invoke"));
    }

    #[test]
    fn test_missing_preflight_is_rejected() {
        let (_, _, edge) = build();
        let routes: Vec<RouteBinding> = edge
            .routes
            .into_iter()
            .filter(|r| !(r.path == COLLECTION_PATH && r.verb == HttpVerb::Options))
            .collect();

        assert_eq!(
            validate_routes(&routes),
            Err(GraphError::MissingPreflight {
                path: COLLECTION_PATH.to_string()
            })
        );
    }

    #[test]
    fn test_extra_preflight_header_is_rejected() {
        let (_, _, mut edge) = build();
        for route in &mut edge.routes {
            if let RouteTarget::Preflight(preflight) = &mut route.target {
                preflight
                    .headers
                    .insert("Access-Control-Max-Age".to_string(), "600".to_string());
            }
        }
        assert!(matches!(
            validate_routes(&edge.routes),
            Err(GraphError::InvalidPreflight { .. })
        ));
    }

    #[test]
    fn test_unauthorized_handler_route_is_rejected() {
        let (_, _, mut edge) = build();
        edge.routes[0].authorization = Authorization::None;
        assert!(matches!(
            validate_routes(&edge.routes),
            Err(GraphError::UnauthorizedRoute { .. })
        ));
    }

    #[test]
    fn test_preflight_requiring_auth_is_rejected() {
        let (_, _, mut edge) = build();
        let authorizer = edge.authorizer.clone();
        for route in &mut edge.routes {
            if route.verb == HttpVerb::Options {
                route.authorization = Authorization::UserPool {
                    authorizer: authorizer.clone(),
                };
            }
        }
        assert!(matches!(
            validate_routes(&edge.routes),
            Err(GraphError::InvalidPreflight { .. })
        ));
    }
}
