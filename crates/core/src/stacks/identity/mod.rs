//! User directory, client registration, and identity federation.

mod lifecycle;

pub use lifecycle::{transition, LifecycleError, LifecycleEvent, UserState};

use serde_json::{json, Map, Value};

use crate::config::{PasswordPolicy, VerificationMessage};
use crate::error::Result;
use crate::graph::policy::actions;
use crate::graph::tokens::{get_att, reference};
use crate::graph::{
    FederationClaim, LogicalId, Principal, ResourceArn, ResourceDescriptor, ResourceGraph,
    ResourceKind, RoleGrant,
};
use crate::naming;

pub const SMS_ROLE_ID: &str = "UserPoolSmsRole";
pub const SMS_POLICY_ID: &str = "UserPoolSmsPolicy";
pub const USER_POOL_ID: &str = "UserPool";
pub const USER_POOL_CLIENT_ID: &str = "UserPoolClient";
pub const IDENTITY_POOL_ID: &str = "IdentityPool";
pub const UNAUTHENTICATED_ROLE_ID: &str = "UnauthenticatedRole";
pub const UNAUTHENTICATED_POLICY_ID: &str = "UnauthenticatedRolePolicy";
pub const AUTHENTICATED_ROLE_ID: &str = "AuthenticatedRole";
pub const AUTHENTICATED_POLICY_ID: &str = "AuthenticatedRolePolicy";
pub const ROLE_ATTACHMENT_ID: &str = "IdentityPoolRoleAttachment";

const IDP_SERVICE: &str = "cognito-idp.amazonaws.com";
const EMAIL_ATTRIBUTE: &str = "email";

/// Everything the identity builder is parameterized by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentitySettings {
    pub user_pool_name: String,
    pub user_pool_client_name: String,
    pub identity_pool_name: String,
    pub allow_unauthenticated: bool,
    pub password_policy: PasswordPolicy,
    pub verification: VerificationMessage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityOutputs {
    pub user_pool: LogicalId,
    pub user_pool_client: LogicalId,
    pub identity_pool: LogicalId,
    pub unauthenticated_role: LogicalId,
    pub authenticated_role: LogicalId,
    pub role_attachment: LogicalId,
    pub allow_unauthenticated: bool,
}

impl IdentityOutputs {
    /// The single trust role a federated identity with `claim` maps to.
    ///
    /// Guests map to nothing unless unauthenticated access is enabled.
    pub fn trust_role_for(&self, claim: FederationClaim) -> Option<&LogicalId> {
        match claim {
            FederationClaim::Authenticated => Some(&self.authenticated_role),
            FederationClaim::Unauthenticated if self.allow_unauthenticated => {
                Some(&self.unauthenticated_role)
            }
            FederationClaim::Unauthenticated => None,
        }
    }
}

/// Adds the user directory, its client, the identity pool, and both trust roles.
pub fn build_identity(
    graph: &mut ResourceGraph,
    project_name: &str,
    settings: &IdentitySettings,
) -> Result<IdentityOutputs> {
    let sms_role = graph.add(
        ResourceDescriptor::new(SMS_ROLE_ID, ResourceKind::Role).property(
            "AssumeRolePolicyDocument",
            Principal::Service(IDP_SERVICE).assume_role_policy(),
        ),
    )?;
    let sms_policy = graph
        .grant(
            SMS_POLICY_ID,
            RoleGrant::new(&sms_role)
                .actions(actions::SMS_PUBLISH)
                .resource(ResourceArn::Any),
        )?
        .unwrap_or_else(|| LogicalId::new(SMS_POLICY_ID));

    let user_pool = graph.add(
        ResourceDescriptor::new(USER_POOL_ID, ResourceKind::UserPool)
            .property(
                "UserPoolName",
                naming::scoped_name(project_name, &settings.user_pool_name),
            )
            .property(
                "AdminCreateUserConfig",
                json!({ "AllowAdminCreateUserOnly": false }),
            )
            .property("AliasAttributes", vec![EMAIL_ATTRIBUTE])
            .property("AutoVerifiedAttributes", vec![EMAIL_ATTRIBUTE])
            .property(
                "Schema",
                json!([{
                    "Name": EMAIL_ATTRIBUTE,
                    "AttributeDataType": "String",
                    "Required": true,
                    "Mutable": false,
                }]),
            )
            .property(
                "Policies",
                json!({ "PasswordPolicy": password_policy(&settings.password_policy) }),
            )
            .property(
                "VerificationMessageTemplate",
                json!({
                    "DefaultEmailOption": "CONFIRM_WITH_CODE",
                    "EmailSubject": settings.verification.email_subject,
                    "EmailMessage": settings.verification.email_body,
                }),
            )
            .property(
                "SmsConfiguration",
                json!({
                    "SnsCallerArn": get_att(&sms_role, "Arn"),
                    "ExternalId": format!("{}-external", project_name),
                }),
            )
            .depends_on(&sms_policy),
    )?;

    let user_pool_client = graph.add(
        ResourceDescriptor::new(USER_POOL_CLIENT_ID, ResourceKind::UserPoolClient)
            .property(
                "ClientName",
                naming::scoped_name(project_name, &settings.user_pool_client_name),
            )
            .property("UserPoolId", reference(&user_pool))
            .property("GenerateSecret", false)
            .property(
                "ExplicitAuthFlows",
                json!(["ALLOW_USER_SRP_AUTH", "ALLOW_REFRESH_TOKEN_AUTH"]),
            ),
    )?;

    let identity_pool = graph.add(
        ResourceDescriptor::new(IDENTITY_POOL_ID, ResourceKind::IdentityPool)
            .property(
                "IdentityPoolName",
                naming::identity_pool_name(project_name, &settings.identity_pool_name),
            )
            .property(
                "AllowUnauthenticatedIdentities",
                settings.allow_unauthenticated,
            )
            .property(
                "CognitoIdentityProviders",
                json!([{
                    "ClientId": reference(&user_pool_client),
                    "ProviderName": get_att(&user_pool, "ProviderName"),
                }]),
            ),
    )?;

    let unauthenticated_role = trust_role(
        graph,
        UNAUTHENTICATED_ROLE_ID,
        UNAUTHENTICATED_POLICY_ID,
        &identity_pool,
        FederationClaim::Unauthenticated,
        actions::IDENTITY_GUEST,
    )?;
    let authenticated_role = trust_role(
        graph,
        AUTHENTICATED_ROLE_ID,
        AUTHENTICATED_POLICY_ID,
        &identity_pool,
        FederationClaim::Authenticated,
        actions::IDENTITY_MEMBER,
    )?;

    let mut roles = Map::new();
    roles.insert(
        FederationClaim::Authenticated.as_str().to_string(),
        get_att(&authenticated_role, "Arn"),
    );
    if settings.allow_unauthenticated {
        roles.insert(
            FederationClaim::Unauthenticated.as_str().to_string(),
            get_att(&unauthenticated_role, "Arn"),
        );
    }
    let role_attachment = graph.add(
        ResourceDescriptor::new(
            ROLE_ATTACHMENT_ID,
            ResourceKind::IdentityPoolRoleAttachment,
        )
        .property("IdentityPoolId", reference(&identity_pool))
        .property("Roles", Value::Object(roles)),
    )?;

    tracing::debug!(
        allow_unauthenticated = settings.allow_unauthenticated,
        "identity descriptors added"
    );

    Ok(IdentityOutputs {
        user_pool,
        user_pool_client,
        identity_pool,
        unauthenticated_role,
        authenticated_role,
        role_attachment,
        allow_unauthenticated: settings.allow_unauthenticated,
    })
}

fn trust_role(
    graph: &mut ResourceGraph,
    role_id: &str,
    policy_id: &str,
    identity_pool: &LogicalId,
    claim: FederationClaim,
    permitted: &[&str],
) -> Result<LogicalId> {
    let principal = Principal::Federated {
        identity_pool: identity_pool.clone(),
        claim,
    };
    let role = graph.add(
        ResourceDescriptor::new(role_id, ResourceKind::Role)
            .property("AssumeRolePolicyDocument", principal.assume_role_policy()),
    )?;
    graph.grant(
        policy_id,
        RoleGrant::new(&role)
            .actions(permitted)
            .resource(ResourceArn::Any),
    )?;
    Ok(role)
}

fn password_policy(policy: &PasswordPolicy) -> Value {
    json!({
        "MinimumLength": policy.min_length,
        "RequireLowercase": policy.require_lowercase,
        "RequireUppercase": policy.require_uppercase,
        "RequireNumbers": policy.require_digits,
        "RequireSymbols": policy.require_symbols,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::config::fixtures::config;
    use crate::graph::Action;

    fn settings(allow_unauthenticated: bool) -> IdentitySettings {
        let cfg = config("MyCDKGoals", "Test");
        IdentitySettings {
            user_pool_name: "UserPool".to_string(),
            user_pool_client_name: "UserPoolClient".to_string(),
            identity_pool_name: "Identity".to_string(),
            allow_unauthenticated,
            password_policy: cfg.password_policy,
            verification: cfg.verification,
        }
    }

    fn actions_of(graph: &ResourceGraph, role: &LogicalId) -> BTreeSet<Action> {
        graph.grants_for(role).into_iter().map(|(_, a)| a).collect()
    }

    #[test]
    fn test_email_is_required_and_immutable() {
        let mut graph = ResourceGraph::new();
        let out = build_identity(&mut graph, "MyCDKGoals", &settings(false)).unwrap();
        let pool = graph.get(&out.user_pool).unwrap();

        let schema = &pool.properties["Schema"][0];
        assert_eq!(schema["Name"], "email");
        assert_eq!(schema["Required"], true);
        assert_eq!(schema["Mutable"], false);
        assert_eq!(
            pool.properties["VerificationMessageTemplate"]["DefaultEmailOption"],
            "CONFIRM_WITH_CODE"
        );
    }

    #[test]
    fn test_password_policy_is_configuration() {
        let mut identity = settings(false);
        identity.password_policy.min_length = 12;
        identity.password_policy.require_symbols = true;

        let mut graph = ResourceGraph::new();
        let out = build_identity(&mut graph, "MyCDKGoals", &identity).unwrap();
        let policy = &graph.get(&out.user_pool).unwrap().properties["Policies"]["PasswordPolicy"];

        assert_eq!(policy["MinimumLength"], 12);
        assert_eq!(policy["RequireSymbols"], true);
        assert_eq!(policy["RequireUppercase"], false);
    }

    #[test]
    fn test_trust_roles_have_distinct_permissions() {
        let mut graph = ResourceGraph::new();
        let out = build_identity(&mut graph, "MyCDKGoals", &settings(true)).unwrap();

        let guest = actions_of(&graph, &out.unauthenticated_role);
        let member = actions_of(&graph, &out.authenticated_role);
        assert!(!guest.is_empty());
        assert_ne!(guest, member);
    }

    #[test]
    fn test_guest_role_only_attached_when_allowed() {
        let mut graph = ResourceGraph::new();
        let out = build_identity(&mut graph, "MyCDKGoals", &settings(false)).unwrap();
        let attachment = graph.get(&out.role_attachment).unwrap();

        assert!(attachment.properties["Roles"].get("unauthenticated").is_none());
        assert!(attachment.properties["Roles"].get("authenticated").is_some());
        assert_eq!(out.trust_role_for(FederationClaim::Unauthenticated), None);
        assert_eq!(
            graph.get(&out.identity_pool).unwrap().properties["AllowUnauthenticatedIdentities"],
            false
        );
    }

    #[test]
    fn test_each_claim_maps_to_exactly_one_role() {
        let mut graph = ResourceGraph::new();
        let out = build_identity(&mut graph, "MyCDKGoals", &settings(true)).unwrap();

        assert_eq!(
            out.trust_role_for(FederationClaim::Authenticated),
            Some(&out.authenticated_role)
        );
        assert_eq!(
            out.trust_role_for(FederationClaim::Unauthenticated),
            Some(&out.unauthenticated_role)
        );
    }

    #[test]
    fn test_client_has_no_secret() {
        let mut graph = ResourceGraph::new();
        let out = build_identity(&mut graph, "MyCDKGoals", &settings(false)).unwrap();
        let client = graph.get(&out.user_pool_client).unwrap();

        assert_eq!(client.properties["GenerateSecret"], false);
        assert_eq!(client.properties["ClientName"], "MyCDKGoals-UserPoolClient");
    }

    #[test]
    fn test_sms_role_can_publish() {
        let mut graph = ResourceGraph::new();
        build_identity(&mut graph, "MyCDKGoals", &settings(false)).unwrap();

        let granted = actions_of(&graph, &LogicalId::new(SMS_ROLE_ID));
        assert_eq!(
            granted.into_iter().collect::<Vec<_>>(),
            vec![Action::new("sns:Publish")]
        );
    }
}
