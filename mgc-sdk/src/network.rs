//! Network API client: VPCs, subnets, security groups and public IPs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::common::IdResponse;
use crate::error::{Result, SdkError};

const BASE: &str = "network/v0";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Vpc {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub is_default: Option<bool>,
    pub tenant_id: Option<String>,
    pub router_id: Option<String>,
    pub external_network: Option<String>,
    #[serde(default)]
    pub subnets: Vec<String>,
    #[serde(default)]
    pub security_groups: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Subnet {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub vpc_id: String,
    pub cidr_block: String,
    pub ip_version: String,
    pub gateway_ip: Option<String>,
    #[serde(default)]
    pub dns_nameservers: Vec<String>,
    pub subnetpool_id: Option<String>,
    pub zone: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SubnetCreateRequest {
    pub name: String,
    pub cidr_block: String,
    pub ip_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dns_nameservers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnetpool_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SecurityGroup {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub vpc_id: Option<String>,
    pub status: String,
    pub error: Option<String>,
    pub is_default: Option<bool>,
    #[serde(default)]
    pub rules: Vec<Rule>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default, skip_serializing)]
    pub id: Option<String>,
    #[serde(default, skip_serializing)]
    pub security_group_id: Option<String>,
    pub direction: Option<String>,
    pub ethertype: Option<String>,
    pub protocol: Option<String>,
    pub port_range_min: Option<i64>,
    pub port_range_max: Option<i64>,
    pub remote_ip_prefix: Option<String>,
    pub remote_group_id: Option<String>,
    pub description: Option<String>,
    #[serde(default, skip_serializing)]
    pub status: Option<String>,
    #[serde(default, skip_serializing)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Rule {
    /// Check a rule before it is submitted
    pub fn validate(&self) -> Result<()> {
        match self.direction.as_deref() {
            Some("ingress") | Some("egress") => {}
            other => {
                return Err(SdkError::validation(
                    "direction",
                    format!("must be 'ingress' or 'egress', got {:?}", other),
                ));
            }
        }
        match self.ethertype.as_deref() {
            Some("IPv4") | Some("IPv6") => {}
            other => {
                return Err(SdkError::validation(
                    "ethertype",
                    format!("must be 'IPv4' or 'IPv6', got {:?}", other),
                ));
            }
        }
        for (field, port) in [
            ("port_range_min", self.port_range_min),
            ("port_range_max", self.port_range_max),
        ] {
            if let Some(port) = port
                && !(0..=65535).contains(&port)
            {
                return Err(SdkError::validation(
                    field,
                    format!("must be between 0 and 65535, got {}", port),
                ));
            }
        }
        if let (Some(min), Some(max)) = (self.port_range_min, self.port_range_max)
            && min > max
        {
            return Err(SdkError::validation(
                "port_range_min",
                format!("{} is greater than port_range_max {}", min, max),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PublicIp {
    pub id: String,
    pub vpc_id: Option<String>,
    pub public_ip: Option<String>,
    pub description: Option<String>,
    pub port_id: Option<String>,
    pub status: String,
    pub error: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct VpcList {
    #[serde(default)]
    vpcs: Vec<Vpc>,
}

#[derive(Deserialize)]
struct SubnetList {
    #[serde(default)]
    subnets: Vec<Subnet>,
}

#[derive(Deserialize)]
struct SecurityGroupList {
    #[serde(default)]
    security_groups: Vec<SecurityGroup>,
}

/// Network API client
#[derive(Debug, Clone)]
pub struct NetworkClient {
    client: Client,
}

impl NetworkClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    // =========================================================================
    // VPCs
    // =========================================================================

    pub async fn create_vpc(&self, name: &str, description: Option<&str>) -> Result<String> {
        if name.trim().is_empty() {
            return Err(SdkError::validation("name", "must not be empty"));
        }
        let created: IdResponse = self
            .client
            .post(
                &format!("{}/vpcs", BASE),
                &serde_json::json!({ "name": name, "description": description }),
            )
            .await?;
        Ok(created.id)
    }

    pub async fn get_vpc(&self, id: &str) -> Result<Vpc> {
        self.client.get(&format!("{}/vpcs/{}", BASE, id), &[]).await
    }

    pub async fn list_vpcs(&self) -> Result<Vec<Vpc>> {
        let list: VpcList = self.client.get(&format!("{}/vpcs", BASE), &[]).await?;
        Ok(list.vpcs)
    }

    pub async fn delete_vpc(&self, id: &str) -> Result<()> {
        self.client
            .delete(&format!("{}/vpcs/{}", BASE, id), &[])
            .await
    }

    // =========================================================================
    // Subnets
    // =========================================================================

    pub async fn create_subnet(
        &self,
        vpc_id: &str,
        request: &SubnetCreateRequest,
    ) -> Result<String> {
        if !matches!(request.ip_version.as_str(), "IPv4" | "IPv6") {
            return Err(SdkError::validation(
                "ip_version",
                format!("must be 'IPv4' or 'IPv6', got '{}'", request.ip_version),
            ));
        }
        let created: IdResponse = self
            .client
            .post(&format!("{}/vpcs/{}/subnets", BASE, vpc_id), request)
            .await?;
        Ok(created.id)
    }

    pub async fn get_subnet(&self, id: &str) -> Result<Subnet> {
        self.client
            .get(&format!("{}/subnets/{}", BASE, id), &[])
            .await
    }

    pub async fn list_subnets(&self, vpc_id: &str) -> Result<Vec<Subnet>> {
        let list: SubnetList = self
            .client
            .get(&format!("{}/vpcs/{}/subnets", BASE, vpc_id), &[])
            .await?;
        Ok(list.subnets)
    }

    pub async fn update_subnet_dns(&self, id: &str, dns_nameservers: &[String]) -> Result<()> {
        self.client
            .patch(
                &format!("{}/subnets/{}", BASE, id),
                &serde_json::json!({ "dns_nameservers": dns_nameservers }),
            )
            .await
    }

    pub async fn delete_subnet(&self, id: &str) -> Result<()> {
        self.client
            .delete(&format!("{}/subnets/{}", BASE, id), &[])
            .await
    }

    // =========================================================================
    // Security groups and rules
    // =========================================================================

    pub async fn create_security_group(
        &self,
        name: &str,
        description: Option<&str>,
        skip_default_rules: bool,
    ) -> Result<String> {
        let created: IdResponse = self
            .client
            .post(
                &format!("{}/security_groups", BASE),
                &serde_json::json!({ "name": name, "description": description }),
            )
            .await?;
        if skip_default_rules {
            for rule in self.get_security_group(&created.id).await?.rules {
                if let Some(rule_id) = rule.id {
                    self.delete_rule(&rule_id).await?;
                }
            }
        }
        Ok(created.id)
    }

    pub async fn get_security_group(&self, id: &str) -> Result<SecurityGroup> {
        self.client
            .get(&format!("{}/security_groups/{}", BASE, id), &[])
            .await
    }

    pub async fn list_security_groups(&self) -> Result<Vec<SecurityGroup>> {
        let list: SecurityGroupList = self
            .client
            .get(&format!("{}/security_groups", BASE), &[])
            .await?;
        Ok(list.security_groups)
    }

    pub async fn delete_security_group(&self, id: &str) -> Result<()> {
        self.client
            .delete(&format!("{}/security_groups/{}", BASE, id), &[])
            .await
    }

    pub async fn create_rule(&self, security_group_id: &str, rule: &Rule) -> Result<String> {
        rule.validate()?;
        let created: IdResponse = self
            .client
            .post(
                &format!("{}/security_groups/{}/rules", BASE, security_group_id),
                rule,
            )
            .await?;
        Ok(created.id)
    }

    pub async fn get_rule(&self, id: &str) -> Result<Rule> {
        self.client.get(&format!("{}/rules/{}", BASE, id), &[]).await
    }

    pub async fn delete_rule(&self, id: &str) -> Result<()> {
        self.client
            .delete(&format!("{}/rules/{}", BASE, id), &[])
            .await
    }

    // =========================================================================
    // Public IPs
    // =========================================================================

    pub async fn create_public_ip(&self, vpc_id: &str, description: Option<&str>) -> Result<String> {
        let created: IdResponse = self
            .client
            .post(
                &format!("{}/vpcs/{}/public_ips", BASE, vpc_id),
                &serde_json::json!({ "description": description }),
            )
            .await?;
        Ok(created.id)
    }

    pub async fn get_public_ip(&self, id: &str) -> Result<PublicIp> {
        self.client
            .get(&format!("{}/public_ips/{}", BASE, id), &[])
            .await
    }

    pub async fn attach_public_ip(&self, id: &str, port_id: &str) -> Result<()> {
        self.client
            .post_action(
                &format!("{}/public_ips/{}/attach/{}", BASE, id, port_id),
                &serde_json::json!({}),
            )
            .await
    }

    pub async fn detach_public_ip(&self, id: &str, port_id: &str) -> Result<()> {
        self.client
            .post_action(
                &format!("{}/public_ips/{}/detach/{}", BASE, id, port_id),
                &serde_json::json!({}),
            )
            .await
    }

    pub async fn delete_public_ip(&self, id: &str) -> Result<()> {
        self.client
            .delete(&format!("{}/public_ips/{}", BASE, id), &[])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn network(server: &MockServer) -> NetworkClient {
        let config =
            ClientConfig::new(server.uri(), "k").with_retries(0, Duration::from_millis(1));
        NetworkClient::new(Client::new(config).unwrap())
    }

    fn rule() -> Rule {
        Rule {
            id: None,
            security_group_id: None,
            direction: Some("ingress".into()),
            ethertype: Some("IPv4".into()),
            protocol: Some("tcp".into()),
            port_range_min: Some(22),
            port_range_max: Some(22),
            remote_ip_prefix: Some("0.0.0.0/0".into()),
            remote_group_id: None,
            description: None,
            status: None,
            created_at: None,
        }
    }

    #[test]
    fn valid_rule() {
        assert!(rule().validate().is_ok());
    }

    #[test]
    fn rule_port_range_must_be_ordered() {
        let rule = Rule {
            port_range_min: Some(443),
            port_range_max: Some(80),
            ..rule()
        };
        let err = rule.validate().unwrap_err();
        assert!(matches!(err, SdkError::Validation(ref v) if v.field == "port_range_min"));
    }

    #[test]
    fn rule_rejects_unknown_ethertype() {
        let rule = Rule {
            ethertype: Some("ipx".into()),
            ..rule()
        };
        assert!(rule.validate().is_err());
    }

    #[test]
    fn rule_serializes_only_request_fields() {
        let value = serde_json::to_value(Rule {
            id: Some("r-1".into()),
            status: Some("created".into()),
            ..rule()
        })
        .unwrap();
        assert!(value.get("id").is_none());
        assert!(value.get("status").is_none());
        assert_eq!(value["port_range_min"], 22);
    }

    #[tokio::test]
    async fn get_vpc_maps_optional_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/network/v0/vpcs/vpc-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "vpc-1",
                "name": "main",
                "status": "created",
                "subnets": ["s-1"]
            })))
            .mount(&server)
            .await;

        let vpc = network(&server).get_vpc("vpc-1").await.unwrap();
        assert_eq!(vpc.name, "main");
        assert_eq!(vpc.subnets, vec!["s-1".to_string()]);
        assert!(vpc.description.is_none());
        assert!(vpc.security_groups.is_empty());
    }

    #[tokio::test]
    async fn skip_default_rules_deletes_seeded_rules() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/network/v0/security_groups"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "sg-1"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/network/v0/security_groups/sg-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "sg-1",
                "name": "web",
                "status": "created",
                "rules": [{"id": "r-1", "direction": "egress", "ethertype": "IPv4"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/network/v0/rules/r-1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let id = network(&server)
            .create_security_group("web", None, true)
            .await
            .unwrap();
        assert_eq!(id, "sg-1");
    }
}
