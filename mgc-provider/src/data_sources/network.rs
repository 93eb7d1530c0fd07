//! Network data sources

use async_trait::async_trait;
use mgc_core::diagnostic::Diagnostic;
use mgc_core::provider::ProviderResult;
use mgc_core::resource::{Attributes, Value};
use mgc_core::schema::ResourceSchema;
use mgc_sdk::network::NetworkClient;

use crate::adapter::{Configure, DataSourceAdapter};
use crate::context::ConfigureRequest;
use crate::data_sources::read_only;
use crate::models::network::{
    flatten_public_ip, flatten_security_group, flatten_subnet, flatten_vpc,
};
use crate::resources::network::{
    PublicIpResource, SecurityGroupResource, SubnetResource, VpcResource,
};
use crate::schemas;
use crate::tfutil::{attributes, required_str, sdk_error};

fn network(request: ConfigureRequest<'_>) -> Result<NetworkClient, Diagnostic> {
    Ok(NetworkClient::new(request.context()?.client.clone()))
}

pub struct VpcDataSource {
    network: NetworkClient,
}

impl Configure for VpcDataSource {
    const TYPE_NAME: &'static str = "mgc_network_vpc";

    fn schema() -> ResourceSchema {
        read_only(VpcResource::schema(), Self::TYPE_NAME)
            .with_description("Look up a VPC by ID")
            .attribute(schemas::id_argument("VPC"))
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        Ok(Self {
            network: network(request)?,
        })
    }
}

#[async_trait]
impl DataSourceAdapter for VpcDataSource {
    async fn read(&self, config: &Attributes) -> ProviderResult<Attributes> {
        let id = required_str(config, "id")?;
        let vpc = self.network.get_vpc(&id).await.map_err(sdk_error)?;
        Ok(flatten_vpc(&vpc))
    }
}

pub struct VpcsDataSource {
    network: NetworkClient,
}

impl Configure for VpcsDataSource {
    const TYPE_NAME: &'static str = "mgc_network_vpcs";

    fn schema() -> ResourceSchema {
        ResourceSchema::new(Self::TYPE_NAME)
            .with_description("All VPCs of the tenant")
            .attribute(schemas::computed_list(
                "items",
                schemas::object_of(read_only(VpcResource::schema(), Self::TYPE_NAME)),
            ))
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        Ok(Self {
            network: network(request)?,
        })
    }
}

#[async_trait]
impl DataSourceAdapter for VpcsDataSource {
    async fn read(&self, _config: &Attributes) -> ProviderResult<Attributes> {
        let vpcs = self.network.list_vpcs().await.map_err(sdk_error)?;
        Ok(attributes([(
            "items",
            Value::List(vpcs.iter().map(|v| Value::Map(flatten_vpc(v))).collect()),
        )]))
    }
}

pub struct SubnetDataSource {
    network: NetworkClient,
}

impl Configure for SubnetDataSource {
    const TYPE_NAME: &'static str = "mgc_network_vpcs_subnet";

    fn schema() -> ResourceSchema {
        read_only(SubnetResource::schema(), Self::TYPE_NAME)
            .with_description("Look up a subnet by ID")
            .attribute(schemas::id_argument("subnet"))
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        Ok(Self {
            network: network(request)?,
        })
    }
}

#[async_trait]
impl DataSourceAdapter for SubnetDataSource {
    async fn read(&self, config: &Attributes) -> ProviderResult<Attributes> {
        let id = required_str(config, "id")?;
        let subnet = self.network.get_subnet(&id).await.map_err(sdk_error)?;
        Ok(flatten_subnet(&subnet))
    }
}

pub struct SecurityGroupDataSource {
    network: NetworkClient,
}

impl Configure for SecurityGroupDataSource {
    const TYPE_NAME: &'static str = "mgc_network_security_group";

    fn schema() -> ResourceSchema {
        read_only(SecurityGroupResource::schema(), Self::TYPE_NAME)
            .with_description("Look up a security group and its rules by ID")
            .attribute(schemas::id_argument("security group"))
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        Ok(Self {
            network: network(request)?,
        })
    }
}

#[async_trait]
impl DataSourceAdapter for SecurityGroupDataSource {
    async fn read(&self, config: &Attributes) -> ProviderResult<Attributes> {
        let id = required_str(config, "id")?;
        let group = self
            .network
            .get_security_group(&id)
            .await
            .map_err(sdk_error)?;
        Ok(flatten_security_group(&group))
    }
}

pub struct PublicIpDataSource {
    network: NetworkClient,
}

impl Configure for PublicIpDataSource {
    const TYPE_NAME: &'static str = "mgc_network_public_ip";

    fn schema() -> ResourceSchema {
        read_only(PublicIpResource::schema(), Self::TYPE_NAME)
            .with_description("Look up a public IP by ID")
            .attribute(schemas::id_argument("public IP"))
    }

    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic> {
        Ok(Self {
            network: network(request)?,
        })
    }
}

#[async_trait]
impl DataSourceAdapter for PublicIpDataSource {
    async fn read(&self, config: &Attributes) -> ProviderResult<Attributes> {
        let id = required_str(config, "id")?;
        let ip = self.network.get_public_ip(&id).await.map_err(sdk_error)?;
        Ok(flatten_public_ip(&ip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ProviderData;
    use crate::context::tests::context_for;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn lists_vpcs() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/network/v0/vpcs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "vpcs": [
                    {"id": "vpc-1", "name": "default", "status": "created", "is_default": true},
                    {"id": "vpc-2", "name": "apps", "status": "created"}
                ]
            })))
            .mount(&server)
            .await;

        let data: ProviderData = context_for(&server.uri());
        let source = VpcsDataSource::configure(ConfigureRequest::data_source(&data)).unwrap();
        let attrs = source.read(&Attributes::new()).await.unwrap();
        let Value::List(items) = &attrs["items"] else {
            panic!("expected list");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_map().unwrap()["is_default"], Value::from(true));
        assert_eq!(items[1].as_map().unwrap()["is_default"], Value::Null);
    }

    #[test]
    fn single_lookups_require_id() {
        for schema in [
            VpcDataSource::schema(),
            SubnetDataSource::schema(),
            SecurityGroupDataSource::schema(),
            PublicIpDataSource::schema(),
        ] {
            assert!(schema.attributes["id"].required, "{}", schema.resource_type);
            assert!(
                schema.validate(&Attributes::new()).is_err(),
                "{}",
                schema.resource_type
            );
        }
    }
}
