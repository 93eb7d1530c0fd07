//! Adapter traits and the type-erased registries
//!
//! Every resource and data source is a small struct holding the SDK
//! sub-client it needs. [`Configure`] builds it from the shared context;
//! [`ResourceAdapter`] and [`DataSourceAdapter`] carry the operations.

use async_trait::async_trait;
use mgc_core::diagnostic::Diagnostic;
use mgc_core::provider::{ProviderResult, ResourceType};
use mgc_core::resource::Attributes;
use mgc_core::schema::ResourceSchema;

use crate::context::ConfigureRequest;

/// Construction half of an adapter
pub trait Configure: Sized {
    /// Type name, e.g. "mgc_network_vpcs"
    const TYPE_NAME: &'static str;

    fn schema() -> ResourceSchema;

    /// Bind the adapter to the configured clients
    fn configure(request: ConfigureRequest<'_>) -> Result<Self, Diagnostic>;
}

/// Operations of a managed resource
#[async_trait]
pub trait ResourceAdapter: Send + Sync {
    /// Current attributes, or `None` when the resource no longer exists
    async fn read(&self, identifier: &str) -> ProviderResult<Option<Attributes>>;

    /// Create from validated configuration; returns the cloud identifier and
    /// the resulting attributes
    async fn create(&self, config: &Attributes) -> ProviderResult<(String, Attributes)>;

    async fn update(
        &self,
        identifier: &str,
        from: &Attributes,
        to: &Attributes,
    ) -> ProviderResult<Attributes>;

    async fn delete(&self, identifier: &str, state: &Attributes) -> ProviderResult<()>;
}

/// Operation of a data source
#[async_trait]
pub trait DataSourceAdapter: Send + Sync {
    /// Read using the configured attributes as arguments
    async fn read(&self, config: &Attributes) -> ProviderResult<Attributes>;
}

type ConfigureResource = fn(ConfigureRequest<'_>) -> Result<Box<dyn ResourceAdapter>, Diagnostic>;
type ConfigureDataSource =
    fn(ConfigureRequest<'_>) -> Result<Box<dyn DataSourceAdapter>, Diagnostic>;

fn configure_resource<A>(request: ConfigureRequest<'_>) -> Result<Box<dyn ResourceAdapter>, Diagnostic>
where
    A: Configure + ResourceAdapter + 'static,
{
    Ok(Box::new(A::configure(request)?))
}

fn configure_data_source<A>(
    request: ConfigureRequest<'_>,
) -> Result<Box<dyn DataSourceAdapter>, Diagnostic>
where
    A: Configure + DataSourceAdapter + 'static,
{
    Ok(Box::new(A::configure(request)?))
}

/// Registry entry for a resource type
#[derive(Clone, Copy)]
pub struct ResourceEntry {
    pub type_name: &'static str,
    schema: fn() -> ResourceSchema,
    configure: ConfigureResource,
}

impl ResourceEntry {
    pub fn of<A: Configure + ResourceAdapter + 'static>() -> Self {
        Self {
            type_name: A::TYPE_NAME,
            schema: A::schema,
            configure: configure_resource::<A>,
        }
    }

    pub fn configure(
        &self,
        request: ConfigureRequest<'_>,
    ) -> Result<Box<dyn ResourceAdapter>, Diagnostic> {
        (self.configure)(request)
    }
}

impl ResourceType for ResourceEntry {
    fn name(&self) -> &'static str {
        self.type_name
    }

    fn schema(&self) -> ResourceSchema {
        (self.schema)()
    }
}

/// Registry entry for a data source type
#[derive(Clone, Copy)]
pub struct DataSourceEntry {
    pub type_name: &'static str,
    schema: fn() -> ResourceSchema,
    configure: ConfigureDataSource,
}

impl DataSourceEntry {
    pub fn of<A: Configure + DataSourceAdapter + 'static>() -> Self {
        Self {
            type_name: A::TYPE_NAME,
            schema: A::schema,
            configure: configure_data_source::<A>,
        }
    }

    pub fn configure(
        &self,
        request: ConfigureRequest<'_>,
    ) -> Result<Box<dyn DataSourceAdapter>, Diagnostic> {
        (self.configure)(request)
    }
}

impl ResourceType for DataSourceEntry {
    fn name(&self) -> &'static str {
        self.type_name
    }

    fn schema(&self) -> ResourceSchema {
        (self.schema)()
    }
}
