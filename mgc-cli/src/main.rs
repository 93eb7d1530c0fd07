use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;

use mgc_core::diagnostic::Diagnostic;
use mgc_core::provider::{Provider, ResourceType};
use mgc_core::resource::{
    Attributes, Resource, ResourceId, State, Value, attributes_from_json, attributes_to_json,
};
use mgc_core::schema::ResourceSchema;
use mgc_provider::MgcProvider;
use mgc_provider::data_sources::data_source_entries;
use mgc_provider::resources::resource_entries;

/// Placeholder shown instead of sensitive values
const REDACTED: &str = "(sensitive)";

#[derive(Parser)]
#[command(name = "mgc")]
#[command(about = "Manage Magalu Cloud resources from JSON attribute files", long_about = None)]
struct Cli {
    /// API key (falls back to MGC_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Region, e.g. br-se1 (falls back to MGC_REGION)
    #[arg(long, global = true)]
    region: Option<String>,

    /// Environment: prod, pre-prod or dev-qa (falls back to MGC_ENV)
    #[arg(long, global = true)]
    env: Option<String>,

    /// Override the regional API endpoint
    #[arg(long, global = true)]
    server_url: Option<String>,

    /// Print sensitive attributes in clear text
    #[arg(long, global = true)]
    show_sensitive: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List resource types and their attributes
    Schemas {
        /// List data sources instead of resources
        #[arg(long)]
        data_sources: bool,
    },
    /// Read a resource by its cloud identifier
    Read {
        resource_type: String,
        identifier: String,
    },
    /// Create a resource from an attribute file
    Create {
        resource_type: String,

        /// Path to a JSON object of attributes
        #[arg(long, short)]
        file: PathBuf,
    },
    /// Update a resource in place from an attribute file
    Update {
        resource_type: String,
        identifier: String,

        /// Path to a JSON object of attributes
        #[arg(long, short)]
        file: PathBuf,
    },
    /// Delete a resource
    Delete {
        resource_type: String,
        identifier: String,
    },
    /// Read a data source
    Data {
        data_source_type: String,

        /// Path to a JSON object of arguments
        #[arg(long, short)]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Schemas { data_sources } => {
            run_schemas(*data_sources);
            Ok(())
        }
        Commands::Read {
            resource_type,
            identifier,
        } => run_read(&cli, resource_type, identifier).await,
        Commands::Create {
            resource_type,
            file,
        } => run_create(&cli, resource_type, file).await,
        Commands::Update {
            resource_type,
            identifier,
            file,
        } => run_update(&cli, resource_type, identifier, file).await,
        Commands::Delete {
            resource_type,
            identifier,
        } => run_delete(&cli, resource_type, identifier).await,
        Commands::Data {
            data_source_type,
            file,
        } => run_data(&cli, data_source_type, file.as_deref()).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Provider attributes taken from the command line
fn explicit_config(cli: &Cli) -> Attributes {
    [
        ("api_key", &cli.api_key),
        ("region", &cli.region),
        ("env", &cli.env),
        ("server_url", &cli.server_url),
    ]
    .into_iter()
    .filter_map(|(name, value)| {
        value
            .as_ref()
            .map(|v| (name.to_string(), Value::String(v.clone())))
    })
    .collect()
}

async fn configure(cli: &Cli) -> Result<MgcProvider, String> {
    let (provider, warnings) = MgcProvider::configure(&explicit_config(cli))
        .await
        .map_err(|d| d.to_string())?;
    for warning in &warnings {
        print_warning(warning);
    }
    Ok(provider)
}

fn print_warning(warning: &Diagnostic) {
    eprintln!("{} {}", "Warning:".yellow().bold(), warning);
}

fn read_attributes(file: &Path) -> Result<Attributes, String> {
    let content = fs::read_to_string(file)
        .map_err(|e| format!("Failed to read {}: {}", file.display(), e))?;
    let json: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| format!("Failed to parse {}: {}", file.display(), e))?;
    attributes_from_json(json)
        .ok_or_else(|| format!("{} must contain a JSON object", file.display()))
}

fn resource_schema(resource_type: &str) -> Option<ResourceSchema> {
    resource_entries()
        .iter()
        .find(|e| e.type_name == resource_type)
        .map(ResourceType::schema)
}

fn data_source_schema(data_source_type: &str) -> Option<ResourceSchema> {
    data_source_entries()
        .iter()
        .find(|e| e.type_name == data_source_type)
        .map(ResourceType::schema)
}

/// Replace sensitive attribute values with a placeholder
fn redact(attributes: &Attributes, schema: Option<&ResourceSchema>) -> Attributes {
    let Some(schema) = schema else {
        return attributes.clone();
    };
    attributes
        .iter()
        .map(|(name, value)| {
            let sensitive = schema.attributes.get(name).is_some_and(|a| a.sensitive);
            let value = if sensitive && !value.is_null() {
                Value::from(REDACTED)
            } else {
                value.clone()
            };
            (name.clone(), value)
        })
        .collect()
}

fn render_state(state: &State, schema: Option<&ResourceSchema>, show_sensitive: bool) -> String {
    let attributes = if show_sensitive {
        state.attributes.clone()
    } else {
        redact(&state.attributes, schema)
    };
    let json = serde_json::json!({
        "type": state.id.resource_type,
        "identifier": state.identifier,
        "exists": state.exists,
        "attributes": attributes_to_json(&attributes),
    });
    serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string())
}

fn print_state(cli: &Cli, state: &State, schema: Option<ResourceSchema>) {
    println!("{}", render_state(state, schema.as_ref(), cli.show_sensitive));
}

fn run_schemas(data_sources: bool) {
    let schemas: Vec<ResourceSchema> = if data_sources {
        data_source_entries().iter().map(ResourceType::schema).collect()
    } else {
        resource_entries().iter().map(ResourceType::schema).collect()
    };

    for schema in schemas {
        println!("{}", schema.resource_type.cyan().bold());
        if let Some(description) = &schema.description {
            println!("  {}", description.dimmed());
        }
        for attr in schema.sorted_attributes() {
            let mut line = format!("    {} ({})", attr.name, attr.mode());
            if attr.sensitive {
                line.push_str(" sensitive");
            }
            println!("{}", line);
        }
        println!();
    }
}

async fn run_read(cli: &Cli, resource_type: &str, identifier: &str) -> Result<(), String> {
    let provider = configure(cli).await?;
    let id = ResourceId::new(resource_type, identifier);
    let state = provider
        .read(&id, Some(identifier))
        .await
        .map_err(|e| e.to_string())?;
    if !state.exists {
        return Err(format!("{} {} does not exist", resource_type, identifier));
    }
    print_state(cli, &state, resource_schema(resource_type));
    Ok(())
}

async fn run_create(cli: &Cli, resource_type: &str, file: &Path) -> Result<(), String> {
    let attributes = read_attributes(file)?;
    let provider = configure(cli).await?;
    let resource = Resource::new(resource_type, "cli").with_attributes(attributes);

    println!("{} {}", "Creating".green().bold(), resource_type);
    let state = provider
        .create(&resource)
        .await
        .map_err(|e| e.to_string())?;
    print_state(cli, &state, resource_schema(resource_type));
    Ok(())
}

async fn run_update(
    cli: &Cli,
    resource_type: &str,
    identifier: &str,
    file: &Path,
) -> Result<(), String> {
    let attributes = read_attributes(file)?;
    let provider = configure(cli).await?;
    let id = ResourceId::new(resource_type, identifier);

    let current = provider
        .read(&id, Some(identifier))
        .await
        .map_err(|e| format!("Failed to read state: {}", e))?;
    if !current.exists {
        return Err(format!("{} {} does not exist", resource_type, identifier));
    }

    let desired = Resource::new(resource_type, identifier).with_attributes(attributes);
    println!("{} {}", "Updating".yellow().bold(), id);
    let state = provider
        .update(&id, identifier, &current, &desired)
        .await
        .map_err(|e| e.to_string())?;
    print_state(cli, &state, resource_schema(resource_type));
    Ok(())
}

async fn run_delete(cli: &Cli, resource_type: &str, identifier: &str) -> Result<(), String> {
    let provider = configure(cli).await?;
    let id = ResourceId::new(resource_type, identifier);

    let current = provider
        .read(&id, Some(identifier))
        .await
        .map_err(|e| format!("Failed to read state: {}", e))?;
    if !current.exists {
        println!("{} {} is already gone", resource_type, identifier);
        return Ok(());
    }

    println!("{} {}", "Deleting".red().bold(), id);
    provider
        .delete(&id, identifier, &current)
        .await
        .map_err(|e| e.to_string())?;
    println!("{}", "Deleted.".green());
    Ok(())
}

async fn run_data(cli: &Cli, data_source_type: &str, file: Option<&Path>) -> Result<(), String> {
    let arguments = match file {
        Some(file) => read_attributes(file)?,
        None => Attributes::new(),
    };
    let provider = configure(cli).await?;
    let resource = Resource::new(data_source_type, "cli")
        .with_attributes(arguments)
        .with_read_only(true);

    let state = provider
        .read_data_source(&resource)
        .await
        .map_err(|e| e.to_string())?;
    print_state(cli, &state, data_source_schema(data_source_type));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn attribute_file_keeps_nulls() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"name": "main", "description": null, "size": 20}}"#).unwrap();

        let attrs = read_attributes(file.path()).unwrap();
        assert_eq!(attrs["name"], Value::from("main"));
        assert_eq!(attrs["description"], Value::Null);
        assert_eq!(attrs["size"], Value::Int(20));
    }

    #[test]
    fn attribute_file_must_be_an_object() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[1, 2]").unwrap();

        let err = read_attributes(file.path()).unwrap_err();
        assert!(err.contains("must contain a JSON object"));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = read_attributes(Path::new("/nonexistent/attrs.json")).unwrap_err();
        assert!(err.starts_with("Failed to read"));
    }

    #[test]
    fn sensitive_values_are_redacted() {
        let schema = data_source_schema("mgc_container_credentials");
        let state = State::existing(
            ResourceId::new("mgc_container_credentials", "cli"),
            [
                ("username".to_string(), Value::from("tenant")),
                ("password".to_string(), Value::from("hunter2")),
            ]
            .into_iter()
            .collect(),
        );

        let rendered = render_state(&state, schema.as_ref(), false);
        assert!(rendered.contains(REDACTED));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("tenant"));

        let clear = render_state(&state, schema.as_ref(), true);
        assert!(clear.contains("hunter2"));
    }

    #[test]
    fn flags_become_explicit_config() {
        let cli = Cli::parse_from([
            "mgc",
            "--region",
            "br-ne1",
            "--env",
            "pre-prod",
            "read",
            "mgc_network_vpcs",
            "vpc-1",
        ]);
        let config = explicit_config(&cli);
        assert_eq!(config.len(), 2);
        assert_eq!(config["region"], Value::from("br-ne1"));
        assert_eq!(config["env"], Value::from("pre-prod"));
        assert!(matches!(cli.command, Commands::Read { .. }));
    }

    #[test]
    fn schema_lookup_is_per_kind() {
        assert!(resource_schema("mgc_network_vpcs").is_some());
        assert!(resource_schema("mgc_network_vpc").is_none());
        assert!(data_source_schema("mgc_network_vpc").is_some());
    }
}
