//! Command-line interface for xmlschema-template

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
use std::fs;
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
use xmlschema_template::definitions::DefinitionKind;
#[cfg(feature = "cli")]
use xmlschema_template::documents::Document;
#[cfg(feature = "cli")]
use xmlschema_template::limits::Limits;
#[cfg(feature = "cli")]
use xmlschema_template::{DocMap, SchemaHelper, Settings};

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "xmlschema-template")]
#[command(author, version, about = "XML Schema miner and template builder", long_about = None)]
struct Cli {
    /// Log mining and expansion at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Ancestor type repeats before an element counts as recursive
    #[arg(long, global = true)]
    recursion_bound: Option<usize>,

    /// Allow includes and imports to be fetched over HTTP
    #[arg(long, global = true)]
    allow_remote: bool,

    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand, Debug)]
enum Commands {
    /// List the global definitions of a schema, per namespace
    Inspect {
        /// Path or URL of the root schema
        #[arg(value_name = "SCHEMA")]
        schema: String,

        /// Root element name
        #[arg(short, long)]
        root: Option<String>,

        /// Only show definitions of this kind (element, simpleType, complexType, group, attribute, attributeGroup)
        #[arg(short, long)]
        kind: Option<String>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Print the template document
    Template {
        /// Path or URL of the root schema
        #[arg(value_name = "SCHEMA")]
        schema: String,

        /// Root element name
        #[arg(short, long)]
        root: Option<String>,

        /// Print the minimal document instead
        #[arg(short, long)]
        minimal: bool,
    },

    /// Print the schema node of every template path
    Nodes {
        /// Path or URL of the root schema
        #[arg(value_name = "SCHEMA")]
        schema: String,

        /// Root element name
        #[arg(short, long)]
        root: Option<String>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Insert a new element into an instance document
    Insert {
        /// Path or URL of the root schema
        #[arg(value_name = "SCHEMA")]
        schema: String,

        /// Instance document to edit
        #[arg(value_name = "DOCUMENT")]
        document: PathBuf,

        /// Path of the new element
        #[arg(value_name = "PATH")]
        path: String,

        /// Root element name
        #[arg(short, long)]
        root: Option<String>,
    },
}

#[cfg(feature = "cli")]
fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut limits = Limits::default();
    if let Some(bound) = cli.recursion_bound {
        limits = limits.with_recursion_bound(bound);
    }
    let settings = Settings::new()
        .with_limits(limits)
        .with_allow_remote(cli.allow_remote);

    let result = match cli.command {
        Commands::Inspect {
            schema,
            root,
            kind,
            json,
        } => cmd_inspect(&schema, root.as_deref(), kind.as_deref(), json, settings),
        Commands::Template {
            schema,
            root,
            minimal,
        } => cmd_template(&schema, root.as_deref(), minimal, settings),
        Commands::Nodes { schema, root, json } => {
            cmd_nodes(&schema, root.as_deref(), json, settings)
        }
        Commands::Insert {
            schema,
            document,
            path,
            root,
        } => cmd_insert(&schema, document, &path, root.as_deref(), settings),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(feature = "cli")]
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("xmlschema_template=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "cli")]
fn cmd_inspect(
    schema_path: &str,
    root: Option<&str>,
    kind: Option<&str>,
    json_output: bool,
    settings: Settings,
) -> Result<(), Box<dyn std::error::Error>> {
    let kind = match kind {
        Some(name) => Some(
            DefinitionKind::from_name(name)
                .ok_or_else(|| format!("unknown definition kind '{}'", name))?,
        ),
        None => None,
    };
    let helper = SchemaHelper::with_settings(schema_path, root, settings)?;
    let definitions = &helper.schema().definitions;

    let mut uris: Vec<&str> = definitions.namespace_uris().collect();
    uris.sort_unstable();
    uris.dedup();

    if json_output {
        let summaries: Vec<_> = uris
            .iter()
            .flat_map(|uri| definitions.in_namespace(uri))
            .filter(|def| kind.map_or(true, |k| def.kind() == k))
            .map(|def| def.summary())
            .collect();
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    println!("xmlschema-template v{}", xmlschema_template::VERSION);
    println!("Schema: {}", helper.schema_location());
    println!("Root element: {}", helper.root_element_name());
    println!("Target namespace: {}", helper.target_namespace());
    println!("Definitions: {}", definitions.len());
    for uri in uris {
        let defs: Vec<_> = definitions
            .in_namespace(uri)
            .into_iter()
            .filter(|def| kind.map_or(true, |k| def.kind() == k))
            .collect();
        if defs.is_empty() {
            continue;
        }
        let label = if uri.is_empty() { "(no namespace)" } else { uri };
        println!("\n=== {} ===", label);
        for def in defs {
            println!("  {} ({})", def.name(), def.kind());
        }
    }
    Ok(())
}

#[cfg(feature = "cli")]
fn cmd_template(
    schema_path: &str,
    root: Option<&str>,
    minimal: bool,
    settings: Settings,
) -> Result<(), Box<dyn std::error::Error>> {
    let helper = SchemaHelper::with_settings(schema_path, root, settings)?;
    let document = if minimal {
        helper.minimal_document()
    } else {
        helper.instance_document().clone()
    };
    println!("{}", document.to_xml_string()?);
    Ok(())
}

#[cfg(feature = "cli")]
fn cmd_nodes(
    schema_path: &str,
    root: Option<&str>,
    json_output: bool,
    settings: Settings,
) -> Result<(), Box<dyn std::error::Error>> {
    let helper = SchemaHelper::with_settings(schema_path, root, settings)?;

    if json_output {
        let nodes: Vec<_> = helper.nodes().values().collect();
        println!("{}", serde_json::to_string_pretty(&nodes)?);
        return Ok(());
    }

    for node in helper.nodes().values() {
        let max = node
            .occurs
            .max
            .map_or_else(|| "unbounded".to_string(), |m| m.to_string());
        let mut flags = Vec::new();
        if node.choice_member {
            flags.push("choice");
        }
        if node.recursive {
            flags.push("recursive");
        }
        if node.is_abstract {
            flags.push("abstract");
        }
        if node.read_only {
            flags.push("read-only");
        }
        if node.is_substitution_member() {
            flags.push("substitute");
        }
        println!(
            "{} [{}..{}] {}{}",
            node.path,
            node.occurs.min,
            max,
            node.type_name,
            if flags.is_empty() {
                String::new()
            } else {
                format!(" ({})", flags.join(", "))
            }
        );
    }
    Ok(())
}

#[cfg(feature = "cli")]
fn cmd_insert(
    schema_path: &str,
    document_path: PathBuf,
    path: &str,
    root: Option<&str>,
    settings: Settings,
) -> Result<(), Box<dyn std::error::Error>> {
    let helper = SchemaHelper::with_settings(schema_path, root, settings)?;
    let mut document = Document::from_string(&fs::read_to_string(&document_path)?)?;

    let mut map = DocMap::with_helper(&mut document, &helper);
    if map.node_exists(path) {
        map.create_new_sibling_node(path)?;
    } else {
        map.create_new_node(path)?;
    }
    println!("{}", document.to_xml_string()?);
    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(1);
}
