use clap::Parser;
use colored::*;
use directories::ProjectDirs;
use mgmtmodel::api::{
    ApiOptions, CmdMessage, ConfigAction, ManagementApi, MessageLevel, ResourceDescription,
    ResourceView,
};
use mgmtmodel::config::MgmtConfig;
use mgmtmodel::error::{MgmtError, Result};
use mgmtmodel::expression::PropertyResolver;
use mgmtmodel::resources::ResourceRegistry;
use mgmtmodel::services::ServiceRegistry;
use mgmtmodel::store::fs::FileStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod args;
use args::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

type Api = ManagementApi<FileStore, ServiceRegistry>;

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let mut api = init_api(&cli)?;

    match cli.command {
        Commands::Add {
            address,
            assignments,
        } => handle_add(&mut api, &address, &assignments),
        Commands::Remove { address } => handle_remove(&mut api, &address),
        Commands::Write {
            address,
            name,
            value,
        } => handle_write(&mut api, &address, &name, &value),
        Commands::Undefine { address, name } => handle_undefine(&mut api, &address, &name),
        Commands::Read {
            address,
            defaults,
            json,
        } => handle_read(&api, &address, defaults, json),
        Commands::ReadAttribute {
            address,
            name,
            defaults,
        } => handle_read_attribute(&api, &address, &name, defaults),
        Commands::Describe { address } => handle_describe(&api, &address),
        Commands::Export { output } => handle_export(&api, output.as_deref()),
        Commands::Validate { file } => handle_validate(&api, &file),
        Commands::Config { key, value } => handle_config(&api, key, value),
    }
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn init_api(cli: &Cli) -> Result<Api> {
    let config_dir = match &cli.config_dir {
        Some(dir) => dir.clone(),
        None => ProjectDirs::from("org", "mgmtmodel", "mgmtmodel")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or_else(|| MgmtError::Api("Could not determine config dir".to_string()))?,
    };
    let config = MgmtConfig::load(&config_dir)?;

    let document: PathBuf = match &cli.document {
        Some(path) => path.clone(),
        None => config_dir.join(&config.document),
    };
    debug!(config_dir = %config_dir.display(), document = %document.display(), "opening model");

    let registry = Arc::new(ResourceRegistry::standard()?);
    let resolver = PropertyResolver::new(config.properties.clone()).with_env();
    let options = ApiOptions {
        admin_only: cli.admin_only || config.admin_only,
        rollback_on_runtime_failure: config.rollback_on_runtime_failure,
        config_dir: Some(config_dir),
    };

    ManagementApi::open(
        FileStore::new(document),
        ServiceRegistry::new(),
        registry,
        resolver,
        options,
    )
}

fn handle_add(api: &mut Api, address: &str, assignments: &[String]) -> Result<()> {
    let result = api.add(address, assignments)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_remove(api: &mut Api, address: &str) -> Result<()> {
    let result = api.remove(address)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_write(api: &mut Api, address: &str, name: &str, value: &str) -> Result<()> {
    let result = api.write(address, name, value)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_undefine(api: &mut Api, address: &str, name: &str) -> Result<()> {
    let result = api.undefine(address, name)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_read(api: &Api, address: &str, defaults: bool, json: bool) -> Result<()> {
    let result = api.read(address, defaults)?;
    if json {
        let values: Vec<_> = result.resources.iter().map(ResourceView::to_json).collect();
        let out = if values.len() == 1 && address != "/" {
            serde_json::to_string_pretty(&values[0])?
        } else {
            serde_json::to_string_pretty(&values)?
        };
        println!("{}", out);
    } else if result.resources.is_empty() {
        println!("No resources found.");
    } else {
        print_views(&result.resources);
    }
    print_messages(&result.messages);
    Ok(())
}

fn handle_read_attribute(api: &Api, address: &str, name: &str, defaults: bool) -> Result<()> {
    let result = api.read_attribute(address, name, defaults)?;
    for view in &result.resources {
        for (_, value) in &view.attributes {
            match value {
                Some(value) => println!("{}", value),
                None => println!("{}", "undefined".dimmed()),
            }
        }
    }
    print_messages(&result.messages);
    Ok(())
}

fn handle_describe(api: &Api, address: &str) -> Result<()> {
    let result = api.describe(address)?;
    if let Some(description) = &result.description {
        print_description(description);
    }
    print_messages(&result.messages);
    Ok(())
}

fn handle_export(api: &Api, output: Option<&Path>) -> Result<()> {
    let result = api.export(output)?;
    if let Some(document) = &result.document {
        println!("{}", document);
    }
    print_messages(&result.messages);
    Ok(())
}

fn handle_validate(api: &Api, file: &Path) -> Result<()> {
    let xml = std::fs::read_to_string(file)?;
    let result = api.validate(&xml)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_config(api: &Api, key: Option<String>, value: Option<String>) -> Result<()> {
    let action = match (key, value) {
        (None, _) => ConfigAction::ShowAll,
        (Some(key), None) => ConfigAction::ShowKey(key),
        (Some(key), Some(value)) => ConfigAction::Set(key, value),
    };
    let show_all = matches!(action, ConfigAction::ShowAll);

    let result = api.config(action)?;
    if show_all {
        if let Some(config) = &result.config {
            for (key, value) in config.entries() {
                println!("{} = {}", key, value);
            }
        }
    }
    print_messages(&result.messages);
    Ok(())
}

fn print_messages(messages: &[CmdMessage]) {
    for message in messages {
        match message.level {
            MessageLevel::Info => println!("{}", message.content.dimmed()),
            MessageLevel::Success => println!("{}", message.content.green()),
            MessageLevel::Warning => println!("{}", message.content.yellow()),
            MessageLevel::Error => println!("{}", message.content.red()),
        }
    }
}

fn print_views(views: &[ResourceView]) {
    for (i, view) in views.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("{}", view.address.to_string().bold());
        for (name, value) in &view.attributes {
            match value {
                Some(value) => println!("  {} = {}", name, value),
                None => println!("  {} = {}", name, "undefined".dimmed()),
            }
        }
        for child in &view.children {
            println!("  {} {}", "child".yellow(), child);
        }
    }
}

fn print_description(description: &ResourceDescription) {
    println!("{}", format!("{:?}", description.kind).bold());
    if !description.description.is_empty() {
        println!("{}", description.description);
    }
    if description.requires_runtime {
        println!("{}", "installs runtime services".dimmed());
    }
    for attr in &description.attributes {
        let mut flags = vec![attr.value_type.to_string(), attr.xml.to_string()];
        if attr.required {
            flags.push("required".to_string());
        }
        if attr.expressions_allowed {
            flags.push("expressions".to_string());
        }
        if let Some(default) = &attr.default {
            flags.push(format!("default {}", default));
        }
        if let Some(constraint) = &attr.constraint {
            flags.push(constraint.clone());
        }
        println!("  {} ({})", attr.name.green(), flags.join(", "));
        if !attr.description.is_empty() {
            println!("      {}", attr.description.dimmed());
        }
    }
    for child in &description.children {
        println!("  {} {}", "child".yellow(), child);
    }
}
