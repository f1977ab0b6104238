use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mgmtmodel")]
#[command(about = "Manage a typed, validated XML configuration model", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// XML document to operate on (defaults to the configured document)
    #[arg(long, global = true)]
    pub document: Option<PathBuf>,

    /// Directory holding config.json
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    /// Change the model only; never install or remove services
    #[arg(long, global = true)]
    pub admin_only: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add a resource (e.g. add /subsystem=jmx/remoting-connector=jmx use-management-endpoint=false)
    Add {
        /// Resource address
        address: String,

        /// Attribute assignments as name=value; lists are comma separated
        assignments: Vec<String>,
    },

    /// Remove a resource that has no children
    #[command(alias = "rm")]
    Remove {
        /// Resource address
        address: String,
    },

    /// Write one attribute
    Write {
        address: String,
        name: String,
        value: String,
    },

    /// Clear one attribute
    Undefine { address: String, name: String },

    /// Read a resource; the root lists top-level resources
    Read {
        /// Resource address
        #[arg(default_value = "/")]
        address: String,

        /// Show defaults for undefined attributes
        #[arg(long)]
        defaults: bool,

        /// Print JSON instead of name = value lines
        #[arg(long)]
        json: bool,
    },

    /// Read a single attribute
    ReadAttribute {
        address: String,
        name: String,

        /// Show the default when undefined
        #[arg(long)]
        defaults: bool,
    },

    /// Describe the attributes and children of a resource kind
    Describe { address: String },

    /// Print the document, or write it to a file
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check a document without loading it
    Validate { file: PathBuf },

    /// Get or set configuration
    Config {
        /// Configuration key (e.g., admin-only, property.<name>)
        key: Option<String>,

        /// Value to set (if omitted, prints current value)
        value: Option<String>,
    },
}
