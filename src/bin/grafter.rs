//! grafter CLI - inspect ruleset documents and expand placeholder text
//!
//! Small operational companion to the library: validates YAML rulesets before
//! deployment and previews placeholder expansion against a properties file.

use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process;

use grafter::{load_ruleset_from_file, SourceChain};

#[derive(Parser)]
#[command(name = "grafter")]
#[command(version, about = "Rule-based object-graph assembly toolkit", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a ruleset YAML document and print a summary
    Validate {
        /// Path to the ruleset YAML file
        #[arg(short, long)]
        ruleset: PathBuf,

        /// Print the parsed rules as JSON
        #[arg(long)]
        json: bool,
    },

    /// Expand ${NAME} placeholders in text against a properties file
    Expand {
        /// Text containing placeholder tokens
        text: String,

        /// Optional YAML file with a flat map of property values
        #[arg(short, long)]
        properties: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Validate { ruleset, json } => {
            let def = match load_ruleset_from_file(&ruleset) {
                Ok(def) => def,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    process::exit(1);
                }
            };
            let table = match def.clone().into_table() {
                Ok(table) => table,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    process::exit(1);
                }
            };
            if json {
                match serde_json::to_string_pretty(&def) {
                    Ok(out) => println!("{}", out),
                    Err(e) => {
                        eprintln!("Error: failed to serialize ruleset: {}", e);
                        process::exit(1);
                    }
                }
            } else {
                println!("{}: {} rule(s)", ruleset.display(), table.len());
                for (pattern, rule) in table.iter() {
                    println!("  {}  [{}]", pattern, rule.kind_name());
                }
            }
        }

        Commands::Expand { text, properties } => {
            let mut chain = SourceChain::new();
            if let Some(path) = properties {
                let contents = match std::fs::read_to_string(&path) {
                    Ok(c) => c,
                    Err(e) => {
                        eprintln!("Error: failed to read {}: {}", path.display(), e);
                        process::exit(1);
                    }
                };
                let props: BTreeMap<String, String> = match serde_yaml::from_str(&contents) {
                    Ok(p) => p,
                    Err(e) => {
                        eprintln!("Error: failed to parse {}: {}", path.display(), e);
                        process::exit(1);
                    }
                };
                for (k, v) in props {
                    chain.set(k, v);
                }
            }
            println!("{}", chain.expand(&text));
        }
    }
}
