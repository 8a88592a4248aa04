//! x-dom CLI: query, inspect and transform XML files

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use x_dom::{Document, NodeKind, ParseOptions};

#[derive(Parser)]
#[command(name = "x-dom")]
#[command(version)]
#[command(about = "Query, inspect and transform XML documents", long_about = None)]
struct Cli {
    #[command(flatten)]
    options: OptionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct OptionArgs {
    /// Drop whitespace-only text nodes after parsing
    #[arg(long, global = true)]
    strip_blanks: bool,

    /// Leave the XML declaration out of printed documents
    #[arg(long, global = true)]
    omit_declaration: bool,
}

impl From<&OptionArgs> for ParseOptions {
    fn from(args: &OptionArgs) -> Self {
        ParseOptions::new()
            .with_strip_blank_text(args.strip_blanks)
            .with_omit_xml_declaration(args.omit_declaration)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print every node matching an XPath expression
    Query {
        /// XML file
        file: PathBuf,

        /// XPath expression, evaluated against the whole document
        xpath: String,

        /// Print node records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the computed path of every matching element
    Path {
        /// XML file
        file: PathBuf,

        /// Element path (a bare root name or an XPath expression)
        xpath: String,
    },

    /// Print the inner XML of the first matching element
    Inner {
        /// XML file
        file: PathBuf,

        /// Element path (a bare root name or an XPath expression)
        xpath: String,
    },

    /// Apply an XSLT stylesheet and print the result
    Transform {
        /// XML file
        file: PathBuf,

        /// Stylesheet file
        stylesheet: PathBuf,
    },

    /// Parse and re-serialize a document
    Print {
        /// XML file
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "x_dom=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let options = ParseOptions::from(&cli.options);
    debug!(?options, "Parsed command line");

    match cli.command {
        Commands::Query { file, xpath, json } => {
            let doc = load(&file, options)?;
            let matches = doc.query(&xpath)?;
            if json {
                let infos: Vec<_> = matches.iter().map(|node| node.info()).collect();
                println!("{}", serde_json::to_string_pretty(&infos)?);
            } else {
                for node in matches {
                    match node.kind() {
                        NodeKind::Element => println!("{}", node.to_xml()?),
                        _ => println!("{}", node.value()),
                    }
                }
            }
        }
        Commands::Path { file, xpath } => {
            let doc = load(&file, options)?;
            for element in doc.select_nodes(&xpath)? {
                println!("{}", element.path());
            }
        }
        Commands::Inner { file, xpath } => {
            let doc = load(&file, options)?;
            let element = doc
                .select_single_node(&xpath)?
                .with_context(|| format!("no element matches `{xpath}`"))?;
            println!("{}", element.inner_xml()?);
        }
        Commands::Transform { file, stylesheet } => {
            let doc = load(&file, options)?;
            let stylesheet = std::fs::read_to_string(&stylesheet)
                .with_context(|| format!("failed to read {}", stylesheet.display()))?;
            println!("{}", doc.transform(&stylesheet)?);
        }
        Commands::Print { file } => {
            let doc = load(&file, options)?;
            println!("{}", doc.to_xml()?);
        }
    }

    Ok(())
}

fn load(file: &Path, options: ParseOptions) -> Result<Document> {
    Document::load_with(file, options).with_context(|| format!("failed to load {}", file.display()))
}
