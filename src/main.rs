use clap::{Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use sui::page::Request;
use sui::registry::{Registry, Sui};
use sui::storage::LocalStorage;
use sui::{config, output};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sui")]
#[command(about = "Compile and inspect page-builder templates")]
#[command(long_about = "\
Compile and inspect page-builder templates

Template structure:

  templates/
  └── tech-blue/
      ├── template.toml              # Scripts, styles, locales, themes (optional)
      ├── __assets/                  # Served as @assets/...
      ├── __blocks/Hero/Hero.ts      # Block → window.block__Hero
      ├── __components/Nav/Nav.html  # Component → window.component__Nav
      ├── __locales/en-us.yml        # Locale list fallback
      ├── index/index.html           # Page /index
      ├── index/[invite]/[invite].ts # Page /index/[invite], matches /index/abc
      └── page/404/404.js            # Page /page/404, beats /page/[id]

Set RUST_LOG=sui=debug for compile and cache detail.")]
#[command(version)]
struct Cli {
    /// Storage root holding sui.toml and the templates directory
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Name this SUI instance is registered under
    #[arg(long, default_value = "default", global = true)]
    sui: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List templates
    Templates,
    /// List every page route of a template
    Pages { template: String },
    /// Show the page tree, optionally with the path to a route marked
    Tree {
        template: String,
        #[arg(long)]
        route: Option<String>,
    },
    /// Print the editor response for a route as JSON
    Render {
        template: String,
        route: String,
        /// Request method passed through to collaborators
        #[arg(long, default_value = "GET")]
        method: String,
    },
    /// Print a page's raw source
    Source {
        template: String,
        route: String,
        #[arg(long, value_enum, default_value_t = SourceKind::Page)]
        kind: SourceKind,
    },
    /// Write an asset (`@assets/...` or `@pages/...`) to stdout
    Asset { template: String, path: String },
    /// Precompile every page and fragment of a template
    Compile { template: String },
    /// List blocks and components
    Blocks { template: String },
    /// Copy a local directory in as a new template
    Upload { src: PathBuf, dst: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum SourceKind {
    Page,
    Script,
    Style,
    Data,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    let storage = Arc::new(LocalStorage::new(cli.root.clone()));
    let registry = Registry::new();
    let sui = registry.register(Sui::open(cli.sui, storage)?)?;
    init_thread_pool(&sui.config().processing);

    match cli.command {
        Command::Templates => {
            output::print_templates(&sui.templates()?);
        }
        Command::Pages { template } => {
            let template = sui.template(&template)?;
            output::print_pages(&*template.tree()?);
        }
        Command::Tree { template, route } => {
            let template = sui.template(&template)?;
            match route {
                Some(route) => output::print_tree(&template.page_tree(&route)?),
                None => output::print_tree(&template.tree()?.children),
            }
        }
        Command::Render {
            template,
            route,
            method,
        } => {
            let page = sui.template(&template)?.page(&route)?;
            let request = Request {
                method,
                ..Request::default()
            };
            let response = page.editor_render(&request)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Source {
            template,
            route,
            kind,
        } => {
            let page = sui.template(&template)?.page(&route)?;
            let source = match kind {
                SourceKind::Page => page.editor_page_source()?,
                SourceKind::Script => page.editor_script_source()?,
                SourceKind::Style => page.editor_style_source()?,
                SourceKind::Data => page.editor_data_source()?,
            };
            eprintln!("{} ({})", source.file, source.mime_type);
            print!("{}", source.source);
        }
        Command::Asset { template, path } => {
            let asset = sui.template(&template)?.asset(&path)?;
            eprintln!("{}", asset.mime_type);
            std::io::stdout().write_all(&asset.content)?;
        }
        Command::Compile { template } => {
            let template = sui.template(&template)?;
            println!("==> Compiling {}", template.label());
            let report = template.precompile()?;
            output::print_precompile_report(&report);
            if !report.is_success() {
                return Err(format!("{} failed to compile", template.name()).into());
            }
        }
        Command::Blocks { template } => {
            let template = sui.template(&template)?;
            output::print_fragments("Blocks", &template.blocks()?);
            output::print_fragments("Components", &template.components()?);
        }
        Command::Upload { src, dst } => {
            println!("==> Uploading {} → {}", src.display(), dst);
            let template = sui.upload_template(&src, &dst)?;
            println!("==> Uploaded {} ({} pages)", template.name(), template.pages()?.len());
        }
    }

    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
