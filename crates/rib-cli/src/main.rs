use miette::{IntoDiagnostic, Result, WrapErr};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use rib_core::document;
use rib_core::views::OutlineView;
use rib_core::{Designer, DesignerConfig, DispatchQueue, ViewBinding, WidgetRegistry, codegen};

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(version, about = "rib - design documents for the rib GUI builder", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Widget catalog to use instead of the built-in one
    #[arg(long, global = true, env = "RIB_CATALOG")]
    catalog: Option<PathBuf>,

    /// Designer settings (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a design document against the widget catalog
    Validate {
        /// Path to the design document
        design: PathBuf,
    },
    /// Generate the static HTML of a design
    Export {
        /// Path to the design document
        design: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the node tree of a design
    Outline {
        /// Path to the design document
        design: PathBuf,
    },
    /// Write a new, empty design document
    New {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    init_miette();
    init_tracing();

    let cli = Cli::parse();
    let registry = Rc::new(load_registry(cli.catalog.as_deref())?);
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Validate { design } => validate(registry, &design),
        Commands::Export { design, output } => export(registry, &design, output.as_deref()),
        Commands::Outline { design } => outline(registry, config, &design),
        Commands::New { output } => new_design(registry, config, output.as_deref()),
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("reading {}", path.display()))
}

fn write_or_print(output: Option<&Path>, contents: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, contents)
                .into_diagnostic()
                .wrap_err_with(|| format!("writing {}", path.display()))?;
            tracing::info!(path = %path.display(), bytes = contents.len(), "written");
        }
        None => print!("{contents}"),
    }
    Ok(())
}

fn load_registry(catalog: Option<&Path>) -> Result<WidgetRegistry> {
    match catalog {
        Some(path) => WidgetRegistry::from_json(&read(path)?)
            .into_diagnostic()
            .wrap_err_with(|| format!("loading widget catalog {}", path.display())),
        None => Ok(WidgetRegistry::builtin()),
    }
}

fn load_config(config: Option<&Path>) -> Result<DesignerConfig> {
    match config {
        Some(path) => DesignerConfig::from_json(&read(path)?)
            .into_diagnostic()
            .wrap_err_with(|| format!("loading settings {}", path.display())),
        None => Ok(DesignerConfig::default()),
    }
}

fn load_tree(registry: Rc<WidgetRegistry>, path: &Path) -> Result<rib_core::DesignTree> {
    document::from_json(registry, &read(path)?)
        .into_diagnostic()
        .wrap_err_with(|| format!("loading design {}", path.display()))
}

fn validate(registry: Rc<WidgetRegistry>, design: &Path) -> Result<()> {
    let tree = load_tree(registry, design)?;
    tree.validate()
        .map_err(|problem| miette::miette!("{}: {problem}", design.display()))?;
    println!(
        "{}: ok ({} nodes, {} pages)",
        design.display(),
        tree.len(),
        tree.pages().len()
    );
    Ok(())
}

fn export(registry: Rc<WidgetRegistry>, design: &Path, output: Option<&Path>) -> Result<()> {
    let tree = load_tree(registry, design)?;
    write_or_print(output, &codegen::render_document(&tree))
}

fn outline(registry: Rc<WidgetRegistry>, config: DesignerConfig, design: &Path) -> Result<()> {
    let queue = DispatchQueue::new();
    let designer = Designer::new(registry, queue.clone(), config).into_diagnostic()?;
    designer
        .load_json(&read(design)?)
        .into_diagnostic()
        .wrap_err_with(|| format!("loading design {}", design.display()))?;
    let view = ViewBinding::attach(&designer, OutlineView::new());
    queue.drain();
    print!("{}", view.view().to_text());
    Ok(())
}

fn new_design(
    registry: Rc<WidgetRegistry>,
    config: DesignerConfig,
    output: Option<&Path>,
) -> Result<()> {
    let designer = Designer::new(registry, DispatchQueue::new(), config).into_diagnostic()?;
    let mut json = designer.to_json().into_diagnostic()?;
    json.push('\n');
    write_or_print(output, &json)
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();
}

fn init_miette() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .expect("couldn't set the miette hook");
    miette::set_panic_hook();
}
