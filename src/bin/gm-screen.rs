use clap::{Parser, Subcommand};
use futures::executor::block_on;
use gm_screen::{
    DocumentError, FileStore, KeyValueStore, MemoryEditorHost, Point, Registry, Screen,
    ScreenConfig, ScreenError, Strict, Visual,
};
use serde_json::Value;
use std::path::PathBuf;
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding the dataset store
    #[arg(long, global = true, default_value = ".gm-screen")]
    store: PathBuf,
    /// JSON file overriding the screen configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the stored datasets
    List,
    /// Prints a dataset
    Show {
        #[arg(long)]
        dataset: Option<String>,
        /// Print the document instead of an outline
        #[arg(long)]
        json: bool,
    },
    /// Writes a dataset to `<name>.json`
    Export {
        #[arg(long)]
        dataset: Option<String>,
        /// Save under a new name
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
    /// Replaces a dataset with a document file named after it
    Import { file: PathBuf },
    /// Adds a block to a dataset
    AddBlock {
        #[arg(long)]
        dataset: Option<String>,
        #[arg(long, default_value_t = 0)]
        x: i32,
        #[arg(long, default_value_t = 0)]
        y: i32,
        #[arg(long)]
        heading: Option<String>,
        /// Paragraphs of the block body
        #[arg(long)]
        text: Vec<String>,
    },
    /// Removes every stored dataset
    Clear,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => match ScreenConfig::load(path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("Error: {err}");
                std::process::exit(1);
            }
        },
        None => ScreenConfig::default(),
    };
    let store = match FileStore::open(&cli.store) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };
    let host = MemoryEditorHost::new();
    let registry = Registry::with_host(&config.block, Rc::new(host.clone()));
    let mut screen = Screen::with_registry(store, config, registry);

    let result = match cli.command {
        Commands::List => list_command(&screen),
        Commands::Show { dataset, json } => show_command(&mut screen, dataset, json),
        Commands::Export { dataset, name, dir } => export_command(&mut screen, dataset, name, dir),
        Commands::Import { file } => import_command(&mut screen, file),
        Commands::AddBlock {
            dataset,
            x,
            y,
            heading,
            text,
        } => add_block_command(&mut screen, &host, dataset, Point::new(x, y), heading, text),
        Commands::Clear => clear_command(&mut screen),
    };
    if let Err(err) = result {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn open(screen: &mut Screen<FileStore>, dataset: Option<String>) -> Result<(), ScreenError> {
    match dataset {
        Some(name) => screen.open_dataset(&name)?,
        None => screen.restore_state()?,
    };
    Ok(())
}

fn list_command(screen: &Screen<FileStore>) -> Result<(), ScreenError> {
    let active = screen
        .store()
        .get(&screen.config().active_dataset_key)?
        .unwrap_or_else(|| screen.config().default_dataset.clone());
    let datasets = screen.list_datasets()?;
    if datasets.is_empty() {
        println!("No datasets stored.");
    }
    for name in datasets {
        let marker = if name == active { "*" } else { " " };
        println!("{marker} {name}");
    }
    Ok(())
}

fn show_command(
    screen: &mut Screen<FileStore>,
    dataset: Option<String>,
    json: bool,
) -> Result<(), ScreenError> {
    open(screen, dataset)?;
    let document = block_on(screen.persist_document(&mut Strict))?;
    if json {
        println!("{}", document.to_json_pretty());
        return Ok(());
    }
    println!("{}", screen.title());
    for node in &document.data {
        print_outline(node, 1);
    }
    Ok(())
}

fn export_command(
    screen: &mut Screen<FileStore>,
    dataset: Option<String>,
    name: Option<String>,
    dir: PathBuf,
) -> Result<(), ScreenError> {
    open(screen, dataset)?;
    let path = match name {
        Some(name) => block_on(screen.save_as(&dir, &name))?,
        None => block_on(screen.export_to_file(&dir))?,
    };
    println!("Exported {}", path.display());
    Ok(())
}

fn import_command(screen: &mut Screen<FileStore>, file: PathBuf) -> Result<(), ScreenError> {
    let restored = screen.import_file(&file)?;
    block_on(screen.persist_to_local_storage())?;
    println!(
        "Imported {restored} block(s) into dataset '{}'",
        screen.dataset()
    );
    Ok(())
}

fn add_block_command(
    screen: &mut Screen<FileStore>,
    host: &MemoryEditorHost,
    dataset: Option<String>,
    at: Point,
    heading: Option<String>,
    text: Vec<String>,
) -> Result<(), ScreenError> {
    open(screen, dataset)?;
    let block = screen.create_block(at)?;
    let own = screen.scene().own_children(block, 1);

    if let (Some(heading), Some(header)) = (heading, own.first().copied()) {
        let editor = block_on(screen.start_edit(header))?;
        if let Visual::TextInput(value) = &mut screen
            .scene_mut()
            .node_mut(editor)
            .map_err(DocumentError::from)?
            .visual
        {
            *value = heading;
        }
        block_on(screen.complete_edit())?;
    }
    if let (false, Some(content)) = (text.is_empty(), own.get(1).copied()) {
        block_on(screen.start_edit(content))?;
        if let Some(engine) = host.last() {
            let paragraphs: Vec<&str> = text.iter().map(String::as_str).collect();
            engine.type_paragraphs(&paragraphs);
        }
        block_on(screen.complete_edit())?;
    }

    block_on(screen.save())?;
    println!("Added block to dataset '{}'", screen.dataset());
    Ok(())
}

fn clear_command(screen: &mut Screen<FileStore>) -> Result<(), ScreenError> {
    screen.clear_memory()?;
    println!("Cleared all datasets");
    Ok(())
}

fn print_outline(node: &Value, depth: usize) {
    let indent = "  ".repeat(depth);
    let kind = node.get("type").and_then(Value::as_str).unwrap_or("?");
    let detail = match kind {
        "block" => ["left", "top", "width", "height"]
            .iter()
            .map(|key| {
                format!(
                    "{key}={}",
                    node.get(*key).and_then(Value::as_str).unwrap_or("-")
                )
            })
            .collect::<Vec<_>>()
            .join(" "),
        "blockHeader" | "blockHeaderEditor" => format!(
            "{:?}",
            node.get("text").and_then(Value::as_str).unwrap_or_default()
        ),
        "blockContent" | "blockContentEditor" => node
            .pointer("/data/blocks")
            .and_then(Value::as_array)
            .map(|blocks| {
                blocks
                    .iter()
                    .filter_map(|block| block.pointer("/data/text").and_then(Value::as_str))
                    .collect::<Vec<_>>()
                    .join(" | ")
            })
            .unwrap_or_default(),
        _ => String::new(),
    };
    println!("{indent}{kind} {detail}");
    if let Some(children) = node.get("children").and_then(Value::as_array) {
        for child in children {
            print_outline(child, depth + 1);
        }
    }
}
