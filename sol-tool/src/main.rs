use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use sol_codec::tree::{self, ClassRule, ProjectionOptions};
use sol_codec::types::{Document, Value};

#[derive(Parser)]
#[command(name = "sol-tool", version, about = "View and edit Flash .sol save files")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the .sol files in a folder, skipping backups.
    List {
        /// Folder to search, defaults to the Jacksmith save folder.
        dir: Option<PathBuf>,
    },
    /// Print the contents of a file as an indented tree.
    Show {
        file: PathBuf,
    },
    /// Print the value at a path, e.g. `player/tools/[0]/level`.
    Get {
        file: PathBuf,
        path: String,
    },
    /// Replace the value at a path, parsing TEXT as the type already stored there.
    Set {
        file: PathBuf,
        path: String,
        text: String,
        /// Write the result here instead of overwriting FILE.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Export a file as JSON.
    Export {
        file: PathBuf,
        /// Write the JSON here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Add a `$class` key to objects of named classes.
        #[arg(long)]
        tag_classes: bool,
        /// Only tag these classes (implies --tag-classes for them).
        #[arg(long = "tag-class")]
        tag_class: Vec<String>,
    },
    /// Show what changed between two files.
    Diff {
        old: PathBuf,
        new: PathBuf,
    },
}

/// The folder Jacksmith (AIR) keeps its shared objects in
fn default_save_dir() -> Option<PathBuf> {
    let appdata = std::env::var_os("APPDATA")?;
    let dir = Path::new(&appdata)
        .join("com.flipline.jacksmith")
        .join("Local Store")
        .join("#SharedObjects");
    dir.is_dir().then_some(dir)
}

fn list_sol_files(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("reading folder: {}", dir.display()))? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("sol") {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if !name.to_lowercase().contains("backup") {
                names.push(name.to_string());
            }
        }
    }
    names.sort_by_key(|n| n.to_lowercase());
    Ok(names)
}

fn load(path: &Path) -> Result<Document> {
    sol_codec::read_file(path).with_context(|| format!("failed to read {}", path.display()))
}

fn indexed(items: &[Value]) -> Vec<(String, &Value)> {
    items
        .iter()
        .enumerate()
        .map(|(i, v)| (format!("[{}]", i), v))
        .collect()
}

/// Named children of a container, array elements are named `[i]`
fn children(value: &Value) -> Vec<(String, &Value)> {
    match value.unwrapped() {
        Value::Object(members, _) => members.iter().map(|e| (e.name.clone(), &e.value)).collect(),
        Value::ECMAArray(dense, assoc, _) => {
            let mut out = indexed(dense);
            out.extend(assoc.iter().map(|e| (e.name.clone(), &e.value)));
            out
        }
        Value::StrictArray(items) | Value::VectorObject(items, _, _) => indexed(items),
        _ => Vec::new(),
    }
}

fn print_tree(name: &str, value: &Value, depth: usize) {
    let indent = "  ".repeat(depth);
    if value.is_complex() {
        println!("{}{}: (complex type) {}", indent, name, value.kind());
        for (child_name, child) in children(value) {
            print_tree(&child_name, child, depth + 1);
        }
    } else {
        println!("{}{}: {}", indent, name, tree::to_text(value));
    }
}

fn projection(tag_classes: bool, tag_class: Vec<String>) -> ProjectionOptions {
    let options = if tag_classes {
        ProjectionOptions::tag_all()
    } else {
        ProjectionOptions::default()
    };
    tag_class
        .into_iter()
        .fold(options, |options, class| options.with_rule(class, ClassRule::Tagged))
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::List { dir } => {
            let dir = match dir.or_else(default_save_dir) {
                Some(dir) => dir,
                None => bail!("no folder given and the Jacksmith save folder wasn't found"),
            };
            let names = list_sol_files(&dir)?;
            if names.is_empty() {
                eprintln!("no .sol files in {}", dir.display());
            }
            for name in names {
                println!("{}", name);
            }
        }
        Command::Show { file } => {
            let document = load(&file)?;
            println!("{} ({})", document.name(), document.version());
            for (name, value) in children(&document.root) {
                print_tree(&name, value, 1);
            }
        }
        Command::Get { file, path } => {
            let document = load(&file)?;
            let value = document.get(&tree::Path::parse(&path))?;
            if value.is_complex() {
                let json = tree::to_json(value, &ProjectionOptions::default());
                println!("{}", serde_json::to_string_pretty(&json)?);
            } else {
                println!("{}", tree::to_text(value));
            }
        }
        Command::Set {
            file,
            path,
            text,
            output,
        } => {
            let mut document = load(&file)?;
            let path = tree::Path::parse(&path);
            let before = document.get(&path)?.clone();
            document
                .set_text(&path, &text)
                .with_context(|| format!("can't set {}", path))?;

            let target = output.unwrap_or(file);
            sol_codec::write_file(&target, &document)
                .with_context(|| format!("failed to write {}", target.display()))?;
            log::info!(
                "{}: {} -> {}",
                path,
                tree::to_text(&before),
                tree::to_text(document.get(&path)?)
            );
        }
        Command::Export {
            file,
            output,
            tag_classes,
            tag_class,
        } => {
            let document = load(&file)?;
            let json = document.to_json(&projection(tag_classes, tag_class));
            let text = serde_json::to_string_pretty(&json)?;
            match output {
                Some(out) => fs::write(&out, text)
                    .with_context(|| format!("failed to write {}", out.display()))?,
                None => println!("{}", text),
            }
        }
        Command::Diff { old, new } => {
            let old = load(&old)?;
            let new = load(&new)?;
            let changes = tree::diff(&old.root, &new.root);
            if changes.is_empty() {
                println!("no differences");
            }
            for change in changes {
                println!("{}", change);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sol_codec::types::{AMFVersion, Element};

    #[test]
    fn lists_sol_files_without_backups() {
        let dir = std::env::temp_dir().join(format!("sol-tool-list-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        for name in ["b.sol", "A.sol", "save_Backup.sol", "notes.txt"] {
            fs::write(dir.join(name), b"").unwrap();
        }

        assert_eq!(list_sol_files(&dir).unwrap(), vec!["A.sol", "b.sol"]);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn children_of_containers() {
        let doc = Document::new(
            vec![
                Element::new("coins", 5.0),
                Element::new("tools", Value::StrictArray(vec![1.0.into(), 2.0.into()])),
            ],
            "x",
            AMFVersion::AMF0,
        );
        let names: Vec<_> = children(&doc.root).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["coins", "tools"]);

        let tools = doc.get(&tree::Path::parse("tools")).unwrap();
        let names: Vec<_> = children(tools).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["[0]", "[1]"]);
    }
}
