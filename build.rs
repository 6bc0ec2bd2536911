// build.rs

use clap::{Arg, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: database path
fn db_path_arg() -> Arg {
    Arg::new("db_path")
        .short('d')
        .long("db-path")
        .value_name("PATH")
        .default_value("graft.db")
        .help("Database path")
}

fn build_cli() -> Command {
    Command::new("graft")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Graft Contributors")
        .about("Batched content importer with atomic transactions and dependency ordering")
        .subcommand_required(false)
        .subcommand(
            Command::new("init")
                .about("Initialize the Graft database")
                .arg(db_path_arg()),
        )
        .subcommand(
            Command::new("run")
                .about("Run a recipe file against the content database")
                .arg(Arg::new("recipe").required(true).help("Recipe XML file path"))
                .arg(db_path_arg())
                .arg(
                    Arg::new("batch_size")
                        .short('b')
                        .long("batch-size")
                        .value_name("N")
                        .help("Override the batch size declared in the recipe"),
                ),
        )
        .subcommand(
            Command::new("show")
                .about("Show an imported content item by identity")
                .arg(Arg::new("identity").required(true).help("Content identity"))
                .arg(db_path_arg()),
        )
        .subcommand(
            Command::new("history")
                .about("Show recorded recipe runs")
                .arg(db_path_arg()),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "zsh", "fish", "powershell"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory - use CARGO_MANIFEST_DIR which is always set by cargo
    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    // Generate main man page
    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("graft.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
        return;
    }

    println!("cargo:warning=Man page generated at {}", man_path.display());
}
