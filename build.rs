// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: formula name or path
fn formula_arg() -> Arg {
    Arg::new("formula")
        .required(true)
        .help("Formula name or path to a .toml formula")
}

/// Common argument: installed formula name
fn name_arg() -> Arg {
    Arg::new("name").required(true).help("Installed formula name")
}

fn json_arg() -> Arg {
    Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Print as JSON")
}

fn build_cli() -> Command {
    Command::new("formulary")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Formulary Contributors")
        .about("Install command-line tools from verified source formulas")
        .subcommand_required(true)
        .arg(
            Arg::new("prefix")
                .long("prefix")
                .value_name("DIR")
                .global(true)
                .env("FORMULARY_PREFIX")
                .help("Installation prefix (executables go to <DIR>/bin)"),
        )
        .arg(
            Arg::new("formula_dir")
                .long("formula-dir")
                .value_name("DIR")
                .global(true)
                .env("FORMULARY_FORMULA_DIR")
                .help("Extra directory of *.toml formulas"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Show debug output"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Only show warnings and errors"),
        )
        .subcommand(
            Command::new("info")
                .about("Show a formula's metadata and resolved source")
                .arg(formula_arg())
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("validate")
                .about("Check a formula for errors and warnings")
                .arg(formula_arg()),
        )
        .subcommand(
            Command::new("fetch")
                .about("Download and verify a formula's source archive")
                .arg(formula_arg()),
        )
        .subcommand(
            Command::new("install")
                .about("Fetch, verify, build and install a formula")
                .arg(formula_arg())
                .arg(
                    Arg::new("force")
                        .short('f')
                        .long("force")
                        .action(ArgAction::SetTrue)
                        .help("Reinstall even if this release is already installed"),
                )
                .arg(
                    Arg::new("keep_builddir")
                        .long("keep-builddir")
                        .action(ArgAction::SetTrue)
                        .help("Keep the build directory (for debugging)"),
                ),
        )
        .subcommand(
            Command::new("uninstall")
                .about("Remove an installed formula")
                .arg(name_arg()),
        )
        .subcommand(
            Command::new("list")
                .about("List installed formulas")
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("verify")
                .about("Check installed files against their recorded hashes")
                .arg(name_arg()),
        )
        .subcommand(
            Command::new("search")
                .about("Search available formulas")
                .arg(Arg::new("query").help("Substring of a name or description")),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "elvish", "fish", "powershell", "zsh"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let out_dir = match env::var("OUT_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=OUT_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = out_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("formulary.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
