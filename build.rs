// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn build_cli() -> Command {
    Command::new("gpkg-merge")
        .version(env!("CARGO_PKG_VERSION"))
        .author("gpkg-merge Contributors")
        .about("Merge the tile sets of two GeoPackages; the second file wins conflicts")
        .arg(
            Arg::new("file_a")
                .required(true)
                .value_name("FILE_A")
                .help("Low-priority GeoPackage; its tiles only fill gaps"),
        )
        .arg(
            Arg::new("file_b")
                .required(true)
                .value_name("FILE_B")
                .help("High-priority GeoPackage; its tiles win every conflict"),
        )
        .arg(
            Arg::new("output")
                .value_name("OUTPUT")
                .help("Output path (default: merged_<a>_<b>.gpkg; never overwrites an existing file)"),
        )
        .arg(
            Arg::new("table_name")
                .value_name("TABLE_NAME")
                .default_value("merged_tiles")
                .help("Name of the merged tile table"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Print the merge report as JSON"),
        )
        .arg(
            Arg::new("no_vacuum")
                .long("no-vacuum")
                .action(ArgAction::SetTrue)
                .help("Skip compacting the output after the merge"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Enable debug logging (overridden by RUST_LOG)"),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory
    let out_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("Failed to create man directory");

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();
    man.render(&mut buffer).expect("Failed to render man page");

    let man_path = man_dir.join("gpkg-merge.1");
    fs::write(&man_path, buffer).expect("Failed to write man page");
}
