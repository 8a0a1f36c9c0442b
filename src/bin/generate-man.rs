use clap::CommandFactory;
use ontrack::cli::Cli;
use std::fs;
use std::path::PathBuf;

/// Write ontrack.1 into the directory given as the first argument (default: ./man)
fn main() -> std::io::Result<()> {
    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("man"));
    fs::create_dir_all(&out_dir)?;

    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buffer: Vec<u8> = Vec::new();
    man.render(&mut buffer)?;

    let path = out_dir.join("ontrack.1");
    fs::write(&path, buffer)?;
    println!("Wrote {}", path.display());
    Ok(())
}
