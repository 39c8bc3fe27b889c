use crate::errors::CliError;
use clap::Parser;
use curator_catalogue::{default_reader, inspect_all, render_markdown, write_csv};
use curator_logger as logger;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
pub struct InspectCommand {
    /// Data files to describe
    #[arg(required = true, value_name = "FILES")]
    pub files: Vec<String>,

    /// Write a CSV table here instead of printing Markdown
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub fn handle_inspect(cmd: InspectCommand) -> Result<(), CliError> {
    let reader = default_reader()?;
    let records = inspect_all(reader.as_ref(), &cmd.files)?;
    logger::debug(&format!(
        "Found {} object(s) in {} file(s)",
        records.len(),
        cmd.files.len()
    ));

    match cmd.output {
        Some(path) => {
            let file = File::create(&path)?;
            write_csv(&records, BufWriter::new(file))?;
            logger::success(&format!("Inspection written to {}", path.display()));
        }
        None => print!("{}", render_markdown(&records)),
    }
    Ok(())
}
