use json_query::{evaluate, QueryLang, ResultMode, SerializeOptions};

use clap::Parser;
use std::error::Error;
use std::io::{self, Read};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The query string.
    #[arg(short, long)]
    query: String,

    /// Query language: jsonpath or jmespath.
    #[arg(short, long, default_value = "jsonpath")]
    lang: QueryLang,

    /// For JSONPath, report matched values or their normalized paths.
    #[arg(short, long, default_value = "value")]
    mode: ResultMode,

    /// Pretty-print the result with this many spaces per level.
    #[arg(short, long)]
    indent: Option<usize>,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut document = String::new();
    io::stdin().read_to_string(&mut document)?;
    log::debug!("read {} bytes from stdin", document.len());

    let options = SerializeOptions {
        indent: args.indent,
        ..SerializeOptions::default()
    };
    let result = evaluate(&document, &args.query, args.lang, args.mode, &options)?;
    println!("{}", result);
    Ok(())
}
