/*!
cobre - dump CBOR data items as JSON

Reads one or more CBOR items from files or stdin and renders each as a
(lossy) JSON document, one per line.

# Examples

```bash
# Dump a single item
cobre data.cbor

# Dump a CBOR sequence from stdin, pretty-printed
cat items.cbor | cobre --sequence --pretty

# Base64-encoded input, with map keys sorted and tag 24 stripped
cobre --decode-base64 --sort-keys --ignore-tag 24 data.b64
```
*/

use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::Context;
use base64::prelude::*;
use clap::Parser;
use cobre_cbor::decode::DecodeOptions;
use cobre_cbor::Decoder;

mod dump;

/// Dump CBOR data items as JSON
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Input CBOR files (use '-' for stdin)
    #[arg(default_value = "-")]
    input: Vec<String>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(short, long)]
    pretty: bool,

    /// Sort map keys in the output
    #[arg(short = 'k', long)]
    sort_keys: bool,

    /// Decode a sequence of concatenated items from each input
    #[arg(short, long)]
    sequence: bool,

    /// Base64-decode inputs before parsing
    #[arg(short = 'd', long)]
    decode_base64: bool,

    /// Strip the given semantic tag before rendering (repeatable)
    #[arg(short, long = "ignore-tag", value_name = "TAG")]
    ignore_tag: Vec<u64>,
}

fn read_input(input: &str) -> anyhow::Result<Vec<u8>> {
    if input == "-" {
        let mut data = Vec::new();
        std::io::stdin()
            .read_to_end(&mut data)
            .context("error reading stdin")?;
        Ok(data)
    } else {
        fs::read(input).with_context(|| format!("error reading {input}"))
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut rendered = Vec::new();
    for input in &cli.input {
        let mut data = read_input(input)?;
        if cli.decode_base64 {
            data = BASE64_STANDARD
                .decode(data.trim_ascii())
                .with_context(|| format!("error base64-decoding {input}"))?;
        }

        let mut remaining = data.as_slice();
        loop {
            // Exact-sized reads leave the rest of the slice untouched
            // between items of a sequence
            let mut decoder =
                Decoder::with_options(&mut remaining, DecodeOptions::new().read_size(0));
            let value = decoder
                .decode()
                .with_context(|| format!("error decoding {input}"))?;
            drop(decoder);

            let json = dump::to_json(&value, &cli.ignore_tag, cli.sort_keys);
            rendered.push(if cli.pretty {
                serde_json::to_string_pretty(&json)?
            } else {
                serde_json::to_string(&json)?
            });

            if !cli.sequence || remaining.is_empty() {
                break;
            }
        }
    }

    let mut text = rendered.join("\n");
    text.push('\n');
    match &cli.output {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("error writing {}", path.display()))?
        }
        None => std::io::stdout().write_all(text.as_bytes())?,
    }
    Ok(())
}
