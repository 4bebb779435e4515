//! Build automation tasks for umig
//!
//! Currently generates the CLI reference from the clap definitions.

use anyhow::Context;
use clap::Parser;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation tasks for umig", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Generate the CLI reference in Markdown
    GenerateCliDocs {
        /// Output directory for generated documentation
        #[arg(short, long, default_value = "docs")]
        output_dir: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::GenerateCliDocs { output_dir } => generate_cli_docs(&output_dir)?,
    }

    Ok(())
}

fn generate_cli_docs(output_dir: &str) -> anyhow::Result<()> {
    println!("Generating CLI documentation...");

    let markdown = clap_markdown::help_markdown::<umig_cli::Cli>();

    let content = format!(
        r#"# umig CLI Reference

Generated from the CLI source code on {}.

## Overview

`umig` migrates users between two identity tenants in two phases:

1. `umig export` starts a bulk export on the source tenant, waits for it and
   downloads the gzip archive (default `exported_users.json.gz`).
2. `umig import` splits the archive into batches of at most 500 000 bytes and
   imports them one after another into the destination tenant. Every batch is
   an upsert, so re-running an interrupted import is safe.

## Quick Start

```bash
cat > .env <<'ENV'
SOURCE_DOMAIN=source.eu.auth0.com
SOURCE_CLIENT_ID=...
SOURCE_CLIENT_SECRET=...
SOURCE_CONNECTION_ID=con_...
DESTINATION_DOMAIN=destination.eu.auth0.com
DESTINATION_CLIENT_ID=...
DESTINATION_CLIENT_SECRET=...
DESTINATION_CONNECTION_ID=con_...
ENV

umig export
umig import
```

## Commands

{}

## Environment Variables

- `SOURCE_*` / `DESTINATION_*` - `DOMAIN`, `CLIENT_ID`, `CLIENT_SECRET` and `CONNECTION_ID` of each tenant (required)
- `UMIG_ARCHIVE_PATH` - Path of the export archive
- `UMIG_HTTP_TIMEOUT_SECS` - Timeout for a single HTTP request
- `UMIG_LOG_LEVEL`, `UMIG_LOG_OUTPUT`, `UMIG_LOG_FORMAT`, `UMIG_LOG_DIR`, `UMIG_LOG_FILTER` - Logging

---

*To update, run `cargo xtask generate-cli-docs`.*
"#,
        chrono::Utc::now().format("%Y-%m-%d"),
        markdown
    );

    let output_path = PathBuf::from(output_dir);
    fs::create_dir_all(&output_path)
        .with_context(|| format!("Failed to create {}", output_path.display()))?;

    let file_path = output_path.join("cli-reference.md");
    fs::write(&file_path, content)?;

    println!("✅ Generated CLI documentation at: {}", file_path.display());

    Ok(())
}
