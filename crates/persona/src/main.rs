// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persona - clone a subject's conversational style from recorded media.
//!
//! This is the binary entry point for the Persona service.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod commands;
mod serve;
mod services;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use persona_config::PersonaConfig;

/// Persona - clone a subject's conversational style from recorded media.
#[derive(Parser, Debug)]
#[command(name = "persona", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP API server.
    Serve,
    /// Register a new subject and print it as JSON.
    Register {
        /// Owner recorded on the subject.
        #[arg(long)]
        owner: Option<String>,
        /// Explicit subject id. A UUID is generated when omitted.
        #[arg(long = "id")]
        subject_id: Option<String>,
    },
    /// Run one ingestion pass over a local media file and print the profile.
    ///
    /// The file is copied first; the original is left in place.
    Ingest {
        subject_id: String,
        media: PathBuf,
    },
}

fn load_config(path: Option<&PathBuf>) -> PersonaConfig {
    let loaded = match path {
        Some(path) => persona_config::load_and_validate_path(path),
        None => persona_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            persona_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());
    serve::init_tracing(&config.agent.log_level);

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Register { owner, subject_id }) => {
            commands::register(&config, owner, subject_id).await
        }
        Some(Commands::Ingest { subject_id, media }) => {
            commands::ingest(&config, &subject_id, &media).await
        }
        None => {
            println!("persona: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn config_defaults_load_from_inline_toml() {
        let config = persona_config::load_and_validate_str("").expect("empty config is valid");
        assert_eq!(config.agent.name, "persona");
    }

    #[test]
    fn ingest_takes_subject_then_media() {
        let cli = Cli::parse_from(["persona", "ingest", "alice", "clip.mp4"]);
        match cli.command {
            Some(Commands::Ingest { subject_id, media }) => {
                assert_eq!(subject_id, "alice");
                assert_eq!(media, PathBuf::from("clip.mp4"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn register_flags_are_optional() {
        let cli = Cli::parse_from(["persona", "--config", "p.toml", "register", "--id", "bob"]);
        assert_eq!(cli.config, Some(PathBuf::from("p.toml")));
        match cli.command {
            Some(Commands::Register { owner, subject_id }) => {
                assert!(owner.is_none());
                assert_eq!(subject_id.as_deref(), Some("bob"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
