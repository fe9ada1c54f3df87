use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config;
use crate::contract::{self, ContractCall};
use crate::domain::{id::TrackId, principal::Principal, track::Track};
use crate::registry::db::i64_seconds_to_local_time;
use crate::registry::operations::Registry;

#[derive(Parser)]
#[command(name = "sonic_chain")]
#[command(version = "0.1")]
#[command(about = "Ownership and licensing registry for audio tracks")]
pub struct Cli {
    /// Path to the config TOML file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register a new track, owned by the sender
    Register {
        /// Account registering the track
        #[arg(short, long)]
        sender: Principal,
        title: String,
        artist: String,
        license_type: String,
        price: u64,
    },
    /// Transfer a track to a new owner
    Transfer {
        /// Current owner of the track
        #[arg(short, long)]
        sender: Principal,
        id: TrackId,
        new_owner: Principal,
    },
    /// Change license type and price of a track
    UpdateLicense {
        /// Current owner of the track
        #[arg(short, long)]
        sender: Principal,
        id: TrackId,
        license_type: String,
        price: u64,
    },
    /// Show a single track
    Info { id: TrackId },
    /// List registered tracks
    List {
        /// Only show tracks owned by this account
        #[arg(short, long)]
        owner: Option<Principal>,
    },
    /// Show the operations applied to a track
    History { id: TrackId },
    /// Call a contract function by name and print the receipt
    Call {
        #[arg(short, long)]
        sender: Principal,
        /// e.g. register-track, transfer-track, update-license, get-track-info
        function: String,
        args: Vec<String>,
    },
    /// Run http server exposing the registry
    Serve,
}

/// Entrypoint for CLI
pub fn run() {
    env_logger::init();

    let cli = Cli::parse();

    if let Err(e) = execute(cli) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn execute(cli: Cli) -> anyhow::Result<()> {
    let cfg = config::Config::load(&cli.config)?;
    let mut registry =
        Registry::new(&cfg.database, cfg.limits).with_context(|| "Failed to open registry")?;

    match cli.command {
        Commands::Register {
            sender,
            title,
            artist,
            license_type,
            price,
        } => {
            let id = registry.register(&sender, &title, &artist, &license_type, price)?;
            println!("Registered track {id}");
        }

        Commands::Transfer {
            sender,
            id,
            new_owner,
        } => {
            registry.transfer(&sender, id, &new_owner)?;
            println!("Track {id} now belongs to {new_owner}");
        }

        Commands::UpdateLicense {
            sender,
            id,
            license_type,
            price,
        } => {
            registry.update_license(&sender, id, &license_type, price)?;
            println!("Track {id} is now licensed as {license_type} for {price}");
        }

        Commands::Info { id } => match registry.get_track_info(id)? {
            Some(track) => print_track(&track),
            None => bail!("track {id} not found"),
        },

        Commands::List { owner } => {
            let tracks = registry.list_tracks(owner.as_ref())?;
            println!(
                "{} tracks registered, showing {}",
                registry.track_count()?,
                tracks.len()
            );
            for track in &tracks {
                print_track(track);
            }
        }

        Commands::History { id } => {
            for event in registry.history(id)? {
                println!(
                    "  #{} {} [{}] by {}: {}",
                    event.seq,
                    i64_seconds_to_local_time(event.recorded_at)?,
                    event.kind,
                    event.sender,
                    event.detail
                );
            }
        }

        Commands::Call {
            sender,
            function,
            args,
        } => {
            let call = ContractCall::parse(&function, &args)?;
            let read_only = call.is_read_only();
            let receipt = contract::execute(&mut registry, &sender, call)?;
            println!("{receipt}");
            if !read_only && !receipt.is_ok() {
                bail!("{function} failed with {receipt}");
            }
        }

        Commands::Serve => {
            let http_server = crate::http::server::HttpServer::new(registry, cfg.http);

            println!(
                "HTTP server running at http://{}:{}",
                http_server.config.bind_addr, http_server.config.port
            );
            http_server.run();
        }
    }

    Ok(())
}

fn print_track(track: &Track) {
    println!("Track {}: \"{}\" by {}", track.id, track.title, track.artist);
    println!("  owner:   {}", track.owner);
    println!(
        "  license: {} @ {}",
        track.license.license_type, track.license.price
    );
}
