//! Server entry point (`spec.md` §6 "Startup sequence"): parse CLI args,
//! load config, load catalogs, connect to the key-value store, build
//! the world, spawn the tick engine, accept connections.

mod connection;
mod deps;
mod dispatch;
mod gameplay;
mod player_sync;
mod session;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use clap::Parser;
use slog::{info, o};

use realm_catalogs::Catalogs;
use realm_persistence::Store;
use realm_shared::config::Config;
use realm_world::map_manager::MapManager;
use realm_world::registry::SessionRegistry;

use deps::Dependencies;
use session::SessionTable;

#[derive(Parser, Debug)]
#[command(name = "realmd", version, about = "Authoritative game server")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, default_value = "realmd.toml")]
    config: PathBuf,

    /// Directory holding the catalog JSON files.
    #[arg(long, default_value = "catalogs")]
    catalogs: PathBuf,

    /// Verbose (debug-level) logging.
    #[arg(long)]
    debug: bool,
}

fn main() {
    let cli = Cli::parse();

    let mut config = Config::load(&cli.config).expect("loading config");
    config.apply_env_overrides();
    let config = Arc::new(config);

    let log = realm_shared::logging::init(cli.debug);
    info!(log, "starting realmd"; "config" => cli.config.display().to_string());

    let catalogs = Catalogs::load_dir(&cli.catalogs).expect("loading catalogs");
    info!(
        log,
        "catalogs loaded";
        "maps" => catalogs.maps.maps.len(),
        "npc_templates" => catalogs.npcs.templates.len(),
        "spawns" => catalogs.spawns.len(),
    );
    let catalogs = Arc::new(catalogs);

    let store = Store::connect_from_config(&config.persistence).expect("connecting to key-value store");

    let mut map_manager = MapManager::new(catalogs.maps.clone());
    for spawn in &catalogs.spawns {
        match catalogs.npcs.get(spawn.template_id) {
            Some(template) => {
                if let Err(err) = map_manager.spawn_npc(template, spawn.map, spawn.x, spawn.y) {
                    slog::warn!(log, "failed to spawn npc"; "template_id" => spawn.template_id, "error" => %err);
                }
            }
            None => slog::warn!(log, "spawn references unknown npc template"; "template_id" => spawn.template_id),
        }
    }
    let world = Arc::new(Mutex::new(map_manager));

    let registry = Arc::new(SessionRegistry::new());
    let sessions = Arc::new(SessionTable::new());

    let tick_deps_log = log.new(o!("component" => "tick"));
    let mut engine = realm_world::build_tick_engine(
        config.game.tick_ms,
        &config.effects,
        world.clone(),
        store.clone(),
        registry.clone(),
        tick_deps_log,
    );

    // No signal-handling crate is in the dependency stack, so `shutdown`
    // never flips: SIGINT/SIGTERM fall back to the default disposition
    // (immediate process exit) rather than a hand-rolled handler over
    // unsafe FFI. `run_listener` and the tick loop both still take it,
    // ready for a future signal source to set it.
    let shutdown = Arc::new(AtomicBool::new(false));

    let tick_shutdown = shutdown.clone();
    std::thread::spawn(move || {
        engine.run(realm_shared::time::timestamp_secs, move || !tick_shutdown.load(Ordering::Relaxed));
    });

    let tls_config = build_tls_config(&config, &log);

    let deps = Dependencies { config: config.clone(), catalogs, store, world, registry, sessions, log: log.clone() };

    if let Err(err) = connection::run_listener(deps, tls_config, shutdown) {
        slog::error!(log, "listener exited"; "error" => %err);
        std::process::exit(1);
    }
}

/// Builds a server-side TLS config from the PEM paths in
/// `config.server`, if TLS is enabled.
fn build_tls_config(config: &Config, log: &slog::Logger) -> Option<Arc<rustls::ServerConfig>> {
    if !config.server.tls {
        return None;
    }

    let cert_path = config.server.tls_cert.as_ref().expect("tls enabled without tls_cert");
    let key_path = config.server.tls_key.as_ref().expect("tls enabled without tls_key");

    let certs = rustls_pemfile::certs(&mut std::io::BufReader::new(std::fs::File::open(cert_path).expect("opening tls cert")))
        .collect::<Result<Vec<_>, _>>()
        .expect("parsing tls cert chain");
    let key = rustls_pemfile::private_key(&mut std::io::BufReader::new(std::fs::File::open(key_path).expect("opening tls key")))
        .expect("parsing tls key")
        .expect("no private key found in tls key file");

    let server_config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .expect("building tls server config");

    info!(log, "tls enabled"; "cert" => cert_path.as_str());
    Some(Arc::new(server_config))
}
