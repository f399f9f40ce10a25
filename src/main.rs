//! VCMI Launcher entry point
//!
//! On the web the page drives `platform::web::Launcher`. Natively this runs a
//! dry bootstrap: each file named on the command line is staged as game
//! data, the in-process cache stands in for IndexedDB, and the engine only
//! records what it was asked to do.

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("VCMI launcher (native dry run) starting...");

    if let Err(e) = futures::executor::block_on(dry_run::run(std::env::args().skip(1))) {
        log::error!("Dry run failed: {}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is platform::web::wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
mod dry_run {
    use std::path::Path;

    use vcmi_launcher::{
        Bootstrap, EngineSettings, LauncherConfig, PendingPayload, RecordingEngine,
        StoreProvisioner,
    };

    pub async fn run(
        files: impl Iterator<Item = String>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let config = LauncherConfig::load();
        let stores = StoreProvisioner::for_host();
        let pending = PendingPayload::new();

        for file in files {
            let path = Path::new(&file);
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| format!("not a file name: {}", file))?;
            pending.stage(name, std::fs::read(path)?)?;
            log::info!("Staged {}", name);
        }

        let settings = EngineSettings::new(
            serde_json::json!({ "video": { "resolution": config.default_resolution } }).to_string(),
        );
        let engine = RecordingEngine::new();
        let files = stores.files().await;

        let report = Bootstrap::new(&engine, &*files, &pending, settings.as_bytes())
            .launch_args(config.launch_args.clone())
            .run()
            .await?;

        for path in engine.written_paths() {
            println!("{}", path);
        }
        println!(
            "{} staged, {} cached, default mod settings: {}",
            report.pending_written, report.persisted_written, report.default_mod_settings
        );
        stores.close_all();
        Ok(())
    }
}
