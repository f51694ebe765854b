// No console window in release builds
#![cfg_attr(all(target_os = "windows", not(debug_assertions)), windows_subsystem = "windows")]

#[cfg(target_os = "windows")]
mod windows_main;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Starting map overlay v{}", env!("CARGO_PKG_VERSION"));

    #[cfg(target_os = "windows")]
    windows_main::run();

    #[cfg(not(target_os = "windows"))]
    {
        log::error!("The map overlay needs Windows (layered windows and Direct2D)");
        std::process::exit(1);
    }
}
