use color_eyre::config::HookBuilder;
use tracing::error;

/// Installs the eyre report hook, and a panic hook that logs the panic before
/// handing it to `better-panic` (debug) or `human-panic` (release).
pub fn initialize_panic_handler() -> color_eyre::Result<()> {
    let (_panic_hook, eyre_hook) = HookBuilder::default()
        .display_location_section(true)
        .display_env_section(false)
        .into_hooks();
    eyre_hook.install()?;

    std::panic::set_hook(Box::new(move |panic_info| {
        error!("Panic: {}", panic_info);

        #[cfg(not(debug_assertions))]
        {
            use human_panic::{handle_dump, print_msg, Metadata};
            let meta = Metadata::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
            let file_path = handle_dump(&meta, panic_info);
            if print_msg(file_path, &meta).is_err() {
                eprintln!("{panic_info}");
            }
        }

        #[cfg(debug_assertions)]
        {
            better_panic::Settings::auto()
                .most_recent_first(false)
                .lineno_suffix(true)
                .verbosity(better_panic::Verbosity::Full)
                .create_panic_handler()(panic_info);
        }

        std::process::exit(1);
    }));
    Ok(())
}
