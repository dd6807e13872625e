use pegasus_editor::cli::CliOverrides;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = match CliOverrides::parse_from_env() {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("[cli] {err}");
            std::process::exit(2);
        }
    };
    if let Err(err) = pegasus_editor::run(cli) {
        log::error!("editor error: {err:?}");
        std::process::exit(1);
    }
}
