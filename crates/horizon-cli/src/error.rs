use colored::Colorize;

pub fn handle_error(err: anyhow::Error) -> ! {
    eprintln!("{} {}", "Error:".red().bold(), err);

    let msg = err.to_string().to_lowercase();

    if msg.contains("api key not found") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Set your API key with:");
        eprintln!("  {} export HORIZON_API_KEY=<value>", "$".dimmed());
        eprintln!("  or add it under [api_keys] in the config file.");
    }

    if msg.contains("project not found") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  List available projects with:");
        eprintln!("  {} horizon project list", "$".dimmed());
    }

    if msg.contains("connection") || msg.contains("network") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Check your internet connection and the API URL, then try again.");
    }

    std::process::exit(1);
}
