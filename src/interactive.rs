use std::io::{self, Write};

use crate::config::{
    DEFAULT_INTERVAL_SECS, DEFAULT_QUORUM_PERCENT, MAX_INTERVAL_SECS, MIN_INTERVAL_SECS,
    SavedConfig, save_config, validate_slug,
};

const DEFAULT_ENDPOINT: &str = "http://localhost:8000/polls/get_chart_data/";

/// Helper struct for managing user input operations
struct InputHandler;

impl InputHandler {
    /// Gets user input with automatic trimming
    fn get_input() -> Result<String, io::Error> {
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        Ok(input.trim().to_string())
    }

    /// Prompts user with a question and handles yes/no responses
    fn confirm_prompt(message: &str, default_yes: bool) -> Result<bool, io::Error> {
        let default_text = if default_yes { "[Y/n]" } else { "[y/N]" };

        loop {
            print!("{} {}: ", message, default_text);
            io::stdout().flush()?;

            let input = Self::get_input()?.to_lowercase();

            match input.as_str() {
                "" => return Ok(default_yes),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => {
                    println!("❌ Please enter Y for yes or N for no.");
                    println!();
                }
            }
        }
    }

    /// Prompts for free text; an empty answer takes the default when there is one
    fn text_prompt(prompt: &str, default: Option<&str>) -> Result<String, io::Error> {
        loop {
            match default {
                Some(d) => print!("{} [{}]: ", prompt, d),
                None => print!("{}: ", prompt),
            }
            io::stdout().flush()?;

            let input = Self::get_input()?;
            match (input.is_empty(), default) {
                (false, _) => return Ok(input),
                (true, Some(d)) => return Ok(d.to_string()),
                (true, None) => println!("❌ This value is required."),
            }
        }
    }

    /// Prompts for a slug, re-asking until it is valid
    fn slug_prompt(prompt: &str, optional: bool) -> Result<Option<String>, io::Error> {
        loop {
            print!("{}{}: ", prompt, if optional { " (Enter to skip)" } else { "" });
            io::stdout().flush()?;

            let input = Self::get_input()?;
            if input.is_empty() {
                if optional {
                    return Ok(None);
                }
                println!("❌ This value is required.");
                continue;
            }
            match validate_slug(&input) {
                Ok(()) => return Ok(Some(input)),
                Err(e) => {
                    println!("❌ {}", e);
                    println!();
                }
            }
        }
    }

    /// Prompts for a number within a range
    fn number_prompt<T>(prompt: &str, min: T, max: T, default: T) -> Result<T, io::Error>
    where
        T: std::str::FromStr + PartialOrd + std::fmt::Display + Copy,
    {
        loop {
            print!("{} ({}-{}) [{}]: ", prompt, min, max, default);
            io::stdout().flush()?;

            let input = Self::get_input()?;
            if input.is_empty() {
                return Ok(default);
            }
            match input.parse::<T>() {
                Ok(n) if n >= min && n <= max => return Ok(n),
                _ => {
                    println!("❌ Please enter a number between {} and {}.", min, max);
                    println!();
                }
            }
        }
    }
}

/// Helper struct for display formatting
struct DisplayHelper;

impl DisplayHelper {
    fn print_header(title: &str, width: usize) {
        println!("{}", title);
        println!("{}", "=".repeat(width));
        println!();
    }

    fn print_config_summary(config: &SavedConfig) {
        println!("📋 Configuration Summary:");
        println!("   🌐 Endpoint: {}", config.endpoint);
        println!("   🏢 Company: {}", config.comp_slug.as_deref().unwrap_or("(none)"));
        println!("   🗳️  Event: {}", config.event_slug);
        println!("   ❓ Question: {}", config.question_no);
        println!("   ✅ Quorum: {}%", config.quorum_percent);
        println!("   ⏱️  Refresh every: {}s", config.refresh_interval_secs);
        println!("   🔄 Auto-refresh at start: {}", if config.auto_refresh { "Yes" } else { "No" });
        println!();
    }
}

/// Ask for everything needed to watch an event. `None` means the user backed out.
pub fn run_interactive_mode() -> Result<Option<SavedConfig>, io::Error> {
    DisplayHelper::print_header("🗳️  Welcome to votewatch - Interactive Setup", 50);

    // Step 1: where the results live
    println!("🌐 Results endpoint");
    println!("   The URL the results page polls for chart data.");
    let endpoint = InputHandler::text_prompt("🌐 Endpoint", Some(DEFAULT_ENDPOINT))?;
    println!();

    // Step 2: which event and question
    let comp_slug = InputHandler::slug_prompt("🏢 Company slug", true)?;
    let event_slug = match InputHandler::slug_prompt("🗳️  Event slug", false)? {
        Some(slug) => slug,
        None => return Ok(None),
    };
    let question_no = InputHandler::number_prompt("❓ Question number", 1u32, 999, 1)?;
    println!();

    // Step 3: display options
    let quorum_percent = InputHandler::number_prompt(
        "✅ Quorum in percent",
        0.0f64,
        100.0,
        DEFAULT_QUORUM_PERCENT,
    )?;
    let refresh_interval_secs = InputHandler::number_prompt(
        "⏱️  Refresh interval in seconds",
        MIN_INTERVAL_SECS,
        MAX_INTERVAL_SECS,
        DEFAULT_INTERVAL_SECS,
    )?;
    let auto_refresh = InputHandler::confirm_prompt("🔄 Start with auto-refresh on?", true)?;

    let config = SavedConfig {
        endpoint,
        comp_slug,
        event_slug,
        question_no,
        question_count: None,
        quorum_percent,
        refresh_interval_secs,
        auto_refresh,
    };

    // Step 4: summary, save, confirm
    println!();
    DisplayHelper::print_config_summary(&config);

    println!("💾 Save these settings for future use?");
    println!("   (Next time you run the program, they are used automatically)");
    println!();
    let save_settings = InputHandler::confirm_prompt("💾 Save settings?", true)?;

    if !InputHandler::confirm_prompt("🔥 Start watching with these settings?", true)? {
        println!("❌ Cancelled.");
        return Ok(None);
    }

    if save_settings {
        match save_config(&config) {
            Ok(()) => {
                println!("💾 Configuration saved! Next time you can start quickly.");
                println!();
            }
            Err(e) => {
                eprintln!("⚠️  Warning: Could not save configuration: {}", e);
                eprintln!("    (This won't affect monitoring, continuing...)");
                println!();
            }
        }
    }

    Ok(Some(config))
}
