//! User-Friendly Error Formatting
//!
//! Turns fatal errors into a message with troubleshooting hints for the
//! failures users actually run into: a refused grab, a lost display
//! connection and a broken configuration file.

use std::fmt::Write;

/// Format error for user consumption
///
/// Takes technical error and produces user-friendly message with
/// troubleshooting steps and context.
pub fn format_user_error(error: &anyhow::Error) -> String {
    let mut output = String::new();

    writeln!(&mut output).ok();
    writeln!(
        &mut output,
        "╔════════════════════════════════════════════════════════════╗"
    )
    .ok();
    writeln!(
        &mut output,
        "║                     ERROR                                  ║"
    )
    .ok();
    writeln!(
        &mut output,
        "╚════════════════════════════════════════════════════════════╝"
    )
    .ok();
    writeln!(&mut output).ok();

    // Match against the whole chain, the category often sits in a context
    let error_msg = format!("{:#}", error);
    let lower = error_msg.to_lowercase();

    if lower.contains("connection lost") || lower.contains("disconnected") {
        format_connection_error(&mut output);
    } else if lower.contains("grab") {
        format_grab_error(&mut output);
    } else if lower.contains("config") {
        format_config_error(&mut output);
    } else {
        format_generic_error(&mut output, &error.to_string());
    }

    writeln!(&mut output).ok();
    writeln!(
        &mut output,
        "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━"
    )
    .ok();
    writeln!(&mut output, "Technical Details:").ok();
    writeln!(&mut output).ok();
    writeln!(&mut output, "{}", error_msg).ok();
    writeln!(&mut output).ok();

    writeln!(
        &mut output,
        "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━"
    )
    .ok();
    writeln!(&mut output, "Need Help?").ok();
    writeln!(&mut output, "  - Run with --verbose for detailed logs: strokewarden -vv").ok();
    writeln!(&mut output, "  - Validate the configuration: strokewarden --check").ok();
    writeln!(
        &mut output,
        "╚════════════════════════════════════════════════════════════╝"
    )
    .ok();

    output
}

fn format_connection_error(output: &mut String) {
    writeln!(output, "Display Connection Lost").ok();
    writeln!(output).ok();
    writeln!(output, "The connection to the display server went away.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. The session ended or the display server restarted").ok();
    writeln!(output, "     → Start strokewarden again from the new session").ok();
    writeln!(output).ok();
    writeln!(output, "  2. The event source closed with an error").ok();
    writeln!(output, "     → Check the log for the last event processed").ok();
}

fn format_grab_error(output: &mut String) {
    writeln!(output, "Input Grab Error").ok();
    writeln!(output).ok();
    writeln!(output, "The display server refused to hand over pointer input.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Another program holds an active grab").ok();
    writeln!(output, "     → Close drag-and-drop operations and open menus").ok();
    writeln!(output, "     → Stop other gesture or macro tools").ok();
    writeln!(output).ok();
    writeln!(output, "  2. A device disappeared while being grabbed").ok();
    writeln!(output, "     → Reconnect it, hot-plugged devices are picked up").ok();
}

fn format_config_error(output: &mut String) {
    writeln!(output, "Configuration Error").ok();
    writeln!(output).ok();
    writeln!(output, "Problem with configuration file.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Configuration file not found").ok();
    writeln!(output, "     → Default location: ~/.config/strokewarden/config.toml").ok();
    writeln!(output, "     → Or specify: strokewarden -c /path/to/config.toml").ok();
    writeln!(output).ok();
    writeln!(output, "  2. Invalid TOML syntax").ok();
    writeln!(output, "     → Check for typos, missing quotes, etc.").ok();
    writeln!(output).ok();
    writeln!(output, "  3. Invalid values").ok();
    writeln!(output, "     → Gesture buttons must be non-zero").ok();
    writeln!(output, "     → Binding points need at least 2 entries, or none for a click").ok();
    writeln!(output, "     → Action type must be one of command, send_key, send_text,").ok();
    writeln!(output, "       scroll, ignore, button, misc, click").ok();
}

fn format_generic_error(output: &mut String, error: &str) {
    writeln!(output, "Daemon Error").ok();
    writeln!(output).ok();
    writeln!(output, "An error occurred while running the gesture daemon.").ok();
    writeln!(output).ok();
    writeln!(output, "Error: {}", error).ok();
}
