//! User-Friendly Error Formatting
//!
//! Provides user-friendly error messages with troubleshooting hints
//! for common error scenarios.

use std::fmt::Write;

/// Format error for user consumption
///
/// Takes technical error and produces user-friendly message with
/// troubleshooting steps and context.
pub fn format_user_error(error: &anyhow::Error) -> String {
    let mut output = String::new();

    // Header
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

    // The whole chain, so context added on top does not hide the cause
    let error_msg = format!("{:#}", error);

    if error_msg.contains("console") || error_msg.contains("Console") {
        format_console_error(&mut output, &error_msg);
    } else if error_msg.contains("keymap") || error_msg.contains("Keymap") {
        format_keymap_error(&mut output, &error_msg);
    } else if error_msg.contains("key event") || error_msg.contains("events file") {
        format_event_error(&mut output, &error_msg);
    } else if error_msg.contains("config") {
        format_config_error(&mut output, &error_msg);
    } else {
        format_generic_error(&mut output, &error_msg);
    }

    // Technical details
    writeln!(&mut output).ok();
    writeln!(
        &mut output,
        "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━"
    )
    .ok();
    writeln!(&mut output, "Technical Details:").ok();
    writeln!(&mut output).ok();
    writeln!(&mut output, "{:#}", error).ok();
    writeln!(&mut output).ok();

    // Footer with help
    writeln!(
        &mut output,
        "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━"
    )
    .ok();
    writeln!(&mut output, "Need Help?").ok();
    writeln!(
        &mut output,
        "  - Run with --verbose for detailed logs: keysym-replay -vvv replay"
    )
    .ok();
    writeln!(
        &mut output,
        "  - Dump the tables actually in use: keysym-replay dump-keymap"
    )
    .ok();
    writeln!(
        &mut output,
        "╚════════════════════════════════════════════════════════════╝"
    )
    .ok();

    output
}

fn format_console_error(output: &mut String, _error: &str) {
    writeln!(output, "Console Keymap Error").ok();
    writeln!(output).ok();
    writeln!(output, "Could not read the keymap from the Linux console.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Not running on a virtual terminal").ok();
    writeln!(
        output,
        "     → Terminal emulators and SSH sessions have no kernel keymap"
    )
    .ok();
    writeln!(output, "     → Switch to a VT (Ctrl+Alt+F3) and run again").ok();
    writeln!(
        output,
        "     → Or set [keymap] source = \"builtin\" or \"file\""
    )
    .ok();
    writeln!(output).ok();
    writeln!(output, "  2. No permission to change the keyboard mode").ok();
    writeln!(output, "     → Check: ls -l /dev/tty*").ok();
    writeln!(
        output,
        "     → Add your user to the tty group: sudo usermod -aG tty $USER"
    )
    .ok();
    writeln!(output).ok();
    writeln!(output, "  3. Wrong console device").ok();
    writeln!(
        output,
        "     → Set [keymap] console_device, e.g. \"/dev/tty1\""
    )
    .ok();
}

fn format_keymap_error(output: &mut String, _error: &str) {
    writeln!(output, "Keymap File Error").ok();
    writeln!(output).ok();
    writeln!(output, "Could not load the keymap file.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Keymap file not found").ok();
    writeln!(output, "     → Check [keymap] path or the --keymap argument").ok();
    writeln!(
        output,
        "     → Start from the built-in map: keysym-replay dump-keymap > us.toml"
    )
    .ok();
    writeln!(output).ok();
    writeln!(output, "  2. Invalid keysym").ok();
    writeln!(
        output,
        "     → Use U+XXXX, a raw word like 0xf20e, or handler:value"
    )
    .ok();
    writeln!(
        output,
        "     → Examples: \"letter:a\", \"dead:grave\", \"shift:altgr\""
    )
    .ok();
    writeln!(output).ok();
    writeln!(output, "  3. Page or keycode out of range").ok();
    writeln!(output, "     → Page indices are 0-255, keycodes 0-255").ok();
    writeln!(output, "     → Each page index may appear only once").ok();
    writeln!(output).ok();
    writeln!(output, "  4. Disable the fallback to see the real cause").ok();
    writeln!(output, "     → [keymap] fallback_to_builtin = false").ok();
}

fn format_event_error(output: &mut String, _error: &str) {
    writeln!(output, "Event Script Error").ok();
    writeln!(output).ok();
    writeln!(output, "Could not read the key event script.").ok();
    writeln!(output).ok();
    writeln!(output, "Expected Format:").ok();
    writeln!(output).ok();
    writeln!(output, "  One event per line: <down|up|repeat> <keycode>").ok();
    writeln!(output, "     → down 42").ok();
    writeln!(output, "     → down 30").ok();
    writeln!(output, "     → up 30").ok();
    writeln!(output, "     → up 42").ok();
    writeln!(output, "  Lines starting with # are ignored").ok();
}

fn format_config_error(output: &mut String, _error: &str) {
    writeln!(output, "Configuration Error").ok();
    writeln!(output).ok();
    writeln!(output, "Problem with configuration file.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Configuration file not found").ok();
    writeln!(
        output,
        "     → Default location: ~/.config/keysym-decoder/config.toml"
    )
    .ok();
    writeln!(
        output,
        "     → Or specify: keysym-replay -c /path/to/config.toml"
    )
    .ok();
    writeln!(output).ok();
    writeln!(output, "  2. Invalid TOML syntax").ok();
    writeln!(output, "     → Check for typos, missing quotes, etc.").ok();
    writeln!(output).ok();
    writeln!(output, "  3. Invalid values").ok();
    writeln!(
        output,
        "     → keymap.source: \"builtin\", \"file\" or \"console\""
    )
    .ok();
    writeln!(output, "     → decoder.repeat: \"suppress\" or \"emit\"").ok();
    writeln!(
        output,
        "     → logging.format: \"pretty\", \"compact\" or \"json\""
    )
    .ok();
}

fn format_generic_error(output: &mut String, error: &str) {
    writeln!(output, "Decoder Error").ok();
    writeln!(output).ok();
    writeln!(output, "An error occurred while decoding key events.").ok();
    writeln!(output).ok();
    writeln!(output, "Error: {}", error).ok();
    writeln!(output).ok();
    writeln!(output, "Troubleshooting:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Retry with the built-in keymap:").ok();
    writeln!(output, "     → [keymap] source = \"builtin\"").ok();
    writeln!(output).ok();
    writeln!(output, "  2. Check the event script is readable").ok();
}
