//! User-friendly error messages
//!
//! Turns an error chain into a boxed report with likely causes and the
//! next thing to try.

use std::fmt::Write as _;

/// Format an error for display on the terminal
pub fn format_user_error(error: &anyhow::Error) -> String {
    let mut output = String::new();
    let error_str = format!("{error:#}").to_lowercase();

    writeln!(&mut output).ok();
    writeln!(
        &mut output,
        "╔════════════════════════════════════════════════════════════╗"
    )
    .ok();
    writeln!(
        &mut output,
        "║                     ERROR: Try-On Failed                   ║"
    )
    .ok();
    writeln!(
        &mut output,
        "╚════════════════════════════════════════════════════════════╝"
    )
    .ok();
    writeln!(&mut output).ok();

    if error_str.contains("camera")
        || error_str.contains("permission")
        || error_str.contains("detector")
    {
        format_camera_error(&mut output);
    } else if error_str.contains("recording") {
        format_recording_error(&mut output);
    } else if error_str.contains("overlay") {
        format_overlay_error(&mut output);
    } else if error_str.contains("config") {
        format_config_error(&mut output);
    } else {
        format_generic_error(&mut output);
    }

    writeln!(&mut output).ok();
    writeln!(&mut output, "Technical Details:").ok();
    writeln!(&mut output, "  {error:#}").ok();
    writeln!(&mut output).ok();
    writeln!(&mut output, "Need Help?").ok();
    writeln!(&mut output, "  → Re-run with -vvv for trace logging").ok();
    writeln!(&mut output, "  → Add --log-file tryon.log to keep the output").ok();
    writeln!(&mut output).ok();

    output
}

fn format_camera_error(output: &mut String) {
    writeln!(output, "Problem: The camera could not be started").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output, "  1. Camera access was refused").ok();
    writeln!(output, "  2. The frame source closed before the first frame").ok();
    writeln!(output, "  3. The hand detector failed to initialize").ok();
    writeln!(output).ok();
    writeln!(output, "Try:").ok();
    writeln!(output, "  → Check the recording lists at least one frame").ok();
    writeln!(output, "  → Press retry, or restart tryon-replay").ok();
}

fn format_recording_error(output: &mut String) {
    writeln!(output, "Problem: The replay recording could not be read").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output, "  1. The file is not valid JSON").ok();
    writeln!(output, "  2. Width, height or frame rate is zero").ok();
    writeln!(output, "  3. A hand does not have exactly 21 landmarks").ok();
    writeln!(output).ok();
    writeln!(output, "Try:").ok();
    writeln!(output, "  → Validate the file: python -m json.tool recording.json").ok();
    writeln!(
        output,
        "  → Frame images are resolved relative to the recording file"
    )
    .ok();
}

fn format_overlay_error(output: &mut String) {
    writeln!(output, "Problem: The ring artwork could not be loaded").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output, "  1. The path does not exist").ok();
    writeln!(output, "  2. Only local paths and file:// URLs are supported").ok();
    writeln!(output, "  3. The image is not PNG, JPEG or BMP").ok();
    writeln!(output).ok();
    writeln!(output, "Try:").ok();
    writeln!(output, "  → Pass an absolute path with --overlay").ok();
}

fn format_config_error(output: &mut String) {
    writeln!(output, "Problem: Configuration error").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output, "  1. TOML syntax error").ok();
    writeln!(output, "  2. Manual scale bounds out of order (min > max)").ok();
    writeln!(output, "  3. Smoothing factor outside [0, 1)").ok();
    writeln!(output).ok();
    writeln!(output, "Try:").ok();
    writeln!(output, "  → An empty config file falls back to defaults").ok();
    writeln!(output, "  → Remove --config to run without a file").ok();
}

fn format_generic_error(output: &mut String) {
    writeln!(output, "Problem: An unexpected error occurred").ok();
    writeln!(output).ok();
    writeln!(output, "Try:").ok();
    writeln!(output, "  → Check the output directory is writable").ok();
    writeln!(output, "  → Re-run with -vvv and inspect the last warnings").ok();
}
