//! System diagnostics and dependency checking.
//!
//! Verifies that the configured engine commands and audio devices are
//! usable before the pipeline is started.

use crate::audio;
use crate::config::Config;
use crate::exec::{command_exists, parse_command_template};

/// Result of a dependency check.
#[derive(Debug, PartialEq)]
pub enum CheckResult {
    /// Tool is installed and working
    Ok,
    /// Tool is not found
    NotFound,
    /// Tool is found but has issues
    Warning(String),
}

/// Check that a configured command template names a resolvable program.
fn check_engine(template: Option<&str>) -> CheckResult {
    let Some(template) = template else {
        return CheckResult::Warning("not configured".to_string());
    };
    match parse_command_template(template) {
        Ok((program, _)) => {
            if command_exists(&program) {
                CheckResult::Ok
            } else {
                CheckResult::NotFound
            }
        }
        Err(e) => CheckResult::Warning(format!("invalid command template: {}", e)),
    }
}

/// Check that audio input devices can be enumerated, and the configured
/// device (if any) is among them.
fn check_audio_device(configured: Option<&str>) -> CheckResult {
    match audio::list_devices() {
        Ok(devices) if devices.is_empty() => {
            CheckResult::Warning("no input devices found".to_string())
        }
        Ok(devices) => match configured {
            Some(name) if !devices.iter().any(|d| d.starts_with(name)) => {
                CheckResult::Warning(format!("configured device '{}' not found", name))
            }
            _ => CheckResult::Ok,
        },
        Err(e) => CheckResult::Warning(format!("device enumeration failed: {}", e)),
    }
}

fn print_result(label: &str, result: CheckResult) -> bool {
    print!("{}: ", label);
    match result {
        CheckResult::Ok => {
            println!("✓ OK");
            true
        }
        CheckResult::NotFound => {
            println!("✗ NOT FOUND");
            false
        }
        CheckResult::Warning(msg) => {
            println!("⚠ WARNING: {}", msg);
            true
        }
    }
}

/// Run all dependency checks and print results. Returns false when a
/// required dependency is missing.
pub fn check_dependencies(config: &Config) -> bool {
    println!("Checking configured dependencies...\n");

    let mut ok = true;
    ok &= print_result(
        "audio input",
        check_audio_device(config.audio.device.as_deref()),
    );
    ok &= print_result(
        "transcription engine",
        check_engine(config.stt.command.as_deref()),
    );
    ok &= print_result(
        "response engine",
        check_engine(config.llm.command.as_deref()),
    );
    ok &= print_result(
        "synthesis engine",
        check_engine(config.tts.command.as_deref()),
    );

    println!();
    if ok {
        println!("All checks passed.");
    } else {
        println!("Some dependencies are missing. Fix the items marked ✗ above.");
    }
    ok
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_engine_is_a_warning() {
        assert!(matches!(check_engine(None), CheckResult::Warning(_)));
    }

    #[test]
    fn existing_program_passes() {
        assert_eq!(check_engine(Some("sh -c {text}")), CheckResult::Ok);
    }

    #[test]
    fn missing_program_is_not_found() {
        assert_eq!(
            check_engine(Some("definitely-not-a-real-binary-4501 {file}")),
            CheckResult::NotFound
        );
    }

    #[test]
    fn empty_template_is_a_warning() {
        assert!(matches!(check_engine(Some("  ")), CheckResult::Warning(_)));
    }
}
