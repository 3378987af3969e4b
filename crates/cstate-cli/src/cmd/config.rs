use std::io::{self, Write};

use anyhow::Result;
use cstate_core::config::EffectiveConfig;

use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

/// Print the effective configuration.
///
/// # Errors
///
/// Returns an error if output cannot be written.
pub fn run_config(config: &EffectiveConfig, output: OutputMode) -> Result<()> {
    render_mode(output, config, write_text, write_pretty)
}

fn write_text(value: &EffectiveConfig, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "resolved_output={}", value.resolved_output)?;
    writeln!(w, "resolved_workers={}", value.resolved_workers)?;
    writeln!(w, "sync.workers={}", value.project.sync.workers)?;
    writeln!(w, "sync.fail_fast={}", value.project.sync.fail_fast)?;
    if let Some(out) = &value.user.output {
        writeln!(w, "user.output={out}")?;
    }
    Ok(())
}

fn write_pretty(value: &EffectiveConfig, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, "Effective configuration")?;
    pretty_kv(w, "Output", &value.resolved_output)?;
    pretty_kv(w, "Workers", value.resolved_workers.to_string())?;
    writeln!(w)?;
    pretty_section(w, "[sync]")?;
    pretty_kv(w, "workers", value.project.sync.workers.to_string())?;
    pretty_kv(w, "fail_fast", value.project.sync.fail_fast.to_string())?;
    writeln!(w)?;
    pretty_section(w, "[user]")?;
    pretty_kv(w, "output", value.user.output.as_deref().unwrap_or("(unset)"))
}
