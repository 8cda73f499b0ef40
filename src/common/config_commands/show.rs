use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// Write the resolved config path to provided writer.
pub(super) fn path_config_with_writer(path: &Path, output: &mut dyn Write) -> Result<()> {
    writeln!(output, "{}", path.display())?;
    Ok(())
}

/// Print the config file under a `# source:` line, or the built-in defaults
/// when the file is missing. A file that is not valid TOML is an error.
pub(super) fn show_config_with_io(
    path: &Path,
    defaults: &str,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<()> {
    if !path.exists() {
        writeln!(stderr, "No config file at {}, upload uses built-in defaults", path.display())?;
        writeln!(stdout, "# source: built-in defaults")?;
        write!(stdout, "{defaults}")?;
        return Ok(());
    }

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str::<toml::Table>(&text)
        .with_context(|| format!("Config file {} is not valid TOML", path.display()))?;

    writeln!(stdout, "# source: {}", path.display())?;
    write!(stdout, "{text}")?;
    Ok(())
}
