// Command abbreviation matching for the ontrack CLI

/// Find all commands that start with the given prefix (case-insensitive)
pub fn find_matching_commands<'a>(prefix: &str, commands: &'a [&str]) -> Vec<&'a str> {
    let prefix_lower = prefix.to_lowercase();
    commands.iter()
        .filter(|cmd| cmd.to_lowercase().starts_with(&prefix_lower))
        .copied()
        .collect()
}

/// Find a unique command match for the given prefix
/// Returns Ok(command) if exactly one match, Err(matches) if ambiguous, Err(empty) if no match
/// Note: Exact matches take precedence over prefix matches (e.g., "set" matches "set" not "setup")
pub fn find_unique_command<'a>(prefix: &str, commands: &'a [&str]) -> Result<&'a str, Vec<&'a str>> {
    let prefix_lower = prefix.to_lowercase();
    for cmd in commands {
        if cmd.to_lowercase() == prefix_lower {
            return Ok(*cmd);
        }
    }

    let matches = find_matching_commands(prefix, commands);

    if matches.is_empty() {
        Err(Vec::new())
    } else if matches.len() == 1 {
        Ok(matches[0])
    } else {
        Err(matches)
    }
}

/// Top-level commands
pub const TOP_LEVEL_COMMANDS: &[&str] = &[
    "status", "tasks", "flags", "set", "reset", "start", "watch", "help"
];

/// Expand an abbreviated command in an argument list.
/// Leading options (e.g. `-v`) are skipped; only the first positional
/// argument is treated as the command.
/// Returns expanded args or error message
pub fn expand_command_abbreviations(args: Vec<String>) -> Result<Vec<String>, String> {
    let Some(cmd_idx) = args.iter().position(|a| !a.starts_with('-')) else {
        return Ok(args);
    };

    let mut expanded = args;
    match find_unique_command(&expanded[cmd_idx], TOP_LEVEL_COMMANDS) {
        Ok(full_cmd) => {
            expanded[cmd_idx] = full_cmd.to_string();
            Ok(expanded)
        }
        // No match: let clap report the unknown command
        Err(matches) if matches.is_empty() => Ok(expanded),
        Err(matches) => Err(format!(
            "Ambiguous command '{}'. Did you mean one of: {}?",
            expanded[cmd_idx],
            matches.join(", ")
        )),
    }
}
