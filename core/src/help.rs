//! Help system for Vizbench commands.

pub fn help_text(topic: Option<&str>) -> String {
    match topic {
        None => overview(),
        Some(t) => {
            if let Some(text) = command_help(t) {
                return text;
            }
            if let Some(text) = group_help(t) {
                return text;
            }
            format!(
                "Unknown help topic: '{}'. Run 'vizbench help' for a list of commands.",
                t
            )
        }
    }
}


fn overview() -> String {
    "\
vizbench — run a script and watch its visualizations live

Usage: vizbench <command> [args...]

Commands:
  run <script> [options]     Run a script under an interpreter and stream
                             its visualization output
  run --sandbox <name>       Run a sandbox configured in the sandboxes file
  sandboxes [--config <f>]   List configured sandboxes
  help [topic]               Show help

Run options:
  --interpreter <path>       Interpreter binary (default: python3)
  --arg <value>              Argument passed to the script (repeatable)
  --config <file>            Sandboxes file (default: $VIZBENCH_CONFIG or
                             ~/.config/vizbench/sandboxes.yaml)
  --json                     Print the final canvas state as JSON

Run 'vizbench help <topic>' for detailed help on a specific topic."
        .into()
}


fn group_help(group: &str) -> Option<String> {
    let text = match group {
        "run" => "\
Run a script and stream its visualization output

  vizbench run <script> [--interpreter <path>] [--arg <value>]...
    Start the interpreter on the script, send the start directive, and
    print every captured view as it arrives. The run ends when the script
    finishes or the worker exits.

  vizbench run --sandbox <name> [--config <file>]
    Use a named configuration from the sandboxes file instead of ad-hoc
    flags.",

        "sandboxes" => "\
Sandboxes — named run configurations

  vizbench sandboxes [--config <file>]
    List the sandboxes defined in the configuration file as JSON. A
    missing file yields an empty list.

  File format:
    sandboxes:
      demo:
        interpreter: /usr/bin/python3
        script: demo.py
        args: [\"--fast\"]
        restart: always        # or: script-only",

        "protocol" => "\
Worker protocol — line-delimited JSON on the worker's stdout

  {\"filePath\": <str|null>, \"lineNumber\": <int|null>, \"view\": <tree|null>,
   \"scriptStart\": <bool>, \"scriptEnd\": <bool>}

  One record per line. The single control directive 'start' is written to
  the worker's stdin right after spawn.",

        _ => return None,
    };
    Some(text.into())
}


fn command_help(command: &str) -> Option<String> {
    let text = match command {
        "run" => {
            "vizbench run — run a script\n\nUsage: vizbench run <script> [--interpreter <path>] [--arg <value>]... [--json]"
        }
        "sandboxes" => {
            "vizbench sandboxes — list configured sandboxes\n\nUsage: vizbench sandboxes [--config <file>]"
        }
        "help" => "vizbench help — show help\n\nUsage: vizbench help [topic]",
        _ => return None,
    };
    Some(text.into())
}
