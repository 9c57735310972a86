use patent_retrieval::SearchMode;

pub const USAGE: &str = "\
Usage: patent-cli [COMMAND]

With no command, starts the interactive menu.

Commands:
  search <keyword|semantic|hybrid> <query...> [--top-k N]
  iterate <query...> [--steps N] [--top-k N]
  report <area...> [--model M]
  status
  models
  help";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Menu,
    Search { mode: SearchMode, query: String, top_k: Option<usize> },
    Iterate { query: String, steps: Option<usize>, top_k: Option<usize> },
    Report { area: String, model: Option<String> },
    Status,
    Models,
    Help,
}

pub fn parse_command<I>(args: I) -> Result<Command, String>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let Some(cmd) = args.next() else { return Ok(Command::Menu) };
    let rest: Vec<String> = args.collect();
    match cmd.as_str() {
        "search" => {
            let (mode, rest) = rest.split_first().ok_or("search needs a type and a query")?;
            let mode: SearchMode = mode.parse()?;
            let mut flags = Flags::parse(rest, &["--top-k"])?;
            let top_k = flags.usize("--top-k")?;
            Ok(Command::Search { mode, query: non_empty(flags.words, "search query")?, top_k })
        }
        "iterate" => {
            let mut flags = Flags::parse(&rest, &["--steps", "--top-k"])?;
            let steps = flags.usize("--steps")?;
            let top_k = flags.usize("--top-k")?;
            Ok(Command::Iterate { query: non_empty(flags.words, "exploration query")?, steps, top_k })
        }
        "report" => {
            let mut flags = Flags::parse(&rest, &["--model"])?;
            let model = flags.take("--model");
            Ok(Command::Report { area: non_empty(flags.words, "research area")?, model })
        }
        "status" => Ok(Command::Status),
        "models" => Ok(Command::Models),
        "help" | "--help" | "-h" => Ok(Command::Help),
        other => Err(format!("unknown command '{other}'")),
    }
}

/// Positional words plus `--flag value` pairs.
struct Flags {
    words: Vec<String>,
    values: Vec<(String, String)>,
}

impl Flags {
    fn parse(args: &[String], known: &[&str]) -> Result<Self, String> {
        let mut words = Vec::new();
        let mut values = Vec::new();
        let mut i = 0;
        while i < args.len() {
            let arg = &args[i];
            if arg.starts_with("--") {
                if !known.contains(&arg.as_str()) {
                    return Err(format!("unknown option '{arg}'"));
                }
                let value = args.get(i + 1).ok_or_else(|| format!("{arg} requires a value"))?;
                values.push((arg.clone(), value.clone()));
                i += 2;
            } else {
                words.push(arg.clone());
                i += 1;
            }
        }
        Ok(Self { words, values })
    }

    fn take(&mut self, name: &str) -> Option<String> {
        let pos = self.values.iter().rposition(|(k, _)| k == name)?;
        Some(self.values.remove(pos).1)
    }

    fn usize(&mut self, name: &str) -> Result<Option<usize>, String> {
        match self.take(name) {
            None => Ok(None),
            Some(v) => v.parse().map(Some).map_err(|_| format!("{name} requires a number, got '{v}'")),
        }
    }
}

fn non_empty(words: Vec<String>, what: &str) -> Result<String, String> {
    let joined = words.join(" ");
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        return Err(format!("{what} cannot be empty"));
    }
    Ok(trimmed.to_string())
}
