use anyhow::{Result, anyhow};
use std::env;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Upload a media file and print the think-page link.
    Upload { path: String },
    /// Upload an effect recording and its original.
    Record { effect: String, original: String },
    /// Run the think pipeline on a media URL or a think-page link.
    Think { target: String },
    /// Run the guessing sequence for a poem.
    Guess { poem: String },
    /// Guess, then save the keeper's name and storage choice.
    Keep { name: String, poem: String },
    /// List kept characters, or search them.
    Dictionary { term: Option<String> },
}

#[derive(Debug, Clone)]
pub struct CliArgs {
    pub command: Option<Command>,
    pub backend: Option<String>, // -b/--backend
    pub quiet: bool,             // -q/--quiet
    pub json_output: bool,       // --json
    pub agree: bool,             // -y/--agree
    pub details: bool,           // --details
    pub store: bool,             // --store
}

impl CliArgs {
    /// Parse command-line arguments
    pub fn parse() -> Result<Self> {
        let args: Vec<String> = env::args().collect();
        Self::parse_from(&args[1..])
    }

    /// Parse from a slice of arguments (for testing)
    pub fn parse_from(args: &[String]) -> Result<Self> {
        let mut result = CliArgs {
            command: None,
            backend: None,
            quiet: false,
            json_output: false,
            agree: false,
            details: false,
            store: false,
        };
        let mut positional: Vec<String> = Vec::new();

        let mut i = 0;
        while i < args.len() {
            let arg = &args[i];

            match arg.as_str() {
                "-b" | "--backend" => {
                    i += 1;
                    if i >= args.len() {
                        return Err(anyhow!("{arg} requires a value"));
                    }
                    result.backend = Some(args[i].clone());
                }
                "-q" | "--quiet" => {
                    result.quiet = true;
                }
                "--json" => {
                    result.json_output = true;
                }
                "-y" | "--agree" => {
                    result.agree = true;
                }
                "--details" => {
                    result.details = true;
                }
                "--store" => {
                    result.store = true;
                }
                flag if flag.starts_with('-') && flag.len() > 1 => {
                    return Err(anyhow!("Unknown argument: {flag}"));
                }
                value => positional.push(value.to_string()),
            }

            i += 1;
        }

        result.command = parse_command(positional)?;
        Ok(result)
    }
}

fn parse_command(positional: Vec<String>) -> Result<Option<Command>> {
    let mut words = positional.into_iter();
    let Some(name) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<String> = words.collect();

    let command = match (name.as_str(), rest.as_slice()) {
        ("upload", [path]) => Command::Upload { path: path.clone() },
        ("record", [effect, original]) => Command::Record {
            effect: effect.clone(),
            original: original.clone(),
        },
        ("think", [target]) => Command::Think {
            target: target.clone(),
        },
        // Poems may arrive unquoted; rejoin the words.
        ("guess", words) if !words.is_empty() => Command::Guess {
            poem: words.join(" "),
        },
        ("keep", [name, words @ ..]) if !words.is_empty() => Command::Keep {
            name: name.clone(),
            poem: words.join(" "),
        },
        ("dictionary", []) => Command::Dictionary { term: None },
        ("dictionary", words) => Command::Dictionary {
            term: Some(words.join(" ")),
        },
        ("upload" | "think", _) => return Err(anyhow!("{name} takes exactly one argument")),
        ("record", _) => return Err(anyhow!("record takes <effect> <original>")),
        ("guess", _) => return Err(anyhow!("guess requires a poem")),
        ("keep", _) => return Err(anyhow!("keep takes <name> <poem>")),
        (other, _) => return Err(anyhow!("Unknown command: {other}")),
    };
    Ok(Some(command))
}

pub fn usage() -> &'static str {
    "Usage: nvshu [--backend <url>] [--quiet] [--json] [--agree] [--details] [--store] <command>\n\
     \n\
     Commands:\n\
     \x20 upload <file>                 upload an image or video\n\
     \x20 record <effect> <original>    upload a recording pair\n\
     \x20 think <media-url|think-url>   describe, find similar poems, write a poem\n\
     \x20 guess <poem>                  guess a generated character\n\
     \x20 keep <name> <poem>            guess, then keep the character (--store adds it to the dictionary)\n\
     \x20 dictionary [term]             list or search kept characters"
}
