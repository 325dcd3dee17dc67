//! Line commands typed at the interactive prompt.

use shared::domain::Stage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Search {
        query: String,
        max_per_store: Option<u32>,
    },
    List,
    Select {
        store: String,
        position: usize,
    },
    Selected,
    Analyze,
    Report {
        json: bool,
    },
    Ask {
        question: String,
    },
    Suggest,
    Status,
    Transcript,
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  search [-n N] <query>   discover products (N listings per store)
  list                    show discovered listings
  select <store> <n>      choose listing n (1-based) for a store
  selected                show the current selection
  analyze                 extract and analyze reviews for the selection
  report [json]           show the analysis report
  ask <question>          ask about the selected products
  suggest                 show example questions
  status                  show the latest status lines
  transcript              show the chat so far
  help                    show this help
  quit                    leave
Once analysis is complete, any other line is sent as a question.";

/// Parses one prompt line. Lines that are not commands are treated as
/// questions once the workflow has been analyzed.
pub fn parse_command(line: &str, stage: Stage) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "search" | "s" => parse_search(rest)?,
        "list" | "ls" => Command::List,
        "select" => parse_select(rest)?,
        "selected" => Command::Selected,
        "analyze" | "analyse" => Command::Analyze,
        "report" => Command::Report {
            json: rest.eq_ignore_ascii_case("json"),
        },
        "ask" => Command::Ask {
            question: rest.to_string(),
        },
        "suggest" => Command::Suggest,
        "status" => Command::Status,
        "transcript" | "chat" => Command::Transcript,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        _ if stage == Stage::Analyzed => Command::Ask {
            question: line.to_string(),
        },
        other => return Err(format!("Unknown command '{other}'. Type 'help' for commands.")),
    };
    Ok(Some(command))
}

fn parse_search(rest: &str) -> Result<Command, String> {
    let mut max_per_store = None;
    let mut query = rest;

    if let Some(after_flag) = rest.strip_prefix("-n ") {
        let after_flag = after_flag.trim_start();
        let (count, remainder) = after_flag
            .split_once(char::is_whitespace)
            .unwrap_or((after_flag, ""));
        let count: u32 = count
            .parse()
            .map_err(|_| format!("'-n' expects a number, got '{count}'"))?;
        if count == 0 {
            return Err("'-n' must be at least 1".to_string());
        }
        max_per_store = Some(count);
        query = remainder.trim();
    }

    Ok(Command::Search {
        query: query.to_string(),
        max_per_store,
    })
}

fn parse_select(rest: &str) -> Result<Command, String> {
    let mut parts = rest.split_whitespace();
    let (Some(store), Some(position), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err("usage: select <store> <n>".to_string());
    };
    let position: usize = position
        .parse()
        .map_err(|_| format!("listing number must be a positive integer, got '{position}'"))?;
    if position == 0 {
        return Err("listing numbers start at 1".to_string());
    }
    Ok(Command::Select {
        store: store.to_ascii_lowercase(),
        position,
    })
}
