//! Line-oriented question loop over stdin.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use cogito_core::EngineResponse;
use cogito_engine::CognitiveEngine;

const PROMPT: &str = "> ";
const TOP_PATTERNS: usize = 10;

const HELP: &str = "\
Ask anything, or use a command:
  :stats     engine and learning counters
  :patterns  most frequent learned patterns
  :why       reasoning chain behind the last answer
  :reset     end the current conversation
  :quit      exit";

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Empty,
    Help,
    Stats,
    Patterns,
    Why,
    Reset,
    Quit,
    Unknown(&'a str),
    Ask(&'a str),
}

fn parse_command(line: &str) -> Command<'_> {
    let line = line.trim();
    match line {
        "" => Command::Empty,
        ":help" | ":h" | ":?" => Command::Help,
        ":stats" => Command::Stats,
        ":patterns" => Command::Patterns,
        ":why" => Command::Why,
        ":reset" => Command::Reset,
        ":quit" | ":q" | ":exit" => Command::Quit,
        cmd if cmd.starts_with(':') => Command::Unknown(cmd),
        input => Command::Ask(input),
    }
}

fn format_response(response: &EngineResponse) -> String {
    let sources = if response.sources.is_empty() {
        "none".to_string()
    } else {
        response.sources.join(", ")
    };
    format!(
        "{}\n  [{} | confidence {:.2} | sources: {}]",
        response.response, response.intent, response.confidence, sources
    )
}

async fn write_out(text: &str) -> std::io::Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(text.as_bytes()).await?;
    stdout.flush().await
}

/// Read questions until EOF, `:quit`, or Ctrl-C.
pub async fn run(engine: &CognitiveEngine) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    write_out("cogito ready. Type :help for commands.\n").await?;

    loop {
        write_out(PROMPT).await?;
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                write_out("\n").await?;
                break;
            }
        };
        let Some(line) = line else {
            break;
        };

        let output = match parse_command(&line) {
            Command::Empty => continue,
            Command::Quit => break,
            Command::Help => HELP.to_string(),
            Command::Unknown(cmd) => format!("Unknown command {}. Type :help.", cmd),
            Command::Ask(input) => format_response(&engine.process_input(input).await),
            Command::Stats => stats_report(engine),
            Command::Patterns => patterns_report(engine),
            Command::Why => why_report(engine),
            Command::Reset => {
                engine.end_session().await;
                "Conversation reset.".to_string()
            }
        };
        write_out(&format!("{}\n", output)).await?;
    }
    Ok(())
}

fn stats_report(engine: &CognitiveEngine) -> String {
    let mut report = serde_json::json!({ "engine": engine.stats() });
    if let Some(learning) = engine.learning() {
        report["learning"] = serde_json::json!(learning.get_learning_stats());
    }
    serde_json::to_string_pretty(&report).unwrap_or_else(|e| format!("stats unavailable: {}", e))
}

fn patterns_report(engine: &CognitiveEngine) -> String {
    let Some(learning) = engine.learning() else {
        return "Learning is disabled.".to_string();
    };
    let patterns = learning.get_top_patterns(TOP_PATTERNS);
    if patterns.is_empty() {
        return "No patterns learned yet.".to_string();
    }
    patterns
        .iter()
        .map(|p| {
            format!(
                "{:>5}x  {:.2}  {}",
                p.occurrences,
                p.confidence,
                p.table_key()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn why_report(engine: &CognitiveEngine) -> String {
    match engine.reasoning().latest() {
        Some(chain) => {
            let mut lines = vec![format!(
                "{} (confidence {:.2})",
                chain.conclusion, chain.confidence
            )];
            lines.extend(chain.summary_lines().into_iter().map(|l| format!("  - {}", l)));
            lines.join("\n")
        }
        None => "No reasoning recorded yet.".to_string(),
    }
}
