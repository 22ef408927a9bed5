use std::io::{self, Write};

use anyhow::Result;

use researcher_runtime::ResearchRuntime;
use researcher_runtime::prompt_builder::is_manual_teaching;

use crate::memory_cmds;

pub(crate) async fn run_chat_session(runtime: &ResearchRuntime) -> Result<()> {
    println!("{}: interactive mode", runtime.config.agent.name);
    println!("commands: /memory, /help, /exit");
    println!("correct the last answer with: The answer is: <fact>");

    // Last real question, so a later "The answer is: ..." can teach it.
    let mut previous_question: Option<String> = None;
    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        let bytes = stdin.read_line(&mut line)?;
        if bytes == 0 {
            println!("session closed");
            break;
        }
        let line = line.trim();

        if line.is_empty() {
            continue;
        }

        if line == "/exit" {
            println!("session closed");
            break;
        }

        if line == "/help" {
            println!("/memory  -- insight store statistics");
            println!("/exit");
            println!("The answer is: <fact>  -- teach the answer to the previous question");
            continue;
        }

        if line == "/memory" {
            memory_cmds::run_memory_stats(runtime.memory());
            continue;
        }

        let answered = match runtime.respond(line, previous_question.as_deref()).await {
            Ok(reply) => {
                crate::print_reply(&reply);
                true
            }
            Err(err) => {
                eprintln!("error: {err:#}");
                false
            }
        };
        println!();

        previous_question = next_previous_question(previous_question, line, answered);
    }

    Ok(())
}

/// Question a later "The answer is: ..." should teach: the latest message
/// that got an answer and was not itself a teaching.
fn next_previous_question(current: Option<String>, line: &str, answered: bool) -> Option<String> {
    if answered && !is_manual_teaching(line) {
        Some(line.to_string())
    } else {
        current
    }
}
