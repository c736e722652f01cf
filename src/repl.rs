//! Interactive console chat session.
//!
//! A blocking read-eval loop over a caller-owned [`Transcript`]: read a
//! line, scan for crisis phrases, otherwise send the transcript to the
//! completion model and print the reply. The token budget is enforced after
//! every exchange so long sessions drop their oldest turns instead of
//! growing without bound.

use anyhow::Result;
use std::io::{BufRead, Write};

use crate::budget::Transcript;
use crate::config::Config;
use crate::llm::{CompletionClient, OpenAiCompletion};
use crate::safety;

pub async fn run_chat(config: &Config) -> Result<()> {
    let llm = OpenAiCompletion::new(&config.llm)?;
    let stdin = std::io::stdin();
    let mut transcript = Transcript::new(config.chat.system_prompt.clone());

    println!("mindbase chat — type 'exit' or 'quit' to end the session");

    loop {
        print!("You: ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input.to_lowercase().as_str(), "exit" | "quit") {
            break;
        }

        if safety::is_crisis(input, &config.safety.crisis_phrases) {
            println!("Assistant: {}", config.safety.safety_message);
            continue;
        }

        transcript.push_user(input);

        match llm.complete(transcript.messages()).await {
            Ok(reply) => {
                println!("Assistant: {}", reply);
                transcript.push_assistant(reply);
                transcript.enforce_budget(config.chat.token_budget);
            }
            Err(e) => {
                // The turn failed; keep the session alive and let the user retry.
                eprintln!("completion failed: {}", e);
            }
        }
    }

    Ok(())
}
