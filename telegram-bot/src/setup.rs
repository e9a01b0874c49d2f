//! Interactive `.env` writer behind the `init` subcommand.
//!
//! Asks for the two required secrets and a few optional settings, then writes them as a
//! dotenv file that `run` and `check-config` pick up.

use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use completion_client::{DEFAULT_BASE_URL, DEFAULT_MODEL};

use crate::config::parse_allowed_users;

/// Answers collected by [`prompt_answers`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetupAnswers {
    pub bot_token: String,
    pub api_key: String,
    pub base_url: Option<String>,
    pub group_name: Option<String>,
    /// Comma-separated chat ids, as typed.
    pub allowed_users: Option<String>,
}

fn ask<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> Result<String> {
    write!(output, "{}", question)?;
    output.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn optional(answer: String) -> Option<String> {
    (!answer.is_empty()).then_some(answer)
}

/// Reads the answers from `input`, writing questions to `output`.
pub fn prompt_answers<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<SetupAnswers> {
    writeln!(output, "GPT Telegram bot setup\n")?;

    let bot_token = ask(input, output, "1. Telegram bot token (from @BotFather): ")?;
    if bot_token.is_empty() {
        bail!("Telegram bot token is required");
    }
    let api_key = ask(input, output, "2. OpenAI API key: ")?;
    if api_key.is_empty() {
        bail!("OpenAI API key is required");
    }
    let base_url = optional(ask(
        input,
        output,
        &format!("3. API base URL (empty for {}): ", DEFAULT_BASE_URL),
    )?);
    let group_name = optional(ask(
        input,
        output,
        "4. Group command name (empty for /gpt): ",
    )?);
    let allowed_users = optional(ask(
        input,
        output,
        "5. Allowed chat ids, comma separated (empty allows everyone): ",
    )?);

    Ok(SetupAnswers {
        bot_token,
        api_key,
        base_url,
        group_name,
        allowed_users,
    })
}

/// Turns "1, -2" into the JSON array ALLOWED_USERS expects, rejecting non-numeric ids.
fn allowed_users_json(raw: &str) -> Result<String> {
    let ids: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .collect();
    let json = format!("[{}]", ids.join(","));
    parse_allowed_users(&json)?;
    Ok(json)
}

/// Dotenv text for `answers`; unset optional settings are left as comments.
pub fn render_env(answers: &SetupAnswers) -> Result<String> {
    let mut lines = vec![
        "# Telegram bot token".to_string(),
        format!("BOT_TOKEN={}", answers.bot_token),
        String::new(),
        "# OpenAI API key".to_string(),
        format!("OPENAI_API_KEY={}", answers.api_key),
        String::new(),
    ];
    lines.push(match &answers.base_url {
        Some(url) => format!("OPENAI_BASE_URL={}", url),
        None => format!("# OPENAI_BASE_URL={}", DEFAULT_BASE_URL),
    });
    lines.push(match &answers.group_name {
        Some(name) => format!("GROUP_NAME={}", name),
        None => "# GROUP_NAME=".to_string(),
    });
    lines.push(match &answers.allowed_users {
        Some(raw) => format!("ALLOWED_USERS={}", allowed_users_json(raw)?),
        None => "# ALLOWED_USERS=[]".to_string(),
    });
    lines.push(String::new());
    lines.push("# USE_STREAMING=false".to_string());
    lines.push(format!("# MODEL={}", DEFAULT_MODEL));
    Ok(lines.join("\n") + "\n")
}

/// Prompts for the settings and writes them to `path`. An existing file is kept unless
/// `force` is set.
pub fn run_setup<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    path: &Path,
    force: bool,
) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists; pass --force to overwrite it", path.display());
    }
    let answers = prompt_answers(input, output)?;
    let content = render_env(&answers)?;
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;
    writeln!(output, "\nWrote {}. Start the bot with `gpt-telegram-bot run`.", path.display())?;
    Ok(())
}
