//! Interactive REPL.

use crate::commands::{encode, format_value, json_to_value, report};
use colored::Colorize;
use mazewire_client::{
    AuthPrompt, ClientConfig, Dispatcher, Method, PromptConfig, RequestDescriptor, SiteRole,
};
use mazewire_wire::QueryEncoding;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};
use std::path::PathBuf;

const HELP_TEXT: &str = r#"
Available commands:
  help                              Show this help

  get <endpoint> [payload_json]     Send a GET request (payload goes in ?data=)
  post <endpoint> [payload_json]    Send a POST request
  put <endpoint> [payload_json]     Send a PUT request
  patch <endpoint> [payload_json]   Send a PATCH request
  delete <endpoint> [payload_json]  Send a DELETE request

  login                             Log in (also happens on demand)
  site                              Show the active site
  site <id> [role]                  Switch the active site (0 = API host)

  encode <hex|base32> <text>        Encode text as a GET payload would be

  quit, exit                        Exit the REPL

Payloads are JSON; {"$time": <unix seconds>} sends a timestamp.
"#;

pub async fn run(
    dispatcher: &Dispatcher,
    config: &ClientConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "mazewire CLI".bold().cyan());
    println!("API: {}", config.api.base_url);

    let rl_config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .build();
    let mut rl: Editor<(), DefaultHistory> = Editor::with_config(rl_config)?;

    let history_path = history_path();
    let _ = rl.load_history(&history_path);

    println!("Type 'help' for available commands.\n");

    loop {
        let prompt = format!("{} ", "mazewire>".cyan());
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match execute_repl_command(dispatcher, line).await {
                    Ok(Some(output)) => println!("{}\n", output),
                    Ok(None) => break, // Exit command
                    Err(e) => report(e.as_ref()),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                println!("{}: {:?}", "Error".red(), err);
                break;
            }
        }
    }

    let _ = rl.save_history(&history_path);
    println!("{}", "Bye.".dimmed());

    Ok(())
}

fn history_path() -> PathBuf {
    home::home_dir()
        .map(|h| h.join(".mazewire_history"))
        .unwrap_or_else(|| ".mazewire_history".into())
}

async fn execute_repl_command(
    dispatcher: &Dispatcher,
    line: &str,
) -> Result<Option<String>, Box<dyn std::error::Error>> {
    let (cmd, rest) = match line.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd.to_lowercase(), rest.trim()),
        None => (line.to_lowercase(), ""),
    };

    match cmd.as_str() {
        "help" | "?" => Ok(Some(HELP_TEXT.to_string())),

        "quit" | "exit" | "q" => Ok(None),

        "get" | "post" | "put" | "patch" | "delete" => {
            let method: Method = cmd.parse()?;
            let (endpoint, payload) = match rest.split_once(char::is_whitespace) {
                Some((endpoint, json)) => (endpoint, Some(json.trim())),
                None => (rest, None),
            };
            if endpoint.is_empty() {
                return Ok(Some(format!("Usage: {} <endpoint> [payload_json]", cmd)));
            }

            let mut request = RequestDescriptor::new(method, endpoint);
            if let Some(json) = payload {
                let json: serde_json::Value = serde_json::from_str(json)?;
                request = request.with_payload(json_to_value(&json)?);
            }
            let body = dispatcher.dispatch(&request).await?;
            Ok(Some(format_value(&body)))
        }

        "login" => {
            let Some(credentials) = crate::terminal::TerminalPrompt
                .credentials(&PromptConfig::login(), None)
                .await
            else {
                return Ok(Some("Login cancelled".yellow().to_string()));
            };
            dispatcher.login(&credentials).await?;
            Ok(Some(format!(
                "{} as {}",
                "Logged in".green(),
                credentials.user.cyan()
            )))
        }

        "site" => {
            let session = dispatcher.session();
            let mut args = rest.split_whitespace();
            let Some(id) = args.next() else {
                let site = session.active_site();
                return Ok(Some(format!(
                    "site {} {} (role: {})",
                    site.id.to_string().cyan(),
                    site.domain,
                    if site.role == SiteRole::None {
                        "unknown".dimmed().to_string()
                    } else {
                        site.role.to_string().yellow().to_string()
                    }
                )));
            };

            let id: i64 = id.parse()?;
            let role: SiteRole = args.next().unwrap_or("").parse()?;
            let site = session.active_site().with_id(id).with_role(role);
            session.set_active_site(site);
            Ok(Some(format!("{} site {}", "Switched to".green(), id)))
        }

        "encode" => {
            let Some((encoding, text)) = rest.split_once(char::is_whitespace) else {
                return Ok(Some("Usage: encode <hex|base32> <text>".to_string()));
            };
            let encoding: QueryEncoding = encoding.parse()?;
            Ok(Some(encode(encoding, text.trim(), false)?))
        }

        _ => Ok(Some(format!(
            "Unknown command: {}. Type 'help' for help.",
            cmd
        ))),
    }
}
