//! The interactive command loop.

use std::sync::Arc;

use jstp::{AnonymousConnect, Connection, ConnectionConfig, ConnectPolicy, LoginConnect};
use jstp_record::Value;
use owo_colors::OwoColorize;
use rustyline::DefaultEditor;

use crate::error::{CliError, CliResult};

/// Holds the REPL's session state: the connect policy built from startup
/// flags, and the current connection (if any).
pub struct Repl {
    editor: DefaultEditor,
    policy: Arc<dyn ConnectPolicy>,
    connection: Option<Arc<Connection>>,
}

impl Repl {
    /// Builds a REPL using `policy` to authenticate every `connect`.
    pub fn new(policy: Arc<dyn ConnectPolicy>) -> CliResult<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
            policy,
            connection: None,
        })
    }

    /// Connects immediately, then runs the read-eval-print loop until the
    /// user quits or closes stdin.
    pub async fn run(mut self, address: Option<String>) -> CliResult<()> {
        if let Some(address) = address {
            if let Err(err) = self.connect(&address).await {
                eprintln!("{} {err}", "connect failed:".red());
            }
        }

        println!("{}", "jstp interactive client - type 'help' for commands".dimmed());
        loop {
            let line = match self.editor.readline(&self.prompt()) {
                Ok(line) => line,
                Err(rustyline::error::ReadlineError::Eof)
                | Err(rustyline::error::ReadlineError::Interrupted) => break,
                Err(err) => return Err(err.into()),
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let _ = self.editor.add_history_entry(line);

            match self.dispatch(line).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => break,
                Err(err) => eprintln!("{} {err}", "error:".red()),
            }
        }
        if let Some(connection) = self.connection.take() {
            connection.close().await;
        }
        Ok(())
    }

    fn prompt(&self) -> String {
        match &self.connection {
            Some(conn) if conn.is_handshake_done() => format!("{}> ", conn.remote_address()),
            _ => "jstp> ".to_string(),
        }
    }

    async fn dispatch(&mut self, line: &str) -> CliResult<Flow> {
        let mut parts = line.splitn(2, char::is_whitespace);
        let command = parts.next().unwrap_or_default();
        let rest = parts.next().unwrap_or("").trim();

        match command {
            "connect" => {
                if rest.is_empty() {
                    return Err(CliError::Usage("usage: connect <host:port>".to_string()));
                }
                self.connect(rest).await?;
                Ok(Flow::Continue)
            }
            "disconnect" => {
                match self.connection.take() {
                    Some(connection) => connection.close().await,
                    None => return Err(CliError::NotConnected),
                }
                Ok(Flow::Continue)
            }
            "ping" => {
                self.connection()?.ping().await?;
                println!("{}", "pong".green());
                Ok(Flow::Continue)
            }
            "inspect" => {
                let interface = rest;
                if interface.is_empty() {
                    return Err(CliError::Usage("usage: inspect <interface>".to_string()));
                }
                let methods = self.connection()?.inspect(interface).await?;
                println!("{}", methods.join(", "));
                Ok(Flow::Continue)
            }
            "call" => {
                let (interface, method, args) = parse_call(rest)?;
                let results = self.connection()?.call(&interface, &method, args).await?;
                for result in results {
                    println!("{}", jstp_record::stringify(&result));
                }
                Ok(Flow::Continue)
            }
            "help" => {
                print_help();
                Ok(Flow::Continue)
            }
            "quit" | "exit" => Ok(Flow::Quit),
            other => Err(CliError::Usage(format!(
                "unknown command '{other}' - type 'help' for a list"
            ))),
        }
    }

    async fn connect(&mut self, address: &str) -> CliResult<()> {
        if let Some(connection) = self.connection.take() {
            connection.close().await;
        }
        let transport = jstp_tcp::connect(address).await?;
        let connection = Connection::new_client(transport, ConnectionConfig::default());
        let args = self.policy.handshake_args().await;
        connection
            .handshake(&args.application, &args.strategy, args.credentials)
            .await
            .map_err(|err| CliError::Handshake(err.to_string()))?;
        println!("{} {address}", "connected to".green());
        self.connection = Some(connection);
        Ok(())
    }

    fn connection(&self) -> CliResult<&Arc<Connection>> {
        self.connection.as_ref().ok_or(CliError::NotConnected)
    }
}

enum Flow {
    Continue,
    Quit,
}

/// Parses `<interface> <method> [args]`, where `args` is an optional
/// record-format array literal (`[1, "two", true]`). A missing array
/// means no arguments.
fn parse_call(rest: &str) -> CliResult<(String, String, Vec<Value>)> {
    let mut parts = rest.splitn(3, char::is_whitespace);
    let interface = parts.next().unwrap_or_default();
    let method = parts.next().unwrap_or_default();
    let args_text = parts.next().unwrap_or("").trim();

    if interface.is_empty() || method.is_empty() {
        return Err(CliError::Usage(
            "usage: call <interface> <method> [args]".to_string(),
        ));
    }

    let args = if args_text.is_empty() {
        Vec::new()
    } else {
        match jstp_record::parse(args_text)? {
            Value::Array(values) => values,
            other => vec![other],
        }
    };

    Ok((interface.to_string(), method.to_string(), args))
}

fn print_help() {
    println!(
        "{}",
        "\
connect <host:port>          connect to a server, authenticating with the configured policy
call <iface> <method> [args] call a method; args is a record-format array, e.g. [1, \"x\"]
inspect <iface>               list the methods a remote interface advertises
ping                          round-trip a heartbeat to the server
disconnect                    close the current connection
help                          show this message
quit | exit                   close the connection and exit"
    );
}

/// Builds the connect policy selected by CLI flags.
pub fn build_policy(
    application: String,
    strategy: &str,
    username: Option<String>,
    password: Option<String>,
) -> CliResult<Arc<dyn ConnectPolicy>> {
    match strategy {
        "anonymous" => Ok(Arc::new(AnonymousConnect::new(application))),
        "login" => {
            let username = username.ok_or_else(|| {
                CliError::Usage("--username is required for --strategy login".to_string())
            })?;
            let password = password.ok_or_else(|| {
                CliError::Usage("--password is required for --strategy login".to_string())
            })?;
            Ok(Arc::new(LoginConnect::new(application, username, password)))
        }
        other => Err(CliError::Usage(format!(
            "unknown strategy '{other}' - expected 'anonymous' or 'login'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_interface_method_and_args() {
        let (interface, method, args) = parse_call("calc add [1, 2]").unwrap();
        assert_eq!(interface, "calc");
        assert_eq!(method, "add");
        assert_eq!(args, vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn defaults_to_no_args_when_omitted() {
        let (interface, method, args) = parse_call("calc reset").unwrap();
        assert_eq!(interface, "calc");
        assert_eq!(method, "reset");
        assert!(args.is_empty());
    }

    #[test]
    fn rejects_a_missing_method() {
        assert!(parse_call("calc").is_err());
    }

    #[test]
    fn builds_login_policy_only_with_credentials() {
        assert!(build_policy("chat".to_string(), "login", None, None).is_err());
        assert!(build_policy(
            "chat".to_string(),
            "login",
            Some("alice".to_string()),
            Some("hunter2".to_string())
        )
        .is_ok());
    }
}
